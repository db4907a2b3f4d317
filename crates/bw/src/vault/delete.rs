use tracing::debug;

use super::DeleteObject;
use crate::{
    dispatch::{ensure_premium, existing_id, require_guid, require_guid_option},
    options::DeleteOptions,
    response::{CommandError, CommandResult, Response},
    services::Services,
};

pub(crate) async fn run(
    services: &Services,
    object: DeleteObject,
    id: &str,
    options: &DeleteOptions,
) -> CommandResult {
    match object {
        DeleteObject::Item => {
            let id = existing_id(id)?;
            if services.ciphers.get(id).await?.is_none() {
                return Err(CommandError::NotFound);
            }

            if options.permanent {
                debug!(%id, "Permanently deleting item");
                services.ciphers.delete(id).await?;
            } else {
                services.ciphers.soft_delete(id).await?;
            }
            Ok(Response::success())
        }
        DeleteObject::Attachment => {
            let item_id = options
                .item_id
                .as_deref()
                .ok_or_else(|| CommandError::bad_request("`itemid` option is required."))?;
            let item_id = existing_id(item_id)?;
            let cipher = services
                .ciphers
                .get(item_id)
                .await?
                .ok_or(CommandError::NotFound)?;

            if cipher.attachments.is_empty() {
                return Err(CommandError::bad_request(
                    "No attachments available for this item.",
                ));
            }
            let attachment = cipher
                .attachments
                .iter()
                .find(|a| a.id == id)
                .ok_or_else(|| {
                    CommandError::BadRequest(format!("Attachment `{id}` was not found."))
                })?;
            if cipher.organization_id.is_none() {
                ensure_premium(services).await?;
            }

            services
                .ciphers
                .delete_attachment(item_id, attachment.id.clone())
                .await?;
            Ok(Response::success())
        }
        DeleteObject::Folder => {
            let id = existing_id(id)?;
            if services.folders.get(id).await?.is_none() {
                return Err(CommandError::NotFound);
            }

            services.folders.delete(id).await?;
            Ok(Response::success())
        }
        DeleteObject::OrgCollection => {
            let organization_id =
                require_guid_option(options.organization_id.as_deref(), "organizationid")?;
            let id = require_guid(id)?;

            services
                .collections
                .delete_org(organization_id, id)
                .await?;
            Ok(Response::success())
        }
    }
}
