use uuid::Uuid;

use super::{EditObject, refetch_cipher, refetch_folder, refetch_org_collection};
use crate::{
    dispatch::{existing_id, require_guid, require_guid_option},
    options::EditOptions,
    payload::{Payload, decode},
    response::{CommandError, CommandResult},
    services::{CipherRequest, FolderRequest, OrgCollectionRequest, Services},
};

pub(crate) async fn run(
    services: &Services,
    object: EditObject,
    id: &str,
    payload: Option<&Payload>,
    options: &EditOptions,
) -> CommandResult {
    match object {
        EditObject::Item => {
            let request: CipherRequest = decode(payload)?;
            let id = existing_id(id)?;
            let mut cipher = services
                .ciphers
                .get(id)
                .await?
                .ok_or(CommandError::NotFound)?;
            if cipher.is_deleted() {
                return Err(CommandError::bad_request(
                    "You may not edit a deleted item. Use the restore command first.",
                ));
            }

            request.apply_to(&mut cipher);
            services.ciphers.update(cipher).await?;
            refetch_cipher(services, id).await
        }
        EditObject::ItemCollections => {
            let collection_ids: Vec<Uuid> = decode(payload)?;
            let id = existing_id(id)?;
            let cipher = services
                .ciphers
                .get(id)
                .await?
                .ok_or(CommandError::NotFound)?;
            if cipher.organization_id.is_none() {
                return Err(CommandError::bad_request(
                    "Item does not belong to an organization. Consider moving it first.",
                ));
            }

            services
                .ciphers
                .update_collections(id, collection_ids)
                .await?;
            refetch_cipher(services, id).await
        }
        EditObject::Folder => {
            let request: FolderRequest = decode(payload)?;
            let id = existing_id(id)?;
            if services.folders.get(id).await?.is_none() {
                return Err(CommandError::NotFound);
            }

            services.folders.update(id, request.name).await?;
            refetch_folder(services, id).await
        }
        EditObject::OrgCollection => {
            let organization_id =
                require_guid_option(options.organization_id.as_deref(), "organizationid")?;
            let id = require_guid(id)?;
            let request: OrgCollectionRequest = decode(payload)?;
            if request.organization_id != organization_id {
                return Err(CommandError::bad_request(
                    "`organizationid` option does not match request object.",
                ));
            }
            if services
                .collections
                .get_org(organization_id, id)
                .await?
                .is_none()
            {
                return Err(CommandError::NotFound);
            }

            services
                .collections
                .update_org(organization_id, id, request)
                .await?;
            refetch_org_collection(services, organization_id, id).await
        }
    }
}
