use clap::{Subcommand, ValueEnum};
use tracing::info;
use uuid::Uuid;

use crate::{
    dispatch::{CommandRequest, Verb, existing_id, require_guid, require_guid_option},
    options::OptionBag,
    payload::{Payload, decode},
    response::{CommandError, CommandResult, Response},
    services::{OrganizationUserStatus, Services},
    vault::refetch_cipher,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
#[value(rename_all = "kebab-case")]
pub enum ConfirmObject {
    OrgMember,
}

#[derive(Subcommand, Clone)]
pub enum ConfirmCommand {
    OrgMember {
        /// Object's globally unique ID
        id: String,

        #[arg(long, help = "Organization id for an organization object.")]
        organizationid: Option<String>,
    },
}

impl ConfirmCommand {
    pub(crate) fn into_request(self) -> CommandRequest {
        match self {
            ConfirmCommand::OrgMember { id, organizationid } => {
                let mut options = OptionBag::new();
                options.insert_opt("organizationid", organizationid);
                CommandRequest::new(Verb::Confirm)
                    .object("org-member")
                    .id(Some(id))
                    .options(options)
            }
        }
    }
}

#[derive(clap::Args, Clone)]
pub struct MoveArgs {
    /// Item ID
    pub itemid: String,
    /// Organization ID
    pub organizationid: String,
    /// Base64-encoded JSON with collection IDs (optional)
    pub encoded_json: Option<String>,
}

impl MoveArgs {
    pub(crate) fn into_request(self, payload: Option<Payload>) -> CommandRequest {
        let mut options = OptionBag::new();
        options.insert("organizationid", self.organizationid);
        CommandRequest::new(Verb::Move)
            .id(Some(self.itemid))
            .payload(self.encoded_json.map(Payload::Encoded).or(payload))
            .options(options)
    }
}

/// Move a personal item into an organization, placing it in at least one collection.
pub(crate) async fn move_item(
    services: &Services,
    id: &str,
    options: &OptionBag,
    payload: Option<&Payload>,
) -> CommandResult {
    let organization_id = require_guid_option(
        options.string(&["organizationid", "organizationId"]).as_deref(),
        "organizationid",
    )?;
    let collection_ids: Vec<Uuid> = decode(payload)?;
    if collection_ids.is_empty() {
        return Err(CommandError::bad_request(
            "You must select at least one collection.",
        ));
    }

    let id = existing_id(id)?;
    let cipher = services
        .ciphers
        .get(id)
        .await?
        .ok_or(CommandError::NotFound)?;
    if cipher.organization_id.is_some() {
        return Err(CommandError::bad_request(
            "This item already belongs to an organization.",
        ));
    }

    services
        .ciphers
        .share(id, organization_id, collection_ids)
        .await?;
    info!(%id, %organization_id, "Moved item to organization");
    refetch_cipher(services, id).await
}

pub(crate) async fn confirm(
    services: &Services,
    object: ConfirmObject,
    id: &str,
    options: &OptionBag,
) -> CommandResult {
    match object {
        ConfirmObject::OrgMember => {
            let organization_id = require_guid_option(
                options.string(&["organizationid", "organizationId"]).as_deref(),
                "organizationid",
            )?;
            let id = require_guid(id)?;

            let member = services
                .organizations
                .get_member(organization_id, id)
                .await?
                .ok_or(CommandError::NotFound)?;
            if member.status != OrganizationUserStatus::Accepted {
                return Err(CommandError::bad_request(
                    "Member is not in the accepted status.",
                ));
            }

            services
                .organizations
                .confirm_member(organization_id, id)
                .await?;
            Ok(Response::success())
        }
    }
}
