use clap::ValueEnum;
use uuid::Uuid;

use crate::{
    response::{CommandError, CommandResult, Response},
    services::Services,
};

pub(crate) mod create;
pub(crate) mod delete;
pub(crate) mod edit;
pub(crate) mod get;
pub(crate) mod list;
pub(crate) mod restore;
pub(crate) mod template;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
#[value(rename_all = "kebab-case")]
pub enum ListObject {
    Items,
    Folders,
    Collections,
    Organizations,
    OrgCollections,
    OrgMembers,
    Sends,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
#[value(rename_all = "kebab-case")]
pub enum GetObject {
    Item,
    Username,
    Password,
    Uri,
    Totp,
    Notes,
    Exposed,
    Attachment,
    Folder,
    Collection,
    OrgCollection,
    Organization,
    Template,
    Fingerprint,
    Send,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
#[value(rename_all = "kebab-case")]
pub enum CreateObject {
    Item,
    Attachment,
    Folder,
    OrgCollection,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
#[value(rename_all = "kebab-case")]
pub enum EditObject {
    Item,
    ItemCollections,
    Folder,
    OrgCollection,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
#[value(rename_all = "kebab-case")]
pub enum DeleteObject {
    Item,
    Attachment,
    Folder,
    OrgCollection,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
#[value(rename_all = "kebab-case")]
pub enum RestoreObject {
    Item,
}

/// Fetch a cipher after a mutation so the response shows what the vault stored.
pub(crate) async fn refetch_cipher(services: &Services, id: Uuid) -> CommandResult {
    let cipher = services
        .ciphers
        .get(id)
        .await?
        .ok_or(CommandError::NotFound)?;
    Ok(Response::success_with(cipher))
}

pub(crate) async fn refetch_folder(services: &Services, id: Uuid) -> CommandResult {
    let folder = services
        .folders
        .get(id)
        .await?
        .ok_or(CommandError::NotFound)?;
    Ok(Response::success_with(folder))
}

pub(crate) async fn refetch_org_collection(
    services: &Services,
    organization_id: Uuid,
    id: Uuid,
) -> CommandResult {
    let collection = services
        .collections
        .get_org(organization_id, id)
        .await?
        .ok_or(CommandError::NotFound)?;
    Ok(Response::success_with(collection))
}
