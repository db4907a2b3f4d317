use uuid::Uuid;

use super::ListObject;
use crate::{
    dispatch::require_guid_option,
    options::{IdFilter, ListOptions},
    resolver::search,
    response::{CommandError, CommandResult, Response, ResponseData},
    services::{CipherView, Services},
};

pub(crate) async fn run(
    services: &Services,
    object: ListObject,
    options: &ListOptions,
) -> CommandResult {
    match object {
        ListObject::Items => list_items(services, options).await,
        ListObject::Folders => {
            let folders = search(
                services.folders.list().await?,
                options.search.as_deref().unwrap_or_default(),
            );
            Ok(Response::success_with(ResponseData::list(folders)))
        }
        ListObject::Collections => {
            let mut collections = services.collections.list().await?;
            if let IdFilter::Id(organization_id) = &options.organization_id {
                collections.retain(|c| c.organization_id.to_string() == *organization_id);
            }
            let mut collections =
                search(collections, options.search.as_deref().unwrap_or_default());
            collections.sort_by(|a, b| a.name.cmp(&b.name));
            Ok(Response::success_with(ResponseData::list(collections)))
        }
        ListObject::Organizations => {
            let mut organizations = search(
                services.organizations.list().await?,
                options.search.as_deref().unwrap_or_default(),
            );
            organizations.sort_by(|a, b| a.name.cmp(&b.name));
            Ok(Response::success_with(ResponseData::list(organizations)))
        }
        ListObject::OrgCollections => {
            let organization_id = organization_id(options)?;
            ensure_organization(services, organization_id).await?;

            let mut collections = search(
                services.collections.list_org(organization_id).await?,
                options.search.as_deref().unwrap_or_default(),
            );
            collections.sort_by(|a, b| a.name.cmp(&b.name));
            Ok(Response::success_with(ResponseData::list(collections)))
        }
        ListObject::OrgMembers => {
            let organization_id = organization_id(options)?;
            ensure_organization(services, organization_id).await?;

            let members = search(
                services.organizations.list_members(organization_id).await?,
                options.search.as_deref().unwrap_or_default(),
            );
            Ok(Response::success_with(ResponseData::list(members)))
        }
        ListObject::Sends => {
            let sends = search(
                services.sends.list().await?,
                options.search.as_deref().unwrap_or_default(),
            );
            Ok(Response::success_with(ResponseData::list(sends)))
        }
    }
}

fn organization_id(options: &ListOptions) -> Result<Uuid, CommandError> {
    require_guid_option(options.organization_id_raw().as_deref(), "organizationid")
}

async fn ensure_organization(
    services: &Services,
    organization_id: Uuid,
) -> Result<(), CommandError> {
    match services.organizations.get(organization_id).await? {
        Some(_) => Ok(()),
        None => Err(CommandError::bad_request("Organization not found.")),
    }
}

/// Filters on folder, collection and organization are alternatives: an item is kept when any one
/// of the given filters accepts it.
fn matches_filters(cipher: &CipherView, options: &ListOptions) -> bool {
    if options.trash != cipher.is_deleted() {
        return false;
    }

    let id_matches = |filter: &IdFilter, id: Option<Uuid>| match filter {
        IdFilter::Any => false,
        IdFilter::Null => id.is_none(),
        IdFilter::NotNull => id.is_some(),
        IdFilter::Id(expected) => id.is_some_and(|id| id.to_string() == *expected),
    };

    let collection_matches = match &options.collection_id {
        IdFilter::Any => false,
        IdFilter::Null => cipher.collection_ids.is_empty(),
        IdFilter::NotNull => !cipher.collection_ids.is_empty(),
        IdFilter::Id(expected) => cipher
            .collection_ids
            .iter()
            .any(|id| id.to_string() == *expected),
    };

    let any_filter = options.folder_id.is_set()
        || options.collection_id.is_set()
        || options.organization_id.is_set();

    !any_filter
        || id_matches(&options.folder_id, cipher.folder_id)
        || id_matches(&options.organization_id, cipher.organization_id)
        || collection_matches
}

async fn list_items(services: &Services, options: &ListOptions) -> CommandResult {
    let ciphers = match &options.url {
        Some(url) => services.ciphers.list_for_url(url.clone()).await?,
        None => services.ciphers.list().await?,
    };

    let mut ciphers: Vec<CipherView> = ciphers
        .into_iter()
        .filter(|c| matches_filters(c, options))
        .collect();
    if let Some(term) = &options.search {
        ciphers = search(ciphers, term);
    }

    // Sort by name for consistent output
    ciphers.sort_by(|a, b| a.name.cmp(&b.name));

    Ok(Response::success_with(ResponseData::list(ciphers)))
}
