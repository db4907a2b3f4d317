use std::path::Path;

use chrono::Utc;
use tracing::debug;

use super::{CreateObject, refetch_cipher, refetch_folder, refetch_org_collection};
use crate::{
    dispatch::{ensure_premium, existing_id, require_guid_option},
    options::CreateOptions,
    payload::{Payload, decode},
    response::{CommandError, CommandResult},
    services::{CipherRequest, FolderRequest, OrgCollectionRequest, Services},
    session::SessionContext,
};

/// Largest file accepted as an attachment.
pub(crate) const MAX_ATTACHMENT_SIZE: usize = 500 * 1024 * 1024;

pub(crate) async fn run(
    services: &Services,
    session: &SessionContext,
    object: CreateObject,
    payload: Option<&Payload>,
    options: &CreateOptions,
) -> CommandResult {
    match object {
        CreateObject::Item => {
            let request: CipherRequest = decode(payload)?;
            let id = services
                .ciphers
                .create(request.into_view(Utc::now()))
                .await?;
            debug!(%id, "Created item");
            refetch_cipher(services, id).await
        }
        CreateObject::Attachment => create_attachment(services, session, payload, options).await,
        CreateObject::Folder => {
            let request: FolderRequest = decode(payload)?;
            let id = services.folders.create(request.name).await?;
            refetch_folder(services, id).await
        }
        CreateObject::OrgCollection => {
            let organization_id =
                require_guid_option(options.organization_id.as_deref(), "organizationid")?;
            let request: OrgCollectionRequest = decode(payload)?;
            if request.organization_id != organization_id {
                return Err(CommandError::bad_request(
                    "`organizationid` option does not match request object.",
                ));
            }

            let id = services
                .collections
                .create_org(organization_id, request)
                .await?;
            refetch_org_collection(services, organization_id, id).await
        }
    }
}

async fn create_attachment(
    services: &Services,
    session: &SessionContext,
    payload: Option<&Payload>,
    options: &CreateOptions,
) -> CommandResult {
    let item_id = options
        .item_id
        .as_deref()
        .ok_or_else(|| CommandError::bad_request("`itemid` option is required."))?;

    let (file_name, data) = match payload {
        Some(Payload::File { file_name, data }) => (file_name.clone(), data.clone()),
        _ if session.serve => return Err(CommandError::bad_request("`file` option is required.")),
        _ => read_attachment_file(options.file.as_deref()).await?,
    };
    if data.len() > MAX_ATTACHMENT_SIZE {
        return Err(CommandError::bad_request("File size cannot exceed 500 MB."));
    }

    let id = existing_id(item_id)?;
    let cipher = services
        .ciphers
        .get(id)
        .await?
        .ok_or(CommandError::NotFound)?;
    if cipher.organization_id.is_none() {
        ensure_premium(services).await?;
    }

    services.ciphers.save_attachment(id, file_name, data).await?;
    refetch_cipher(services, id).await
}

async fn read_attachment_file(path: Option<&str>) -> Result<(String, Vec<u8>), CommandError> {
    let path = path.ok_or_else(|| CommandError::bad_request("`file` option is required."))?;
    let file_name = Path::new(path)
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .ok_or_else(|| CommandError::bad_request("`file` option is required."))?;

    let data = tokio::fs::read(path)
        .await
        .map_err(|e| CommandError::bad_request(format!("Cannot read file {path}: {e}")))?;
    Ok((file_name, data))
}

#[cfg(test)]
mod tests {
    use uuid::{Uuid, uuid};

    use super::*;
    use crate::{
        dispatch::{
            CommandRequest, Verb,
            tests::{Mocks, encoded},
        },
        options::OptionBag,
        response::{Response, ResponseData},
        services::CipherType,
        vault::test_support::{folder, login, org_collection},
    };

    const A: Uuid = uuid!("11111111-1111-1111-1111-111111111111");
    const ORG: Uuid = uuid!("bbbbbbbb-0000-0000-0000-000000000001");

    fn create(object: &str) -> CommandRequest {
        CommandRequest::new(Verb::Create).object(object)
    }

    #[tokio::test]
    async fn test_create_item_returns_stored_item() {
        let mut mocks = Mocks::unlocked();
        mocks
            .ciphers
            .expect_create()
            .withf(|cipher| cipher.name == "GitHub" && cipher.r#type == CipherType::Login)
            .times(1)
            .returning(|_| Ok(A));
        mocks.ciphers.expect_get().withf(|id| *id == A).returning(|id| {
            let mut cipher = login(id, "GitHub");
            cipher.folder_id = Some(uuid!("aaaaaaaa-0000-0000-0000-000000000001"));
            Ok(Some(cipher))
        });

        let response = mocks
            .dispatch(create("item").payload(encoded(r#"{"type":1,"name":"GitHub"}"#)))
            .await;
        match response.data {
            Some(ResponseData::Item(cipher)) => {
                assert_eq!(cipher.id, Some(A));
                assert!(cipher.folder_id.is_some());
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_create_item_with_bad_payload_makes_no_calls() {
        let mut mocks = Mocks::unlocked();
        mocks.ciphers.expect_create().never();

        let response = mocks
            .dispatch(create("item").payload(Some(Payload::Encoded("%%%".to_owned()))))
            .await;
        assert!(!response.success);
        assert_eq!(
            response.message.as_deref(),
            Some("Error parsing the encoded request data.")
        );
    }

    #[tokio::test]
    async fn test_create_folder() {
        let mut mocks = Mocks::unlocked();
        mocks
            .folders
            .expect_create()
            .withf(|name| name == "Work")
            .returning(|_| Ok(A));
        mocks
            .folders
            .expect_get()
            .returning(|id| Ok(Some(folder(id, "Work"))));

        let response = mocks
            .dispatch(create("folder").payload(encoded(r#"{"name":"Work"}"#)))
            .await;
        assert!(matches!(response.data, Some(ResponseData::Folder(f)) if f.name == "Work"));
    }

    #[tokio::test]
    async fn test_create_org_collection_requires_matching_organization() {
        let mut mocks = Mocks::unlocked();
        mocks.collections.expect_create_org().never();

        let mut options = OptionBag::new();
        options.insert("organizationid", ORG.to_string());
        let body = format!(r#"{{"organizationId":"{A}","name":"Team"}}"#);
        let response = mocks
            .dispatch(create("org-collection").options(options).payload(encoded(&body)))
            .await;
        assert_eq!(
            response.message.as_deref(),
            Some("`organizationid` option does not match request object.")
        );
    }

    #[tokio::test]
    async fn test_create_org_collection() {
        let mut mocks = Mocks::unlocked();
        mocks
            .collections
            .expect_create_org()
            .withf(|org, request| *org == ORG && request.name == "Team")
            .returning(|_, _| Ok(A));
        mocks
            .collections
            .expect_get_org()
            .returning(|org, id| Ok(Some(org_collection(id, org, "Team"))));

        let mut options = OptionBag::new();
        options.insert("organizationid", ORG.to_string());
        let body = format!(r#"{{"organizationId":"{ORG}","name":"Team"}}"#);
        let response: Response = mocks
            .dispatch(create("org-collection").options(options).payload(encoded(&body)))
            .await;
        assert!(matches!(response.data, Some(ResponseData::OrgCollection(c)) if c.id == Some(A)));
    }

    #[tokio::test]
    async fn test_create_attachment_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("codes.txt");
        std::fs::write(&path, b"codes").unwrap();

        let mut mocks = Mocks::unlocked();
        mocks
            .ciphers
            .expect_get()
            .returning(|id| Ok(Some(login(id, "GitHub"))));
        mocks
            .account
            .expect_can_access_premium()
            .returning(|| Ok(true));
        mocks
            .ciphers
            .expect_save_attachment()
            .withf(|id, file_name, data| *id == A && file_name == "codes.txt" && data == b"codes")
            .times(1)
            .returning(|_, _, _| Ok(()));

        let mut options = OptionBag::new();
        options
            .insert("itemid", A.to_string())
            .insert("file", path.display().to_string());
        let response = mocks.dispatch(create("attachment").options(options)).await;
        assert!(response.success, "{:?}", response.message);
    }

    #[tokio::test]
    async fn test_create_attachment_requires_premium() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("codes.txt");
        std::fs::write(&path, b"codes").unwrap();

        let mut mocks = Mocks::unlocked();
        mocks
            .ciphers
            .expect_get()
            .returning(|id| Ok(Some(login(id, "GitHub"))));
        mocks
            .account
            .expect_can_access_premium()
            .returning(|| Ok(false));
        mocks.ciphers.expect_save_attachment().never();

        let mut options = OptionBag::new();
        options
            .insert("itemid", A.to_string())
            .insert("file", path.display().to_string());
        let response = mocks.dispatch(create("attachment").options(options)).await;
        assert_eq!(
            response.message.as_deref(),
            Some("Premium status is required to use this feature.")
        );
    }

    #[tokio::test]
    async fn test_create_attachment_requires_options() {
        let response = Mocks::unlocked().dispatch(create("attachment")).await;
        assert_eq!(
            response.message.as_deref(),
            Some("`itemid` option is required.")
        );

        let mut options = OptionBag::new();
        options.insert("itemid", A.to_string());
        let response = Mocks::unlocked()
            .dispatch(create("attachment").options(options))
            .await;
        assert_eq!(response.message.as_deref(), Some("`file` option is required."));
    }
}
