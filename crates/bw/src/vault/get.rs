use tracing::debug;

use super::{GetObject, template};
use crate::{
    dispatch::{ensure_premium, require_guid, require_guid_option},
    options::GetOptions,
    platform::save_file,
    resolver::{resolve, resolve_attachment},
    response::{CommandError, CommandResult, Response, ResponseData},
    services::{CipherView, CollectionView, FolderView, OrganizationView, SendView, Services},
    session::SessionContext,
};

pub(crate) async fn run(
    services: &Services,
    session: &SessionContext,
    object: GetObject,
    id: &str,
    options: &GetOptions,
) -> CommandResult {
    match object {
        GetObject::Item => {
            let cipher = resolve::<CipherView, _>(services.ciphers.as_ref(), id)
                .await?
                .into_result()?;
            Ok(Response::success_with(cipher))
        }
        GetObject::Username => {
            let cipher = login_with(services, id, |c| c.login_username().is_some()).await?;
            field(cipher.login_username())
        }
        GetObject::Password => {
            let cipher = login_with(services, id, |c| c.login_password().is_some()).await?;
            field(cipher.login_password())
        }
        GetObject::Uri => {
            let cipher = login_with(services, id, |c| c.login_uri().is_some()).await?;
            field(cipher.login_uri())
        }
        GetObject::Totp => get_totp(services, id).await,
        GetObject::Notes => {
            let cipher = resolve::<CipherView, _>(services.ciphers.as_ref(), id)
                .await?
                .filter(|c| crate::services::non_blank(c.notes.as_deref()).is_some())
                .into_result()?;
            field(crate::services::non_blank(cipher.notes.as_deref()))
        }
        GetObject::Exposed => {
            let cipher = login_with(services, id, |c| c.login_password().is_some()).await?;
            let password = cipher.login_password().ok_or(CommandError::NotFound)?;
            let count = services.audit.password_leaked(password.to_owned()).await?;
            Ok(Response::success_with(ResponseData::string(count.to_string())))
        }
        GetObject::Attachment => get_attachment(services, session, id, options).await,
        GetObject::Folder => {
            let folder = resolve::<FolderView, _>(services.folders.as_ref(), id)
                .await?
                .into_result()?;
            Ok(Response::success_with(folder))
        }
        GetObject::Collection => {
            let collection = resolve::<CollectionView, _>(services.collections.as_ref(), id)
                .await?
                .into_result()?;
            Ok(Response::success_with(collection))
        }
        GetObject::OrgCollection => {
            let organization_id =
                require_guid_option(options.organization_id.as_deref(), "organizationid")?;
            let id = require_guid(id)?;
            let collection = services
                .collections
                .get_org(organization_id, id)
                .await?
                .ok_or(CommandError::NotFound)?;
            Ok(Response::success_with(collection))
        }
        GetObject::Organization => {
            let organization = resolve::<OrganizationView, _>(services.organizations.as_ref(), id)
                .await?
                .into_result()?;
            Ok(Response::success_with(organization))
        }
        GetObject::Template => template::get(id),
        GetObject::Fingerprint => {
            let user_id = if id == "me" {
                None
            } else {
                Some(uuid::Uuid::parse_str(id).map_err(|_| CommandError::NotFound)?)
            };
            let fingerprint = services.crypto.fingerprint(user_id).await?;
            Ok(Response::success_with(ResponseData::string(fingerprint)))
        }
        GetObject::Send => {
            let send = resolve::<SendView, _>(services.sends.as_ref(), id)
                .await?
                .into_result()?;
            Ok(Response::success_with(send))
        }
    }
}

/// Resolve a cipher for one of the login field getters. Ambiguous searches are narrowed to the
/// logins that actually have the requested field.
async fn login_with(
    services: &Services,
    id: &str,
    has_field: impl Fn(&CipherView) -> bool,
) -> Result<CipherView, CommandError> {
    let cipher = resolve::<CipherView, _>(services.ciphers.as_ref(), id)
        .await?
        .filter(|c| c.is_login() && has_field(c))
        .into_result()?;

    if !cipher.is_login() {
        return Err(CommandError::bad_request("Not a login."));
    }
    Ok(cipher)
}

fn field(value: Option<&str>) -> CommandResult {
    let value = value.ok_or(CommandError::NotFound)?;
    Ok(Response::success_with(ResponseData::string(value)))
}

async fn get_totp(services: &Services, id: &str) -> CommandResult {
    let cipher = login_with(services, id, |c| c.login_totp().is_some()).await?;
    let key = cipher.login_totp().ok_or(CommandError::NotFound)?.to_owned();

    if !services.account.can_access_premium().await? {
        let org_allows_totp = cipher.organization_id.is_some() && cipher.organization_use_totp;
        if !org_allows_totp {
            return Err(CommandError::PremiumRequired);
        }
    }

    let code = services.totp.get_code(key).await?;
    Ok(Response::success_with(ResponseData::string(code)))
}

async fn get_attachment(
    services: &Services,
    session: &SessionContext,
    id: &str,
    options: &GetOptions,
) -> CommandResult {
    let item_id = options
        .item_id
        .as_deref()
        .ok_or_else(|| CommandError::bad_request("--itemid <itemid> required."))?;

    let cipher = resolve::<CipherView, _>(services.ciphers.as_ref(), &item_id.to_lowercase())
        .await?
        .into_result()?;
    if cipher.attachments.is_empty() {
        return Err(CommandError::bad_request(
            "No attachments available for this item.",
        ));
    }

    let attachment = resolve_attachment(&cipher.attachments, id).into_result()?;

    if cipher.organization_id.is_none() {
        ensure_premium(services).await?;
    }

    let Some(cipher_id) = cipher.id else {
        return Err(CommandError::NotFound);
    };
    debug!(%cipher_id, attachment = attachment.id, "Downloading attachment");
    let data = services
        .ciphers
        .download_attachment(cipher_id, attachment.id.clone())
        .await?;
    let file_name = attachment.file_name.unwrap_or(attachment.id);

    // The server hands the contents back and never writes to its own disk
    match options.output.as_deref().filter(|_| !session.serve) {
        Some(output) => save_file(output, &file_name, &data),
        None => Ok(Response::success_with(ResponseData::File { file_name, data })),
    }
}

#[cfg(test)]
mod tests {
    use uuid::{Uuid, uuid};

    use super::*;
    use crate::{
        dispatch::{CommandRequest, Verb, tests::Mocks},
        options::OptionBag,
        vault::test_support::{attachment, login_with as cipher_login, secure_note},
    };

    const A: Uuid = uuid!("11111111-1111-1111-1111-111111111111");
    const B: Uuid = uuid!("22222222-2222-2222-2222-222222222222");
    const C: Uuid = uuid!("33333333-3333-3333-3333-333333333333");
    const ORG: Uuid = uuid!("bbbbbbbb-0000-0000-0000-000000000001");

    fn get(object: &str, id: &str) -> CommandRequest {
        CommandRequest::new(Verb::Get)
            .object(object)
            .id(Some(id.to_owned()))
    }

    fn string_data(response: &Response) -> &str {
        match &response.data {
            Some(ResponseData::String { data }) => data,
            other => panic!("unexpected {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_get_item_by_uppercase_guid() {
        let mut mocks = Mocks::unlocked();
        mocks
            .ciphers
            .expect_get()
            .withf(|id| *id == A)
            .times(1)
            .returning(|id| Ok(Some(cipher_login(id, "GitHub", None, None, None))));
        mocks.ciphers.expect_list().never();

        let response = mocks
            .dispatch(get("item", &A.to_string().to_uppercase()))
            .await;
        assert!(matches!(response.data, Some(ResponseData::Item(c)) if c.id == Some(A)));
    }

    #[tokio::test]
    async fn test_get_item_ambiguous_search() {
        let mut mocks = Mocks::unlocked();
        mocks.ciphers.expect_list().returning(|| {
            Ok(vec![
                cipher_login(B, "mail work", None, None, None),
                cipher_login(A, "mail home", None, None, None),
            ])
        });

        let response = mocks.dispatch(get("item", "mail")).await;
        assert!(response.success);
        match response.data {
            Some(ResponseData::MultipleResults { ids }) => {
                assert_eq!(ids, vec![B.to_string(), A.to_string()]);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_get_username_filter_promotes_single_candidate() {
        let mut mocks = Mocks::unlocked();
        mocks.ciphers.expect_list().returning(|| {
            Ok(vec![
                cipher_login(A, "mail", None, None, None),
                cipher_login(B, "mail", Some("alice"), None, None),
                cipher_login(C, "mail", Some(" "), None, None),
            ])
        });

        let response = mocks.dispatch(get("username", "mail")).await;
        assert!(response.success);
        assert_eq!(string_data(&response), "alice");
    }

    #[tokio::test]
    async fn test_get_password_not_a_login() {
        let mut mocks = Mocks::unlocked();
        mocks
            .ciphers
            .expect_get()
            .returning(|id| Ok(Some(secure_note(id, "Note"))));

        let response = mocks.dispatch(get("password", &A.to_string())).await;
        assert!(!response.success);
        assert_eq!(response.message.as_deref(), Some("Not a login."));
    }

    #[tokio::test]
    async fn test_get_blank_password_is_not_found() {
        let mut mocks = Mocks::unlocked();
        mocks
            .ciphers
            .expect_get()
            .returning(|id| Ok(Some(cipher_login(id, "GitHub", Some("alice"), Some(""), None))));

        let response = mocks.dispatch(get("password", &A.to_string())).await;
        assert_eq!(response.message.as_deref(), Some("Not found."));
    }

    #[tokio::test]
    async fn test_get_totp_requires_premium() {
        let mut mocks = Mocks::unlocked();
        mocks.ciphers.expect_get().returning(|id| {
            let mut cipher = cipher_login(id, "GitHub", None, None, None);
            if let Some(login) = cipher.login.as_mut() {
                login.totp = Some("JBSWY3DPEHPK3PXP".to_owned());
            }
            Ok(Some(cipher))
        });
        mocks
            .account
            .expect_can_access_premium()
            .returning(|| Ok(false));
        mocks.totp.expect_get_code().never();

        let response = mocks.dispatch(get("totp", &A.to_string())).await;
        assert_eq!(
            response.message.as_deref(),
            Some("Premium status is required to use this feature.")
        );
    }

    #[tokio::test]
    async fn test_get_totp_allowed_by_organization() {
        let mut mocks = Mocks::unlocked();
        mocks.ciphers.expect_get().returning(|id| {
            let mut cipher = cipher_login(id, "GitHub", None, None, None);
            cipher.organization_id = Some(ORG);
            cipher.organization_use_totp = true;
            if let Some(login) = cipher.login.as_mut() {
                login.totp = Some("JBSWY3DPEHPK3PXP".to_owned());
            }
            Ok(Some(cipher))
        });
        mocks
            .account
            .expect_can_access_premium()
            .returning(|| Ok(false));
        mocks
            .totp
            .expect_get_code()
            .withf(|key| key == "JBSWY3DPEHPK3PXP")
            .returning(|_| Ok("123456".to_owned()));

        let response = mocks.dispatch(get("totp", &A.to_string())).await;
        assert_eq!(string_data(&response), "123456");
    }

    #[tokio::test]
    async fn test_get_exposed() {
        let mut mocks = Mocks::unlocked();
        mocks
            .ciphers
            .expect_get()
            .returning(|id| Ok(Some(cipher_login(id, "GitHub", None, Some("password"), None))));
        mocks
            .audit
            .expect_password_leaked()
            .withf(|password| password == "password")
            .returning(|_| Ok(42));

        let response = mocks.dispatch(get("exposed", &A.to_string())).await;
        assert_eq!(string_data(&response), "42");
    }

    #[tokio::test]
    async fn test_get_org_collection_rejects_non_guid_before_any_call() {
        let mut mocks = Mocks::unlocked();
        mocks.collections.expect_get_org().never();

        let mut options = OptionBag::new();
        options.insert("organizationid", ORG.to_string());
        let response = mocks
            .dispatch(get("org-collection", "not-a-guid").options(options))
            .await;
        assert!(!response.success);
        assert_eq!(response.message.as_deref(), Some("`not-a-guid` is not a GUID."));
    }

    #[tokio::test]
    async fn test_get_attachment_returns_file() {
        let mut mocks = Mocks::unlocked();
        mocks.ciphers.expect_get().returning(|id| {
            let mut cipher = cipher_login(id, "GitHub", None, None, None);
            cipher.attachments = vec![
                attachment("att1", "codes.txt"),
                attachment("att2", "old codes.txt"),
            ];
            Ok(Some(cipher))
        });
        mocks
            .account
            .expect_can_access_premium()
            .returning(|| Ok(true));
        mocks
            .ciphers
            .expect_download_attachment()
            .withf(|id, attachment_id| *id == A && attachment_id == "att1")
            .returning(|_, _| Ok(b"codes".to_vec()));

        let mut options = OptionBag::new();
        options.insert("itemid", A.to_string());
        let response = mocks
            .dispatch(get("attachment", "codes.txt").options(options))
            .await;
        match response.data {
            Some(ResponseData::File { file_name, data }) => {
                assert_eq!(file_name, "codes.txt");
                assert_eq!(data, b"codes");
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_get_attachment_saves_to_output() {
        let dir = tempfile::tempdir().unwrap();
        let mut mocks = Mocks::unlocked();
        mocks.ciphers.expect_get().returning(|id| {
            let mut cipher = cipher_login(id, "GitHub", None, None, None);
            cipher.organization_id = Some(ORG);
            cipher.attachments = vec![attachment("att1", "codes.txt")];
            Ok(Some(cipher))
        });
        mocks.account.expect_can_access_premium().never();
        mocks
            .ciphers
            .expect_download_attachment()
            .returning(|_, _| Ok(b"codes".to_vec()));

        let mut options = OptionBag::new();
        options
            .insert("itemid", A.to_string())
            .insert("output", format!("{}/", dir.path().display()));
        let response = mocks
            .dispatch(get("attachment", "att1").options(options))
            .await;
        assert!(response.success, "{:?}", response.message);
        let saved = std::fs::read(dir.path().join("codes.txt")).unwrap();
        assert_eq!(saved, b"codes");
    }

    #[tokio::test]
    async fn test_get_attachment_ignores_output_when_serving() {
        let dir = tempfile::tempdir().unwrap();
        let mut mocks = Mocks::unlocked();
        mocks.ciphers.expect_get().returning(|id| {
            let mut cipher = cipher_login(id, "GitHub", None, None, None);
            cipher.organization_id = Some(ORG);
            cipher.attachments = vec![attachment("att1", "codes.txt")];
            Ok(Some(cipher))
        });
        mocks
            .ciphers
            .expect_download_attachment()
            .returning(|_, _| Ok(b"codes".to_vec()));

        let target = dir.path().join("written.txt");
        let mut options = OptionBag::new();
        options
            .insert("itemid", A.to_string())
            .insert("output", target.display().to_string());
        let session = SessionContext::for_serve(Some("key".to_owned()));
        let response = mocks
            .dispatch_with(get("attachment", "att1").options(options), &session)
            .await;

        assert!(matches!(
            response.data,
            Some(ResponseData::File { ref file_name, .. }) if file_name == "codes.txt"
        ));
        assert!(!target.exists());
    }

    #[tokio::test]
    async fn test_get_attachment_requires_item_id() {
        let response = Mocks::unlocked()
            .dispatch(get("attachment", "codes.txt"))
            .await;
        assert_eq!(
            response.message.as_deref(),
            Some("--itemid <itemid> required.")
        );
    }

    #[tokio::test]
    async fn test_get_fingerprint_of_current_user() {
        let mut mocks = Mocks::unlocked();
        mocks
            .crypto
            .expect_fingerprint()
            .withf(|user_id| user_id.is_none())
            .returning(|_| Ok("alpha-beta-gamma-delta-echo".to_owned()));

        let response = mocks.dispatch(get("fingerprint", "me")).await;
        assert_eq!(string_data(&response), "alpha-beta-gamma-delta-echo");
    }
}
