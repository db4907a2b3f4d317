//! Local vault backend.
//!
//! A single JSON document under the CLI config directory stands in for the remote vault. It
//! implements every collaborator trait so the binary works without a server. Nothing here is
//! encrypted at rest; only a PBKDF2 password verifier and a digest of the current session key
//! are stored.

use std::{
    collections::BTreeMap,
    path::{Path, PathBuf},
    sync::Mutex,
};

use async_trait::async_trait;
use base64::{Engine, engine::general_purpose::STANDARD};
use chrono::{DateTime, Utc};
use data_encoding::HEXLOWER;
use hmac::Hmac;
use rand::{Rng, RngCore, distributions::Alphanumeric};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;
use tracing::{debug, info};
use uuid::Uuid;

use super::{
    AccountService, AccountStatus, CipherService, CipherView, CollectionService, CollectionView,
    CryptoService, FolderService, FolderView, OrgCollectionRequest, OrgCollectionView,
    OrganizationService, OrganizationUserStatus, OrganizationUserView, OrganizationView,
    SendFileView, SendService, SendType, SendView, ServiceError, SyncService, VaultStatus,
};

mod audit;
mod generator;
mod totp;
mod wordlist;

const STATE_FILE_NAME: &str = "vault.json";
const KDF_ITERATIONS: u32 = 600_000;

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
struct LocalAccount {
    id: Uuid,
    email: String,
    salt: String,
    kdf_iterations: u32,
    password_verifier: String,
    #[serde(default = "default_premium")]
    premium: bool,
    logged_in: bool,
}

fn default_premium() -> bool {
    true
}

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
struct MemberRecord {
    organization_id: Uuid,
    member: OrganizationUserView,
}

#[derive(Serialize, Deserialize, Debug, Default)]
#[serde(rename_all = "camelCase", default)]
struct VaultState {
    account: Option<LocalAccount>,
    session_digest: Option<String>,
    last_sync: Option<DateTime<Utc>>,
    ciphers: Vec<CipherView>,
    folders: Vec<FolderView>,
    collections: Vec<OrgCollectionView>,
    organizations: Vec<OrganizationView>,
    members: Vec<MemberRecord>,
    sends: Vec<SendView>,
    /// Base64 blobs keyed by `{owner_id}/{file_id}`.
    files: BTreeMap<String, String>,
}

/// File-backed implementation of every collaborator service.
pub struct LocalVault {
    path: Option<PathBuf>,
    state: Mutex<VaultState>,
}

impl LocalVault {
    /// Open the vault stored in `dir`, starting empty when no state file exists yet.
    pub fn open(dir: &Path) -> Result<Self, ServiceError> {
        let path = dir.join(STATE_FILE_NAME);
        let state = if path.exists() {
            let content = std::fs::read_to_string(&path)?;
            serde_json::from_str(&content)?
        } else {
            debug!(?path, "No vault state found, starting empty");
            VaultState::default()
        };

        Ok(Self {
            path: Some(path),
            state: Mutex::new(state),
        })
    }

    /// A vault that is never written to disk.
    #[cfg(test)]
    pub fn in_memory() -> Self {
        Self {
            path: None,
            state: Mutex::new(VaultState::default()),
        }
    }

    fn read<R>(&self, f: impl FnOnce(&VaultState) -> R) -> Result<R, ServiceError> {
        let state = self
            .state
            .lock()
            .map_err(|_| ServiceError::Api("Vault state is unavailable.".to_owned()))?;
        Ok(f(&state))
    }

    fn write<R>(
        &self,
        f: impl FnOnce(&mut VaultState) -> Result<R, ServiceError>,
    ) -> Result<R, ServiceError> {
        let mut state = self
            .state
            .lock()
            .map_err(|_| ServiceError::Api("Vault state is unavailable.".to_owned()))?;
        let result = f(&mut state)?;
        self.persist(&state)?;
        Ok(result)
    }

    fn persist(&self, state: &VaultState) -> Result<(), ServiceError> {
        let Some(path) = &self.path else {
            return Ok(());
        };

        let json = serde_json::to_string_pretty(state)?;
        std::fs::write(path, json)?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))?;
        }

        Ok(())
    }

    fn issue_session(state: &mut VaultState) -> String {
        let mut key = [0u8; 64];
        rand::thread_rng().fill_bytes(&mut key);
        let session_key = STANDARD.encode(key);
        state.session_digest = Some(digest(&session_key));
        session_key
    }

    #[cfg(test)]
    pub(crate) fn seed(
        &self,
        f: impl FnOnce(&mut SeedState<'_>),
    ) -> Result<(), ServiceError> {
        self.write(|state| {
            f(&mut SeedState(state));
            Ok(())
        })
    }
}

/// Test access to the raw vault contents.
#[cfg(test)]
pub(crate) struct SeedState<'a>(&'a mut VaultState);

#[cfg(test)]
impl SeedState<'_> {
    pub(crate) fn cipher(&mut self, cipher: CipherView) {
        self.0.ciphers.push(cipher);
    }
    pub(crate) fn folder(&mut self, folder: FolderView) {
        self.0.folders.push(folder);
    }
    pub(crate) fn org_collection(&mut self, collection: OrgCollectionView) {
        self.0.collections.push(collection);
    }
    pub(crate) fn organization(&mut self, organization: OrganizationView) {
        self.0.organizations.push(organization);
    }
    pub(crate) fn member(&mut self, organization_id: Uuid, member: OrganizationUserView) {
        self.0.members.push(MemberRecord {
            organization_id,
            member,
        });
    }
    pub(crate) fn send(&mut self, send: SendView) {
        self.0.sends.push(send);
    }
    pub(crate) fn file(&mut self, owner_id: Uuid, file_id: &str, data: &[u8]) {
        self.0
            .files
            .insert(format!("{owner_id}/{file_id}"), STANDARD.encode(data));
    }
    pub(crate) fn premium(&mut self, premium: bool) {
        if let Some(account) = self.0.account.as_mut() {
            account.premium = premium;
        }
    }
}

fn digest(value: &str) -> String {
    HEXLOWER.encode(&Sha256::digest(value.as_bytes()))
}

fn password_verifier(salt: &str, password: &str, iterations: u32) -> Result<String, ServiceError> {
    let derived = pbkdf2::pbkdf2_array::<Hmac<Sha256>, 32>(
        password.as_bytes(),
        salt.as_bytes(),
        iterations,
    )
    .map_err(|e| ServiceError::Api(format!("Key derivation failed: {e}")))?;
    Ok(HEXLOWER.encode(&derived))
}

fn constant_time_eq(a: &str, b: &str) -> bool {
    a.as_bytes().ct_eq(b.as_bytes()).into()
}

impl LocalAccount {
    fn verify(&self, password: &str) -> Result<bool, ServiceError> {
        let candidate = password_verifier(&self.salt, password, self.kdf_iterations)?;
        Ok(constant_time_eq(&candidate, &self.password_verifier))
    }
}

fn random_id(len: usize) -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(len)
        .map(|c| char::from(c).to_ascii_lowercase())
        .collect()
}

fn size_name(size: usize) -> String {
    const UNITS: [&str; 4] = ["Bytes", "KB", "MB", "GB"];
    let mut value = size as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{size} {}", UNITS[0])
    } else {
        format!("{:.1} {}", value, UNITS[unit])
    }
}

fn host_of(uri: &str) -> Option<String> {
    let parsed = reqwest::Url::parse(uri)
        .or_else(|_| reqwest::Url::parse(&format!("http://{uri}")))
        .ok()?;
    let host = parsed.host_str()?.to_lowercase();
    Some(host.strip_prefix("www.").map(str::to_owned).unwrap_or(host))
}

fn not_found(what: &'static str) -> ServiceError {
    ServiceError::NotFound(what)
}

#[async_trait]
impl CipherService for LocalVault {
    async fn get(&self, id: Uuid) -> Result<Option<CipherView>, ServiceError> {
        self.read(|s| s.ciphers.iter().find(|c| c.id == Some(id)).cloned())
    }

    async fn list(&self) -> Result<Vec<CipherView>, ServiceError> {
        self.read(|s| s.ciphers.clone())
    }

    async fn list_for_url(&self, url: String) -> Result<Vec<CipherView>, ServiceError> {
        let Some(host) = host_of(&url) else {
            return Ok(Vec::new());
        };

        self.read(|s| {
            s.ciphers
                .iter()
                .filter(|c| !c.is_deleted())
                .filter(|c| {
                    c.login.iter().flat_map(|l| l.uris.iter()).any(|u| {
                        u.uri
                            .as_deref()
                            .and_then(host_of)
                            .is_some_and(|h| h == host || host.ends_with(&format!(".{h}")))
                    })
                })
                .cloned()
                .collect()
        })
    }

    async fn create(&self, mut cipher: CipherView) -> Result<Uuid, ServiceError> {
        let id = Uuid::new_v4();
        let now = Utc::now();
        self.write(|s| {
            cipher.id = Some(id);
            cipher.creation_date = now;
            cipher.revision_date = now;
            cipher.deleted_date = None;
            cipher.attachments = Vec::new();
            cipher.organization_use_totp = cipher
                .organization_id
                .and_then(|org| s.organizations.iter().find(|o| o.id == org))
                .is_some_and(|o| o.use_totp);
            s.ciphers.push(cipher);
            Ok(())
        })?;
        info!(%id, "Created cipher");
        Ok(id)
    }

    async fn update(&self, cipher: CipherView) -> Result<(), ServiceError> {
        self.write(|s| {
            let existing = s
                .ciphers
                .iter_mut()
                .find(|c| c.id.is_some() && c.id == cipher.id)
                .ok_or_else(|| not_found("Cipher not found."))?;
            let attachments = std::mem::take(&mut existing.attachments);
            *existing = CipherView {
                attachments,
                creation_date: existing.creation_date,
                deleted_date: existing.deleted_date,
                revision_date: Utc::now(),
                ..cipher
            };
            Ok(())
        })
    }

    async fn update_collections(
        &self,
        id: Uuid,
        collection_ids: Vec<Uuid>,
    ) -> Result<(), ServiceError> {
        self.write(|s| {
            let cipher = s
                .ciphers
                .iter_mut()
                .find(|c| c.id == Some(id))
                .ok_or_else(|| not_found("Cipher not found."))?;
            cipher.collection_ids = collection_ids;
            cipher.revision_date = Utc::now();
            Ok(())
        })
    }

    async fn soft_delete(&self, id: Uuid) -> Result<(), ServiceError> {
        self.write(|s| {
            let cipher = s
                .ciphers
                .iter_mut()
                .find(|c| c.id == Some(id))
                .ok_or_else(|| not_found("Cipher not found."))?;
            cipher.deleted_date = Some(Utc::now());
            Ok(())
        })
    }

    async fn delete(&self, id: Uuid) -> Result<(), ServiceError> {
        self.write(|s| {
            let before = s.ciphers.len();
            s.ciphers.retain(|c| c.id != Some(id));
            if s.ciphers.len() == before {
                return Err(not_found("Cipher not found."));
            }
            let prefix = format!("{id}/");
            s.files.retain(|k, _| !k.starts_with(&prefix));
            Ok(())
        })
    }

    async fn restore(&self, id: Uuid) -> Result<(), ServiceError> {
        self.write(|s| {
            let cipher = s
                .ciphers
                .iter_mut()
                .find(|c| c.id == Some(id))
                .ok_or_else(|| not_found("Cipher not found."))?;
            cipher.deleted_date = None;
            cipher.revision_date = Utc::now();
            Ok(())
        })
    }

    async fn share(
        &self,
        id: Uuid,
        organization_id: Uuid,
        collection_ids: Vec<Uuid>,
    ) -> Result<(), ServiceError> {
        self.write(|s| {
            let use_totp = s
                .organizations
                .iter()
                .find(|o| o.id == organization_id)
                .ok_or_else(|| not_found("Organization not found."))?
                .use_totp;
            let cipher = s
                .ciphers
                .iter_mut()
                .find(|c| c.id == Some(id))
                .ok_or_else(|| not_found("Cipher not found."))?;
            cipher.organization_id = Some(organization_id);
            cipher.collection_ids = collection_ids;
            cipher.organization_use_totp = use_totp;
            cipher.revision_date = Utc::now();
            Ok(())
        })
    }

    async fn save_attachment(
        &self,
        id: Uuid,
        file_name: String,
        data: Vec<u8>,
    ) -> Result<(), ServiceError> {
        self.write(|s| {
            let cipher = s
                .ciphers
                .iter_mut()
                .find(|c| c.id == Some(id))
                .ok_or_else(|| not_found("Cipher not found."))?;
            let attachment_id = random_id(20);
            cipher.attachments.push(super::AttachmentView {
                id: attachment_id.clone(),
                file_name: Some(file_name),
                size: Some(data.len().to_string()),
                size_name: Some(size_name(data.len())),
                url: None,
            });
            cipher.revision_date = Utc::now();
            s.files
                .insert(format!("{id}/{attachment_id}"), STANDARD.encode(&data));
            Ok(())
        })
    }

    async fn delete_attachment(&self, id: Uuid, attachment_id: String) -> Result<(), ServiceError> {
        self.write(|s| {
            let cipher = s
                .ciphers
                .iter_mut()
                .find(|c| c.id == Some(id))
                .ok_or_else(|| not_found("Cipher not found."))?;
            cipher.attachments.retain(|a| a.id != attachment_id);
            cipher.revision_date = Utc::now();
            s.files.remove(&format!("{id}/{attachment_id}"));
            Ok(())
        })
    }

    async fn download_attachment(
        &self,
        id: Uuid,
        attachment_id: String,
    ) -> Result<Vec<u8>, ServiceError> {
        let encoded = self
            .read(|s| s.files.get(&format!("{id}/{attachment_id}")).cloned())?
            .ok_or_else(|| not_found("Attachment not found."))?;
        STANDARD
            .decode(encoded)
            .map_err(|e| ServiceError::Api(format!("Attachment data is corrupt: {e}")))
    }
}

#[async_trait]
impl FolderService for LocalVault {
    async fn get(&self, id: Uuid) -> Result<Option<FolderView>, ServiceError> {
        self.read(|s| s.folders.iter().find(|f| f.id == Some(id)).cloned())
    }

    async fn list(&self) -> Result<Vec<FolderView>, ServiceError> {
        self.read(|s| s.folders.clone())
    }

    async fn create(&self, name: String) -> Result<Uuid, ServiceError> {
        let id = Uuid::new_v4();
        self.write(|s| {
            s.folders.push(FolderView {
                id: Some(id),
                name,
                revision_date: Utc::now(),
            });
            Ok(())
        })?;
        Ok(id)
    }

    async fn update(&self, id: Uuid, name: String) -> Result<(), ServiceError> {
        self.write(|s| {
            let folder = s
                .folders
                .iter_mut()
                .find(|f| f.id == Some(id))
                .ok_or_else(|| not_found("Folder not found."))?;
            folder.name = name;
            folder.revision_date = Utc::now();
            Ok(())
        })
    }

    async fn delete(&self, id: Uuid) -> Result<(), ServiceError> {
        self.write(|s| {
            s.folders.retain(|f| f.id != Some(id));
            for cipher in s.ciphers.iter_mut().filter(|c| c.folder_id == Some(id)) {
                cipher.folder_id = None;
            }
            Ok(())
        })
    }
}

fn user_collection(collection: &OrgCollectionView) -> CollectionView {
    CollectionView {
        id: collection.id,
        organization_id: collection.organization_id,
        name: collection.name.clone(),
        external_id: collection.external_id.clone(),
        hide_passwords: false,
        read_only: false,
        manage: true,
    }
}

#[async_trait]
impl CollectionService for LocalVault {
    async fn get(&self, id: Uuid) -> Result<Option<CollectionView>, ServiceError> {
        self.read(|s| {
            s.collections
                .iter()
                .find(|c| c.id == Some(id))
                .map(user_collection)
        })
    }

    async fn list(&self) -> Result<Vec<CollectionView>, ServiceError> {
        self.read(|s| s.collections.iter().map(user_collection).collect())
    }

    async fn get_org(
        &self,
        organization_id: Uuid,
        id: Uuid,
    ) -> Result<Option<OrgCollectionView>, ServiceError> {
        self.read(|s| {
            s.collections
                .iter()
                .find(|c| c.id == Some(id) && c.organization_id == organization_id)
                .cloned()
        })
    }

    async fn list_org(
        &self,
        organization_id: Uuid,
    ) -> Result<Vec<OrgCollectionView>, ServiceError> {
        self.read(|s| {
            s.collections
                .iter()
                .filter(|c| c.organization_id == organization_id)
                .cloned()
                .collect()
        })
    }

    async fn create_org(
        &self,
        organization_id: Uuid,
        request: OrgCollectionRequest,
    ) -> Result<Uuid, ServiceError> {
        let id = Uuid::new_v4();
        self.write(|s| {
            if !s.organizations.iter().any(|o| o.id == organization_id) {
                return Err(not_found("Organization not found."));
            }
            s.collections.push(OrgCollectionView {
                id: Some(id),
                organization_id,
                name: request.name,
                external_id: request.external_id,
                groups: request.groups,
                users: request.users,
            });
            Ok(())
        })?;
        Ok(id)
    }

    async fn update_org(
        &self,
        organization_id: Uuid,
        id: Uuid,
        request: OrgCollectionRequest,
    ) -> Result<(), ServiceError> {
        self.write(|s| {
            let collection = s
                .collections
                .iter_mut()
                .find(|c| c.id == Some(id) && c.organization_id == organization_id)
                .ok_or_else(|| not_found("Collection not found."))?;
            collection.name = request.name;
            collection.external_id = request.external_id;
            collection.groups = request.groups;
            collection.users = request.users;
            Ok(())
        })
    }

    async fn delete_org(&self, organization_id: Uuid, id: Uuid) -> Result<(), ServiceError> {
        self.write(|s| {
            s.collections
                .retain(|c| !(c.id == Some(id) && c.organization_id == organization_id));
            for cipher in s.ciphers.iter_mut() {
                cipher.collection_ids.retain(|c| *c != id);
            }
            Ok(())
        })
    }
}

#[async_trait]
impl OrganizationService for LocalVault {
    async fn get(&self, id: Uuid) -> Result<Option<OrganizationView>, ServiceError> {
        self.read(|s| s.organizations.iter().find(|o| o.id == id).cloned())
    }

    async fn list(&self) -> Result<Vec<OrganizationView>, ServiceError> {
        self.read(|s| s.organizations.clone())
    }

    async fn list_members(
        &self,
        organization_id: Uuid,
    ) -> Result<Vec<OrganizationUserView>, ServiceError> {
        self.read(|s| {
            s.members
                .iter()
                .filter(|m| m.organization_id == organization_id)
                .map(|m| m.member.clone())
                .collect()
        })
    }

    async fn get_member(
        &self,
        organization_id: Uuid,
        id: Uuid,
    ) -> Result<Option<OrganizationUserView>, ServiceError> {
        self.read(|s| {
            s.members
                .iter()
                .find(|m| m.organization_id == organization_id && m.member.id == id)
                .map(|m| m.member.clone())
        })
    }

    async fn confirm_member(&self, organization_id: Uuid, id: Uuid) -> Result<(), ServiceError> {
        self.write(|s| {
            let record = s
                .members
                .iter_mut()
                .find(|m| m.organization_id == organization_id && m.member.id == id)
                .ok_or_else(|| not_found("Member not found."))?;
            record.member.status = OrganizationUserStatus::Confirmed;
            Ok(())
        })
    }
}

#[async_trait]
impl SendService for LocalVault {
    async fn get(&self, id: Uuid) -> Result<Option<SendView>, ServiceError> {
        self.read(|s| s.sends.iter().find(|x| x.id == Some(id)).cloned())
    }

    async fn list(&self) -> Result<Vec<SendView>, ServiceError> {
        self.read(|s| s.sends.clone())
    }

    async fn create(
        &self,
        mut send: SendView,
        file: Option<Vec<u8>>,
    ) -> Result<Uuid, ServiceError> {
        let id = Uuid::new_v4();
        self.write(|s| {
            send.id = Some(id);
            send.access_id = Some(random_id(22));
            send.access_count = 0;
            send.revision_date = Utc::now();
            send.has_password = send.password.take().is_some();

            if send.r#type == SendType::File {
                let data = file.ok_or_else(|| {
                    ServiceError::Api("File sends require file contents.".to_owned())
                })?;
                let file_id = random_id(20);
                let file_name = send
                    .file
                    .as_ref()
                    .map(|f| f.file_name.clone())
                    .unwrap_or_default();
                send.file = Some(SendFileView {
                    id: Some(file_id.clone()),
                    file_name,
                    size: Some(data.len().to_string()),
                    size_name: Some(size_name(data.len())),
                });
                s.files.insert(format!("{id}/{file_id}"), STANDARD.encode(&data));
            }

            s.sends.push(send);
            Ok(())
        })?;
        Ok(id)
    }

    async fn update(&self, mut send: SendView) -> Result<(), ServiceError> {
        self.write(|s| {
            let existing = s
                .sends
                .iter_mut()
                .find(|x| x.id.is_some() && x.id == send.id)
                .ok_or_else(|| not_found("Send not found."))?;
            send.has_password = send.password.take().is_some() || existing.has_password;
            send.access_id = existing.access_id.clone();
            send.access_count = existing.access_count;
            send.file = existing.file.clone();
            send.revision_date = Utc::now();
            *existing = send;
            Ok(())
        })
    }

    async fn delete(&self, id: Uuid) -> Result<(), ServiceError> {
        self.write(|s| {
            s.sends.retain(|x| x.id != Some(id));
            let prefix = format!("{id}/");
            s.files.retain(|k, _| !k.starts_with(&prefix));
            Ok(())
        })
    }

    async fn remove_password(&self, id: Uuid) -> Result<(), ServiceError> {
        self.write(|s| {
            let send = s
                .sends
                .iter_mut()
                .find(|x| x.id == Some(id))
                .ok_or_else(|| not_found("Send not found."))?;
            send.has_password = false;
            send.revision_date = Utc::now();
            Ok(())
        })
    }

    async fn download_file(&self, id: Uuid) -> Result<Vec<u8>, ServiceError> {
        let encoded = self
            .read(|s| {
                let send = s.sends.iter().find(|x| x.id == Some(id))?;
                let file_id = send.file.as_ref()?.id.as_ref()?;
                s.files.get(&format!("{id}/{file_id}")).cloned()
            })?
            .ok_or_else(|| not_found("Send file not found."))?;
        STANDARD
            .decode(encoded)
            .map_err(|e| ServiceError::Api(format!("Send file data is corrupt: {e}")))
    }
}

#[async_trait]
impl SyncService for LocalVault {
    async fn full_sync(&self, force: bool) -> Result<bool, ServiceError> {
        debug!(force, "Syncing local vault");
        self.write(|s| {
            if s.account.as_ref().map_or(true, |a| !a.logged_in) {
                return Err(ServiceError::NotLoggedIn);
            }
            s.last_sync = Some(Utc::now());
            Ok(true)
        })
    }

    async fn last_sync(&self) -> Result<Option<DateTime<Utc>>, ServiceError> {
        self.read(|s| s.last_sync)
    }
}

#[async_trait]
impl CryptoService for LocalVault {
    async fn login(&self, email: String, password: String) -> Result<String, ServiceError> {
        self.write(|s| {
            match s.account.as_mut() {
                Some(account) => {
                    if !account.email.eq_ignore_ascii_case(&email) || !account.verify(&password)? {
                        return Err(ServiceError::Api(
                            "Username or password is incorrect. Try again.".to_owned(),
                        ));
                    }
                    account.logged_in = true;
                }
                None => {
                    let salt = random_id(16);
                    info!(%email, "Creating local account");
                    s.account = Some(LocalAccount {
                        id: Uuid::new_v4(),
                        email: email.to_lowercase(),
                        password_verifier: password_verifier(&salt, &password, KDF_ITERATIONS)?,
                        kdf_iterations: KDF_ITERATIONS,
                        salt,
                        premium: true,
                        logged_in: true,
                    });
                }
            }
            Ok(Self::issue_session(s))
        })
    }

    async fn logout(&self) -> Result<(), ServiceError> {
        self.write(|s| {
            let account = s.account.as_mut().ok_or(ServiceError::NotLoggedIn)?;
            account.logged_in = false;
            s.session_digest = None;
            Ok(())
        })
    }

    async fn unlock(&self, password: String) -> Result<String, ServiceError> {
        self.write(|s| {
            let account = s
                .account
                .as_ref()
                .filter(|a| a.logged_in)
                .ok_or(ServiceError::NotLoggedIn)?;
            if !account.verify(&password)? {
                return Err(ServiceError::InvalidPassword);
            }
            Ok(Self::issue_session(s))
        })
    }

    async fn lock(&self) -> Result<(), ServiceError> {
        self.write(|s| {
            s.session_digest = None;
            Ok(())
        })
    }

    async fn validate_session(&self, session_key: Option<String>) -> Result<bool, ServiceError> {
        let Some(session_key) = session_key else {
            return Ok(false);
        };
        let candidate = digest(&session_key);
        self.read(|s| {
            s.account.as_ref().is_some_and(|a| a.logged_in)
                && s.session_digest
                    .as_deref()
                    .is_some_and(|stored| constant_time_eq(stored, &candidate))
        })
    }

    async fn fingerprint(&self, user_id: Option<Uuid>) -> Result<String, ServiceError> {
        let user_id = match user_id {
            Some(id) => id,
            None => self
                .read(|s| s.account.as_ref().map(|a| a.id))?
                .ok_or(ServiceError::NotLoggedIn)?,
        };
        Ok(wordlist::fingerprint_phrase(user_id.as_bytes()))
    }
}

#[async_trait]
impl AccountService for LocalVault {
    async fn status(&self, session_key: Option<String>) -> Result<AccountStatus, ServiceError> {
        let unlocked = self.validate_session(session_key).await?;
        self.read(|s| {
            let account = s.account.as_ref().filter(|a| a.logged_in);
            AccountStatus {
                server_url: None,
                last_sync: s.last_sync,
                user_email: account.map(|a| a.email.clone()),
                user_id: account.map(|a| a.id),
                status: match (account, unlocked) {
                    (None, _) => VaultStatus::Unauthenticated,
                    (Some(_), false) => VaultStatus::Locked,
                    (Some(_), true) => VaultStatus::Unlocked,
                },
            }
        })
    }

    async fn can_access_premium(&self) -> Result<bool, ServiceError> {
        self.read(|s| s.account.as_ref().is_some_and(|a| a.premium))
    }
}
