//! Collaborator services the command layer delegates to.
//!
//! Every piece of cryptography, persistence and network traffic happens behind these traits. The
//! commands only validate input, call into a service and shape the result into a
//! [`Response`](crate::response::Response). The traits are object safe so a [`Services`]
//! container can hold them as `Arc<dyn _>`, and tests swap in `mockall` spies.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;
use uuid::Uuid;

pub(crate) mod local;
pub(crate) mod models;

pub(crate) use local::LocalVault;
pub(crate) use models::*;

/// Failure reported by a collaborator. The message is forwarded to the user as-is.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("{0}")]
    Api(String),
    #[error("Invalid master password.")]
    InvalidPassword,
    #[error("You are not logged in.")]
    NotLoggedIn,
    #[error("Vault is locked.")]
    VaultLocked,
    #[error("{0}")]
    NotFound(&'static str),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Serialization(#[from] serde_json::Error),
    #[error(transparent)]
    Http(#[from] reqwest::Error),
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CipherService: Send + Sync {
    async fn get(&self, id: Uuid) -> Result<Option<CipherView>, ServiceError>;
    async fn list(&self) -> Result<Vec<CipherView>, ServiceError>;
    /// Ciphers with a login uri matching the host of `url`.
    async fn list_for_url(&self, url: String) -> Result<Vec<CipherView>, ServiceError>;
    /// Stores a new cipher and returns the id the server assigned to it.
    async fn create(&self, cipher: CipherView) -> Result<Uuid, ServiceError>;
    async fn update(&self, cipher: CipherView) -> Result<(), ServiceError>;
    async fn update_collections(
        &self,
        id: Uuid,
        collection_ids: Vec<Uuid>,
    ) -> Result<(), ServiceError>;
    /// Moves the cipher to the trash.
    async fn soft_delete(&self, id: Uuid) -> Result<(), ServiceError>;
    /// Permanently deletes the cipher.
    async fn delete(&self, id: Uuid) -> Result<(), ServiceError>;
    async fn restore(&self, id: Uuid) -> Result<(), ServiceError>;
    async fn share(
        &self,
        id: Uuid,
        organization_id: Uuid,
        collection_ids: Vec<Uuid>,
    ) -> Result<(), ServiceError>;
    async fn save_attachment(
        &self,
        id: Uuid,
        file_name: String,
        data: Vec<u8>,
    ) -> Result<(), ServiceError>;
    async fn delete_attachment(&self, id: Uuid, attachment_id: String) -> Result<(), ServiceError>;
    async fn download_attachment(
        &self,
        id: Uuid,
        attachment_id: String,
    ) -> Result<Vec<u8>, ServiceError>;
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait FolderService: Send + Sync {
    async fn get(&self, id: Uuid) -> Result<Option<FolderView>, ServiceError>;
    async fn list(&self) -> Result<Vec<FolderView>, ServiceError>;
    async fn create(&self, name: String) -> Result<Uuid, ServiceError>;
    async fn update(&self, id: Uuid, name: String) -> Result<(), ServiceError>;
    async fn delete(&self, id: Uuid) -> Result<(), ServiceError>;
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CollectionService: Send + Sync {
    async fn get(&self, id: Uuid) -> Result<Option<CollectionView>, ServiceError>;
    async fn list(&self) -> Result<Vec<CollectionView>, ServiceError>;
    async fn get_org(
        &self,
        organization_id: Uuid,
        id: Uuid,
    ) -> Result<Option<OrgCollectionView>, ServiceError>;
    async fn list_org(&self, organization_id: Uuid) -> Result<Vec<OrgCollectionView>, ServiceError>;
    async fn create_org(
        &self,
        organization_id: Uuid,
        request: OrgCollectionRequest,
    ) -> Result<Uuid, ServiceError>;
    async fn update_org(
        &self,
        organization_id: Uuid,
        id: Uuid,
        request: OrgCollectionRequest,
    ) -> Result<(), ServiceError>;
    async fn delete_org(&self, organization_id: Uuid, id: Uuid) -> Result<(), ServiceError>;
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait OrganizationService: Send + Sync {
    async fn get(&self, id: Uuid) -> Result<Option<OrganizationView>, ServiceError>;
    async fn list(&self) -> Result<Vec<OrganizationView>, ServiceError>;
    async fn list_members(
        &self,
        organization_id: Uuid,
    ) -> Result<Vec<OrganizationUserView>, ServiceError>;
    async fn get_member(
        &self,
        organization_id: Uuid,
        id: Uuid,
    ) -> Result<Option<OrganizationUserView>, ServiceError>;
    async fn confirm_member(&self, organization_id: Uuid, id: Uuid) -> Result<(), ServiceError>;
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SendService: Send + Sync {
    async fn get(&self, id: Uuid) -> Result<Option<SendView>, ServiceError>;
    async fn list(&self) -> Result<Vec<SendView>, ServiceError>;
    /// Stores a new send, with the file contents for file sends, and returns its id.
    async fn create(&self, send: SendView, file: Option<Vec<u8>>) -> Result<Uuid, ServiceError>;
    async fn update(&self, send: SendView) -> Result<(), ServiceError>;
    async fn delete(&self, id: Uuid) -> Result<(), ServiceError>;
    async fn remove_password(&self, id: Uuid) -> Result<(), ServiceError>;
    /// Contents of a file send.
    async fn download_file(&self, id: Uuid) -> Result<Vec<u8>, ServiceError>;
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SyncService: Send + Sync {
    /// Pulls the latest vault data. Returns whether anything was synced.
    async fn full_sync(&self, force: bool) -> Result<bool, ServiceError>;
    async fn last_sync(&self) -> Result<Option<DateTime<Utc>>, ServiceError>;
}

/// Account level key handling: login, session keys and fingerprints.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CryptoService: Send + Sync {
    /// Authenticates and returns a fresh session key.
    async fn login(&self, email: String, password: String) -> Result<String, ServiceError>;
    async fn logout(&self) -> Result<(), ServiceError>;
    /// Unlocks the vault and returns a fresh session key.
    async fn unlock(&self, password: String) -> Result<String, ServiceError>;
    async fn lock(&self) -> Result<(), ServiceError>;
    /// Whether `session_key` currently unlocks the vault.
    async fn validate_session(&self, session_key: Option<String>) -> Result<bool, ServiceError>;
    /// Fingerprint phrase for `user_id`, or for the current account when `None`.
    async fn fingerprint(&self, user_id: Option<Uuid>) -> Result<String, ServiceError>;
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AccountService: Send + Sync {
    async fn status(&self, session_key: Option<String>) -> Result<AccountStatus, ServiceError>;
    async fn can_access_premium(&self) -> Result<bool, ServiceError>;
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait GeneratorService: Send + Sync {
    async fn password(&self, request: PasswordGeneratorRequest) -> Result<String, ServiceError>;
    async fn passphrase(&self, request: PassphraseGeneratorRequest)
        -> Result<String, ServiceError>;
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TotpService: Send + Sync {
    async fn get_code(&self, key: String) -> Result<String, ServiceError>;
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AuditService: Send + Sync {
    /// Number of times `password` appears in known breaches.
    async fn password_leaked(&self, password: String) -> Result<u32, ServiceError>;
}

/// Container holding every collaborator a command may call.
#[derive(Clone)]
pub struct Services {
    pub ciphers: Arc<dyn CipherService>,
    pub folders: Arc<dyn FolderService>,
    pub collections: Arc<dyn CollectionService>,
    pub organizations: Arc<dyn OrganizationService>,
    pub sends: Arc<dyn SendService>,
    pub sync: Arc<dyn SyncService>,
    pub crypto: Arc<dyn CryptoService>,
    pub account: Arc<dyn AccountService>,
    pub generator: Arc<dyn GeneratorService>,
    pub totp: Arc<dyn TotpService>,
    pub audit: Arc<dyn AuditService>,
}

impl Services {
    /// Wire every service to the same local vault.
    pub fn local(vault: Arc<LocalVault>) -> Self {
        Self {
            ciphers: vault.clone(),
            folders: vault.clone(),
            collections: vault.clone(),
            organizations: vault.clone(),
            sends: vault.clone(),
            sync: vault.clone(),
            crypto: vault.clone(),
            account: vault.clone(),
            generator: vault.clone(),
            totp: vault.clone(),
            audit: vault,
        }
    }
}
