//! Decrypted views handed out by the collaborator services, plus the request shapes accepted by
//! `create`/`edit`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_repr::{Deserialize_repr, Serialize_repr};
use uuid::Uuid;

#[derive(Clone, Copy, Serialize_repr, Deserialize_repr, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum CipherType {
    Login = 1,
    SecureNote = 2,
    Card = 3,
    Identity = 4,
    SshKey = 5,
}

#[derive(Clone, Copy, Serialize_repr, Deserialize_repr, Debug, PartialEq, Eq, Default)]
#[repr(u8)]
pub enum CipherRepromptType {
    #[default]
    None = 0,
    Password = 1,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct LoginUriView {
    pub uri: Option<String>,
    pub r#match: Option<u8>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct LoginView {
    pub username: Option<String>,
    pub password: Option<String>,
    pub password_revision_date: Option<DateTime<Utc>>,
    pub uris: Vec<LoginUriView>,
    pub totp: Option<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct CardView {
    pub cardholder_name: Option<String>,
    pub exp_month: Option<String>,
    pub exp_year: Option<String>,
    pub code: Option<String>,
    pub brand: Option<String>,
    pub number: Option<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct IdentityView {
    pub title: Option<String>,
    pub first_name: Option<String>,
    pub middle_name: Option<String>,
    pub last_name: Option<String>,
    pub address1: Option<String>,
    pub address2: Option<String>,
    pub address3: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub postal_code: Option<String>,
    pub country: Option<String>,
    pub company: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub ssn: Option<String>,
    pub username: Option<String>,
    pub passport_number: Option<String>,
    pub license_number: Option<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct SecureNoteView {
    pub r#type: u8,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct FieldView {
    pub name: Option<String>,
    pub value: Option<String>,
    pub r#type: u8,
    pub linked_id: Option<u32>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AttachmentView {
    pub id: String,
    pub file_name: Option<String>,
    pub size: Option<String>,
    pub size_name: Option<String>,
    pub url: Option<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CipherView {
    pub id: Option<Uuid>,
    pub organization_id: Option<Uuid>,
    pub folder_id: Option<Uuid>,
    #[serde(default)]
    pub collection_ids: Vec<Uuid>,

    pub r#type: CipherType,
    pub name: String,
    pub notes: Option<String>,

    pub login: Option<LoginView>,
    pub secure_note: Option<SecureNoteView>,
    pub card: Option<CardView>,
    pub identity: Option<IdentityView>,

    #[serde(default)]
    pub favorite: bool,
    #[serde(default)]
    pub reprompt: CipherRepromptType,
    #[serde(default)]
    pub organization_use_totp: bool,
    #[serde(default)]
    pub fields: Vec<FieldView>,
    #[serde(default)]
    pub attachments: Vec<AttachmentView>,

    pub revision_date: DateTime<Utc>,
    pub creation_date: DateTime<Utc>,
    pub deleted_date: Option<DateTime<Utc>>,
}

impl CipherView {
    /// The login username, when this is a login with a non-blank username.
    pub fn login_username(&self) -> Option<&str> {
        non_blank(self.login.as_ref()?.username.as_deref())
    }

    /// The login password, when this is a login with a non-blank password.
    pub fn login_password(&self) -> Option<&str> {
        non_blank(self.login.as_ref()?.password.as_deref())
    }

    /// The first non-blank login uri.
    pub fn login_uri(&self) -> Option<&str> {
        self.login
            .as_ref()?
            .uris
            .iter()
            .find_map(|u| non_blank(u.uri.as_deref()))
    }

    /// The TOTP seed, when set.
    pub fn login_totp(&self) -> Option<&str> {
        non_blank(self.login.as_ref()?.totp.as_deref())
    }

    pub fn is_login(&self) -> bool {
        self.r#type == CipherType::Login
    }

    pub fn is_deleted(&self) -> bool {
        self.deleted_date.is_some()
    }

    /// Short description shown next to the name, mirroring what clients display.
    pub fn subtitle(&self) -> Option<String> {
        match self.r#type {
            CipherType::Login => self.login_username().map(str::to_owned),
            CipherType::Card => {
                let card = self.card.as_ref()?;
                let brand = non_blank(card.brand.as_deref());
                let last4 = non_blank(card.number.as_deref()).map(|n| {
                    let start = n.chars().count().saturating_sub(4);
                    let tail: String = n.chars().skip(start).collect();
                    format!("*{tail}")
                });
                match (brand, last4) {
                    (Some(brand), Some(last4)) => Some(format!("{brand}, {last4}")),
                    (Some(brand), None) => Some(brand.to_owned()),
                    (None, last4) => last4,
                }
            }
            CipherType::Identity => {
                let identity = self.identity.as_ref()?;
                let parts: Vec<&str> = [
                    identity.first_name.as_deref(),
                    identity.last_name.as_deref(),
                ]
                .into_iter()
                .filter_map(non_blank)
                .collect();
                (!parts.is_empty()).then(|| parts.join(" "))
            }
            CipherType::SecureNote | CipherType::SshKey => None,
        }
    }
}

pub(crate) fn non_blank(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.trim().is_empty())
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FolderView {
    pub id: Option<Uuid>,
    pub name: String,
    pub revision_date: DateTime<Utc>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CollectionView {
    pub id: Option<Uuid>,
    pub organization_id: Uuid,
    pub name: String,
    pub external_id: Option<String>,
    #[serde(default)]
    pub hide_passwords: bool,
    #[serde(default)]
    pub read_only: bool,
    #[serde(default)]
    pub manage: bool,
}

/// Group or user access entry on an organization collection.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SelectionReadOnly {
    pub id: Uuid,
    #[serde(default)]
    pub read_only: bool,
    #[serde(default)]
    pub hide_passwords: bool,
    #[serde(default)]
    pub manage: bool,
}

/// A collection as seen through the organization admin endpoints, including its access lists.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct OrgCollectionView {
    pub id: Option<Uuid>,
    pub organization_id: Uuid,
    pub name: String,
    pub external_id: Option<String>,
    #[serde(default)]
    pub groups: Vec<SelectionReadOnly>,
    #[serde(default)]
    pub users: Vec<SelectionReadOnly>,
}

#[derive(Clone, Copy, Serialize_repr, Deserialize_repr, Debug, PartialEq, Eq)]
#[repr(i8)]
pub enum OrganizationUserStatus {
    Revoked = -1,
    Invited = 0,
    Accepted = 1,
    Confirmed = 2,
}

#[derive(Clone, Copy, Serialize_repr, Deserialize_repr, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum OrganizationUserType {
    Owner = 0,
    Admin = 1,
    User = 2,
    Custom = 4,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct OrganizationView {
    pub id: Uuid,
    pub name: String,
    pub status: OrganizationUserStatus,
    pub r#type: OrganizationUserType,
    pub enabled: bool,
    #[serde(default)]
    pub use_totp: bool,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct OrganizationUserView {
    pub id: Uuid,
    pub name: Option<String>,
    pub email: String,
    pub status: OrganizationUserStatus,
    pub r#type: OrganizationUserType,
    #[serde(default)]
    pub two_factor_enabled: bool,
}

#[derive(Clone, Copy, Serialize_repr, Deserialize_repr, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum SendType {
    Text = 0,
    File = 1,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct SendTextView {
    pub text: Option<String>,
    pub hidden: bool,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct SendFileView {
    pub id: Option<String>,
    pub file_name: String,
    pub size: Option<String>,
    pub size_name: Option<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SendView {
    pub id: Option<Uuid>,
    pub access_id: Option<String>,
    pub name: String,
    pub notes: Option<String>,

    /// Replacement password. Only set on requests; never returned by the service.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    #[serde(default)]
    pub has_password: bool,

    pub r#type: SendType,
    pub text: Option<SendTextView>,
    pub file: Option<SendFileView>,

    pub max_access_count: Option<u32>,
    #[serde(default)]
    pub access_count: u32,
    #[serde(default)]
    pub disabled: bool,
    #[serde(default)]
    pub hide_email: bool,

    pub revision_date: DateTime<Utc>,
    pub deletion_date: DateTime<Utc>,
    pub expiration_date: Option<DateTime<Utc>>,
}

/// Account and vault state reported by `status`.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AccountStatus {
    pub server_url: Option<String>,
    pub last_sync: Option<DateTime<Utc>>,
    pub user_email: Option<String>,
    pub user_id: Option<Uuid>,
    pub status: VaultStatus,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum VaultStatus {
    Unauthenticated,
    Locked,
    Unlocked,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PasswordGeneratorRequest {
    pub lowercase: bool,
    pub uppercase: bool,
    pub numbers: bool,
    pub special: bool,
    pub length: u8,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PassphraseGeneratorRequest {
    pub num_words: u8,
    pub word_separator: String,
    pub capitalize: bool,
    pub include_number: bool,
}

// Request payloads. These mirror the templates returned by `get template` and are what
// `create`/`edit` decode from the encoded JSON argument.

/// Item payload for `create item` / `edit item`.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CipherRequest {
    pub organization_id: Option<Uuid>,
    pub collection_ids: Option<Vec<Uuid>>,
    pub folder_id: Option<Uuid>,
    pub r#type: CipherType,
    pub name: String,
    pub notes: Option<String>,
    #[serde(default)]
    pub favorite: bool,
    #[serde(default)]
    pub fields: Vec<FieldView>,
    pub login: Option<LoginView>,
    pub secure_note: Option<SecureNoteView>,
    pub card: Option<CardView>,
    pub identity: Option<IdentityView>,
    #[serde(default)]
    pub reprompt: CipherRepromptType,
}

impl CipherRequest {
    /// Build a fresh view for a create call. Server-managed fields are placeholders.
    pub fn into_view(self, now: DateTime<Utc>) -> CipherView {
        let mut view = CipherView {
            id: None,
            organization_id: None,
            folder_id: None,
            collection_ids: Vec::new(),
            r#type: self.r#type,
            name: String::new(),
            notes: None,
            login: None,
            secure_note: None,
            card: None,
            identity: None,
            favorite: false,
            reprompt: CipherRepromptType::None,
            organization_use_totp: false,
            fields: Vec::new(),
            attachments: Vec::new(),
            revision_date: now,
            creation_date: now,
            deleted_date: None,
        };
        self.apply_to(&mut view);
        view
    }

    /// Overwrite the user-editable fields of an existing view.
    pub fn apply_to(self, view: &mut CipherView) {
        view.organization_id = self.organization_id;
        view.folder_id = self.folder_id;
        if let Some(collection_ids) = self.collection_ids {
            view.collection_ids = collection_ids;
        }
        view.r#type = self.r#type;
        view.name = self.name;
        view.notes = self.notes;
        view.favorite = self.favorite;
        view.fields = self.fields;
        view.reprompt = self.reprompt;

        view.login = None;
        view.secure_note = None;
        view.card = None;
        view.identity = None;
        match self.r#type {
            CipherType::Login => view.login = Some(self.login.unwrap_or_default()),
            CipherType::SecureNote => view.secure_note = Some(self.secure_note.unwrap_or_default()),
            CipherType::Card => view.card = Some(self.card.unwrap_or_default()),
            CipherType::Identity => view.identity = Some(self.identity.unwrap_or_default()),
            CipherType::SshKey => {}
        }
    }
}

/// Folder payload for `create folder` / `edit folder`.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FolderRequest {
    pub name: String,
}

/// Organization collection payload for `create org-collection` / `edit org-collection`.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct OrgCollectionRequest {
    pub organization_id: Uuid,
    pub name: String,
    pub external_id: Option<String>,
    #[serde(default)]
    pub groups: Vec<SelectionReadOnly>,
    #[serde(default)]
    pub users: Vec<SelectionReadOnly>,
}

/// Send payload for `send create` / `send edit`.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SendRequest {
    /// Identifies the send to edit when `--itemid` is not given.
    #[serde(default)]
    pub id: Option<Uuid>,
    pub name: String,
    pub notes: Option<String>,
    pub r#type: SendType,
    pub text: Option<SendTextView>,
    pub file: Option<SendFileView>,
    pub max_access_count: Option<u32>,
    pub deletion_date: Option<DateTime<Utc>>,
    pub expiration_date: Option<DateTime<Utc>>,
    pub password: Option<String>,
    #[serde(default)]
    pub disabled: bool,
    #[serde(default)]
    pub hide_email: bool,
}

impl SendRequest {
    /// Overwrite the user-editable fields of an existing send.
    pub fn apply_to(self, view: &mut SendView) {
        view.name = self.name;
        view.notes = self.notes;
        view.r#type = self.r#type;
        view.text = self.text;
        if self.file.is_some() {
            view.file = self.file;
        }
        view.max_access_count = self.max_access_count;
        if let Some(deletion_date) = self.deletion_date {
            view.deletion_date = deletion_date;
        }
        view.expiration_date = self.expiration_date;
        view.password = self.password;
        view.disabled = self.disabled;
        view.hide_email = self.hide_email;
    }
}
