//! The response envelope returned by every command.

use base64::{Engine, engine::general_purpose::STANDARD};
use serde::{Serialize, Serializer};
use thiserror::Error;

use crate::{
    payload::PayloadError,
    services::{
        AccountStatus, AttachmentView, CipherView, CollectionView, FolderView, OrgCollectionView,
        OrganizationUserView, OrganizationView, SendView, ServiceError,
    },
};

const MULTIPLE_RESULTS_MESSAGE: &str = "More than one result was found. Try getting a specific \
                                        object by `id` instead. The following objects were found:";

/// Outcome of a single command invocation. A failed response never carries data.
#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Response {
    pub success: bool,
    pub message: Option<String>,
    pub data: Option<ResponseData>,
}

/// Payload of a successful response, tagged with its `object` kind.
#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(tag = "object", rename_all = "kebab-case")]
pub enum ResponseData {
    Item(CipherView),
    Folder(FolderView),
    Collection(CollectionView),
    OrgCollection(OrgCollectionView),
    Organization(OrganizationView),
    OrgMember(OrganizationUserView),
    Send(SendView),
    Attachment(AttachmentView),
    Template {
        template: serde_json::Value,
    },
    List {
        data: Vec<ResponseData>,
    },
    #[serde(rename_all = "camelCase")]
    Message {
        title: String,
        message: Option<String>,
        raw: Option<String>,
    },
    String {
        data: String,
    },
    Status {
        template: AccountStatus,
    },
    #[serde(rename_all = "camelCase")]
    File {
        file_name: String,
        #[serde(serialize_with = "serialize_base64")]
        data: Vec<u8>,
    },
    MultipleResults {
        ids: Vec<String>,
    },
}

fn serialize_base64<S: Serializer>(data: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&STANDARD.encode(data))
}

impl ResponseData {
    pub fn list<T>(items: impl IntoIterator<Item = T>) -> Self
    where
        T: Into<ResponseData>,
    {
        ResponseData::List {
            data: items.into_iter().map(Into::into).collect(),
        }
    }

    pub fn message(title: impl Into<String>, message: Option<String>) -> Self {
        ResponseData::Message {
            title: title.into(),
            message,
            raw: None,
        }
    }

    pub fn string(data: impl Into<String>) -> Self {
        ResponseData::String { data: data.into() }
    }
}

macro_rules! impl_from_view {
    ($($view:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$view> for ResponseData {
                fn from(value: $view) -> Self {
                    ResponseData::$variant(value)
                }
            }
        )*
    };
}

impl_from_view! {
    CipherView => Item,
    FolderView => Folder,
    CollectionView => Collection,
    OrgCollectionView => OrgCollection,
    OrganizationView => Organization,
    OrganizationUserView => OrgMember,
    SendView => Send,
    AttachmentView => Attachment,
}

impl Response {
    pub fn success() -> Self {
        Self {
            success: true,
            message: None,
            data: None,
        }
    }

    pub fn success_with(data: impl Into<ResponseData>) -> Self {
        Self {
            success: true,
            message: None,
            data: Some(data.into()),
        }
    }

    pub fn error(message: impl std::fmt::Display) -> Self {
        Self {
            success: false,
            message: Some(message.to_string()),
            data: None,
        }
    }

    pub fn not_found() -> Self {
        Self::error("Not found.")
    }

    pub fn bad_request(message: impl std::fmt::Display) -> Self {
        Self::error(message)
    }

    /// Success-shaped outcome listing the candidates of an ambiguous search.
    pub fn multiple_results(ids: Vec<String>) -> Self {
        let mut message = MULTIPLE_RESULTS_MESSAGE.to_owned();
        for id in &ids {
            message.push('\n');
            message.push_str(id);
        }

        Self {
            success: true,
            message: Some(message),
            data: Some(ResponseData::MultipleResults { ids }),
        }
    }

    pub fn is_multiple_results(&self) -> bool {
        matches!(self.data, Some(ResponseData::MultipleResults { .. }))
    }
}

/// Failure produced by a command handler before it could build a successful [`Response`].
#[derive(Debug, Error)]
pub enum CommandError {
    #[error("{0}")]
    BadRequest(String),
    #[error("Not found.")]
    NotFound,
    #[error("Premium status is required to use this feature.")]
    PremiumRequired,
    #[error("Vault is locked.")]
    Locked,
    #[error(transparent)]
    Service(#[from] ServiceError),
    #[error(transparent)]
    Payload(#[from] PayloadError),
    #[error("More than one result was found.")]
    MultipleResults(Vec<String>),
}

impl CommandError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        CommandError::BadRequest(message.into())
    }
}

impl From<CommandError> for Response {
    fn from(error: CommandError) -> Self {
        match error {
            CommandError::NotFound => Response::not_found(),
            CommandError::BadRequest(message) => Response::bad_request(message),
            CommandError::MultipleResults(ids) => Response::multiple_results(ids),
            e => Response::error(e),
        }
    }
}

pub type CommandResult = Result<Response, CommandError>;
