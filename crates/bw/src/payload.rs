//! Request bodies for `create`, `edit` and `move`.
//!
//! On the command line the body is base64 encoded JSON, passed as an argument or piped through
//! stdin. `bw serve` hands over the already parsed JSON body instead. Handlers decode both the
//! same way.

use base64::{
    Engine, alphabet,
    engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig},
};
use serde::de::DeserializeOwned;
use thiserror::Error;

const LENIENT_BASE64: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    /// Base64 encoded JSON.
    Encoded(String),
    /// JSON body received by the HTTP adapter.
    Parsed(serde_json::Value),
    /// Uploaded file contents.
    File { file_name: String, data: Vec<u8> },
}

#[derive(Debug, Error)]
pub enum PayloadError {
    #[error("`requestJson` was not provided.")]
    Missing,
    #[error("Error parsing the encoded request data.")]
    Base64(#[source] base64::DecodeError),
    #[error("Error parsing the encoded request data.")]
    Utf8(#[source] std::string::FromUtf8Error),
    #[error("Error parsing the encoded request data.")]
    Json(#[source] serde_json::Error),
    /// The HTTP body could not be read as JSON. Holds the reason for logging.
    #[error("Error parsing the encoded request data.")]
    Body(String),
}

impl Payload {
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T, PayloadError> {
        match self {
            Payload::Encoded(encoded) => {
                let bytes = LENIENT_BASE64
                    .decode(encoded.trim())
                    .map_err(PayloadError::Base64)?;
                let text = String::from_utf8(bytes).map_err(PayloadError::Utf8)?;
                serde_json::from_str(&text).map_err(PayloadError::Json)
            }
            Payload::Parsed(value) => {
                serde_json::from_value(value.clone()).map_err(PayloadError::Json)
            }
            Payload::File { .. } => Err(PayloadError::Missing),
        }
    }
}

/// Decode a required payload.
pub fn decode<T: DeserializeOwned>(payload: Option<&Payload>) -> Result<T, PayloadError> {
    payload.ok_or(PayloadError::Missing)?.decode()
}
