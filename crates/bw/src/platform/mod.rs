use std::path::{Path, PathBuf};

use base64::{Engine, engine::general_purpose::STANDARD};
use chrono::SecondsFormat;
use tracing::{info, warn};

use crate::{
    options::SyncOptions,
    response::{CommandError, CommandResult, Response, ResponseData},
    services::Services,
    session::SessionContext,
};

pub(crate) mod state;

pub(crate) async fn sync(services: &Services, options: &SyncOptions) -> CommandResult {
    if options.last {
        return Ok(match services.sync.last_sync().await? {
            Some(date) => Response::success_with(ResponseData::string(
                date.to_rfc3339_opts(SecondsFormat::Millis, true),
            )),
            None => Response::success(),
        });
    }

    match services.sync.full_sync(options.force).await {
        Ok(true) => {
            info!("Vault synced");
            Ok(Response::success_with(ResponseData::message(
                "Syncing complete.",
                None,
            )))
        }
        Ok(false) => Err(CommandError::bad_request("Syncing failed.")),
        Err(e) => {
            warn!(%e, "Sync failed");
            Err(CommandError::BadRequest(format!("Syncing failed: {e}")))
        }
    }
}

pub(crate) async fn status(services: &Services, session: &SessionContext) -> CommandResult {
    let template = services
        .account
        .status(session.session_key.clone())
        .await?;
    Ok(Response::success_with(ResponseData::Status { template }))
}

/// Base64 encode raw input, typically JSON piped from `bw get template`.
pub(crate) fn encode(input: &str) -> Response {
    Response::success_with(ResponseData::string(STANDARD.encode(input)))
}

/// Write downloaded file contents to `output`. A trailing separator or an existing directory
/// means the file keeps its own name inside that directory.
///
/// File names come from vault data, so only their last component is used.
pub(crate) fn save_file(output: &str, file_name: &str, data: &[u8]) -> CommandResult {
    let target = Path::new(output);
    let is_dir = output.ends_with(['/', std::path::MAIN_SEPARATOR]) || target.is_dir();
    let path: PathBuf = if is_dir {
        let name = Path::new(file_name).file_name().ok_or_else(|| {
            CommandError::BadRequest(format!("Invalid file name `{file_name}`."))
        })?;
        target.join(name)
    } else {
        target.to_path_buf()
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .map_err(|e| CommandError::BadRequest(format!("Cannot create directory: {e}")))?;
    }
    std::fs::write(&path, data)
        .map_err(|e| CommandError::BadRequest(format!("Cannot save file: {e}")))?;

    let path = path.display().to_string();
    Ok(Response::success_with(ResponseData::Message {
        title: format!("Saved {path}"),
        message: None,
        raw: Some(path),
    }))
}
