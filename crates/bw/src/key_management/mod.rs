use bitwarden_cli::password_prompt_when_none;
use clap::Args;
use tracing::{debug, info};

use crate::{
    dispatch::{CommandRequest, Verb},
    options::{OptionBag, UnlockOptions},
    response::{CommandError, CommandResult, Response, ResponseData},
    services::Services,
    session::SessionContext,
};

#[derive(Args, Clone)]
pub(crate) struct UnlockArgs {
    pub(crate) password: Option<String>,

    #[arg(long, help = "Environment variable storing your password.")]
    pub(crate) passwordenv: Option<String>,

    #[arg(
        long,
        help = "Path to a file containing your password as its first line."
    )]
    pub(crate) passwordfile: Option<String>,

    #[arg(long, help = "Check lock status.")]
    pub(crate) check: bool,
}

impl UnlockArgs {
    pub(crate) fn into_request(self) -> CommandRequest {
        let mut options = OptionBag::new();
        options
            .insert_opt("passwordenv", self.passwordenv)
            .insert_opt("passwordfile", self.passwordfile)
            .insert_flag("check", self.check);
        CommandRequest::new(Verb::Unlock)
            .id(self.password)
            .options(options)
    }
}

/// Where a master password may come from, in order of precedence.
pub(crate) struct PasswordSource<'a> {
    pub(crate) direct: Option<String>,
    pub(crate) env: Option<&'a str>,
    pub(crate) file: Option<&'a str>,
}

impl PasswordSource<'_> {
    /// Read the password, prompting only when the session allows it.
    pub(crate) async fn read(self, session: &SessionContext) -> Result<String, CommandError> {
        if let Some(password) = self.direct.filter(|p| !p.is_empty()) {
            return Ok(password);
        }

        if let Some(name) = self.env {
            return std::env::var(name)
                .ok()
                .filter(|p| !p.is_empty())
                .ok_or_else(|| {
                    CommandError::BadRequest(format!("Environment variable `{name}` is not set."))
                });
        }

        if let Some(path) = self.file {
            let content = tokio::fs::read_to_string(path)
                .await
                .map_err(|e| CommandError::BadRequest(format!("Cannot read {path}: {e}")))?;
            return content
                .lines()
                .next()
                .filter(|p| !p.is_empty())
                .map(str::to_owned)
                .ok_or_else(|| CommandError::bad_request("Master password is required."));
        }

        if session.can_prompt() {
            return password_prompt_when_none("Master password", None)
                .map_err(|e| CommandError::BadRequest(e.to_string()));
        }

        Err(CommandError::bad_request("Master password is required."))
    }
}

/// The message shown whenever a new session key is handed out.
pub(crate) fn session_key_message(title: &str, session_key: String) -> Response {
    Response::success_with(ResponseData::Message {
        title: title.to_owned(),
        message: Some(format!(
            "To unlock your vault, set the BW_SESSION environment variable:\n\
            $ export BW_SESSION=\"{session_key}\"\n\n\
            or pass it as an argument:\n\
            $ bw list items --session {session_key}"
        )),
        raw: Some(session_key),
    })
}

pub(crate) async fn unlock(
    services: &Services,
    session: &SessionContext,
    password: Option<String>,
    options: &UnlockOptions,
) -> CommandResult {
    if options.check {
        return if services
            .crypto
            .validate_session(session.session_key.clone())
            .await?
        {
            Ok(Response::success_with(ResponseData::message(
                "Vault is unlocked!",
                None,
            )))
        } else {
            Err(CommandError::Locked)
        };
    }

    let password = PasswordSource {
        direct: password,
        env: options.password_env.as_deref(),
        file: options.password_file.as_deref(),
    }
    .read(session)
    .await?;

    let session_key = services.crypto.unlock(password).await?;
    info!("Vault unlocked");
    Ok(session_key_message("Your vault is now unlocked!", session_key))
}

pub(crate) async fn lock(services: &Services) -> CommandResult {
    services.crypto.lock().await?;
    debug!("Vault locked");
    Ok(Response::success_with(ResponseData::message(
        "Your vault is locked.",
        None,
    )))
}
