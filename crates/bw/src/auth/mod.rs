use bitwarden_cli::text_prompt_when_none;
use clap::Args;
use tracing::info;

use crate::{
    dispatch::{CommandRequest, Verb},
    key_management::{PasswordSource, session_key_message},
    options::{LoginOptions, OptionBag},
    response::{CommandError, CommandResult, Response, ResponseData},
    services::Services,
    session::SessionContext,
};

#[derive(Args, Clone)]
pub struct LoginArgs {
    /// Email address
    pub email: Option<String>,

    /// Master password
    pub password: Option<String>,

    #[arg(long, help = "Environment variable storing your password.")]
    pub passwordenv: Option<String>,

    #[arg(
        long,
        help = "Path to a file containing your password as its first line."
    )]
    pub passwordfile: Option<String>,
}

impl LoginArgs {
    pub(crate) fn into_request(self) -> CommandRequest {
        let mut options = OptionBag::new();
        options
            .insert_opt("email", self.email)
            .insert_opt("password", self.password)
            .insert_opt("passwordenv", self.passwordenv)
            .insert_opt("passwordfile", self.passwordfile);
        CommandRequest::new(Verb::Login).options(options)
    }
}

pub(crate) async fn login(
    services: &Services,
    session: &SessionContext,
    options: &LoginOptions,
) -> CommandResult {
    let email = match options.email.clone() {
        Some(email) => email,
        None if session.can_prompt() => text_prompt_when_none("Email address", None)
            .map_err(|e| CommandError::BadRequest(e.to_string()))?,
        None => return Err(CommandError::bad_request("Email address is required.")),
    };
    let email = email.trim().to_lowercase();
    if email.is_empty() {
        return Err(CommandError::bad_request("Email address is required."));
    }

    let password = PasswordSource {
        direct: options.password.clone(),
        env: options.password_env.as_deref(),
        file: options.password_file.as_deref(),
    }
    .read(session)
    .await?;

    let session_key = services.crypto.login(email, password).await?;
    info!("Logged in");
    Ok(session_key_message("You are logged in!", session_key))
}

pub(crate) async fn logout(services: &Services) -> CommandResult {
    services.crypto.logout().await?;
    Ok(Response::success_with(ResponseData::message(
        "You have logged out.",
        None,
    )))
}
