//! Routes a [`CommandRequest`] to its handler and folds the outcome into a [`Response`].

use clap::ValueEnum;
use tracing::debug;
use uuid::Uuid;

use crate::{
    admin_console, auth, key_management,
    options::{
        CreateOptions, DeleteOptions, EditOptions, GenerateOptions, GetOptions, ListOptions,
        LoginOptions, OptionBag, SyncOptions, UnlockOptions,
    },
    payload::Payload,
    platform,
    resolver::{is_guid, normalize_id},
    response::{CommandError, CommandResult, Response},
    services::Services,
    session::SessionContext,
    tools, vault,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verb {
    List,
    Get,
    Create,
    Edit,
    Delete,
    Restore,
    /// Also reachable as `share`.
    Move,
    Confirm,
    Sync,
    Status,
    Login,
    Logout,
    Unlock,
    Lock,
    Generate,
    Encode,
    Send,
}

/// A single command invocation, independent of the front end it came from.
#[derive(Debug, Clone, PartialEq)]
pub struct CommandRequest {
    pub verb: Verb,
    pub object: Option<String>,
    /// First positional argument: an id, search term, template name or raw input.
    pub id: Option<String>,
    pub payload: Option<Payload>,
    pub options: OptionBag,
}

impl CommandRequest {
    pub fn new(verb: Verb) -> Self {
        Self {
            verb,
            object: None,
            id: None,
            payload: None,
            options: OptionBag::new(),
        }
    }

    pub fn object(mut self, object: impl Into<String>) -> Self {
        self.object = Some(object.into());
        self
    }

    pub fn id(mut self, id: Option<String>) -> Self {
        self.id = id;
        self
    }

    pub fn payload(mut self, payload: Option<Payload>) -> Self {
        self.payload = payload;
        self
    }

    pub fn options(mut self, options: OptionBag) -> Self {
        self.options = options;
        self
    }

    fn object_is(&self, name: &str) -> bool {
        self.object
            .as_deref()
            .is_some_and(|o| o.trim().eq_ignore_ascii_case(name))
    }

    /// Commands that work without an unlocked vault.
    fn requires_unlock(&self) -> bool {
        match self.verb {
            Verb::Unlock
            | Verb::Lock
            | Verb::Status
            | Verb::Generate
            | Verb::Encode
            | Verb::Login
            | Verb::Logout => false,
            Verb::Get | Verb::Send => !self.object_is("template"),
            _ => true,
        }
    }
}

/// Match an object name case-insensitively against one verb's objects.
pub fn parse_object<T: ValueEnum>(object: Option<&str>) -> Result<T, CommandError> {
    object
        .and_then(|object| T::from_str(object.trim(), true).ok())
        .ok_or_else(|| CommandError::bad_request("Unknown object."))
}

/// A GUID argument, rejected with the offending value when malformed.
pub fn require_guid(value: &str) -> Result<Uuid, CommandError> {
    let trimmed = value.trim();
    let invalid = || CommandError::BadRequest(format!("`{value}` is not a GUID."));
    if !is_guid(trimmed) {
        return Err(invalid());
    }
    Uuid::parse_str(trimmed).map_err(|_| invalid())
}

/// A required GUID option such as `organizationid`.
pub fn require_guid_option(value: Option<&str>, name: &str) -> Result<Uuid, CommandError> {
    let value =
        value.ok_or_else(|| CommandError::BadRequest(format!("`{name}` option is required.")))?;
    require_guid(value)
}

/// Ids of existing entities. Anything that is not a GUID cannot exist.
pub fn existing_id(value: &str) -> Result<Uuid, CommandError> {
    Uuid::parse_str(value.trim()).map_err(|_| CommandError::NotFound)
}

pub async fn ensure_premium(services: &Services) -> Result<(), CommandError> {
    if services.account.can_access_premium().await? {
        Ok(())
    } else {
        Err(CommandError::PremiumRequired)
    }
}

#[derive(Clone)]
pub struct Dispatcher {
    services: Services,
}

impl Dispatcher {
    pub fn new(services: Services) -> Self {
        Self { services }
    }

    /// Run one command. Every failure, including collaborator errors, ends up in the envelope.
    pub async fn dispatch(&self, request: CommandRequest, session: &SessionContext) -> Response {
        debug!(verb = ?request.verb, object = ?request.object, "Dispatching command");

        match self.run(request, session).await {
            Ok(response) => response,
            Err(error) => {
                debug!(%error, "Command failed");
                error.into()
            }
        }
    }

    async fn run(&self, request: CommandRequest, session: &SessionContext) -> CommandResult {
        if request.requires_unlock() {
            self.ensure_unlocked(session).await?;
        }

        let services = &self.services;
        let object = request.object.as_deref();
        let id = request.id.as_deref().map(normalize_id).unwrap_or_default();
        let payload = request.payload.as_ref();
        let options = &request.options;

        match request.verb {
            Verb::List => {
                vault::list::run(services, parse_object(object)?, &ListOptions::from_bag(options))
                    .await
            }
            Verb::Get => {
                vault::get::run(
                    services,
                    session,
                    parse_object(object)?,
                    &id,
                    &GetOptions::from_bag(options),
                )
                .await
            }
            Verb::Create => {
                vault::create::run(
                    services,
                    session,
                    parse_object(object)?,
                    payload,
                    &CreateOptions::from_bag(options),
                )
                .await
            }
            Verb::Edit => {
                vault::edit::run(
                    services,
                    parse_object(object)?,
                    &id,
                    payload,
                    &EditOptions::from_bag(options),
                )
                .await
            }
            Verb::Delete => {
                vault::delete::run(
                    services,
                    parse_object(object)?,
                    &id,
                    &DeleteOptions::from_bag(options),
                )
                .await
            }
            Verb::Restore => vault::restore::run(services, parse_object(object)?, &id).await,
            Verb::Move => admin_console::move_item(services, &id, options, payload).await,
            Verb::Confirm => {
                admin_console::confirm(services, parse_object(object)?, &id, options).await
            }
            Verb::Sync => platform::sync(services, &SyncOptions::from_bag(options)).await,
            Verb::Status => platform::status(services, session).await,
            Verb::Encode => Ok(platform::encode(request.id.as_deref().unwrap_or_default())),
            Verb::Login => auth::login(services, session, &LoginOptions::from_bag(options)).await,
            Verb::Logout => auth::logout(services).await,
            Verb::Unlock => {
                key_management::unlock(
                    services,
                    session,
                    request.id.clone(),
                    &UnlockOptions::from_bag(options),
                )
                .await
            }
            Verb::Lock => key_management::lock(services).await,
            Verb::Generate => tools::generate(services, &GenerateOptions::from_bag(options)).await,
            Verb::Send => {
                tools::send::run(services, object, request.id.as_deref(), payload, options).await
            }
        }
    }

    async fn ensure_unlocked(&self, session: &SessionContext) -> Result<(), CommandError> {
        let unlocked = self
            .services
            .crypto
            .validate_session(session.session_key.clone())
            .await?;
        if unlocked {
            Ok(())
        } else {
            Err(CommandError::Locked)
        }
    }
}
