use std::path::Path;

use chrono::{Days, Duration, Utc};
use clap::{Args, Subcommand, ValueEnum};
use tracing::debug;
use uuid::Uuid;

use crate::{
    dispatch::{CommandRequest, Verb, ensure_premium, existing_id, parse_object},
    options::{OptionBag, SendCreateOptions, SendGetOptions},
    payload::{Payload, decode},
    platform::save_file,
    resolver::{normalize_id, resolve, search},
    response::{CommandError, CommandResult, Response, ResponseData},
    services::{SendFileView, SendRequest, SendTextView, SendType, SendView, Services},
    vault::template,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
#[value(rename_all = "kebab-case")]
pub enum SendObject {
    List,
    Get,
    Create,
    Edit,
    Delete,
    RemovePassword,
    Template,
}

#[derive(Args, Clone)]
#[command(args_conflicts_with_subcommands = true)]
pub struct SendArgs {
    #[command(subcommand)]
    pub command: Option<SendCommands>,

    /// The data to Send. Treated as a file path with `--file`.
    pub data: Option<String>,

    #[arg(short = 'f', long, help = "Specifies that <data> is a filepath.")]
    pub file: bool,

    #[arg(
        short = 'd',
        long = "deleteInDays",
        alias = "deleteindays",
        help = "The number of days in the future to set deletion date, defaults to 7."
    )]
    pub delete_in_days: Option<String>,

    #[arg(long, help = "Hide <data> in web by default. Valid only if --file is not set.")]
    pub hidden: bool,

    #[arg(short = 'n', long, help = "The name of the Send.")]
    pub name: Option<String>,

    #[arg(long, help = "Notes to add to the Send.")]
    pub notes: Option<String>,

    #[arg(
        short = 'a',
        long = "maxAccessCount",
        alias = "maxaccesscount",
        help = "The amount of max possible accesses."
    )]
    pub max_access_count: Option<String>,

    #[arg(long, help = "Optional password to access this Send.")]
    pub password: Option<String>,
}

#[derive(Subcommand, Clone)]
pub enum SendCommands {
    #[command(long_about = "List all the Sends owned by you.")]
    List {
        #[arg(long, help = "Perform a search on the listed Sends.")]
        search: Option<String>,
    },
    #[command(long_about = "Get Sends owned by you.")]
    Get {
        /// Search term or Send's globally unique ID
        id: String,

        #[arg(long, help = "Specifies to return the text content of a Send.")]
        text: bool,

        #[arg(long, help = "Output directory or filename for attachment.")]
        output: Option<String>,
    },
    #[command(long_about = "Create a Send.")]
    Create {
        /// JSON object to upload. Can also be piped in through stdin.
        encoded_json: Option<String>,
    },
    #[command(long_about = "Edit a Send.")]
    Edit {
        /// Updated JSON object to save. Can also be piped in through stdin.
        encoded_json: Option<String>,

        #[arg(long, help = "Overrides the itemId provided in [encodedJson].")]
        itemid: Option<String>,
    },
    #[command(long_about = "Delete a Send.")]
    Delete {
        /// Send's globally unique ID
        id: String,
    },
    #[command(long_about = "Removes the saved password from a Send.")]
    RemovePassword {
        /// Send's globally unique ID
        id: String,
    },
    #[command(long_about = "Get json templates for send objects.")]
    Template {
        /// Valid objects are: send.text, send.file
        object: String,
    },
}

impl SendArgs {
    pub(crate) fn into_request(self, stdin_payload: Option<Payload>) -> CommandRequest {
        let request = CommandRequest::new(Verb::Send);
        let mut options = OptionBag::new();

        let Some(command) = self.command else {
            let (file, text) = if self.file {
                (self.data, None)
            } else {
                (None, self.data)
            };
            options
                .insert_opt("file", file)
                .insert_opt("deleteindays", self.delete_in_days)
                .insert_flag("hidden", self.hidden)
                .insert_opt("name", self.name)
                .insert_opt("notes", self.notes)
                .insert_opt("maxaccesscount", self.max_access_count)
                .insert_opt("password", self.password);
            return request.id(text).options(options);
        };

        match command {
            SendCommands::List { search } => {
                options.insert_opt("search", search);
                request.object("list").options(options)
            }
            SendCommands::Get { id, text, output } => {
                options
                    .insert_flag("text", text)
                    .insert_opt("output", output);
                request.object("get").id(Some(id)).options(options)
            }
            SendCommands::Create { encoded_json } => request
                .object("create")
                .payload(encoded_json.map(Payload::Encoded).or(stdin_payload)),
            SendCommands::Edit {
                encoded_json,
                itemid,
            } => {
                options.insert_opt("itemid", itemid);
                request
                    .object("edit")
                    .payload(encoded_json.map(Payload::Encoded).or(stdin_payload))
                    .options(options)
            }
            SendCommands::Delete { id } => request.object("delete").id(Some(id)),
            SendCommands::RemovePassword { id } => request.object("remove-password").id(Some(id)),
            SendCommands::Template { object } => request.object("template").id(Some(object)),
        }
    }
}

pub(crate) async fn run(
    services: &Services,
    object: Option<&str>,
    raw: Option<&str>,
    payload: Option<&Payload>,
    options: &OptionBag,
) -> CommandResult {
    let Some(object) = object else {
        return quick_create(services, raw, &SendCreateOptions::from_bag(options)).await;
    };

    let id = raw.map(normalize_id).unwrap_or_default();
    match parse_object::<SendObject>(Some(object))? {
        SendObject::List => {
            let sends = search(
                services.sends.list().await?,
                options.string(&["search"]).as_deref().unwrap_or_default(),
            );
            Ok(Response::success_with(ResponseData::list(sends)))
        }
        SendObject::Get => get(services, &id, &SendGetOptions::from_bag(options)).await,
        SendObject::Create => create(services, payload).await,
        SendObject::Edit => edit(services, payload, options.string(&["itemid", "itemId"])).await,
        SendObject::Delete => {
            let id = existing_id(&id)?;
            if services.sends.get(id).await?.is_none() {
                return Err(CommandError::NotFound);
            }
            services.sends.delete(id).await?;
            Ok(Response::success())
        }
        SendObject::RemovePassword => {
            let id = existing_id(&id)?;
            if services.sends.get(id).await?.is_none() {
                return Err(CommandError::NotFound);
            }
            services.sends.remove_password(id).await?;
            refetch_send(services, id).await
        }
        SendObject::Template => {
            let name = id.to_lowercase();
            match name.as_str() {
                "text" | "file" => template::get(&format!("send.{name}")),
                "send.text" | "send.file" => template::get(&name),
                _ => Err(CommandError::bad_request("Unknown template object.")),
            }
        }
    }
}

async fn refetch_send(services: &Services, id: Uuid) -> CommandResult {
    let send = services
        .sends
        .get(id)
        .await?
        .ok_or(CommandError::NotFound)?;
    Ok(Response::success_with(send))
}

async fn get(services: &Services, id: &str, options: &SendGetOptions) -> CommandResult {
    let send = resolve::<SendView, _>(services.sends.as_ref(), id)
        .await?
        .into_result()?;

    if options.text {
        let text = send
            .text
            .as_ref()
            .and_then(|t| t.text.clone())
            .ok_or_else(|| CommandError::bad_request("This Send does not contain text."))?;
        return Ok(Response::success_with(ResponseData::string(text)));
    }

    if let Some(output) = &options.output {
        let (Some(send_id), Some(file)) = (send.id, send.file.as_ref()) else {
            return Err(CommandError::bad_request("This Send does not contain a file."));
        };
        let data = services.sends.download_file(send_id).await?;
        return save_file(output, &file.file_name, &data);
    }

    Ok(Response::success_with(send))
}

async fn read_file(path: &str) -> Result<(String, Vec<u8>), CommandError> {
    let file_name = Path::new(path)
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .ok_or_else(|| CommandError::BadRequest(format!("Invalid file path {path}.")))?;
    let data = tokio::fs::read(path)
        .await
        .map_err(|e| CommandError::BadRequest(format!("Cannot read file {path}: {e}")))?;
    Ok((file_name, data))
}

fn file_view(file_name: String) -> SendFileView {
    SendFileView {
        file_name,
        ..Default::default()
    }
}

/// `bw send <data>`: create a send straight from text or a file path.
async fn quick_create(
    services: &Services,
    text: Option<&str>,
    options: &SendCreateOptions,
) -> CommandResult {
    let now = Utc::now();
    let deletion_date = u64::try_from(options.delete_in_days)
        .ok()
        .and_then(|days| now.checked_add_days(Days::new(days)))
        .ok_or_else(|| CommandError::bad_request("Invalid deletion date."))?;
    let mut send = SendView {
        id: None,
        access_id: None,
        name: String::new(),
        notes: options.notes.clone(),
        password: options.password.clone(),
        has_password: false,
        r#type: SendType::Text,
        text: None,
        file: None,
        max_access_count: options.max_access_count,
        access_count: 0,
        disabled: false,
        hide_email: false,
        revision_date: now,
        deletion_date,
        expiration_date: None,
    };

    let contents = if let Some(path) = &options.file {
        ensure_premium(services).await?;
        let (file_name, data) = read_file(path).await?;
        send.r#type = SendType::File;
        send.name = options.name.clone().unwrap_or_else(|| file_name.clone());
        send.file = Some(file_view(file_name));
        Some(data)
    } else {
        let text = options
            .text
            .as_deref()
            .or(text.filter(|t| !t.trim().is_empty()))
            .ok_or_else(|| CommandError::bad_request("Must specify text content or a file."))?;
        send.name = options.name.clone().unwrap_or_else(|| {
            text.lines().next().unwrap_or_default().trim().to_owned()
        });
        send.text = Some(SendTextView {
            text: Some(text.to_owned()),
            hidden: options.hidden,
        });
        None
    };

    let id = services.sends.create(send, contents).await?;
    debug!(%id, "Created send");
    refetch_send(services, id).await
}

async fn create(services: &Services, payload: Option<&Payload>) -> CommandResult {
    let request: SendRequest = decode(payload)?;
    let now = Utc::now();

    let contents = match request.r#type {
        SendType::Text => {
            if request.text.as_ref().and_then(|t| t.text.as_deref()).is_none() {
                return Err(CommandError::bad_request(
                    "Must specify text content for a text send.",
                ));
            }
            None
        }
        SendType::File => {
            ensure_premium(services).await?;
            Some(match payload {
                Some(Payload::File { file_name, data }) => (file_name.clone(), data.clone()),
                _ => {
                    let path = request
                        .file
                        .as_ref()
                        .map(|f| f.file_name.as_str())
                        .filter(|p| !p.trim().is_empty())
                        .ok_or_else(|| {
                            CommandError::bad_request("Must specify a file to Send.")
                        })?;
                    read_file(path).await?
                }
            })
        }
    };

    let mut send = SendView {
        id: None,
        access_id: None,
        name: String::new(),
        notes: None,
        password: None,
        has_password: false,
        r#type: request.r#type,
        text: None,
        file: None,
        max_access_count: None,
        access_count: 0,
        disabled: false,
        hide_email: false,
        revision_date: now,
        deletion_date: now + Duration::days(crate::options::DEFAULT_SEND_DELETE_DAYS),
        expiration_date: None,
    };
    request.apply_to(&mut send);

    let data = contents.map(|(file_name, data)| {
        send.file = Some(file_view(file_name));
        data
    });
    let id = services.sends.create(send, data).await?;
    refetch_send(services, id).await
}

async fn edit(
    services: &Services,
    payload: Option<&Payload>,
    item_id: Option<String>,
) -> CommandResult {
    let request: SendRequest = decode(payload)?;
    let id = match item_id {
        Some(id) => existing_id(&id)?,
        None => request
            .id
            .ok_or_else(|| CommandError::bad_request("`itemid` option is required."))?,
    };

    let mut send = services
        .sends
        .get(id)
        .await?
        .ok_or(CommandError::NotFound)?;
    if send.r#type != request.r#type {
        return Err(CommandError::bad_request("Cannot change a Send's type."));
    }
    if request.r#type == SendType::File {
        ensure_premium(services).await?;
    }

    request.apply_to(&mut send);
    services.sends.update(send).await?;
    refetch_send(services, id).await
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use uuid::uuid;

    use super::*;
    use crate::dispatch::tests::{Mocks, encoded};

    const A: Uuid = uuid!("11111111-1111-1111-1111-111111111111");

    fn text_send(id: Uuid, name: &str, text: &str) -> SendView {
        let now = Utc::now();
        SendView {
            id: Some(id),
            access_id: Some("access".to_owned()),
            name: name.to_owned(),
            notes: None,
            password: None,
            has_password: false,
            r#type: SendType::Text,
            text: Some(SendTextView {
                text: Some(text.to_owned()),
                hidden: false,
            }),
            file: None,
            max_access_count: None,
            access_count: 0,
            disabled: false,
            hide_email: false,
            revision_date: now,
            deletion_date: now + Duration::days(7),
            expiration_date: None,
        }
    }

    fn quick(data: &str, configure: impl FnOnce(&mut SendArgs)) -> CommandRequest {
        let mut args = SendArgs {
            command: None,
            data: Some(data.to_owned()),
            file: false,
            delete_in_days: None,
            hidden: false,
            name: None,
            notes: None,
            max_access_count: None,
            password: None,
        };
        configure(&mut args);
        args.into_request(None)
    }

    fn send_command(command: SendCommands, payload: Option<Payload>) -> CommandRequest {
        SendArgs {
            command: Some(command),
            data: None,
            file: false,
            delete_in_days: None,
            hidden: false,
            name: None,
            notes: None,
            max_access_count: None,
            password: None,
        }
        .into_request(payload)
    }

    #[tokio::test]
    async fn test_quick_create_text_send() {
        let created = Arc::new(Mutex::new(None));
        let mut mocks = Mocks::unlocked();
        let sink = created.clone();
        mocks
            .sends
            .expect_create()
            .times(1)
            .returning(move |send, file| {
                assert!(file.is_none());
                *sink.lock().unwrap() = Some(send);
                Ok(A)
            });
        mocks
            .sends
            .expect_get()
            .returning(|id| Ok(Some(text_send(id, "secret", "hello"))));

        let response = mocks
            .dispatch(quick("hello there", |args| {
                args.hidden = true;
                args.delete_in_days = Some("3".to_owned());
            }))
            .await;
        assert!(response.success, "{:?}", response.message);

        let send = created.lock().unwrap().take().unwrap();
        assert_eq!(send.name, "hello there");
        assert_eq!(send.text.as_ref().map(|t| t.hidden), Some(true));
        let days = (send.deletion_date - send.revision_date).num_days();
        assert!((2..=3).contains(&days));
    }

    #[tokio::test]
    async fn test_quick_create_rejects_unreachable_deletion_date() {
        let mut mocks = Mocks::unlocked();
        mocks.sends.expect_create().never();

        let response = mocks
            .dispatch(quick("hello", |args| {
                args.delete_in_days = Some("1000000000".to_owned());
            }))
            .await;
        assert!(!response.success);
        assert_eq!(response.message.as_deref(), Some("Invalid deletion date."));
    }

    #[tokio::test]
    async fn test_hidden_is_a_presence_flag_in_query_options() {
        let created = Arc::new(Mutex::new(None));
        let mut mocks = Mocks::unlocked();
        let sink = created.clone();
        mocks.sends.expect_create().returning(move |send, _| {
            *sink.lock().unwrap() = Some(send);
            Ok(A)
        });
        mocks
            .sends
            .expect_get()
            .returning(|id| Ok(Some(text_send(id, "secret", "hello"))));

        let mut options = OptionBag::new();
        options.insert("hidden", "yes");
        mocks
            .dispatch(
                CommandRequest::new(Verb::Send)
                    .id(Some("hello".to_owned()))
                    .options(options),
            )
            .await;

        let send = created.lock().unwrap().take().unwrap();
        assert_eq!(send.text.map(|t| t.hidden), Some(true));
    }

    #[tokio::test]
    async fn test_quick_create_file_send_requires_premium() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let mut mocks = Mocks::unlocked();
        mocks
            .account
            .expect_can_access_premium()
            .returning(|| Ok(false));
        mocks.sends.expect_create().never();

        let path = file.path().display().to_string();
        let response = mocks.dispatch(quick(&path, |args| args.file = true)).await;
        assert_eq!(
            response.message.as_deref(),
            Some("Premium status is required to use this feature.")
        );
    }

    #[tokio::test]
    async fn test_send_get_text() {
        let mut mocks = Mocks::unlocked();
        mocks
            .sends
            .expect_list()
            .returning(|| Ok(vec![text_send(A, "wifi", "correct horse")]));

        let request = send_command(
            SendCommands::Get {
                id: "wifi".to_owned(),
                text: true,
                output: None,
            },
            None,
        );
        let response = mocks.dispatch(request).await;
        assert_eq!(response.data, Some(ResponseData::string("correct horse")));
    }

    #[tokio::test]
    async fn test_send_edit_cannot_change_type() {
        let mut mocks = Mocks::unlocked();
        mocks
            .sends
            .expect_get()
            .returning(|id| Ok(Some(text_send(id, "wifi", "correct horse"))));
        mocks.sends.expect_update().never();

        let body = format!(r#"{{"id":"{A}","name":"wifi","type":1}}"#);
        let request = send_command(
            SendCommands::Edit {
                encoded_json: None,
                itemid: None,
            },
            encoded(&body),
        );
        let response = mocks.dispatch(request).await;
        assert_eq!(
            response.message.as_deref(),
            Some("Cannot change a Send's type.")
        );
    }

    #[tokio::test]
    async fn test_send_edit_uses_itemid_option() {
        let mut mocks = Mocks::unlocked();
        mocks
            .sends
            .expect_get()
            .returning(|id| Ok(Some(text_send(id, "wifi", "correct horse"))));
        mocks
            .sends
            .expect_update()
            .withf(|send| send.id == Some(A) && send.name == "guest wifi")
            .times(1)
            .returning(|_| Ok(()));

        let request = send_command(
            SendCommands::Edit {
                encoded_json: None,
                itemid: Some(A.to_string()),
            },
            encoded(r#"{"name":"guest wifi","type":0,"text":{"text":"x"}}"#),
        );
        let response = mocks.dispatch(request).await;
        assert!(response.success, "{:?}", response.message);
    }

    #[tokio::test]
    async fn test_send_remove_password() {
        let mut mocks = Mocks::unlocked();
        mocks
            .sends
            .expect_get()
            .returning(|id| Ok(Some(text_send(id, "wifi", "correct horse"))));
        mocks
            .sends
            .expect_remove_password()
            .withf(|id| *id == A)
            .times(1)
            .returning(|_| Ok(()));

        let request = send_command(
            SendCommands::RemovePassword { id: A.to_string() },
            None,
        );
        assert!(mocks.dispatch(request).await.success);
    }

    #[tokio::test]
    async fn test_send_template_without_unlock() {
        let mut mocks = Mocks::default();
        mocks.crypto.expect_validate_session().never();

        let request = send_command(
            SendCommands::Template {
                object: "send.text".to_owned(),
            },
            None,
        );
        let response = mocks.dispatch(request).await;
        assert!(matches!(response.data, Some(ResponseData::Template { .. })));
    }
}
