use bitwarden_cli::Color;
use clap::{Parser, Subcommand};

use crate::{
    admin_console::{ConfirmCommand, MoveArgs},
    auth::LoginArgs,
    dispatch::{CommandRequest, Verb},
    key_management::UnlockArgs,
    options::OptionBag,
    payload::Payload,
    render::Output,
    serve::ServeArgs,
    tools::{
        GenerateArgs,
        send::{SendArgs, SendCommands},
    },
};

pub const SESSION_ENV: &str = "BW_SESSION";

#[derive(Parser, Clone)]
#[command(name = "Bitwarden CLI", version, about = "Bitwarden CLI", long_about = None, disable_version_flag = true)]
pub struct Cli {
    // Optional as a workaround for https://github.com/clap-rs/clap/issues/3572
    #[command(subcommand)]
    pub command: Option<Commands>,

    // `--output` is taken by the attachment and send file paths
    #[arg(long, global = true, value_enum, default_value_t = Output::JSON)]
    pub format: Output,

    #[arg(short = 'c', long, global = true, value_enum, default_value_t = Color::Auto)]
    pub color: Color,

    #[arg(
        long,
        global = true,
        env = SESSION_ENV,
        help = "The session key used to decrypt your vault data. Can be obtained with `bw login` or `bw unlock`."
    )]
    pub session: Option<String>,

    #[arg(
        long,
        global = true,
        env = "BW_PRETTY",
        help = "Format output. JSON is tabbed with two spaces."
    )]
    pub pretty: bool,

    #[arg(
        long,
        global = true,
        env = "BW_RAW",
        help = "Return raw output instead of a descriptive message."
    )]
    pub raw: bool,

    #[arg(
        long,
        global = true,
        env = "BW_RESPONSE",
        help = "Return a JSON formatted version of response output."
    )]
    pub response: bool,

    #[arg(
        long,
        global = true,
        env = "BW_CLEANEXIT",
        help = "Exit with a success exit code (0) unless an error is thrown."
    )]
    pub cleanexit: bool,

    #[arg(
        short = 'q',
        long,
        global = true,
        env = "BW_QUIET",
        help = "Don't return anything to stdout."
    )]
    pub quiet: bool,

    #[arg(
        long,
        global = true,
        env = "BW_NOINTERACTION",
        help = "Do not prompt for interactive user input."
    )]
    pub nointeraction: bool,

    // Clap uses uppercase V for the short flag by default, but we want lowercase v
    // for compatibility with the node CLI:
    // https://github.com/clap-rs/clap/issues/138
    #[arg(short = 'v', long, action = clap::builder::ArgAction::Version)]
    pub version: (),
}

#[derive(Subcommand, Clone)]
pub enum Commands {
    // Auth commands
    #[command(long_about = "Log into a user account.")]
    Login(LoginArgs),

    #[command(long_about = "Log out of the current user account.")]
    Logout,

    // KM commands
    #[command(long_about = "Unlock the vault and return a session key.")]
    Unlock(UnlockArgs),

    #[command(long_about = "Lock the vault and destroy active session keys.")]
    Lock,

    // Platform commands
    #[command(long_about = "Pull the latest vault data from server.")]
    Sync {
        #[arg(short = 'f', long, help = "Force a full sync.")]
        force: bool,

        #[arg(long, help = "Get the last sync date.")]
        last: bool,
    },

    #[command(long_about = "Base 64 encode stdin.")]
    Encode,

    #[command(
        long_about = "Show server, last sync, user information, and vault status.",
        after_help = r#"Example return value:
  {
    "serverUrl": "https://bitwarden.example.com",
    "lastSync": "2020-06-16T06:33:51.419Z",
    "userEmail": "user@example.com",
    "userId": "00000000-0000-0000-0000-000000000000",
    "status": "locked"
  }

Notes:
  `status` is one of:
    - `unauthenticated` when you are not logged in
    - `locked` when you are logged in and the vault is locked
    - `unlocked` when you are logged in and the vault is unlocked
"#
    )]
    Status,

    // Vault commands
    #[command(long_about = "List an array of objects from the vault.")]
    #[command(after_help = r#"Objects:
    items
    folders
    collections
    organizations
    org-collections
    org-members
    sends

Notes:
    Combining search with a filter performs a logical AND operation.
    Combining multiple filters performs a logical OR operation.

Examples:
    bw list items
    bw list items --folderid 60556c31-e649-4b5d-8daf-fc1c391a1bf2
    bw list items --search google --folderid 60556c31-e649-4b5d-8daf-fc1c391a1bf2
    bw list items --url https://google.com
    bw list items --folderid null
    bw list items --organizationid notnull
    bw list items --trash
    bw list folders --search email
    bw list org-members --organizationid 60556c31-e649-4b5d-8daf-fc1c391a1bf2
    "#)]
    List {
        object: String,

        #[arg(long, help = "Perform a search on the listed objects.")]
        search: Option<String>,

        #[arg(long, help = "Filter items of a specific login url.")]
        url: Option<String>,

        #[arg(long, help = "Filter items by folder id.")]
        folderid: Option<String>,

        #[arg(long, help = "Filter items by collection id.")]
        collectionid: Option<String>,

        #[arg(long, help = "Filter items or collections by organization id.")]
        organizationid: Option<String>,

        #[arg(long, help = "Filter items that are deleted and in the trash.")]
        trash: bool,
    },

    #[command(long_about = "Get an object from the vault.")]
    #[command(after_help = r#"Objects:
    item
    username
    password
    uri
    totp
    notes
    exposed
    attachment
    folder
    collection
    org-collection
    organization
    template
    fingerprint
    send

Examples:
    bw get item 99ee88d2-6046-4ea7-92c2-acac464b1412
    bw get password https://google.com
    bw get totp google.com
    bw get notes google.com
    bw get exposed yahoo.com
    bw get attachment b857igwl1dzrs2 --itemid 99ee88d2-6046-4ea7-92c2-acac464b1412 --output ./photo.jpg
    bw get folder email
    bw get template folder
    "#)]
    Get {
        object: String,

        /// Object's globally unique `id`, search term or template name
        id: String,

        #[arg(long, help = "Identifier which is used to search for an attachment.")]
        itemid: Option<String>,

        #[arg(long, help = "Output directory or filename for attachment.")]
        output: Option<String>,

        #[arg(long, help = "Organization id for an organization object.")]
        organizationid: Option<String>,
    },

    #[command(long_about = "Create an object in the vault.")]
    #[command(after_help = r#"Objects:
    item
    attachment
    folder
    org-collection

Examples:
    bw create folder eyJuYW1lIjoiTXkgRm9sZGVyIn0K
    echo 'eyJuYW1lIjoiTXkgRm9sZGVyIn0K' | bw create folder
    bw create attachment --file ./myfile.csv --itemid 16b15b89-65b3-4639-ad2a-95052a6d8f66
    "#)]
    Create {
        object: String,

        /// Base64 encoded JSON object to create. Can also be piped in through stdin.
        encoded_json: Option<String>,

        #[arg(long, help = "Path to file for attachment.")]
        file: Option<String>,

        #[arg(long, help = "ItemId for attachment.")]
        itemid: Option<String>,

        #[arg(long, help = "Organization id for an organization object.")]
        organizationid: Option<String>,
    },

    #[command(long_about = "Edit an object from the vault.")]
    #[command(after_help = r#"Objects:
    item
    item-collections
    folder
    org-collection

Examples:
    bw edit folder 5cdfbd80-d99f-409b-915b-f4c5d0241b02 eyJuYW1lIjoiTXkgRm9sZGVyMiJ9Cg==
    echo 'eyJuYW1lIjoiTXkgRm9sZGVyMiJ9Cg==' | bw edit folder 5cdfbd80-d99f-409b-915b-f4c5d0241b02
    "#)]
    Edit {
        object: String,

        /// Object's globally unique `id`
        id: String,

        /// Base64 encoded JSON object. Can also be piped in through stdin.
        encoded_json: Option<String>,

        #[arg(long, help = "Organization id for an organization object.")]
        organizationid: Option<String>,
    },

    #[command(long_about = "Delete an object from the vault.")]
    Delete {
        object: String,

        /// Object's globally unique `id`
        id: String,

        #[arg(long, help = "Identifier which is used to search for an attachment.")]
        itemid: Option<String>,

        #[arg(long, help = "Organization id for an organization object.")]
        organizationid: Option<String>,

        #[arg(
            short = 'p',
            long,
            help = "Perform a permanent delete rather than moving to trash."
        )]
        permanent: bool,
    },

    #[command(long_about = "Restores an object from the trash.")]
    Restore {
        object: String,

        /// Object's globally unique `id`
        id: String,
    },

    #[command(
        long_about = "Move an item to an organization.",
        visible_alias = "share"
    )]
    Move(MoveArgs),

    // Admin console commands
    #[command(long_about = "Confirm an object to the organization.")]
    Confirm {
        #[command(subcommand)]
        command: ConfirmCommand,
    },

    // Tools commands
    #[command(long_about = "Generate a password/passphrase.")]
    #[command(after_help = r#"Notes:
    Default options are `-uln --length 14`.
    `length` ranges from 5 to 128.
    `words` ranges from 3 to 20.

Examples:
    bw generate
    bw generate -u -l --length 18
    bw generate -ulns --length 25
    bw generate -ul
    bw generate -p --separator _
    bw generate -p --words 5 --separator space
    bw generate -p --words 5 --separator empty
    "#)]
    Generate(GenerateArgs),

    #[command(
        long_about = "Work with Bitwarden sends. A Send can be quickly created using this command or subcommands can be used to fine-tune the Send."
    )]
    Send(SendArgs),

    // Server commands
    #[command(long_about = "Start a RESTful API webserver.")]
    Serve(ServeArgs),
}

/// An encoded payload from the argument, or piped in through stdin.
fn piped(
    encoded_json: Option<String>,
    stdin: impl FnOnce() -> Option<String>,
) -> Option<Payload> {
    encoded_json.or_else(stdin).map(Payload::Encoded)
}

impl Commands {
    /// Turn parsed arguments into a front end independent request. `stdin` is only consulted
    /// by commands that accept a piped payload and did not get one as an argument. `serve` is
    /// not a single request and gives `None`.
    pub(crate) fn into_request(
        self,
        stdin: impl FnOnce() -> Option<String>,
    ) -> Option<CommandRequest> {
        let mut options = OptionBag::new();

        let request = match self {
            Commands::Login(args) => args.into_request(),
            Commands::Logout => CommandRequest::new(Verb::Logout),
            Commands::Unlock(args) => args.into_request(),
            Commands::Lock => CommandRequest::new(Verb::Lock),
            Commands::Sync { force, last } => {
                options.insert_flag("force", force).insert_flag("last", last);
                CommandRequest::new(Verb::Sync).options(options)
            }
            Commands::Encode => CommandRequest::new(Verb::Encode).id(stdin()),
            Commands::Status => CommandRequest::new(Verb::Status),
            Commands::List {
                object,
                search,
                url,
                folderid,
                collectionid,
                organizationid,
                trash,
            } => {
                options
                    .insert_opt("search", search)
                    .insert_opt("url", url)
                    .insert_opt("folderid", folderid)
                    .insert_opt("collectionid", collectionid)
                    .insert_opt("organizationid", organizationid)
                    .insert_flag("trash", trash);
                CommandRequest::new(Verb::List)
                    .object(object)
                    .options(options)
            }
            Commands::Get {
                object,
                id,
                itemid,
                output,
                organizationid,
            } => {
                options
                    .insert_opt("itemid", itemid)
                    .insert_opt("output", output)
                    .insert_opt("organizationid", organizationid);
                CommandRequest::new(Verb::Get)
                    .object(object)
                    .id(Some(id))
                    .options(options)
            }
            Commands::Create {
                object,
                encoded_json,
                file,
                itemid,
                organizationid,
            } => {
                // Attachments carry their content in `--file`, so stdin is left alone.
                let payload = if file.is_some() {
                    encoded_json.map(Payload::Encoded)
                } else {
                    piped(encoded_json, stdin)
                };
                options
                    .insert_opt("file", file)
                    .insert_opt("itemid", itemid)
                    .insert_opt("organizationid", organizationid);
                CommandRequest::new(Verb::Create)
                    .object(object)
                    .payload(payload)
                    .options(options)
            }
            Commands::Edit {
                object,
                id,
                encoded_json,
                organizationid,
            } => {
                options.insert_opt("organizationid", organizationid);
                CommandRequest::new(Verb::Edit)
                    .object(object)
                    .id(Some(id))
                    .payload(piped(encoded_json, stdin))
                    .options(options)
            }
            Commands::Delete {
                object,
                id,
                itemid,
                organizationid,
                permanent,
            } => {
                options
                    .insert_opt("itemid", itemid)
                    .insert_opt("organizationid", organizationid)
                    .insert_flag("permanent", permanent);
                CommandRequest::new(Verb::Delete)
                    .object(object)
                    .id(Some(id))
                    .options(options)
            }
            Commands::Restore { object, id } => CommandRequest::new(Verb::Restore)
                .object(object)
                .id(Some(id)),
            Commands::Move(args) => {
                let payload = match args.encoded_json {
                    Some(_) => None,
                    None => piped(None, stdin),
                };
                args.into_request(payload)
            }
            Commands::Confirm { command } => command.into_request(),
            Commands::Generate(args) => args.into_request(),
            Commands::Send(args) => {
                let wants_payload = matches!(
                    &args.command,
                    Some(
                        SendCommands::Create { encoded_json: None }
                            | SendCommands::Edit {
                                encoded_json: None,
                                ..
                            }
                    )
                );
                let payload = if wants_payload {
                    piped(None, stdin)
                } else {
                    None
                };
                args.into_request(payload)
            }
            Commands::Serve(_) => return None,
        };
        Some(request)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Commands {
        let mut argv = vec!["bw"];
        argv.extend_from_slice(args);
        Cli::try_parse_from(argv).unwrap().command.unwrap()
    }

    fn no_stdin() -> Option<String> {
        panic!("stdin should not be read")
    }

    #[test]
    fn test_list_flags_become_options() {
        let request = parse(&["list", "items", "--folderid", "null", "--trash"])
            .into_request(no_stdin)
            .unwrap();
        assert_eq!(request.verb, Verb::List);
        assert_eq!(request.object.as_deref(), Some("items"));
        assert_eq!(request.options.string(&["folderid"]).as_deref(), Some("null"));
        assert!(request.options.flag(&["trash"]));
    }

    #[test]
    fn test_create_reads_stdin_when_payload_is_missing() {
        let request = parse(&["create", "folder"])
            .into_request(|| Some("e30=".to_owned()))
            .unwrap();
        assert_eq!(request.payload, Some(Payload::Encoded("e30=".to_owned())));

        let request = parse(&["create", "folder", "e30="])
            .into_request(no_stdin)
            .unwrap();
        assert_eq!(request.payload, Some(Payload::Encoded("e30=".to_owned())));
    }

    #[test]
    fn test_create_attachment_ignores_stdin() {
        let request = parse(&[
            "create",
            "attachment",
            "--file",
            "./codes.txt",
            "--itemid",
            "11111111-1111-1111-1111-111111111111",
        ])
        .into_request(no_stdin)
        .unwrap();
        assert!(request.payload.is_none());
    }

    #[test]
    fn test_share_is_an_alias_of_move() {
        let request = parse(&[
            "share",
            "11111111-1111-1111-1111-111111111111",
            "bbbbbbbb-0000-0000-0000-000000000001",
            "WyJjY2NjY2NjYy0wMDAwLTAwMDAtMDAwMC0wMDAwMDAwMDAwMDEiXQ==",
        ])
        .into_request(no_stdin)
        .unwrap();
        assert_eq!(request.verb, Verb::Move);
        assert_eq!(
            request.options.string(&["organizationid"]).as_deref(),
            Some("bbbbbbbb-0000-0000-0000-000000000001")
        );
    }

    #[test]
    fn test_send_quick_create_and_subcommands() {
        let request = parse(&["send", "hello", "--hidden"])
            .into_request(no_stdin)
            .unwrap();
        assert_eq!(request.object, None);
        assert_eq!(request.id.as_deref(), Some("hello"));
        assert!(request.options.presence_flag(&["hidden"]));

        let request = parse(&["send", "template", "send.text"])
            .into_request(no_stdin)
            .unwrap();
        assert_eq!(request.object.as_deref(), Some("template"));
    }
}
