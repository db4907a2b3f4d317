#![doc = include_str!("../README.md")]

use std::{
    io::{IsTerminal, Read},
    process::ExitCode,
    sync::Arc,
};

use bitwarden_cli::install_color_eyre;
use clap::{CommandFactory, Parser};
use color_eyre::eyre::Result;
use tracing_subscriber::{
    EnvFilter,
    filter::{Directive, LevelFilter},
    prelude::__tracing_subscriber_SubscriberExt as _,
    util::SubscriberInitExt as _,
};

use crate::{
    command::*,
    dispatch::Dispatcher,
    services::{LocalVault, Services},
    session::SessionContext,
};

mod admin_console;
mod auth;
mod command;
mod dispatch;
mod key_management;
mod options;
mod payload;
mod platform;
mod render;
mod resolver;
mod response;
mod serve;
mod services;
mod session;
mod tools;
mod vault;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<ExitCode> {
    // the log level hierarchy is determined by:
    //    - if RUST_LOG is detected at runtime
    //    - if RUST_LOG is provided at compile time
    //    - default to WARN, stderr is shared with command errors
    let filter = EnvFilter::builder()
        .with_default_directive(
            option_env!("RUST_LOG")
                .and_then(|level| level.parse::<Directive>().ok())
                .unwrap_or_else(|| LevelFilter::WARN.into()),
        )
        // parse directives from the RUST_LOG environment variable,
        // overriding the default directive for matching targets.
        .from_env_lossy();

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    let cli = Cli::parse();
    install_color_eyre(cli.color)?;
    let render_config = render::RenderConfig::new(&cli);

    let Some(command) = cli.command else {
        let mut cmd = Cli::command();
        cmd.print_help()?;
        return Ok(ExitCode::SUCCESS);
    };

    let vault = LocalVault::open(&platform::state::ensure_config_dir()?)?;
    let dispatcher = Dispatcher::new(Services::local(Arc::new(vault)));

    if let Commands::Serve(args) = command {
        serve::serve(dispatcher, args, cli.session).await?;
        return Ok(ExitCode::SUCCESS);
    }

    let stdin_is_terminal = std::io::stdin().is_terminal();
    let session = SessionContext::new(cli.session, !cli.nointeraction && stdin_is_terminal);

    let Some(request) = command.into_request(|| read_stdin(stdin_is_terminal)) else {
        return Ok(ExitCode::SUCCESS);
    };

    let response = dispatcher.dispatch(request, &session).await;
    let code = render_config.render_response(&response)?;
    Ok(ExitCode::from(code))
}

/// Piped input, if any. A terminal never counts as piped input.
fn read_stdin(is_terminal: bool) -> Option<String> {
    if is_terminal {
        return None;
    }

    let mut input = String::new();
    std::io::stdin().read_to_string(&mut input).ok()?;
    (!input.trim().is_empty()).then_some(input)
}
