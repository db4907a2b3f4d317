use std::io::Write;

use bitwarden_cli::Color;
use clap::ValueEnum;
use color_eyre::eyre::{Result, eyre};
use serde::Serialize;

use crate::{
    command::Cli,
    response::{Response, ResponseData},
};

#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, ValueEnum, Debug)]
#[allow(clippy::upper_case_acronyms)]
pub enum Output {
    JSON,
    YAML,
}

/// What a response turns into on the terminal.
#[derive(Debug, PartialEq)]
pub(crate) enum Rendered {
    Stdout(Vec<u8>),
    Stderr(String),
    Nothing,
}

pub struct RenderConfig {
    pub output: Output,
    pub color: Color,
    pub pretty: bool,
    pub raw: bool,
    pub response: bool,
    pub cleanexit: bool,
    pub quiet: bool,
}

impl RenderConfig {
    pub fn new(cli: &Cli) -> Self {
        Self {
            output: cli.format,
            color: cli.color,
            pretty: cli.pretty,
            raw: cli.raw,
            response: cli.response,
            cleanexit: cli.cleanexit,
            quiet: cli.quiet,
        }
    }

    fn exit_code(&self, ok: bool) -> u8 {
        if ok || self.cleanexit {
            0
        } else {
            1
        }
    }

    /// Decide what to print and the exit code, without touching the terminal.
    pub(crate) fn render(&self, response: &Response) -> Result<(Rendered, u8)> {
        if self.response {
            let mut json = self.to_json(response)?;
            json.push('\n');
            let ok = response.success && !response.is_multiple_results();
            let rendered = if self.quiet {
                Rendered::Nothing
            } else {
                Rendered::Stdout(json.into_bytes())
            };
            return Ok((rendered, self.exit_code(ok)));
        }

        // Failures and ambiguous lookups go to stderr, even with --quiet
        if !response.success || response.is_multiple_results() {
            let message = response
                .message
                .clone()
                .unwrap_or_else(|| "An error occurred.".to_owned());
            return Ok((Rendered::Stderr(message), self.exit_code(false)));
        }

        if self.quiet {
            return Ok((Rendered::Nothing, 0));
        }

        let rendered = match &response.data {
            None => Rendered::Nothing,
            Some(ResponseData::String { data }) => Rendered::Stdout(line(data)),
            Some(ResponseData::Message {
                title,
                message,
                raw,
            }) => match raw {
                Some(raw) if self.raw => Rendered::Stdout(line(raw)),
                _ => {
                    let mut text = title.clone();
                    if let Some(message) = message {
                        text.push('\n');
                        text.push_str(message);
                    }
                    Rendered::Stdout(line(&text))
                }
            },
            Some(ResponseData::File { data, .. }) => Rendered::Stdout(data.clone()),
            Some(ResponseData::List { data }) => Rendered::Stdout(self.serialize(data)?),
            Some(ResponseData::Template { template }) => {
                Rendered::Stdout(self.serialize(template)?)
            }
            Some(ResponseData::Status { template }) => Rendered::Stdout(self.serialize(template)?),
            Some(object) => Rendered::Stdout(self.serialize(object)?),
        };
        Ok((rendered, 0))
    }

    fn to_json<T: Serialize + ?Sized>(&self, value: &T) -> Result<String> {
        Ok(if self.pretty {
            serde_json::to_string_pretty(value)?
        } else {
            serde_json::to_string(value)?
        })
    }

    fn serialize<T: Serialize + ?Sized>(&self, value: &T) -> Result<Vec<u8>> {
        let text = match self.output {
            Output::JSON => {
                let mut json = self.to_json(value)?;
                // Yaml serialization adds a newline at the end, so we do the same here for
                // consistency
                json.push('\n');
                json
            }
            Output::YAML => serde_yaml::to_string(value)?,
        };
        Ok(text.into_bytes())
    }

    /// Print the response and return the process exit code.
    pub fn render_response(&self, response: &Response) -> Result<u8> {
        let (rendered, code) = self.render(response)?;

        match rendered {
            Rendered::Nothing => {}
            Rendered::Stderr(message) => eprintln!("{message}"),
            Rendered::Stdout(bytes) => {
                let language = match self.output {
                    Output::JSON => "json",
                    Output::YAML => "yaml",
                };
                let structured = !self.response
                    && matches!(
                        response.data,
                        Some(
                            ResponseData::List { .. }
                                | ResponseData::Template { .. }
                                | ResponseData::Status { .. }
                                | ResponseData::Item(_)
                                | ResponseData::Folder(_)
                                | ResponseData::Collection(_)
                                | ResponseData::OrgCollection(_)
                                | ResponseData::Organization(_)
                                | ResponseData::OrgMember(_)
                                | ResponseData::Send(_)
                                | ResponseData::Attachment(_)
                        )
                    );

                if structured && self.color.is_enabled() {
                    bat::PrettyPrinter::new()
                        .input_from_bytes(&bytes)
                        .language(language)
                        .print()
                        .map_err(|e| eyre!("Failed to print output: {e}"))?;
                } else {
                    let mut stdout = std::io::stdout().lock();
                    stdout.write_all(&bytes)?;
                    stdout.flush()?;
                }
            }
        }

        Ok(code)
    }
}

fn line(text: &str) -> Vec<u8> {
    format!("{text}\n").into_bytes()
}
