use clap::Args;

use crate::{
    dispatch::{CommandRequest, Verb},
    options::{GenerateOptions, OptionBag},
    response::{CommandResult, Response, ResponseData},
    services::Services,
};

pub(crate) mod send;

#[derive(Args, Clone)]
pub struct GenerateArgs {
    #[arg(short = 'u', long, action, help = "Include uppercase characters.")]
    pub uppercase: bool,

    #[arg(short = 'l', long, action, help = "Include lowercase characters.")]
    pub lowercase: bool,

    #[arg(short = 'n', long, action, help = "Include numeric characters.")]
    pub number: bool,

    #[arg(short = 's', long, action, help = "Include special characters.")]
    pub special: bool,

    #[arg(short = 'p', long, action, help = "Generate a passphrase.")]
    pub passphrase: bool,

    #[arg(long, help = "Length of the password.")]
    pub length: Option<String>,

    #[arg(long, help = "Number of words.")]
    pub words: Option<String>,

    #[arg(
        long,
        help = "Word separator. `space` and `empty` stand for a space or no separator."
    )]
    pub separator: Option<String>,

    #[arg(long, action, help = "Title case passphrase.")]
    pub capitalize: bool,

    #[arg(
        long = "includeNumber",
        alias = "includenumber",
        action,
        help = "Passphrase includes number."
    )]
    pub include_number: bool,
}

impl GenerateArgs {
    pub(crate) fn into_request(self) -> CommandRequest {
        let mut options = OptionBag::new();
        options
            .insert_flag("uppercase", self.uppercase)
            .insert_flag("lowercase", self.lowercase)
            .insert_flag("number", self.number)
            .insert_flag("special", self.special)
            .insert_flag("passphrase", self.passphrase)
            .insert_opt("length", self.length)
            .insert_opt("words", self.words)
            .insert_opt("separator", self.separator)
            .insert_flag("capitalize", self.capitalize)
            .insert_flag("includenumber", self.include_number);
        CommandRequest::new(Verb::Generate).options(options)
    }
}

pub(crate) async fn generate(services: &Services, options: &GenerateOptions) -> CommandResult {
    let generated = if options.passphrase {
        services
            .generator
            .passphrase(options.passphrase_request())
            .await?
    } else {
        services
            .generator
            .password(options.password_request())
            .await?
    };

    Ok(Response::success_with(ResponseData::string(generated)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{dispatch::tests::Mocks, services::PasswordGeneratorRequest};

    fn args() -> GenerateArgs {
        GenerateArgs {
            uppercase: false,
            lowercase: false,
            number: false,
            special: false,
            passphrase: false,
            length: None,
            words: None,
            separator: None,
            capitalize: false,
            include_number: false,
        }
    }

    #[tokio::test]
    async fn test_generate_defaults() {
        let mut mocks = Mocks::default();
        mocks.crypto.expect_validate_session().never();
        mocks
            .generator
            .expect_password()
            .withf(|request| {
                *request
                    == PasswordGeneratorRequest {
                        lowercase: true,
                        uppercase: true,
                        numbers: true,
                        special: false,
                        length: 14,
                    }
            })
            .times(1)
            .returning(|_| Ok("Xk3bD9qLm2Pa7Z".to_owned()));

        let response = mocks.dispatch(args().into_request()).await;
        assert_eq!(
            response.data,
            Some(ResponseData::string("Xk3bD9qLm2Pa7Z"))
        );
    }

    #[tokio::test]
    async fn test_generate_passphrase_clamps_words() {
        let mut mocks = Mocks::default();
        mocks
            .generator
            .expect_passphrase()
            .withf(|request| {
                request.num_words == 3 && request.word_separator.is_empty() && request.capitalize
            })
            .times(1)
            .returning(|_| Ok("AlphaBravoCharlie".to_owned()));

        let response = mocks
            .dispatch(
                GenerateArgs {
                    passphrase: true,
                    words: Some("1".to_owned()),
                    separator: Some("empty".to_owned()),
                    capitalize: true,
                    ..args()
                }
                .into_request(),
            )
            .await;
        assert!(response.success);
    }
}
