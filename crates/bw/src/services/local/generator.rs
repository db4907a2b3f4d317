use async_trait::async_trait;
use rand::{Rng, RngCore, seq::SliceRandom};

use super::{LocalVault, wordlist::WORDS};
use crate::services::{
    GeneratorService, PassphraseGeneratorRequest, PasswordGeneratorRequest, ServiceError,
};

const LOWER: &[char] = &[
    'a', 'b', 'c', 'd', 'e', 'f', 'g', 'h', 'i', 'j', 'k', 'm', 'n', 'o', 'p', 'q', 'r', 's', 't',
    'u', 'v', 'w', 'x', 'y', 'z',
];
const UPPER: &[char] = &[
    'A', 'B', 'C', 'D', 'E', 'F', 'G', 'H', 'J', 'K', 'L', 'M', 'N', 'P', 'Q', 'R', 'S', 'T', 'U',
    'V', 'W', 'X', 'Y', 'Z',
];
const NUMBER: &[char] = &['2', '3', '4', '5', '6', '7', '8', '9'];
const SPECIAL: &[char] = &['!', '@', '#', '$', '%', '^', '&', '*'];

/// Passwords contain at least one character of every enabled class. Ambiguous characters are
/// left out of every class.
fn password_with_rng(
    mut rng: impl RngCore,
    request: &PasswordGeneratorRequest,
) -> Result<String, ServiceError> {
    let sets: Vec<&[char]> = [
        (request.lowercase, LOWER),
        (request.uppercase, UPPER),
        (request.numbers, NUMBER),
        (request.special, SPECIAL),
    ]
    .into_iter()
    .filter_map(|(enabled, set)| enabled.then_some(set))
    .collect();

    if sets.is_empty() {
        return Err(ServiceError::Api(
            "At least one character set must be enabled.".to_owned(),
        ));
    }
    let length = usize::from(request.length);
    if length < sets.len() {
        return Err(ServiceError::Api(format!(
            "Length must be at least {} with the selected character sets.",
            sets.len()
        )));
    }

    let all: Vec<char> = sets.iter().flat_map(|s| s.iter().copied()).collect();
    let mut chars: Vec<char> = sets
        .iter()
        .filter_map(|set| set.choose(&mut rng).copied())
        .collect();
    while chars.len() < length {
        if let Some(c) = all.choose(&mut rng) {
            chars.push(*c);
        }
    }
    chars.shuffle(&mut rng);

    Ok(chars.into_iter().collect())
}

fn passphrase_with_rng(
    mut rng: impl RngCore,
    request: &PassphraseGeneratorRequest,
) -> Result<String, ServiceError> {
    if request.num_words == 0 {
        return Err(ServiceError::Api(
            "Passphrases need at least one word.".to_owned(),
        ));
    }

    let mut words: Vec<String> = (0..request.num_words)
        .filter_map(|_| WORDS.choose(&mut rng))
        .map(|word| {
            if request.capitalize {
                capitalize_first_letter(word)
            } else {
                (*word).to_owned()
            }
        })
        .collect();

    if request.include_number {
        let index = rng.gen_range(0..words.len());
        let digit = rng.gen_range(0..10);
        words[index].push_str(&digit.to_string());
    }

    Ok(words.join(&request.word_separator))
}

fn capitalize_first_letter(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[async_trait]
impl GeneratorService for LocalVault {
    async fn password(&self, request: PasswordGeneratorRequest) -> Result<String, ServiceError> {
        password_with_rng(rand::thread_rng(), &request)
    }

    async fn passphrase(
        &self,
        request: PassphraseGeneratorRequest,
    ) -> Result<String, ServiceError> {
        passphrase_with_rng(rand::thread_rng(), &request)
    }
}
