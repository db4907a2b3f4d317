use async_trait::async_trait;
use chrono::{DateTime, Utc};
use data_encoding::BASE32_NOPAD;
use hmac::{Hmac, Mac};
use sha1::Sha1;
use sha2::{Sha256, Sha512};

use super::LocalVault;
use crate::services::{ServiceError, TotpService};

const DEFAULT_ALGORITHM: Algorithm = Algorithm::Sha1;
const DEFAULT_DIGITS: u32 = 6;
const DEFAULT_PERIOD: u32 = 30;
const STEAM_CHARS: &str = "23456789BCDFGHJKMNPQRTVWXY";

#[derive(Clone, Copy, Debug, PartialEq)]
enum Algorithm {
    Sha1,
    Sha256,
    Sha512,
    Steam,
}

#[derive(Debug, PartialEq)]
struct Totp {
    algorithm: Algorithm,
    digits: u32,
    period: u32,
    secret: Vec<u8>,
}

fn decode_b32(secret: &str) -> Result<Vec<u8>, ServiceError> {
    let normalized: String = secret
        .chars()
        .filter(|c| !c.is_whitespace() && *c != '=')
        .collect::<String>()
        .to_uppercase();
    BASE32_NOPAD
        .decode(normalized.as_bytes())
        .map_err(|_| ServiceError::Api("Invalid TOTP secret.".to_owned()))
}

impl Totp {
    /// Parses `otpauth://` and `steam://` uris as well as bare base32 secrets.
    fn parse(key: &str) -> Result<Self, ServiceError> {
        let key = key.trim();

        if key.starts_with("otpauth://") {
            let url = reqwest::Url::parse(key)
                .map_err(|_| ServiceError::Api("Invalid TOTP uri.".to_owned()))?;

            let mut totp = Totp {
                algorithm: DEFAULT_ALGORITHM,
                digits: DEFAULT_DIGITS,
                period: DEFAULT_PERIOD,
                secret: Vec::new(),
            };
            for (name, value) in url.query_pairs() {
                match name.as_ref() {
                    "secret" => totp.secret = decode_b32(&value)?,
                    "digits" => {
                        totp.digits = value.parse().unwrap_or(DEFAULT_DIGITS).clamp(1, 10);
                    }
                    "period" => {
                        totp.period = value
                            .parse()
                            .ok()
                            .filter(|p| *p > 0)
                            .unwrap_or(DEFAULT_PERIOD);
                    }
                    "algorithm" => {
                        totp.algorithm = match value.to_lowercase().as_str() {
                            "sha256" => Algorithm::Sha256,
                            "sha512" => Algorithm::Sha512,
                            _ => Algorithm::Sha1,
                        }
                    }
                    _ => {}
                }
            }
            return Ok(totp);
        }

        if let Some(secret) = key.strip_prefix("steam://") {
            return Ok(Totp {
                algorithm: Algorithm::Steam,
                digits: 5,
                period: DEFAULT_PERIOD,
                secret: decode_b32(secret)?,
            });
        }

        Ok(Totp {
            algorithm: DEFAULT_ALGORITHM,
            digits: DEFAULT_DIGITS,
            period: DEFAULT_PERIOD,
            secret: decode_b32(key)?,
        })
    }

    fn derive(&self, time: DateTime<Utc>) -> Result<String, ServiceError> {
        let counter = (time.timestamp().max(0) as u64) / u64::from(self.period);
        let hash = self.hmac(&counter.to_be_bytes())?;

        let offset = usize::from(hash[hash.len() - 1] & 0x0f);
        let binary = u32::from_be_bytes([
            hash[offset] & 0x7f,
            hash[offset + 1],
            hash[offset + 2],
            hash[offset + 3],
        ]);

        if self.algorithm == Algorithm::Steam {
            let chars: Vec<char> = STEAM_CHARS.chars().collect();
            let mut full = binary as usize;
            let mut code = String::with_capacity(self.digits as usize);
            for _ in 0..self.digits {
                code.push(chars[full % chars.len()]);
                full /= chars.len();
            }
            return Ok(code);
        }

        let code = u64::from(binary) % 10u64.pow(self.digits);
        Ok(format!("{code:0width$}", width = self.digits as usize))
    }

    fn hmac(&self, data: &[u8]) -> Result<Vec<u8>, ServiceError> {
        let invalid = |_| ServiceError::Api("Invalid TOTP secret.".to_owned());
        Ok(match self.algorithm {
            Algorithm::Sha1 | Algorithm::Steam => {
                let mut mac = Hmac::<Sha1>::new_from_slice(&self.secret).map_err(invalid)?;
                mac.update(data);
                mac.finalize().into_bytes().to_vec()
            }
            Algorithm::Sha256 => {
                let mut mac = Hmac::<Sha256>::new_from_slice(&self.secret).map_err(invalid)?;
                mac.update(data);
                mac.finalize().into_bytes().to_vec()
            }
            Algorithm::Sha512 => {
                let mut mac = Hmac::<Sha512>::new_from_slice(&self.secret).map_err(invalid)?;
                mac.update(data);
                mac.finalize().into_bytes().to_vec()
            }
        })
    }
}

#[async_trait]
impl TotpService for LocalVault {
    async fn get_code(&self, key: String) -> Result<String, ServiceError> {
        Totp::parse(&key)?.derive(Utc::now())
    }
}
