use async_trait::async_trait;
use data_encoding::HEXUPPER;
use sha1::{Digest, Sha1};
use tracing::debug;

use super::LocalVault;
use crate::services::{AuditService, ServiceError};

const PWNED_PASSWORDS_API: &str = "https://api.pwnedpasswords.com/range";

/// Find the breach count for `suffix` in a range response body of `SUFFIX:COUNT` lines.
fn count_in_range(body: &str, suffix: &str) -> u32 {
    body.lines()
        .filter_map(|line| line.trim().split_once(':'))
        .find(|(candidate, _)| candidate.eq_ignore_ascii_case(suffix))
        .and_then(|(_, count)| count.trim().parse().ok())
        .unwrap_or(0)
}

#[async_trait]
impl AuditService for LocalVault {
    async fn password_leaked(&self, password: String) -> Result<u32, ServiceError> {
        let hash = HEXUPPER.encode(&Sha1::digest(password.as_bytes()));
        let (prefix, suffix) = hash.split_at(5);

        debug!(prefix, "Querying breached password range");
        let body = reqwest::Client::new()
            .get(format!("{PWNED_PASSWORDS_API}/{prefix}"))
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;

        Ok(count_in_range(&body, suffix))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_count_in_range() {
        let body = "0018A45C4D1DEF81644B54AB7F969B88D65:1\r\n\
                    1E4C9B93F3F0682250B6CF8331B7EE68FD8:3730471\r\n\
                    1E4C9B93F3F0682250B6CF8331B7EE68FD9:2\r\n";
        assert_eq!(
            count_in_range(body, "1E4C9B93F3F0682250B6CF8331B7EE68FD8"),
            3730471
        );
        assert_eq!(
            count_in_range(body, "1e4c9b93f3f0682250b6cf8331b7ee68fd9"),
            2
        );
        assert_eq!(count_in_range(body, "FFFFF"), 0);
    }
}
