use std::time::Duration;

use crate::core::error::RenewalError;
use crate::core::types::KeyAlgorithm;
use crate::domain::normalize_domain;

pub const LETS_ENCRYPT_PRODUCTION: &str = "https://acme-v02.api.letsencrypt.org/directory";
pub const LETS_ENCRYPT_STAGING: &str = "https://acme-staging-v02.api.letsencrypt.org/directory";

/// Time given to the application to pick up new config vars (it restarts)
/// before the authority is told to check the challenge.
pub const DEFAULT_SETTLE_PERIOD: Duration = Duration::from_secs(5);

/// Everything a renewal run needs, built once at startup.
#[derive(Debug, Clone)]
pub struct RenewalConfig {
    pub email: String,
    pub domain: String,
    pub platform_token: String,
    pub app_name: String,
    pub force: bool,
    pub directory_url: String,
    pub key_algorithm: KeyAlgorithm,
    pub settle_period: Duration,
    /// Upper bound on the wait for a challenge acknowledgment. `None` waits forever.
    pub ack_timeout: Option<Duration>,
}

impl RenewalConfig {
    pub fn new(
        email: impl Into<String>,
        domain: impl Into<String>,
        platform_token: impl Into<String>,
        app_name: impl Into<String>,
    ) -> Self {
        Self {
            email: email.into(),
            domain: domain.into(),
            platform_token: platform_token.into(),
            app_name: app_name.into(),
            force: false,
            directory_url: LETS_ENCRYPT_PRODUCTION.to_string(),
            key_algorithm: KeyAlgorithm::default(),
            settle_period: DEFAULT_SETTLE_PERIOD,
            ack_timeout: None,
        }
    }

    /// Checks the fields and normalizes the domain. Runs before any network call.
    pub fn validate(mut self) -> Result<Self, RenewalError> {
        self.email = self.email.trim().to_string();
        match self.email.split_once('@') {
            Some((local, host)) if !local.is_empty() && !host.is_empty() => {}
            _ => {
                return Err(RenewalError::InvalidConfig(format!(
                    "account email {:?} is not a valid address",
                    self.email
                )));
            }
        }

        self.domain = normalize_domain(&self.domain)
            .map_err(|err| RenewalError::InvalidConfig(err.to_string()))?;

        if self.platform_token.trim().is_empty() {
            return Err(RenewalError::InvalidConfig(
                "platform API token is required".to_string(),
            ));
        }
        self.app_name = self.app_name.trim().to_string();
        if self.app_name.is_empty() {
            return Err(RenewalError::InvalidConfig(
                "application name is required".to_string(),
            ));
        }
        if self.directory_url.trim().is_empty() {
            return Err(RenewalError::InvalidConfig(
                "ACME directory URL is required".to_string(),
            ));
        }
        if let Some(timeout) = self.ack_timeout {
            // The ack is only sent after the settling wait, so a shorter bound
            // fails every attempt after the challenge is already published.
            if timeout <= self.settle_period {
                return Err(RenewalError::InvalidConfig(format!(
                    "acknowledgment timeout ({}s) must be longer than the settle period ({}s)",
                    timeout.as_secs_f64(),
                    self.settle_period.as_secs_f64()
                )));
            }
        }

        Ok(self)
    }
}
