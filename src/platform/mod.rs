use std::collections::BTreeMap;

use anyhow::Result;

use crate::core::types::{CertificateRecord, ChallengeEvent};

mod heroku;
pub(crate) mod http;

pub use heroku::HerokuClient;

/// Config var the application reads the challenge token from.
pub const CHALLENGE_TOKEN_VAR: &str = "ACME_TOKEN";
/// Config var holding the key authorization served at the token's path.
pub const CHALLENGE_KEY_VAR: &str = "ACME_KEY";

pub type ConfigVars = BTreeMap<String, String>;

/// Request/response access to the hosting platform. Implementations keep no
/// state between calls and never retry.
pub trait PlatformClient {
    fn list_certificates(&self, app: &str) -> Result<Vec<CertificateRecord>>;
    fn set_config_vars(&self, app: &str, vars: &ConfigVars) -> Result<()>;
    fn create_certificate(
        &self,
        app: &str,
        certificate_pem: &str,
        private_key_pem: &str,
    ) -> Result<CertificateRecord>;
    fn update_certificate(
        &self,
        app: &str,
        name: &str,
        certificate_pem: &str,
        private_key_pem: &str,
    ) -> Result<CertificateRecord>;
}

impl<P: PlatformClient + ?Sized> PlatformClient for &P {
    fn list_certificates(&self, app: &str) -> Result<Vec<CertificateRecord>> {
        (**self).list_certificates(app)
    }

    fn set_config_vars(&self, app: &str, vars: &ConfigVars) -> Result<()> {
        (**self).set_config_vars(app, vars)
    }

    fn create_certificate(
        &self,
        app: &str,
        certificate_pem: &str,
        private_key_pem: &str,
    ) -> Result<CertificateRecord> {
        (**self).create_certificate(app, certificate_pem, private_key_pem)
    }

    fn update_certificate(
        &self,
        app: &str,
        name: &str,
        certificate_pem: &str,
        private_key_pem: &str,
    ) -> Result<CertificateRecord> {
        (**self).update_certificate(app, name, certificate_pem, private_key_pem)
    }
}

/// The config vars that make a challenge discoverable by the application.
pub fn challenge_config_vars(challenge: &ChallengeEvent) -> ConfigVars {
    ConfigVars::from([
        (CHALLENGE_TOKEN_VAR.to_string(), challenge.token.clone()),
        (
            CHALLENGE_KEY_VAR.to_string(),
            challenge.key_authorization.clone(),
        ),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn challenge_vars_carry_token_and_key() {
        let vars = challenge_config_vars(&ChallengeEvent {
            token: "tok".into(),
            key_authorization: "tok.thumb".into(),
        });
        assert_eq!(vars.len(), 2);
        assert_eq!(vars.get("ACME_TOKEN").map(String::as_str), Some("tok"));
        assert_eq!(vars.get("ACME_KEY").map(String::as_str), Some("tok.thumb"));
    }
}
