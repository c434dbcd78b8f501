use std::fmt;

use clap::ValueEnum;

/// Snapshot of a certificate installed on the hosting platform.
/// Fetched once per run and never refreshed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CertificateRecord {
    /// Platform-side name of the certificate; this is what the update call addresses.
    pub name: String,
    /// Expiry as reported by the platform (RFC 3339). Kept raw so a malformed
    /// value surfaces as its own error when the renewal decision is made.
    pub expires_at: String,
    /// Domains the platform lists for this certificate, informational only.
    pub domains: Vec<String>,
}

/// Domain-validation challenge the caller has to make discoverable before the
/// authority re-checks it.
#[derive(Clone, PartialEq, Eq)]
pub struct ChallengeEvent {
    pub token: String,
    pub key_authorization: String,
}

impl fmt::Debug for ChallengeEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChallengeEvent")
            .field("token", &self.token)
            .field("key_authorization", &"<redacted>")
            .finish()
    }
}

/// Terminal success value of one issuance attempt.
#[derive(Clone, PartialEq, Eq)]
pub struct IssuedCertificate {
    /// Full chain, leaf first.
    pub certificate_pem: String,
    pub private_key_pem: String,
}

impl fmt::Debug for IssuedCertificate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IssuedCertificate")
            .field("certificate_pem", &format!("{} bytes", self.certificate_pem.len()))
            .field("private_key_pem", &"<redacted>")
            .finish()
    }
}

/// Everything the coordinator tells its caller. `Error` and `Issued` are
/// terminal: nothing follows either of them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CoordinatorEvent {
    Error(String),
    Challenge(ChallengeEvent),
    Progress(String),
    Issued(IssuedCertificate),
}

/// Sent by the caller once a published challenge has had time to propagate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Acknowledgement(pub String);

impl Acknowledgement {
    pub fn validate() -> Self {
        Self("validate".to_string())
    }
}

impl fmt::Display for Acknowledgement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Key type used for the private key of the issued certificate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum KeyAlgorithm {
    #[default]
    Rsa2048,
    Rsa4096,
    EcdsaP256,
    EcdsaP384,
}

impl fmt::Display for KeyAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            KeyAlgorithm::Rsa2048 => "rsa2048",
            KeyAlgorithm::Rsa4096 => "rsa4096",
            KeyAlgorithm::EcdsaP256 => "ecdsa-p256",
            KeyAlgorithm::EcdsaP384 => "ecdsa-p384",
        };
        f.write_str(name)
    }
}
