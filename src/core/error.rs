use std::fmt;

use thiserror::Error;

/// Phase of a run a failure is attributed to in the terminal log line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Configuration,
    CertificateCheck,
    Issuance,
    ChallengeValidation,
    CertificateCreation,
    CertificateUpdate,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Phase::Configuration => "configuration",
            Phase::CertificateCheck => "certificate check",
            Phase::Issuance => "issuance",
            Phase::ChallengeValidation => "challenge validation",
            Phase::CertificateCreation => "certificate creation",
            Phase::CertificateUpdate => "certificate update",
        };
        f.write_str(name)
    }
}

/// Every way a renewal run can end unsuccessfully. All of them are terminal:
/// nothing is retried within a run.
#[derive(Error, Debug)]
pub enum RenewalError {
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("found {count} certificates, can only update one; nothing done")]
    AmbiguousCertificates { count: usize },
    #[error("could not parse certificate expiry {value:?}: {source}")]
    ExpiryParse {
        value: String,
        #[source]
        source: chrono::ParseError,
    },
    #[error("platform call failed during {phase}: {source:#}")]
    Platform {
        phase: Phase,
        #[source]
        source: anyhow::Error,
    },
    #[error("certificate authority error: {0}")]
    Authority(String),
    #[error("issuance coordinator failed: {0}")]
    Coordinator(String),
}

impl RenewalError {
    pub fn platform(phase: Phase, source: anyhow::Error) -> Self {
        RenewalError::Platform { phase, source }
    }

    pub fn phase(&self) -> Phase {
        match self {
            RenewalError::InvalidConfig(_) => Phase::Configuration,
            RenewalError::AmbiguousCertificates { .. } | RenewalError::ExpiryParse { .. } => {
                Phase::CertificateCheck
            }
            RenewalError::Platform { phase, .. } => *phase,
            RenewalError::Authority(_) | RenewalError::Coordinator(_) => Phase::Issuance,
        }
    }
}
