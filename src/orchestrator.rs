//! Top-level control loop for one renewal run.
//!
//! Fetches the platform's certificates once, decides whether to renew,
//! launches a single issuance attempt and reacts to its events one at a
//! time. It is the only consumer of the coordinator's events and the only
//! caller of the platform client, so at most one platform call is in flight.

use std::{fmt, thread};

use chrono::{DateTime, TimeZone, Utc};
use log::{debug, info, warn};
use sha2::{Digest, Sha256};
use x509_parser::pem::parse_x509_pem;

use crate::{
    core::{
        config::RenewalConfig,
        error::{Phase, RenewalError},
        types::{
            Acknowledgement, CertificateRecord, ChallengeEvent, CoordinatorEvent,
            IssuedCertificate,
        },
    },
    domain::normalize_domain_for_display,
    issuance::{IssuanceCoordinator, IssuanceHandle, Issuer},
    platform::{PlatformClient, challenge_config_vars},
    renewal::{self, RenewalDecision},
};

/// How a successful run ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    Skipped {
        name: String,
        expires_at: DateTime<Utc>,
    },
    Created(CertificateRecord),
    Updated(CertificateRecord),
}

impl fmt::Display for RunOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunOutcome::Skipped { name, expires_at } => {
                write!(f, "skipped name={name} expires_at={expires_at}")
            }
            RunOutcome::Created(record) => write!(f, "created name={}", record.name),
            RunOutcome::Updated(record) => write!(f, "updated name={}", record.name),
        }
    }
}

pub struct Orchestrator<'a, P: PlatformClient> {
    config: &'a RenewalConfig,
    platform: P,
}

impl<'a, P: PlatformClient> Orchestrator<'a, P> {
    pub fn new(config: &'a RenewalConfig, platform: P) -> Self {
        Self { config, platform }
    }

    pub fn run<I: Issuer>(&self, issuer: I) -> Result<RunOutcome, RenewalError> {
        self.run_at(issuer, Utc::now())
    }

    /// Runs with an explicit "now" for the renewal decision.
    pub fn run_at<I: Issuer>(
        &self,
        issuer: I,
        now: DateTime<Utc>,
    ) -> Result<RunOutcome, RenewalError> {
        let app = &self.config.app_name;
        info!("cert.check app='{}'", app);
        let certificates = self
            .platform
            .list_certificates(app)
            .map_err(|err| RenewalError::platform(Phase::CertificateCheck, err))?;

        match renewal::decide(&certificates, self.config.force, now)? {
            RenewalDecision::Skip {
                name,
                expires_at,
                renew_at,
            } => {
                info!(
                    "cert.ignore_update name=\"{}\" expires_at=\"{}\" renew_at=\"{}\"",
                    name, expires_at, renew_at
                );
                return Ok(RunOutcome::Skipped { name, expires_at });
            }
            RenewalDecision::Renew(reason) => debug!("[orchestrator] renewing: {:?}", reason),
        }

        info!(
            "cert.create email='{}' domain='{}'",
            self.config.email,
            normalize_domain_for_display(&self.config.domain)
        );
        let handle = IssuanceCoordinator::new(issuer)
            .with_ack_timeout(self.config.ack_timeout)
            .create(self.config.email.clone(), self.config.domain.clone())
            .map_err(|err| {
                RenewalError::Coordinator(format!("failed to start issuance thread: {err}"))
            })?;

        let result = self.drive(&handle, certificates.first());
        match handle.finish() {
            Some(state) if state.is_terminal() => {
                debug!("[orchestrator] issuance attempt ended in state {}", state)
            }
            Some(state) => debug!("[orchestrator] issuance attempt abandoned in state {}", state),
            None => warn!("[orchestrator] issuance thread panicked"),
        }
        result
    }

    fn drive(
        &self,
        handle: &IssuanceHandle,
        existing: Option<&CertificateRecord>,
    ) -> Result<RunOutcome, RenewalError> {
        loop {
            let Some(event) = handle.recv() else {
                return Err(RenewalError::Coordinator(
                    "issuance ended without reporting a result".to_string(),
                ));
            };
            match event {
                CoordinatorEvent::Error(reason) => return Err(RenewalError::Authority(reason)),
                CoordinatorEvent::Challenge(challenge) => {
                    self.publish_challenge(&challenge)?;
                    if handle.acknowledge(Acknowledgement::validate()).is_err() {
                        warn!("[orchestrator] coordinator stopped before the acknowledgment");
                    }
                }
                CoordinatorEvent::Progress(msg) => info!("cert.com msg={}", msg),
                CoordinatorEvent::Issued(certificate) => {
                    return self.persist(&certificate, existing);
                }
            }
        }
    }

    /// Pushes the challenge to the application and waits out the settling period.
    fn publish_challenge(&self, challenge: &ChallengeEvent) -> Result<(), RenewalError> {
        info!("cert.validate token='{}'", challenge.token);
        self.platform
            .set_config_vars(&self.config.app_name, &challenge_config_vars(challenge))
            .map_err(|err| RenewalError::platform(Phase::ChallengeValidation, err))?;

        debug!(
            "[orchestrator] waiting {:?} for {} to pick up the challenge",
            self.config.settle_period, self.config.app_name
        );
        thread::sleep(self.config.settle_period);
        Ok(())
    }

    fn persist(
        &self,
        certificate: &IssuedCertificate,
        existing: Option<&CertificateRecord>,
    ) -> Result<RunOutcome, RenewalError> {
        match inspect_certificate(&certificate.certificate_pem) {
            Ok(summary) => info!(
                "cert.created expires_at=\"{}\" sha256={}",
                summary.not_after, summary.fingerprint
            ),
            Err(err) => {
                info!("cert.created");
                warn!("[orchestrator] could not inspect issued certificate: {err}");
            }
        }

        let app = &self.config.app_name;
        match existing {
            None => {
                let record = self
                    .platform
                    .create_certificate(
                        app,
                        &certificate.certificate_pem,
                        &certificate.private_key_pem,
                    )
                    .map_err(|err| RenewalError::platform(Phase::CertificateCreation, err))?;
                info!("cert.added name=\"{}\"", record.name);
                Ok(RunOutcome::Created(record))
            }
            Some(current) => {
                let record = self
                    .platform
                    .update_certificate(
                        app,
                        &current.name,
                        &certificate.certificate_pem,
                        &certificate.private_key_pem,
                    )
                    .map_err(|err| RenewalError::platform(Phase::CertificateUpdate, err))?;
                info!("cert.updated name=\"{}\"", record.name);
                Ok(RunOutcome::Updated(record))
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CertificateSummary {
    pub not_after: DateTime<Utc>,
    pub fingerprint: String,
}

/// Reads expiry and SHA-256 fingerprint of the leaf in a PEM chain.
pub fn inspect_certificate(pem: &str) -> anyhow::Result<CertificateSummary> {
    let (_, pem_block) = parse_x509_pem(pem.as_bytes())
        .map_err(|e| anyhow::anyhow!("failed to parse issued certificate PEM: {e}"))?;
    let cert = pem_block
        .parse_x509()
        .map_err(|e| anyhow::anyhow!(e.to_string()))?;
    let not_after = Utc
        .timestamp_opt(cert.validity().not_after.timestamp(), 0)
        .single()
        .ok_or_else(|| anyhow::anyhow!("certificate expiry out of range"))?;
    let fingerprint = {
        let mut hasher = Sha256::new();
        hasher.update(cert.as_raw());
        hex::encode(hasher.finalize())
    };
    Ok(CertificateSummary {
        not_after,
        fingerprint,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inspect_rejects_garbage() {
        assert!(inspect_certificate("not a certificate").is_err());
    }

    #[test]
    fn inspect_reads_generated_certificate() -> anyhow::Result<()> {
        let key = rcgen::KeyPair::generate()?;
        let params = rcgen::CertificateParams::new(vec!["www.example.com".to_string()])?;
        let cert = params.self_signed(&key)?;
        let summary = inspect_certificate(&cert.pem())?;
        assert_eq!(summary.fingerprint.len(), 64);
        assert!(summary.not_after > Utc.with_ymd_and_hms(2000, 1, 1, 0, 0, 0).unwrap());
        Ok(())
    }

    #[test]
    fn outcome_display() {
        let record = CertificateRecord {
            name: "tokyo-1".into(),
            expires_at: String::new(),
            domains: vec![],
        };
        assert_eq!(RunOutcome::Updated(record.clone()).to_string(), "updated name=tokyo-1");
        assert_eq!(RunOutcome::Created(record).to_string(), "created name=tokyo-1");
    }
}
