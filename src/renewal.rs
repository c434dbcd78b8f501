//! Renew-or-skip decision for the certificate currently installed on the platform.
//!
//! The decision is a pure function of the certificate snapshot, the force
//! flag and the current instant, so evaluating it twice on the same inputs
//! always gives the same answer.

use chrono::{DateTime, Months, Utc};

use crate::core::error::RenewalError;
use crate::core::types::CertificateRecord;

/// How long before expiry a certificate becomes due for renewal.
pub const RENEWAL_LEAD: Months = Months::new(1);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenewReason {
    Forced,
    NoCertificate,
    Due {
        expires_at: DateTime<Utc>,
        renew_at: DateTime<Utc>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenewalDecision {
    Renew(RenewReason),
    Skip {
        name: String,
        expires_at: DateTime<Utc>,
        renew_at: DateTime<Utc>,
    },
}

/// Latest expiry that still triggers a renewal when evaluated at `now`.
pub fn renewal_threshold(now: DateTime<Utc>) -> DateTime<Utc> {
    now.checked_add_months(RENEWAL_LEAD).unwrap_or(now)
}

/// Parses the platform's expiry timestamp.
pub fn parse_expiry(value: &str) -> Result<DateTime<Utc>, RenewalError> {
    DateTime::parse_from_rfc3339(value.trim())
        .map(|parsed| parsed.with_timezone(&Utc))
        .map_err(|source| RenewalError::ExpiryParse {
            value: value.to_string(),
            source,
        })
}

/// Decides whether to renew.
///
/// More than one certificate is ambiguous and fails even when forced. Skipping
/// needs exactly one certificate, `force == false`, and an expiry past the
/// renewal threshold.
pub fn decide(
    certificates: &[CertificateRecord],
    force: bool,
    now: DateTime<Utc>,
) -> Result<RenewalDecision, RenewalError> {
    if certificates.len() > 1 {
        return Err(RenewalError::AmbiguousCertificates {
            count: certificates.len(),
        });
    }
    if force {
        return Ok(RenewalDecision::Renew(RenewReason::Forced));
    }
    let Some(current) = certificates.first() else {
        return Ok(RenewalDecision::Renew(RenewReason::NoCertificate));
    };

    let expires_at = parse_expiry(&current.expires_at)?;
    let renew_at = renewal_threshold(now);
    if expires_at > renew_at {
        Ok(RenewalDecision::Skip {
            name: current.name.clone(),
            expires_at,
            renew_at,
        })
    } else {
        Ok(RenewalDecision::Renew(RenewReason::Due {
            expires_at,
            renew_at,
        }))
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone};

    use super::*;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 10, 12, 0, 0).unwrap()
    }

    fn record(expires_at: DateTime<Utc>) -> CertificateRecord {
        CertificateRecord {
            name: "tokyo-1234".into(),
            expires_at: expires_at.to_rfc3339(),
            domains: vec!["www.example.com".into()],
        }
    }

    #[test]
    fn skips_when_expiry_is_beyond_one_month() {
        let certs = [record(now() + Duration::days(60))];
        let decision = decide(&certs, false, now()).unwrap();
        match decision {
            RenewalDecision::Skip { name, renew_at, .. } => {
                assert_eq!(name, "tokyo-1234");
                assert_eq!(renew_at, Utc.with_ymd_and_hms(2026, 4, 10, 12, 0, 0).unwrap());
            }
            other => panic!("expected skip, got {other:?}"),
        }
    }

    #[test]
    fn renews_when_expiry_is_within_one_month() {
        let certs = [record(now() + Duration::days(10))];
        let decision = decide(&certs, false, now()).unwrap();
        assert!(matches!(decision, RenewalDecision::Renew(RenewReason::Due { .. })));
    }

    #[test]
    fn expiry_exactly_at_threshold_renews() {
        let certs = [record(renewal_threshold(now()))];
        let decision = decide(&certs, false, now()).unwrap();
        assert!(matches!(decision, RenewalDecision::Renew(RenewReason::Due { .. })));
    }

    #[test]
    fn force_never_skips() {
        for days in [-5, 10, 45, 400] {
            let certs = [record(now() + Duration::days(days))];
            let decision = decide(&certs, true, now()).unwrap();
            assert_eq!(decision, RenewalDecision::Renew(RenewReason::Forced));
        }
    }

    #[test]
    fn no_certificate_renews_without_force() {
        let decision = decide(&[], false, now()).unwrap();
        assert_eq!(decision, RenewalDecision::Renew(RenewReason::NoCertificate));
    }

    #[test]
    fn more_than_one_certificate_is_ambiguous_even_when_forced() {
        let certs = [
            record(now() + Duration::days(60)),
            record(now() + Duration::days(5)),
        ];
        for force in [false, true] {
            let err = decide(&certs, force, now()).unwrap_err();
            assert!(matches!(err, RenewalError::AmbiguousCertificates { count: 2 }));
        }
    }

    #[test]
    fn malformed_expiry_is_an_error() {
        let certs = [CertificateRecord {
            name: "tokyo-1234".into(),
            expires_at: "next tuesday".into(),
            domains: vec![],
        }];
        let err = decide(&certs, false, now()).unwrap_err();
        assert!(matches!(err, RenewalError::ExpiryParse { .. }));
    }

    #[test]
    fn malformed_expiry_is_ignored_when_forced() {
        let certs = [CertificateRecord {
            name: "tokyo-1234".into(),
            expires_at: String::new(),
            domains: vec![],
        }];
        let decision = decide(&certs, true, now()).unwrap();
        assert_eq!(decision, RenewalDecision::Renew(RenewReason::Forced));
    }

    #[test]
    fn decision_is_repeatable_on_the_same_snapshot() {
        let certs = [record(now() + Duration::days(31))];
        let first = decide(&certs, false, now()).unwrap();
        let second = decide(&certs, false, now()).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn parses_offsets_into_utc() {
        let parsed = parse_expiry("2026-05-01T09:00:00+02:00").unwrap();
        assert_eq!(parsed, Utc.with_ymd_and_hms(2026, 5, 1, 7, 0, 0).unwrap());
    }
}
