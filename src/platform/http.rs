use std::sync::OnceLock;
use std::time::Duration;

use log::warn;
use reqwest::StatusCode;
use reqwest::blocking::Client;

pub const TIMEOUT_ENV: &str = "CERT_RENEWER_HTTP_TIMEOUT_SECS";

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(15);
const USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));

/// Blocking client shared by every platform call of the run.
pub fn shared_client() -> &'static Client {
    static CLIENT: OnceLock<Client> = OnceLock::new();
    CLIENT.get_or_init(|| {
        let timeout = timeout_from_env(std::env::var(TIMEOUT_ENV).ok().as_deref());
        Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()
            .unwrap_or_else(|err| {
                warn!("[platform-http] failed to build shared client: {err}");
                Client::new()
            })
    })
}

fn timeout_from_env(raw: Option<&str>) -> Duration {
    let Some(raw) = raw else {
        return DEFAULT_TIMEOUT;
    };
    match raw.trim().parse::<u64>() {
        Ok(secs) if secs > 0 => Duration::from_secs(secs),
        _ => {
            warn!(
                "[platform-http] ignoring {}={:?}; using {}s",
                TIMEOUT_ENV,
                raw,
                DEFAULT_TIMEOUT.as_secs()
            );
            DEFAULT_TIMEOUT
        }
    }
}

/// How a rejected platform response is reported to the operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    Authentication,
    RateLimited,
    Rejected,
}

impl FailureKind {
    pub fn from_status(status: StatusCode) -> Self {
        match status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => FailureKind::Authentication,
            StatusCode::TOO_MANY_REQUESTS => FailureKind::RateLimited,
            _ => FailureKind::Rejected,
        }
    }
}
