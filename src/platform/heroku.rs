use anyhow::{Context, Result, anyhow};
use log::debug;
use reqwest::blocking::{RequestBuilder, Response};
use reqwest::{Method, StatusCode};
use serde::{Deserialize, Serialize};

use super::http::{self, FailureKind};
use super::{ConfigVars, PlatformClient};
use crate::core::types::CertificateRecord;

const HEROKU_API_BASE: &str = "https://api.heroku.com";
const HEROKU_ACCEPT: &str = "application/vnd.heroku+json; version=3";

/// Heroku Platform API v3 client covering SNI endpoints and config vars.
pub struct HerokuClient {
    api_token: String,
    base_url: String,
}

#[derive(Serialize)]
struct HerokuSniEndpointBody<'a> {
    certificate_chain: &'a str,
    private_key: &'a str,
}

#[derive(Deserialize)]
struct HerokuSniEndpoint {
    name: String,
    #[serde(default)]
    ssl_cert: Option<HerokuSslCert>,
}

#[derive(Deserialize)]
struct HerokuSslCert {
    #[serde(default)]
    expires_at: String,
    #[serde(default)]
    cert_domains: Vec<String>,
}

/// Error document the Platform API returns with any non-2xx status.
#[derive(Deserialize)]
struct HerokuApiError {
    #[serde(default)]
    id: String,
    message: String,
}

impl From<HerokuSniEndpoint> for CertificateRecord {
    fn from(endpoint: HerokuSniEndpoint) -> Self {
        let (expires_at, domains) = match endpoint.ssl_cert {
            Some(cert) => (cert.expires_at, cert.cert_domains),
            None => (String::new(), Vec::new()),
        };
        CertificateRecord {
            name: endpoint.name,
            expires_at,
            domains,
        }
    }
}

impl HerokuClient {
    pub fn new(api_token: String) -> Self {
        Self::with_base_url(api_token, HEROKU_API_BASE)
    }

    /// Points the client at another API host (a proxy or a test server).
    pub fn with_base_url(api_token: String, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            api_token,
            base_url,
        }
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        http::shared_client()
            .request(method, format!("{}{}", self.base_url, path))
            .header("Accept", HEROKU_ACCEPT)
            .bearer_auth(&self.api_token)
    }

    fn ensure_success(response: Response) -> Result<Response> {
        if response.status().is_success() {
            return Ok(response);
        }
        let status = response.status();
        let body = response.text().unwrap_or_default();
        Err(api_error(status, &body))
    }

    fn sni_endpoints_path(app: &str) -> String {
        format!("/apps/{app}/sni-endpoints")
    }
}

impl PlatformClient for HerokuClient {
    fn list_certificates(&self, app: &str) -> Result<Vec<CertificateRecord>> {
        let response = self
            .request(Method::GET, &Self::sni_endpoints_path(app))
            .send()
            .context("Failed to list Heroku SNI endpoints")?;
        let endpoints: Vec<HerokuSniEndpoint> = Self::ensure_success(response)?
            .json()
            .context("Failed to parse Heroku SNI endpoint list")?;
        debug!("[heroku] {} has {} SNI endpoint(s)", app, endpoints.len());
        Ok(endpoints.into_iter().map(CertificateRecord::from).collect())
    }

    fn set_config_vars(&self, app: &str, vars: &ConfigVars) -> Result<()> {
        let response = self
            .request(Method::PATCH, &format!("/apps/{app}/config-vars"))
            .json(vars)
            .send()
            .context("Failed to update Heroku config vars")?;
        Self::ensure_success(response)?;
        debug!(
            "[heroku] set config vars {:?} on {}",
            vars.keys().collect::<Vec<_>>(),
            app
        );
        Ok(())
    }

    fn create_certificate(
        &self,
        app: &str,
        certificate_pem: &str,
        private_key_pem: &str,
    ) -> Result<CertificateRecord> {
        let body = HerokuSniEndpointBody {
            certificate_chain: certificate_pem,
            private_key: private_key_pem,
        };
        let response = self
            .request(Method::POST, &Self::sni_endpoints_path(app))
            .json(&body)
            .send()
            .context("Failed to create Heroku SNI endpoint")?;
        let endpoint: HerokuSniEndpoint = Self::ensure_success(response)?
            .json()
            .context("Failed to parse Heroku SNI endpoint response")?;
        Ok(endpoint.into())
    }

    fn update_certificate(
        &self,
        app: &str,
        name: &str,
        certificate_pem: &str,
        private_key_pem: &str,
    ) -> Result<CertificateRecord> {
        let body = HerokuSniEndpointBody {
            certificate_chain: certificate_pem,
            private_key: private_key_pem,
        };
        let response = self
            .request(
                Method::PATCH,
                &format!("{}/{}", Self::sni_endpoints_path(app), name),
            )
            .json(&body)
            .send()
            .context("Failed to update Heroku SNI endpoint")?;
        let endpoint: HerokuSniEndpoint = Self::ensure_success(response)?
            .json()
            .context("Failed to parse Heroku SNI endpoint response")?;
        Ok(endpoint.into())
    }
}

/// Turns a rejected response into an error carrying Heroku's own message and id.
fn api_error(status: StatusCode, body: &str) -> anyhow::Error {
    let detail = match serde_json::from_str::<HerokuApiError>(body) {
        Ok(err) if err.id.is_empty() => err.message,
        Ok(err) => format!("{} ({})", err.message, err.id),
        Err(_) if body.trim().is_empty() => status.to_string(),
        Err(_) => body.trim().to_string(),
    };
    match FailureKind::from_status(status) {
        FailureKind::Authentication => anyhow!("Heroku authentication failed: {detail}"),
        FailureKind::RateLimited => anyhow!("Heroku rate limit exceeded: {detail}"),
        FailureKind::Rejected => anyhow!("Heroku API error ({status}): {detail}"),
    }
}
