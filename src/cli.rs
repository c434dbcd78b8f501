use std::process::ExitCode;
use std::time::Duration;

use clap::Parser;
use log::{error, info};

use crate::{
    core::{
        config::{DEFAULT_SETTLE_PERIOD, LETS_ENCRYPT_STAGING, RenewalConfig},
        error::RenewalError,
        types::KeyAlgorithm,
    },
    issuance::AcmeIssuer,
    orchestrator::Orchestrator,
    platform::HerokuClient,
};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Contact email for the ACME account
    #[arg(long, env = "ACME_EMAIL")]
    email: String,

    /// Domain the certificate is issued for
    #[arg(long, env = "ACME_DOMAIN")]
    domain: String,

    /// Heroku Platform API token
    #[arg(long = "heroku-token", env = "HEROKU_TOKEN", hide_env_values = true)]
    token: String,

    /// Heroku application serving the domain
    #[arg(long = "app", env = "ACME_APP_NAME")]
    app_name: String,

    /// Force updating the certificate even if it's not about to expire
    #[arg(long)]
    force: bool,

    /// Use the Let's Encrypt staging directory
    #[arg(long, conflicts_with = "directory_url")]
    staging: bool,

    /// ACME directory URL (defaults to Let's Encrypt production)
    #[arg(long, env = "ACME_DIRECTORY_URL")]
    directory_url: Option<String>,

    /// Key type for the issued certificate
    #[arg(long, value_enum, default_value_t = KeyAlgorithm::Rsa2048)]
    key_algorithm: KeyAlgorithm,

    /// Seconds to wait after publishing the challenge so the app can restart
    #[arg(long, default_value_t = DEFAULT_SETTLE_PERIOD.as_secs())]
    settle_secs: u64,

    /// Give up if the challenge is not acknowledged within this many seconds
    #[arg(long)]
    ack_timeout_secs: Option<u64>,
}

impl Cli {
    pub fn into_config(self) -> Result<RenewalConfig, RenewalError> {
        let mut config = RenewalConfig::new(self.email, self.domain, self.token, self.app_name);
        config.force = self.force;
        if self.staging {
            config.directory_url = LETS_ENCRYPT_STAGING.to_string();
        } else if let Some(url) = self.directory_url {
            config.directory_url = url;
        }
        config.key_algorithm = self.key_algorithm;
        config.settle_period = Duration::from_secs(self.settle_secs);
        config.ack_timeout = self.ack_timeout_secs.map(Duration::from_secs);
        config.validate()
    }
}

/// Entry point for the binary: one renewal attempt, then exit.
pub fn run() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = match Cli::parse().into_config() {
        Ok(config) => config,
        Err(err) => return fail(&err),
    };

    let platform = HerokuClient::new(config.platform_token.clone());
    let issuer = AcmeIssuer::new(config.directory_url.clone(), config.key_algorithm);
    match Orchestrator::new(&config, platform).run(issuer) {
        Ok(outcome) => {
            info!("cert.done {}", outcome);
            ExitCode::SUCCESS
        }
        Err(err) => fail(&err),
    }
}

fn fail(err: &RenewalError) -> ExitCode {
    error!("cert.error phase=\"{}\" cause=\"{}\"", err.phase(), err);
    ExitCode::FAILURE
}
