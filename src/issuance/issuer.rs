use thiserror::Error;

use crate::core::types::{ChallengeEvent, IssuedCertificate};

/// Core issuer operations the issuance coordinator drives, in call order.
///
/// The issuer value itself only carries configuration and is moved onto the
/// coordinator thread; account and order state is created and consumed on
/// that thread, so those types need not be `Send`.
pub trait Issuer: Send + 'static {
    type Account;
    type Order;

    fn ensure_account(&self, email: &str) -> Result<Self::Account, IssuerError>;
    fn begin_order(&self, account: &Self::Account, domain: &str)
        -> Result<Self::Order, IssuerError>;
    /// The http-01 challenge still to be satisfied, or `None` when the
    /// authority already considers the domain authorized.
    fn pending_challenge(&self, order: &mut Self::Order)
        -> Result<Option<ChallengeEvent>, IssuerError>;
    /// Asks the authority to check the published challenge and waits for its verdict.
    fn validate(&self, order: &mut Self::Order) -> Result<(), IssuerError>;
    fn finalize(&self, order: Self::Order) -> Result<IssuedCertificate, IssuerError>;
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum IssuerError {
    #[error("account setup failed: {0}")]
    Account(String),
    #[error("order creation failed: {0}")]
    Order(String),
    #[error("challenge negotiation failed: {0}")]
    Challenge(String),
    #[error("challenge validation failed: {0}")]
    Validation(String),
    #[error("certificate issuance failed: {0}")]
    Finalize(String),
}
