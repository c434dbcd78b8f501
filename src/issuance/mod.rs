pub mod acme_workflow;
pub mod coordinator;
pub mod issuer;

pub use acme_workflow::AcmeIssuer;
pub use coordinator::{IssuanceCoordinator, IssuanceHandle, IssuanceState};
pub use issuer::{Issuer, IssuerError};
