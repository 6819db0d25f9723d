//! Built-in risk predicates.

pub mod eudr;
pub mod monitoring;
pub mod rspo;

pub use eudr::{DeforestationAlertPredicate, GeolocationPredicate, ProtectedAreaPredicate};
pub use monitoring::ElevatedRiskPredicate;
pub use rspo::CertificationPredicate;
