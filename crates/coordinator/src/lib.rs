//! Client side of the coordinator protocol: register, fetch, claim, submit.

pub mod client;
pub mod error;
pub mod http;

pub use client::{JobCoordinatorClient, RegistrationOutcome};
pub use error::CoordinatorError;
pub use http::HttpCoordinatorClient;
