//! Client for the docassist API.
//!
//! [`SessionClient`] holds one document session and exposes the
//! upload / chat / download cycle; [`view`] renders its state as text.

pub mod api;
pub mod config;
pub mod error;
pub mod models;
pub mod session;
pub mod view;

pub use config::ClientConfig;
pub use error::ClientError;
pub use session::SessionClient;
