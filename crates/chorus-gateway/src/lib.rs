//! chorus-gateway - HTTP boundary for the chorus hub
//!
//! Exposes stateless fan-out and session-scoped chat over a JSON API.

pub mod auth;
pub mod error;
pub mod server;

pub use error::ApiError;
pub use server::{GatewayServer, GatewayState};
