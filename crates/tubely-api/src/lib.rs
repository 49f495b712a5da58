//! Tubely API Library
//!
//! HTTP handlers, authentication and application setup for the upload service.

mod handlers;

pub mod auth;
pub mod constants;
pub mod error;
pub mod setup;
pub mod state;

pub use error::{ErrorResponse, HttpAppError};
pub use state::AppState;
