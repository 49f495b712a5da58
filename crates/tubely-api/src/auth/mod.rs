//! Bearer-token authentication
//
// HS256 access tokens; the subject is the user's UUID.
pub mod jwt;
pub mod models;

pub use jwt::{JwtClaims, JwtKeys};
pub use models::AuthenticatedUser;
