//! Bearer-token authentication
//!
//! Token issuance lives with the external identity collaborator; this
//! service only validates JWTs and trusts the subject for ownership checks.

mod jwt;

pub use jwt::{extract_token_from_header, Claims, JwtValidator, TokenValidationResult};
