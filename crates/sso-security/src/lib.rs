//! # SSO Security
//! 
//! Security primitives: password hashing, access-token signing and opaque
//! secret generation. Stateless; everything here is safe to share across
//! requests.

pub mod jwt;
pub mod password;
pub mod secret;

pub use jwt::{AccessToken, Claims, JwtError, JwtService, TokenSubject};
pub use password::{PasswordError, PasswordService};
