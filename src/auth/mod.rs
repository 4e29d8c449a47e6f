mod claims;
pub(crate) mod extractors;
pub mod jwt;
#[cfg(test)]
pub(crate) mod testing;

pub use extractors::AuthUser;
pub use jwt::{AuthError, FirebaseVerifier, IdentityVerifier, UserId};
