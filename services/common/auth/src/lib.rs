pub mod claims;
pub mod clock;
pub mod config;
pub mod error;
pub mod extractors;
pub mod key_cache;
pub mod key_resolver;
pub mod middleware;
pub mod verifier;

#[cfg(test)]
mod test_support;

pub use claims::{Audience, IdentityClaims, NumericDate, TokenHeader, VerifiedIdentity};
pub use clock::{Clock, FixedClock, SystemClock};
pub use config::{ConfigSource, ProcessEnv, RuntimeAuthConfig};
pub use error::{AuthError, AuthResult, ErrorCategory};
pub use extractors::AuthContext;
pub use key_cache::{CachingKeyResolver, KeyCache};
pub use key_resolver::{extract_key_id, KeyResolver, RemoteKeyStore};
pub use middleware::{jwt_auth, AuthState};
pub use verifier::{TokenVerifier, VerifyParams};
