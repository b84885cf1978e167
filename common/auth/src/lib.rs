pub mod claims;
pub mod config;
pub mod error;
pub mod extractors;
pub mod guards;
pub mod roles;
pub mod tokens;

pub use claims::Claims;
pub use config::{JwtConfig, DEFAULT_TOKEN_TTL_SECONDS, MAX_TOKEN_TTL_SECONDS};
pub use error::{AuthError, AuthResult};
pub use extractors::{authenticate, require_auth, AuthContext, OptionalAuth};
pub use guards::{authorize, GuardError, Operation};
pub use roles::{has_any_role, has_role, ROLE_ADMIN, ROLE_SUPER_ADMIN};
pub use tokens::{IssuedToken, TokenService, TokenSubject};
