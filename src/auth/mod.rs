//! Session resolution and caller context.
//!
//! The gate never talks to a database. It establishes the caller's state
//! from request headers alone:
//!
//! - **Verified**: a session token (bearer header or session cookie) that
//!   passes HS256 signature and expiry checks. Carries claims. When several
//!   candidates are present, the first one that verifies wins.
//! - **CookiePresent**: no token secret is configured, so a non-empty
//!   session cookie is accepted on presence alone. Bearer headers are not
//!   consulted in this mode. This is a coarse signal, not authentication;
//!   it carries no email and can never pass an admin check.
//! - **Absent**: no credential.
//!
//! ## Usage
//!
//! ```ignore
//! let resolver = SessionResolver::new(&config);
//! let state = resolver.resolve(request.headers()).unwrap_or(SessionState::Absent);
//! let ctx = SessionContext::from_state(&state, &allow_list);
//! ```

mod context;
mod extractor;

pub use context::{AuthTier, SessionClaims, SessionContext, SessionState};
pub use extractor::{
    Evidence, EvidenceSource, SessionError, SessionResolver, fingerprint, parse_cookie_header,
};
