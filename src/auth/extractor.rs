//! Session evidence extraction for HTTP requests.

use std::fmt;

use http::HeaderMap;
use http::header::{AUTHORIZATION, COOKIE};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode};
use sha2::{Digest, Sha256};
use tracing::debug;

use crate::auth::context::{SessionClaims, SessionState};
use crate::config::GateConfig;
use crate::types::EvidenceFingerprint;

/// Session resolution errors.
///
/// None of these reach the caller; the gate treats them as "no session".
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    /// A credential header was not valid UTF-8
    MalformedHeader(&'static str),
    /// Token failed signature or claim validation
    InvalidToken(String),
    /// Token signature is fine but `exp` has passed
    Expired,
}

impl fmt::Display for SessionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MalformedHeader(name) => write!(f, "Malformed {} header", name),
            Self::InvalidToken(msg) => write!(f, "Invalid token: {}", msg),
            Self::Expired => write!(f, "Session token has expired"),
        }
    }
}

impl std::error::Error for SessionError {}

/// Where a credential was found.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EvidenceSource {
    Bearer,
    Cookie(String),
}

/// A raw credential taken from the request.
#[derive(Clone, PartialEq, Eq)]
pub struct Evidence {
    pub source: EvidenceSource,
    value: String,
}

impl Evidence {
    pub fn fingerprint(&self) -> EvidenceFingerprint {
        fingerprint(&self.value)
    }
}

impl fmt::Debug for Evidence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Evidence")
            .field("source", &self.source)
            .field("fingerprint", &self.fingerprint())
            .finish()
    }
}

enum Verification {
    Signed {
        key: DecodingKey,
        validation: Box<Validation>,
    },
    PresenceOnly,
}

/// Resolves session state from request headers without any I/O.
///
/// With a token secret configured every credential must verify as an HS256
/// JWT, from a bearer header or a session cookie. Without one, only the
/// session cookies are consulted and a non-empty value is accepted as a
/// coarse signal: cheaper, but it is not authentication and yields no
/// identity.
pub struct SessionResolver {
    cookie_names: Vec<String>,
    verification: Verification,
}

impl SessionResolver {
    pub fn new(config: &GateConfig) -> Self {
        let verification = match config.token_secret.as_deref() {
            Some(secret) => {
                let mut validation = Validation::new(Algorithm::HS256);
                if let Some(issuer) = &config.jwt_issuer {
                    validation.set_issuer(&[issuer]);
                }
                match &config.jwt_audience {
                    Some(audience) => validation.set_audience(&[audience]),
                    None => validation.validate_aud = false,
                }
                Verification::Signed {
                    key: DecodingKey::from_secret(secret.as_bytes()),
                    validation: Box::new(validation),
                }
            }
            None => Verification::PresenceOnly,
        };

        Self {
            cookie_names: config.session_cookie_names.clone(),
            verification,
        }
    }

    /// Whether credentials are cryptographically checked.
    pub fn verifies_tokens(&self) -> bool {
        matches!(self.verification, Verification::Signed { .. })
    }

    /// Resolve the caller's session state.
    ///
    /// With a token secret, each candidate is verified in order and the
    /// first one that passes wins; if none passes, the first failure is
    /// returned. Without one, the first session cookie is accepted as is.
    pub fn resolve(&self, headers: &HeaderMap) -> Result<SessionState, SessionError> {
        let candidates = self.find_evidence(headers)?;

        match &self.verification {
            Verification::Signed { key, validation } => {
                let mut first_error = None;
                for evidence in candidates {
                    let fingerprint = evidence.fingerprint();
                    match verify_token(&evidence.value, key, validation) {
                        Ok(claims) => {
                            debug!(
                                subject = %claims.sub,
                                fingerprint = %fingerprint,
                                source = ?evidence.source,
                                "session token verified"
                            );
                            return Ok(SessionState::Verified {
                                claims,
                                fingerprint,
                            });
                        }
                        Err(e) => {
                            debug!(
                                fingerprint = %fingerprint,
                                source = ?evidence.source,
                                error = %e,
                                "session candidate rejected"
                            );
                            first_error.get_or_insert(e);
                        }
                    }
                }
                match first_error {
                    Some(e) => Err(e),
                    None => Ok(SessionState::Absent),
                }
            }
            Verification::PresenceOnly => {
                let Some(evidence) = candidates.into_iter().next() else {
                    return Ok(SessionState::Absent);
                };
                let fingerprint = evidence.fingerprint();
                debug!(
                    fingerprint = %fingerprint,
                    source = ?evidence.source,
                    "session cookie present (unverified)"
                );
                Ok(SessionState::CookiePresent { fingerprint })
            }
        }
    }

    /// Collect non-empty credentials in precedence order.
    ///
    /// 1. `Authorization: Bearer` token, only when tokens are verified
    /// 2. Session cookies, in configured order
    ///
    /// An unreadable `Authorization` header is skipped; an unreadable
    /// `Cookie` header is an error.
    pub fn find_evidence(&self, headers: &HeaderMap) -> Result<Vec<Evidence>, SessionError> {
        let mut candidates = Vec::new();

        if self.verifies_tokens() {
            match headers.get(AUTHORIZATION).map(|v| v.to_str()) {
                Some(Ok(value)) => {
                    if let Some(token) = value.strip_prefix("Bearer ")
                        && !token.trim().is_empty()
                    {
                        candidates.push(Evidence {
                            source: EvidenceSource::Bearer,
                            value: token.trim().to_string(),
                        });
                    }
                }
                Some(Err(_)) => debug!("ignoring unreadable Authorization header"),
                None => {}
            }
        }

        let mut cookies: Vec<(&str, &str)> = Vec::new();
        for header in headers.get_all(COOKIE) {
            let header = header
                .to_str()
                .map_err(|_| SessionError::MalformedHeader("Cookie"))?;
            cookies.extend(parse_cookie_header(header));
        }

        for name in &self.cookie_names {
            if let Some((_, value)) = cookies
                .iter()
                .find(|(k, v)| *k == name.as_str() && !v.is_empty())
            {
                candidates.push(Evidence {
                    source: EvidenceSource::Cookie(name.clone()),
                    value: value.to_string(),
                });
            }
        }

        Ok(candidates)
    }
}

fn verify_token(
    token: &str,
    key: &DecodingKey,
    validation: &Validation,
) -> Result<SessionClaims, SessionError> {
    decode::<SessionClaims>(token, key, validation)
        .map(|data| data.claims)
        .map_err(|e| match e.kind() {
            ErrorKind::ExpiredSignature => SessionError::Expired,
            _ => SessionError::InvalidToken(e.to_string()),
        })
}

/// Split a `Cookie` header into `(name, value)` pairs.
///
/// Surrounding double quotes on a value are removed; pairs without `=` are
/// skipped.
pub fn parse_cookie_header(header: &str) -> impl Iterator<Item = (&str, &str)> {
    header.split(';').filter_map(|pair| {
        let (name, value) = pair.trim().split_once('=')?;
        let value = value.trim();
        let value = value
            .strip_prefix('"')
            .and_then(|v| v.strip_suffix('"'))
            .unwrap_or(value);
        Some((name.trim(), value))
    })
}

/// Short hex SHA-256 prefix of a credential, for logs.
pub fn fingerprint(value: &str) -> EvidenceFingerprint {
    let digest = Sha256::digest(value.as_bytes());
    let hex = format!("{:x}", digest);
    EvidenceFingerprint::new(&hex[..12])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{EmailAddress, SubjectId};
    use http::HeaderValue;
    use jsonwebtoken::{EncodingKey, Header, encode};

    const SECRET: &str = "test-secret";

    fn now() -> u64 {
        chrono::Utc::now().timestamp() as u64
    }

    fn token(secret: &str, exp: u64, email: Option<&str>) -> String {
        let claims = SessionClaims {
            sub: SubjectId::new("user-1"),
            email: email.map(EmailAddress::new),
            name: None,
            picture: None,
            exp,
        };
        encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
        .unwrap()
    }

    fn verifying() -> SessionResolver {
        SessionResolver::new(&GateConfig {
            token_secret: Some(SECRET.to_string()),
            ..Default::default()
        })
    }

    fn presence_only() -> SessionResolver {
        SessionResolver::new(&GateConfig::default())
    }

    fn with_cookie(cookie: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(COOKIE, HeaderValue::from_str(cookie).unwrap());
        headers
    }

    #[test]
    fn test_parse_cookie_header() {
        let pairs: Vec<_> =
            parse_cookie_header("a=1; next-auth.session-token=\"abc\"; junk; b = 2 ").collect();
        assert_eq!(
            pairs,
            vec![("a", "1"), ("next-auth.session-token", "abc"), ("b", "2")]
        );
    }

    #[test]
    fn test_absent_without_credentials() {
        let resolver = presence_only();
        let state = resolver.resolve(&with_cookie("theme=dark")).unwrap();
        assert_eq!(state, SessionState::Absent);
        assert!(!state.is_authenticated());
    }

    #[test]
    fn test_empty_cookie_value_is_absent() {
        let resolver = presence_only();
        let state = resolver
            .resolve(&with_cookie("next-auth.session-token="))
            .unwrap();
        assert_eq!(state, SessionState::Absent);
    }

    #[test]
    fn test_presence_only_accepts_either_cookie() {
        let resolver = presence_only();
        assert!(!resolver.verifies_tokens());

        for name in ["__Secure-next-auth.session-token", "next-auth.session-token"] {
            let state = resolver
                .resolve(&with_cookie(&format!("{}=opaque", name)))
                .unwrap();
            assert!(matches!(state, SessionState::CookiePresent { .. }));
            assert!(state.email().is_none());
        }
    }

    #[test]
    fn test_secure_cookie_takes_precedence() {
        let resolver = presence_only();
        let evidence = resolver
            .find_evidence(&with_cookie(
                "next-auth.session-token=plain; __Secure-next-auth.session-token=secure",
            ))
            .unwrap();
        assert_eq!(
            evidence[0].source,
            EvidenceSource::Cookie("__Secure-next-auth.session-token".to_string())
        );
        assert_eq!(evidence[0].fingerprint(), fingerprint("secure"));
    }

    #[test]
    fn test_bearer_ignored_in_presence_mode() {
        let resolver = presence_only();
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer anything"));
        assert!(resolver.find_evidence(&headers).unwrap().is_empty());
        assert_eq!(resolver.resolve(&headers), Ok(SessionState::Absent));

        let mut headers = with_cookie("next-auth.session-token=cookie");
        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer bearer-token"));
        let evidence = resolver.find_evidence(&headers).unwrap();
        assert_eq!(evidence.len(), 1);
        assert_eq!(
            evidence[0].source,
            EvidenceSource::Cookie("next-auth.session-token".to_string())
        );
    }

    #[test]
    fn test_bearer_listed_first_when_verifying() {
        let resolver = verifying();
        let mut headers = with_cookie("next-auth.session-token=cookie");
        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer bearer-token"));

        let evidence = resolver.find_evidence(&headers).unwrap();
        assert_eq!(evidence.len(), 2);
        assert_eq!(evidence[0].source, EvidenceSource::Bearer);
    }

    #[test]
    fn test_valid_cookie_wins_over_junk_bearer() {
        let resolver = verifying();
        let jwt = token(SECRET, now() + 3600, Some("admin@example.com"));
        let mut headers = with_cookie(&format!("next-auth.session-token={}", jwt));
        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer coze-pat-xyz"));

        let state = resolver.resolve(&headers).unwrap();
        assert!(matches!(state, SessionState::Verified { .. }));
        assert_eq!(state.email().map(EmailAddress::as_str), Some("admin@example.com"));
    }

    #[test]
    fn test_unreadable_authorization_falls_through_to_cookie() {
        let resolver = verifying();
        let jwt = token(SECRET, now() + 3600, None);
        let mut headers = with_cookie(&format!("next-auth.session-token={}", jwt));
        headers.insert(AUTHORIZATION, HeaderValue::from_bytes(b"Bearer \xff").unwrap());

        let state = resolver.resolve(&headers).unwrap();
        assert!(matches!(state, SessionState::Verified { .. }));
    }

    #[test]
    fn test_first_failure_reported_when_nothing_verifies() {
        let resolver = verifying();
        let expired = token(SECRET, now() - 3600, None);
        let mut headers = with_cookie("next-auth.session-token=not-a-jwt");
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {}", expired)).unwrap(),
        );
        assert_eq!(resolver.resolve(&headers), Err(SessionError::Expired));
    }

    #[test]
    fn test_verified_token_yields_claims() {
        let resolver = verifying();
        assert!(resolver.verifies_tokens());

        let jwt = token(SECRET, now() + 3600, Some("admin@example.com"));
        let state = resolver
            .resolve(&with_cookie(&format!("next-auth.session-token={}", jwt)))
            .unwrap();

        match &state {
            SessionState::Verified { claims, .. } => {
                assert_eq!(claims.sub.as_str(), "user-1");
            }
            other => panic!("expected verified state, got {:?}", other),
        }
        assert_eq!(state.email().map(EmailAddress::as_str), Some("admin@example.com"));
    }

    #[test]
    fn test_wrong_secret_is_rejected() {
        let resolver = verifying();
        let jwt = token("other-secret", now() + 3600, None);
        let result = resolver.resolve(&with_cookie(&format!("next-auth.session-token={}", jwt)));
        assert!(matches!(result, Err(SessionError::InvalidToken(_))));
    }

    #[test]
    fn test_expired_token_is_rejected() {
        let resolver = verifying();
        let jwt = token(SECRET, now() - 3600, None);
        let result = resolver.resolve(&with_cookie(&format!("next-auth.session-token={}", jwt)));
        assert_eq!(result, Err(SessionError::Expired));
    }

    #[test]
    fn test_opaque_cookie_rejected_when_verifying() {
        let resolver = verifying();
        let result = resolver.resolve(&with_cookie("next-auth.session-token=not-a-jwt"));
        assert!(matches!(result, Err(SessionError::InvalidToken(_))));
    }

    #[test]
    fn test_non_utf8_cookie_header_is_error() {
        let resolver = presence_only();
        let mut headers = HeaderMap::new();
        headers.insert(COOKIE, HeaderValue::from_bytes(b"a=\xff").unwrap());
        assert_eq!(
            resolver.resolve(&headers),
            Err(SessionError::MalformedHeader("Cookie"))
        );
    }

    #[test]
    fn test_fingerprint_is_stable_and_short() {
        let a = fingerprint("secret-value");
        assert_eq!(a, fingerprint("secret-value"));
        assert_ne!(a, fingerprint("other-value"));
        assert_eq!(a.as_str().len(), 12);
        assert!(a.as_str().chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_evidence_debug_hides_value() {
        let evidence = Evidence {
            source: EvidenceSource::Bearer,
            value: "super-secret".to_string(),
        };
        let rendered = format!("{:?}", evidence);
        assert!(!rendered.contains("super-secret"));
        assert!(rendered.contains("fingerprint"));
    }

    #[test]
    fn test_session_error_display() {
        assert_eq!(
            SessionError::Expired.to_string(),
            "Session token has expired"
        );
        assert_eq!(
            SessionError::MalformedHeader("Cookie").to_string(),
            "Malformed Cookie header"
        );
    }
}
