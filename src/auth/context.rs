//! Session context for request-scoped identity.

use serde::{Deserialize, Serialize};

use crate::config::AdminAllowList;
use crate::types::{EmailAddress, EvidenceFingerprint, SubjectId};

/// Claims carried by a verified session token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionClaims {
    /// Subject (user ID)
    pub sub: SubjectId,
    #[serde(default)]
    pub email: Option<EmailAddress>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub picture: Option<String>,
    /// Expiration time (Unix timestamp)
    pub exp: u64,
}

/// What the session resolver could establish about the caller.
///
/// `CookiePresent` is strictly weaker than `Verified`: the cookie was
/// present but nothing checked its signature, so it carries no identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum SessionState {
    Verified {
        claims: SessionClaims,
        fingerprint: EvidenceFingerprint,
    },
    CookiePresent {
        fingerprint: EvidenceFingerprint,
    },
    Absent,
}

impl SessionState {
    pub fn is_authenticated(&self) -> bool {
        !matches!(self, Self::Absent)
    }

    /// Email from verified claims; unverified evidence never yields one.
    pub fn email(&self) -> Option<&EmailAddress> {
        match self {
            Self::Verified { claims, .. } => claims.email.as_ref(),
            _ => None,
        }
    }

    pub fn fingerprint(&self) -> Option<&EvidenceFingerprint> {
        match self {
            Self::Verified { fingerprint, .. } | Self::CookiePresent { fingerprint } => {
                Some(fingerprint)
            }
            Self::Absent => None,
        }
    }

    pub fn tier(&self) -> AuthTier {
        match self {
            Self::Verified { .. } => AuthTier::Verified,
            Self::CookiePresent { .. } => AuthTier::CookiePresent,
            Self::Absent => AuthTier::Anonymous,
        }
    }

    /// Admin iff authenticated and the email is allow-listed.
    pub fn is_admin(&self, allow_list: &AdminAllowList) -> bool {
        self.is_authenticated()
            && self
                .email()
                .is_some_and(|email| allow_list.contains(email.as_str()))
    }
}

/// How strongly the caller was authenticated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthTier {
    Verified,
    CookiePresent,
    Anonymous,
}

impl AuthTier {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Verified => "verified",
            Self::CookiePresent => "cookie_present",
            Self::Anonymous => "anonymous",
        }
    }
}

/// Session context handed to downstream handlers via request extensions.
///
/// Immutable once created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionContext {
    tier: AuthTier,
    subject: Option<SubjectId>,
    email: Option<EmailAddress>,
    name: Option<String>,
    picture: Option<String>,
    is_admin: bool,
}

impl SessionContext {
    pub fn from_state(state: &SessionState, allow_list: &AdminAllowList) -> Self {
        let is_admin = state.is_admin(allow_list);
        match state {
            SessionState::Verified { claims, .. } => Self {
                tier: AuthTier::Verified,
                subject: Some(claims.sub.clone()),
                email: claims.email.clone(),
                name: claims.name.clone(),
                picture: claims.picture.clone(),
                is_admin,
            },
            other => Self {
                tier: other.tier(),
                subject: None,
                email: None,
                name: None,
                picture: None,
                is_admin,
            },
        }
    }

    pub fn anonymous() -> Self {
        Self::from_state(&SessionState::Absent, &AdminAllowList::default())
    }

    pub fn tier(&self) -> AuthTier {
        self.tier
    }

    pub fn is_authenticated(&self) -> bool {
        self.tier != AuthTier::Anonymous
    }

    pub fn subject(&self) -> Option<&SubjectId> {
        self.subject.as_ref()
    }

    pub fn email(&self) -> Option<&str> {
        self.email.as_ref().map(EmailAddress::as_str)
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn picture(&self) -> Option<&str> {
        self.picture.as_deref()
    }

    pub fn is_admin(&self) -> bool {
        self.is_admin
    }

    /// Get a display-friendly name for this caller.
    pub fn display(&self) -> String {
        if let Some(name) = &self.name {
            name.clone()
        } else if let Some(email) = &self.email {
            email.to_string()
        } else if let Some(sub) = &self.subject {
            sub.to_string()
        } else if self.is_authenticated() {
            "Signed-in user".to_string()
        } else {
            "Anonymous".to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn claims(email: Option<&str>, name: Option<&str>) -> SessionClaims {
        SessionClaims {
            sub: SubjectId::new("user-1"),
            email: email.map(EmailAddress::new),
            name: name.map(String::from),
            picture: None,
            exp: 4_102_444_800,
        }
    }

    fn verified(email: Option<&str>) -> SessionState {
        SessionState::Verified {
            claims: claims(email, None),
            fingerprint: EvidenceFingerprint::new("abc123"),
        }
    }

    #[test]
    fn test_admin_requires_allow_listed_email() {
        let allow = AdminAllowList::parse("admin@example.com,other@example.com");

        assert!(verified(Some("admin@example.com")).is_admin(&allow));
        assert!(!verified(Some("user@example.com")).is_admin(&allow));
        assert!(!verified(None).is_admin(&allow));
    }

    #[test]
    fn test_cookie_only_is_never_admin() {
        let allow = AdminAllowList::parse("admin@example.com");
        let state = SessionState::CookiePresent {
            fingerprint: EvidenceFingerprint::new("abc123"),
        };
        assert!(state.is_authenticated());
        assert!(state.email().is_none());
        assert!(!state.is_admin(&allow));
    }

    #[test]
    fn test_empty_allow_list_fails_closed() {
        let allow = AdminAllowList::default();
        assert!(!verified(Some("admin@example.com")).is_admin(&allow));
    }

    #[test]
    fn test_context_from_verified_state() {
        let allow = AdminAllowList::parse("admin@example.com");
        let state = SessionState::Verified {
            claims: claims(Some("admin@example.com"), Some("Ada")),
            fingerprint: EvidenceFingerprint::new("abc123"),
        };

        let ctx = SessionContext::from_state(&state, &allow);
        assert_eq!(ctx.tier(), AuthTier::Verified);
        assert_eq!(ctx.subject().map(SubjectId::as_str), Some("user-1"));
        assert_eq!(ctx.email(), Some("admin@example.com"));
        assert!(ctx.is_admin());
        assert_eq!(ctx.display(), "Ada");
    }

    #[test]
    fn test_context_display_fallbacks() {
        let allow = AdminAllowList::default();

        let cookie = SessionContext::from_state(
            &SessionState::CookiePresent {
                fingerprint: EvidenceFingerprint::new("f"),
            },
            &allow,
        );
        assert_eq!(cookie.display(), "Signed-in user");
        assert!(cookie.is_authenticated());

        let anon = SessionContext::anonymous();
        assert_eq!(anon.display(), "Anonymous");
        assert!(!anon.is_authenticated());
        assert_eq!(anon.tier().as_str(), "anonymous");
    }

    #[test]
    fn test_claims_deserialization() {
        let json = r#"{
            "sub": "user123",
            "email": "user@example.com",
            "name": "Test User",
            "exp": 1735689600
        }"#;

        let claims: SessionClaims = serde_json::from_str(json).unwrap();
        assert_eq!(claims.sub.as_str(), "user123");
        assert_eq!(claims.email, Some(EmailAddress::new("user@example.com")));
        assert_eq!(claims.name, Some("Test User".to_string()));
        assert!(claims.picture.is_none());
        assert_eq!(claims.exp, 1735689600);
    }
}
