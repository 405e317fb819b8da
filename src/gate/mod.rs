//! Request gating.
//!
//! One synchronous decision per inbound request, before any handler runs:
//!
//! 1. static assets pass untouched
//! 2. paths without a locale prefix are redirected to `/{locale}/...`
//! 3. auth-provider and third-party callback paths pass
//! 4. login/register pages bounce signed-in callers to the dashboard
//! 5. the admin dashboard requires an allow-listed email
//! 6. rpc calls require a session
//! 7. public pages pass; everything else requires a session
//!
//! The [`Gate`] owns only immutable, pre-compiled state and can be shared
//! across tasks behind an `Arc` without locking.

pub mod decision;
pub mod locale;
pub mod middleware;
pub mod routes;

use http::HeaderMap;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::auth::{SessionResolver, SessionState};
use crate::config::{AdminAllowList, ConfigError, GateConfig};
use crate::types::LocaleTag;

pub use decision::{Decision, Redirect, RedirectKind, Rule};
pub use locale::{LocaleResolver, ResolvedLocale};
pub use middleware::gate_request;
pub use routes::{RouteClass, RouteClassifier};

/// The parts of an HTTP request the gate looks at.
#[derive(Debug, Clone, Copy)]
pub struct GateRequest<'a> {
    pub path: &'a str,
    pub query: Option<&'a str>,
    pub headers: &'a HeaderMap,
}

impl<'a> GateRequest<'a> {
    pub fn new(path: &'a str, query: Option<&'a str>, headers: &'a HeaderMap) -> Self {
        Self {
            path,
            query,
            headers,
        }
    }

    pub fn from_request<B>(request: &'a http::Request<B>) -> Self {
        Self::new(request.uri().path(), request.uri().query(), request.headers())
    }
}

/// Outcome of evaluating one request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Verdict {
    pub rule: Rule,
    pub decision: Decision,
    pub locale: LocaleTag,
    pub route: RouteClass,
    /// `None` when the decision was made before sessions were consulted
    pub session: Option<SessionState>,
}

pub struct Gate {
    locales: LocaleResolver,
    routes: RouteClassifier,
    sessions: SessionResolver,
    admins: AdminAllowList,
}

impl Gate {
    pub fn new(config: &GateConfig) -> Result<Self, ConfigError> {
        config.validate()?;

        let sessions = SessionResolver::new(config);
        if !sessions.verifies_tokens() {
            warn!(
                "No token secret configured: session cookies are accepted on presence alone, \
                 bearer tokens are ignored and admin checks will always fail"
            );
        }

        let admins = config.admin_allow_list();
        if admins.is_empty() {
            info!("Admin allow-list is empty; admin dashboard is closed");
        }

        Ok(Self {
            locales: LocaleResolver::new(config.locale_tags(), config.default_locale_tag()),
            routes: RouteClassifier::new(config),
            sessions,
            admins,
        })
    }

    pub fn locales(&self) -> &LocaleResolver {
        &self.locales
    }

    pub fn admins(&self) -> &AdminAllowList {
        &self.admins
    }

    /// Evaluate a request. Never fails: session errors count as signed out.
    pub fn evaluate(&self, request: &GateRequest<'_>) -> Verdict {
        let locale = self.locales.resolve_headers(request.headers);
        let route = self.routes.classify(request.path, &self.locales);

        let verdict = if route.asset {
            Verdict {
                rule: Rule::AssetSkip,
                decision: Decision::Continue,
                locale,
                route,
                session: None,
            }
        } else if route.is_missing_locale() {
            Verdict {
                rule: Rule::MissingLocale,
                decision: decision::locale_redirect(&locale, request.path, request.query),
                locale,
                route,
                session: None,
            }
        } else {
            let session = self.resolve_session(request);
            let (rule, decision) = decision::decide(
                &route,
                &locale,
                &session,
                &self.admins,
                request.path,
                request.query,
            );
            Verdict {
                rule,
                decision,
                locale,
                route,
                session: Some(session),
            }
        };

        debug!(
            path = %request.path,
            rule = verdict.rule.as_str(),
            locale = %verdict.locale,
            location = verdict.decision.location().unwrap_or("-"),
            "gate decision"
        );
        verdict
    }

    fn resolve_session(&self, request: &GateRequest<'_>) -> SessionState {
        match self.sessions.resolve(request.headers) {
            Ok(state) => state,
            Err(e) => {
                warn!(path = %request.path, error = %e, "session resolution failed; treating as signed out");
                SessionState::Absent
            }
        }
    }
}
