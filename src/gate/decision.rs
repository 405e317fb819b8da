//! Access decision.
//!
//! Combines route class, resolved locale and session state into a single
//! outcome. Rules are evaluated in a fixed order and the first match wins.

use serde::Serialize;

use crate::auth::SessionState;
use crate::config::AdminAllowList;
use crate::gate::routes::RouteClass;
use crate::types::LocaleTag;

/// Where rpc calls without a session are sent.
pub const RPC_ERROR_LOCATION: &str = "/api/auth/error";
pub const ADMIN_LOGIN_LOCATION: &str = "/admin/login";

/// The rule that produced a decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Rule {
    AssetSkip,
    MissingLocale,
    AuthInternal,
    Bypass,
    AuthPage,
    AdminArea,
    RpcApi,
    Public,
    Protected,
}

impl Rule {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AssetSkip => "asset_skip",
            Self::MissingLocale => "missing_locale",
            Self::AuthInternal => "auth_internal",
            Self::Bypass => "bypass",
            Self::AuthPage => "auth_page",
            Self::AdminArea => "admin_area",
            Self::RpcApi => "rpc_api",
            Self::Public => "public",
            Self::Protected => "protected",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RedirectKind {
    Locale,
    Dashboard,
    AdminLogin,
    RpcError,
    Login,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Redirect {
    pub kind: RedirectKind,
    pub location: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Decision {
    Continue,
    Redirect(Redirect),
}

impl Decision {
    fn redirect(kind: RedirectKind, location: impl Into<String>) -> Self {
        Self::Redirect(Redirect {
            kind,
            location: location.into(),
        })
    }

    pub fn is_continue(&self) -> bool {
        matches!(self, Self::Continue)
    }

    pub fn location(&self) -> Option<&str> {
        match self {
            Self::Redirect(r) => Some(&r.location),
            Self::Continue => None,
        }
    }
}

/// Redirect a locale-less path to its locale-prefixed form.
pub fn locale_redirect(locale: &LocaleTag, path: &str, query: Option<&str>) -> Decision {
    let sep = if path.starts_with('/') { "" } else { "/" };
    let mut location = format!("/{}{}{}", locale, sep, path);
    if let Some(q) = query.filter(|q| !q.is_empty()) {
        location.push('?');
        location.push_str(q);
    }
    Decision::redirect(RedirectKind::Locale, location)
}

/// Apply rules 1–7 to a request that already carries a locale prefix or is
/// exempt from one.
pub fn decide(
    route: &RouteClass,
    locale: &LocaleTag,
    session: &SessionState,
    admins: &AdminAllowList,
    path: &str,
    query: Option<&str>,
) -> (Rule, Decision) {
    let authenticated = session.is_authenticated();

    if route.auth_internal {
        return (Rule::AuthInternal, Decision::Continue);
    }

    if route.bypass {
        return (Rule::Bypass, Decision::Continue);
    }

    if route.auth_page {
        let decision = if authenticated {
            Decision::redirect(RedirectKind::Dashboard, format!("/{}/dashboard", locale))
        } else {
            Decision::Continue
        };
        return (Rule::AuthPage, decision);
    }

    if route.admin_area {
        let decision = if session.is_admin(admins) {
            Decision::Continue
        } else {
            Decision::redirect(RedirectKind::AdminLogin, ADMIN_LOGIN_LOCATION)
        };
        return (Rule::AdminArea, decision);
    }

    if route.rpc_api {
        let decision = if authenticated {
            Decision::Continue
        } else {
            Decision::redirect(RedirectKind::RpcError, RPC_ERROR_LOCATION)
        };
        return (Rule::RpcApi, decision);
    }

    if route.public {
        return (Rule::Public, Decision::Continue);
    }

    if authenticated {
        return (Rule::Protected, Decision::Continue);
    }

    (Rule::Protected, login_redirect(locale, path, query))
}

/// `/{locale}/login?from=<path+query>`, with `from` form-urlencoded.
fn login_redirect(locale: &LocaleTag, path: &str, query: Option<&str>) -> Decision {
    let mut from = path.to_string();
    if let Some(q) = query.filter(|q| !q.is_empty()) {
        from.push('?');
        from.push_str(q);
    }
    let encoded: String = url::form_urlencoded::byte_serialize(from.as_bytes()).collect();
    Decision::redirect(
        RedirectKind::Login,
        format!("/{}/login?from={}", locale, encoded),
    )
}
