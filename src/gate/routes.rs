//! Route classification.
//!
//! Every membership test works on the raw path except the public and admin
//! checks, which run on the logical path (locale prefix stripped) so that
//! `/en/pricing` and `/pricing` classify the same way.

use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;

use crate::config::GateConfig;
use crate::gate::locale::LocaleResolver;
use crate::types::LocaleTag;

/// Login and registration pages under any locale-like first segment.
static AUTH_PAGE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^/[a-zA-Z]{2,}/(login|register)").expect("auth page pattern is valid")
});

/// Paths that never receive a locale prefix.
const NO_LOCALE_REDIRECT_PREFIXES: [&str; 3] = ["/api", "/trpc", "/admin"];

/// Auth provider endpoints (sign-in callbacks, CSRF, error page).
pub const AUTH_INTERNAL_PREFIX: &str = "/api/auth";
pub const RPC_API_PREFIX: &str = "/api/trpc/";
pub const ADMIN_DASHBOARD_PREFIX: &str = "/admin/dashboard";
/// Framework build output, always static.
const BUILD_ASSET_PREFIX: &str = "/_next/";

/// Membership of one path in each route set.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RouteClass {
    pub asset: bool,
    pub no_locale_redirect: bool,
    pub auth_internal: bool,
    pub bypass: bool,
    pub auth_page: bool,
    pub admin_area: bool,
    pub rpc_api: bool,
    pub public: bool,
    /// Supported locale prefix on the path, if any
    pub locale_prefix: Option<LocaleTag>,
}

impl RouteClass {
    pub fn is_missing_locale(&self) -> bool {
        self.locale_prefix.is_none() && !self.no_locale_redirect && !self.bypass
    }
}

pub struct RouteClassifier {
    public_prefixes: Vec<String>,
    bypass_prefixes: Vec<String>,
    asset_extensions: Vec<String>,
}

impl RouteClassifier {
    pub fn new(config: &GateConfig) -> Self {
        Self {
            public_prefixes: config
                .public_segments
                .iter()
                .map(|s| s.trim_matches('/'))
                .filter(|s| !s.is_empty())
                .map(|s| format!("/{}", s))
                .collect(),
            bypass_prefixes: config.bypass_prefixes.clone(),
            asset_extensions: config
                .asset_extensions
                .iter()
                .map(|e| e.trim_start_matches('.').to_ascii_lowercase())
                .collect(),
        }
    }

    /// Classify `path`. Assets short-circuit: nothing else is set for them.
    pub fn classify(&self, path: &str, locales: &LocaleResolver) -> RouteClass {
        if self.is_asset(path) {
            return RouteClass {
                asset: true,
                ..Default::default()
            };
        }

        let (locale_prefix, logical) = match locales.split_prefix(path) {
            Some((tag, rest)) => (Some(tag.clone()), rest),
            None => (None, path),
        };

        RouteClass {
            asset: false,
            no_locale_redirect: NO_LOCALE_REDIRECT_PREFIXES
                .iter()
                .any(|p| path.starts_with(p)),
            auth_internal: path.starts_with(AUTH_INTERNAL_PREFIX),
            bypass: self.bypass_prefixes.iter().any(|p| path.starts_with(p.as_str())),
            auth_page: AUTH_PAGE.is_match(path),
            admin_area: logical.starts_with(ADMIN_DASHBOARD_PREFIX),
            rpc_api: path.starts_with(RPC_API_PREFIX),
            public: self.is_public(logical),
            locale_prefix,
        }
    }

    fn is_asset(&self, path: &str) -> bool {
        if path.starts_with(BUILD_ASSET_PREFIX) {
            return true;
        }
        let last = path.rsplit('/').next().unwrap_or_default();
        match last.rsplit_once('.') {
            Some((stem, ext)) if !stem.is_empty() => {
                let ext = ext.to_ascii_lowercase();
                self.asset_extensions.iter().any(|e| *e == ext)
            }
            _ => false,
        }
    }

    fn is_public(&self, logical: &str) -> bool {
        if logical == "/" {
            return true;
        }
        self.public_prefixes.iter().any(|prefix| {
            logical
                .strip_prefix(prefix.as_str())
                .is_some_and(|rest| rest.is_empty() || rest.starts_with('/'))
        })
    }
}
