//! Gate configuration.
//!
//! Loaded once at startup: built-in defaults, then an optional JSON file
//! (`GATE_CONFIG` or `./gate.json`), then environment overrides. The result
//! is validated and never mutated afterwards.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::{env, fmt, fs, path::Path, path::PathBuf};

use crate::types::{EmailAddress, LocaleTag};

/// Cookie names set by the auth provider, secure variant first.
pub const DEFAULT_SESSION_COOKIES: [&str; 2] =
    ["__Secure-next-auth.session-token", "next-auth.session-token"];

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GateConfig {
    /// Supported locale codes, in display order
    pub locales: Vec<String>,
    /// Locale used when negotiation finds no match
    pub default_locale: String,
    /// Comma-separated admin emails (the `ADMIN_EMAIL` format)
    pub admin_emails: Option<String>,
    /// Cookie names that may carry the session token, checked in order
    pub session_cookie_names: Vec<String>,
    /// HS256 secret (`GATE_TOKEN_SECRET`); when absent the gate runs in
    /// cookie-presence mode.
    ///
    /// Session tokens must then be HS256-signed JWTs. NextAuth's default
    /// encrypted session cookie does not verify, hence its own variable
    /// instead of `NEXTAUTH_SECRET`.
    pub token_secret: Option<String>,
    pub jwt_issuer: Option<String>,
    pub jwt_audience: Option<String>,
    /// Leading path segments reachable without a session, locale-agnostic
    pub public_segments: Vec<String>,
    /// Third-party callback prefixes that skip the gate entirely
    pub bypass_prefixes: Vec<String>,
    /// File extensions treated as static assets
    pub asset_extensions: Vec<String>,
    /// Deployment environment name ("development", "production", ...)
    pub environment: String,
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            locales: ["en", "zh", "ko", "ja"].map(String::from).to_vec(),
            default_locale: "en".to_string(),
            admin_emails: None,
            session_cookie_names: DEFAULT_SESSION_COOKIES.map(String::from).to_vec(),
            token_secret: None,
            jwt_issuer: None,
            jwt_audience: None,
            public_segments: [
                "register",
                "terms",
                "privacy",
                "docs",
                "blog",
                "pricing",
                "image-to-prompt",
            ]
            .map(String::from)
            .to_vec(),
            bypass_prefixes: ["/api/coze/", "/api/webhooks/", "/api/health"]
                .map(String::from)
                .to_vec(),
            asset_extensions: [
                "png", "jpg", "jpeg", "gif", "webp", "svg", "ico", "css", "js", "map", "ttf",
                "woff", "woff2", "txt", "xml", "csv", "zip", "webmanifest",
            ]
            .map(String::from)
            .to_vec(),
            environment: "production".to_string(),
        }
    }
}

/// Configuration problems detected at startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// No locales configured
    NoLocales,
    /// A locale code is empty or not purely alphabetic
    InvalidLocale(String),
    /// The default locale is not one of the configured locales
    UnknownDefaultLocale(String),
    /// No session cookie names configured
    NoSessionCookies,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoLocales => write!(f, "At least one locale must be configured"),
            Self::InvalidLocale(tag) => write!(f, "Invalid locale code: {:?}", tag),
            Self::UnknownDefaultLocale(tag) => {
                write!(f, "Default locale `{}` is not in the locale set", tag)
            }
            Self::NoSessionCookies => {
                write!(f, "At least one session cookie name must be configured")
            }
        }
    }
}

impl std::error::Error for ConfigError {}

impl GateConfig {
    /// Load configuration from file (if any) and the process environment.
    pub fn load() -> anyhow::Result<Self> {
        let base = match resolve_config_path() {
            Some(path) => Self::from_file(&path)?,
            None => Self::default(),
        };
        let config = base.with_overrides(|key| env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    /// Read a JSON config file, expanding `${VAR}` references in string values.
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let raw = fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("Failed to read {}: {}", path.display(), e))?;
        let cfg: GateConfig = serde_json::from_str(&raw)?;
        Ok(cfg.expanded())
    }

    /// Apply environment overrides through `lookup`.
    ///
    /// Empty values are ignored so an exported-but-blank variable does not
    /// wipe out a file setting.
    pub fn with_overrides<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(locales) = get("GATE_LOCALES") {
            self.locales = split_list(&locales);
        }
        if let Some(default_locale) = get("GATE_DEFAULT_LOCALE") {
            self.default_locale = default_locale;
        }
        if let Some(admins) = get("ADMIN_EMAIL") {
            self.admin_emails = Some(admins);
        }
        if let Some(secret) = get("GATE_TOKEN_SECRET") {
            self.token_secret = Some(secret);
        }
        if let Some(issuer) = get("GATE_JWT_ISSUER") {
            self.jwt_issuer = Some(issuer);
        }
        if let Some(audience) = get("GATE_JWT_AUDIENCE") {
            self.jwt_audience = Some(audience);
        }
        if let Some(environment) = get("GATE_ENV") {
            self.environment = environment;
        }
        self
    }

    /// Check invariants the gate relies on.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let locales = self.locale_tags();
        if locales.is_empty() {
            return Err(ConfigError::NoLocales);
        }
        for raw in &self.locales {
            let tag = raw.trim();
            if tag.is_empty() || !tag.chars().all(|c| c.is_ascii_alphabetic()) {
                return Err(ConfigError::InvalidLocale(raw.clone()));
            }
        }
        let default_locale = self.default_locale_tag();
        if !locales.contains(&default_locale) {
            return Err(ConfigError::UnknownDefaultLocale(self.default_locale.clone()));
        }
        if self.session_cookie_names.iter().all(|n| n.trim().is_empty()) {
            return Err(ConfigError::NoSessionCookies);
        }
        Ok(())
    }

    /// Normalized (trimmed, lowercase, de-duplicated) locale tags.
    pub fn locale_tags(&self) -> Vec<LocaleTag> {
        let mut seen = HashSet::new();
        self.locales
            .iter()
            .map(|l| l.trim().to_ascii_lowercase())
            .filter(|l| !l.is_empty() && seen.insert(l.clone()))
            .map(LocaleTag::new)
            .collect()
    }

    pub fn default_locale_tag(&self) -> LocaleTag {
        LocaleTag::new(self.default_locale.trim().to_ascii_lowercase())
    }

    pub fn admin_allow_list(&self) -> AdminAllowList {
        AdminAllowList::parse(self.admin_emails.as_deref().unwrap_or_default())
    }

    pub fn is_development(&self) -> bool {
        self.environment.eq_ignore_ascii_case("development")
    }

    fn expanded(mut self) -> Self {
        for val in self.locales.iter_mut() {
            *val = expand_env_vars(val);
        }
        self.default_locale = expand_env_vars(&self.default_locale);
        for opt in [
            &mut self.admin_emails,
            &mut self.token_secret,
            &mut self.jwt_issuer,
            &mut self.jwt_audience,
        ] {
            if let Some(val) = opt.as_mut() {
                *val = expand_env_vars(val);
            }
        }
        self.environment = expand_env_vars(&self.environment);
        self
    }
}

/// Set of email addresses allowed into the admin area.
///
/// An empty list denies everyone.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AdminAllowList {
    emails: HashSet<EmailAddress>,
}

impl AdminAllowList {
    /// Parse a comma-separated list; blank entries are dropped.
    pub fn parse(raw: &str) -> Self {
        Self {
            emails: split_list(raw).into_iter().map(EmailAddress::new).collect(),
        }
    }

    pub fn contains(&self, email: &str) -> bool {
        self.emails.contains(email)
    }

    pub fn is_empty(&self) -> bool {
        self.emails.is_empty()
    }

    pub fn len(&self) -> usize {
        self.emails.len()
    }
}

pub fn resolve_config_path() -> Option<PathBuf> {
    if let Ok(p) = env::var("GATE_CONFIG") {
        return Some(PathBuf::from(p));
    }

    let candidate = PathBuf::from("gate.json");
    if candidate.exists() {
        return Some(candidate);
    }

    None
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

fn expand_env_vars(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '$' && matches!(chars.peek(), Some('{')) {
            chars.next(); // consume '{'
            let mut name = String::new();
            for c in chars.by_ref() {
                if c == '}' {
                    break;
                }
                name.push(c);
            }
            match env::var(&name) {
                Ok(val) => out.push_str(&val),
                Err(_) => {
                    out.push_str("${");
                    out.push_str(&name);
                    out.push('}');
                }
            }
        } else {
            out.push(ch);
        }
    }

    out
}
