//! Deployment environment validation.
//!
//! Checks that the variables the surrounding application needs are set
//! before it is started. Everything is computed through a lookup closure so
//! the report can be built from a map in tests.

use serde::Serialize;
use std::fmt::Write as _;

pub const REQUIRED_VARS: [&str; 6] = [
    "NEXTAUTH_URL",
    "NEXTAUTH_SECRET",
    "GOOGLE_CLIENT_ID",
    "GOOGLE_CLIENT_SECRET",
    "POSTGRES_URL",
    "NEXT_PUBLIC_APP_URL",
];

pub const OPTIONAL_VARS: [&str; 6] = [
    "GATE_TOKEN_SECRET",
    "RESEND_API_KEY",
    "RESEND_FROM",
    "ADMIN_EMAIL",
    "STRIPE_API_KEY",
    "STRIPE_WEBHOOK_SECRET",
];

/// Values left over from `.env.example` files.
const PLACEHOLDER: &str = "placeholder_key";
const PREVIEW_CHARS: usize = 20;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VarStatus {
    pub name: &'static str,
    pub required: bool,
    pub present: bool,
    /// Truncated value for non-secret vars, a mask for secrets
    pub preview: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GroupCheck {
    pub name: &'static str,
    pub ok: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EnvReport {
    pub vars: Vec<VarStatus>,
    pub groups: Vec<GroupCheck>,
}

impl EnvReport {
    pub fn collect<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let value = |name: &str| lookup(name).filter(|v| is_configured(v));

        let vars = REQUIRED_VARS
            .iter()
            .map(|name| (*name, true))
            .chain(OPTIONAL_VARS.iter().map(|name| (*name, false)))
            .map(|(name, required)| {
                let found = value(name);
                VarStatus {
                    name,
                    required,
                    present: found.is_some(),
                    preview: found.map(|v| preview(name, &v)),
                }
            })
            .collect();

        let all = |names: &[&str]| names.iter().all(|&n| value(n).is_some());
        let groups = vec![
            GroupCheck {
                name: "NextAuth",
                ok: all(&["NEXTAUTH_URL", "NEXTAUTH_SECRET"]),
            },
            GroupCheck {
                name: "Google OAuth",
                ok: all(&["GOOGLE_CLIENT_ID", "GOOGLE_CLIENT_SECRET"]),
            },
            GroupCheck {
                name: "Database",
                ok: all(&["POSTGRES_URL"]),
            },
        ];

        Self { vars, groups }
    }

    pub fn from_process_env() -> Self {
        Self::collect(|name| std::env::var(name).ok())
    }

    pub fn missing_required(&self) -> Vec<&'static str> {
        self.vars
            .iter()
            .filter(|v| v.required && !v.present)
            .map(|v| v.name)
            .collect()
    }

    pub fn has_errors(&self) -> bool {
        !self.missing_required().is_empty() || self.groups.iter().any(|g| !g.ok)
    }

    /// Human-readable report for the CLI.
    pub fn render(&self) -> String {
        let mut out = String::new();
        for (title, required) in [("Required variables", true), ("Optional variables", false)] {
            let _ = writeln!(out, "{}:", title);
            for var in self.vars.iter().filter(|v| v.required == required) {
                let mark = match (var.present, required) {
                    (true, _) => "ok  ",
                    (false, true) => "MISS",
                    (false, false) => "warn",
                };
                let detail = var.preview.as_deref().unwrap_or("not set or placeholder");
                let _ = writeln!(out, "  [{}] {}: {}", mark, var.name, detail);
            }
            out.push('\n');
        }

        let _ = writeln!(out, "Checks:");
        for group in &self.groups {
            let mark = if group.ok { "ok  " } else { "MISS" };
            let _ = writeln!(out, "  [{}] {}", mark, group.name);
        }
        out.push('\n');

        if self.has_errors() {
            out.push_str("Configuration problems found; fix them before starting the app.\n");
        } else {
            out.push_str("All required environment variables are configured.\n");
        }
        out
    }
}

/// Masked view of the auth-related variables, for the dev diagnostics route.
pub fn auth_env_summary<F>(lookup: F) -> serde_json::Value
where
    F: Fn(&str) -> Option<String>,
{
    let value = |name: &str| lookup(name).filter(|v| is_configured(v));
    let hidden = |name: &str| {
        if value(name).is_some() {
            "set (hidden)"
        } else {
            "not set"
        }
    };

    serde_json::json!({
        "GOOGLE_CLIENT_ID": value("GOOGLE_CLIENT_ID")
            .map(|v| format!("{}...", v.chars().take(10).collect::<String>()))
            .unwrap_or_else(|| "not set".to_string()),
        "GOOGLE_CLIENT_SECRET": hidden("GOOGLE_CLIENT_SECRET"),
        "NEXTAUTH_URL": value("NEXTAUTH_URL"),
        "NEXTAUTH_SECRET": hidden("NEXTAUTH_SECRET"),
    })
}

fn is_configured(value: &str) -> bool {
    let value = value.trim();
    !value.is_empty() && value != PLACEHOLDER
}

fn is_secret(name: &str) -> bool {
    name.contains("SECRET") || name.ends_with("_KEY")
}

fn preview(name: &str, value: &str) -> String {
    if is_secret(name) {
        return "set (hidden)".to_string();
    }
    let head: String = value.chars().take(PREVIEW_CHARS).collect();
    if value.chars().count() > PREVIEW_CHARS {
        format!("{}...", head)
    } else {
        head
    }
}
