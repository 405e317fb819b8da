//! NewType wrappers for the identifiers the gate passes around.
//!
//! Locale codes, subject ids and email addresses are all plain strings on
//! the wire; wrapping them keeps a locale from being handed to an allow-list
//! lookup by accident.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Macro to generate a NewType wrapper with standard trait implementations.
macro_rules! newtype_string {
    (
        $(#[$meta:meta])*
        $name:ident
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Create a new instance.
            pub fn new(value: impl Into<String>) -> Self {
                Self(value.into())
            }

            /// Get the inner value as a string slice.
            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// Consume and return the inner String.
            pub fn into_inner(self) -> String {
                self.0
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self(s)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_string())
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl std::borrow::Borrow<str> for $name {
            fn borrow(&self) -> &str {
                &self.0
            }
        }
    };
}

newtype_string!(
    /// Short language code served by the site (e.g., "en", "zh").
    ///
    /// Always stored lowercase. The set of valid tags is closed and fixed by
    /// `GateConfig` at startup.
    LocaleTag
);

newtype_string!(
    /// Subject identifier from a verified session token (`sub` claim).
    SubjectId
);

newtype_string!(
    /// Email address as carried in session claims and the admin allow-list.
    ///
    /// Compared exactly; no case folding is applied.
    EmailAddress
);

newtype_string!(
    /// Short SHA-256 prefix of a session credential.
    ///
    /// Safe to log. Lets two log lines be correlated to the same cookie
    /// without ever writing the credential itself.
    EvidenceFingerprint
);
