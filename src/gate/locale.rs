//! Locale negotiation.
//!
//! Picks one supported locale from `Accept-Language`, falling back to the
//! configured default. Pure: the same header always yields the same tag.

use http::HeaderMap;
use http::header::ACCEPT_LANGUAGE;

use crate::types::LocaleTag;

/// The resolved locale for the current request.
///
/// Stored in request extensions for downstream handlers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedLocale(pub LocaleTag);

pub struct LocaleResolver {
    locales: Vec<LocaleTag>,
    default_locale: LocaleTag,
}

impl LocaleResolver {
    /// `locales` are expected lowercase; `default_locale` must be one of them.
    pub fn new(locales: Vec<LocaleTag>, default_locale: LocaleTag) -> Self {
        Self {
            locales,
            default_locale,
        }
    }

    pub fn locales(&self) -> &[LocaleTag] {
        &self.locales
    }

    pub fn default_locale(&self) -> &LocaleTag {
        &self.default_locale
    }

    pub fn resolve_headers(&self, headers: &HeaderMap) -> LocaleTag {
        let header = headers
            .get(ACCEPT_LANGUAGE)
            .and_then(|v| v.to_str().ok());
        self.resolve(header)
    }

    /// Best match for an `Accept-Language` value.
    ///
    /// Ranges are tried in descending quality order. Each tries an exact
    /// match first, then its primary subtag (`zh-CN` → `zh`).
    pub fn resolve(&self, accept_language: Option<&str>) -> LocaleTag {
        let Some(header) = accept_language else {
            return self.default_locale.clone();
        };

        for (range, _quality) in parse_accept_language(header) {
            if let Some(tag) = self.find(&range) {
                return tag.clone();
            }
            if let Some(primary) = range.split('-').next()
                && let Some(tag) = self.find(primary)
            {
                return tag.clone();
            }
        }

        self.default_locale.clone()
    }

    /// Split a supported locale prefix off `path`.
    ///
    /// Matches `/{locale}` or `/{locale}/...` exactly (case-sensitive) and
    /// returns the locale with the remaining logical path (`/` for a bare
    /// prefix). `/enterprise` does not match `en`.
    pub fn split_prefix<'a>(&self, path: &'a str) -> Option<(&LocaleTag, &'a str)> {
        let trimmed = path.strip_prefix('/')?;
        let (candidate, rest) = match trimmed.find('/') {
            Some(pos) => (&trimmed[..pos], &trimmed[pos..]),
            None => (trimmed, ""),
        };

        let tag = self.locales.iter().find(|l| l.as_str() == candidate)?;
        if rest.is_empty() {
            Some((tag, "/"))
        } else {
            Some((tag, rest))
        }
    }

    fn find(&self, range: &str) -> Option<&LocaleTag> {
        self.locales.iter().find(|l| l.as_str() == range)
    }
}

/// Parse an `Accept-Language` value into `(range, quality)` pairs.
///
/// Ranges are lowercased and sorted by quality, descending; the sort is
/// stable so equal qualities keep header order. Quality is clamped to
/// 0.0–1.0. Wildcards and zero-quality ranges are dropped.
pub fn parse_accept_language(header: &str) -> Vec<(String, f32)> {
    let mut langs: Vec<(String, f32)> = header
        .split(',')
        .filter_map(|part| {
            let part = part.trim();
            if part.is_empty() {
                return None;
            }

            let mut segments = part.split(';');
            let range = segments.next()?.trim().to_lowercase();
            if range.is_empty() || range == "*" {
                return None;
            }

            let quality = segments
                .find_map(|s| {
                    s.trim()
                        .strip_prefix("q=")
                        .and_then(|q| q.trim().parse::<f32>().ok())
                })
                .unwrap_or(1.0)
                .clamp(0.0, 1.0);

            (quality > 0.0).then_some((range, quality))
        })
        .collect();

    langs.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
    langs
}
