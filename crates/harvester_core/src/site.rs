use thiserror::Error;
use url::Url;

use crate::normalize::normalize_permalink;

/// Why a site URL was rejected before any request was made.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvalidInput {
    #[error("site url is empty")]
    Empty,
    #[error("not a well-formed site url: {0}")]
    Malformed(String),
    #[error("unsupported scheme {scheme:?}; expected http or https")]
    UnsupportedScheme { scheme: String },
    #[error("site url has no host: {0}")]
    MissingHost(String),
}

/// How listing pages after the first are addressed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PaginationStyle {
    /// `{base}/page/{n}/`
    #[default]
    Path,
    /// `{base}/?paged={n}`
    Query,
    /// `{base}/page/{n}/`, retried once as `{base}/?paged={n}` when it yields nothing.
    PathThenQuery,
}

/// A validated site root: scheme, host and optional path prefix, no query or fragment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SiteBase {
    url: Url,
    rendered: String,
}

impl SiteBase {
    pub fn parse(input: &str) -> Result<Self, InvalidInput> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Err(InvalidInput::Empty);
        }

        let candidate = if trimmed.contains("://") {
            trimmed.to_string()
        } else if looks_like_hostname(trimmed) {
            format!("https://{trimmed}")
        } else if is_opaque_url(trimmed) {
            trimmed.to_string()
        } else {
            return Err(InvalidInput::Malformed(trimmed.to_string()));
        };

        let mut url =
            Url::parse(&candidate).map_err(|_| InvalidInput::Malformed(trimmed.to_string()))?;
        match url.scheme() {
            "http" | "https" => {}
            other => {
                return Err(InvalidInput::UnsupportedScheme {
                    scheme: other.to_string(),
                })
            }
        }
        if url.host_str().map_or(true, str::is_empty) {
            return Err(InvalidInput::MissingHost(trimmed.to_string()));
        }

        url.set_query(None);
        url.set_fragment(None);
        let path = url.path().trim_end_matches('/').to_string();
        url.set_path(if path.is_empty() { "/" } else { &path });

        let rendered = normalize_permalink(&url);
        Ok(Self { url, rendered })
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn as_str(&self) -> &str {
        &self.rendered
    }

    /// Host with explicit port, in the form the WordPress.com API addresses sites.
    pub fn host(&self) -> String {
        let host = self.url.host_str().unwrap_or_default();
        match self.url.port() {
            Some(port) => format!("{host}:{port}"),
            None => host.to_string(),
        }
    }

    pub fn origin_string(&self) -> String {
        self.url.origin().ascii_serialization()
    }

    /// URL of listing page `page` (1-based). Page 1 is the site root itself.
    pub fn page_url(&self, page: u32, style: PaginationStyle) -> String {
        if page <= 1 {
            return self.rendered.clone();
        }
        match style {
            PaginationStyle::Path | PaginationStyle::PathThenQuery => {
                format!("{}/page/{page}/", self.rendered)
            }
            PaginationStyle::Query => format!("{}/?paged={page}", self.rendered),
        }
    }

    /// Second address tried for `page` when the first one produced nothing.
    /// Only `PathThenQuery` has one, and never for the site root.
    pub fn fallback_page_url(&self, page: u32, style: PaginationStyle) -> Option<String> {
        match style {
            PaginationStyle::PathThenQuery if page > 1 => {
                Some(self.page_url(page, PaginationStyle::Query))
            }
            _ => None,
        }
    }

    /// Resolves a candidate href found on a listing page and keeps it only if it is
    /// a same-origin link under this site's path. Returns the normalized permalink.
    pub fn accept(&self, href: &str) -> Option<String> {
        let href = href.trim();
        if href.is_empty() {
            return None;
        }
        let lower = href.to_ascii_lowercase();
        if lower.starts_with('#') || lower.starts_with("javascript:") || lower.starts_with("mailto:")
        {
            return None;
        }

        let resolved = self.join(href)?;
        if resolved.origin() != self.url.origin() {
            return None;
        }
        if !self.is_under_base_path(resolved.path()) {
            return None;
        }

        let normalized = normalize_permalink(&resolved);
        if normalized == self.rendered {
            return None;
        }
        Some(normalized)
    }

    fn join(&self, href: &str) -> Option<Url> {
        if let Ok(absolute) = Url::parse(href) {
            return Some(absolute);
        }
        // Join against "{base}/" so "post-a" lands under the base path.
        let mut dir = self.url.clone();
        if !dir.path().ends_with('/') {
            let path = format!("{}/", dir.path());
            dir.set_path(&path);
        }
        dir.join(href).ok()
    }

    fn is_under_base_path(&self, path: &str) -> bool {
        let base = self.url.path().trim_end_matches('/');
        if base.is_empty() {
            return true;
        }
        path == base || path.starts_with(&format!("{base}/"))
    }
}

// "mailto:x@y", "data:..." and friends: parse so the scheme can be reported.
fn is_opaque_url(input: &str) -> bool {
    Url::parse(input).is_ok_and(|u| u.cannot_be_a_base())
}

fn looks_like_hostname(input: &str) -> bool {
    let host = input.split(['/', '?', '#']).next().unwrap_or_default();
    let host = host.split(':').next().unwrap_or_default();
    host.contains('.')
        && !host.starts_with('.')
        && !host.ends_with('.')
        && host
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-'))
}
