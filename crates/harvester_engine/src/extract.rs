use std::collections::HashSet;

use scraper::{Html, Selector};

use crate::ParseError;

/// Anchors WordPress themes commonly use for post permalinks on listing pages.
pub const WORDPRESS_PERMALINK_SELECTORS: &[&str] = &[
    "a[rel~=bookmark]",
    "h1.entry-title a",
    "h2.entry-title a",
    "h3.entry-title a",
    "article a.permalink",
    "article a.more-link",
];

/// Turns one listing page into candidate post hrefs.
pub trait LinkExtractor: Send + Sync {
    /// Raw `href` values in document order, each at most once.
    fn extract(&self, html: &str) -> Result<Vec<String>, ParseError>;
}

/// Extracts hrefs of anchors matched by a CSS selector group.
#[derive(Debug, Clone)]
pub struct SelectorExtractor {
    selector: Selector,
}

impl SelectorExtractor {
    pub fn new<S: AsRef<str>>(patterns: &[S]) -> Result<Self, ParseError> {
        let patterns: Vec<&str> = patterns
            .iter()
            .map(AsRef::as_ref)
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .collect();
        if patterns.is_empty() {
            return Err(ParseError::Selector {
                selector: String::new(),
                message: "no selectors given".to_string(),
            });
        }
        // Validate one by one so the error names the offending selector.
        for pattern in &patterns {
            Selector::parse(pattern).map_err(|err| ParseError::Selector {
                selector: pattern.to_string(),
                message: err.to_string(),
            })?;
        }
        let group = patterns.join(", ");
        let selector = Selector::parse(&group).map_err(|err| ParseError::Selector {
            selector: group.clone(),
            message: err.to_string(),
        })?;
        Ok(Self { selector })
    }

    pub fn wordpress() -> Self {
        let selector = Selector::parse(&WORDPRESS_PERMALINK_SELECTORS.join(", "))
            .expect("built-in permalink selectors parse");
        Self { selector }
    }
}

impl Default for SelectorExtractor {
    fn default() -> Self {
        Self::wordpress()
    }
}

impl LinkExtractor for SelectorExtractor {
    fn extract(&self, html: &str) -> Result<Vec<String>, ParseError> {
        // A blank body past the last page is just a page without posts.
        if html.trim().is_empty() {
            return Ok(Vec::new());
        }
        if !html.contains('<') {
            return Err(ParseError::NotHtml);
        }
        let document = Html::parse_document(html);

        let mut seen = HashSet::new();
        let hrefs = document
            .select(&self.selector)
            .filter(|element| element.value().name().eq_ignore_ascii_case("a"))
            .filter_map(|element| element.value().attr("href"))
            .map(str::trim)
            .filter(|href| !href.is_empty())
            .filter(|href| seen.insert(href.to_string()))
            .map(ToOwned::to_owned)
            .collect();
        Ok(hrefs)
    }
}
