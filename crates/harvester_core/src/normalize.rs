use url::Url;

/// Query keys added by newsletters, ad networks and share buttons.
const TRACKING_PARAMS: &[&str] = &[
    "fbclid", "gclid", "dclid", "msclkid", "mc_cid", "mc_eid", "igshid", "_hsenc", "_hsmi",
];

fn is_tracking_param(key: &str) -> bool {
    let key = key.to_ascii_lowercase();
    key.starts_with("utm_") || TRACKING_PARAMS.contains(&key.as_str())
}

fn segment_is_tracking(segment: &str) -> bool {
    url::form_urlencoded::parse(segment.as_bytes())
        .next()
        .is_some_and(|(key, _)| is_tracking_param(&key))
}

/// Canonical string form of a permalink.
///
/// - fragment removed
/// - tracking query parameters removed, the remaining query kept as-is
/// - trailing slash removed from non-root paths, root rendered without slash
///
/// Applying this to its own output yields the same string.
pub fn normalize_permalink(url: &Url) -> String {
    let mut url = url.clone();
    url.set_fragment(None);

    if let Some(query) = url.query().map(str::to_owned) {
        let kept: Vec<&str> = query
            .split('&')
            .filter(|segment| !segment_is_tracking(segment))
            .collect();
        if kept.is_empty() {
            url.set_query(None);
        } else if kept.len() != query.split('&').count() {
            // Kept segments go back verbatim so their encoding matches untouched queries.
            url.set_query(Some(&kept.join("&")));
        }
    }

    let path = url.path().to_string();
    if path.len() > 1 && path.ends_with('/') {
        url.set_path(path.trim_end_matches('/'));
        // "/a//" trims to "/a"; an all-slash path collapses to root.
        if url.path().is_empty() {
            url.set_path("/");
        }
    }

    let mut out = String::from(url);
    if url_has_bare_root(&out) {
        out.pop();
    }
    out
}

/// Parses an absolute URL and normalizes it; `None` for relative or invalid input.
pub fn normalize_url_str(raw: &str) -> Option<String> {
    let url = Url::parse(raw.trim()).ok()?;
    if url.cannot_be_a_base() {
        return None;
    }
    Some(normalize_permalink(&url))
}

// "https://host/" with no query: the url crate always renders the root slash.
fn url_has_bare_root(serialized: &str) -> bool {
    if !serialized.ends_with('/') || serialized.contains('?') {
        return false;
    }
    let after_scheme = match serialized.find("://") {
        Some(idx) => &serialized[idx + 3..],
        None => return false,
    };
    after_scheme.find('/') == Some(after_scheme.len() - 1)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn norm(raw: &str) -> String {
        normalize_url_str(raw).unwrap()
    }

    #[test]
    fn strips_fragment_and_trailing_slash() {
        assert_eq!(
            norm("https://example.com/blog/post-a/#comments"),
            "https://example.com/blog/post-a"
        );
    }

    #[test]
    fn root_has_no_trailing_slash() {
        assert_eq!(norm("https://Example.COM/"), "https://example.com");
        assert_eq!(norm("https://example.com"), "https://example.com");
    }

    #[test]
    fn removes_only_tracking_params() {
        assert_eq!(
            norm("https://example.com/p/?utm_source=x&p=12&fbclid=abc"),
            "https://example.com/p?p=12"
        );
        assert_eq!(
            norm("https://example.com/p?utm_source=x&UTM_medium=y"),
            "https://example.com/p"
        );
    }

    #[test]
    fn removing_tracking_params_keeps_remaining_encoding() {
        assert_eq!(
            norm("https://example.com/p?q=a%20b&utm_source=x"),
            norm("https://example.com/p?q=a%20b")
        );
        assert_eq!(
            norm("https://example.com/p?utm_medium=feed&tag=a+b&q=%C3%A9"),
            "https://example.com/p?tag=a+b&q=%C3%A9"
        );
    }

    #[test]
    fn untouched_query_is_preserved() {
        assert_eq!(
            norm("https://example.com/?p=42&lang=en"),
            "https://example.com/?p=42&lang=en"
        );
    }

    #[test]
    fn normalization_is_idempotent() {
        let inputs = [
            "https://example.com/blog/post-a/",
            "https://example.com/",
            "http://example.com:8080/a/b/?utm_campaign=z&x=1#frag",
            "https://example.com/?p=42",
            "https://example.com/a%20b/",
            "https://example.com/p?q=a%20b&gclid=1&x=",
            "https://example.com//",
        ];
        for input in inputs {
            let once = norm(input);
            let twice = norm(&once);
            assert_eq!(once, twice, "input {input}");
        }
    }

    #[test]
    fn relative_input_is_rejected() {
        assert_eq!(normalize_url_str("/blog/post-a"), None);
        assert_eq!(normalize_url_str("mailto:someone@example.com"), None);
    }
}
