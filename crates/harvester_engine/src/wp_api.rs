//! WordPress REST listing of posts, used before falling back to HTML pagination.
//!
//! Both the WordPress.com public API and a site's own `/wp-json` endpoint serve
//! `GET .../wp/v2/posts?per_page=100&page=N` with a JSON array of posts; an
//! empty array marks the end.

use std::time::Duration;

use engine_logging::{engine_debug, engine_info};
use harvester_core::SiteBase;
use serde::Deserialize;
use thiserror::Error;
use url::Url;

use crate::{FetchError, Fetcher};

pub const WPCOM_API_BASE: &str = "https://public-api.wordpress.com/wp/v2";
const PER_PAGE: u32 = 100;
const FIELDS: &str = "id,link,date";

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("invalid api endpoint {0}")]
    InvalidEndpoint(String),
    #[error("request to {url} failed: {source}")]
    Fetch {
        url: String,
        #[source]
        source: FetchError,
    },
    #[error("unexpected response from {url}: {message}")]
    Decode { url: String, message: String },
}

#[derive(Debug, Deserialize)]
struct ApiPost {
    link: String,
}

/// Paging limits shared by both API flavours.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ApiPaging {
    pub delay: Duration,
    pub max_pages: u32,
}

/// Posts of a site hosted on WordPress.com (custom domains included).
///
/// `Ok(None)` means the API does not know the site or it is private.
pub async fn fetch_wpcom_links(
    fetcher: &dyn Fetcher,
    api_base: &str,
    site: &SiteBase,
    paging: ApiPaging,
) -> Result<Option<Vec<String>>, ApiError> {
    let endpoint = format!(
        "{}/sites/{}/posts",
        api_base.trim_end_matches('/'),
        site.host()
    );
    fetch_post_links(fetcher, &endpoint, &[401, 404], paging).await
}

/// Posts served by the site's own REST API under `{base}/wp-json`.
pub async fn fetch_site_rest_links(
    fetcher: &dyn Fetcher,
    site: &SiteBase,
    paging: ApiPaging,
) -> Result<Option<Vec<String>>, ApiError> {
    let endpoint = format!("{}/wp-json/wp/v2/posts", site.as_str());
    fetch_post_links(fetcher, &endpoint, &[401, 403, 404], paging).await
}

async fn fetch_post_links(
    fetcher: &dyn Fetcher,
    endpoint: &str,
    unavailable: &[u16],
    paging: ApiPaging,
) -> Result<Option<Vec<String>>, ApiError> {
    let mut links = Vec::new();
    let mut page = 1;
    loop {
        let url = page_url(endpoint, page)?;
        engine_debug!("api request page {} {}", page, url);
        let output = match fetcher.fetch(&url).await {
            Ok(output) => output,
            Err(err) => match err.status() {
                Some(code) if page == 1 && unavailable.contains(&code) => {
                    engine_info!("api at {} unavailable ({})", endpoint, code);
                    return Ok(None);
                }
                // WordPress answers 400 rest_post_invalid_page_number past the last page.
                Some(400) if page > 1 => break,
                _ => return Err(ApiError::Fetch { url, source: err }),
            },
        };

        let batch: Vec<ApiPost> =
            serde_json::from_slice(&output.bytes).map_err(|err| ApiError::Decode {
                url: url.clone(),
                message: err.to_string(),
            })?;
        if batch.is_empty() {
            break;
        }
        links.extend(batch.into_iter().map(|post| post.link));

        if page >= paging.max_pages {
            break;
        }
        page += 1;
        if !paging.delay.is_zero() {
            tokio::time::sleep(paging.delay).await;
        }
    }
    Ok(Some(links))
}

fn page_url(endpoint: &str, page: u32) -> Result<String, ApiError> {
    let mut url = Url::parse(endpoint).map_err(|_| ApiError::InvalidEndpoint(endpoint.to_string()))?;
    url.query_pairs_mut()
        .append_pair("per_page", &PER_PAGE.to_string())
        .append_pair("page", &page.to_string())
        .append_pair("_fields", FIELDS);
    Ok(url.into())
}
