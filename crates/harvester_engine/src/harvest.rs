use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use engine_logging::{engine_debug, engine_info, engine_warn};
use harvester_core::{
    normalize_url_str, update, Effect, HarvestFailure, HarvestSettings, HarvestState,
    InvalidInput, Msg, ParsePolicy, SeenLinks, SiteBase, StopReason,
};
use thiserror::Error;

use crate::decode::decode_page;
use crate::extract::{LinkExtractor, SelectorExtractor};
use crate::fetch::{FetchSettings, Fetcher, ReqwestFetcher};
use crate::wp_api::{fetch_site_rest_links, fetch_wpcom_links, ApiError, ApiPaging, WPCOM_API_BASE};
use crate::{FailureKind, FetchError, HarvestEvent, ParseError};

/// Where post links come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Strategy {
    /// Walk the HTML listing pages.
    #[default]
    Html,
    /// WordPress.com public REST API only.
    WpCom,
    /// The site's own `/wp-json` REST API only.
    SiteRest,
    /// WordPress.com API, then site REST API, then HTML pages.
    Auto,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HarvestConfig {
    pub fetch: FetchSettings,
    pub settings: HarvestSettings,
    /// Pause between consecutive requests to the same site.
    pub request_delay: Duration,
    pub strategy: Strategy,
    pub wpcom_api_base: String,
}

impl Default for HarvestConfig {
    fn default() -> Self {
        Self {
            fetch: FetchSettings::default(),
            settings: HarvestSettings::default(),
            request_delay: Duration::from_millis(200),
            strategy: Strategy::Html,
            wpcom_api_base: WPCOM_API_BASE.to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkSource {
    Pages(StopReason),
    WpComApi,
    SiteRestApi,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HarvestReport {
    pub site: String,
    /// Normalized permalinks in discovery order.
    pub links: Vec<String>,
    pub pages_fetched: u32,
    pub source: LinkSource,
}

#[derive(Debug, Error)]
pub enum HarvestError {
    #[error("invalid site url: {0}")]
    InvalidInput(#[from] InvalidInput),
    #[error("fetching page {page} ({url}) failed: {source}")]
    Fetch {
        page: u32,
        url: String,
        #[source]
        source: FetchError,
    },
    #[error("page {page} ({url}) could not be parsed: {source}")]
    Parse {
        page: u32,
        url: String,
        #[source]
        source: ParseError,
    },
    #[error(transparent)]
    Api(#[from] ApiError),
    #[error("http client setup failed: {0}")]
    Client(#[source] FetchError),
    #[error("harvest stopped at page {page} without reaching an end of pagination")]
    Stalled { page: u32 },
}

pub trait ProgressSink: Send + Sync {
    fn emit(&self, event: HarvestEvent);
}

/// Reports progress through the `log` facade.
#[derive(Debug, Default)]
pub struct LogProgressSink;

impl ProgressSink for LogProgressSink {
    fn emit(&self, event: HarvestEvent) {
        match event {
            HarvestEvent::PageRequested { page, url } => {
                engine_info!("fetching page {} {}", page, url);
            }
            HarvestEvent::PageHarvested {
                page,
                candidates,
                total_links,
            } => {
                engine_info!(
                    "page {}: {} candidate links, {} collected so far",
                    page,
                    candidates,
                    total_links
                );
            }
            HarvestEvent::PageSkipped { page, reason } => {
                engine_warn!("page {} skipped: {}", page, reason);
            }
            HarvestEvent::StrategyUnavailable { strategy, reason } => {
                engine_warn!("{} unavailable: {}", strategy, reason);
            }
            HarvestEvent::Finished {
                links,
                pages_fetched,
            } => {
                engine_info!("harvest finished: {} links from {} requests", links, pages_fetched);
            }
        }
    }
}

enum PageOutcome {
    Links(Vec<String>),
    NotFound(FetchError),
    Malformed(ParseError),
    Failed(FetchError),
}

/// Drives one harvest at a time: requests are strictly sequential.
pub struct Harvester {
    fetcher: Arc<dyn Fetcher>,
    extractor: Arc<dyn LinkExtractor>,
    sink: Arc<dyn ProgressSink>,
    config: HarvestConfig,
}

impl Harvester {
    /// Harvester with a reqwest client and the WordPress permalink selectors.
    pub fn new(config: HarvestConfig) -> Result<Self, HarvestError> {
        let fetcher = ReqwestFetcher::new(config.fetch.clone()).map_err(HarvestError::Client)?;
        Ok(Self::with_parts(
            Arc::new(fetcher),
            Arc::new(SelectorExtractor::wordpress()),
            config,
        ))
    }

    pub fn with_parts(
        fetcher: Arc<dyn Fetcher>,
        extractor: Arc<dyn LinkExtractor>,
        config: HarvestConfig,
    ) -> Self {
        Self {
            fetcher,
            extractor,
            sink: Arc::new(LogProgressSink),
            config,
        }
    }

    pub fn with_sink(mut self, sink: Arc<dyn ProgressSink>) -> Self {
        self.sink = sink;
        self
    }

    pub fn config(&self) -> &HarvestConfig {
        &self.config
    }

    pub async fn harvest(&self, site: &str) -> Result<HarvestReport, HarvestError> {
        let site = SiteBase::parse(site)?;
        engine_info!("harvesting {} with {:?} strategy", site.as_str(), self.config.strategy);

        match self.config.strategy {
            Strategy::Html => self.harvest_pages(site).await,
            Strategy::WpCom => {
                let links = self.wpcom_links(&site).await?.unwrap_or_default();
                Ok(self.api_report(&site, links, LinkSource::WpComApi))
            }
            Strategy::SiteRest => {
                let links = self.site_rest_links(&site).await?.unwrap_or_default();
                Ok(self.api_report(&site, links, LinkSource::SiteRestApi))
            }
            Strategy::Auto => {
                match self.wpcom_links(&site).await {
                    Ok(Some(links)) if !links.is_empty() => {
                        return Ok(self.api_report(&site, links, LinkSource::WpComApi));
                    }
                    Ok(_) => self.sink.emit(HarvestEvent::StrategyUnavailable {
                        strategy: "WordPress.com API",
                        reason: "no posts returned".to_string(),
                    }),
                    Err(err) => self.sink.emit(HarvestEvent::StrategyUnavailable {
                        strategy: "WordPress.com API",
                        reason: err.to_string(),
                    }),
                }
                match self.site_rest_links(&site).await {
                    Ok(Some(links)) if !links.is_empty() => {
                        return Ok(self.api_report(&site, links, LinkSource::SiteRestApi));
                    }
                    Ok(_) => self.sink.emit(HarvestEvent::StrategyUnavailable {
                        strategy: "site REST API",
                        reason: "no posts returned".to_string(),
                    }),
                    Err(err) => self.sink.emit(HarvestEvent::StrategyUnavailable {
                        strategy: "site REST API",
                        reason: err.to_string(),
                    }),
                }
                engine_info!("falling back to HTML pagination scrape");
                self.harvest_pages(site).await
            }
        }
    }

    async fn harvest_pages(&self, site: SiteBase) -> Result<HarvestReport, HarvestError> {
        let rendered = site.as_str().to_string();
        let (mut state, effects) = update(
            HarvestState::new(site, self.config.settings.clone()),
            Msg::Start,
        );
        let mut pending: VecDeque<Effect> = effects.into();
        let mut last_error: Option<HarvestError> = None;
        let mut requests: u32 = 0;

        while let Some(effect) = pending.pop_front() {
            match effect {
                Effect::FetchPage { page, url } => {
                    self.pause_between(requests).await;
                    requests += 1;
                    self.sink.emit(HarvestEvent::PageRequested {
                        page,
                        url: url.clone(),
                    });

                    let mut candidates = None;
                    let mut skipped = None;
                    let msgs = match self.load_page(&url).await {
                        PageOutcome::Links(hrefs) => {
                            candidates = Some(hrefs.len());
                            vec![Msg::PageFetched { page }, Msg::LinksExtracted { page, hrefs }]
                        }
                        PageOutcome::NotFound(err) => {
                            let reason = err.to_string();
                            last_error = Some(HarvestError::Fetch {
                                page,
                                url,
                                source: err,
                            });
                            engine_debug!("page {} not found: {}", page, reason);
                            vec![Msg::PageNotFound { page }]
                        }
                        PageOutcome::Malformed(err) => {
                            let reason = err.to_string();
                            if self.config.settings.parse_policy == ParsePolicy::Skip {
                                skipped = Some(reason.clone());
                            }
                            last_error = Some(HarvestError::Parse {
                                page,
                                url,
                                source: err,
                            });
                            vec![Msg::PageFetched { page }, Msg::PageMalformed { page, reason }]
                        }
                        PageOutcome::Failed(err) => {
                            let reason = err.to_string();
                            last_error = Some(HarvestError::Fetch {
                                page,
                                url,
                                source: err,
                            });
                            vec![Msg::FetchFailed { page, reason }]
                        }
                    };

                    let mut follow_up = Vec::new();
                    for msg in msgs {
                        let (next, effects) = update(state, msg);
                        state = next;
                        follow_up.extend(effects);
                    }
                    let retried = follow_up.iter().any(
                        |effect| matches!(effect, Effect::FetchPage { page: next, .. } if *next == page),
                    );
                    if let Some(reason) = skipped.filter(|_| !retried) {
                        self.sink.emit(HarvestEvent::PageSkipped { page, reason });
                    }
                    pending.extend(follow_up);
                    if let Some(candidates) = candidates {
                        self.sink.emit(HarvestEvent::PageHarvested {
                            page,
                            candidates,
                            total_links: state.links().len(),
                        });
                    }
                }
                Effect::Finish { reason } => {
                    let pages_fetched = state.fetch_attempts();
                    let links = state.into_links();
                    self.sink.emit(HarvestEvent::Finished {
                        links: links.len(),
                        pages_fetched,
                    });
                    return Ok(HarvestReport {
                        site: rendered,
                        links,
                        pages_fetched,
                        source: LinkSource::Pages(reason),
                    });
                }
                Effect::Abort { page, error } => {
                    return Err(last_error.take().unwrap_or_else(|| {
                        let url = state.site().page_url(page, state.settings().pagination);
                        match error {
                            HarvestFailure::Fetch { reason } => HarvestError::Fetch {
                                page,
                                url,
                                source: FetchError::new(FailureKind::Network, reason),
                            },
                            HarvestFailure::Parse { .. } => HarvestError::Parse {
                                page,
                                url,
                                source: ParseError::NotHtml,
                            },
                        }
                    }));
                }
            }
        }

        Err(HarvestError::Stalled {
            page: state.cursor().page(),
        })
    }

    async fn load_page(&self, url: &str) -> PageOutcome {
        let output = match self.fetcher.fetch(url).await {
            Ok(output) => output,
            Err(err) if err.is_not_found() => return PageOutcome::NotFound(err),
            Err(err) => return PageOutcome::Failed(err),
        };

        let content_type = output.metadata.content_type.as_deref();
        if let Some(ct) = content_type {
            if !self.config.fetch.accepts_content_type(ct) {
                return PageOutcome::Malformed(ParseError::UnsupportedContentType {
                    content_type: ct.to_string(),
                });
            }
        }

        let page = match decode_page(&output.bytes, content_type) {
            Ok(page) => page,
            Err(err) => return PageOutcome::Malformed(err),
        };
        engine_debug!(
            "decoded {} bytes from {} as {}",
            output.metadata.byte_len,
            output.metadata.final_url,
            page.encoding
        );

        match self.extractor.extract(&page.html) {
            Ok(hrefs) => PageOutcome::Links(hrefs),
            Err(err) => PageOutcome::Malformed(err),
        }
    }

    async fn pause_between(&self, requests_so_far: u32) {
        if requests_so_far > 0 && !self.config.request_delay.is_zero() {
            tokio::time::sleep(self.config.request_delay).await;
        }
    }

    fn api_paging(&self) -> ApiPaging {
        ApiPaging {
            delay: self.config.request_delay,
            max_pages: self.config.settings.max_pages,
        }
    }

    async fn wpcom_links(&self, site: &SiteBase) -> Result<Option<Vec<String>>, ApiError> {
        fetch_wpcom_links(
            self.fetcher.as_ref(),
            &self.config.wpcom_api_base,
            site,
            self.api_paging(),
        )
        .await
    }

    async fn site_rest_links(&self, site: &SiteBase) -> Result<Option<Vec<String>>, ApiError> {
        fetch_site_rest_links(self.fetcher.as_ref(), site, self.api_paging()).await
    }

    fn api_report(&self, site: &SiteBase, raw: Vec<String>, source: LinkSource) -> HarvestReport {
        let mut seen = SeenLinks::new();
        for link in raw {
            match normalize_url_str(&link) {
                Some(normalized) => {
                    seen.insert(normalized);
                }
                None => engine_debug!("dropping unusable api link {:?}", link),
            }
        }
        self.sink.emit(HarvestEvent::Finished {
            links: seen.len(),
            pages_fetched: 0,
        });
        HarvestReport {
            site: site.as_str().to_string(),
            links: seen.into_vec(),
            pages_fetched: 0,
            source,
        }
    }
}

/// Harvests `base_url` with the default configuration and returns its permalinks.
pub async fn harvest(base_url: &str) -> Result<Vec<String>, HarvestError> {
    let report = Harvester::new(HarvestConfig::default())?
        .harvest(base_url)
        .await?;
    Ok(report.links)
}
