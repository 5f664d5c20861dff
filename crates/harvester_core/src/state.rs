use crate::{PageCursor, PaginationStyle, SeenLinks, SiteBase, StopReason};

/// What to do with a listing page that was fetched but could not be parsed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ParsePolicy {
    /// Log it and treat it as a page without new links.
    #[default]
    Skip,
    /// Abort the harvest.
    Abort,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HarvestSettings {
    pub pagination: PaginationStyle,
    /// Consecutive pages without a new link that end the harvest.
    pub max_empty_pages: u32,
    /// Hard ceiling on listing pages requested.
    pub max_pages: u32,
    pub parse_policy: ParsePolicy,
}

impl Default for HarvestSettings {
    fn default() -> Self {
        Self {
            pagination: PaginationStyle::Path,
            max_empty_pages: 1,
            max_pages: 2000,
            parse_policy: ParsePolicy::Skip,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Phase {
    #[default]
    Idle,
    Fetching { page: u32 },
    Parsing { page: u32 },
    Deciding,
    Complete(StopReason),
    Failed,
}

/// Fatal outcome recorded by the state machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HarvestFailure {
    Fetch { reason: String },
    Parse { reason: String },
}

/// State of one harvest: the site, the cursor, and every permalink seen so far.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HarvestState {
    site: SiteBase,
    settings: HarvestSettings,
    cursor: PageCursor,
    seen: SeenLinks,
    phase: Phase,
    fetch_attempts: u32,
    empty_streak: u32,
    on_fallback: bool,
    failure: Option<HarvestFailure>,
}

impl HarvestState {
    pub fn new(site: SiteBase, settings: HarvestSettings) -> Self {
        Self {
            site,
            settings,
            cursor: PageCursor::first(),
            seen: SeenLinks::new(),
            phase: Phase::Idle,
            fetch_attempts: 0,
            empty_streak: 0,
            on_fallback: false,
            failure: None,
        }
    }

    pub fn site(&self) -> &SiteBase {
        &self.site
    }

    pub fn settings(&self) -> &HarvestSettings {
        &self.settings
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn cursor(&self) -> PageCursor {
        self.cursor
    }

    pub fn links(&self) -> &[String] {
        self.seen.as_slice()
    }

    pub fn into_links(self) -> Vec<String> {
        self.seen.into_vec()
    }

    pub fn fetch_attempts(&self) -> u32 {
        self.fetch_attempts
    }

    pub fn failure(&self) -> Option<&HarvestFailure> {
        self.failure.as_ref()
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self.phase, Phase::Complete(_) | Phase::Failed)
    }

    pub(crate) fn set_phase(&mut self, phase: Phase) {
        self.phase = phase;
    }

    pub(crate) fn fail(&mut self, failure: HarvestFailure) {
        self.failure = Some(failure);
        self.phase = Phase::Failed;
    }

    /// Starts fetching the page under the cursor and returns its URL.
    pub(crate) fn begin_fetch(&mut self) -> String {
        let page = self.cursor.page();
        self.fetch_attempts += 1;
        self.on_fallback = false;
        self.phase = Phase::Fetching { page };
        self.site.page_url(page, self.settings.pagination)
    }

    /// Refetches the current page at its fallback address, at most once per page.
    pub(crate) fn begin_fallback_fetch(&mut self) -> Option<String> {
        if self.on_fallback {
            return None;
        }
        let page = self.cursor.page();
        let url = self.site.fallback_page_url(page, self.settings.pagination)?;
        self.fetch_attempts += 1;
        self.on_fallback = true;
        self.phase = Phase::Fetching { page };
        Some(url)
    }

    /// Records candidate hrefs from the current page; returns how many were new.
    pub(crate) fn absorb(&mut self, hrefs: Vec<String>) -> usize {
        let mut fresh = 0;
        for href in hrefs {
            if let Some(link) = self.site.accept(&href) {
                if self.seen.insert(link) {
                    fresh += 1;
                }
            }
        }
        fresh
    }

    /// Closes the current page: a page without new links extends the empty streak.
    pub(crate) fn settle_page(&mut self, produced_links: bool) {
        if produced_links {
            self.empty_streak = 0;
        } else {
            self.empty_streak += 1;
        }
        self.phase = Phase::Deciding;
    }

    pub(crate) fn empty_streak(&self) -> u32 {
        self.empty_streak
    }

    pub(crate) fn advance_cursor(&mut self) {
        self.cursor.advance();
    }
}
