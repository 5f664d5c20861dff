use crate::HarvestFailure;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// Fetch listing page `page` at `url` and report back with a `Msg`.
    FetchPage { page: u32, url: String },
    /// Harvest completed; the collected links are final.
    Finish { reason: StopReason },
    /// Harvest aborted while handling `page`.
    Abort { page: u32, error: HarvestFailure },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// The configured number of consecutive pages produced nothing new.
    NoNewLinks { page: u32 },
    /// A listing page past the first answered "not found".
    PageNotFound { page: u32 },
    /// The page limit was reached before pagination ended.
    PageLimit { max_pages: u32 },
}
