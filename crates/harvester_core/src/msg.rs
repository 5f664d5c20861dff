#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Msg {
    /// Begin harvesting at the first listing page.
    Start,
    /// The body of `page` arrived and is being parsed.
    PageFetched { page: u32 },
    /// Candidate hrefs pulled out of `page`, in document order.
    LinksExtracted { page: u32, hrefs: Vec<String> },
    /// `page` answered 404/410.
    PageNotFound { page: u32 },
    /// `page` was fetched but could not be parsed as a listing page.
    PageMalformed { page: u32, reason: String },
    /// Transport or HTTP failure while fetching `page`.
    FetchFailed { page: u32, reason: String },
}
