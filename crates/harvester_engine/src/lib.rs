//! Harvester engine: HTTP fetching, page decoding, permalink extraction and
//! the sequential harvest loop driving `harvester_core`.
mod decode;
mod export;
mod extract;
mod fetch;
mod harvest;
mod persist;
mod types;
pub mod wp_api;

pub use decode::{decode_page, DecodedPage};
pub use export::{render_links, write_links, ExportError, OutputFormat};
pub use extract::{LinkExtractor, SelectorExtractor, WORDPRESS_PERMALINK_SELECTORS};
pub use fetch::{FetchSettings, Fetcher, ReqwestFetcher, DEFAULT_USER_AGENT};
pub use harvest::{
    harvest, HarvestConfig, HarvestError, HarvestReport, Harvester, LinkSource, LogProgressSink,
    ProgressSink, Strategy,
};
pub use persist::{ensure_output_dir, write_atomically, PersistError};
pub use types::{FailureKind, FetchError, FetchMetadata, FetchOutput, HarvestEvent, ParseError};
pub use wp_api::{ApiError, ApiPaging};

pub use harvester_core::{
    HarvestSettings, InvalidInput, PaginationStyle, ParsePolicy, StopReason,
};
