//! Harvester core: site validation, permalink normalization and the pure
//! pagination state machine. No IO happens here.
mod cursor;
mod effect;
mod msg;
mod normalize;
mod seen;
mod site;
mod state;
mod update;

pub use cursor::PageCursor;
pub use effect::{Effect, StopReason};
pub use msg::Msg;
pub use normalize::{normalize_permalink, normalize_url_str};
pub use seen::SeenLinks;
pub use site::{InvalidInput, PaginationStyle, SiteBase};
pub use state::{HarvestFailure, HarvestSettings, HarvestState, ParsePolicy, Phase};
pub use update::update;
