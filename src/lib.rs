//! Wiki Revision Time-Lapse
//!
//! Fetches the historical revisions of a wiki article over a time window and
//! plays them back as an animation:
//! - Timestamp codec for the wiki API's `YYYYMMDDhhmmss` tokens
//! - Revision lookup over the MediaWiki Action API
//! - Linear and binary-tree revision range discovery
//! - One-shot trigger resolution for discovery progress
//! - Frame-by-frame playback onto a rendering sink

pub mod config;
pub mod discovery;
pub mod lookup;
pub mod playback;
pub mod timestamp;
pub mod utils;

// Re-exports for convenience
pub use config::TimelapseConfig;
pub use discovery::{
    discover, CallbackSpec, DiscoveryObserver, DiscoveryRequest, DiscoveryResult, FetchStrategy,
    RevisionRun,
};
pub use lookup::{RevisionLookup, RevisionRef, WikiClient};
pub use playback::{Playback, RenderSink};
