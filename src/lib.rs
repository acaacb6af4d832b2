//! flac-relay - serve FLAC tracks from an object store with catalog tags written in on the fly
//!
//! The rewrite happens while the file is in transit: metadata blocks are walked
//! front to back, the VORBIS_COMMENT block is rewritten (or appended if the file
//! has none) and audio frames are copied through untouched.

pub mod catalog;
pub mod error;
pub mod flac;
pub mod service;
pub mod store;
mod utils;

pub use catalog::{CatalogClient, CatalogConfig, Track};
pub use error::{Error, Result};
pub use flac::{rewrite_stream, BlockWalker, RewritePlan, WalkSummary};
pub use service::{router, Relay, ServiceConfig};
pub use store::ObjectStore;
