// FLAC metadata handling module

pub mod metadata;
pub mod padding;
pub mod plan;
pub mod vorbis;
pub mod walker;

pub use metadata::{read_header_region, BlockBody, BlockHeader, BlockKind, MetadataBlock, FLAC_SIGNATURE};
pub use plan::RewritePlan;
pub use vorbis::{TagBlockBody, TagEntry, VorbisFields};
pub use walker::{rewrite_stream, BlockWalker, WalkState, WalkSummary};
