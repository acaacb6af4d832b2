// Error taxonomy shared by the rewriter and the service

use std::io;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Everything that can go wrong while relaying a track
#[derive(Debug, Error)]
pub enum Error {
    /// Unknown identifier, either at path matching or catalog lookup
    #[error("track not found: {0}")]
    NotFound(String),

    /// Catalog or object store failed, or answered with an unexpected status
    #[error("upstream fetch failed: {0}")]
    UpstreamFetch(String),

    /// The source does not start with the `fLaC` signature
    #[error("not a FLAC stream")]
    InvalidContainer,

    /// Truncated or inconsistent metadata block framing
    #[error("malformed metadata block header: {0}")]
    MalformedHeader(String),

    /// Declared lengths inside the VORBIS_COMMENT body don't fit the block
    #[error("malformed VORBIS_COMMENT block: {0}")]
    MalformedTagBlock(String),

    /// The rewritten VORBIS_COMMENT body no longer fits a 24-bit length
    #[error("rewritten VORBIS_COMMENT block is too large ({0} bytes)")]
    TagBlockOverflow(usize),

    /// Reading from the upstream byte source failed
    #[error("error reading source stream: {0}")]
    Source(#[source] io::Error),

    /// `step` was called again after an earlier step returned an error
    #[error("rewriter already failed")]
    AlreadyFailed,

    /// Writing to the downstream sink failed, usually a client disconnect
    #[error("error writing to sink: {0}")]
    Sink(#[source] io::Error),
}

impl Error {
    /// Whether the failure originated on the upstream side of the pipeline
    pub fn is_source_side(&self) -> bool {
        !matches!(self, Error::Sink(_) | Error::AlreadyFailed)
    }
}

impl From<reqwest::Error> for Error {
    fn from(e: reqwest::Error) -> Self {
        Error::UpstreamFetch(e.to_string())
    }
}
