// Keeps the header region the same size after a VORBIS_COMMENT rewrite

use std::io::{Read, Write};

use crate::error::{Error, Result};
use crate::flac::metadata::{BlockHeader, MAX_BLOCK_LENGTH};
use crate::utils::io::{copy_exact, skip_exact, write_zeros};

/// New PADDING length that absorbs `delta`, if the block can take it
pub fn reconciled_length(padding_length: u32, delta: i64) -> Option<u32> {
    let adjusted = i64::from(padding_length) - delta;
    if adjusted < 0 || adjusted > i64::from(MAX_BLOCK_LENGTH) {
        return None;
    }
    Some(adjusted as u32)
}

/// Forward a PADDING block, resized by `delta` when possible.
///
/// Returns the header that was written.
pub fn forward_padding<R: Read, W: Write>(
    reader: &mut R,
    writer: &mut W,
    header: BlockHeader,
    delta: i64,
) -> Result<BlockHeader> {
    let old_length = header.length();
    let new_length = reconciled_length(old_length, delta).unwrap_or(old_length);
    let out = header.with_length(new_length)?;
    out.write(writer)?;

    let truncated = |copied| {
        Error::MalformedHeader(format!(
            "padding body ended after {} of {} bytes",
            copied, old_length
        ))
    };

    let kept = old_length.min(new_length);
    copy_exact(reader, writer, u64::from(kept), truncated)?;
    if old_length > new_length {
        skip_exact(reader, u64::from(old_length - new_length), |skipped| truncated(u64::from(kept) + skipped))?;
    } else {
        write_zeros(writer, u64::from(new_length - old_length))?;
    }

    Ok(out)
}
