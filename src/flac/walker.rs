// Forward-only FLAC metadata rewriter
//
// Reads a FLAC stream once, front to back, and writes it out with the
// VORBIS_COMMENT block rewritten by a `RewritePlan`. Nothing but the comment
// body is held in memory.

use std::io::{Read, Write};

use crate::error::{Error, Result};
use crate::flac::metadata::{
    BlockBody, BlockHeader, BlockKind, MetadataBlock, FLAC_SIGNATURE, MAX_BLOCK_LENGTH, STREAM_INFO_LENGTH,
};
use crate::flac::padding::forward_padding;
use crate::flac::plan::RewritePlan;
use crate::flac::vorbis::TagBlockBody;
use crate::utils::io::{copy_exact, copy_to_end, read_exact_or, read_vec, write_all};

/// Where the walker is in the stream
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WalkState {
    ExpectSignature,
    ExpectFixedInfo,
    WalkBlocks,
    StreamFrames,
    Done,
    Failed,
}

/// What happened to the stream, for logging
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WalkSummary {
    pub metadata_blocks: usize,
    /// Body length before and after, if the stream had a VORBIS_COMMENT block
    pub tags_rewritten: Option<(u32, u32)>,
    pub tags_synthesized: bool,
    /// New PADDING length, if one absorbed the size change
    pub padding_adjusted: Option<u32>,
    pub audio_bytes: u64,
}

pub struct BlockWalker<R, W> {
    reader: R,
    writer: W,
    plan: RewritePlan,
    state: WalkState,
    tags_seen: bool,
    // Size change of the comment block that was just written, for the next block only
    pending_delta: Option<i64>,
    summary: WalkSummary,
}

impl<R: Read, W: Write> BlockWalker<R, W> {
    pub fn new(reader: R, writer: W, plan: RewritePlan) -> Self {
        BlockWalker {
            reader,
            writer,
            plan,
            state: WalkState::ExpectSignature,
            tags_seen: false,
            pending_delta: None,
            summary: WalkSummary::default(),
        }
    }

    pub fn state(&self) -> WalkState {
        self.state
    }

    pub fn summary(&self) -> &WalkSummary {
        &self.summary
    }

    pub fn into_writer(self) -> W {
        self.writer
    }

    /// Advance by one state transition
    pub fn step(&mut self) -> Result<WalkState> {
        let result = match self.state {
            WalkState::ExpectSignature => self.expect_signature(),
            WalkState::ExpectFixedInfo => self.expect_fixed_info(),
            WalkState::WalkBlocks => self.walk_block(),
            WalkState::StreamFrames => self.stream_frames(),
            WalkState::Done => Ok(WalkState::Done),
            WalkState::Failed => Err(Error::AlreadyFailed),
        };
        // The header region is complete; hand it on before waiting on the frames
        let result = match result {
            Ok(WalkState::StreamFrames) => self
                .writer
                .flush()
                .map(|()| WalkState::StreamFrames)
                .map_err(Error::Sink),
            other => other,
        };

        match result {
            Ok(next) => {
                self.state = next;
                Ok(next)
            }
            Err(e) => {
                self.state = WalkState::Failed;
                Err(e)
            }
        }
    }

    /// Step until the whole stream has been forwarded
    pub fn run(&mut self) -> Result<WalkSummary> {
        while self.step()? != WalkState::Done {}
        Ok(self.summary.clone())
    }

    fn expect_signature(&mut self) -> Result<WalkState> {
        let mut signature = [0u8; 4];
        read_exact_or(&mut self.reader, &mut signature, || Error::InvalidContainer)?;
        if signature != *FLAC_SIGNATURE {
            return Err(Error::InvalidContainer);
        }
        write_all(&mut self.writer, &signature)?;
        Ok(WalkState::ExpectFixedInfo)
    }

    fn expect_fixed_info(&mut self) -> Result<WalkState> {
        let header = BlockHeader::read(&mut self.reader)?;
        if header.kind != BlockKind::StreamInfo || header.length() != STREAM_INFO_LENGTH {
            return Err(Error::MalformedHeader(format!(
                "expected a {} byte STREAMINFO block first, found {:?} of {} bytes",
                STREAM_INFO_LENGTH,
                header.kind,
                header.length()
            )));
        }
        self.forward_block(header)
    }

    fn walk_block(&mut self) -> Result<WalkState> {
        let header = BlockHeader::read(&mut self.reader)?;
        let pending_delta = self.pending_delta.take();

        match (header.kind, pending_delta) {
            (BlockKind::Invalid, _) => Err(Error::MalformedHeader("block type 127 is reserved".to_string())),
            (BlockKind::VorbisComment, _) => self.rewrite_tags(header),
            (BlockKind::Padding, Some(delta)) => {
                let written = forward_padding(&mut self.reader, &mut self.writer, header, delta)?;
                if written.length() != header.length() {
                    self.summary.padding_adjusted = Some(written.length());
                }
                log::debug!(
                    "PADDING resized from {} to {} bytes (delta {})",
                    header.length(),
                    written.length(),
                    delta
                );
                self.summary.metadata_blocks += 1;
                Ok(self.after_block(written))
            }
            _ => self.forward_block(header),
        }
    }

    /// Copy a block through, appending a comment block if it is the last one and none was seen
    fn forward_block(&mut self, header: BlockHeader) -> Result<WalkState> {
        let synthesize = header.is_last && !self.tags_seen;
        let out = header.with_last(header.is_last && !synthesize);

        log::debug!("{:?} block, {} bytes, last: {}", header.kind, header.length(), header.is_last);

        out.write(&mut self.writer)?;
        copy_exact(&mut self.reader, &mut self.writer, u64::from(header.length()), |copied| {
            Error::MalformedHeader(format!(
                "{:?} body ended after {} of {} bytes",
                header.kind,
                copied,
                header.length()
            ))
        })?;
        self.summary.metadata_blocks += 1;

        if synthesize {
            let block = MetadataBlock::new(true, BlockBody::VorbisComment(self.plan.synthesize()));
            block.write(&mut self.writer)?;
            self.tags_seen = true;
            self.summary.tags_synthesized = true;
            self.summary.metadata_blocks += 1;
            log::debug!("no VORBIS_COMMENT block found, appended one with {} fields", self.plan.len());
            return Ok(WalkState::StreamFrames);
        }

        Ok(self.after_block(out))
    }

    fn rewrite_tags(&mut self, header: BlockHeader) -> Result<WalkState> {
        let old_length = header.length();
        let data = read_vec(&mut self.reader, old_length as usize, || {
            Error::MalformedTagBlock(format!("body shorter than declared {} bytes", old_length))
        })?;

        let mut tags = TagBlockBody::parse(&data)?;
        self.plan.apply(&mut tags);

        let new_length = tags.serialized_len();
        if new_length > MAX_BLOCK_LENGTH as usize {
            return Err(Error::TagBlockOverflow(new_length));
        }
        let new_length = new_length as u32;

        let out = header.with_length(new_length)?;
        out.write(&mut self.writer)?;
        write_all(&mut self.writer, &tags.to_bytes())?;

        log::debug!("VORBIS_COMMENT rewritten, {} -> {} bytes", old_length, new_length);

        self.tags_seen = true;
        self.pending_delta = Some(i64::from(new_length) - i64::from(old_length));
        self.summary.tags_rewritten = Some((old_length, new_length));
        self.summary.metadata_blocks += 1;
        Ok(self.after_block(out))
    }

    fn after_block(&self, written: BlockHeader) -> WalkState {
        if written.is_last {
            WalkState::StreamFrames
        } else {
            WalkState::WalkBlocks
        }
    }

    fn stream_frames(&mut self) -> Result<WalkState> {
        self.summary.audio_bytes = copy_to_end(&mut self.reader, &mut self.writer)?;
        self.writer.flush().map_err(Error::Sink)?;
        Ok(WalkState::Done)
    }
}

/// Rewrite a whole stream in one call
pub fn rewrite_stream<R: Read, W: Write>(reader: R, writer: W, plan: RewritePlan) -> Result<WalkSummary> {
    BlockWalker::new(reader, writer, plan).run()
}
