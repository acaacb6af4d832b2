// FLAC metadata block framing

use std::io::{Read, Write};

use serde::Serialize;

use crate::error::{Error, Result};
use crate::flac::vorbis::TagBlockBody;
use crate::utils::io::{read_exact_or, read_vec, skip_exact, write_all, write_zeros};

/// FLAC file signature
pub const FLAC_SIGNATURE: &[u8; 4] = b"fLaC";

/// Size of the fixed STREAMINFO body
pub const STREAM_INFO_LENGTH: u32 = 34;

/// Largest body length a block header can express
pub const MAX_BLOCK_LENGTH: u32 = 0x00FF_FFFF;

/// FLAC metadata block types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BlockKind {
    StreamInfo,
    Padding,
    VorbisComment,
    /// Reserved code 127, never valid in a stream
    Invalid,
    /// Any other code, forwarded untouched
    Other(u8),
}

impl BlockKind {
    pub fn from_code(code: u8) -> Self {
        match code & 0x7F {
            0 => BlockKind::StreamInfo,
            1 => BlockKind::Padding,
            4 => BlockKind::VorbisComment,
            127 => BlockKind::Invalid,
            other => BlockKind::Other(other),
        }
    }

    pub fn code(self) -> u8 {
        match self {
            BlockKind::StreamInfo => 0,
            BlockKind::Padding => 1,
            BlockKind::VorbisComment => 4,
            BlockKind::Invalid => 127,
            BlockKind::Other(code) => code & 0x7F,
        }
    }
}

/// FLAC metadata block header
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BlockHeader {
    pub is_last: bool,
    pub kind: BlockKind,
    length: u32,
}

impl BlockHeader {
    pub const SIZE: usize = 4;

    /// Build a header, rejecting lengths that don't fit in 24 bits
    pub fn new(is_last: bool, kind: BlockKind, length: u32) -> Result<Self> {
        if length > MAX_BLOCK_LENGTH {
            return Err(Error::MalformedHeader(format!(
                "block length {} exceeds 24 bits",
                length
            )));
        }
        Ok(BlockHeader { is_last, kind, length })
    }

    /// Body length in bytes
    pub fn length(&self) -> u32 {
        self.length
    }

    /// Same header with the last-block flag replaced
    pub fn with_last(self, is_last: bool) -> Self {
        BlockHeader { is_last, ..self }
    }

    /// Same header with a different body length
    pub fn with_length(self, length: u32) -> Result<Self> {
        BlockHeader::new(self.is_last, self.kind, length)
    }

    pub fn decode(bytes: [u8; Self::SIZE]) -> Self {
        let is_last = (bytes[0] & 0x80) != 0;
        let kind = BlockKind::from_code(bytes[0] & 0x7F);

        // Length is big-endian 24-bit
        let length = u32::from_be_bytes([0, bytes[1], bytes[2], bytes[3]]);

        BlockHeader { is_last, kind, length }
    }

    pub fn encode(&self) -> [u8; Self::SIZE] {
        let [_, hi, mid, lo] = self.length.to_be_bytes();
        let mut flag_and_type = self.kind.code();
        if self.is_last {
            flag_and_type |= 0x80;
        }
        [flag_and_type, hi, mid, lo]
    }

    /// Read FLAC metadata block header from reader
    pub fn read<R: Read>(reader: &mut R) -> Result<Self> {
        let mut buffer = [0u8; Self::SIZE];
        read_exact_or(reader, &mut buffer, || {
            Error::MalformedHeader("stream ended inside a block header".to_string())
        })?;
        Ok(Self::decode(buffer))
    }

    pub fn write<W: Write>(&self, writer: &mut W) -> Result<()> {
        write_all(writer, &self.encode())
    }
}

/// Decoded body of a metadata block
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BlockBody {
    StreamInfo(Vec<u8>),
    /// Padding is only tracked by length; it is written back as zeros
    Padding(u32),
    VorbisComment(TagBlockBody),
    Other { code: u8, data: Vec<u8> },
}

/// FLAC metadata block
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetadataBlock {
    pub is_last: bool,
    pub body: BlockBody,
}

impl MetadataBlock {
    pub fn new(is_last: bool, body: BlockBody) -> Self {
        MetadataBlock { is_last, body }
    }

    pub fn kind(&self) -> BlockKind {
        match &self.body {
            BlockBody::StreamInfo(_) => BlockKind::StreamInfo,
            BlockBody::Padding(_) => BlockKind::Padding,
            BlockBody::VorbisComment(_) => BlockKind::VorbisComment,
            BlockBody::Other { code, .. } => BlockKind::from_code(*code),
        }
    }

    /// Read FLAC metadata block from reader
    pub fn read<R: Read>(reader: &mut R) -> Result<Self> {
        let header = BlockHeader::read(reader)?;
        let length = header.length();
        let truncated = || Error::MalformedHeader(format!("{:?} block body shorter than {} bytes", header.kind, length));

        let body = match header.kind {
            BlockKind::Invalid => {
                return Err(Error::MalformedHeader("block type 127 is reserved".to_string()));
            }
            BlockKind::StreamInfo => BlockBody::StreamInfo(read_vec(reader, length as usize, truncated)?),
            BlockKind::Padding => {
                skip_exact(reader, u64::from(length), |_| truncated())?;
                BlockBody::Padding(length)
            }
            BlockKind::VorbisComment => {
                let data = read_vec(reader, length as usize, || {
                    Error::MalformedTagBlock(format!("body shorter than declared {} bytes", length))
                })?;
                BlockBody::VorbisComment(TagBlockBody::parse(&data)?)
            }
            BlockKind::Other(code) => BlockBody::Other {
                code,
                data: read_vec(reader, length as usize, truncated)?,
            },
        };

        Ok(MetadataBlock::new(header.is_last, body))
    }

    /// Header matching the serialized body
    pub fn header(&self) -> Result<BlockHeader> {
        let length = match &self.body {
            BlockBody::StreamInfo(data) | BlockBody::Other { data, .. } => data.len(),
            BlockBody::Padding(length) => *length as usize,
            BlockBody::VorbisComment(tags) => tags.serialized_len(),
        };
        let length = u32::try_from(length).unwrap_or(u32::MAX);
        BlockHeader::new(self.is_last, self.kind(), length)
    }

    pub fn write<W: Write>(&self, writer: &mut W) -> Result<()> {
        let header = match (&self.body, self.header()) {
            (BlockBody::VorbisComment(tags), Err(_)) => {
                return Err(Error::TagBlockOverflow(tags.serialized_len()));
            }
            (_, header) => header?,
        };
        header.write(writer)?;

        match &self.body {
            BlockBody::StreamInfo(data) | BlockBody::Other { data, .. } => write_all(writer, data),
            BlockBody::Padding(length) => write_zeros(writer, u64::from(*length)),
            BlockBody::VorbisComment(tags) => write_all(writer, &tags.to_bytes()),
        }
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut out = Vec::new();
        self.write(&mut out)?;
        Ok(out)
    }
}

/// Read the signature and every metadata block up to the audio frames.
///
/// Leaves `reader` positioned at the first audio frame.
pub fn read_header_region<R: Read>(reader: &mut R) -> Result<Vec<MetadataBlock>> {
    let mut signature = [0u8; 4];
    read_exact_or(reader, &mut signature, || Error::InvalidContainer)?;
    if signature != *FLAC_SIGNATURE {
        return Err(Error::InvalidContainer);
    }

    let mut blocks = Vec::new();
    loop {
        let block = MetadataBlock::read(reader)?;
        let is_last = block.is_last;
        blocks.push(block);
        if is_last {
            return Ok(blocks);
        }
    }
}
