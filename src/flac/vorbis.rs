// VORBIS_COMMENT body codec
//
// All integer fields here are little-endian, unlike the big-endian block framing.

use std::borrow::Cow;

use crate::error::{Error, Result};
use crate::utils::io::{take_bytes, take_le_u32};

/// Common Vorbis comment field names
pub struct VorbisFields;
impl VorbisFields {
    pub const TITLE: &str = "TITLE";
    pub const ARTIST: &str = "ARTIST";
    pub const ALBUM: &str = "ALBUM";
    pub const LABEL: &str = "LABEL";
}

/// A single `KEY=VALUE` comment, kept as the raw bytes found in the file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagEntry {
    raw: Vec<u8>,
}

impl TagEntry {
    pub fn new(key: &str, value: &str) -> Self {
        let mut raw = Vec::with_capacity(key.len() + 1 + value.len());
        raw.extend_from_slice(key.as_bytes());
        raw.push(b'=');
        raw.extend_from_slice(value.as_bytes());
        TagEntry { raw }
    }

    pub fn from_raw(raw: Vec<u8>) -> Self {
        TagEntry { raw }
    }

    /// Field name; the whole entry if there is no `=`
    pub fn key(&self) -> &[u8] {
        match self.separator() {
            Some(pos) => &self.raw[..pos],
            None => &self.raw,
        }
    }

    pub fn value(&self) -> Option<&[u8]> {
        self.separator().map(|pos| &self.raw[pos + 1..])
    }

    pub fn value_lossy(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(self.value().unwrap_or_default())
    }

    pub fn key_matches(&self, field: &str) -> bool {
        self.separator().is_some() && self.key().eq_ignore_ascii_case(field.as_bytes())
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.raw
    }

    fn separator(&self) -> Option<usize> {
        self.raw.iter().position(|&b| b == b'=')
    }
}

/// Vorbis comment structure
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TagBlockBody {
    pub vendor: Vec<u8>,
    pub entries: Vec<TagEntry>,
    /// Bytes found after the last declared entry, written back untouched
    pub trailing: Vec<u8>,
}

impl TagBlockBody {
    pub fn new(vendor: &str) -> Self {
        TagBlockBody {
            vendor: vendor.as_bytes().to_vec(),
            ..TagBlockBody::default()
        }
    }

    /// Parse a VORBIS_COMMENT block body
    pub fn parse(data: &[u8]) -> Result<Self> {
        let mut rest = data;

        let vendor_length = take_le_u32(&mut rest).ok_or_else(|| truncated("vendor length"))? as usize;
        let vendor = take_bytes(&mut rest, vendor_length)
            .ok_or_else(|| overrun("vendor string", vendor_length, rest.len()))?
            .to_vec();

        let count = take_le_u32(&mut rest).ok_or_else(|| truncated("comment count"))? as usize;

        // Every entry needs at least its length field
        if count > rest.len() / 4 {
            return Err(Error::MalformedTagBlock(format!(
                "{} comments declared but only {} bytes remain",
                count,
                rest.len()
            )));
        }

        let mut entries = Vec::with_capacity(count);
        for index in 0..count {
            let length = take_le_u32(&mut rest).ok_or_else(|| truncated("comment length"))? as usize;
            let raw = take_bytes(&mut rest, length)
                .ok_or_else(|| overrun(&format!("comment {}", index), length, rest.len()))?;
            entries.push(TagEntry::from_raw(raw.to_vec()));
        }

        Ok(TagBlockBody {
            vendor,
            entries,
            trailing: rest.to_vec(),
        })
    }

    /// Get the last comment value for a field, since later entries shadow earlier ones
    pub fn get(&self, field: &str) -> Option<Cow<'_, str>> {
        self.entries
            .iter()
            .rev()
            .find(|entry| entry.key_matches(field))
            .map(TagEntry::value_lossy)
    }

    pub fn push(&mut self, key: &str, value: &str) {
        self.entries.push(TagEntry::new(key, value));
    }

    /// Drop every entry whose key matches case-insensitively
    pub fn remove(&mut self, field: &str) {
        self.entries.retain(|entry| !entry.key_matches(field));
    }

    pub fn serialized_len(&self) -> usize {
        4 + self.vendor.len()
            + 4
            + self.entries.iter().map(|e| 4 + e.as_bytes().len()).sum::<usize>()
            + self.trailing.len()
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut result = Vec::with_capacity(self.serialized_len());

        result.extend_from_slice(&(self.vendor.len() as u32).to_le_bytes());
        result.extend_from_slice(&self.vendor);

        result.extend_from_slice(&(self.entries.len() as u32).to_le_bytes());
        for entry in &self.entries {
            result.extend_from_slice(&(entry.as_bytes().len() as u32).to_le_bytes());
            result.extend_from_slice(entry.as_bytes());
        }

        result.extend_from_slice(&self.trailing);
        result
    }
}

fn truncated(field: &str) -> Error {
    Error::MalformedTagBlock(format!("body ends before {}", field))
}

fn overrun(field: &str, declared: usize, remaining: usize) -> Error {
    Error::MalformedTagBlock(format!(
        "{} declares {} bytes but only {} remain",
        field, declared, remaining
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> TagBlockBody {
        let mut body = TagBlockBody::new("reference libFLAC 1.4.3");
        body.push("TITLE", "Song");
        body.push("artist", "Someone");
        body.push("TRACKNUMBER", "3");
        body
    }

    #[test]
    fn parse_reads_little_endian_fields() {
        let data = [
            3, 0, 0, 0, b'v', b'e', b'n', // vendor
            1, 0, 0, 0, // count
            5, 0, 0, 0, b'A', b'=', b'x', b'y', b'z',
        ];
        let body = TagBlockBody::parse(&data).unwrap();
        assert_eq!(body.vendor, b"ven");
        assert_eq!(body.entries.len(), 1);
        assert_eq!(body.get("a").as_deref(), Some("xyz"));
        assert_eq!(body.to_bytes(), data);
    }

    #[test]
    fn serialized_len_matches_bytes() {
        let body = sample();
        assert_eq!(body.to_bytes().len(), body.serialized_len());
        assert_eq!(TagBlockBody::parse(&body.to_bytes()).unwrap(), body);
    }

    #[test]
    fn keys_match_case_insensitively() {
        let body = sample();
        assert_eq!(body.get("ARTIST").as_deref(), Some("Someone"));
        assert_eq!(body.get("Title").as_deref(), Some("Song"));
        assert_eq!(body.get("ALBUM"), None);
    }

    #[test]
    fn later_duplicates_shadow_earlier() {
        let mut body = sample();
        body.push("TITLE", "Other");
        assert_eq!(body.get("TITLE").as_deref(), Some("Other"));
    }

    #[test]
    fn odd_entries_survive_untouched() {
        let mut data = Vec::new();
        data.extend_from_slice(&0u32.to_le_bytes());
        data.extend_from_slice(&2u32.to_le_bytes());
        data.extend_from_slice(&4u32.to_le_bytes());
        data.extend_from_slice(b"NOEQ");
        data.extend_from_slice(&3u32.to_le_bytes());
        data.extend_from_slice(&[b'K', b'=', 0xFF]);
        data.extend_from_slice(&[0x01]);

        let body = TagBlockBody::parse(&data).unwrap();
        assert!(!body.entries[0].key_matches("NOEQ"));
        assert_eq!(body.entries[1].value(), Some(&[0xFF][..]));
        assert_eq!(body.trailing, vec![0x01]);
        assert_eq!(body.to_bytes(), data);
    }

    #[test]
    fn overlong_lengths_are_rejected() {
        let mut data = Vec::new();
        data.extend_from_slice(&10u32.to_le_bytes());
        data.extend_from_slice(b"abc");
        assert!(matches!(TagBlockBody::parse(&data), Err(Error::MalformedTagBlock(_))));

        let mut data = Vec::new();
        data.extend_from_slice(&0u32.to_le_bytes());
        data.extend_from_slice(&1u32.to_le_bytes());
        data.extend_from_slice(&50u32.to_le_bytes());
        data.extend_from_slice(b"A=1");
        assert!(matches!(TagBlockBody::parse(&data), Err(Error::MalformedTagBlock(_))));

        let mut data = Vec::new();
        data.extend_from_slice(&0u32.to_le_bytes());
        data.extend_from_slice(&1000u32.to_le_bytes());
        assert!(matches!(TagBlockBody::parse(&data), Err(Error::MalformedTagBlock(_))));
    }
}
