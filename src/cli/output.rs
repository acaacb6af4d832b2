// Output formatting for CLI

use std::io::Write;
use std::path::Path;

use anyhow::Result;
use flac_relay::flac::{BlockBody, BlockKind, MetadataBlock};
use serde::Serialize;

use crate::cli::OutputFormat;

/// Serializable view of one metadata block
#[derive(Debug, Serialize)]
pub struct BlockReport {
    pub kind: BlockKind,
    pub is_last: bool,
    pub length: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vendor: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub comments: Vec<String>,
}

impl BlockReport {
    pub fn from_block(block: &MetadataBlock) -> Self {
        let length = block.header().map(|h| h.length()).unwrap_or(u32::MAX);
        let (vendor, comments) = match &block.body {
            BlockBody::VorbisComment(tags) => (
                Some(String::from_utf8_lossy(&tags.vendor).into_owned()),
                tags.entries
                    .iter()
                    .map(|e| String::from_utf8_lossy(e.as_bytes()).into_owned())
                    .collect(),
            ),
            _ => (None, Vec::new()),
        };

        BlockReport {
            kind: block.kind(),
            is_last: block.is_last,
            length,
            vendor,
            comments,
        }
    }
}

#[derive(Debug, Serialize)]
struct FileReport<'a> {
    file: &'a str,
    blocks: &'a [BlockReport],
}

/// Format and output data
pub struct OutputFormatter {
    format: OutputFormat,
}

impl OutputFormatter {
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    /// Output the metadata blocks of one file
    pub fn output_blocks(&self, path: &Path, blocks: &[MetadataBlock], writer: &mut impl Write) -> Result<()> {
        let reports: Vec<BlockReport> = blocks.iter().map(BlockReport::from_block).collect();
        let file = path.display().to_string();

        match self.format {
            OutputFormat::Json => {
                let report = FileReport { file: &file, blocks: &reports };
                writeln!(writer, "{}", serde_json::to_string(&report)?)?;
            }
            OutputFormat::Pretty => {
                writeln!(writer, "{}", file)?;
                for (index, report) in reports.iter().enumerate() {
                    writeln!(
                        writer,
                        "  #{:<2} {:<16} {:>8} bytes{}",
                        index,
                        format!("{:?}", report.kind),
                        report.length,
                        if report.is_last { "  (last)" } else { "" }
                    )?;
                    if let Some(vendor) = &report.vendor {
                        writeln!(writer, "       vendor: {}", vendor)?;
                    }
                    for comment in &report.comments {
                        writeln!(writer, "       {}", comment)?;
                    }
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flac_relay::flac::TagBlockBody;

    fn blocks() -> Vec<MetadataBlock> {
        let mut tags = TagBlockBody::new("ref");
        tags.push("TITLE", "Song");
        vec![
            MetadataBlock::new(false, BlockBody::StreamInfo(vec![0; 34])),
            MetadataBlock::new(true, BlockBody::VorbisComment(tags)),
        ]
    }

    #[test]
    fn json_output() {
        let mut out = Vec::new();
        OutputFormatter::new(OutputFormat::Json)
            .output_blocks(Path::new("a.flac"), &blocks(), &mut out)
            .unwrap();

        let value: serde_json::Value = serde_json::from_slice(&out).unwrap();
        assert_eq!(value["file"], "a.flac");
        assert_eq!(value["blocks"][0]["kind"], "stream_info");
        assert_eq!(value["blocks"][0]["length"], 34);
        assert_eq!(value["blocks"][1]["comments"][0], "TITLE=Song");
        assert_eq!(value["blocks"][1]["is_last"], true);
    }

    #[test]
    fn pretty_output_marks_last_block() {
        let mut out = Vec::new();
        OutputFormatter::new(OutputFormat::Pretty)
            .output_blocks(Path::new("a.flac"), &blocks(), &mut out)
            .unwrap();

        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("VorbisComment"));
        assert!(text.contains("(last)"));
        assert!(text.contains("TITLE=Song"));
    }
}
