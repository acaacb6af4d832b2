// Replacement values for the protected comment fields

use crate::catalog::Track;
use crate::flac::vorbis::{TagBlockBody, VorbisFields};

/// Ordered set of comment fields to overwrite and the values to write
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RewritePlan {
    fields: Vec<(String, String)>,
}

impl RewritePlan {
    pub fn new() -> Self {
        Self::default()
    }

    /// Protected fields for a catalog track. Missing or empty values leave the file's tag alone.
    pub fn from_track(track: &Track) -> Self {
        let mut plan = RewritePlan::new();
        let candidates = [
            (VorbisFields::TITLE, Some(track.title.as_str())),
            (VorbisFields::ARTIST, Some(track.artist.as_str())),
            (VorbisFields::ALBUM, track.album.as_deref()),
            (VorbisFields::LABEL, track.label.as_deref()),
        ];
        for (field, value) in candidates {
            if let Some(value) = value.filter(|v| !v.is_empty()) {
                plan.set(field, value);
            }
        }
        plan
    }

    /// Set a field, replacing an earlier value for the same key
    pub fn set(&mut self, field: &str, value: &str) -> &mut Self {
        match self.fields.iter_mut().find(|(f, _)| f.eq_ignore_ascii_case(field)) {
            Some(existing) => existing.1 = value.to_string(),
            None => self.fields.push((field.to_ascii_uppercase(), value.to_string())),
        }
        self
    }

    pub fn get(&self, field: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(f, _)| f.eq_ignore_ascii_case(field))
            .map(|(_, v)| v.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.fields.iter().map(|(f, v)| (f.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Remove every entry for a planned field, then append the planned values in plan order
    pub fn apply(&self, body: &mut TagBlockBody) {
        for (field, _) in &self.fields {
            body.remove(field);
        }
        for (field, value) in &self.fields {
            body.push(field, value);
        }
    }

    /// Body for a VORBIS_COMMENT block created from scratch
    pub fn synthesize(&self) -> TagBlockBody {
        let mut body = TagBlockBody::new("");
        self.apply(&mut body);
        body
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plan() -> RewritePlan {
        let mut plan = RewritePlan::new();
        plan.set("TITLE", "Real Title").set("ARTIST", "Real Artist");
        plan
    }

    fn keys(body: &TagBlockBody) -> Vec<String> {
        body.entries
            .iter()
            .map(|e| String::from_utf8_lossy(e.as_bytes()).into_owned())
            .collect()
    }

    #[test]
    fn replaces_protected_fields_and_keeps_the_rest_in_order() {
        let mut body = TagBlockBody::new("vendor");
        body.push("genre", "Jazz");
        body.push("artist", "Old 1");
        body.push("DATE", "1999");
        body.push("Artist", "Old 2");
        body.push("COMMENT", "hi");

        plan().apply(&mut body);

        assert_eq!(
            keys(&body),
            vec![
                "genre=Jazz",
                "DATE=1999",
                "COMMENT=hi",
                "TITLE=Real Title",
                "ARTIST=Real Artist"
            ]
        );
        assert_eq!(body.vendor, b"vendor");
    }

    #[test]
    fn applying_twice_is_idempotent() {
        let mut body = TagBlockBody::new("");
        body.push("TITLE", "Old");
        body.push("TRACKNUMBER", "1");

        let plan = plan();
        plan.apply(&mut body);
        let once = body.clone();
        plan.apply(&mut body);

        assert_eq!(body, once);
    }

    #[test]
    fn set_replaces_case_insensitively() {
        let mut plan = plan();
        plan.set("title", "Newer");
        assert_eq!(plan.len(), 2);
        assert_eq!(plan.get("TITLE"), Some("Newer"));
    }

    #[test]
    fn synthesized_body_holds_only_plan_entries() {
        let body = plan().synthesize();
        assert!(body.vendor.is_empty());
        assert_eq!(keys(&body), vec!["TITLE=Real Title", "ARTIST=Real Artist"]);
    }

    #[test]
    fn from_track_skips_missing_values() {
        let track = Track {
            id: "x".to_string(),
            title: "T".to_string(),
            artist: String::new(),
            album: Some("A".to_string()),
            ..Track::default()
        };
        let plan = RewritePlan::from_track(&track);
        let fields: Vec<_> = plan.iter().collect();
        assert_eq!(fields, vec![("TITLE", "T"), ("ALBUM", "A")]);
    }
}
