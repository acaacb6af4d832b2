// Catalog service client
//
// The catalog hands out a session cookie on login; every lookup logs in first
// and then fetches the track record as JSON.

use reqwest::{Client, StatusCode, Url};
use serde::Deserialize;

use crate::error::{Error, Result};

/// Track record as served by the catalog
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Track {
    pub id: String,
    pub title: String,
    pub artist: String,
    pub album: Option<String>,
    pub label: Option<String>,
    pub holding_id: String,
    pub file_path: String,
    pub track_num: Option<u64>,
    pub disc_num: Option<u64>,
    pub recording_mbid: Option<String>,
    pub track_mbid: Option<String>,
    pub added_at: Option<String>,
    pub added_by: Option<String>,
    pub has_fcc: Option<String>,
}

/// Credentials and location of the catalog
#[derive(Debug, Clone)]
pub struct CatalogConfig {
    pub url: Url,
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone)]
pub struct CatalogClient {
    client: Client,
    config: CatalogConfig,
}

impl CatalogClient {
    /// `client` must have a cookie store enabled so the login session sticks
    pub fn new(client: Client, config: CatalogConfig) -> Self {
        CatalogClient { client, config }
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.config.url.clone();
        url.path_segments_mut()
            .map_err(|_| Error::UpstreamFetch(format!("catalog URL {} cannot be a base", self.config.url)))?
            .pop_if_empty()
            .extend(["api", "v1"])
            .extend(segments);
        Ok(url)
    }

    async fn login(&self) -> Result<()> {
        let response = self
            .client
            .get(self.endpoint(&["login"])?)
            .basic_auth(&self.config.username, Some(&self.config.password))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Error::UpstreamFetch(format!("catalog login returned {}", response.status())));
        }
        Ok(())
    }

    /// Look up a track by identifier
    pub async fn lookup(&self, track_id: &str) -> Result<Track> {
        self.login().await?;

        let response = self.client.get(self.endpoint(&["tracks", track_id])?).send().await?;

        match response.status() {
            StatusCode::OK => {}
            StatusCode::NOT_FOUND => return Err(Error::NotFound(track_id.to_string())),
            status => {
                return Err(Error::UpstreamFetch(format!(
                    "catalog returned {} for track {}",
                    status, track_id
                )));
            }
        }

        let track: Track = response.json().await?;
        log::debug!("catalog: {} is {:?} by {:?}", track_id, track.title, track.artist);
        Ok(track)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_partial_records() {
        let track: Track = serde_json::from_str(
            r#"{"id": "abc", "title": "Song", "artist": "Band", "holding_id": "h1",
                "file_path": "a/b.flac", "track_num": 4, "unknown_field": true}"#,
        )
        .unwrap();

        assert_eq!(track.title, "Song");
        assert_eq!(track.track_num, Some(4));
        assert_eq!(track.album, None);
    }

    #[test]
    fn endpoints_keep_base_path() {
        let client = CatalogClient::new(
            Client::new(),
            CatalogConfig {
                url: Url::parse("http://catalog.local/prefix/").unwrap(),
                username: "u".to_string(),
                password: "p".to_string(),
            },
        );
        assert_eq!(
            client.endpoint(&["tracks", "id"]).unwrap().as_str(),
            "http://catalog.local/prefix/api/v1/tracks/id"
        );
    }
}
