// Object store client

use reqwest::{Client, Response, StatusCode, Url};

use crate::error::{Error, Result};

#[derive(Debug, Clone)]
pub struct ObjectStore {
    client: Client,
    base: Url,
}

impl ObjectStore {
    pub fn new(client: Client, base: Url) -> Self {
        ObjectStore { client, base }
    }

    /// `{base}/{holding}/music/{path}`, each segment percent-encoded
    pub fn object_url(&self, holding_id: &str, file_path: &str) -> Result<Url> {
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|_| Error::UpstreamFetch(format!("store URL {} cannot be a base", self.base)))?
            .pop_if_empty()
            .push(holding_id)
            .push("music")
            .push(file_path);
        Ok(url)
    }

    /// Start fetching an object. The body is left unread for the caller to stream.
    pub async fn fetch(&self, holding_id: &str, file_path: &str) -> Result<Response> {
        let url = self.object_url(holding_id, file_path)?;
        let response = self.client.get(url.clone()).send().await?;

        if response.status() != StatusCode::OK {
            return Err(Error::UpstreamFetch(format!("object store returned {} for {}", response.status(), url)));
        }
        Ok(response)
    }
}
