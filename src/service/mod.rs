// HTTP front end
//
// GET /track/{uuid}.flac streams the stored file with catalog tags written in.

pub mod pipeline;

use std::net::SocketAddr;
use std::time::Duration;

use axum::extract::{Path, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use reqwest::{Client, Url};

use crate::catalog::{CatalogClient, CatalogConfig};
use crate::error::{Error, Result};
use crate::store::ObjectStore;

pub use pipeline::TrackStream;

/// File extension served by the track route
pub const TRACK_EXTENSION: &str = ".flac";

/// Everything the service needs to know about its upstreams
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub listen: SocketAddr,
    pub catalog: CatalogConfig,
    pub store_url: Url,
    pub connect_timeout: Duration,
    /// Longest wait for the next chunk of an upstream body
    pub read_timeout: Duration,
}

/// Shared per-process state: the two upstream clients and their connection pools
#[derive(Debug, Clone)]
pub struct Relay {
    catalog: CatalogClient,
    store: ObjectStore,
}

impl Relay {
    pub fn new(config: &ServiceConfig) -> Result<Self> {
        let client = Client::builder()
            .cookie_store(true)
            .connect_timeout(config.connect_timeout)
            .read_timeout(config.read_timeout)
            .build()?;

        Ok(Relay {
            catalog: CatalogClient::new(client.clone(), config.catalog.clone()),
            store: ObjectStore::new(client, config.store_url.clone()),
        })
    }
}

pub fn router(relay: Relay) -> Router {
    Router::new()
        .route("/track/{file}", get(track).head(method_not_allowed))
        .route("/health", get(|| async { "ok" }))
        .with_state(relay)
}

/// Extract the identifier from `{uuid}.flac`; only lowercase canonical UUIDs are accepted
pub fn parse_track_file(file: &str) -> Option<&str> {
    let id = file.strip_suffix(TRACK_EXTENSION)?;
    let groups: Vec<&str> = id.split('-').collect();
    let lengths = [8, 4, 4, 4, 12];

    let canonical = groups.len() == lengths.len()
        && groups.iter().zip(lengths).all(|(group, len)| {
            group.len() == len && group.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f'))
        });

    canonical.then_some(id)
}

async fn track(State(relay): State<Relay>, Path(file): Path<String>) -> Response {
    let Some(track_id) = parse_track_file(&file) else {
        return (StatusCode::NOT_FOUND, "Not Found").into_response();
    };

    match relay.open(track_id).await {
        Ok(TrackStream { track, body }) => {
            log::info!("streaming {} ({} - {})", track_id, track.artist, track.title);
            ([(header::CONTENT_TYPE, "audio/flac")], body).into_response()
        }
        Err(e) => {
            log::warn!("unable to serve {}: {}", track_id, e);
            e.into_response()
        }
    }
}

async fn method_not_allowed() -> StatusCode {
    StatusCode::METHOD_NOT_ALLOWED
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = match self {
            Error::NotFound(_) => StatusCode::NOT_FOUND,
            Error::UpstreamFetch(_) => StatusCode::BAD_GATEWAY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, status.canonical_reason().unwrap_or("Error")).into_response()
    }
}
