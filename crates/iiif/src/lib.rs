//! IIIF manifest resolution
//!
//! Turns a Presentation API manifest into the list of full-size page image
//! URLs. Both v2 (`sequences`/`canvases`) and v3 (`items`) layouts are
//! accepted; anything else resolves to an empty list.

mod fetch;

pub use fetch::{
    is_remote, FileFetcher, HttpFetcher, ImageFetcher, ManifestFetcher, DEFAULT_TIMEOUT,
    MAX_IMAGE_BYTES,
};

use serde_json::Value;

#[derive(Debug, thiserror::Error)]
pub enum ManifestError {
    #[error("request failed with HTTP status {status}")]
    Status { status: u16 },
    #[error("network error: {0}")]
    Network(String),
    #[error("failed to read manifest {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("manifest is not valid JSON: {0}")]
    Parse(String),
}

pub type Result<T> = std::result::Result<T, ManifestError>;

const FULL_IMAGE_SUFFIX: &str = "full/full/0/default.jpg";

/// Fetch `url` and extract its page image URLs
pub fn resolve_manifest(fetcher: &dyn ManifestFetcher, url: &str) -> Result<Vec<String>> {
    let body = fetcher.fetch(url)?;
    let manifest: Value =
        serde_json::from_str(&body).map_err(|e| ManifestError::Parse(e.to_string()))?;
    Ok(normalize_manifest(&manifest))
}

/// Extract page image URLs from an already parsed manifest
pub fn normalize_manifest(manifest: &Value) -> Vec<String> {
    let v2 = v2_image_urls(manifest);
    if !v2.is_empty() {
        tracing::debug!(pages = v2.len(), "resolved IIIF v2 manifest");
        return v2;
    }

    let canvases = manifest.get("items").and_then(Value::as_array).map(Vec::as_slice);
    let canvases = canvases.unwrap_or_default();

    let v3: Vec<String> = canvases
        .iter()
        .filter_map(|canvas| {
            let service = painting_body(canvas)?.get("service")?;
            let service = match service {
                Value::Array(services) => services.first()?,
                other => other,
            };
            service_id(service).map(full_image_url)
        })
        .collect();
    if !v3.is_empty() {
        tracing::debug!(pages = v3.len(), "resolved IIIF v3 manifest");
        return v3;
    }

    let bodies: Vec<String> = canvases
        .iter()
        .filter_map(|canvas| non_empty_str(painting_body(canvas)?.get("id")?))
        .map(str::to_owned)
        .collect();
    if bodies.is_empty() {
        tracing::warn!("manifest has no recognizable image resources");
    } else {
        tracing::debug!(pages = bodies.len(), "resolved manifest from painting bodies");
    }
    bodies
}

fn v2_image_urls(manifest: &Value) -> Vec<String> {
    let Some(canvases) = manifest.pointer("/sequences/0/canvases").and_then(Value::as_array)
    else {
        return Vec::new();
    };

    canvases
        .iter()
        .filter_map(|canvas| {
            let service = canvas.pointer("/images/0/resource/service")?;
            let service = match service {
                Value::Array(services) => services.first()?,
                other => other,
            };
            non_empty_str(service.get("@id")?).map(full_image_url)
        })
        .collect()
}

/// `items[0].items[0].body` of a v3 canvas
fn painting_body(canvas: &Value) -> Option<&Value> {
    canvas.pointer("/items/0/items/0/body")
}

fn service_id(service: &Value) -> Option<&str> {
    service
        .get("@id")
        .and_then(non_empty_str)
        .or_else(|| service.get("id").and_then(non_empty_str))
}

fn non_empty_str(value: &Value) -> Option<&str> {
    value.as_str().filter(|s| !s.is_empty())
}

fn full_image_url(service_id: &str) -> String {
    format!("{service_id}/{FULL_IMAGE_SUFFIX}")
}
