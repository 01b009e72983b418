use crate::{ManifestError, Result};
use std::io::Read;
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Upper bound on a downloaded page image
pub const MAX_IMAGE_BYTES: u64 = 256 * 1024 * 1024;

const USER_AGENT: &str = concat!("Scriptorium/", env!("CARGO_PKG_VERSION"));

/// Source of raw manifest documents
pub trait ManifestFetcher {
    fn fetch(&self, url: &str) -> Result<String>;
}

/// Source of encoded page images
pub trait ImageFetcher {
    fn fetch_image(&self, url: &str) -> Result<Vec<u8>>;
}

/// Whether `source` must be fetched over HTTP
pub fn is_remote(source: &str) -> bool {
    source.starts_with("http://") || source.starts_with("https://")
}

/// Blocking HTTP fetcher for manifests and page images
pub struct HttpFetcher {
    agent: ureq::Agent,
}

impl HttpFetcher {
    pub fn new(timeout: Duration) -> Self {
        let agent = ureq::AgentBuilder::new().timeout(timeout).user_agent(USER_AGENT).build();
        Self { agent }
    }
}

impl Default for HttpFetcher {
    fn default() -> Self {
        Self::new(DEFAULT_TIMEOUT)
    }
}

impl ManifestFetcher for HttpFetcher {
    fn fetch(&self, url: &str) -> Result<String> {
        tracing::info!(url, "fetching IIIF manifest");
        let response = self
            .agent
            .get(url)
            .set("Accept", "application/ld+json, application/json")
            .call()
            .map_err(request_error)?;

        response.into_string().map_err(|e| ManifestError::Network(e.to_string()))
    }
}

impl ImageFetcher for HttpFetcher {
    fn fetch_image(&self, url: &str) -> Result<Vec<u8>> {
        tracing::debug!(url, "fetching page image");
        let response = self.agent.get(url).set("Accept", "image/*").call().map_err(request_error)?;

        let mut bytes = Vec::new();
        response
            .into_reader()
            .take(MAX_IMAGE_BYTES)
            .read_to_end(&mut bytes)
            .map_err(|e| ManifestError::Network(e.to_string()))?;
        Ok(bytes)
    }
}

fn request_error(error: ureq::Error) -> ManifestError {
    match error {
        ureq::Error::Status(status, _) => ManifestError::Status { status },
        ureq::Error::Transport(transport) => ManifestError::Network(transport.to_string()),
    }
}

/// Reads manifests from the local filesystem, relative to `root` when set
#[derive(Debug, Clone, Default)]
pub struct FileFetcher {
    root: Option<PathBuf>,
}

impl FileFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        Self { root: Some(root.into()) }
    }
}

impl ManifestFetcher for FileFetcher {
    fn fetch(&self, url: &str) -> Result<String> {
        let relative = url.strip_prefix("file://").unwrap_or(url);
        let path = match &self.root {
            Some(root) => root.join(relative),
            None => PathBuf::from(relative),
        };
        std::fs::read_to_string(&path)
            .map_err(|source| ManifestError::Read { path: path.display().to_string(), source })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolve_manifest;
    use std::io::{BufRead, BufReader, Write};
    use std::net::TcpListener;
    use std::thread;

    /// Answer `requests` connections with `status` and `body`, then stop
    fn serve(status: &'static str, body: &'static [u8], requests: usize) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").expect("listener should bind");
        let addr = listener.local_addr().expect("listener should have an address");

        thread::spawn(move || {
            for stream in listener.incoming().take(requests) {
                let mut stream = stream.expect("connection should be accepted");
                let mut reader = BufReader::new(stream.try_clone().expect("stream should clone"));
                let mut line = String::new();
                while reader.read_line(&mut line).map(|n| n > 0).unwrap_or(false) {
                    if line == "\r\n" {
                        break;
                    }
                    line.clear();
                }

                let head = format!(
                    "HTTP/1.1 {status}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
                    body.len()
                );
                stream.write_all(head.as_bytes()).expect("head should be written");
                stream.write_all(body).expect("body should be written");
            }
        });

        format!("http://{addr}")
    }

    #[test]
    fn http_error_status_is_reported() {
        let base = serve("404 Not Found", b"gone", 1);
        let fetcher = HttpFetcher::new(Duration::from_secs(5));

        let error = resolve_manifest(&fetcher, &format!("{base}/manifest.json")).unwrap_err();
        assert!(matches!(error, ManifestError::Status { status: 404 }));
    }

    #[test]
    fn http_manifest_is_resolved() {
        let base = serve(
            "200 OK",
            br#"{"sequences":[{"canvases":[{"images":[{"resource":{"service":{"@id":"https://d.example/p1"}}}]}]}]}"#,
            1,
        );
        let fetcher = HttpFetcher::new(Duration::from_secs(5));

        let urls = resolve_manifest(&fetcher, &format!("{base}/manifest.json"))
            .expect("manifest should resolve");
        assert_eq!(urls, vec!["https://d.example/p1/full/full/0/default.jpg"]);
    }

    #[test]
    fn http_image_bytes_are_returned() {
        let base = serve("200 OK", b"\x89PNG fake", 1);
        let fetcher = HttpFetcher::new(Duration::from_secs(5));

        let bytes = fetcher.fetch_image(&format!("{base}/p1.png")).expect("image should download");
        assert_eq!(bytes, b"\x89PNG fake");
    }

    #[test]
    fn remote_sources_are_http_only() {
        assert!(is_remote("https://a.example/m.json"));
        assert!(is_remote("http://127.0.0.1:8000/m.json"));
        assert!(!is_remote("file:///tmp/m.json"));
        assert!(!is_remote("manifests/m.json"));
    }

    #[test]
    fn file_fetcher_reads_relative_to_root() {
        let dir = tempfile::tempdir().expect("tempdir should be created");
        std::fs::write(
            dir.path().join("manifest.json"),
            r#"{"items":[{"items":[{"items":[{"body":{"id":"https://c.example/1.jpg"}}]}]}]}"#,
        )
        .expect("manifest should be written");

        let fetcher = FileFetcher::with_root(dir.path());
        let urls = resolve_manifest(&fetcher, "manifest.json").expect("manifest should resolve");
        assert_eq!(urls, vec!["https://c.example/1.jpg"]);
    }

    #[test]
    fn file_fetcher_reports_missing_file() {
        let dir = tempfile::tempdir().expect("tempdir should be created");
        let fetcher = FileFetcher::with_root(dir.path());
        let error = fetcher.fetch("missing.json").unwrap_err();
        assert!(matches!(error, ManifestError::Read { .. }));
    }
}
