//! Best-effort local cache of rendered diagrams.
//!
//! After a successful render the upstream result text may carry an
//! `imageUrl`. The image is downloaded into the output directory and the
//! result gains a `localPath` field. Every failure leaves the response
//! untouched; failures are logged at debug level and never reach the client.

use std::path::PathBuf;
use std::sync::LazyLock;

use chrono::Utc;
use regex::Regex;
use serde_json::{Map, Value};
use thiserror::Error;

use crate::error::UpstreamError;
use crate::mcp::forwarder::Upstream;

static NON_ALPHANUMERIC: LazyLock<Regex> =
    LazyLock::new(|| Regex::new("[^a-z0-9]+").expect("literal pattern is valid"));

const TITLE_MARKER: &str = "title ";

/// Reasons a cache attempt was abandoned.
#[derive(Error, Debug)]
enum ArtifactError {
    #[error("failed to download artifact: {0}")]
    Fetch(#[from] UpstreamError),

    #[error("failed to write {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Derives a file-name stem from the diagram's `title` line.
///
/// Returns `None` if there is no title line or it normalises to nothing.
#[must_use]
pub fn title_stem(code: &str) -> Option<String> {
    let title = code.lines().map(str::trim).find_map(|line| {
        let head = line.get(..TITLE_MARKER.len())?;
        head.eq_ignore_ascii_case(TITLE_MARKER)
            .then(|| &line[TITLE_MARKER.len()..])
    })?;

    let lowered = title.trim().to_lowercase();
    let stem = NON_ALPHANUMERIC.replace_all(&lowered, "-");
    let stem = stem.trim_matches('-');

    (!stem.is_empty()).then(|| stem.to_string())
}

/// Builds the cache file name for one artifact.
#[must_use]
pub fn file_name(stem: Option<&str>, timestamp_millis: i64, extension: &str) -> String {
    format!(
        "{}-{timestamp_millis}.{extension}",
        stem.unwrap_or("diagram")
    )
}

/// Returns the text of the first content item if it is a text item.
fn first_text(response: &Value) -> Option<&str> {
    let item = response.get("result")?.get("content")?.get(0)?;
    if item.get("type")?.as_str()? != "text" {
        return None;
    }
    item.get("text")?.as_str()
}

/// Mutable access to the text of the first content item.
fn first_text_mut(response: &mut Value) -> Option<&mut Value> {
    response
        .get_mut("result")?
        .get_mut("content")?
        .get_mut(0)?
        .get_mut("text")
}

/// Downloads rendered images into a fixed directory.
#[derive(Debug, Clone)]
pub struct ArtifactCache {
    output_dir: PathBuf,
}

impl ArtifactCache {
    /// Creates a cache writing into `output_dir`.
    #[must_use]
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
        }
    }

    /// Caches the image referenced by `response`, if any.
    ///
    /// `arguments` are the tool-call arguments; `code` names the file and
    /// `format` picks the extension. Returns the response, annotated with
    /// `localPath` on success and unchanged otherwise.
    pub async fn annotate<U: Upstream + ?Sized>(
        &self,
        upstream: &U,
        mut response: Value,
        arguments: Option<&Value>,
    ) -> Value {
        let Some(mut render) = first_text(&response)
            .and_then(|text| serde_json::from_str::<Map<String, Value>>(text).ok())
        else {
            return response;
        };
        let Some(image_url) = render.get("imageUrl").and_then(Value::as_str) else {
            return response;
        };

        let code = arguments.and_then(|a| a.get("code")).and_then(Value::as_str);
        let extension = match arguments.and_then(|a| a.get("format")).and_then(Value::as_str) {
            Some("jpeg") => "jpeg",
            _ => "png",
        };

        let local_path = match self.save(upstream, image_url, code, extension).await {
            Ok(path) => path,
            Err(e) => {
                tracing::debug!(error = %e, "Skipping local artifact copy");
                return response;
            }
        };

        tracing::info!(path = %local_path.display(), "Cached rendered diagram");
        render.insert(
            "localPath".to_string(),
            Value::from(local_path.to_string_lossy().into_owned()),
        );

        let Ok(text) = serde_json::to_string(&render) else {
            return response;
        };
        if let Some(slot) = first_text_mut(&mut response) {
            *slot = Value::from(text);
        }
        response
    }

    async fn save<U: Upstream + ?Sized>(
        &self,
        upstream: &U,
        image_url: &str,
        code: Option<&str>,
        extension: &str,
    ) -> Result<PathBuf, ArtifactError> {
        tokio::fs::create_dir_all(&self.output_dir)
            .await
            .map_err(|source| ArtifactError::Io {
                path: self.output_dir.clone(),
                source,
            })?;

        let stem = code.and_then(title_stem);
        let name = file_name(stem.as_deref(), Utc::now().timestamp_millis(), extension);
        let path = self.output_dir.join(name);

        let bytes = upstream.fetch(image_url).await?;

        tokio::fs::write(&path, bytes)
            .await
            .map_err(|source| ArtifactError::Io {
                path: path.clone(),
                source,
            })?;

        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use serde_json::json;

    use super::*;

    struct FakeImageHost {
        image: Option<Vec<u8>>,
        fetches: AtomicUsize,
    }

    impl FakeImageHost {
        fn serving(image: &[u8]) -> Self {
            Self {
                image: Some(image.to_vec()),
                fetches: AtomicUsize::new(0),
            }
        }

        fn failing() -> Self {
            Self {
                image: None,
                fetches: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl Upstream for FakeImageHost {
        async fn call(&self, _envelope: &Value, _token: &str) -> Result<Value, UpstreamError> {
            unreachable!("artifact cache never calls tools")
        }

        async fn fetch(&self, _url: &str) -> Result<Vec<u8>, UpstreamError> {
            self.fetches.fetch_add(1, Ordering::SeqCst);
            self.image
                .clone()
                .ok_or_else(|| UpstreamError::Request("connection refused".to_string()))
        }
    }

    fn render_response(text: &str) -> Value {
        json!({
            "jsonrpc": "2.0",
            "id": 1,
            "result": {"content": [{"type": "text", "text": text}]}
        })
    }

    #[test]
    fn title_stem_normalises() {
        assert_eq!(
            title_stem("title My Cool Diagram!!\nA > B").as_deref(),
            Some("my-cool-diagram")
        );
        assert_eq!(
            title_stem("  TITLE   --Hello, World--  \n").as_deref(),
            Some("hello-world")
        );
        assert_eq!(
            title_stem("direction right\nTitle Ünïcode Flow 2").as_deref(),
            Some("n-code-flow-2")
        );
    }

    #[test]
    fn title_stem_absent() {
        assert_eq!(title_stem("A > B\nB > C"), None);
        assert_eq!(title_stem("titles are not titles"), None);
        assert_eq!(title_stem("title !!!"), None);
        assert_eq!(title_stem(""), None);
    }

    #[test]
    fn title_stem_uses_first_title_line() {
        assert_eq!(
            title_stem("title First\ntitle Second").as_deref(),
            Some("first")
        );
    }

    #[test]
    fn file_name_falls_back_to_diagram() {
        assert_eq!(file_name(Some("flow"), 42, "png"), "flow-42.png");
        assert_eq!(file_name(None, 42, "jpeg"), "diagram-42.jpeg");
    }

    #[tokio::test]
    async fn annotates_with_local_path() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("nested").join("out");
        let cache = ArtifactCache::new(&output);
        let host = FakeImageHost::serving(b"\x89PNG");

        let response = render_response(r#"{"imageUrl":"https://host/a.png","id":"r1"}"#);
        let args = json!({"code": "title Login Flow\nA > B"});
        let annotated = cache.annotate(&host, response, Some(&args)).await;

        let text = first_text(&annotated).unwrap();
        let render: Value = serde_json::from_str(text).unwrap();
        let local_path = PathBuf::from(render["localPath"].as_str().unwrap());
        assert_eq!(render["imageUrl"], "https://host/a.png");
        assert_eq!(render["id"], "r1");
        assert!(local_path.starts_with(&output));
        let name = local_path.file_name().unwrap().to_string_lossy().into_owned();
        assert!(name.starts_with("login-flow-"));
        assert!(name.ends_with(".png"));
        assert_eq!(std::fs::read(&local_path).unwrap(), b"\x89PNG");
    }

    #[tokio::test]
    async fn jpeg_format_picks_extension() {
        let dir = tempfile::tempdir().unwrap();
        let cache = ArtifactCache::new(dir.path());
        let host = FakeImageHost::serving(b"jpg");

        let response = render_response(r#"{"imageUrl":"https://host/a.jpeg"}"#);
        let args = json!({"code": "A > B", "format": "jpeg"});
        let annotated = cache.annotate(&host, response, Some(&args)).await;

        let render: Value = serde_json::from_str(first_text(&annotated).unwrap()).unwrap();
        let path = render["localPath"].as_str().unwrap();
        assert!(path.contains("diagram-"));
        assert!(path.ends_with(".jpeg"));
    }

    #[tokio::test]
    async fn fetch_failure_leaves_response_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let cache = ArtifactCache::new(dir.path());
        let host = FakeImageHost::failing();

        let response = render_response(r#"{"imageUrl":"https://host/a.png"}"#);
        let annotated = cache.annotate(&host, response.clone(), None).await;

        assert_eq!(annotated, response);
        assert_eq!(host.fetches.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn unwritable_directory_leaves_response_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("file");
        std::fs::write(&blocker, b"x").unwrap();
        let cache = ArtifactCache::new(blocker.join("sub"));
        let host = FakeImageHost::serving(b"img");

        let response = render_response(r#"{"imageUrl":"https://host/a.png"}"#);
        let annotated = cache.annotate(&host, response.clone(), None).await;

        assert_eq!(annotated, response);
        assert_eq!(host.fetches.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn responses_without_image_are_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let cache = ArtifactCache::new(dir.path());
        let host = FakeImageHost::serving(b"img");

        let cases = [
            render_response("not json at all"),
            render_response(r#"{"fileUrl":"https://host/f"}"#),
            render_response(r#"{"imageUrl": 42}"#),
            render_response(r#"["imageUrl"]"#),
            json!({"jsonrpc": "2.0", "id": 1, "result": {"content": [{"type": "image", "text": "{\"imageUrl\":\"u\"}"}]}}),
            json!({"jsonrpc": "2.0", "id": 1, "result": {"content": []}}),
            json!({"jsonrpc": "2.0", "id": 1, "error": {"code": -1, "message": "boom"}}),
        ];

        for response in cases {
            let annotated = cache.annotate(&host, response.clone(), None).await;
            assert_eq!(annotated, response);
        }
        assert_eq!(host.fetches.load(Ordering::SeqCst), 0);
    }
}
