//! End-to-end sessions against the gateway with a fake upstream.
//!
//! Each test feeds newline-delimited input to [`McpServer::serve`] and
//! inspects the lines written back.

use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};

use eraser_mcp::catalog::Catalog;
use eraser_mcp::config::Config;
use eraser_mcp::error::UpstreamError;
use eraser_mcp::mcp::forwarder::Upstream;
use eraser_mcp::mcp::server::McpServer;

/// How the fake upstream answers a tool call.
#[derive(Clone, Copy)]
enum Behaviour {
    /// Render result carrying an `imageUrl`.
    Render,
    /// Non-2xx status from the API.
    BadGateway,
    /// The call panics.
    Panic,
}

#[derive(Clone)]
struct FakeUpstream {
    behaviour: Behaviour,
    image: Option<Vec<u8>>,
    calls: Arc<AtomicUsize>,
    fetches: Arc<AtomicUsize>,
}

impl FakeUpstream {
    fn new(behaviour: Behaviour) -> Self {
        Self {
            behaviour,
            image: None,
            calls: Arc::new(AtomicUsize::new(0)),
            fetches: Arc::new(AtomicUsize::new(0)),
        }
    }

    fn serving_image(mut self, image: &[u8]) -> Self {
        self.image = Some(image.to_vec());
        self
    }
}

fn render_result(id: &Value) -> Value {
    json!({
        "jsonrpc": "2.0",
        "id": id,
        "result": {
            "content": [{
                "type": "text",
                "text": "{\"imageUrl\":\"https://img.example/d.png\",\"createEraserFileUrl\":\"https://app.example/new\"}"
            }]
        }
    })
}

#[async_trait]
impl Upstream for FakeUpstream {
    async fn call(&self, envelope: &Value, token: &str) -> Result<Value, UpstreamError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        assert_eq!(token, "secret");

        let delay = envelope["params"]["arguments"]["delayMs"]
            .as_u64()
            .unwrap_or(0);
        tokio::time::sleep(Duration::from_millis(delay)).await;

        match self.behaviour {
            Behaviour::Render => Ok(render_result(&envelope["id"])),
            Behaviour::BadGateway => Err(UpstreamError::Status {
                status: 502,
                body: "bad gateway".to_string(),
            }),
            Behaviour::Panic => panic!("upstream exploded"),
        }
    }

    async fn fetch(&self, _url: &str) -> Result<Vec<u8>, UpstreamError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        self.image
            .clone()
            .ok_or_else(|| UpstreamError::Request("connection refused".to_string()))
    }
}

fn config(token: Option<&str>, output_dir: &Path) -> Config {
    let mut config = Config::default();
    config.api_token = token.map(str::to_string);
    config.output_dir = output_dir.to_path_buf();
    config
}

fn server(token: Option<&str>, output_dir: &Path, upstream: FakeUpstream) -> McpServer<FakeUpstream> {
    McpServer::new(config(token, output_dir), Catalog::load().unwrap(), upstream)
}

/// Runs one session to EOF and returns the raw output lines.
async fn session(server: &McpServer<FakeUpstream>, input: impl AsRef<[u8]>) -> Vec<String> {
    let (writer, mut reader) = tokio::io::duplex(1 << 20);
    server
        .serve(input.as_ref(), writer, std::future::pending())
        .await
        .unwrap();

    let mut output = String::new();
    tokio::io::AsyncReadExt::read_to_string(&mut reader, &mut output)
        .await
        .unwrap();
    output.lines().map(str::to_string).collect()
}

fn parse(lines: &[String]) -> Vec<Value> {
    lines
        .iter()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect()
}

const RENDER_CALL: &str = r#"{"jsonrpc":"2.0","id":7,"method":"tools/call","params":{"name":"renderFlowchart","arguments":{"code":"title Checkout Flow\nCart > Pay"}}}"#;

#[tokio::test]
async fn initialize_handshake() {
    let dir = tempfile::tempdir().unwrap();
    let server = server(None, dir.path(), FakeUpstream::new(Behaviour::Render));

    let input = concat!(
        r#"{"jsonrpc":"2.0","id":1,"method":"initialize","params":{"protocolVersion":"2024-11-05","capabilities":{},"clientInfo":{"name":"t","version":"1"}}}"#,
        "\n",
        r#"{"jsonrpc":"2.0","method":"notifications/initialized"}"#,
        "\n"
    );
    let responses = parse(&session(&server, input).await);

    assert_eq!(responses.len(), 1);
    assert_eq!(responses[0]["id"], 1);
    assert_eq!(responses[0]["result"]["protocolVersion"], "2024-11-05");
    assert_eq!(responses[0]["result"]["capabilities"], json!({"tools": {}}));
    assert_eq!(responses[0]["result"]["serverInfo"]["name"], "eraser-mcp");
}

#[tokio::test]
async fn unknown_method_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let server = server(None, dir.path(), FakeUpstream::new(Behaviour::Render));

    let input = "{\"jsonrpc\":\"2.0\",\"id\":\"q\",\"method\":\"resources/list\"}\n";
    let responses = parse(&session(&server, input).await);

    assert_eq!(responses.len(), 1);
    assert_eq!(responses[0]["id"], "q");
    assert_eq!(responses[0]["error"]["code"], -32601);
}

#[tokio::test]
async fn malformed_lines_do_not_end_the_session() {
    let dir = tempfile::tempdir().unwrap();
    let server = server(None, dir.path(), FakeUpstream::new(Behaviour::Render));

    let input = "{not json\n\n   \n[1]\n{\"jsonrpc\":\"2.0\",\"id\":2,\"method\":\"tools/list\"}\n";
    let responses = parse(&session(&server, input).await);

    assert_eq!(responses.len(), 3);
    assert_eq!(responses[0]["id"], Value::Null);
    assert_eq!(responses[0]["error"]["code"], -32700);
    assert_eq!(responses[1]["id"], Value::Null);
    assert_eq!(responses[1]["error"]["code"], -32600);
    assert_eq!(responses[2]["id"], 2);
    assert!(responses[2]["result"]["tools"].is_array());
}

#[tokio::test]
async fn tools_list_without_token_is_restricted() {
    let dir = tempfile::tempdir().unwrap();
    let server = server(None, dir.path(), FakeUpstream::new(Behaviour::Render));

    let input = "{\"jsonrpc\":\"2.0\",\"id\":1,\"method\":\"tools/list\"}\n";
    let responses = parse(&session(&server, input).await);
    let tools = responses[0]["result"]["tools"].as_array().unwrap();

    let names: Vec<&str> = tools.iter().map(|t| t["name"].as_str().unwrap()).collect();
    assert_eq!(names.len(), 6);
    assert!(names.contains(&"renderElements"));
    assert!(!names.contains(&"createFile"));

    let flowchart = tools.iter().find(|t| t["name"] == "renderFlowchart").unwrap();
    assert!(flowchart["description"]
        .as_str()
        .unwrap()
        .ends_with("prefer the `renderElements` tool."));
}

#[tokio::test]
async fn tools_list_with_token_is_full() {
    let dir = tempfile::tempdir().unwrap();
    let server = server(Some("secret"), dir.path(), FakeUpstream::new(Behaviour::Render));

    let input = "{\"jsonrpc\":\"2.0\",\"id\":1,\"method\":\"tools/list\"}\n";
    let responses = parse(&session(&server, input).await);
    let tools = responses[0]["result"]["tools"].as_array().unwrap();

    assert_eq!(tools.len(), 17);
    assert_eq!(tools[0]["name"], "createFile");
    let flowchart = tools.iter().find(|t| t["name"] == "renderFlowchart").unwrap();
    assert!(!flowchart["description"].as_str().unwrap().contains("Note:"));
}

#[tokio::test]
async fn tool_call_without_token_never_reaches_upstream() {
    let dir = tempfile::tempdir().unwrap();
    let upstream = FakeUpstream::new(Behaviour::Render);
    let calls = Arc::clone(&upstream.calls);
    let server = server(None, dir.path(), upstream);

    let responses = parse(&session(&server, &format!("{RENDER_CALL}\n")).await);

    assert_eq!(responses.len(), 1);
    assert_eq!(responses[0]["id"], 7);
    assert_eq!(responses[0]["error"]["code"], -32000);
    assert_eq!(
        responses[0]["error"]["message"],
        "ERASER_API_TOKEN environment variable is required"
    );
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn tool_calls_are_forwarded_without_local_validation() {
    let dir = tempfile::tempdir().unwrap();
    let upstream = FakeUpstream::new(Behaviour::Render);
    let calls = Arc::clone(&upstream.calls);
    let server = server(Some("secret"), dir.path(), upstream);

    let input = concat!(
        r#"{"jsonrpc":"2.0","id":1,"method":"tools/call","params":{"name":"getFile","arguments":{"fileId":"f1","includeDiagrams":true}}}"#,
        "\n",
        r#"{"jsonrpc":"2.0","id":2,"method":"tools/call","params":{"name":"renderElements","arguments":{"elements":[{"type":"diagram","diagramType":"flowchart-diagram","code":"a > b","id":"e1"}]}}}"#,
        "\n",
        r#"{"jsonrpc":"2.0","id":3,"method":"tools/call","params":{"name":"renderFlowchart","arguments":{"theme":"dark"}}}"#,
        "\n",
        r#"{"jsonrpc":"2.0","id":4,"method":"tools/call","params":{"name":"drawPicture","arguments":{}}}"#,
        "\n"
    );
    let responses = parse(&session(&server, input).await);

    assert_eq!(responses.len(), 4);
    for response in &responses {
        assert!(response["error"].is_null(), "unexpected error: {response}");
        assert!(response["result"]["content"].is_array());
    }
    let mut ids: Vec<i64> = responses.iter().map(|r| r["id"].as_i64().unwrap()).collect();
    ids.sort_unstable();
    assert_eq!(ids, vec![1, 2, 3, 4]);
    assert_eq!(calls.load(Ordering::SeqCst), 4);
}

#[tokio::test]
async fn tool_call_notification_is_not_forwarded() {
    let dir = tempfile::tempdir().unwrap();
    let upstream = FakeUpstream::new(Behaviour::Render);
    let calls = Arc::clone(&upstream.calls);
    let server = server(Some("secret"), dir.path(), upstream);

    let input = concat!(
        r#"{"jsonrpc":"2.0","method":"tools/call","params":{"name":"renderFlowchart","arguments":{"code":"a > b"}}}"#,
        "\n",
        r#"{"jsonrpc":"2.0","id":null,"method":"tools/call","params":{"name":"renderFlowchart","arguments":{"code":"a > b"}}}"#,
        "\n",
        r#"{"jsonrpc":"2.0","method":"notifications/cancelled","params":{"requestId":1}}"#,
        "\n"
    );
    let lines = session(&server, input).await;

    assert!(lines.is_empty(), "unexpected output: {lines:?}");
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn non_utf8_line_is_a_parse_error_and_session_continues() {
    let dir = tempfile::tempdir().unwrap();
    let server = server(None, dir.path(), FakeUpstream::new(Behaviour::Render));

    let mut input = b"\xff\xfe\n".to_vec();
    input.extend_from_slice(b"{\"jsonrpc\":\"2.0\",\"id\":9,\"method\":\"tools/list\"}\n");
    let responses = parse(&session(&server, input).await);

    assert_eq!(responses.len(), 2);
    assert_eq!(responses[0]["id"], Value::Null);
    assert_eq!(responses[0]["error"]["code"], -32700);
    assert_eq!(responses[1]["id"], 9);
    assert!(responses[1]["result"]["tools"].is_array());
}

#[tokio::test]
async fn failed_artifact_fetch_relays_upstream_response_unchanged() {
    let dir = tempfile::tempdir().unwrap();
    let upstream = FakeUpstream::new(Behaviour::Render);
    let fetches = Arc::clone(&upstream.fetches);
    let server = server(Some("secret"), dir.path(), upstream);

    let lines = session(&server, &format!("{RENDER_CALL}\n")).await;

    assert_eq!(lines.len(), 1);
    assert_eq!(
        lines[0],
        serde_json::to_string(&render_result(&json!(7))).unwrap()
    );
    assert_eq!(fetches.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn rendered_image_is_cached_and_annotated() {
    let dir = tempfile::tempdir().unwrap();
    let upstream = FakeUpstream::new(Behaviour::Render).serving_image(b"\x89PNG");
    let server = server(Some("secret"), dir.path(), upstream);

    let responses = parse(&session(&server, &format!("{RENDER_CALL}\n")).await);

    let text = responses[0]["result"]["content"][0]["text"].as_str().unwrap();
    let render: Value = serde_json::from_str(text).unwrap();
    let local_path = Path::new(render["localPath"].as_str().unwrap());

    assert_eq!(render["imageUrl"], "https://img.example/d.png");
    assert_eq!(render["createEraserFileUrl"], "https://app.example/new");
    assert!(local_path.starts_with(dir.path()));
    let name = local_path.file_name().unwrap().to_string_lossy().into_owned();
    assert!(name.starts_with("checkout-flow-"));
    assert!(name.ends_with(".png"));
    assert_eq!(std::fs::read(local_path).unwrap(), b"\x89PNG");
}

#[tokio::test]
async fn upstream_failure_becomes_server_error() {
    let dir = tempfile::tempdir().unwrap();
    let server = server(Some("secret"), dir.path(), FakeUpstream::new(Behaviour::BadGateway));

    let responses = parse(&session(&server, &format!("{RENDER_CALL}\n")).await);

    assert_eq!(responses.len(), 1);
    assert_eq!(responses[0]["id"], 7);
    assert_eq!(responses[0]["error"]["code"], -32000);
    assert_eq!(responses[0]["error"]["message"], "HTTP 502: bad gateway");
}

#[tokio::test]
async fn panicking_call_reports_null_id_error() {
    let dir = tempfile::tempdir().unwrap();
    let server = server(Some("secret"), dir.path(), FakeUpstream::new(Behaviour::Panic));

    let input = format!("{RENDER_CALL}\n{{\"jsonrpc\":\"2.0\",\"id\":8,\"method\":\"tools/list\"}}\n");
    let responses = parse(&session(&server, &input).await);

    assert_eq!(responses.len(), 2);
    let failure = responses.iter().find(|r| r["error"].is_object()).unwrap();
    assert_eq!(failure["id"], Value::Null);
    assert_eq!(failure["error"]["code"], -32000);
    assert_eq!(failure["error"]["message"], "Unhandled error: upstream exploded");
    assert!(responses.iter().any(|r| r["id"] == 8));
}

#[tokio::test]
async fn concurrent_calls_answer_in_completion_order() {
    let dir = tempfile::tempdir().unwrap();
    let upstream = FakeUpstream::new(Behaviour::Render);
    let calls = Arc::clone(&upstream.calls);
    let server = server(Some("secret"), dir.path(), upstream);

    let input = concat!(
        r#"{"jsonrpc":"2.0","id":"slow","method":"tools/call","params":{"name":"renderElements","arguments":{"elements":[{"type":"diagram","diagramType":"flowchart-diagram","code":"a > b"}],"delayMs":200}}}"#,
        "\n",
        r#"{"jsonrpc":"2.0","id":"fast","method":"tools/call","params":{"name":"renderSequenceDiagram","arguments":{"code":"a > b: hi"}}}"#,
        "\n"
    );
    let responses = parse(&session(&server, input).await);

    let ids: Vec<&str> = responses.iter().map(|r| r["id"].as_str().unwrap()).collect();
    assert_eq!(ids, vec!["fast", "slow"]);
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn shutdown_signal_stops_the_loop() {
    let dir = tempfile::tempdir().unwrap();
    let server = server(None, dir.path(), FakeUpstream::new(Behaviour::Render));

    // Input that never reaches EOF.
    let (_client, input) = tokio::io::duplex(64);
    let (writer, _reader) = tokio::io::duplex(1024);

    tokio::time::timeout(
        Duration::from_secs(5),
        server.serve(input, writer, std::future::ready(())),
    )
    .await
    .unwrap()
    .unwrap();
}
