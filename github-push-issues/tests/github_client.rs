use github_push_issues::auth::Credentials;
use github_push_issues::github::GitHubTracker;
use github_push_issues_core::contract::Tracker;
use github_push_issues_core::entry::Collection;
use github_push_issues_core::PushError;
use serde_json::{json, Value};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

/// A request as seen by the one-shot server.
struct Captured {
    request_line: String,
    headers: Vec<(String, String)>,
    body: Vec<u8>,
}

impl Captured {
    fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

fn http_response(status: &str, content_type: Option<&str>, body: &[u8]) -> Vec<u8> {
    let mut head = format!("HTTP/1.1 {status}\r\n");
    if let Some(content_type) = content_type {
        head.push_str(&format!("Content-Type: {content_type}\r\n"));
    }
    head.push_str(&format!(
        "Content-Length: {}\r\nConnection: close\r\n\r\n",
        body.len()
    ));
    let mut bytes = head.into_bytes();
    bytes.extend_from_slice(body);
    bytes
}

fn find_head_end(bytes: &[u8]) -> Option<usize> {
    bytes.windows(4).position(|w| w == b"\r\n\r\n")
}

/// Accept one connection, capture the request, answer with `response`.
async fn serve_once(response: Vec<u8>) -> (String, JoinHandle<Captured>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let handle = tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        let mut request = Vec::new();
        let mut buf = [0u8; 4096];
        let head_end = loop {
            let n = socket.read(&mut buf).await.unwrap();
            assert!(n > 0, "client closed before sending a full request");
            request.extend_from_slice(&buf[..n]);
            if let Some(head_end) = find_head_end(&request) {
                let head = String::from_utf8_lossy(&request[..head_end]).to_ascii_lowercase();
                let length = head
                    .lines()
                    .find_map(|l| l.strip_prefix("content-length:"))
                    .and_then(|v| v.trim().parse::<usize>().ok())
                    .unwrap_or(0);
                while request.len() < head_end + 4 + length {
                    let n = socket.read(&mut buf).await.unwrap();
                    assert!(n > 0, "client closed before sending the body");
                    request.extend_from_slice(&buf[..n]);
                }
                break head_end;
            }
        };
        socket.write_all(&response).await.unwrap();
        socket.shutdown().await.ok();

        let head = String::from_utf8(request[..head_end].to_vec()).unwrap();
        let mut lines = head.split("\r\n");
        let request_line = lines.next().unwrap().to_string();
        let headers = lines
            .filter_map(|l| l.split_once(':'))
            .map(|(n, v)| (n.trim().to_string(), v.trim().to_string()))
            .collect();
        Captured {
            request_line,
            headers,
            body: request[head_end + 4..].to_vec(),
        }
    });
    (format!("http://{addr}"), handle)
}

fn tracker(root_url: &str) -> GitHubTracker {
    GitHubTracker::new(root_url, "wking/test", &Credentials::new("wking", "secret"))
        .expect("client should build")
}

#[tokio::test]
async fn test_create_issue_posts_json_with_basic_auth() {
    let (root_url, server) = serve_once(http_response(
        "201 Created",
        Some("application/json; charset=utf-8"),
        br#"{"number": 42, "title": "X"}"#,
    ))
    .await;

    let response = tracker(&root_url)
        .create(
            Collection::Issues,
            json!({"title": "X", "body": "after #10", "milestone": 1}),
        )
        .await
        .expect("create should succeed");
    assert_eq!(response["number"], 42);

    let captured = server.await.unwrap();
    assert_eq!(captured.request_line, "POST /repos/wking/test/issues HTTP/1.1");
    assert_eq!(captured.header("authorization"), Some("Basic d2tpbmc6c2VjcmV0"));
    assert_eq!(captured.header("content-type"), Some("application/json"));
    assert!(captured
        .header("user-agent")
        .is_some_and(|ua| ua.starts_with("github-push-issues/")));
    let body: Value = serde_json::from_slice(&captured.body).unwrap();
    assert_eq!(body, json!({"title": "X", "body": "after #10", "milestone": 1}));
}

#[tokio::test]
async fn test_create_milestone_targets_milestones_collection() {
    let (root_url, server) = serve_once(http_response(
        "201 Created",
        Some("application/json"),
        br#"{"number": 1}"#,
    ))
    .await;

    tracker(&format!("{root_url}/"))
        .create(Collection::Milestones, json!({"title": "M1", "state": "open"}))
        .await
        .unwrap();

    let captured = server.await.unwrap();
    assert_eq!(
        captured.request_line,
        "POST /repos/wking/test/milestones HTTP/1.1"
    );
}

#[tokio::test]
async fn test_response_charset_is_honoured() {
    // "café" in ISO-8859-1.
    let body = b"{\"number\": 5, \"title\": \"caf\xe9\"}";
    let (root_url, server) = serve_once(http_response(
        "201 Created",
        Some("application/json; charset=iso-8859-1"),
        body,
    ))
    .await;

    let response = tracker(&root_url)
        .create(Collection::Issues, json!({"title": "café"}))
        .await
        .unwrap();
    assert_eq!(response["title"], "café");
    server.await.unwrap();
}

#[tokio::test]
async fn test_non_json_response_is_a_protocol_error() {
    let (root_url, server) = serve_once(http_response(
        "201 Created",
        Some("text/html"),
        b"<html>login</html>",
    ))
    .await;

    let err = tracker(&root_url)
        .create(Collection::Issues, json!({"title": "X"}))
        .await
        .unwrap_err();
    assert!(matches!(err, PushError::Protocol(_)), "{err:?}");
    server.await.unwrap();
}

#[tokio::test]
async fn test_error_status_is_a_transport_error() {
    let (root_url, server) = serve_once(http_response(
        "401 Unauthorized",
        Some("application/json"),
        br#"{"message": "Bad credentials"}"#,
    ))
    .await;

    let err = tracker(&root_url)
        .create(Collection::Issues, json!({"title": "X"}))
        .await
        .unwrap_err();
    match err {
        PushError::Transport(message) => assert!(message.contains("Bad credentials")),
        other => panic!("expected transport error, got {other:?}"),
    }
    server.await.unwrap();
}

#[tokio::test]
async fn test_unreachable_tracker_is_a_transport_error() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let err = tracker(&format!("http://{addr}"))
        .create(Collection::Issues, json!({"title": "X"}))
        .await
        .unwrap_err();
    assert!(matches!(err, PushError::Transport(_)));
}
