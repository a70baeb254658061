//! Loopback HTTP server for adapter tests.
//!
//! Each canned response is served on its own connection, which is then
//! closed, so requests are recorded one per accept in the order the adapter
//! issued them.

use serde_json::Value;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;
use url::Url;

/// Request as received by the loopback server.
pub(crate) struct RecordedRequest {
    head: String,
    body: Vec<u8>,
}

impl RecordedRequest {
    /// `METHOD /path?query HTTP/1.1`.
    pub(crate) fn request_line(&self) -> &str {
        self.head.lines().next().unwrap_or_default()
    }

    /// Header value, matched case-insensitively by name.
    pub(crate) fn header(&self, name: &str) -> Option<&str> {
        header_value(&self.head, name)
    }

    /// Body decoded as JSON.
    pub(crate) fn json(&self) -> Value {
        serde_json::from_slice(&self.body).expect("request body is JSON")
    }

    /// Body as lossy UTF-8.
    pub(crate) fn body_text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

/// Response written back for one request.
pub(crate) struct CannedResponse {
    status_line: &'static str,
    body: String,
}

impl CannedResponse {
    pub(crate) fn json(status_line: &'static str, body: &Value) -> Self {
        Self {
            status_line,
            body: body.to_string(),
        }
    }

    pub(crate) fn empty(status_line: &'static str) -> Self {
        Self {
            status_line,
            body: String::new(),
        }
    }

    fn render(&self) -> String {
        format!(
            "HTTP/1.1 {}\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{}",
            self.status_line,
            self.body.len(),
            self.body
        )
    }
}

/// Serve `responses` in order and return the base URL plus a handle yielding
/// the recorded requests once every response has been written.
pub(crate) async fn serve(
    responses: Vec<CannedResponse>,
) -> (Url, JoinHandle<Vec<RecordedRequest>>) {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind loopback listener");
    let port = listener.local_addr().expect("listener address").port();
    let server = tokio::spawn(async move {
        let mut recorded = Vec::with_capacity(responses.len());
        for response in responses {
            let (mut socket, _) = listener.accept().await.expect("accept connection");
            recorded.push(read_request(&mut socket).await);
            socket
                .write_all(response.render().as_bytes())
                .await
                .expect("write response");
            socket.shutdown().await.ok();
        }
        recorded
    });
    let base = Url::parse(&format!("http://127.0.0.1:{port}/")).expect("loopback url");
    (base, server)
}

async fn read_request(socket: &mut TcpStream) -> RecordedRequest {
    let mut raw = Vec::new();
    let mut chunk = [0_u8; 4096];
    let head_end = loop {
        if let Some(index) = raw.windows(4).position(|window| window == b"\r\n\r\n") {
            break index;
        }
        let read = socket.read(&mut chunk).await.expect("read request head");
        if read == 0 {
            break raw.len();
        }
        raw.extend_from_slice(chunk.get(..read).unwrap_or_default());
    };

    let head = String::from_utf8_lossy(raw.get(..head_end).unwrap_or_default()).into_owned();
    let mut body = raw.get(head_end + 4..).map(<[u8]>::to_vec).unwrap_or_default();
    let expected = header_value(&head, "content-length")
        .and_then(|value| value.parse::<usize>().ok())
        .unwrap_or_default();
    while body.len() < expected {
        let read = socket.read(&mut chunk).await.expect("read request body");
        if read == 0 {
            break;
        }
        body.extend_from_slice(chunk.get(..read).unwrap_or_default());
    }
    RecordedRequest { head, body }
}

fn header_value<'a>(head: &'a str, name: &str) -> Option<&'a str> {
    head.lines().skip(1).find_map(|line| {
        let (key, value) = line.split_once(':')?;
        key.trim().eq_ignore_ascii_case(name).then(|| value.trim())
    })
}
