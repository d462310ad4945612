//! Minimal HTTP/1.1 server for exercising the client against canned answers.

use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::Mutex;

#[derive(Debug, Clone)]
pub(crate) struct RecordedRequest {
    pub method: String,
    pub path: String,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl RecordedRequest {
    pub fn json(&self) -> serde_json::Value {
        serde_json::from_slice(&self.body).expect("request body should be JSON")
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}

#[derive(Debug, Clone)]
pub(crate) struct CannedResponse {
    status: u16,
    content_type: &'static str,
    chunks: Vec<Vec<u8>>,
    /// Close-delimited body written chunk by chunk instead of one sized body.
    streamed: bool,
}

impl CannedResponse {
    pub fn json(status: u16, body: serde_json::Value) -> Self {
        Self {
            status,
            content_type: "application/json",
            chunks: vec![body.to_string().into_bytes()],
            streamed: false,
        }
    }

    pub fn empty(status: u16) -> Self {
        Self {
            status,
            content_type: "text/event-stream",
            chunks: Vec::new(),
            streamed: false,
        }
    }

    pub fn event_stream<I, C>(chunks: I) -> Self
    where
        I: IntoIterator<Item = C>,
        C: Into<Vec<u8>>,
    {
        Self {
            status: 200,
            content_type: "text/event-stream",
            chunks: chunks.into_iter().map(Into::into).collect(),
            streamed: true,
        }
    }
}

pub(crate) type Recorded = Arc<Mutex<Vec<RecordedRequest>>>;

/// Serve `routes` (keyed by `"METHOD /path"`) until the test ends.
///
/// Returns the base URL (including the `/api` prefix) and the log of
/// requests received so far.
pub(crate) async fn spawn(routes: Vec<(&'static str, CannedResponse)>) -> (String, Recorded) {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("listener should bind");
    let addr = listener.local_addr().expect("local addr should resolve");
    let recorded: Recorded = Arc::new(Mutex::new(Vec::new()));
    let recorded_for_server = Arc::clone(&recorded);
    let routes = Arc::new(routes);

    tokio::spawn(async move {
        loop {
            let Ok((stream, _)) = listener.accept().await else {
                return;
            };
            let routes = Arc::clone(&routes);
            let recorded = Arc::clone(&recorded_for_server);
            tokio::spawn(async move {
                let _ = serve_one(stream, &routes, &recorded).await;
            });
        }
    });

    (format!("http://{addr}/api"), recorded)
}

async fn serve_one(
    mut stream: TcpStream,
    routes: &[(&'static str, CannedResponse)],
    recorded: &Recorded,
) -> std::io::Result<()> {
    let request = read_request(&mut stream).await?;
    let key = format!("{} {}", request.method, request.path);
    recorded.lock().await.push(request);

    let response = routes
        .iter()
        .find(|(route, _)| *route == key)
        .map(|(_, response)| response.clone())
        .unwrap_or_else(|| CannedResponse::json(404, serde_json::json!({"error": "no route"})));

    let reason = match response.status {
        200 => "OK",
        404 => "Not Found",
        500 => "Internal Server Error",
        _ => "Status",
    };
    let mut head = format!(
        "HTTP/1.1 {} {}\r\nContent-Type: {}\r\nConnection: close\r\n",
        response.status, reason, response.content_type
    );

    if response.streamed {
        head.push_str("\r\n");
        stream.write_all(head.as_bytes()).await?;
        stream.flush().await?;
        for chunk in &response.chunks {
            stream.write_all(chunk).await?;
            stream.flush().await?;
            tokio::time::sleep(Duration::from_millis(15)).await;
        }
    } else {
        let body = response.chunks.concat();
        head.push_str(&format!("Content-Length: {}\r\n\r\n", body.len()));
        stream.write_all(head.as_bytes()).await?;
        stream.write_all(&body).await?;
        stream.flush().await?;
    }

    stream.shutdown().await
}

async fn read_request(stream: &mut TcpStream) -> std::io::Result<RecordedRequest> {
    let mut buffer = Vec::new();
    let mut chunk = [0u8; 1024];
    let header_end = loop {
        if let Some(pos) = buffer.windows(4).position(|window| window == b"\r\n\r\n") {
            break pos;
        }
        let read = stream.read(&mut chunk).await?;
        if read == 0 {
            return Err(std::io::ErrorKind::UnexpectedEof.into());
        }
        buffer.extend_from_slice(&chunk[..read]);
    };

    let head = String::from_utf8_lossy(&buffer[..header_end]).to_string();
    let mut lines = head.split("\r\n");
    let request_line = lines.next().unwrap_or_default();
    let mut parts = request_line.split_whitespace();
    let method = parts.next().unwrap_or_default().to_string();
    let path = parts.next().unwrap_or_default().to_string();

    let headers: Vec<(String, String)> = lines
        .filter_map(|line| line.split_once(':'))
        .map(|(name, value)| (name.trim().to_string(), value.trim().to_string()))
        .collect();

    let content_length = headers
        .iter()
        .find(|(name, _)| name.eq_ignore_ascii_case("content-length"))
        .and_then(|(_, value)| value.parse::<usize>().ok())
        .unwrap_or(0);

    let mut body = buffer[header_end + 4..].to_vec();
    while body.len() < content_length {
        let read = stream.read(&mut chunk).await?;
        if read == 0 {
            break;
        }
        body.extend_from_slice(&chunk[..read]);
    }
    body.truncate(content_length);

    Ok(RecordedRequest {
        method,
        path,
        headers,
        body,
    })
}
