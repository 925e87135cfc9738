#![allow(dead_code)]

use flate2::write::GzEncoder;
use flate2::Compression;
use highrate_fetch::config::Settings;
use highrate_fetch::error::Result;
use highrate_fetch::tools::{ExternalTool, ToolOutput};
use std::collections::HashMap;
use std::ffi::OsString;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

#[derive(Debug, Clone)]
pub struct Route {
    pub status: u16,
    pub content_type: String,
    pub body: Vec<u8>,
    pub location: Option<String>,
    pub delay: Option<Duration>,
}

impl Route {
    pub fn bytes(content_type: &str, body: &[u8]) -> Self {
        Self {
            status: 200,
            content_type: content_type.to_string(),
            body: body.to_vec(),
            location: None,
            delay: None,
        }
    }

    pub fn gzip(data: &[u8]) -> Self {
        Self::bytes("application/x-gzip", &gzip(data))
    }

    pub fn html() -> Self {
        Self::bytes(
            "text/html; charset=utf-8",
            b"<html><body>Earthdata Login</body></html>",
        )
    }

    pub fn redirect(location: &str) -> Self {
        Self {
            status: 302,
            content_type: "text/plain".to_string(),
            body: Vec::new(),
            location: Some(location.to_string()),
            delay: None,
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }
}

#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub host: String,
    pub path: String,
    pub authorization: Option<String>,
}

/// Minimal HTTP/1.1 responder: one response per connection, then close.
pub struct TestServer {
    pub port: u16,
    routes: Arc<Mutex<HashMap<String, Route>>>,
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
}

impl TestServer {
    pub async fn start() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let routes: Arc<Mutex<HashMap<String, Route>>> = Arc::default();
        let requests: Arc<Mutex<Vec<RecordedRequest>>> = Arc::default();

        let (task_routes, task_requests) = (routes.clone(), requests.clone());
        tokio::spawn(async move {
            while let Ok((stream, _)) = listener.accept().await {
                let routes = task_routes.clone();
                let requests = task_requests.clone();
                tokio::spawn(async move {
                    let _ = respond(stream, routes, requests).await;
                });
            }
        });

        Self {
            port,
            routes,
            requests,
        }
    }

    pub fn base_url(&self) -> String {
        format!("http://127.0.0.1:{}", self.port)
    }

    pub fn route(&self, path: &str, route: Route) {
        self.routes.lock().unwrap().insert(path.to_string(), route);
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().unwrap().clone()
    }
}

async fn respond(
    mut stream: TcpStream,
    routes: Arc<Mutex<HashMap<String, Route>>>,
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
) -> std::io::Result<()> {
    let mut buffer = Vec::new();
    let mut chunk = [0u8; 4096];
    while !buffer.windows(4).any(|w| w == b"\r\n\r\n") {
        let n = stream.read(&mut chunk).await?;
        if n == 0 {
            break;
        }
        buffer.extend_from_slice(&chunk[..n]);
    }

    let head = String::from_utf8_lossy(&buffer).into_owned();
    let mut lines = head.lines();
    let target = lines
        .next()
        .and_then(|l| l.split_whitespace().nth(1))
        .unwrap_or("/")
        .to_string();
    let path = target.split('?').next().unwrap_or("/").to_string();

    let mut host = String::new();
    let mut authorization = None;
    for line in lines {
        if let Some((name, value)) = line.split_once(':') {
            match name.trim().to_ascii_lowercase().as_str() {
                "host" => host = value.trim().to_string(),
                "authorization" => authorization = Some(value.trim().to_string()),
                _ => {}
            }
        }
    }

    requests.lock().unwrap().push(RecordedRequest {
        host,
        path: path.clone(),
        authorization,
    });

    let route = routes.lock().unwrap().get(&path).cloned();
    let route = route.unwrap_or(Route {
        status: 404,
        content_type: "text/plain".to_string(),
        body: b"not found".to_vec(),
        location: None,
        delay: None,
    });

    if let Some(delay) = route.delay {
        tokio::time::sleep(delay).await;
    }

    let mut response = format!(
        "HTTP/1.1 {} {}\r\nContent-Type: {}\r\nContent-Length: {}\r\nConnection: close\r\n",
        route.status,
        reason(route.status),
        route.content_type,
        route.body.len()
    );
    if let Some(location) = &route.location {
        response.push_str(&format!("Location: {}\r\n", location));
    }
    response.push_str("\r\n");

    stream.write_all(response.as_bytes()).await?;
    stream.write_all(&route.body).await?;
    stream.shutdown().await
}

fn reason(status: u16) -> &'static str {
    match status {
        200 => "OK",
        302 => "Found",
        401 => "Unauthorized",
        403 => "Forbidden",
        404 => "Not Found",
        _ => "Status",
    }
}

pub fn gzip(data: &[u8]) -> Vec<u8> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(data).unwrap();
    encoder.finish().unwrap()
}

pub fn settings_for(server: &TestServer) -> Settings {
    Settings {
        archive_base_url: server.base_url(),
        cors_base_url: server.base_url(),
        auth_host: "127.0.0.1".to_string(),
        timeout_secs: 5,
        max_workers: 4,
        ..Settings::default()
    }
}

/// Writes `{stem}.rnx` for `.crx` input and `{stem}.{yy}o` for `.{yy}d`.
#[derive(Debug, Default)]
pub struct FakeConverter {
    pub fail_on: Option<String>,
}

impl ExternalTool for FakeConverter {
    fn name(&self) -> &str {
        "CRX2RNX"
    }

    fn run(&self, args: &[OsString], _working_dir: Option<&Path>) -> Result<ToolOutput> {
        let input = PathBuf::from(&args[1]);
        let name = input.file_name().unwrap().to_string_lossy().into_owned();

        if self.fail_on.as_deref().is_some_and(|f| name.contains(f)) {
            return Ok(ToolOutput {
                exit_code: Some(1),
                stdout: String::new(),
                stderr: "CRX2RNX: not a compact RINEX file".to_string(),
            });
        }

        let output = match name.strip_suffix(".crx") {
            Some(stem) => format!("{}.rnx", stem),
            None => {
                let (stem, ext) = name.rsplit_once('.').unwrap();
                format!("{}.{}o", stem, &ext[..2])
            }
        };
        let mut contents = b"RINEX:".to_vec();
        contents.extend(fs::read(&input)?);
        fs::write(input.with_file_name(output), contents)?;

        Ok(ToolOutput {
            exit_code: Some(0),
            ..ToolOutput::default()
        })
    }
}

/// Concatenates its `-finp` inputs into the `-fout` file.
#[derive(Debug, Default)]
pub struct FakeMerger {
    pub inputs: Mutex<Vec<String>>,
}

impl ExternalTool for FakeMerger {
    fn name(&self) -> &str {
        "gfzrnx"
    }

    fn run(&self, args: &[OsString], _working_dir: Option<&Path>) -> Result<ToolOutput> {
        let fout = args.iter().position(|a| a == "-fout").unwrap();
        let mut merged = Vec::new();
        let mut inputs = self.inputs.lock().unwrap();
        for input in &args[1..fout] {
            let path = PathBuf::from(input);
            inputs.push(path.file_name().unwrap().to_string_lossy().into_owned());
            merged.extend(fs::read(&path)?);
        }
        fs::write(&args[fout + 1], merged)?;

        Ok(ToolOutput {
            exit_code: Some(0),
            ..ToolOutput::default()
        })
    }
}

pub fn converter() -> Arc<dyn ExternalTool> {
    Arc::new(FakeConverter::default())
}
