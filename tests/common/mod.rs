//! Shared fakes for integration tests.

#![allow(dead_code)]

use std::collections::HashSet;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use routeglue::router::{RouterApi, RouterError};
use routeglue::runtime::{ContainerRuntime, DiscoveryError};
use routeglue::types::{ContainerRecord, RouteChange, RouteMap};
use tempfile::TempDir;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

pub fn map(entries: &[(&str, &str)]) -> RouteMap {
    entries
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

pub fn container(name: &str, slugs: &[&str], ports: &[u16]) -> ContainerRecord {
    ContainerRecord {
        name: name.into(),
        slugs: slugs.iter().map(|s| s.to_string()).collect(),
        published_ports: ports.to_vec(),
    }
}

/// Routing file inside a temporary directory.
pub struct ConfigFile {
    dir: TempDir,
    pub path: PathBuf,
}

impl ConfigFile {
    pub fn new(content: &str) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("routes.yaml");
        std::fs::write(&path, content).unwrap();
        Self { dir, path }
    }

    pub fn write(&self, content: &str) {
        std::fs::write(&self.path, content).unwrap();
    }

    pub fn remove(&self) {
        std::fs::remove_file(&self.path).unwrap();
    }
}

/// Container runtime returning a fixed, replaceable container list.
#[derive(Default)]
pub struct FakeRuntime {
    containers: Mutex<Vec<ContainerRecord>>,
    fail: AtomicBool,
}

impl FakeRuntime {
    pub fn with(containers: Vec<ContainerRecord>) -> Self {
        Self {
            containers: Mutex::new(containers),
            fail: AtomicBool::new(false),
        }
    }

    pub fn set(&self, containers: Vec<ContainerRecord>) {
        *self.containers.lock().unwrap() = containers;
    }

    pub fn fail(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl ContainerRuntime for FakeRuntime {
    async fn list_containers(&self) -> Result<Vec<ContainerRecord>, DiscoveryError> {
        tokio::task::yield_now().await;
        if self.fail.load(Ordering::SeqCst) {
            return Err(DiscoveryError::List(
                bollard::errors::Error::DockerResponseServerError {
                    status_code: 500,
                    message: "daemon unavailable".into(),
                },
            ));
        }
        Ok(self.containers.lock().unwrap().clone())
    }
}

/// In-memory router that records every write call.
#[derive(Default)]
pub struct FakeRouter {
    routes: Mutex<RouteMap>,
    calls: Mutex<Vec<RouteChange>>,
    fail_list: AtomicBool,
    failing: Mutex<HashSet<String>>,
}

impl FakeRouter {
    pub fn with(routes: RouteMap) -> Self {
        Self {
            routes: Mutex::new(routes),
            ..Default::default()
        }
    }

    pub fn routes(&self) -> RouteMap {
        self.routes.lock().unwrap().clone()
    }

    pub fn calls(&self) -> Vec<RouteChange> {
        self.calls.lock().unwrap().clone()
    }

    pub fn clear_calls(&self) {
        self.calls.lock().unwrap().clear();
    }

    pub fn fail_list(&self, fail: bool) {
        self.fail_list.store(fail, Ordering::SeqCst);
    }

    /// Make writes to `name` answer 500.
    pub fn fail_route(&self, name: &str, fail: bool) {
        let mut failing = self.failing.lock().unwrap();
        if fail {
            failing.insert(name.to_string());
        } else {
            failing.remove(name);
        }
    }

    fn write_result(&self, name: &str, operation: &'static str) -> Result<(), RouterError> {
        if self.failing.lock().unwrap().contains(name) {
            Err(RouterError::Status {
                operation,
                status: 500,
            })
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl RouterApi for FakeRouter {
    async fn list_routes(&self) -> Result<RouteMap, RouterError> {
        tokio::task::yield_now().await;
        if self.fail_list.load(Ordering::SeqCst) {
            return Err(RouterError::Status {
                operation: "GET /routes",
                status: 503,
            });
        }
        Ok(self.routes())
    }

    async fn upsert_route(&self, name: &str, backend: &str) -> Result<(), RouterError> {
        tokio::task::yield_now().await;
        self.calls.lock().unwrap().push(RouteChange::Upsert {
            name: name.into(),
            backend: backend.into(),
        });
        self.write_result(name, "POST /routes")?;
        self.routes
            .lock()
            .unwrap()
            .insert(name.to_string(), backend.to_string());
        Ok(())
    }

    async fn delete_route(&self, name: &str) -> Result<(), RouterError> {
        tokio::task::yield_now().await;
        self.calls
            .lock()
            .unwrap()
            .push(RouteChange::Delete { name: name.into() });
        self.write_result(name, "DELETE /routes")?;
        self.routes.lock().unwrap().remove(name);
        Ok(())
    }
}

/// A request as seen by the mock HTTP server.
#[derive(Debug, Clone)]
pub struct Recorded {
    pub method: String,
    pub path: String,
    pub body: String,
}

/// Start a one-request-per-connection HTTP server on an ephemeral port.
///
/// `handler` maps each request to a status code and a JSON body.
pub async fn start_mock_router<F>(handler: F) -> (SocketAddr, Arc<Mutex<Vec<Recorded>>>)
where
    F: Fn(&Recorded) -> (u16, String) + Send + Sync + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let recorded = Arc::new(Mutex::new(Vec::new()));
    let handler = Arc::new(handler);

    let log = Arc::clone(&recorded);
    tokio::spawn(async move {
        loop {
            let Ok((socket, _)) = listener.accept().await else {
                break;
            };
            let handler = Arc::clone(&handler);
            let log = Arc::clone(&log);
            tokio::spawn(async move {
                let _ = read_request(socket, handler, log).await;
            });
        }
    });

    (addr, recorded)
}

async fn read_request<F>(
    mut socket: TcpStream,
    handler: Arc<F>,
    log: Arc<Mutex<Vec<Recorded>>>,
) -> Option<()>
where
    F: Fn(&Recorded) -> (u16, String) + Send + Sync + 'static,
{
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];
    let header_end = loop {
        let n = socket.read(&mut chunk).await.ok()?;
        if n == 0 {
            return None;
        }
        buf.extend_from_slice(&chunk[..n]);
        if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
            break pos + 4;
        }
    };

    let head = String::from_utf8_lossy(&buf[..header_end]).to_string();
    let mut lines = head.lines();
    let mut request_line = lines.next()?.split_whitespace();
    let method = request_line.next()?.to_string();
    let path = request_line.next()?.to_string();
    let content_length = lines
        .filter_map(|l| l.split_once(':'))
        .find(|(k, _)| k.trim().eq_ignore_ascii_case("content-length"))
        .and_then(|(_, v)| v.trim().parse::<usize>().ok())
        .unwrap_or(0);

    while buf.len() < header_end + content_length {
        let n = socket.read(&mut chunk).await.ok()?;
        if n == 0 {
            break;
        }
        buf.extend_from_slice(&chunk[..n]);
    }
    let body = String::from_utf8_lossy(&buf[header_end..]).to_string();

    let request = Recorded { method, path, body };
    let (status, response_body) = handler(&request);
    log.lock().unwrap().push(request);

    let response = format!(
        "HTTP/1.1 {} Mock\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
        status,
        response_body.len(),
        response_body
    );
    socket.write_all(response.as_bytes()).await.ok()?;
    socket.shutdown().await.ok()?;
    Some(())
}
