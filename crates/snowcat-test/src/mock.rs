//! TestMockServer: runs `snowcat mock` as a child process.

use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStdout, Command, Stdio};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use thiserror::Error;

/// Errors from TestMockServer operations.
#[derive(Debug, Error)]
pub enum TestError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("mock server failed to start: {0}")]
    StartupFailed(String),

    #[error("snowcat binary not found at {0}")]
    BinaryNotFound(String),
}

/// Absolute path of a file under the workspace `tests/fixtures` directory.
pub fn fixture(name: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("../../tests/fixtures")
        .join(name)
}

/// A mock server process bound to a random local port.
///
/// The process is killed when the harness is dropped. Its stdout is
/// collected line by line so tests can inspect the startup banner.
pub struct TestMockServer {
    child: Child,
    port: u16,
    client: reqwest::Client,
    stdout: Arc<Mutex<Vec<String>>>,
}

impl TestMockServer {
    /// Start a mock server for a single blueprint.
    pub async fn from_blueprint(path: impl AsRef<Path>) -> Result<Self, TestError> {
        Self::from_blueprints(&[path.as_ref()]).await
    }

    /// Start a mock server for several blueprints, in priority order.
    pub async fn from_blueprints(paths: &[&Path]) -> Result<Self, TestError> {
        let binary_path = find_snowcat_binary()?;
        let port = find_available_port()?;

        let mut child = Command::new(&binary_path)
            .arg("mock")
            .args(paths)
            .arg("--bind")
            .arg(format!("127.0.0.1:{port}"))
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()?;

        let stdout = Arc::new(Mutex::new(Vec::new()));
        if let Some(pipe) = child.stdout.take() {
            collect_lines(pipe, Arc::clone(&stdout));
        }

        let mut server = TestMockServer {
            child,
            port,
            client: reqwest::Client::new(),
            stdout,
        };
        server.wait_for_ready().await?;
        Ok(server)
    }

    /// Poll until the server answers any request.
    ///
    /// Every path gets an answer (404 when unmatched), so any response
    /// means the listener is up.
    async fn wait_for_ready(&mut self) -> Result<(), TestError> {
        let ready_url = self.url("/");
        let max_attempts = 50;
        let delay = Duration::from_millis(100);

        for _ in 0..max_attempts {
            if self.client.get(&ready_url).send().await.is_ok() {
                return Ok(());
            }

            if let Ok(Some(status)) = self.child.try_wait() {
                return Err(TestError::StartupFailed(format!(
                    "snowcat exited with status: {status}"
                )));
            }

            tokio::time::sleep(delay).await;
        }

        Err(TestError::StartupFailed(
            "mock server did not become ready in time".to_string(),
        ))
    }

    /// Lines printed to stdout so far.
    pub fn stdout_lines(&self) -> Vec<String> {
        self.stdout.lock().map(|lines| lines.clone()).unwrap_or_default()
    }

    /// Wait until stdout contains `line`, then return everything printed.
    pub async fn wait_for_line(&self, line: &str) -> Result<Vec<String>, TestError> {
        for _ in 0..50 {
            let lines = self.stdout_lines();
            if lines.iter().any(|l| l == line) {
                return Ok(lines);
            }
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
        Err(TestError::StartupFailed(format!(
            "mock server never printed {line:?}"
        )))
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn base_url(&self) -> String {
        format!("http://127.0.0.1:{}", self.port)
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url(), path)
    }

    /// Make a GET request to the given path.
    pub async fn get(&self, path: &str) -> Result<reqwest::Response, TestError> {
        Ok(self.client.get(self.url(path)).send().await?)
    }

    /// Make a request with any method.
    pub async fn request(
        &self,
        method: reqwest::Method,
        path: &str,
    ) -> Result<reqwest::Response, TestError> {
        Ok(self.client.request(method, self.url(path)).send().await?)
    }

    /// Make a GET request carrying `Prefer: status=<status>`.
    pub async fn get_preferring(
        &self,
        path: &str,
        status: u16,
    ) -> Result<reqwest::Response, TestError> {
        Ok(self
            .client
            .get(self.url(path))
            .header("Prefer", format!("status={status}"))
            .send()
            .await?)
    }
}

impl Drop for TestMockServer {
    fn drop(&mut self) {
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}

/// Drain a child's stdout on a background thread until EOF.
fn collect_lines(pipe: ChildStdout, sink: Arc<Mutex<Vec<String>>>) {
    thread::spawn(move || {
        for line in BufReader::new(pipe).lines() {
            let Ok(line) = line else { break };
            let Ok(mut lines) = sink.lock() else { break };
            lines.push(line);
        }
    });
}

/// Find the snowcat binary in the target directory.
fn find_snowcat_binary() -> Result<PathBuf, TestError> {
    let root = Path::new(env!("CARGO_MANIFEST_DIR")).join("../..");
    let mut candidates = Vec::new();
    if let Some(dir) = std::env::var_os("CARGO_TARGET_DIR") {
        candidates.push(PathBuf::from(&dir).join("debug/snowcat"));
        candidates.push(PathBuf::from(dir).join("release/snowcat"));
    }
    candidates.push(root.join("target/debug/snowcat"));
    candidates.push(root.join("target/release/snowcat"));

    candidates
        .into_iter()
        .find(|path| path.exists())
        .ok_or_else(|| {
            TestError::BinaryNotFound("target/debug/snowcat or target/release/snowcat".to_string())
        })
}

/// Find an available TCP port.
fn find_available_port() -> Result<u16, TestError> {
    // Bind to port 0 to get an OS-assigned port
    let listener = std::net::TcpListener::bind("127.0.0.1:0")?;
    let port = listener.local_addr()?.port();
    drop(listener);
    Ok(port)
}
