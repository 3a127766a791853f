use reqwest::header::HeaderMap;
use reqwest::Method;
use serde::Serialize;
use std::fmt;
use std::time::Duration;

pub const DEFAULT_WORKERS: usize = 10;
pub const DEFAULT_PERIOD_MS: u64 = 25;
pub const DEFAULT_TARGET_URL: &str = "http://localhost:8088/search/test";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum OutputFormat {
    /// Tab-separated fields, one record per line
    #[default]
    Tsv,
    /// One JSON object per line
    Json,
}

#[derive(Clone, Debug)]
pub struct Config {
    pub workers: usize,
    pub period_ms: u64,
    pub format: OutputFormat,
    pub progress: bool,
}

impl Config {
    pub fn period(&self) -> Duration {
        Duration::from_millis(self.period_ms)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            workers: DEFAULT_WORKERS,
            period_ms: DEFAULT_PERIOD_MS,
            format: OutputFormat::default(),
            progress: false,
        }
    }
}

/// Label attached to every record a worker emits.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct WorkerIdentity(String);

impl WorkerIdentity {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<usize> for WorkerIdentity {
    fn from(index: usize) -> Self {
        Self(index.to_string())
    }
}

impl fmt::Display for WorkerIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone)]
pub struct RequestTemplate {
    pub method: Method,
    pub url: String,
    pub headers: HeaderMap,
}

impl RequestTemplate {
    pub fn post(url: impl Into<String>) -> Self {
        Self {
            method: Method::POST,
            url: url.into(),
            headers: HeaderMap::new(),
        }
    }

    pub fn build(&self, client: &reqwest::Client) -> reqwest::RequestBuilder {
        client
            .request(self.method.clone(), &self.url)
            .headers(self.headers.clone())
    }
}

impl Default for RequestTemplate {
    fn default() -> Self {
        Self::post(DEFAULT_TARGET_URL)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FailureKind {
    Connect,
    Timeout,
    Request,
}

impl FailureKind {
    pub fn classify(err: &reqwest::Error) -> Self {
        if err.is_connect() {
            FailureKind::Connect
        } else if err.is_timeout() {
            FailureKind::Timeout
        } else {
            FailureKind::Request
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            FailureKind::Connect => "connect",
            FailureKind::Timeout => "timeout",
            FailureKind::Request => "request",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "lowercase")]
pub enum Outcome {
    Success { status: u16 },
    Failure { kind: FailureKind, error: String },
}

/// One measurement: emitted once, then dropped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResultRecord {
    pub worker: WorkerIdentity,
    /// Completion time, microseconds since the Unix epoch
    pub timestamp_us: i64,
    pub latency_us: u64,
    #[serde(flatten)]
    pub outcome: Outcome,
}

impl ResultRecord {
    pub fn is_success(&self) -> bool {
        matches!(self.outcome, Outcome::Success { .. })
    }
}
