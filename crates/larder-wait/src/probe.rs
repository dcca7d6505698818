//! The [`Probe`] capability and the stock probes built on it.
//!
//! A probe answers one question per call: is the dependency ready right now?
//! `Ok(Ready)` is success, `Ok(NotReady)` is a well-formed negative, and `Err`
//! means the probe itself could not get an answer.

use std::future::Future;
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::HeaderMap;
use serde_json::Value;
use thiserror::Error;

/// A successful probe invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbeStatus {
    Ready,
    NotReady(String),
}

/// A probe invocation that could not produce an answer.
#[derive(Debug, Error)]
pub enum ProbeError {
    #[error("failed to run `{program}`: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("probe timed out after {0:?}")]
    Timeout(Duration),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("probe panicked: {0}")]
    Panicked(String),

    #[error("{0}")]
    Other(String),
}

/// A single readiness check against an external dependency.
///
/// Implementations must be safe to call repeatedly; the waiter invokes them
/// sequentially, never concurrently.
#[async_trait]
pub trait Probe: Send + Sync {
    async fn check(&self) -> Result<ProbeStatus, ProbeError>;

    /// Short human-readable label used in log lines.
    fn describe(&self) -> String {
        "probe".to_owned()
    }
}

#[async_trait]
impl<P: Probe + ?Sized> Probe for Box<P> {
    async fn check(&self) -> Result<ProbeStatus, ProbeError> {
        (**self).check().await
    }

    fn describe(&self) -> String {
        (**self).describe()
    }
}

// ── Closure probe ─────────────────────────────────────────────────────────────

/// Probe backed by an async closure. See [`probe_fn`].
pub struct FnProbe<F> {
    f: F,
}

/// Build a probe from an async closure.
///
/// ```rust
/// use larder_wait::{probe_fn, ProbeStatus};
///
/// let probe = probe_fn(|| async { Ok(ProbeStatus::Ready) });
/// # let _ = probe;
/// ```
pub fn probe_fn<F, Fut>(f: F) -> FnProbe<F>
where
    F: Fn() -> Fut + Send + Sync,
    Fut: Future<Output = Result<ProbeStatus, ProbeError>> + Send + 'static,
{
    FnProbe { f }
}

#[async_trait]
impl<F, Fut> Probe for FnProbe<F>
where
    F: Fn() -> Fut + Send + Sync,
    Fut: Future<Output = Result<ProbeStatus, ProbeError>> + Send + 'static,
{
    async fn check(&self) -> Result<ProbeStatus, ProbeError> {
        (self.f)().await
    }
}

// ── Process probe ─────────────────────────────────────────────────────────────

/// Runs a command and treats exit status 0 as ready.
///
/// Output is discarded. With a timeout set, a hung child is killed and the
/// attempt counts as an error.
#[derive(Debug, Clone)]
pub struct CommandProbe {
    program: String,
    args: Vec<String>,
    current_dir: Option<PathBuf>,
    timeout: Option<Duration>,
}

impl CommandProbe {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            current_dir: None,
            timeout: None,
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn current_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.current_dir = Some(dir.into());
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

#[async_trait]
impl Probe for CommandProbe {
    async fn check(&self) -> Result<ProbeStatus, ProbeError> {
        let mut cmd = tokio::process::Command::new(&self.program);
        cmd.args(&self.args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true);
        if let Some(dir) = &self.current_dir {
            cmd.current_dir(dir);
        }

        let status = match self.timeout {
            Some(limit) => tokio::time::timeout(limit, cmd.status())
                .await
                .map_err(|_| ProbeError::Timeout(limit))?,
            None => cmd.status().await,
        }
        .map_err(|source| ProbeError::Spawn {
            program: self.program.clone(),
            source,
        })?;

        if status.success() {
            Ok(ProbeStatus::Ready)
        } else {
            Ok(ProbeStatus::NotReady(format!("`{}` {status}", self.program)))
        }
    }

    fn describe(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

// ── HTTP flag probe ───────────────────────────────────────────────────────────

/// GETs a JSON document and reads a boolean field; `true` means ready.
///
/// A non-2xx status or a missing/false field is a well-formed "not ready".
/// Transport and body decoding failures are errors.
#[derive(Debug, Clone)]
pub struct JsonFlagProbe {
    client: reqwest::Client,
    url: String,
    field: String,
    headers: HeaderMap,
    timeout: Option<Duration>,
}

impl JsonFlagProbe {
    pub fn new(client: reqwest::Client, url: impl Into<String>, field: impl Into<String>) -> Self {
        Self {
            client,
            url: url.into(),
            field: field.into(),
            headers: HeaderMap::new(),
            timeout: None,
        }
    }

    /// Extra headers sent with every request (e.g. a forwarded `Cookie`).
    pub fn headers(mut self, headers: HeaderMap) -> Self {
        self.headers = headers;
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

#[async_trait]
impl Probe for JsonFlagProbe {
    async fn check(&self) -> Result<ProbeStatus, ProbeError> {
        let mut req = self.client.get(&self.url).headers(self.headers.clone());
        if let Some(limit) = self.timeout {
            req = req.timeout(limit);
        }
        let resp = req.send().await?;

        let status = resp.status();
        if !status.is_success() {
            return Ok(ProbeStatus::NotReady(format!("HTTP {status}")));
        }

        let body: Value = resp.json().await?;
        match body.get(&self.field).and_then(Value::as_bool) {
            Some(true) => Ok(ProbeStatus::Ready),
            Some(false) => Ok(ProbeStatus::NotReady(format!("`{}` is false", self.field))),
            None => Ok(ProbeStatus::NotReady(format!(
                "response has no boolean `{}`",
                self.field
            ))),
        }
    }

    fn describe(&self) -> String {
        format!("GET {}", self.url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{Json, Router, http::StatusCode, routing::get};
    use serde_json::json;

    async fn serve(router: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{addr}")
    }

    #[tokio::test]
    async fn test_fn_probe_passes_through() {
        let probe = probe_fn(|| async { Ok(ProbeStatus::NotReady("booting".into())) });
        assert_eq!(
            probe.check().await.unwrap(),
            ProbeStatus::NotReady("booting".into())
        );
        assert_eq!(probe.describe(), "probe");
    }

    #[tokio::test]
    async fn test_boxed_probe_delegates() {
        let probe: Box<dyn Probe> = Box::new(CommandProbe::new("docker").arg("ps"));
        assert_eq!(probe.describe(), "docker ps");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_command_probe_exit_status() {
        assert_eq!(
            CommandProbe::new("true").check().await.unwrap(),
            ProbeStatus::Ready
        );
        match CommandProbe::new("false").check().await.unwrap() {
            ProbeStatus::NotReady(reason) => assert!(reason.starts_with("`false`")),
            other => panic!("expected NotReady, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_command_probe_missing_program_is_error() {
        let err = CommandProbe::new("larder-definitely-not-a-real-binary")
            .check()
            .await
            .unwrap_err();
        assert!(matches!(err, ProbeError::Spawn { .. }));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_command_probe_timeout_is_error() {
        let err = CommandProbe::new("sleep")
            .arg("5")
            .timeout(Duration::from_millis(50))
            .check()
            .await
            .unwrap_err();
        assert!(matches!(err, ProbeError::Timeout(_)));
    }

    #[tokio::test]
    async fn test_json_flag_probe() {
        let base = serve(
            Router::new()
                .route("/yes", get(|| async { Json(json!({ "authenticated": true })) }))
                .route("/no", get(|| async { Json(json!({ "authenticated": false })) }))
                .route("/other", get(|| async { Json(json!({ "status": "ok" })) }))
                .route("/down", get(|| async { StatusCode::SERVICE_UNAVAILABLE }))
                .route("/text", get(|| async { "not json" })),
        )
        .await;
        let client = reqwest::Client::new();
        let probe = |path: &str| JsonFlagProbe::new(client.clone(), format!("{base}{path}"), "authenticated");

        assert_eq!(probe("/yes").check().await.unwrap(), ProbeStatus::Ready);
        assert!(matches!(probe("/no").check().await.unwrap(), ProbeStatus::NotReady(_)));
        assert!(matches!(probe("/other").check().await.unwrap(), ProbeStatus::NotReady(_)));
        assert_eq!(
            probe("/down").check().await.unwrap(),
            ProbeStatus::NotReady("HTTP 503 Service Unavailable".into())
        );
        assert!(matches!(probe("/text").check().await, Err(ProbeError::Http(_))));
        assert_eq!(probe("/yes").describe(), format!("GET {base}/yes"));
    }
}
