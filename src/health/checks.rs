//! Built-in probes declared in configuration.
//!
//! # Responsibilities
//! - TCP connect checks
//! - HTTP GET checks against a status expectation
//! - Register configured probes in file order
//!
//! # Design Decisions
//! - No per-probe timeout; the run deadline bounds every check
//! - One pooled HTTP client per probe, shared across invocations

use axum::body::Body;
use axum::http::Request;
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client},
    rt::TokioExecutor,
};
use serde_json::{json, Value};
use tokio::net::TcpStream;

use crate::config::{ProbeConfig, ProbeKind};
use crate::health::probe::{ProbeFn, ProbeResult};
use crate::health::HealthRegistry;

type HttpClient = Client<HttpConnector, Body>;

/// Probe that succeeds when a TCP connection to `target` can be opened.
pub fn tcp_probe(target: impl Into<String>) -> impl ProbeFn {
    let target = target.into();
    move || {
        let target = target.clone();
        async move { connect(&target).await }
    }
}

async fn connect(target: &str) -> ProbeResult {
    match TcpStream::connect(target).await {
        Ok(_) => Ok(Value::from(format!("connected to {}", target))),
        Err(e) => Err(Value::from(format!("connection to {} failed: {}", target, e))),
    }
}

/// Probe that GETs `target` and checks the response status.
///
/// Without `expect_status` any 2xx response passes.
pub fn http_probe(target: impl Into<String>, expect_status: Option<u16>) -> impl ProbeFn {
    let target = target.into();
    let client: HttpClient = Client::builder(TokioExecutor::new()).build(HttpConnector::new());
    move || {
        let client = client.clone();
        let target = target.clone();
        async move { get(&client, &target, expect_status).await }
    }
}

async fn get(client: &HttpClient, target: &str, expect_status: Option<u16>) -> ProbeResult {
    let request = Request::builder()
        .method("GET")
        .uri(target)
        .header("user-agent", "probe-health")
        .body(Body::empty())
        .map_err(|e| Value::from(format!("invalid request for {}: {}", target, e)))?;

    let response = client
        .request(request)
        .await
        .map_err(|e| Value::from(format!("request to {} failed: {}", target, e)))?;

    let status = response.status();
    let healthy = match expect_status {
        Some(code) => status.as_u16() == code,
        None => status.is_success(),
    };

    let payload = json!({ "status": status.as_u16() });
    if healthy {
        Ok(payload)
    } else {
        Err(payload)
    }
}

/// Register every configured probe, preserving file order.
pub fn register_configured(registry: &HealthRegistry, probes: &[ProbeConfig]) {
    for probe in probes {
        match (probe.kind, probe.critical) {
            (ProbeKind::Tcp, false) => registry.add_probe(&probe.description, tcp_probe(&probe.target)),
            (ProbeKind::Tcp, true) => {
                registry.add_critical_probe(&probe.description, tcp_probe(&probe.target))
            }
            (ProbeKind::Http, false) => registry.add_probe(
                &probe.description,
                http_probe(&probe.target, probe.expect_status),
            ),
            (ProbeKind::Http, true) => registry.add_critical_probe(
                &probe.description,
                http_probe(&probe.target, probe.expect_status),
            ),
        }
    }
    tracing::info!(count = probes.len(), "Registered configured probes");
}
