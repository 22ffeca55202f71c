//! HTTP endpoint tests against a live `HealthServer`.

use std::net::SocketAddr;
use std::time::Duration;

use probe_health::config::{HealthConfig, ProbeConfig, ProbeKind};
use probe_health::{HealthRegistry, HealthServer, Shutdown};
use serde_json::Value;
use tokio::net::TcpListener;
use tokio::sync::mpsc;

mod common;

struct TestServer {
    addr: SocketAddr,
    shutdown: Shutdown,
    updates: mpsc::UnboundedSender<HealthConfig>,
}

impl TestServer {
    fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }
}

async fn spawn_server(config: HealthConfig, server: impl FnOnce(HealthConfig) -> HealthServer) -> TestServer {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (updates, rx) = mpsc::unbounded_channel();
    let shutdown = Shutdown::new();
    let server = server(config);
    let server_shutdown = shutdown.subscribe();

    tokio::spawn(async move {
        let _ = server.run(listener, rx, server_shutdown).await;
    });

    TestServer {
        addr,
        shutdown,
        updates,
    }
}

fn probe(description: &str, kind: ProbeKind, target: String, critical: bool) -> ProbeConfig {
    ProbeConfig {
        description: description.to_string(),
        kind,
        target,
        critical,
        expect_status: None,
    }
}

#[tokio::test]
async fn test_empty_endpoint_reports_ok() {
    let server = spawn_server(HealthConfig::default(), |c| HealthServer::new(c, HealthRegistry::new())).await;

    let res = reqwest::get(server.url("/cloud/health")).await.unwrap();
    assert_eq!(res.status(), 200);
    assert_eq!(
        res.headers().get("content-type").unwrap(),
        "application/json"
    );
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["status"], "ok");
    assert_eq!(body["details"].as_array().unwrap().len(), 0);

    server.shutdown.trigger();
}

#[tokio::test]
async fn test_programmatic_probes_are_served() {
    let registry = HealthRegistry::new();
    registry.add_probe("passes", common::passing);
    registry.add_probe("fails", common::failing);

    let server = spawn_server(HealthConfig::default(), move |c| {
        HealthServer::with_registry(c, registry)
    })
    .await;

    let res = reqwest::get(server.url("/cloud/health")).await.unwrap();
    assert_eq!(res.status(), 200);
    let text = res.text().await.unwrap();
    assert!(text.starts_with("{\n \"status\": \"warn\""));
    let body: Value = serde_json::from_str(&text).unwrap();
    assert_eq!(body["details"][0]["description"], "passes");
    assert_eq!(body["details"][1]["description"], "fails");

    server.shutdown.trigger();
}

#[tokio::test]
async fn test_request_id_is_echoed_or_generated() {
    let server = spawn_server(HealthConfig::default(), |c| HealthServer::new(c, HealthRegistry::new())).await;
    let client = reqwest::Client::new();

    let res = client
        .get(server.url("/cloud/health"))
        .header("x-request-id", "probe-123")
        .send()
        .await
        .unwrap();
    assert_eq!(res.headers().get("x-request-id").unwrap(), "probe-123");

    let res = client.get(server.url("/cloud/health")).send().await.unwrap();
    let generated = res.headers().get("x-request-id").unwrap().to_str().unwrap();
    assert_eq!(generated.len(), 36);

    server.shutdown.trigger();
}

#[tokio::test]
async fn test_crit_status_code_is_configurable() {
    let down = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let down_addr = down.local_addr().unwrap();
    drop(down);

    let mut config = HealthConfig::default();
    config.endpoint.crit_status_code = 503;
    config.probes.push(probe("database", ProbeKind::Tcp, down_addr.to_string(), true));

    let server = spawn_server(config, |c| HealthServer::new(c, HealthRegistry::new())).await;

    let res = reqwest::get(server.url("/cloud/health")).await.unwrap();
    assert_eq!(res.status(), 503);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["status"], "crit");
    assert_eq!(body["details"][0]["test_status"], "crit");

    server.shutdown.trigger();
}

#[tokio::test]
async fn test_http_probe_against_backend() {
    let healthy = common::start_programmable_backend(|| async { (200, "up".to_string()) }).await;
    let failing = common::start_programmable_backend(|| async { (500, "down".to_string()) }).await;

    let mut config = HealthConfig::default();
    config.endpoint.path = "/status".to_string();
    config
        .probes
        .push(probe("healthy api", ProbeKind::Http, format!("http://{}/", healthy), true));
    config
        .probes
        .push(probe("flaky api", ProbeKind::Http, format!("http://{}/", failing), false));

    let server = spawn_server(config, |c| HealthServer::new(c, HealthRegistry::new())).await;

    let body: Value = reqwest::get(server.url("/status"))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["status"], "warn");
    assert_eq!(body["details"][0]["test_status"], "ok");
    assert_eq!(body["details"][0]["result"]["status"], 200);
    assert_eq!(body["details"][1]["test_status"], "warn");
    assert_eq!(body["details"][1]["result"]["status"], 500);

    let res = reqwest::get(server.url("/cloud/health")).await.unwrap();
    assert_eq!(res.status(), 404);

    server.shutdown.trigger();
}

#[tokio::test]
async fn test_running_endpoint() {
    let registry = HealthRegistry::new();
    registry.add_probe("slow", common::sleeping(Duration::from_millis(300), "done"));
    let server = spawn_server(HealthConfig::default(), move |c| {
        HealthServer::with_registry(c, registry)
    })
    .await;

    let idle: Value = reqwest::get(server.url("/cloud/health/running"))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(idle["running"], false);
    assert_eq!(idle["probes"], 1);

    let health_url = server.url("/cloud/health");
    let in_flight = tokio::spawn(async move { reqwest::get(health_url).await });
    tokio::time::sleep(Duration::from_millis(100)).await;

    let busy: Value = reqwest::get(server.url("/cloud/health/running"))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(busy["running"], true);

    let res = in_flight.await.unwrap().unwrap();
    assert_eq!(res.status(), 200);

    server.shutdown.trigger();
}

#[tokio::test]
async fn test_config_reload_replaces_probes() {
    let up = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let up_addr = up.local_addr().unwrap();

    let mut config = HealthConfig::default();
    config.probes.push(probe("cache", ProbeKind::Tcp, up_addr.to_string(), false));
    let server = spawn_server(config.clone(), |c| HealthServer::new(c, HealthRegistry::new())).await;

    let body: Value = reqwest::get(server.url("/cloud/health"))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["status"], "ok");
    assert_eq!(body["details"].as_array().unwrap().len(), 1);

    drop(up);
    let mut reloaded = config;
    reloaded.probes[0].critical = true;
    reloaded.probes.push(probe("queue", ProbeKind::Tcp, up_addr.to_string(), false));
    server.updates.send(reloaded).unwrap();
    tokio::time::sleep(Duration::from_millis(100)).await;

    let body: Value = reqwest::get(server.url("/cloud/health"))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["status"], "crit");
    assert_eq!(body["details"].as_array().unwrap().len(), 2);
    assert_eq!(body["details"][1]["description"], "queue");

    server.shutdown.trigger();
}
