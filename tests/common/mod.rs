//! Shared utilities for integration tests.

#![allow(dead_code)]

use std::future::Future;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use probe_health::health::{ProbeFn, ProbeResult};
use serde_json::json;
use tokio::io::AsyncWriteExt;
use tokio::net::TcpListener;

/// Probe that always passes.
pub async fn passing() -> ProbeResult {
    Ok(json!("This is a test which will always pass"))
}

/// Probe that always fails.
pub async fn failing() -> ProbeResult {
    Err(json!("This fake test always fails"))
}

/// Probe that never completes on its own.
pub async fn hanging() -> ProbeResult {
    std::future::pending().await
}

/// Probe that sleeps before passing.
pub fn sleeping(delay: Duration, payload: &'static str) -> impl ProbeFn {
    move || async move {
        tokio::time::sleep(delay).await;
        ProbeResult::Ok(json!(payload))
    }
}

/// Probe that counts its invocations and takes `delay` to pass.
pub fn counting(counter: Arc<AtomicUsize>, delay: Duration) -> impl ProbeFn {
    move || {
        let counter = counter.clone();
        async move {
            counter.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(delay).await;
            ProbeResult::Ok(json!("counted"))
        }
    }
}

/// Start a programmable mock backend on an ephemeral port.
pub async fn start_programmable_backend<F, Fut>(f: F) -> SocketAddr
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = (u16, String)> + Send + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let f = Arc::new(f);

    tokio::spawn(async move {
        loop {
            match listener.accept().await {
                Ok((mut socket, _)) => {
                    let f = f.clone();
                    tokio::spawn(async move {
                        let (status, body) = f().await;
                        let status_text = match status {
                            200 => "200 OK",
                            500 => "500 Internal Server Error",
                            503 => "503 Service Unavailable",
                            _ => "200 OK",
                        };

                        let response_str = format!(
                            "HTTP/1.1 {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                            status_text,
                            body.len(),
                            body
                        );
                        let _ = socket.write_all(response_str.as_bytes()).await;
                        let _ = socket.shutdown().await;
                    });
                }
                Err(_) => break,
            }
        }
    });

    addr
}
