//! Shared helpers for integration tests.

#![allow(dead_code)]

pub mod socket_guard;

use archive_harvester::HarvestConfig;
use serde_json::{Value, json};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

/// Config pointing every endpoint at `base`, with delays and retries off.
pub fn config_for(base: &str, dir: &std::path::Path) -> HarvestConfig {
    HarvestConfig {
        search_url: format!("{base}/advancedsearch.php"),
        metadata_url: format!("{base}/metadata"),
        download_url: format!("{base}/download"),
        download_dir: dir.join("downloads"),
        database_path: dir.join("books.db"),
        log_file: dir.join("harvester.log"),
        api_delay_ms: 0,
        item_delay_ms: 0,
        retry_base_delay_ms: 0,
        max_retries: 1,
        ..HarvestConfig::default()
    }
}

/// Search response body with the given documents.
pub fn search_body(total: u64, docs: &[Value]) -> Value {
    json!({ "response": { "numFound": total, "start": 0, "docs": docs } })
}

/// One search document.
pub fn doc(identifier: &str, title: &str, language: &str) -> Value {
    json!({ "identifier": identifier, "title": title, "language": language })
}

/// Metadata response listing the given files.
pub fn metadata_body(files: &[&str]) -> Value {
    let files: Vec<Value> = files
        .iter()
        .map(|name| json!({ "name": name, "size": "10" }))
        .collect();
    json!({ "files": files })
}

/// Serves one response that declares `declared` bytes but sends only `body`,
/// then closes the connection. Returns the URL to request.
pub async fn truncating_server(body: &'static [u8], declared: usize) -> Option<String> {
    let listener = TcpListener::bind("127.0.0.1:0").await.ok()?;
    let addr = listener.local_addr().ok()?;
    tokio::spawn(async move {
        if let Ok((mut socket, _)) = listener.accept().await {
            let mut request = [0_u8; 1024];
            let _ = socket.read(&mut request).await;
            let head = format!(
                "HTTP/1.1 200 OK\r\nContent-Type: application/pdf\r\nContent-Length: {declared}\r\n\r\n"
            );
            let _ = socket.write_all(head.as_bytes()).await;
            let _ = socket.write_all(body).await;
            let _ = socket.shutdown().await;
        }
    });
    Some(format!("http://{addr}/truncated.pdf"))
}
