//! Integration tests for HTTP API endpoints.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use blob_vault::blob_store::LocalBlobStore;
use blob_vault::config::{Config, NodeConfig, StorageConfig};
use blob_vault::coordinator::Coordinator;
use blob_vault::storage::{Database, MetadataStore};
use blob_vault::{api, AppState};
use bytes::Bytes;
use serde_json::{json, Value};
use tower::ServiceExt;

const BOUNDARY: &str = "blobvaultboundary";

struct TestServer {
    router: axum::Router,
    db: Database,
    files_dir: PathBuf,
    _dir: tempfile::TempDir,
}

impl TestServer {
    fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let data_dir = dir.path().join("data");
        let files_dir = dir.path().join("files");

        let config = Config {
            node: NodeConfig {
                bind_address: "127.0.0.1:0".to_string(),
                data_dir: data_dir.to_string_lossy().to_string(),
            },
            storage: StorageConfig {
                root: files_dir.to_string_lossy().to_string(),
                public_url: "http://localhost:8080/images/".to_string(),
                ..StorageConfig::default()
            },
            max_upload_size: 1024 * 1024,
        };

        let db = Database::open(&data_dir).unwrap();
        let blobs = LocalBlobStore::new(&files_dir).unwrap();
        let coordinator = Coordinator::new(
            Arc::new(blobs),
            Arc::new(db.clone()),
            config.storage.public_url.clone(),
            config.storage.max_concurrent_writes,
        )
        .unwrap();

        let state = Arc::new(AppState {
            config,
            coordinator,
        });

        Self {
            router: api::create_router(state),
            db,
            files_dir,
            _dir: dir,
        }
    }

    fn blob_files(&self) -> Vec<PathBuf> {
        let mut found = Vec::new();
        collect_files(&self.files_dir, &mut found);
        found
    }

    async fn get_bytes(&self, uri: &str) -> (StatusCode, Bytes) {
        let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
        self.send(request).await
    }

    async fn send(&self, request: Request<Body>) -> (StatusCode, Bytes) {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, body)
    }

    async fn json(&self, method: &str, uri: &str, body: Option<&str>) -> (StatusCode, Value) {
        let body = body.map(|b| Body::from(b.to_string())).unwrap_or_else(Body::empty);
        let request = Request::builder().method(method).uri(uri).body(body).unwrap();
        let (status, bytes) = self.send(request).await;
        (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
    }

    async fn upload(&self, field: &str, filename: &str, content: &[u8]) -> Value {
        let mut body = Vec::new();
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{field}\"; filename=\"{filename}\"\r\nContent-Type: application/octet-stream\r\n\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(content);
        body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());

        let request = Request::builder()
            .method("POST")
            .uri("/upload")
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(Body::from(body))
            .unwrap();

        let (status, bytes) = self.send(request).await;
        assert_eq!(status, StatusCode::OK);
        serde_json::from_slice(&bytes).unwrap()
    }

    async fn list(&self, page: i64) -> Vec<String> {
        let (_, body) = self.json("GET", &format!("/list?page={page}"), None).await;
        body["data"]
            .as_array()
            .expect("list data should be an array")
            .iter()
            .map(|e| e["UUID"].as_str().unwrap().to_string())
            .collect()
    }
}

fn collect_files(dir: &Path, found: &mut Vec<PathBuf>) {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return;
    };
    for entry in entries {
        let path = entry.unwrap().path();
        if path.is_dir() {
            collect_files(&path, found);
        } else {
            found.push(path);
        }
    }
}

fn url_path(url: &str) -> String {
    url.strip_prefix("http://localhost:8080")
        .expect("url should use the public base")
        .to_string()
}

#[tokio::test]
async fn test_index() {
    let server = TestServer::new();
    for uri in ["/", "/index.html", "/index.htm"] {
        let (status, body) = server.json("GET", uri, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({"code": 200, "msg": "Service running..."}));
    }
}

#[tokio::test]
async fn test_unknown_route() {
    let server = TestServer::new();
    let (status, body) = server.json("GET", "/nope", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"code": 404, "error": "404 Not Found."}));
}

#[tokio::test]
async fn test_wrong_method() {
    let server = TestServer::new();
    for (method, uri) in [
        ("GET", "/upload"),
        ("POST", "/delete"),
        ("DELETE", "/list?page=1"),
        ("POST", "/item?UUID=x"),
    ] {
        let (status, body) = server.json(method, uri, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({"code": 200, "error": "Error Method."}), "{method} {uri}");
    }
}

#[tokio::test]
async fn test_upload_fetch_and_serve() {
    let server = TestServer::new();
    let content = b"\x89PNG\r\n\x1a\nnot really a png";

    let body = server.upload("file", "cat.png", content).await;
    assert_eq!(body["code"], 200);
    assert_eq!(body["msg"], "Upload finished.");
    assert_eq!(body["data"]["FileName"], "cat.png");

    let id = body["data"]["UUID"].as_str().unwrap().to_string();
    let directory = body["data"]["Directory"].as_str().unwrap();
    let url = body["url"].as_str().unwrap();
    assert!(url.ends_with(&format!("{directory}cat.png")));

    let (_, item) = server.json("GET", &format!("/item?UUID={id}"), None).await;
    assert_eq!(item["code"], 200);
    assert_eq!(item["data"], body["data"]);

    let request = Request::builder()
        .uri(url_path(url))
        .body(Body::empty())
        .unwrap();
    let response = server.router.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[header::CONTENT_TYPE], "image/png");
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    assert_eq!(bytes.as_ref(), content);

    assert_eq!(server.list(1).await, vec![id]);
}

#[tokio::test]
async fn test_upload_rejects_file_type() {
    let server = TestServer::new();
    for filename in ["run.sh", "noextension", "cat.png.exe"] {
        let body = server.upload("file", filename, b"#!/bin/sh").await;
        assert_eq!(body, json!({"code": 200, "error": "Invalid file type."}), "{filename}");
    }

    assert!(server.list(1).await.is_empty());
    assert!(server.blob_files().is_empty(), "rejected uploads must not touch disk");
    assert!(server.db.ordered_items().unwrap().is_empty());
}

#[tokio::test]
async fn test_urls_for_reserved_filenames_serve_bytes() {
    let server = TestServer::new();

    for filename in ["a?b.png", "a#b.png", "a%20b.png", "my cat.png"] {
        let content = format!("bytes of {filename}");
        let body = server.upload("file", filename, content.as_bytes()).await;
        assert_eq!(body["code"], 200, "{filename}: {body}");

        let url = body["url"].as_str().unwrap();
        assert!(!url.contains(['?', '#', ' ']), "{url} should be encoded");

        let (status, bytes) = server.get_bytes(&url_path(url)).await;
        assert_eq!(status, StatusCode::OK, "{filename} via {url}");
        assert_eq!(bytes.as_ref(), content.as_bytes(), "{filename} via {url}");
    }
}

#[tokio::test]
async fn test_upload_without_file_field() {
    let server = TestServer::new();
    let body = server.upload("attachment", "cat.png", b"data").await;
    assert_eq!(body, json!({"code": 200, "error": "Get form file failed."}));
    assert!(server.list(1).await.is_empty());
}

#[tokio::test]
async fn test_delete_flow() {
    let server = TestServer::new();
    let uploaded = server.upload("file", "cat.png", b"meow").await;
    let id = uploaded["data"]["UUID"].as_str().unwrap().to_string();
    let url = uploaded["url"].as_str().unwrap().to_string();

    let (_, body) = server
        .json("DELETE", "/delete", Some(&json!({"key": id}).to_string()))
        .await;
    assert_eq!(body, json!({"code": 200, "msg": "Delete finished."}));

    let (_, item) = server.json("GET", &format!("/item?UUID={id}"), None).await;
    assert_eq!(item, json!({"code": 200, "error": "Not found value by key."}));

    let (status, blob) = server.json("GET", &url_path(&url), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(blob, json!({"code": 404, "error": "File not found."}));

    assert!(server.list(1).await.is_empty());
}

#[tokio::test]
async fn test_delete_unknown_key() {
    let server = TestServer::new();
    let (_, body) = server
        .json("DELETE", "/delete", Some(r#"{"key": "missing"}"#))
        .await;
    assert_eq!(body, json!({"code": 200, "error": "Not found value by key."}));
}

#[tokio::test]
async fn test_delete_malformed_bodies() {
    let server = TestServer::new();

    let (_, body) = server.json("DELETE", "/delete", Some("{not json")).await;
    assert_eq!(body["error"], "Malformed JSON in request body");

    let (_, body) = server.json("DELETE", "/delete", Some(r#"{"id": "x"}"#)).await;
    assert!(body["error"]
        .as_str()
        .unwrap()
        .starts_with("Invalid request body"));

    let (_, body) = server.json("DELETE", "/delete", Some(r#"{"key": 7}"#)).await;
    assert!(body["error"]
        .as_str()
        .unwrap()
        .starts_with("Invalid request body"));

    let (_, body) = server.json("DELETE", "/delete", Some(r#"{"key": "  "}"#)).await;
    assert_eq!(body["error"], "key must not be empty");
}

#[tokio::test]
async fn test_list_pages() {
    let server = TestServer::new();
    let mut ids = Vec::new();
    for i in 0..12 {
        let body = server.upload("file", &format!("{i}.png"), b"x").await;
        ids.push(body["data"]["UUID"].as_str().unwrap().to_string());
    }

    assert_eq!(server.list(1).await, ids[0..10].to_vec());
    assert_eq!(server.list(2).await, ids[10..12].to_vec());
    assert!(server.list(3).await.is_empty());
    assert_eq!(server.list(0).await, ids[0..10].to_vec());

    let (_, body) = server.json("GET", "/list?page=3", None).await;
    assert_eq!(body, json!({"code": 200, "data": []}));
}

#[tokio::test]
async fn test_list_bad_page() {
    let server = TestServer::new();
    for uri in ["/list?page=abc", "/list", "/list?page="] {
        let (status, body) = server.json("GET", uri, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({"code": 200, "error": "Error parm."}), "{uri}");
    }
}

#[tokio::test]
async fn test_item_requires_uuid() {
    let server = TestServer::new();
    let (_, body) = server.json("GET", "/item", None).await;
    assert_eq!(body, json!({"code": 200, "error": "Error parm."}));
}

#[tokio::test]
async fn test_serve_undecodable_path() {
    let server = TestServer::new();
    let (status, body) = server.json("GET", "/images/2026/1/2/t/%FF%FE.png", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body, json!({"code": 404, "error": "File not found."}));
}

#[tokio::test]
async fn test_serve_rejects_traversal() {
    let server = TestServer::new();
    let (status, body) = server.json("GET", "/images/../data/blob-vault.redb", None).await;
    assert_ne!(status, StatusCode::OK);
    assert_ne!(body["code"], 200);
}
