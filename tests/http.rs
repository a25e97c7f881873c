mod common;

use chrono::{Duration, Utc};
use reqwest::StatusCode;
use reqwest::header;
use serde_json::Value;

use common::test_server::TestServer;
use common::{only_file_id, ssh};
use snips::config::Config;
use snips::server::FeedFile;

const FINGERPRINT: &str = "SHA256:J+Xp9z5tPlVHlZJLFGmNUknvCWoAOGsOjioDs5UHDa4";

async fn fetch(url: &str) -> (StatusCode, String) {
    let response = reqwest::get(url).await.expect("request");
    let status = response.status();
    (status, response.text().await.expect("body"))
}

#[tokio::test]
async fn test_new_user_upload_is_served() {
    let server = TestServer::start().await;
    let state = &server.state;

    let out = ssh(state, FINGERPRINT, "snips", "", b"hello world\n").await;
    assert_eq!(out.code, Some(0), "stderr: {}", out.stderr);

    let id = only_file_id(state, FINGERPRINT);
    let file = state.store.find_file(&id).unwrap().unwrap();
    assert_eq!(file.size, 12);
    assert_eq!(file.file_type, "text");
    assert!(!file.private);

    let url = out.url().expect("printed url");
    assert_eq!(url.as_str(), server.url(&format!("/f/{id}")));
    assert!(out.stdout.contains(&format!("ssh f:{id}@localhost")));

    let (status, html) = fetch(url.as_str()).await;
    assert_eq!(status, StatusCode::OK);
    assert!(html.contains("hello world"));

    let raw = reqwest::Client::new()
        .get(url.as_str())
        .header(header::USER_AGENT, "curl/8.4.0")
        .send()
        .await
        .unwrap();
    assert_eq!(raw.text().await.unwrap(), "hello world\n");

    server.stop().await;
}

#[tokio::test]
async fn test_signed_private_fetch() {
    let server = TestServer::start().await;
    let state = &server.state;

    let out = ssh(state, FINGERPRINT, "snips", "-private -ttl 1h", b"top secret\n").await;
    assert_eq!(out.code, Some(0), "stderr: {}", out.stderr);
    assert!(out.stdout.contains("Expires"));

    let id = only_file_id(state, FINGERPRINT);
    let signed = out.url().expect("printed signed url");
    assert!(signed.query().unwrap().contains("sig="));

    let (status, html) = fetch(signed.as_str()).await;
    assert_eq!(status, StatusCode::OK);
    assert!(html.contains("top secret"));

    let (status, _) = fetch(&server.url(&format!("/f/{id}"))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let mut tampered = signed.clone();
    tampered.set_path(&format!("/f/{id}x"));
    let (status, _) = fetch(tampered.as_str()).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    // the same link an hour later
    let expired = state.signer.sign_url_with_expiry(
        &state.config.http_address_for_file(&id),
        Utc::now() - Duration::seconds(1),
    );
    let (status, body) = fetch(expired.as_str()).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body, "not found\n");

    // a signature without an expiry stays valid
    let forever = state.signer.sign_url(&state.config.http_address_for_file(&id));
    let (status, _) = fetch(forever.as_str()).await;
    assert_eq!(status, StatusCode::OK);

    server.stop().await;
}

#[tokio::test]
async fn test_file_limit() {
    let mut config = Config::default();
    config.limits.files_per_user = 3;
    let server = TestServer::start_with(config).await;
    let state = &server.state;

    for i in 0..3 {
        let out = ssh(state, FINGERPRINT, "snips", "", format!("file {i}\n").as_bytes()).await;
        assert_eq!(out.code, Some(0));
    }

    let out = ssh(state, FINGERPRINT, "snips", "", b"one too many\n").await;
    assert_eq!(out.code, Some(1));
    assert!(out.stderr.contains("file limit reached"));

    let key = state
        .store
        .find_public_key_by_fingerprint(FINGERPRINT)
        .unwrap()
        .unwrap();
    assert_eq!(state.store.find_files_by_user(&key.user_id).unwrap().len(), 3);

    server.stop().await;
}

#[tokio::test]
async fn test_extension_change_then_render() {
    let server = TestServer::start().await;
    let state = &server.state;

    ssh(state, FINGERPRINT, "snips", "", b"#include<stdio.h>\n").await;
    let id = only_file_id(state, FINGERPRINT);
    assert_eq!(state.store.find_file(&id).unwrap().unwrap().file_type, "text");

    let out = ssh(state, FINGERPRINT, &format!("f:{id}"), "ext c", b"").await;
    assert_eq!(out.code, Some(0), "stderr: {}", out.stderr);
    assert_eq!(state.store.find_file(&id).unwrap().unwrap().file_type, "c");

    let (status, html) = fetch(&server.url(&format!("/f/{id}"))).await;
    assert_eq!(status, StatusCode::OK);
    assert!(html.contains("class=\"cp\""));
    assert!(html.contains(&format!("/f/{id}/rev")));

    let (status, html) = fetch(&server.url(&format!("/f/{id}/rev"))).await;
    assert_eq!(status, StatusCode::OK);
    assert!(html.contains("<table class=\"revisions\">"));

    server.stop().await;
}

#[tokio::test]
async fn test_delete_then_not_found() {
    let server = TestServer::start().await;
    let state = &server.state;

    ssh(state, FINGERPRINT, "snips", "", b"short lived\n").await;
    let id = only_file_id(state, FINGERPRINT);

    let out = ssh(state, FINGERPRINT, &format!("f:{id}"), "rm", b"y\n").await;
    assert_eq!(out.code, Some(0), "stderr: {}", out.stderr);
    assert!(state.store.find_file(&id).unwrap().is_none());

    let (status, _) = fetch(&server.url(&format!("/f/{id}"))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    server.stop().await;
}

#[tokio::test]
async fn test_binary_upload() {
    let server = TestServer::start().await;
    let state = &server.state;

    let content: Vec<u8> = (0..5 * 1024).map(|i| (i % 256) as u8).collect();
    ssh(state, FINGERPRINT, "snips", "", &content).await;
    let id = only_file_id(state, FINGERPRINT);
    let file = state.store.find_file(&id).unwrap().unwrap();
    assert_eq!(file.file_type, "binary");
    assert_eq!(file.get_content().unwrap(), content);

    let (status, html) = fetch(&server.url(&format!("/f/{id}"))).await;
    assert_eq!(status, StatusCode::OK);
    assert!(html.contains("detected as binary data"));

    let out = ssh(state, FINGERPRINT, &format!("f:{id}"), "ext go", b"").await;
    assert_eq!(out.code, Some(1));
    assert!(out.stderr.contains("operation not allowed on binary file"));

    server.stop().await;
}

#[tokio::test]
async fn test_feed_and_meta() {
    let server = TestServer::start().await;
    let state = &server.state;

    ssh(state, FINGERPRINT, "snips", "", b"for everyone\n").await;
    ssh(state, "SHA256:other", "snips", "-private", b"just for me\n").await;
    let public_id = only_file_id(state, FINGERPRINT);

    let feed: Vec<FeedFile> = reqwest::get(server.url("/api/v1/snips"))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(feed.len(), 1);
    assert_eq!(feed[0].id, public_id);
    assert_eq!(feed[0].file_type, "text");

    let meta: Value = reqwest::get(server.url("/meta.json"))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(meta["endpoints"]["http"], format!("{}/", server.base_url));
    assert_eq!(meta["version"], env!("CARGO_PKG_VERSION"));

    server.stop().await;
}
