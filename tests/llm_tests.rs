// SPDX-FileCopyrightText: 2025 RAprogramm
// SPDX-License-Identifier: MIT

use std::sync::{
    Arc,
    atomic::{AtomicUsize, Ordering}
};

use compliance_rag::{
    config::RetryConfig,
    error::describe,
    llm::{LanguageModel, LlmClient, LlmProvider}
};
use tokio::{
    io::{AsyncReadExt, AsyncWriteExt},
    net::{TcpListener, TcpStream}
};

/// Serves one canned HTTP response per connection, in order, counting requests
async fn serve(responses: Vec<(u16, &'static str)>) -> (String, Arc<AtomicUsize>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let hits = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&hits);
    tokio::spawn(async move {
        for (status, body) in responses {
            let Ok((mut socket, _)) = listener.accept().await else {
                return;
            };
            read_request(&mut socket).await;
            counter.fetch_add(1, Ordering::SeqCst);
            let reply = format!(
                "HTTP/1.1 {} X\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                status,
                body.len(),
                body
            );
            let _ = socket.write_all(reply.as_bytes()).await;
            let _ = socket.shutdown().await;
        }
    });
    (format!("http://{}", addr), hits)
}

async fn read_request(socket: &mut TcpStream) {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];
    loop {
        let Ok(n) = socket.read(&mut chunk).await else {
            return;
        };
        if n == 0 {
            return;
        }
        buf.extend_from_slice(&chunk[..n]);
        let text = String::from_utf8_lossy(&buf);
        if let Some(end) = text.find("\r\n\r\n") {
            let length = text[..end]
                .lines()
                .find_map(|line| {
                    let (name, value) = line.split_once(':')?;
                    name.eq_ignore_ascii_case("content-length")
                        .then(|| value.trim().parse::<usize>().ok())
                        .flatten()
                })
                .unwrap_or(0);
            if buf.len() >= end + 4 + length {
                return;
            }
        }
    }
}

fn client(base_url: String, max_retries: u32) -> LlmClient {
    let provider = LlmProvider::Ollama {
        base_url,
        model:       String::from("llama3.2:3b"),
        temperature: 0.1
    };
    let retry = RetryConfig {
        max_retries,
        initial_delay_ms: 1,
        max_delay_ms:     5,
        backoff_factor:   2.0
    };
    LlmClient::with_retry_config(provider, retry)
}

#[tokio::test]
async fn test_unavailable_model_is_retried() {
    let (url, hits) = serve(vec![
        (503, r#"{"error":"loading model"}"#),
        (200, r#"{"response":"SELECT * FROM incidents"}"#)
    ])
    .await;

    let answer = client(url, 1).invoke("question").await.unwrap();

    assert_eq!(answer, "SELECT * FROM incidents");
    assert_eq!(hits.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_retries_are_bounded() {
    let (url, hits) = serve(vec![
        (503, r#"{"error":"busy"}"#),
        (503, r#"{"error":"busy"}"#),
        (200, r#"{"response":"too late"}"#)
    ])
    .await;

    let err = client(url, 1).invoke("question").await.unwrap_err();

    assert!(describe(&err).contains("503"));
    assert_eq!(hits.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_client_errors_are_not_retried() {
    let (url, hits) = serve(vec![
        (404, r#"{"error":"model not found"}"#),
        (200, r#"{"response":"unreachable"}"#)
    ])
    .await;

    let err = client(url, 3).invoke("question").await.unwrap_err();

    assert!(describe(&err).contains("model not found"));
    assert_eq!(hits.load(Ordering::SeqCst), 1);
}
