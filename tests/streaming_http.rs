//! End-to-end NDJSON streaming over HTTP, the way a route layer would mount
//! the adapter. Ignored by default; run with `cargo test -- --ignored`.

use std::{sync::Arc, time::Duration};

use axum::{Router, body::Body, extract::State, response::Response, routing::get};
use futures_util::StreamExt;
use reqwest::Client;
use tokio::{net::TcpListener, time::timeout};

use lessonweave::runner::PipelineRunner;

mod common;
use common::*;

async fn handler(State(runner): State<Arc<PipelineRunner>>) -> Response {
    let (handle, events) =
        runner.invoke_streaming(teacher_request("Make a worksheet on derivatives"));

    // Keep the handle alive past the handler so the run is not aborted.
    tokio::spawn(async move {
        if let Err(err) = handle.join().await {
            tracing::error!("pipeline failed: {err:?}");
        }
    });

    let body = Body::from_stream(
        events
            .into_ndjson_lines()
            .map(|line| Ok::<_, std::convert::Infallible>(format!("{line}\n"))),
    );

    Response::builder()
        .header("content-type", "application/x-ndjson")
        .body(body)
        .expect("static response parts are valid")
}

#[tokio::test(flavor = "multi_thread")]
#[ignore]
async fn ndjson_endpoint_streams_until_final() -> Result<(), Box<dyn std::error::Error>> {
    let runner = Arc::new(scripted_runner());
    let router = Router::new()
        .route("/stream", get(handler))
        .with_state(runner);
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;

    let server = tokio::spawn(async move {
        if let Err(err) = axum::serve(listener, router.into_make_service()).await {
            tracing::error!("server error: {err:?}");
        }
    });

    let client = Client::builder().build()?;
    let response = client.get(format!("http://{addr}/stream")).send().await?;
    let mut body = response.bytes_stream();
    let mut collected = String::new();
    let mut saw_final = false;

    while let Some(chunk_result) = timeout(Duration::from_secs(2), body.next()).await? {
        let chunk = chunk_result?;
        collected.push_str(&String::from_utf8_lossy(&chunk));
        if collected
            .lines()
            .any(|line| line.contains(r#""type":"final""#))
        {
            saw_final = true;
            break;
        }
    }

    assert!(saw_final, "stream should end with a final event");
    for line in collected.lines().filter(|line| !line.is_empty()) {
        let value: serde_json::Value = serde_json::from_str(line)?;
        assert!(value["type"].is_string(), "malformed line: {line}");
    }

    server.abort();
    Ok(())
}
