//! End-to-end runner tests against a local stand-in for the Gemini API.

use std::sync::Arc;
use std::time::Duration;

use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::routing::post;
use axum::Router;
use futures_util::StreamExt;

use wc_agent::{AgentDefinition, AgentRunner, GeminiRunner};
use wc_domain::content::Content;
use wc_domain::stream::RunEvent;
use wc_sessions::{LocalSessionService, SessionService};

const SSE_BODY: &str = concat!(
    "data: {\"candidates\":[{\"content\":{\"role\":\"model\",\"parts\":[{\"text\":\"Photosynthesis converts \"}]},",
    "\"groundingMetadata\":{\"webSearchQueries\":[\"photosynthesis\"]}}]}\n\n",
    "data: {\"candidates\":[{\"content\":{\"role\":\"model\",\"parts\":[{\"text\":\"light into chemical energy.\"}]},",
    "\"groundingMetadata\":{\"webSearchQueries\":[\"photosynthesis\"]},\"finishReason\":\"STOP\"}]}\n\n",
);

async fn serve(app: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}")
}

async fn runner_for(base_url: &str, sessions: Arc<LocalSessionService>) -> GeminiRunner {
    sessions.create_session("app", "1", "abcd1234").await.unwrap();
    GeminiRunner::new(
        "app",
        AgentDefinition::default(),
        base_url,
        "test-key".into(),
        Duration::from_secs(10),
        sessions,
    )
    .unwrap()
}

#[tokio::test]
async fn streams_partials_tool_call_and_final_response() {
    let app = Router::new().route(
        "/v1beta/models/:model",
        post(|| async { ([(header::CONTENT_TYPE, "text/event-stream")], SSE_BODY).into_response() }),
    );
    let base = serve(app).await;
    let sessions = Arc::new(LocalSessionService::in_memory());
    let runner = runner_for(&base, sessions.clone()).await;

    let events: Vec<RunEvent> = runner
        .run("1", "abcd1234", Content::user("What is photosynthesis?"))
        .await
        .unwrap()
        .collect()
        .await;

    let kinds: Vec<_> = events.iter().map(RunEvent::kind).collect();
    assert_eq!(kinds, vec!["tool_call", "partial", "partial", "final_response"]);
    match events.last() {
        Some(RunEvent::FinalResponse { content }) => assert_eq!(
            content.first_text(),
            Some("Photosynthesis converts light into chemical energy.")
        ),
        other => panic!("unexpected last event: {other:?}"),
    }

    let session = sessions
        .get_session("app", "1", "abcd1234")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(session.events.len(), 2);
    assert_eq!(session.events[0].author, "user");
    assert_eq!(session.events[1].author, "wikipedia_analyst");
}

#[tokio::test]
async fn provider_error_status_fails_the_run() {
    let app = Router::new().route(
        "/v1beta/models/:model",
        post(|| async { (StatusCode::FORBIDDEN, "API key not valid") }),
    );
    let base = serve(app).await;
    let runner = runner_for(&base, Arc::new(LocalSessionService::in_memory())).await;

    let err = match runner.run("1", "abcd1234", Content::user("hi")).await {
        Err(e) => e,
        Ok(_) => panic!("expected provider error"),
    };
    let msg = err.to_string();
    assert!(msg.contains("403"), "{msg}");
    assert!(msg.contains("API key not valid"), "{msg}");
}

#[tokio::test]
async fn empty_answer_yields_no_final_response() {
    let app = Router::new().route(
        "/v1beta/models/:model",
        post(|| async {
            (
                [(header::CONTENT_TYPE, "text/event-stream")],
                "data: {\"candidates\":[{\"finishReason\":\"STOP\"}]}\n\n",
            )
        }),
    );
    let base = serve(app).await;
    let runner = runner_for(&base, Arc::new(LocalSessionService::in_memory())).await;

    let events: Vec<RunEvent> = runner
        .run("1", "abcd1234", Content::user("hi"))
        .await
        .unwrap()
        .collect()
        .await;
    assert!(events.is_empty());
}

#[tokio::test]
async fn multibyte_text_split_across_chunks_is_preserved() {
    let app = Router::new().route(
        "/v1beta/models/:model",
        post(|| async {
            let event = concat!(
                "data: {\"candidates\":[{\"content\":{\"role\":\"model\",\"parts\":[{\"text\":\"Café in Zürich\"}]},",
                "\"finishReason\":\"STOP\"}]}\n\n",
            )
            .as_bytes();
            // Split inside the two-byte 'é'.
            let split = event
                .iter()
                .position(|&b| b == 0xC3)
                .expect("event contains a multi-byte character")
                + 1;
            let (head, tail) = (event[..split].to_vec(), event[split..].to_vec());
            let body = async_stream::stream! {
                yield Ok::<_, std::io::Error>(head);
                tokio::time::sleep(Duration::from_millis(50)).await;
                yield Ok(tail);
            };
            (
                [(header::CONTENT_TYPE, "text/event-stream")],
                axum::body::Body::from_stream(body),
            )
                .into_response()
        }),
    );
    let base = serve(app).await;
    let sessions = Arc::new(LocalSessionService::in_memory());
    let runner = runner_for(&base, sessions.clone()).await;

    let events: Vec<RunEvent> = runner
        .run("1", "abcd1234", Content::user("Where is the café?"))
        .await
        .unwrap()
        .collect()
        .await;

    match events.last() {
        Some(RunEvent::FinalResponse { content }) => {
            assert_eq!(content.first_text(), Some("Café in Zürich"))
        }
        other => panic!("unexpected last event: {other:?}"),
    }
    let session = sessions
        .get_session("app", "1", "abcd1234")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(session.events[1].content.first_text(), Some("Café in Zürich"));
}
