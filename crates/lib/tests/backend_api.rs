//! Integration test: start a mock backend on a free port and drive the API
//! client through every endpoint, including the multipart document upload.
//! Does not require a real retrieval service.

use std::sync::{Arc, Mutex};

use axum::extract::{Multipart, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use lib::api::{ApiClient, ApiError};
use lib::snapshot::{DocumentBlobs, KnowledgeBase, ModelSelection};

/// Everything the mock backend records for assertions.
#[derive(Default)]
struct MockState {
    saved_selection: Option<ModelSelection>,
    uploaded_files: Vec<(String, Vec<u8>)>,
    uploaded_prompt: Option<String>,
    uploaded_list: Option<String>,
    suspense: bool,
    asked: Vec<String>,
}

type Shared = Arc<Mutex<MockState>>;

async fn get_models() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "model_support": [
            {
                "provider": "A",
                "llm_model": ["m1", "m2"],
                "emb_model": ["e1"],
                "prov_intro": "Provider A"
            },
            {
                "provider": "B",
                "llm_model": ["n1"],
                "emb_model": ["f1"]
            }
        ],
        "model_select": {
            "llm_provider": "A",
            "llm_model": "m1",
            "emb_provider": "A",
            "emb_model": "e1"
        }
    }))
}

async fn post_models(
    State(state): State<Shared>,
    Json(selection): Json<ModelSelection>,
) -> Json<serde_json::Value> {
    let mut g = state.lock().unwrap();
    g.saved_selection = Some(selection);
    g.suspense = true;
    Json(serde_json::json!({
        "status_ok": true,
        "message": "Configuration updated successfully"
    }))
}

async fn get_documents() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "documents": ["old.txt"],
        "system_prompt": "you are a helpful assistant"
    }))
}

async fn upload_documents(State(state): State<Shared>, mut multipart: Multipart) {
    let mut files = Vec::new();
    let mut prompt = None;
    let mut list = None;
    while let Some(field) = multipart.next_field().await.expect("read multipart field") {
        match field.name().unwrap_or_default() {
            "doc_blob_list" => {
                let name = field.file_name().unwrap_or_default().to_string();
                let bytes = field.bytes().await.expect("read file bytes").to_vec();
                files.push((name, bytes));
            }
            "system_prompt" => {
                prompt = Some(field.text().await.expect("read system_prompt"));
            }
            "document_list" => {
                list = Some(field.text().await.expect("read document_list"));
            }
            other => panic!("unexpected multipart field: {}", other),
        }
    }
    let mut g = state.lock().unwrap();
    g.uploaded_files = files;
    g.uploaded_prompt = prompt;
    g.uploaded_list = list;
    g.suspense = true;
}

async fn config_apply(State(state): State<Shared>) -> Json<serde_json::Value> {
    state.lock().unwrap().suspense = false;
    Json(serde_json::json!({ "status_ok": true }))
}

async fn config_suspense(State(state): State<Shared>) -> Json<serde_json::Value> {
    let suspense = state.lock().unwrap().suspense;
    Json(serde_json::json!({ "suspense": suspense }))
}

async fn ask(
    State(state): State<Shared>,
    Json(body): Json<serde_json::Value>,
) -> Result<Json<serde_json::Value>, (axum::http::StatusCode, String)> {
    let question = body
        .get("question")
        .and_then(|v| v.as_str())
        .unwrap_or_default()
        .to_string();
    assert!(body.get("session_id").and_then(|v| v.as_str()).is_some());
    if question == "boom" {
        return Err((
            axum::http::StatusCode::INTERNAL_SERVER_ERROR,
            "retrieval chain failed".to_string(),
        ));
    }
    state.lock().unwrap().asked.push(question.clone());
    Ok(Json(serde_json::json!({
        "answer": format!("echo: {}", question),
        "think": "considered the knowledge base"
    })))
}

/// Start the mock backend on an ephemeral port; returns its base URL and state.
async fn spawn_mock() -> (String, Shared) {
    let state: Shared = Arc::new(Mutex::new(MockState::default()));
    let app = Router::new()
        .route("/api/models", get(get_models).post(post_models))
        .route("/api/documents", get(get_documents))
        .route("/api/upload-documents", post(upload_documents))
        .route("/api/config-apply", post(config_apply))
        .route("/api/config-suspense", get(config_suspense))
        .route("/ask", post(ask))
        .with_state(state.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind mock backend");
    let addr = listener.local_addr().expect("local_addr");
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    (format!("http://{}", addr), state)
}

#[tokio::test]
async fn model_catalog_roundtrip() {
    let (base, state) = spawn_mock().await;
    let client = ApiClient::new(base);

    let catalog = client.fetch_models().await.expect("fetch models");
    assert_eq!(catalog.model_support.len(), 2);
    assert_eq!(catalog.model_select.llm_provider, "A");
    assert_eq!(catalog.model_select.llm_model, "m1");

    let new_selection = ModelSelection {
        llm_provider: "B".to_string(),
        llm_model: "n1".to_string(),
        emb_provider: "B".to_string(),
        emb_model: "f1".to_string(),
    };
    let reply = client.save_models(&new_selection).await.expect("save models");
    assert!(reply.status_ok);
    assert_eq!(
        state.lock().unwrap().saved_selection.as_ref(),
        Some(&new_selection)
    );
}

#[tokio::test]
async fn document_upload_carries_blobs_and_list() {
    let (base, state) = spawn_mock().await;
    let client = ApiClient::new(base);

    let fetched = client.fetch_documents().await.expect("fetch documents");
    assert_eq!(fetched.documents, vec!["old.txt"]);

    let mut knowledge = KnowledgeBase::new(fetched.system_prompt, fetched.documents);
    knowledge.add_document("doc1.txt");
    let mut blobs = DocumentBlobs::default();
    blobs.insert("doc1.txt", b"doc one contents".to_vec());

    client
        .upload_documents(&knowledge, &blobs)
        .await
        .expect("upload documents");

    let g = state.lock().unwrap();
    // Only the locally picked file travels as a blob; "old.txt" is already
    // server-side and appears in the list only.
    assert_eq!(
        g.uploaded_files,
        vec![("doc1.txt".to_string(), b"doc one contents".to_vec())]
    );
    assert_eq!(g.uploaded_prompt.as_deref(), Some("you are a helpful assistant"));
    assert_eq!(g.uploaded_list.as_deref(), Some("old.txt,doc1.txt"));
}

#[tokio::test]
async fn apply_clears_suspense_flag() {
    let (base, _state) = spawn_mock().await;
    let client = ApiClient::new(base);

    // A model save leaves a pending change behind.
    let selection = ModelSelection {
        llm_provider: "A".to_string(),
        llm_model: "m2".to_string(),
        emb_provider: "A".to_string(),
        emb_model: "e1".to_string(),
    };
    client.save_models(&selection).await.expect("save models");
    assert!(client.fetch_suspense().await.expect("fetch suspense"));

    assert!(client.apply_config().await.expect("apply config"));
    assert!(!client.fetch_suspense().await.expect("fetch suspense"));
}

#[tokio::test]
async fn ask_returns_answer_and_reasoning() {
    let (base, state) = spawn_mock().await;
    let client = ApiClient::new(base);

    let reply = client.ask("what is unichat?", "sess-test").await.expect("ask");
    assert_eq!(reply.answer, "echo: what is unichat?");
    assert_eq!(reply.think.as_deref(), Some("considered the knowledge base"));
    assert_eq!(state.lock().unwrap().asked, vec!["what is unichat?"]);
}

#[tokio::test]
async fn server_error_is_surfaced_with_status_and_body() {
    let (base, _state) = spawn_mock().await;
    let client = ApiClient::new(base);

    let err = client.ask("boom", "sess-test").await.unwrap_err();
    match err {
        ApiError::Server { status, body } => {
            assert_eq!(status, 500);
            assert!(body.contains("retrieval chain failed"));
        }
        other => panic!("expected server error, got {:?}", other),
    }
}
