//! Backend REST client (http://127.0.0.1:8000 by default).
//!
//! One canonical wire contract: model saves go through POST /api/models and
//! document uploads always through POST /api/upload-documents with file parts
//! named `doc_blob_list`. Names already stored on the server travel only in
//! the comma-joined `document_list` form field.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::config::{self, Config};
use crate::snapshot::{DocumentBlobs, KnowledgeBase, ModelSelection};

/// Client for the retrieval/chat backend HTTP API.
#[derive(Clone)]
pub struct ApiClient {
    base_url: String,
    client: reqwest::Client,
}

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("backend request failed: {0}")]
    Network(#[from] reqwest::Error),
    #[error("backend error: {status} {body}")]
    Server { status: u16, body: String },
    #[error("{0}")]
    Validation(String),
}

/// One provider's catalog entry: selectable LLM and embedding models plus an intro blurb.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderSupport {
    pub provider: String,
    #[serde(default)]
    pub llm_model: Vec<String>,
    #[serde(default)]
    pub emb_model: Vec<String>,
    #[serde(default)]
    pub prov_intro: Option<String>,
}

/// GET /api/models response: full catalog plus the server's current selection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelCatalogResponse {
    pub model_support: Vec<ProviderSupport>,
    pub model_select: ModelSelection,
}

/// POST /api/models and /api/config-apply response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusReply {
    pub status_ok: bool,
    #[serde(default)]
    pub message: String,
}

/// GET /api/documents response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentsResponse {
    #[serde(default)]
    pub documents: Vec<String>,
    #[serde(default)]
    pub system_prompt: String,
}

#[derive(Debug, Deserialize)]
struct SuspenseResponse {
    #[serde(default)]
    suspense: bool,
}

#[derive(Debug, Serialize)]
struct AskRequest {
    question: String,
    session_id: String,
}

/// POST /ask response: the answer text, optionally with a separate reasoning section.
#[derive(Debug, Clone, Deserialize)]
pub struct AskResponse {
    pub answer: String,
    #[serde(default)]
    pub think: Option<String>,
}

impl ApiClient {
    /// Build a client against the resolved base URL with the configured timeout.
    pub fn from_config(config: &Config) -> Result<Self, ApiError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.backend.request_timeout_secs))
            .build()?;
        Ok(Self {
            base_url: config::resolve_base_url(config),
            client,
        })
    }

    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client: reqwest::Client::new(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// GET /api/models — provider/model catalog and current selection.
    pub async fn fetch_models(&self) -> Result<ModelCatalogResponse, ApiError> {
        let url = format!("{}/api/models", self.base_url);
        let res = self.client.get(&url).send().await?;
        if !res.status().is_success() {
            let status = res.status().as_u16();
            let body = res.text().await.unwrap_or_default();
            return Err(ApiError::Server { status, body });
        }
        let data: ModelCatalogResponse = res.json().await?;
        Ok(data)
    }

    /// POST /api/models — save the model selection. All four fields must be non-empty.
    pub async fn save_models(&self, selection: &ModelSelection) -> Result<StatusReply, ApiError> {
        if !selection.is_complete() {
            return Err(ApiError::Validation(
                "all provider and model fields must be selected".to_string(),
            ));
        }
        let url = format!("{}/api/models", self.base_url);
        let res = self.client.post(&url).json(selection).send().await?;
        if !res.status().is_success() {
            let status = res.status().as_u16();
            let body = res.text().await.unwrap_or_default();
            return Err(ApiError::Server { status, body });
        }
        let data: StatusReply = res.json().await?;
        Ok(data)
    }

    /// GET /api/documents — stored document names and system prompt.
    pub async fn fetch_documents(&self) -> Result<DocumentsResponse, ApiError> {
        let url = format!("{}/api/documents", self.base_url);
        let res = self.client.get(&url).send().await?;
        if !res.status().is_success() {
            let status = res.status().as_u16();
            let body = res.text().await.unwrap_or_default();
            return Err(ApiError::Server { status, body });
        }
        let data: DocumentsResponse = res.json().await?;
        Ok(data)
    }

    /// POST /api/upload-documents — multipart upload of the knowledge base.
    ///
    /// Sends a `doc_blob_list` file part for every document whose bytes are
    /// held locally, plus `system_prompt` and the comma-joined `document_list`.
    /// The server drops stored files absent from `document_list`.
    pub async fn upload_documents(
        &self,
        knowledge: &KnowledgeBase,
        blobs: &DocumentBlobs,
    ) -> Result<(), ApiError> {
        let system_prompt = knowledge.system_prompt.trim();
        if system_prompt.is_empty() {
            return Err(ApiError::Validation(
                "system prompt must not be empty".to_string(),
            ));
        }
        if knowledge.documents.is_empty() && blobs.is_empty() {
            return Err(ApiError::Validation(
                "add at least one document before saving".to_string(),
            ));
        }

        let mut form = reqwest::multipart::Form::new();
        for name in &knowledge.documents {
            if let Some(bytes) = blobs.get(name) {
                let part = reqwest::multipart::Part::bytes(bytes.to_vec())
                    .file_name(name.clone());
                form = form.part("doc_blob_list", part);
            }
        }
        form = form
            .text("system_prompt", system_prompt.to_string())
            .text("document_list", knowledge.documents.join(","));

        let url = format!("{}/api/upload-documents", self.base_url);
        let res = self.client.post(&url).multipart(form).send().await?;
        if !res.status().is_success() {
            let status = res.status().as_u16();
            let body = res.text().await.unwrap_or_default();
            return Err(ApiError::Server { status, body });
        }
        Ok(())
    }

    /// POST /api/config-apply — apply the pending server-side configuration.
    pub async fn apply_config(&self) -> Result<bool, ApiError> {
        let url = format!("{}/api/config-apply", self.base_url);
        let res = self
            .client
            .post(&url)
            .json(&serde_json::json!({}))
            .send()
            .await?;
        if !res.status().is_success() {
            let status = res.status().as_u16();
            let body = res.text().await.unwrap_or_default();
            return Err(ApiError::Server { status, body });
        }
        let data: StatusReply = res.json().await?;
        Ok(data.status_ok)
    }

    /// GET /api/config-suspense — true when a saved config has not been applied yet.
    pub async fn fetch_suspense(&self) -> Result<bool, ApiError> {
        let url = format!("{}/api/config-suspense", self.base_url);
        let res = self.client.get(&url).send().await?;
        if !res.status().is_success() {
            let status = res.status().as_u16();
            let body = res.text().await.unwrap_or_default();
            return Err(ApiError::Server { status, body });
        }
        let data: SuspenseResponse = res.json().await?;
        Ok(data.suspense)
    }

    /// POST /ask — submit a chat question for the given session.
    pub async fn ask(
        &self,
        question: impl Into<String>,
        session_id: impl Into<String>,
    ) -> Result<AskResponse, ApiError> {
        let url = format!("{}/ask", self.base_url);
        let body = AskRequest {
            question: question.into(),
            session_id: session_id.into(),
        };
        let res = self.client.post(&url).json(&body).send().await?;
        if !res.status().is_success() {
            let status = res.status().as_u16();
            let body = res.text().await.unwrap_or_default();
            return Err(ApiError::Server { status, body });
        }
        let data: AskResponse = res.json().await?;
        Ok(data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn save_models_rejects_incomplete_selection() {
        let client = ApiClient::new("http://127.0.0.1:1");
        let selection = ModelSelection {
            llm_provider: "openai".to_string(),
            llm_model: String::new(),
            emb_provider: "openai".to_string(),
            emb_model: "text-embedding-3-small".to_string(),
        };
        let err = client.save_models(&selection).await.unwrap_err();
        assert!(matches!(err, ApiError::Validation(_)));
    }

    #[tokio::test]
    async fn upload_rejects_blank_system_prompt() {
        let client = ApiClient::new("http://127.0.0.1:1");
        let mut knowledge = KnowledgeBase::default();
        knowledge.add_document("doc1.txt");
        knowledge.system_prompt = "   ".to_string();
        let err = client
            .upload_documents(&knowledge, &DocumentBlobs::default())
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Validation(_)));
    }

    #[tokio::test]
    async fn upload_rejects_empty_document_set() {
        let client = ApiClient::new("http://127.0.0.1:1");
        let mut knowledge = KnowledgeBase::default();
        knowledge.system_prompt = "you are a helpful assistant".to_string();
        let err = client
            .upload_documents(&knowledge, &DocumentBlobs::default())
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Validation(_)));
    }

    #[test]
    fn new_trims_trailing_slash() {
        let client = ApiClient::new("http://backend:8000/");
        assert_eq!(client.base_url(), "http://backend:8000");
    }
}
