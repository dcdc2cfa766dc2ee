use std::path::Path;

use crate::api::{ApiClient, ApiError, FilePart, RequestOptions};
use crate::models::Resume;

/// Multipart field name the upload endpoint reads
const UPLOAD_FIELD: &str = "file";

#[derive(Clone)]
pub struct ResumeService {
    client: ApiClient,
}

impl ResumeService {
    pub fn new(client: ApiClient) -> Self {
        Self { client }
    }

    pub async fn list(&self) -> Result<Vec<Resume>, ApiError> {
        self.client.get("/resumes", RequestOptions::new()).await
    }

    pub async fn get(&self, id: i64) -> Result<Resume, ApiError> {
        self.client
            .get(&format!("/resumes/{}", id), RequestOptions::new())
            .await
    }

    /// Upload a resume file. Parsing happens server-side; the response carries the extracted fields.
    pub async fn upload(&self, file_name: &str, bytes: Vec<u8>) -> Result<Resume, ApiError> {
        let part = FilePart {
            field: UPLOAD_FIELD.to_string(),
            file_name: file_name.to_string(),
            mime: mime_for(file_name).to_string(),
            bytes,
        };
        self.client
            .upload("/resumes/upload", part, RequestOptions::new())
            .await
    }

    pub async fn set_primary(&self, id: i64) -> Result<Resume, ApiError> {
        self.client
            .put_empty(&format!("/resumes/{}/primary", id), RequestOptions::new())
            .await
    }

    pub async fn delete(&self, id: i64) -> Result<(), ApiError> {
        let _: serde_json::Value = self
            .client
            .delete(&format!("/resumes/{}", id), RequestOptions::new())
            .await?;
        Ok(())
    }

    /// Raw file contents
    pub async fn download(&self, id: i64) -> Result<Vec<u8>, ApiError> {
        self.client
            .get_bytes(&format!("/resumes/{}/download", id), RequestOptions::new())
            .await
    }
}

/// Content type for the resume formats the backend accepts
fn mime_for(file_name: &str) -> &'static str {
    let extension = Path::new(file_name)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());
    match extension.as_deref() {
        Some("pdf") => "application/pdf",
        Some("doc") => "application/msword",
        Some("docx") => "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        Some("txt") => "text/plain",
        _ => "application/octet-stream",
    }
}
