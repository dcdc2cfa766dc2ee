use reqwest::header::{self, HeaderMap, HeaderName, HeaderValue};
use reqwest::{Method, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;

use super::ApiError;

/// A file attached to a multipart request. Bytes are owned so a replay can rebuild the form.
#[derive(Debug, Clone, PartialEq)]
pub struct FilePart {
    pub field: String,
    pub file_name: String,
    pub mime: String,
    pub bytes: Vec<u8>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub enum RequestBody {
    #[default]
    Empty,
    Json(serde_json::Value),
    Multipart(FilePart),
}

/// One outbound call, replayable as-is.
#[derive(Debug, Clone)]
pub struct ApiRequest {
    pub method: Method,
    /// Path relative to the API base URL, e.g. `/resumes`
    pub path: String,
    pub query: Vec<(String, String)>,
    pub headers: HeaderMap,
    pub body: RequestBody,
    /// Set once the request has gone through a refresh-and-replay cycle
    pub retried: bool,
}

impl ApiRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            headers: HeaderMap::new(),
            body: RequestBody::Empty,
            retried: false,
        }
    }

    pub fn json<B: Serialize + ?Sized>(mut self, body: &B) -> Result<Self, ApiError> {
        let value = serde_json::to_value(body)
            .map_err(|e| ApiError::InvalidResponse(format!("Failed to encode request body: {}", e)))?;
        self.body = RequestBody::Json(value);
        Ok(self)
    }

    pub fn multipart(mut self, part: FilePart) -> Self {
        self.body = RequestBody::Multipart(part);
        self
    }

    pub fn with_options(mut self, options: RequestOptions) -> Self {
        self.query.extend(options.query);
        for (name, value) in options.headers.iter() {
            self.headers.insert(name.clone(), value.clone());
        }
        self
    }

    /// Replace any existing `Authorization` header with a bearer credential.
    pub fn set_bearer(&mut self, token: &str) -> Result<(), ApiError> {
        let value = HeaderValue::from_str(&format!("Bearer {}", token))?;
        self.headers.insert(header::AUTHORIZATION, value);
        Ok(())
    }

    pub fn bearer(&self) -> Option<&str> {
        self.headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "))
    }
}

/// Per-call configuration: extra headers and query parameters.
#[derive(Debug, Clone, Default)]
pub struct RequestOptions {
    headers: HeaderMap,
    query: Vec<(String, String)>,
}

impl RequestOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn query(mut self, key: &str, value: impl ToString) -> Self {
        self.query.push((key.to_string(), value.to_string()));
        self
    }

    pub fn header(mut self, name: HeaderName, value: &str) -> Result<Self, ApiError> {
        self.headers.insert(name, HeaderValue::from_str(value)?);
        Ok(self)
    }
}

/// A fully-read response.
#[derive(Debug, Clone)]
pub struct ApiResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Vec<u8>,
}

impl ApiResponse {
    pub fn new(status: StatusCode, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            headers: HeaderMap::new(),
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    /// Decode the body as JSON. An empty body decodes as `null`, so `()` and `Option<T>` work.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, ApiError> {
        let body: &[u8] = if self.body.is_empty() { b"null" } else { &self.body };
        serde_json::from_slice(body)
            .map_err(|e| ApiError::InvalidResponse(format!("Failed to parse JSON response: {}", e)))
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.body
    }

    /// Turn a non-success response into the matching `ApiError`.
    pub fn error_for_status(self) -> Result<Self, ApiError> {
        if self.is_success() {
            Ok(self)
        } else {
            Err(ApiError::from_status(self.status, &self.body))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_bearer_overwrites() {
        let mut request = ApiRequest::new(Method::GET, "/resumes");
        request.set_bearer("tok1").unwrap();
        request.set_bearer("tok2").unwrap();
        assert_eq!(request.bearer(), Some("tok2"));
        assert_eq!(request.headers.get_all(header::AUTHORIZATION).iter().count(), 1);
    }

    #[test]
    fn test_with_options() {
        let options = RequestOptions::new()
            .query("page", 2)
            .query("size", 10)
            .header(HeaderName::from_static("x-client"), "cli")
            .unwrap();
        let request = ApiRequest::new(Method::GET, "/applications").with_options(options);
        assert_eq!(
            request.query,
            vec![("page".to_string(), "2".to_string()), ("size".to_string(), "10".to_string())]
        );
        assert_eq!(request.headers.get("x-client").unwrap(), "cli");
        assert!(!request.retried);
    }

    #[test]
    fn test_response_json_empty_body() {
        let response = ApiResponse::new(StatusCode::NO_CONTENT, Vec::new());
        let value: Option<i32> = response.json().unwrap();
        assert_eq!(value, None);
    }

    #[test]
    fn test_error_for_status() {
        let response = ApiResponse::new(StatusCode::NOT_FOUND, r#"{"message":"Resume not found"}"#);
        let err = response.error_for_status().unwrap_err();
        assert!(matches!(err, ApiError::NotFound(ref body) if body.message.as_deref() == Some("Resume not found")));
    }
}
