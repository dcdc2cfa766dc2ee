use serde::Serialize;

use crate::api::{ApiClient, ApiError, RequestOptions};
use crate::models::{Application, ApplicationStatus, ApplyRequest, DashboardStats, Page};

/// Page size used by the application history view
pub const DEFAULT_PAGE_SIZE: u32 = 10;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct BulkApply<'a> {
    platform_ids: &'a [i64],
    resume_id: i64,
}

#[derive(Serialize)]
struct StatusUpdate {
    status: ApplicationStatus,
}

#[derive(Clone)]
pub struct ApplicationService {
    client: ApiClient,
}

impl ApplicationService {
    pub fn new(client: ApiClient) -> Self {
        Self { client }
    }

    /// Application history, newest first. `page` is zero-based.
    pub async fn list(&self, page: u32, size: u32) -> Result<Page<Application>, ApiError> {
        let options = RequestOptions::new().query("page", page).query("size", size);
        self.client.get("/applications", options).await
    }

    pub async fn recent(&self) -> Result<Vec<Application>, ApiError> {
        self.client.get("/applications/recent", RequestOptions::new()).await
    }

    pub async fn get(&self, id: i64) -> Result<Application, ApiError> {
        self.client
            .get(&format!("/applications/{}", id), RequestOptions::new())
            .await
    }

    pub async fn stats(&self) -> Result<DashboardStats, ApiError> {
        self.client.get("/applications/stats", RequestOptions::new()).await
    }

    /// Submit one application per selected platform
    pub async fn apply(&self, request: &ApplyRequest) -> Result<Vec<Application>, ApiError> {
        self.client
            .post("/applications/apply", request, RequestOptions::new())
            .await
    }

    pub async fn bulk_apply(
        &self,
        platform_ids: &[i64],
        resume_id: i64,
    ) -> Result<Vec<Application>, ApiError> {
        let body = BulkApply {
            platform_ids,
            resume_id,
        };
        self.client
            .post("/applications/bulk-apply", &body, RequestOptions::new())
            .await
    }

    pub async fn update_status(
        &self,
        id: i64,
        status: ApplicationStatus,
    ) -> Result<Application, ApiError> {
        self.client
            .patch(
                &format!("/applications/{}/status", id),
                &StatusUpdate { status },
                RequestOptions::new(),
            )
            .await
    }

    pub async fn delete(&self, id: i64) -> Result<(), ApiError> {
        let _: serde_json::Value = self
            .client
            .delete(&format!("/applications/{}", id), RequestOptions::new())
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::testing::{auth_body, StubTransport};
    use crate::api::{HttpAuthApi, LoginCredentials, RequestBody};
    use crate::auth::{MemoryStorage, SessionStore};
    use reqwest::Method;
    use serde_json::json;
    use std::sync::Arc;

    async fn service(stub: &Arc<StubTransport>) -> ApplicationService {
        stub.respond(Method::POST, "/auth/login", 200, auth_body("tok1", "rtok1"));
        let auth = Arc::new(HttpAuthApi::new(stub.clone()));
        let session = Arc::new(SessionStore::restore(auth, Arc::new(MemoryStorage::new())));
        session
            .login(&LoginCredentials::new("a@b.com", "secret"))
            .await
            .unwrap();
        ApplicationService::new(ApiClient::new(stub.clone(), session))
    }

    #[tokio::test]
    async fn test_list_sends_paging_query() {
        let stub = Arc::new(StubTransport::new());
        let applications = service(&stub).await;
        stub.respond(
            Method::GET,
            "/applications",
            200,
            json!({"content": [{"id": 1, "platformId": 2, "status": "SUBMITTED"}], "totalElements": 1, "totalPages": 1, "number": 0, "size": 10}),
        );

        let page = applications.list(0, DEFAULT_PAGE_SIZE).await.unwrap();
        assert_eq!(page.content.len(), 1);
        assert_eq!(page.content[0].status, ApplicationStatus::Submitted);
        assert!(page.is_last());

        let sent = stub.sent_to(Method::GET, "/applications");
        assert_eq!(
            sent[0].query,
            vec![("page".to_string(), "0".to_string()), ("size".to_string(), "10".to_string())]
        );
    }

    #[tokio::test]
    async fn test_update_status_body() {
        let stub = Arc::new(StubTransport::new());
        let applications = service(&stub).await;
        stub.respond(
            Method::PATCH,
            "/applications/4/status",
            200,
            json!({"id": 4, "platformId": 1, "status": "OFFER_RECEIVED"}),
        );

        let updated = applications
            .update_status(4, ApplicationStatus::OfferReceived)
            .await
            .unwrap();
        assert!(updated.status.is_final());

        let sent = stub.sent_to(Method::PATCH, "/applications/4/status");
        assert_eq!(sent[0].body, RequestBody::Json(json!({"status": "OFFER_RECEIVED"})));
    }

    #[tokio::test]
    async fn test_bulk_apply_body() {
        let stub = Arc::new(StubTransport::new());
        let applications = service(&stub).await;
        stub.respond(Method::POST, "/applications/bulk-apply", 200, json!([]));

        let created = applications.bulk_apply(&[1, 3], 7).await.unwrap();
        assert!(created.is_empty());

        let sent = stub.sent_to(Method::POST, "/applications/bulk-apply");
        assert_eq!(
            sent[0].body,
            RequestBody::Json(json!({"platformIds": [1, 3], "resumeId": 7}))
        );
    }

    #[tokio::test]
    async fn test_stats() {
        let stub = Arc::new(StubTransport::new());
        let applications = service(&stub).await;
        stub.respond(
            Method::GET,
            "/applications/stats",
            200,
            json!({"totalApplications": 12, "pendingApplications": 2, "submittedApplications": 8, "interviewsScheduled": 1, "offersReceived": 1, "rejections": 0, "thisWeekApplications": 3, "thisMonthApplications": 9}),
        );

        let stats = applications.stats().await.unwrap();
        assert_eq!(stats.total_applications, 12);
        assert_eq!(stats.this_month_applications, 9);
    }
}
