use crate::api::{ApiClient, ApiError, RequestOptions};
use crate::models::Platform;

#[derive(Clone)]
pub struct PlatformService {
    client: ApiClient,
}

impl PlatformService {
    pub fn new(client: ApiClient) -> Self {
        Self { client }
    }

    pub async fn list(&self) -> Result<Vec<Platform>, ApiError> {
        self.client.get("/platforms", RequestOptions::new()).await
    }

    pub async fn get(&self, id: i64) -> Result<Platform, ApiError> {
        self.client
            .get(&format!("/platforms/{}", id), RequestOptions::new())
            .await
    }

    /// Platforms currently accepting applications
    pub async fn active(&self) -> Result<Vec<Platform>, ApiError> {
        self.client.get("/platforms/active", RequestOptions::new()).await
    }
}
