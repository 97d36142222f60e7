//! Strategy endpoints
//!
//! Strategies are deserialized as [`RawStrategy`] and normalized here, so the
//! rest of the crate only ever sees [`Strategy`] with typed triggers.

use super::client::{resource_path, ApiClient};
use crate::error::ClientError;
use crate::types::{NewStrategy, RawStrategy, Strategy};

#[derive(Clone)]
pub struct StrategiesApi {
    client: ApiClient,
}

impl StrategiesApi {
    pub fn new(client: ApiClient) -> Self {
        Self { client }
    }

    pub async fn list(&self) -> Result<Vec<Strategy>, ClientError> {
        let raw: Vec<RawStrategy> = self.client.get("/strategies", Some("strategies")).await?;
        Ok(raw.into_iter().map(Strategy::from).collect())
    }

    pub async fn get(&self, id: &str) -> Result<Strategy, ClientError> {
        let raw: RawStrategy = self
            .client
            .get(&resource_path("strategies", id)?, Some("strategy"))
            .await?;
        Ok(raw.into())
    }

    pub async fn create(&self, strategy: &NewStrategy) -> Result<Strategy, ClientError> {
        if strategy.name.trim().is_empty() {
            return Err(ClientError::Validation("strategy name is required".to_string()));
        }
        let raw: RawStrategy = self
            .client
            .post("/strategies", strategy, Some("strategy"))
            .await?;
        Ok(raw.into())
    }

    pub async fn update(&self, id: &str, strategy: &NewStrategy) -> Result<Strategy, ClientError> {
        let raw: RawStrategy = self
            .client
            .put(&resource_path("strategies", id)?, strategy, Some("strategy"))
            .await?;
        Ok(raw.into())
    }

    pub async fn delete(&self, id: &str) -> Result<(), ClientError> {
        self.client.delete(&resource_path("strategies", id)?).await
    }
}
