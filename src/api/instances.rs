//! Instance endpoints

use super::client::{resource_path, ApiClient};
use crate::error::ClientError;
use crate::types::{Instance, NewInstance};

#[derive(Clone)]
pub struct InstancesApi {
    client: ApiClient,
}

impl InstancesApi {
    pub fn new(client: ApiClient) -> Self {
        Self { client }
    }

    /// `GET /instances`
    pub async fn list(&self) -> Result<Vec<Instance>, ClientError> {
        self.client.get("/instances", Some("instances")).await
    }

    /// `GET /instances/:id`
    pub async fn get(&self, id: &str) -> Result<Instance, ClientError> {
        self.client
            .get(&resource_path("instances", id)?, Some("instance"))
            .await
    }

    /// `POST /instances`
    pub async fn create(&self, instance: &NewInstance) -> Result<Instance, ClientError> {
        instance.validate().map_err(ClientError::Validation)?;
        self.client
            .post("/instances", instance, Some("instance"))
            .await
    }

    /// `PUT /instances/:id`
    pub async fn update(&self, id: &str, instance: &NewInstance) -> Result<Instance, ClientError> {
        instance.validate().map_err(ClientError::Validation)?;
        self.client
            .put(&resource_path("instances", id)?, instance, Some("instance"))
            .await
    }

    /// `DELETE /instances/:id`
    pub async fn delete(&self, id: &str) -> Result<(), ClientError> {
        self.client.delete(&resource_path("instances", id)?).await
    }
}
