//! Authentication endpoints

use super::client::ApiClient;
use crate::error::ClientError;
use crate::types::{AuthResponse, RegisterRequest};
use reqwest::Method;
use serde_json::json;

#[derive(Clone)]
pub struct AuthApi {
    client: ApiClient,
}

impl AuthApi {
    pub fn new(client: ApiClient) -> Self {
        Self { client }
    }

    /// `POST /auth/login`. A `success: false` body is an error.
    pub async fn login(&self, email: &str, password: &str) -> Result<AuthResponse, ClientError> {
        let response: AuthResponse = self
            .client
            .post(
                "/auth/login",
                &json!({ "email": email, "password": password }),
                None,
            )
            .await?;
        check_success(response, "Login failed")
    }

    /// `POST /auth/register`. The token may be absent while the account
    /// awaits approval.
    pub async fn register(&self, request: &RegisterRequest) -> Result<AuthResponse, ClientError> {
        let response: AuthResponse = self.client.post("/auth/register", request, None).await?;
        check_success(response, "Registration failed")
    }

    /// `POST /auth/logout`
    pub async fn logout(&self) -> Result<(), ClientError> {
        self.client
            .request(Method::POST, "/auth/logout", None)
            .await?;
        Ok(())
    }
}

fn check_success(response: AuthResponse, fallback: &str) -> Result<AuthResponse, ClientError> {
    if response.success {
        return Ok(response);
    }
    Err(ClientError::Rejected(
        response.message.unwrap_or_else(|| fallback.to_string()),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_success() {
        let ok = AuthResponse {
            success: true,
            ..Default::default()
        };
        assert!(check_success(ok, "x").is_ok());

        let rejected = AuthResponse {
            success: false,
            message: Some("Invalid credentials".to_string()),
            ..Default::default()
        };
        match check_success(rejected, "x") {
            Err(ClientError::Rejected(message)) => assert_eq!(message, "Invalid credentials"),
            other => panic!("unexpected: {other:?}"),
        }

        match check_success(AuthResponse::default(), "Login failed") {
            Err(ClientError::Rejected(message)) => assert_eq!(message, "Login failed"),
            other => panic!("unexpected: {other:?}"),
        }
    }
}
