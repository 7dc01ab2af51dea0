use serde::{Deserialize, Serialize};
use serde_json::json;

use super::client::ApiClient;
use super::error::ApiResult;
use crate::models::OwnerRole;

/// Access/refresh token pair issued by `/auth`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
    /// Lifetime of the access token, in seconds
    pub expires_in: u64,
    #[serde(default = "bearer")]
    pub token_type: String,
}

fn bearer() -> String {
    "Bearer".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AuthUser {
    pub id: String,
    pub email: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub role: OwnerRole,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AuthResponse {
    #[serde(flatten)]
    pub tokens: TokenPair,
    #[serde(default)]
    pub user: Option<AuthUser>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub name: String,
    pub email: String,
    pub password: String,
    pub role: OwnerRole,
}

impl ApiClient {
    pub async fn login(&self, email: &str, password: &str) -> ApiResult<AuthResponse> {
        self.post(
            &["auth", "login"],
            &json!({ "email": email, "password": password }),
        )
        .await
    }

    pub async fn register(&self, request: &RegisterRequest) -> ApiResult<AuthResponse> {
        self.post(&["auth", "register"], request).await
    }

    pub async fn refresh_tokens(&self, refresh_token: &str) -> ApiResult<TokenPair> {
        self.post(
            &["auth", "refresh"],
            &json!({ "refreshToken": refresh_token }),
        )
        .await
    }

    pub async fn logout(&self, refresh_token: &str) -> ApiResult<()> {
        self.post(
            &["auth", "logout"],
            &json!({ "refreshToken": refresh_token }),
        )
        .await
    }

    pub async fn current_user(&self) -> ApiResult<AuthUser> {
        self.get(&["auth", "me"], &[]).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn login_response_flattens_tokens() {
        let response: AuthResponse = serde_json::from_value(json!({
            "accessToken": "a",
            "refreshToken": "r",
            "expiresIn": 3600,
            "user": {"id": "u1", "email": "broker@million.test", "role": "Agent"}
        }))
        .unwrap();

        assert_eq!(response.tokens.token_type, "Bearer");
        assert_eq!(response.tokens.expires_in, 3600);
        assert_eq!(response.user.unwrap().role, OwnerRole::Agent);
    }
}
