//! HTTP client for the backend REST endpoints.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::debug;

use storyswap_core::{
    ConversationId, MatchList, Message, Product, ProductId, Role, Session, UserId,
};

use crate::error::ClientError;

/// A user profile as the backend returns it.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    /// Backend user identifier.
    #[serde(rename = "_id")]
    pub id: UserId,
    /// Display name.
    pub name: String,
    /// Account email, when the endpoint exposes it.
    #[serde(default)]
    pub email: Option<String>,
    /// Account role.
    pub role: Role,
}

impl From<UserProfile> for Session {
    fn from(profile: UserProfile) -> Self {
        Session::new(profile.id, profile.name, profile.role)
    }
}

/// Successful login response.
#[derive(Debug, Clone, Deserialize)]
pub struct LoginResponse {
    /// Bearer token to store for subsequent calls.
    pub token: String,
    /// Profile of the logged-in user, when the backend includes it.
    #[serde(default)]
    pub user: Option<UserProfile>,
}

/// Registration request body.
#[derive(Debug, Clone, Serialize)]
pub struct RegisterRequest {
    pub name: String,
    pub email: String,
    pub password: String,
    pub role: Role,
}

// The profile endpoint answers `{ "user": {...} }` in current deployments
// but older ones returned the profile at the top level.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ProfileResponse {
    Wrapped { user: UserProfile },
    Flat(UserProfile),
}

impl ProfileResponse {
    fn into_profile(self) -> UserProfile {
        match self {
            Self::Wrapped { user } => user,
            Self::Flat(profile) => profile,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GetOrCreateResponse {
    conversation_id: ConversationId,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MatchCreatedResponse {
    match_id: String,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: Option<String>,
}

/// REST client for the Storyswap backend.
///
/// Cheap to clone; the bearer token travels with the clone.
#[derive(Debug, Clone)]
pub struct ApiClient {
    inner: reqwest::Client,
    base_url: String,
    token: Option<String>,
}

impl ApiClient {
    /// Create a new client without a credential.
    pub fn new(base_url: &str) -> Self {
        Self {
            inner: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            token: None,
        }
    }

    /// Attach a bearer token for authenticated calls.
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    /// The stored bearer token, if any.
    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    /// Log in with email and password. Unauthenticated.
    pub async fn login(&self, email: &str, password: &str) -> Result<LoginResponse, ClientError> {
        let url = format!("{}/auth/login", self.base_url);
        debug!(url = %url, "POST login");

        let response = self
            .inner
            .post(&url)
            .json(&serde_json::json!({ "email": email, "password": password }))
            .send()
            .await?;
        Self::decode(response).await
    }

    /// Register a new account. Unauthenticated.
    pub async fn register(&self, request: &RegisterRequest) -> Result<(), ClientError> {
        let url = format!("{}/auth/register", self.base_url);
        debug!(url = %url, "POST register");

        let response = self.inner.post(&url).json(request).send().await?;
        let _: ErrorBody = Self::decode(response).await?;
        Ok(())
    }

    /// Fetch the authenticated user's profile.
    pub async fn profile(&self) -> Result<UserProfile, ClientError> {
        let response: ProfileResponse = self.get_json("/auth/profile").await?;
        Ok(response.into_profile())
    }

    /// Fetch another user's profile.
    pub async fn user(&self, id: &UserId) -> Result<UserProfile, ClientError> {
        self.get_json(&format!("/users/{id}")).await
    }

    /// List all products on the storefront.
    pub async fn products(&self) -> Result<Vec<Product>, ClientError> {
        self.get_json("/products").await
    }

    /// Fetch one product.
    pub async fn product(&self, id: &ProductId) -> Result<Product, ClientError> {
        self.get_json(&format!("/products/{id}")).await
    }

    /// Record a swipe-right on a product. Returns the match id.
    pub async fn create_match(&self, product: &ProductId) -> Result<String, ClientError> {
        let url = format!("{}/match/{}", self.base_url, product);
        debug!(url = %url, "POST create match");

        let request = self.authorize(self.inner.post(&url))?;
        let response: MatchCreatedResponse = Self::decode(request.send().await?).await?;
        Ok(response.match_id)
    }

    /// List matches recorded against one of the caller's products.
    pub async fn matches(&self, product: &ProductId) -> Result<MatchList, ClientError> {
        self.get_json(&format!("/match/{product}")).await
    }

    /// Get or lazily create the conversation with a peer, optionally
    /// scoped to one product.
    pub async fn get_or_create_conversation(
        &self,
        receiver: &UserId,
        product: Option<&ProductId>,
    ) -> Result<ConversationId, ClientError> {
        let url = format!("{}/messages/get-or-create", self.base_url);
        debug!(url = %url, receiver = %receiver, "POST get-or-create conversation");

        let body = serde_json::json!({
            "receiverId": receiver,
            "productId": product,
        });
        let request = self.authorize(self.inner.post(&url))?.json(&body);
        let response: GetOrCreateResponse = Self::decode(request.send().await?).await?;
        Ok(response.conversation_id)
    }

    /// Fetch the full ordered history for a conversation.
    pub async fn conversation_messages(
        &self,
        conversation: &ConversationId,
    ) -> Result<Vec<Message>, ClientError> {
        self.get_json(&format!("/messages/{conversation}")).await
    }

    /// GET JSON from an authenticated endpoint.
    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, ClientError> {
        let url = format!("{}{}", self.base_url, path);
        debug!(url = %url, "GET request");

        let request = self.authorize(self.inner.get(&url))?;
        Self::decode(request.send().await?).await
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> Result<reqwest::RequestBuilder, ClientError> {
        match &self.token {
            Some(token) => Ok(request.bearer_auth(token)),
            None => Err(ClientError::NotAuthenticated),
        }
    }

    async fn decode<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, ClientError> {
        let status = response.status();
        if !status.is_success() {
            let message = response
                .json::<ErrorBody>()
                .await
                .ok()
                .and_then(|body| body.message)
                .unwrap_or_else(|| status.to_string());
            return Err(ClientError::Rejected {
                status: status.as_u16(),
                message,
            });
        }

        response
            .json()
            .await
            .map_err(|e| ClientError::Serialization(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_profile_response_wrapped_and_flat() {
        let wrapped = r#"{"user": {"_id": "U1", "name": "Ada", "role": "buyer"}}"#;
        let response: ProfileResponse = serde_json::from_str(wrapped).unwrap();
        assert_eq!(response.into_profile().id, UserId::new("U1"));

        let flat = r#"{"_id": "U1", "name": "Ada", "role": "seller"}"#;
        let response: ProfileResponse = serde_json::from_str(flat).unwrap();
        assert_eq!(response.into_profile().role, Role::Seller);
    }

    #[test]
    fn test_profile_converts_to_session() {
        let profile = UserProfile {
            id: UserId::new("U1"),
            name: "Ada".to_string(),
            email: None,
            role: Role::Buyer,
        };
        let session: Session = profile.into();
        assert_eq!(session.user_id, UserId::new("U1"));
        assert_eq!(session.display_name, "Ada");
    }

    #[test]
    fn test_get_or_create_response_shape() {
        let raw = r#"{"conversationId": "C1"}"#;
        let response: GetOrCreateResponse = serde_json::from_str(raw).unwrap();
        assert_eq!(response.conversation_id, ConversationId::new("C1"));
    }

    #[test]
    fn test_unauthenticated_call_is_rejected_locally() {
        let client = ApiClient::new("http://localhost:4000");
        assert!(matches!(
            client.authorize(client.inner.get("http://localhost:4000/products")),
            Err(ClientError::NotAuthenticated)
        ));
    }
}
