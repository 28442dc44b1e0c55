use async_trait::async_trait;
use axum::http::{HeaderValue, header};
use serde::de::DeserializeOwned;
use std::sync::Arc;

use crate::{
    error::ApiError,
    models::{
        Client, ClientDetail, ContactInquiry, LoginRequest, MealPlanUpdate, NewClient,
        UpdateClient, UpdatedClient, WeightEntry, WeightLog,
    },
    session::{Credentials, MeResponse, Role},
};

/// AuthOutcome
///
/// Result of a login or logout call: the cookies the API wants set on the viewer,
/// plus the role when the API echoes the signed-in user.
#[derive(Debug, Clone)]
pub struct AuthOutcome {
    pub set_cookies: Vec<HeaderValue>,
    pub role: Option<Role>,
}

/// PortalApi Trait
///
/// Every remote operation the portal pages depend on. Handlers only see this
/// trait, so tests substitute an in-memory implementation for the HTTP one.
/// All calls forward the viewer's credentials.
#[async_trait]
pub trait PortalApi: Send + Sync {
    // --- Public ---
    async fn login(&self, request: &LoginRequest) -> Result<AuthOutcome, ApiError>;
    async fn logout(&self, credentials: &Credentials) -> Result<AuthOutcome, ApiError>;
    async fn submit_contact(&self, inquiry: &ContactInquiry) -> Result<(), ApiError>;

    // --- Client portal ---
    async fn my_profile(&self, credentials: &Credentials) -> Result<ClientDetail, ApiError>;
    async fn my_weight_logs(&self, credentials: &Credentials) -> Result<Vec<WeightLog>, ApiError>;
    async fn log_weight(&self, credentials: &Credentials, weight: f64) -> Result<(), ApiError>;

    // --- Admin portal ---
    async fn list_clients(&self, credentials: &Credentials) -> Result<Vec<Client>, ApiError>;
    /// `Ok(None)` when the API does not know the identifier.
    async fn get_client(
        &self,
        credentials: &Credentials,
        client_id: &str,
    ) -> Result<Option<ClientDetail>, ApiError>;
    async fn create_client(
        &self,
        credentials: &Credentials,
        client: &NewClient,
    ) -> Result<(), ApiError>;
    async fn update_client(
        &self,
        credentials: &Credentials,
        client_id: &str,
        update: &UpdateClient,
    ) -> Result<ClientDetail, ApiError>;
    async fn client_weight_logs(
        &self,
        credentials: &Credentials,
        client_id: &str,
    ) -> Result<Vec<WeightLog>, ApiError>;
    async fn update_meal_plan(
        &self,
        credentials: &Credentials,
        client_id: &str,
        meal_plan: &str,
    ) -> Result<(), ApiError>;
}

/// ApiState
///
/// The concrete type used to share remote API access across the application state.
pub type ApiState = Arc<dyn PortalApi>;

/// HttpPortalApi
///
/// `PortalApi` over the remote JSON API using a shared `reqwest::Client`.
#[derive(Clone)]
pub struct HttpPortalApi {
    client: reqwest::Client,
    base_url: String,
}

impl HttpPortalApi {
    pub fn new(client: reqwest::Client, base_url: &str) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// `/admin/users/{client_id}[/{suffix}]` with the identifier percent-encoded as a
    /// single path segment. The identifier itself is not validated.
    fn client_url(&self, client_id: &str, suffix: Option<&str>) -> Result<reqwest::Url, ApiError> {
        let mut url = reqwest::Url::parse(&self.url("/admin/users"))
            .map_err(|e| ApiError::InvalidUrl(e.to_string()))?;
        {
            let mut segments = url
                .path_segments_mut()
                .map_err(|()| ApiError::InvalidUrl(self.base_url.clone()))?;
            segments.push(client_id);
            if let Some(suffix) = suffix {
                segments.push(suffix);
            }
        }
        Ok(url)
    }

    /// Sends a request and fails on transport errors and non-2xx statuses.
    async fn send(&self, request: reqwest::RequestBuilder) -> Result<reqwest::Response, ApiError> {
        let response = request.send().await.map_err(ApiError::Transport)?;
        if response.status().is_success() {
            Ok(response)
        } else {
            Err(ApiError::from_response(response).await)
        }
    }

    async fn fetch<T: DeserializeOwned>(
        &self,
        request: reqwest::RequestBuilder,
    ) -> Result<T, ApiError> {
        self.send(request)
            .await?
            .json::<T>()
            .await
            .map_err(ApiError::Decode)
    }
}

/// Collects every `Set-Cookie` header and, if the body is a `MeResponse`, the role.
async fn auth_outcome(response: reqwest::Response) -> AuthOutcome {
    let set_cookies = response
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .cloned()
        .collect();
    let role = response
        .json::<MeResponse>()
        .await
        .ok()
        .map(|me| me.user.role);
    AuthOutcome { set_cookies, role }
}

#[async_trait]
impl PortalApi for HttpPortalApi {
    async fn login(&self, request: &LoginRequest) -> Result<AuthOutcome, ApiError> {
        let response = self
            .send(self.client.post(self.url("/auth/login")).json(request))
            .await?;
        Ok(auth_outcome(response).await)
    }

    async fn logout(&self, credentials: &Credentials) -> Result<AuthOutcome, ApiError> {
        let response = self
            .send(credentials.apply(self.client.post(self.url("/auth/logout"))))
            .await?;
        Ok(auth_outcome(response).await)
    }

    async fn submit_contact(&self, inquiry: &ContactInquiry) -> Result<(), ApiError> {
        self.send(self.client.post(self.url("/contact/detail")).json(inquiry))
            .await?;
        Ok(())
    }

    async fn my_profile(&self, credentials: &Credentials) -> Result<ClientDetail, ApiError> {
        self.fetch(credentials.apply(self.client.get(self.url("/client/me"))))
            .await
    }

    async fn my_weight_logs(&self, credentials: &Credentials) -> Result<Vec<WeightLog>, ApiError> {
        self.fetch(credentials.apply(self.client.get(self.url("/client/me/weight-log"))))
            .await
    }

    async fn log_weight(&self, credentials: &Credentials, weight: f64) -> Result<(), ApiError> {
        let request = self
            .client
            .post(self.url("/client/me/weight-log"))
            .json(&WeightEntry { weight });
        self.send(credentials.apply(request)).await?;
        Ok(())
    }

    async fn list_clients(&self, credentials: &Credentials) -> Result<Vec<Client>, ApiError> {
        self.fetch(credentials.apply(self.client.get(self.url("/admin/users"))))
            .await
    }

    async fn get_client(
        &self,
        credentials: &Credentials,
        client_id: &str,
    ) -> Result<Option<ClientDetail>, ApiError> {
        let request = self
            .client
            .get(self.client_url(client_id, None)?);
        match self.fetch(credentials.apply(request)).await {
            Ok(detail) => Ok(Some(detail)),
            Err(e) if e.is_not_found() => Ok(None),
            Err(e) => Err(e),
        }
    }

    async fn create_client(
        &self,
        credentials: &Credentials,
        client: &NewClient,
    ) -> Result<(), ApiError> {
        let request = self.client.post(self.url("/admin/users")).json(client);
        self.send(credentials.apply(request)).await?;
        Ok(())
    }

    async fn update_client(
        &self,
        credentials: &Credentials,
        client_id: &str,
        update: &UpdateClient,
    ) -> Result<ClientDetail, ApiError> {
        let request = self
            .client
            .put(self.client_url(client_id, None)?)
            .json(update);
        let updated: UpdatedClient = self.fetch(credentials.apply(request)).await?;
        Ok(updated.user)
    }

    async fn client_weight_logs(
        &self,
        credentials: &Credentials,
        client_id: &str,
    ) -> Result<Vec<WeightLog>, ApiError> {
        let request = self
            .client
            .get(self.client_url(client_id, Some("weight-log"))?);
        self.fetch(credentials.apply(request)).await
    }

    async fn update_meal_plan(
        &self,
        credentials: &Credentials,
        client_id: &str,
        meal_plan: &str,
    ) -> Result<(), ApiError> {
        let request = self
            .client
            .put(self.client_url(client_id, Some("meal-plan"))?)
            .json(&MealPlanUpdate {
                meal_plan: meal_plan.to_string(),
            });
        self.send(credentials.apply(request)).await?;
        Ok(())
    }
}
