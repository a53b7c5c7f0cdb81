use std::time::Duration;

use reqwest::{Client, Method, RequestBuilder, StatusCode};
use serde::de::{DeserializeOwned, IgnoredAny};
use serde::{Deserialize, Serialize};
use vrl_common::entities::user::{LoginRequest, RegisterUserRequest, UpdateUserRequest, User};
use vrl_common::validation::FieldError;

use crate::error::ClientError;
use crate::resource::{Resource, SingletonResource};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Page selection for list endpoints, server defaults apply to missing values.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PageQuery {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<u64>,
}

impl PageQuery {
    pub fn new(page: u64, limit: u64) -> Self {
        Self {
            page: Some(page),
            limit: Some(limit),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Paged<T> {
    pub items: Vec<T>,
    pub page: u64,
    pub limit: u64,
    pub total: u64,
    pub total_pages: u64,
}

impl<T> Default for Paged<T> {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            page: 1,
            limit: 0,
            total: 0,
            total_pages: 0,
        }
    }
}

/// Bearer token and account returned by a successful login.
#[derive(Debug, Clone, Deserialize)]
pub struct Session {
    pub token: String,
    pub user: User,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Envelope<T> {
    data: Option<T>,
    message: Option<String>,
    #[serde(default)]
    errors: Vec<FieldError>,
    page: Option<u64>,
    limit: Option<u64>,
    total: Option<u64>,
    total_pages: Option<u64>,
}

impl<T> Envelope<T> {
    fn into_data(self) -> Result<T, ClientError> {
        self.data
            .ok_or_else(|| ClientError::Decode("response carries no data".to_owned()))
    }
}

impl<T> Envelope<Vec<T>> {
    fn into_page(self) -> Result<Paged<T>, ClientError> {
        match (self.page, self.limit, self.total, self.total_pages) {
            (Some(page), Some(limit), Some(total), Some(total_pages)) => Ok(Paged {
                items: self.data.unwrap_or_default(),
                page,
                limit,
                total,
                total_pages,
            }),
            _ => Err(ClientError::Decode(
                "list response carries no paging details".to_owned(),
            )),
        }
    }
}

/// Client for the content API rooted at `base_url`.
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: Client,
    base_url: String,
    token: Option<String>,
}

impl ApiClient {
    pub fn new(base_url: impl Into<String>) -> Result<Self, ClientError> {
        let http = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| ClientError::Transport(e.to_string()))?;
        Ok(Self::with_client(http, base_url))
    }

    pub fn with_client(http: Client, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_owned();
        Self {
            http,
            base_url,
            token: None,
        }
    }

    /// Sends `token` as bearer credentials on every following request.
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    pub fn set_token(&mut self, token: Option<String>) {
        self.token = token;
    }

    pub async fn health(&self) -> Result<(), ClientError> {
        let path = "/health";
        let result = match self.http.get(format!("{}{path}", self.base_url)).send().await {
            Ok(response) if response.status() == StatusCode::OK => Ok(()),
            Ok(response) => Err(ClientError::UnexpectedStatus {
                status: response.status().as_u16(),
                message: String::new(),
            }),
            Err(e) => Err(ClientError::Transport(e.to_string())),
        };
        if let Err(error) = &result {
            tracing::warn!(method = %Method::GET, path, kind = error.kind(), "request failed: {}", error);
        }
        result
    }

    pub async fn register(&self, request: &RegisterUserRequest) -> Result<User, ClientError> {
        self.call(Method::POST, "/api/users/register", StatusCode::CREATED, |r| r.json(request))
            .await?
            .into_data()
    }

    pub async fn login(&self, request: &LoginRequest) -> Result<Session, ClientError> {
        self.call(Method::POST, "/api/users/login", StatusCode::OK, |r| r.json(request))
            .await?
            .into_data()
    }

    pub async fn me(&self) -> Result<User, ClientError> {
        self.call(Method::GET, "/api/users/me", StatusCode::OK, |r| r)
            .await?
            .into_data()
    }

    pub async fn list_users(&self, page: PageQuery) -> Result<Paged<User>, ClientError> {
        self.call(Method::GET, "/api/users", StatusCode::OK, |r| r.query(&page))
            .await?
            .into_page()
    }

    pub async fn update_user(
        &self,
        id: &str,
        request: &UpdateUserRequest,
    ) -> Result<User, ClientError> {
        let path = format!("/api/users/{id}");
        self.call(Method::PATCH, &path, StatusCode::OK, |r| r.json(request))
            .await?
            .into_data()
    }

    pub async fn list<E: Resource>(
        &self,
        query: &E::Query,
        page: PageQuery,
    ) -> Result<Paged<E>, ClientError> {
        let path = format!("/api/{}", E::PATH);
        self.call(Method::GET, &path, StatusCode::OK, |r| r.query(query).query(&page))
            .await?
            .into_page()
    }

    pub async fn get<E: Resource>(&self, id: &str) -> Result<E, ClientError> {
        let path = format!("/api/{}/{id}", E::PATH);
        self.call(Method::GET, &path, StatusCode::OK, |r| r)
            .await?
            .into_data()
    }

    pub async fn create<E: Resource>(&self, input: &E::Input) -> Result<E, ClientError> {
        let path = format!("/api/{}", E::PATH);
        self.call(Method::POST, &path, StatusCode::CREATED, |r| r.json(input))
            .await?
            .into_data()
    }

    /// Sends only the fields set in `input`, the rest stay as stored.
    pub async fn update<E: Resource>(&self, id: &str, input: &E::Input) -> Result<E, ClientError> {
        let path = format!("/api/{}/{id}", E::PATH);
        self.call(Method::PATCH, &path, StatusCode::OK, |r| r.json(input))
            .await?
            .into_data()
    }

    pub async fn delete<E: Resource>(&self, id: &str) -> Result<(), ClientError> {
        let path = format!("/api/{}/{id}", E::PATH);
        self.call::<IgnoredAny>(Method::DELETE, &path, StatusCode::OK, |r| r)
            .await
            .map(|_| ())
    }

    pub async fn get_singleton<T: SingletonResource>(&self) -> Result<T, ClientError> {
        let path = format!("/api/{}", T::PATH);
        self.call(Method::GET, &path, StatusCode::OK, |r| r)
            .await?
            .into_data()
    }

    pub async fn update_singleton<T: SingletonResource>(
        &self,
        input: &T::Input,
    ) -> Result<T, ClientError> {
        let path = format!("/api/{}", T::PATH);
        self.call(Method::PATCH, &path, StatusCode::OK, |r| r.json(input))
            .await?
            .into_data()
    }

    async fn call<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        expected: StatusCode,
        prepare: impl FnOnce(RequestBuilder) -> RequestBuilder,
    ) -> Result<Envelope<T>, ClientError> {
        let mut request = prepare(
            self.http
                .request(method.clone(), format!("{}{path}", self.base_url)),
        );
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let result = execute(request, expected).await;
        if let Err(error) = &result {
            tracing::warn!(%method, path, kind = error.kind(), "request failed: {}", error);
        }
        result
    }
}

async fn execute<T: DeserializeOwned>(
    request: RequestBuilder,
    expected: StatusCode,
) -> Result<Envelope<T>, ClientError> {
    let response = request
        .send()
        .await
        .map_err(|e| ClientError::Transport(e.to_string()))?;
    let status = response.status();
    let body = response
        .bytes()
        .await
        .map_err(|e| ClientError::Transport(e.to_string()))?;

    if status == expected {
        return serde_json::from_slice(&body).map_err(|e| ClientError::Decode(e.to_string()));
    }

    let (message, errors) = serde_json::from_slice::<Envelope<IgnoredAny>>(&body)
        .map(|envelope| (envelope.message.unwrap_or_default(), envelope.errors))
        .unwrap_or_default();
    Err(match status {
        StatusCode::NOT_FOUND => ClientError::NotFound(message),
        StatusCode::UNPROCESSABLE_ENTITY => ClientError::Validation { errors },
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => ClientError::Unauthorized(message),
        StatusCode::CONFLICT => ClientError::Conflict(message),
        other => ClientError::UnexpectedStatus {
            status: other.as_u16(),
            message,
        },
    })
}
