//! Authenticated identity against one Jinjamator server.
//!
//! A [`Session`] is a cheap handle: clones share the token, the catalog
//! cache and the HTTP connection pool. Tasks and jobs keep a clone so a
//! renewal done through any of them is seen by all.

use crate::catalog::{TaskCatalog, TaskDescriptor, TaskList};
use crate::config::ConnectionConfig;
use crate::error::{ClientError, Result};
use crate::job::Job;
use crate::task::TaskInvocation;
use crate::token::{Freshness, TokenPayload, TokenState};
use crate::transport::{self, ApiRequest, Transport};
use chrono::{DateTime, Utc};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use reqwest::{Response, StatusCode};
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, warn};

const LOGIN_PATH: &str = "/aaa/login/local";
const TOKEN_PATH: &str = "/aaa/token";
const TASKS_PATH: &str = "/tasks";

#[derive(Clone)]
pub struct Session {
    inner: Arc<SessionInner>,
}

struct SessionInner {
    config: ConnectionConfig,
    transport: Transport,
    identity: RwLock<Identity>,
    token: RwLock<Option<TokenState>>,
    catalog: Mutex<Option<Arc<TaskCatalog>>>,
}

#[derive(Default)]
struct Identity {
    username: Option<String>,
    user_id: Option<i64>,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("base_url", &self.inner.transport.base_url())
            .finish_non_exhaustive()
    }
}

impl Session {
    pub fn new(config: ConnectionConfig) -> Result<Self> {
        let transport = Transport::new(&config)?;
        Ok(Self {
            inner: Arc::new(SessionInner {
                config,
                transport,
                identity: RwLock::new(Identity::default()),
                token: RwLock::new(None),
                catalog: Mutex::new(None),
            }),
        })
    }

    /// Shorthand for `Session::new(ConnectionConfig::new(base_url))`.
    pub fn connect(base_url: impl Into<String>) -> Result<Self> {
        Self::new(ConnectionConfig::new(base_url))
    }

    pub fn config(&self) -> &ConnectionConfig {
        &self.inner.config
    }

    pub fn base_url(&self) -> &str {
        self.inner.transport.base_url()
    }

    /// Log in with local credentials. The password is not kept.
    pub async fn login(&self, username: &str, password: &str) -> Result<&Self> {
        let request = ApiRequest::post(
            LOGIN_PATH,
            serde_json::json!({ "username": username, "password": password }),
        );
        let response = self.inner.transport.send(&request, HeaderMap::new()).await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            warn!("Login as {} rejected with HTTP {}", username, status);
            return Err(ClientError::AuthenticationFailed {
                username: username.to_string(),
                status,
                body: transport::body_snippet(response).await,
            });
        }

        let payload: TokenPayload = transport::read_json(response).await?;
        let token = TokenState::from_payload(&payload)?;
        info!(
            "Logged in to {} as {} (token expires {})",
            self.base_url(),
            username,
            token.expires_at()
        );

        *self.inner.token.write().await = Some(token);
        let mut identity = self.inner.identity.write().await;
        identity.username = Some(username.to_string());
        identity.user_id = payload.user_id;

        Ok(self)
    }

    pub async fn is_authenticated(&self) -> bool {
        self.inner.token.read().await.is_some()
    }

    pub async fn username(&self) -> Option<String> {
        self.inner.identity.read().await.username.clone()
    }

    pub async fn user_id(&self) -> Option<i64> {
        self.inner.identity.read().await.user_id
    }

    pub async fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.inner.token.read().await.as_ref().map(|t| t.expires_at())
    }

    /// Headers for an outbound request; empty before login.
    pub async fn authorized_headers(&self) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();
        if let Some(token) = self.inner.token.read().await.as_ref() {
            let value = HeaderValue::from_str(token.bearer())
                .map_err(|e| ClientError::Token(format!("not usable as a header: {}", e)))?;
            headers.insert(AUTHORIZATION, value);
        }
        Ok(headers)
    }

    /// Fail on an expired token, renew one past half its lifetime.
    pub async fn ensure_fresh(&self) -> Result<()> {
        let (freshness, expires_at) = match self.inner.token.read().await.as_ref() {
            Some(token) => (token.freshness(Utc::now()), token.expires_at()),
            None => return Ok(()),
        };

        match freshness {
            Freshness::Fresh => Ok(()),
            Freshness::RenewalDue => {
                debug!("Token expires at {}, renewing", expires_at);
                self.renew().await
            }
            Freshness::Expired => Err(ClientError::SessionExpired { expires_at }),
        }
    }

    /// Exchange the current token for a new one at the token endpoint.
    /// An expired token is never sent; that needs a fresh login.
    pub async fn renew(&self) -> Result<()> {
        let expiry = self
            .inner
            .token
            .read()
            .await
            .as_ref()
            .map(|t| (t.is_expired(Utc::now()), t.expires_at()));
        if let Some((true, expires_at)) = expiry {
            return Err(ClientError::SessionExpired { expires_at });
        }

        let headers = self.authorized_headers().await?;
        let response = self
            .inner
            .transport
            .send(&ApiRequest::get(TOKEN_PATH), headers)
            .await
            .map_err(|e| ClientError::RenewalFailed {
                status: None,
                reason: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(ClientError::RenewalFailed {
                status: Some(status.as_u16()),
                reason: transport::body_snippet(response).await,
            });
        }

        let header_token = transport::bearer_from_headers(response.headers());
        let body = response.text().await.map_err(|e| ClientError::RenewalFailed {
            status: Some(status.as_u16()),
            reason: e.to_string(),
        })?;

        let renewed = match serde_json::from_str::<TokenPayload>(&body) {
            Ok(payload) => TokenState::from_payload(&payload),
            Err(_) => match header_token {
                Some(bearer) => TokenState::from_jwt(bearer),
                None => Err(ClientError::Token("renewal response carried no token".into())),
            },
        }
        .map_err(|e| ClientError::RenewalFailed {
            status: Some(status.as_u16()),
            reason: e.to_string(),
        })?;

        info!("Token renewed, now expires {}", renewed.expires_at());
        *self.inner.token.write().await = Some(renewed);
        Ok(())
    }

    /// Send a request with the session's token. A 401 is answered with one
    /// renewal and one retry; everything else goes back to the caller.
    pub(crate) async fn execute(&self, request: ApiRequest) -> Result<Response> {
        self.ensure_fresh().await?;
        let response = self.dispatch(&request).await?;
        if response.status() != StatusCode::UNAUTHORIZED {
            return Ok(response);
        }

        self.recover_unauthorized(response).await?;

        let response = self.dispatch(&request).await?;
        if response.status() == StatusCode::UNAUTHORIZED {
            return Err(ClientError::AuthorizationInvalid {
                status: response.status().as_u16(),
                body: transport::body_snippet(response).await,
            });
        }
        Ok(response)
    }

    async fn dispatch(&self, request: &ApiRequest) -> Result<Response> {
        let headers = self.authorized_headers().await?;
        let response = self.inner.transport.send(request, headers).await?;
        if response.status().is_success() {
            self.absorb_header_token(response.headers()).await;
        }
        Ok(response)
    }

    /// The server answers 401 for bad credentials, an expired token and a
    /// token it merely wants replaced. Tell them apart by local state.
    async fn recover_unauthorized(&self, response: Response) -> Result<()> {
        let expiry = self
            .inner
            .token
            .read()
            .await
            .as_ref()
            .map(|t| (t.is_expired(Utc::now()), t.expires_at()));

        match expiry {
            None => Err(ClientError::AuthorizationInvalid {
                status: response.status().as_u16(),
                body: transport::body_snippet(response).await,
            }),
            Some((true, expires_at)) => Err(ClientError::SessionExpired { expires_at }),
            Some((false, _)) => {
                debug!("Got 401 with a live token, forcing renewal");
                self.renew().await
            }
        }
    }

    async fn absorb_header_token(&self, headers: &HeaderMap) {
        let Some(bearer) = transport::bearer_from_headers(headers) else {
            return;
        };
        let mut token = self.inner.token.write().await;
        if token.as_ref().is_some_and(|t| t.bearer() == bearer) {
            return;
        }
        match TokenState::from_jwt(bearer) {
            Ok(state) => {
                debug!("Server issued a new token, expires {}", state.expires_at());
                *token = Some(state);
            }
            Err(e) => warn!("Ignoring undecodable token in response header: {}", e),
        }
    }

    /// All tasks the server offers. Fetched once, then served from cache.
    pub async fn list_tasks(&self) -> Result<Arc<TaskCatalog>> {
        let mut cache = self.inner.catalog.lock().await;
        if let Some(catalog) = cache.as_ref() {
            return Ok(Arc::clone(catalog));
        }

        let response = self.execute(ApiRequest::get(TASKS_PATH)).await?;
        let response = transport::expect_success(response).await?;
        let list: TaskList = transport::read_json(response).await?;
        let catalog = Arc::new(TaskCatalog::from_descriptors(list.tasks));
        info!("Loaded {} tasks from {}", catalog.len(), self.base_url());

        *cache = Some(Arc::clone(&catalog));
        Ok(catalog)
    }

    /// Drop the cached catalog and fetch it again.
    pub async fn refresh_tasks(&self) -> Result<Arc<TaskCatalog>> {
        self.inner.catalog.lock().await.take();
        self.list_tasks().await
    }

    pub async fn task_descriptor(&self, path: &str) -> Result<TaskDescriptor> {
        Ok(self.list_tasks().await?.get(path)?.clone())
    }

    /// Resolve a task path into an invocation with empty configuration.
    pub async fn get_task(&self, path: &str) -> Result<TaskInvocation> {
        let descriptor = self.task_descriptor(path).await?;
        Ok(TaskInvocation::new(self.clone(), descriptor))
    }

    /// Handle for a job submitted earlier, state not yet known.
    pub fn job(&self, job_id: impl Into<String>) -> Job {
        Job::new(self.clone(), job_id.into())
    }
}
