//! HTTP session handling.
//!
//! `ApiClient` wraps a reqwest client bound to the backend base URL. The
//! authenticated flavour owns a cookie jar; the `session_token` cookie set by
//! the login call is replayed on every later request of the suite.

use std::ops::Deref;
use std::sync::Arc;
use std::time::Instant;

use configs::ProbeConfig;
use models::auth::{LoginRequest, LoginResponse, SessionUser, SESSION_COOKIE};
use reqwest::cookie::{CookieStore, Jar};
use reqwest::multipart::{Form, Part};
use reqwest::{Method, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::endpoints;
use crate::error::{excerpt, ProbeError};
use crate::fixtures::SampleFile;
use crate::observability::{HTTP_REQUESTS_TOTAL, LOGIN_ATTEMPTS_TOTAL, REQUEST_DURATION};
use crate::retry::{retry_with_policy, RetryPolicy};

/// A fully buffered backend response.
#[derive(Debug, Clone)]
pub struct ApiResponse {
    pub method: Method,
    pub path: String,
    pub status: StatusCode,
    pub content_type: Option<String>,
    pub body: Vec<u8>,
}

impl ApiResponse {
    pub fn status_code(&self) -> u16 {
        self.status.as_u16()
    }

    pub fn expect_status(&self, expected: u16) -> Result<&Self, ProbeError> {
        if self.status.as_u16() == expected {
            Ok(self)
        } else {
            Err(self.status_error(expected))
        }
    }

    pub fn status_error(&self, expected: u16) -> ProbeError {
        ProbeError::Status {
            method: self.method.to_string(),
            path: self.path.clone(),
            expected,
            actual: self.status.as_u16(),
            body: excerpt(&self.body),
        }
    }

    pub fn json(&self) -> Result<serde_json::Value, ProbeError> {
        serde_json::from_slice(&self.body).map_err(|e| self.decode_error(e))
    }

    pub fn json_as<T: DeserializeOwned>(&self) -> Result<T, ProbeError> {
        serde_json::from_slice(&self.body).map_err(|e| self.decode_error(e))
    }

    /// The `detail` message of an error body, lowercased; empty when absent.
    pub fn detail(&self) -> String {
        let Ok(value) = serde_json::from_slice::<serde_json::Value>(&self.body) else {
            return String::new();
        };
        match value.get("detail") {
            Some(serde_json::Value::String(s)) => s.to_lowercase(),
            Some(other) => other.to_string().to_lowercase(),
            None => String::new(),
        }
    }

    pub fn body_excerpt(&self) -> String {
        excerpt(&self.body)
    }

    /// Whether the `Content-Type` header mentions `kind`, case-insensitively.
    pub fn has_content_type(&self, kind: &str) -> bool {
        self.content_type
            .as_deref()
            .is_some_and(|ct| ct.to_lowercase().contains(&kind.to_lowercase()))
    }

    fn decode_error(&self, e: serde_json::Error) -> ProbeError {
        ProbeError::Decode {
            path: self.path.clone(),
            message: format!("{e}; body: {}", excerpt(&self.body)),
        }
    }
}

#[derive(Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    jar: Option<Arc<Jar>>,
}

impl ApiClient {
    fn build(cfg: &ProbeConfig, jar: Option<Arc<Jar>>) -> Result<Self, ProbeError> {
        let mut builder = reqwest::Client::builder()
            .connect_timeout(cfg.backend.connect_timeout())
            .timeout(cfg.backend.request_timeout())
            .user_agent(concat!("finance-probe/", env!("CARGO_PKG_VERSION")));
        if let Some(jar) = &jar {
            builder = builder.cookie_provider(Arc::clone(jar));
        }
        let http = builder
            .build()
            .map_err(|e| ProbeError::Config(format!("cannot build http client: {e}")))?;
        Ok(Self {
            http,
            base_url: cfg.backend.base_url.clone(),
            jar,
        })
    }

    /// Client without cookies, for requests that must be rejected with 401.
    pub fn anonymous(cfg: &ProbeConfig) -> Result<Self, ProbeError> {
        Self::build(cfg, None)
    }

    pub fn with_cookie_jar(cfg: &ProbeConfig) -> Result<Self, ProbeError> {
        Self::build(cfg, Some(Arc::new(Jar::default())))
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Whether the jar currently holds a cookie with the given name for the base URL.
    pub fn has_cookie(&self, name: &str) -> bool {
        let (Some(jar), Ok(url)) = (&self.jar, reqwest::Url::parse(&self.base_url)) else {
            return false;
        };
        jar.cookies(&url)
            .and_then(|h| h.to_str().map(str::to_owned).ok())
            .map(|header| {
                header
                    .split(';')
                    .any(|pair| pair.trim().split('=').next() == Some(name))
            })
            .unwrap_or(false)
    }

    pub async fn get(&self, path: &str) -> Result<ApiResponse, ProbeError> {
        self.send(Method::GET, path, self.http.get(self.url(path))).await
    }

    pub async fn get_query<Q: Serialize + ?Sized>(
        &self,
        path: &str,
        query: &Q,
    ) -> Result<ApiResponse, ProbeError> {
        let req = self.http.get(self.url(path)).query(query);
        self.send(Method::GET, path, req).await
    }

    pub async fn post_json<B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<ApiResponse, ProbeError> {
        let req = self.http.post(self.url(path)).json(body);
        self.send(Method::POST, path, req).await
    }

    pub async fn post_empty(&self, path: &str) -> Result<ApiResponse, ProbeError> {
        self.send(Method::POST, path, self.http.post(self.url(path))).await
    }

    pub async fn put_json<B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<ApiResponse, ProbeError> {
        let req = self.http.put(self.url(path)).json(body);
        self.send(Method::PUT, path, req).await
    }

    pub async fn delete(&self, path: &str) -> Result<ApiResponse, ProbeError> {
        self.send(Method::DELETE, path, self.http.delete(self.url(path))).await
    }

    /// Multipart upload with the file under the `file` field.
    pub async fn upload<Q: Serialize + ?Sized>(
        &self,
        path: &str,
        query: &Q,
        file: &SampleFile,
    ) -> Result<ApiResponse, ProbeError> {
        let part = Part::bytes(file.bytes.clone())
            .file_name(file.file_name.clone())
            .mime_str(file.mime_type)
            .map_err(|source| ProbeError::Transport {
                method: Method::POST.to_string(),
                path: path.to_string(),
                source,
            })?;
        let form = Form::new().part("file", part);
        let req = self.http.post(self.url(path)).query(query).multipart(form);
        self.send(Method::POST, path, req).await
    }

    async fn send(
        &self,
        method: Method,
        path: &str,
        req: RequestBuilder,
    ) -> Result<ApiResponse, ProbeError> {
        let started = Instant::now();
        let result = req.send().await;
        REQUEST_DURATION
            .with_label_values(&[method.as_str()])
            .observe(started.elapsed().as_secs_f64());

        let resp = match result {
            Ok(resp) => resp,
            Err(source) => {
                HTTP_REQUESTS_TOTAL
                    .with_label_values(&[method.as_str(), "error"])
                    .inc();
                return Err(ProbeError::Transport {
                    method: method.to_string(),
                    path: path.to_string(),
                    source,
                });
            }
        };
        let status = resp.status();
        HTTP_REQUESTS_TOTAL
            .with_label_values(&[method.as_str(), status.as_str()])
            .inc();
        let content_type = resp
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_owned);
        let body = resp.bytes().await.map_err(|source| ProbeError::Transport {
            method: method.to_string(),
            path: path.to_string(),
            source,
        })?;
        debug!(
            method = %method,
            path,
            status = status.as_u16(),
            bytes = body.len(),
            "backend response"
        );
        Ok(ApiResponse {
            method,
            path: path.to_string(),
            status,
            content_type,
            body: body.to_vec(),
        })
    }
}

/// An authenticated client; dereferences to [`ApiClient`].
pub struct ApiSession {
    client: ApiClient,
    user: SessionUser,
}

impl ApiSession {
    pub async fn login(cfg: &ProbeConfig, policy: &RetryPolicy) -> Result<Self, ProbeError> {
        let client = ApiClient::with_cookie_jar(cfg)?;

        if cfg.auth.setup_local_admin {
            match client.post_empty(endpoints::SETUP_LOCAL_ADMIN).await {
                Ok(resp) => debug!(
                    event = "setup_local_admin",
                    status = resp.status_code(),
                    "local admin setup called"
                ),
                Err(e) => warn!(
                    event = "setup_local_admin",
                    error = %e,
                    "local admin setup failed; continuing"
                ),
            }
        }

        let request = LoginRequest {
            email: cfg.auth.email.clone(),
            password: cfg.auth.password.clone(),
        };
        let result = retry_with_policy(policy, || {
            let client = client.clone();
            let request = request.clone();
            async move {
                let resp = client.post_json(endpoints::LOCAL_LOGIN, &request).await?;
                match resp.status_code() {
                    200 => Ok(resp),
                    502..=504 => Err(resp.status_error(200)),
                    other => Err(ProbeError::Auth(format!(
                        "login for {} returned {other}: {}",
                        request.email,
                        resp.body_excerpt()
                    ))),
                }
            }
        })
        .await;

        let resp = match result {
            Ok(resp) => {
                LOGIN_ATTEMPTS_TOTAL.with_label_values(&["success"]).inc();
                resp
            }
            Err(e) => {
                LOGIN_ATTEMPTS_TOTAL.with_label_values(&["failure"]).inc();
                return Err(match e {
                    ProbeError::Auth(_) => e,
                    other => ProbeError::Auth(other.to_string()),
                });
            }
        };

        if !client.has_cookie(SESSION_COOKIE) {
            warn!(
                event = "login_no_cookie",
                cookie = SESSION_COOKIE,
                "login succeeded without a session cookie"
            );
        }
        let user = resp
            .json_as::<LoginResponse>()
            .ok()
            .and_then(|r| r.user)
            .unwrap_or_default();
        info!(
            event = "login",
            email = %cfg.auth.email,
            role = user.role.as_deref().unwrap_or("unknown"),
            "session established"
        );
        Ok(Self { client, user })
    }

    /// The user reported by the login response; fields are empty when it sent none.
    pub fn user(&self) -> &SessionUser {
        &self.user
    }
}

impl Deref for ApiSession {
    type Target = ApiClient;

    fn deref(&self) -> &Self::Target {
        &self.client
    }
}
