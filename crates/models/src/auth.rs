use serde::{Deserialize, Serialize};

/// Body of `POST /api/auth/local-login`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Login response; the backend also sets the `session_token` cookie.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoginResponse {
    #[serde(default)]
    pub user: Option<SessionUser>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SessionUser {
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
}

/// Name of the cookie carrying the backend session.
pub const SESSION_COOKIE: &str = "session_token";
