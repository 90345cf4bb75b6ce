use super::types::LoginResponse;
use crate::errors::{EngineError, EngineResult};
use reqwest::{Client, RequestBuilder};

/// Exchange account credentials. Passed in from config, never global.
#[derive(Clone)]
pub struct ExchangeCredentials {
    pub username: String,
    pub password: String,
    pub app_key: String,
    pub locale: String,
}

impl std::fmt::Debug for ExchangeCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExchangeCredentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("app_key", &"<redacted>")
            .field("locale", &self.locale)
            .finish()
    }
}

/// Session token for the exchange. Adds the two auth headers to every request.
#[derive(Clone)]
pub struct SessionToken {
    app_key: String,
    token: String,
}

impl SessionToken {
    pub fn apply(&self, req: RequestBuilder) -> RequestBuilder {
        req.header("X-Application", &self.app_key)
            .header("X-Authentication", &self.token)
    }
}

/// Interactive login. One attempt.
pub async fn login(
    client: &Client,
    identity_url: &str,
    creds: &ExchangeCredentials,
) -> EngineResult<SessionToken> {
    let resp = client
        .post(format!("{identity_url}/login"))
        .header("X-Application", &creds.app_key)
        .header("Accept", "application/json")
        .form(&[("username", creds.username.as_str()), ("password", creds.password.as_str())])
        .send()
        .await
        .map_err(|e| EngineError::Auth(format!("login request: {e}")))?;

    let status = resp.status();
    if !status.is_success() {
        return Err(EngineError::Auth(format!("login HTTP {status}")));
    }

    let body: LoginResponse = resp
        .json()
        .await
        .map_err(|e| EngineError::Auth(format!("login response: {e}")))?;

    token_from_login(body, &creds.app_key)
}

fn token_from_login(body: LoginResponse, app_key: &str) -> EngineResult<SessionToken> {
    if !body.is_success() {
        let reason = body.error.unwrap_or_else(|| "unknown".into());
        return Err(EngineError::Auth(format!("login rejected: {reason}")));
    }
    let token = body
        .token
        .filter(|t| !t.is_empty())
        .ok_or_else(|| EngineError::Auth("login succeeded without a token".into()))?;

    Ok(SessionToken { app_key: app_key.to_string(), token })
}

pub async fn logout(client: &Client, identity_url: &str, token: &SessionToken) -> EngineResult<()> {
    let resp = token
        .apply(client.post(format!("{identity_url}/logout")))
        .header("Accept", "application/json")
        .send()
        .await
        .map_err(|e| EngineError::Auth(format!("logout request: {e}")))?;

    let status = resp.status();
    if !status.is_success() {
        return Err(EngineError::Auth(format!("logout HTTP {status}")));
    }

    let body: LoginResponse = resp
        .json()
        .await
        .map_err(|e| EngineError::Auth(format!("logout response: {e}")))?;
    if !body.is_success() {
        return Err(EngineError::Auth(format!(
            "logout rejected: {}",
            body.error.unwrap_or_default()
        )));
    }
    Ok(())
}
