//! Twitch Helix adapter.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::{Client, Response, StatusCode};
use serde::Deserialize;
use tokio::sync::RwLock;
use url::Url;

use super::{DirectoryClient, DirectoryError, DirectoryUser, Result};
use crate::config;

const CLIENT_ID_HEADER: &str = "client-id";
const GRANT_TYPE: &str = "client_credentials";

#[derive(Debug, Deserialize)]
struct UsersResponse {
    data: Vec<DirectoryUser>,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
}

#[derive(Debug, Deserialize)]
struct HelixError {
    message: String,
}

/// What is needed to request a new app token.
struct Renewal {
    auth_url: String,
    client_id: String,
    client_secret: String,
    timeout: Duration,
}

/// Helix `users` endpoint client.
#[derive(Clone)]
pub struct TwitchClient {
    http: Client,
    users_url: Url,
    token: Arc<RwLock<String>>,
    renewal: Option<Arc<Renewal>>,
}

impl TwitchClient {
    /// Create a new [`TwitchClient`] from an already issued app token.
    pub fn new(
        api_url: &str,
        client_id: &str,
        access_token: &str,
        timeout: Duration,
    ) -> Result<Self> {
        let users_url = Url::parse(&format!(
            "{}/users",
            api_url.trim_end_matches('/')
        ))?;

        let mut headers = HeaderMap::new();
        headers.insert(
            CLIENT_ID_HEADER,
            HeaderValue::from_str(client_id)
                .map_err(|_| DirectoryError::Credentials("client_id"))?,
        );

        let http = Client::builder()
            .default_headers(headers)
            .timeout(timeout)
            .build()?;

        Ok(Self {
            http,
            users_url,
            token: Arc::new(RwLock::new(access_token.to_owned())),
            renewal: None,
        })
    }

    /// Request a new app token once when Helix answers `401`.
    pub fn with_renewal(
        mut self,
        auth_url: &str,
        client_id: &str,
        client_secret: &str,
        timeout: Duration,
    ) -> Self {
        self.renewal = Some(Arc::new(Renewal {
            auth_url: auth_url.to_owned(),
            client_id: client_id.to_owned(),
            client_secret: client_secret.to_owned(),
            timeout,
        }));
        self
    }

    /// Build a client from configuration.
    ///
    /// Without a configured `access_token`, an app token is requested
    /// through the client-credentials grant. With a `client_secret`, expired
    /// tokens are renewed on demand.
    pub async fn connect(cfg: &config::Directory) -> Result<Self> {
        let client_id = cfg
            .client_id
            .as_deref()
            .ok_or(DirectoryError::Credentials("client_id"))?;
        let timeout = Duration::from_secs(cfg.timeout_secs);

        let access_token = match (&cfg.access_token, &cfg.client_secret) {
            (Some(token), _) => token.clone(),
            (None, Some(secret)) => {
                request_app_token(&cfg.auth_url, client_id, secret, timeout)
                    .await?
            },
            (None, None) => {
                return Err(DirectoryError::Credentials("client_secret"));
            },
        };

        let client = Self::new(&cfg.api_url, client_id, &access_token, timeout)?;
        tracing::info!(api_url = %cfg.api_url, "twitch directory ready");

        Ok(match &cfg.client_secret {
            Some(secret) => {
                client.with_renewal(&cfg.auth_url, client_id, secret, timeout)
            },
            None => client,
        })
    }

    async fn get_users(&self, login: &str) -> Result<Response> {
        let token = self.token.read().await.clone();

        Ok(self
            .http
            .get(self.users_url.clone())
            .query(&[("login", login)])
            .bearer_auth(token)
            .send()
            .await?)
    }
}

/// Obtain an app access token from the Twitch identity server.
pub async fn request_app_token(
    auth_url: &str,
    client_id: &str,
    client_secret: &str,
    timeout: Duration,
) -> Result<String> {
    let url = Url::parse(&format!("{}/token", auth_url.trim_end_matches('/')))?;
    let response = Client::builder()
        .timeout(timeout)
        .build()?
        .post(url)
        .form(&[
            ("client_id", client_id),
            ("client_secret", client_secret),
            ("grant_type", GRANT_TYPE),
        ])
        .send()
        .await?;

    if !response.status().is_success() {
        return Err(upstream_error(response).await);
    }

    let token: TokenResponse = response
        .json()
        .await
        .map_err(|err| DirectoryError::Parse(err.to_string()))?;
    Ok(token.access_token)
}

async fn upstream_error(response: Response) -> DirectoryError {
    let status = response.status();
    let text = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<HelixError>(&text)
        .map(|e| e.message)
        .unwrap_or(text);

    if status == StatusCode::BAD_REQUEST {
        DirectoryError::Rejected {
            status: status.as_u16(),
            message,
        }
    } else {
        DirectoryError::Upstream {
            status: status.as_u16(),
            message,
        }
    }
}

#[async_trait]
impl DirectoryClient for TwitchClient {
    async fn lookup(&self, login: &str) -> Result<Option<DirectoryUser>> {
        tracing::debug!(%login, "querying helix users");

        let mut response = self.get_users(login).await?;

        if response.status() == StatusCode::UNAUTHORIZED {
            if let Some(renewal) = &self.renewal {
                tracing::info!("helix token rejected, requesting a new one");
                let token = request_app_token(
                    &renewal.auth_url,
                    &renewal.client_id,
                    &renewal.client_secret,
                    renewal.timeout,
                )
                .await?;
                *self.token.write().await = token;

                response = self.get_users(login).await?;
            }
        }

        if !response.status().is_success() {
            let err = upstream_error(response).await;
            tracing::warn!(error = %err, %login, "helix refused lookup");
            return Err(err);
        }

        let body: UsersResponse = response
            .json()
            .await
            .map_err(|err| DirectoryError::Parse(err.to_string()))?;

        Ok(body.data.into_iter().next())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_string_contains, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const CLIENT_ID: &str = "client";
    const TOKEN: &str = "token";

    fn client(server: &MockServer) -> TwitchClient {
        TwitchClient::new(&server.uri(), CLIENT_ID, TOKEN, Duration::from_secs(2))
            .unwrap()
    }

    #[tokio::test]
    async fn test_lookup_existing_user() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/users"))
            .and(query_param("login", "ninja"))
            .and(header("Client-Id", CLIENT_ID))
            .and(header("Authorization", "Bearer token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": [{
                    "id": "19571641",
                    "login": "ninja",
                    "display_name": "Ninja",
                    "type": "",
                    "broadcaster_type": "partner",
                    "created_at": "2011-11-20T06:34:10Z"
                }]
            })))
            .mount(&server)
            .await;

        let user = client(&server).lookup("ninja").await.unwrap().unwrap();
        assert_eq!(user.id, "19571641");
        assert_eq!(user.display_name, "Ninja");
        assert_eq!(user.created_at.to_rfc3339(), "2011-11-20T06:34:10+00:00");
    }

    #[tokio::test]
    async fn test_lookup_unknown_user() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/users"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({ "data": [] })),
            )
            .mount(&server)
            .await;

        assert!(client(&server).lookup("nobody").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_lookup_rejected_login() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/users"))
            .respond_with(ResponseTemplate::new(400).set_body_json(json!({
                "error": "Bad Request",
                "status": 400,
                "message": "Invalid login names, emails or IDs in request"
            })))
            .mount(&server)
            .await;

        match client(&server).lookup("bad name!").await {
            Err(DirectoryError::Rejected { status, message }) => {
                assert_eq!(status, 400);
                assert_eq!(message, "Invalid login names, emails or IDs in request");
            },
            other => panic!("expected rejection, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_lookup_upstream_failure() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/users"))
            .respond_with(ResponseTemplate::new(503).set_body_string("unavailable"))
            .mount(&server)
            .await;

        match client(&server).lookup("ninja").await {
            Err(DirectoryError::Upstream { status, message }) => {
                assert_eq!(status, 503);
                assert_eq!(message, "unavailable");
            },
            other => panic!("expected upstream error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_request_app_token() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/token"))
            .and(body_string_contains("grant_type=client_credentials"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "access_token": "app-token",
                "expires_in": 5011271,
                "token_type": "bearer"
            })))
            .mount(&server)
            .await;

        let token = request_app_token(
            &server.uri(),
            CLIENT_ID,
            "secret",
            Duration::from_secs(2),
        )
        .await
        .unwrap();
        assert_eq!(token, "app-token");
    }

    #[tokio::test]
    async fn test_connect_requires_client_id() {
        let cfg = config::Directory::default();
        assert!(matches!(
            TwitchClient::connect(&cfg).await,
            Err(DirectoryError::Credentials("client_id"))
        ));
    }

    /// Address nothing listens on.
    fn closed_address() -> String {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);
        format!("http://{addr}")
    }

    #[tokio::test]
    async fn test_lookup_transport_failure() {
        let client = TwitchClient::new(
            &closed_address(),
            CLIENT_ID,
            TOKEN,
            Duration::from_secs(2),
        )
        .unwrap();

        match client.lookup("ninja").await {
            Err(DirectoryError::Request(err)) => assert!(err.is_connect()),
            other => panic!("expected transport error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_expired_token_is_renewed() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/users"))
            .and(header("Authorization", "Bearer expired"))
            .respond_with(ResponseTemplate::new(401).set_body_json(json!({
                "error": "Unauthorized",
                "status": 401,
                "message": "Invalid OAuth token"
            })))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/token"))
            .and(body_string_contains("client_secret=secret"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "access_token": "fresh",
                "expires_in": 5011271,
                "token_type": "bearer"
            })))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/users"))
            .and(header("Authorization", "Bearer fresh"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": [{
                    "id": "19571641",
                    "login": "ninja",
                    "display_name": "Ninja",
                    "created_at": "2011-11-20T06:34:10Z"
                }]
            })))
            .expect(2)
            .mount(&server)
            .await;

        let timeout = Duration::from_secs(2);
        let client = TwitchClient::new(&server.uri(), CLIENT_ID, "expired", timeout)
            .unwrap()
            .with_renewal(&server.uri(), CLIENT_ID, "secret", timeout);

        let user = client.lookup("ninja").await.unwrap().unwrap();
        assert_eq!(user.display_name, "Ninja");
        // the new token is kept for later lookups.
        assert!(client.lookup("ninja").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_unauthorized_without_renewal() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/users"))
            .respond_with(ResponseTemplate::new(401).set_body_json(json!({
                "message": "Invalid OAuth token"
            })))
            .mount(&server)
            .await;

        match client(&server).lookup("ninja").await {
            Err(DirectoryError::Upstream { status, .. }) => assert_eq!(status, 401),
            other => panic!("expected upstream error, got {other:?}"),
        }
    }
}
