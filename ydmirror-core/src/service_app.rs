use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

const DEFAULT_BASE_URL: &str = "https://oauth.yandex.ru";
const GRANT_TYPE_TOKEN_EXCHANGE: &str = "urn:ietf:params:oauth:grant-type:token-exchange";
const SUBJECT_TOKEN_TYPE_EMAIL: &str = "urn:yandex:params:oauth:token-type:email";

#[derive(Debug, Error)]
pub enum ServiceAppError {
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("invalid base url: {0}")]
    Url(#[from] url::ParseError),
    #[error("token endpoint returned {status}: {body}")]
    Api { status: StatusCode, body: String },
}

/// Yandex 360 service-application client: exchanges organization service
/// credentials plus a user email for an access token acting on that
/// user's behalf.
#[derive(Clone)]
pub struct ServiceAppClient {
    http: Client,
    base_url: Url,
    client_id: String,
    client_secret: String,
}

impl ServiceAppClient {
    pub fn new(
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
    ) -> Result<Self, ServiceAppError> {
        Self::with_base_url(DEFAULT_BASE_URL, client_id, client_secret)
    }

    pub fn with_base_url(
        base_url: &str,
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
    ) -> Result<Self, ServiceAppError> {
        Ok(Self {
            http: Client::new(),
            base_url: Url::parse(base_url)?,
            client_id: client_id.into(),
            client_secret: client_secret.into(),
        })
    }

    pub async fn token_for_subject(
        &self,
        email: &str,
    ) -> Result<ServiceAppToken, ServiceAppError> {
        let url = self.base_url.join("/token")?;
        let form = [
            ("grant_type", GRANT_TYPE_TOKEN_EXCHANGE),
            ("client_id", &self.client_id),
            ("client_secret", &self.client_secret),
            ("subject_token", email),
            ("subject_token_type", SUBJECT_TOKEN_TYPE_EMAIL),
        ];

        let response = self.http.post(url).form(&form).send().await?;
        if response.status().is_success() {
            Ok(response.json::<ServiceAppToken>().await?)
        } else {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            Err(ServiceAppError::Api { status, body })
        }
    }
}

#[derive(Debug, Deserialize, Serialize)]
pub struct ServiceAppToken {
    pub access_token: String,
    pub token_type: String,
    #[serde(default)]
    pub expires_in: Option<u64>,
    #[serde(default)]
    pub issued_token_type: Option<String>,
}
