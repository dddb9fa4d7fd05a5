//! amoCRM OAuth token exchange and REST record reads.

use crate::config::CrmAuth;
use crate::error::IntegrationError;
use serde::Deserialize;
use serde_json::{json, Value};
use url::Url;

/// Short-lived bearer credential.
///
/// Lives for one pipeline run and is dropped with it; every run
/// re-authenticates from the configured credential. Caching a token across
/// runs would save a round trip but is deliberately not done here.
#[derive(Debug, Clone)]
pub struct AccessToken {
    pub token: String,
    pub token_type: String,
    pub expires_in: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    token_type: String,
    expires_in: u64,
    access_token: String,
}

/// The full record as amoCRM returns it. Authoritative: supersedes any
/// field guessed during webhook parsing.
#[derive(Debug, Clone, Deserialize)]
pub struct Lead {
    pub id: i64,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub price: Option<i64>,
    #[serde(default)]
    pub status_id: Option<i64>,
    #[serde(default)]
    pub pipeline_id: Option<i64>,
    #[serde(default)]
    pub responsible_user_id: Option<i64>,
    #[serde(default)]
    pub created_at: Option<i64>,
    #[serde(default)]
    pub updated_at: Option<i64>,
    #[serde(default)]
    pub is_deleted: bool,
    #[serde(default)]
    pub custom_fields_values: Option<Value>,
    #[serde(default)]
    pub score: Option<i64>,
    #[serde(default)]
    pub account_id: Option<i64>,
}

#[derive(Debug, Clone, Default)]
pub struct CrmClient {
    http: reqwest::Client,
    base_url: Option<Url>,
}

impl CrmClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Routes every request to `base_url` instead of the subdomain origin.
    pub fn with_base_url(base_url: Url) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: Some(base_url),
        }
    }

    fn endpoint(&self, subdomain: &str, path: &str) -> Result<Url, IntegrationError> {
        let origin = match &self.base_url {
            Some(url) => url.clone(),
            None => Url::parse(&format!("https://{subdomain}.amocrm.ru"))
                .map_err(|_| IntegrationError::InvalidSubdomain(subdomain.to_string()))?,
        };
        origin
            .join(path)
            .map_err(|_| IntegrationError::InvalidSubdomain(subdomain.to_string()))
    }

    /// Exchanges the configured credential for a bearer token.
    ///
    /// The long-lived mode has nothing to exchange and returns without a
    /// network call.
    pub async fn authenticate(
        &self,
        auth: &CrmAuth,
        subdomain: &str,
    ) -> Result<AccessToken, IntegrationError> {
        let (client_id, client_secret, redirect_uri, refresh_token) = match auth {
            CrmAuth::LongLived { token } => {
                return Ok(AccessToken {
                    token: token.clone(),
                    token_type: "Bearer".to_string(),
                    expires_in: None,
                })
            }
            CrmAuth::Refresh {
                client_id,
                client_secret,
                redirect_uri,
                refresh_token,
            } => (client_id, client_secret, redirect_uri, refresh_token),
        };

        let url = self.endpoint(subdomain, "oauth2/access_token")?;
        let response = self
            .http
            .post(url)
            .json(&json!({
                "client_id": client_id,
                "client_secret": client_secret,
                "grant_type": "refresh_token",
                "refresh_token": refresh_token,
                "redirect_uri": redirect_uri,
            }))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(IntegrationError::CrmAuth {
                status: response.status().as_u16(),
                body: response.text().await.unwrap_or_default(),
            });
        }

        let token: TokenResponse = response.json().await?;
        Ok(AccessToken {
            token: token.access_token,
            token_type: token.token_type,
            expires_in: Some(token.expires_in),
        })
    }

    /// Reads the full record by id. Pure read, safe to repeat.
    pub async fn fetch_lead(
        &self,
        record_id: &str,
        token: &AccessToken,
        subdomain: &str,
    ) -> Result<Lead, IntegrationError> {
        let url = self.endpoint(subdomain, &format!("api/v4/leads/{record_id}"))?;
        let response = self.http.get(url).bearer_auth(&token.token).send().await?;

        if !response.status().is_success() {
            return Err(IntegrationError::CrmApi {
                status: response.status().as_u16(),
                body: response.text().await.unwrap_or_default(),
            });
        }

        Ok(response.json().await?)
    }
}
