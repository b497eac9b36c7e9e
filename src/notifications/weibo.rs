//! Sina Weibo transport: short links via `short_url/shorten.json`, status
//! updates via `statuses/update.json`.

use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;

use super::error::TransportError;
use super::transport::Transport;
use crate::config::WeiboConfig;

/// Weibo error payload, e.g. `{"error":"expired_token","error_code":21327}`
#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    error: String,
    error_code: i64,
}

#[derive(Debug, Deserialize)]
struct ShortenResponse {
    #[serde(default)]
    urls: Vec<ShortUrl>,
}

#[derive(Debug, Deserialize)]
struct ShortUrl {
    url_short: Option<String>,
}

pub struct WeiboTransport {
    client: reqwest::Client,
    api_base: String,
    access_token: String,
}

impl WeiboTransport {
    pub fn new(config: &WeiboConfig) -> Result<Self, TransportError> {
        let access_token = config
            .access_token
            .clone()
            .filter(|t| !t.is_empty())
            .ok_or(TransportError::MissingToken)?;

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            api_base: config.api_base.trim_end_matches('/').to_string(),
            access_token,
        })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.api_base, path)
    }
}

#[async_trait]
impl Transport for WeiboTransport {
    async fn shorten(&self, url: &str) -> Result<String, TransportError> {
        let response = self
            .client
            .get(self.endpoint("short_url/shorten.json"))
            .query(&[("access_token", self.access_token.as_str()), ("url_long", url)])
            .send()
            .await?;
        let body = read_body(response).await?;
        let short = parse_short_url(&body)?;

        tracing::debug!(url_long = %url, url_short = %short, "Shortened build link");
        Ok(short)
    }

    async fn post(&self, message: &str) -> Result<(), TransportError> {
        let response = self
            .client
            .post(self.endpoint("statuses/update.json"))
            .form(&[("access_token", self.access_token.as_str()), ("status", message)])
            .send()
            .await?;
        read_body(response).await?;

        tracing::debug!(chars = message.chars().count(), "Status update accepted");
        Ok(())
    }
}

async fn read_body(response: reqwest::Response) -> Result<String, TransportError> {
    let status = response.status();
    let body = response.text().await?;

    if let Some(err) = api_error(&body) {
        return Err(err);
    }
    if !status.is_success() {
        tracing::warn!(status = %status, response_body = %body, "Weibo request failed");
        return Err(TransportError::Status {
            status: status.as_u16(),
            body,
        });
    }
    Ok(body)
}

fn api_error(body: &str) -> Option<TransportError> {
    serde_json::from_str::<ApiErrorBody>(body)
        .ok()
        .map(|e| TransportError::Api {
            code: e.error_code,
            message: e.error,
        })
}

fn parse_short_url(body: &str) -> Result<String, TransportError> {
    let response: ShortenResponse = serde_json::from_str(body)
        .map_err(|e| TransportError::MalformedResponse(e.to_string()))?;

    response
        .urls
        .into_iter()
        .next()
        .and_then(|u| u.url_short)
        .ok_or_else(|| TransportError::MalformedResponse("no short url in response".to_string()))
}
