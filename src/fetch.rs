use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{ACCEPT, COOKIE, HeaderMap, HeaderValue};
use url::Url;

use crate::error::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BodyKind {
    Text,
    Binary,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Body {
    Text(String),
    Binary(Vec<u8>),
}

/// One outbound GET, decoded as text or raw bytes.
#[async_trait]
pub trait ResourceFetcher: Send + Sync {
    async fn fetch(&self, url: &Url, kind: BodyKind) -> Result<Body>;

    async fn fetch_text(&self, url: &Url) -> Result<String> {
        match self.fetch(url, BodyKind::Text).await? {
            Body::Text(text) => Ok(text),
            Body::Binary(bytes) => Ok(String::from_utf8_lossy(&bytes).into_owned()),
        }
    }

    async fn fetch_binary(&self, url: &Url) -> Result<Vec<u8>> {
        match self.fetch(url, BodyKind::Binary).await? {
            Body::Binary(bytes) => Ok(bytes),
            Body::Text(text) => Ok(text.into_bytes()),
        }
    }
}

#[derive(Debug, Clone)]
pub struct HttpFetcherOptions {
    pub user_agent: String,
    pub cookie: Option<String>,
    pub timeout: Option<Duration>,
}

#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    pub fn new(options: &HttpFetcherOptions) -> anyhow::Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(
            ACCEPT,
            HeaderValue::from_static("application/json,text/html,application/xhtml+xml,*/*;q=0.8"),
        );
        if let Some(cookie) = options.cookie.as_deref() {
            let mut value = HeaderValue::from_str(cookie)
                .map_err(|err| anyhow::anyhow!("invalid cookie header value: {err}"))?;
            value.set_sensitive(true);
            headers.insert(COOKIE, value);
        }

        let mut builder = reqwest::Client::builder()
            .user_agent(options.user_agent.clone())
            .default_headers(headers)
            .redirect(reqwest::redirect::Policy::limited(10));
        if let Some(timeout) = options.timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder
            .build()
            .map_err(|err| anyhow::anyhow!("build http client: {err}"))?;

        Ok(Self { client })
    }
}

#[async_trait]
impl ResourceFetcher for HttpFetcher {
    async fn fetch(&self, url: &Url, kind: BodyKind) -> Result<Body> {
        tracing::debug!(%url, ?kind, "GET");

        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|err| Error::transport(url.as_str(), err))?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::HttpStatus {
                url: url.to_string(),
                code: status.as_u16(),
            });
        }

        let body = match kind {
            BodyKind::Text => Body::Text(
                response
                    .text()
                    .await
                    .map_err(|err| Error::transport(url.as_str(), err))?,
            ),
            BodyKind::Binary => Body::Binary(
                response
                    .bytes()
                    .await
                    .map_err(|err| Error::transport(url.as_str(), err))?
                    .to_vec(),
            ),
        };
        Ok(body)
    }
}
