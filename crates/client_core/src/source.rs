//! The remote fetch seam a table controller pulls pages through.

use std::{future::Future, marker::PhantomData};

use anyhow::{anyhow, bail, Context, Result};
use async_trait::async_trait;
use futures::future::{BoxFuture, FutureExt};
use reqwest::Client;
use serde::de::DeserializeOwned;
use shared::{protocol::PageResponse, query::QueryParams};
use tracing::warn;
use url::Url;

/// Fetches one page of rows.
///
/// `Err` is a transport failure (unreachable, unreadable answer); an `Ok`
/// envelope with `success: false` is a failure reported by the remote side.
#[async_trait]
pub trait PageSource<R>: Send + Sync {
    async fn fetch_page(&self, params: &QueryParams) -> Result<PageResponse<R>>;
}

type FetchFn<R> = dyn Fn(QueryParams) -> BoxFuture<'static, Result<PageResponse<R>>> + Send + Sync;

pub struct FnPageSource<R> {
    fetch: Box<FetchFn<R>>,
}

impl<R: Send + 'static> FnPageSource<R> {
    pub fn new<F, Fut>(fetch: F) -> Self
    where
        F: Fn(QueryParams) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<PageResponse<R>>> + Send + 'static,
    {
        Self {
            fetch: Box::new(move |params| fetch(params).boxed()),
        }
    }
}

#[async_trait]
impl<R: Send + 'static> PageSource<R> for FnPageSource<R> {
    async fn fetch_page(&self, params: &QueryParams) -> Result<PageResponse<R>> {
        (self.fetch)(params.clone()).await
    }
}

/// Pulls pages from a JSON listing endpoint with `GET {endpoint}?{params}`.
pub struct HttpPageSource<R> {
    http: Client,
    endpoint: Url,
    _rows: PhantomData<fn() -> R>,
}

impl<R> HttpPageSource<R> {
    pub fn new(server_url: &str, path: &str) -> Result<Self> {
        Self::with_client(Client::new(), server_url, path)
    }

    pub fn with_client(http: Client, server_url: &str, path: &str) -> Result<Self> {
        if !(server_url.starts_with("http://") || server_url.starts_with("https://")) {
            bail!("server_url must start with http:// or https://");
        }
        let raw = format!(
            "{}/{}",
            server_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        );
        let endpoint =
            Url::parse(&raw).with_context(|| format!("invalid listing endpoint: {raw}"))?;
        Ok(Self {
            http,
            endpoint,
            _rows: PhantomData,
        })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }
}

#[async_trait]
impl<R: DeserializeOwned + Send + 'static> PageSource<R> for HttpPageSource<R> {
    async fn fetch_page(&self, params: &QueryParams) -> Result<PageResponse<R>> {
        let response = self
            .http
            .get(self.endpoint.clone())
            .query(&params.to_pairs())
            .send()
            .await
            .with_context(|| format!("failed to reach {}", self.endpoint))?;
        let status = response.status();
        let body = response
            .bytes()
            .await
            .with_context(|| format!("failed to read listing body from {}", self.endpoint))?;

        match serde_json::from_slice::<PageResponse<R>>(&body) {
            // Error statuses still carry the envelope's message when the server sent one.
            Ok(page) if status.is_success() || !page.success => Ok(page),
            Ok(_) => Err(anyhow!(
                "listing request to {} failed with status {status}",
                self.endpoint
            )),
            Err(err) if status.is_success() => {
                warn!(endpoint = %self.endpoint, %err, "listing: undecodable response body");
                Err(anyhow!(err).context("invalid listing response"))
            }
            Err(_) => Err(anyhow!(
                "listing request to {} failed with status {status}",
                self.endpoint
            )),
        }
    }
}

#[cfg(test)]
#[path = "tests/source_tests.rs"]
mod tests;
