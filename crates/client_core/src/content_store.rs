//! HTTP client for the hosted content backend that owns the order documents.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use shared::{
    domain::{Order, OrderId, OrderStatus},
    error::{ApiError, ErrorCode},
    protocol::{ErrorEnvelope, MutateRequest, MutateResponse, QueryResponse, ORDER_LIST_QUERY},
};
use tracing::{debug, info};
use url::Url;

use crate::{OrderStore, StatusAck, StoreError};

pub const DEFAULT_API_VERSION: &str = "2025-02-03";
const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

#[derive(Debug, Clone)]
pub struct ContentStoreConfig {
    pub project_id: String,
    pub dataset: String,
    pub api_version: String,
    pub api_token: Option<String>,
    /// Replaces `https://{project_id}.api.sanity.io`, e.g. for a local stand-in.
    pub api_host: Option<String>,
    pub request_timeout: Duration,
}

impl ContentStoreConfig {
    pub fn new(project_id: impl Into<String>, dataset: impl Into<String>) -> Self {
        Self {
            project_id: project_id.into(),
            dataset: dataset.into(),
            api_version: DEFAULT_API_VERSION.to_string(),
            api_token: None,
            api_host: None,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }

    fn endpoint(&self, operation: &str) -> Result<Url, StoreError> {
        let host = match &self.api_host {
            Some(host) => host.trim_end_matches('/').to_string(),
            None => format!("https://{}.api.sanity.io", self.project_id),
        };
        let version = self.api_version.trim_start_matches('v');
        let raw = format!("{host}/v{version}/data/{operation}/{}", self.dataset);
        Url::parse(&raw)
            .map_err(|e| StoreError::Unavailable(format!("invalid backend url '{raw}': {e}")))
    }
}

pub struct ContentOrderStore {
    http: Client,
    query_url: Url,
    mutate_url: Url,
    api_token: Option<String>,
}

impl ContentOrderStore {
    pub fn new(config: ContentStoreConfig) -> Result<Self, StoreError> {
        let http = Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| StoreError::Unavailable(format!("failed to build http client: {e}")))?;
        Ok(Self {
            http,
            query_url: config.endpoint("query")?,
            mutate_url: config.endpoint("mutate")?,
            api_token: config.api_token,
        })
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.api_token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    async fn mutate(&self, body: &MutateRequest) -> Result<MutateResponse, StoreError> {
        let request = self
            .http
            .post(self.mutate_url.clone())
            .query(&[("returnDocuments", "true"), ("visibility", "sync")])
            .json(body);
        let response = self.authorized(request).send().await?;
        decode_response(response).await
    }
}

#[async_trait]
impl OrderStore for ContentOrderStore {
    async fn list(&self) -> Result<Vec<Order>, StoreError> {
        let request = self
            .http
            .get(self.query_url.clone())
            .query(&[("query", ORDER_LIST_QUERY)]);
        let response = self.authorized(request).send().await?;
        let body: QueryResponse<Vec<Order>> = decode_response(response).await?;
        debug!(count = body.result.len(), ms = ?body.ms, "content: order query answered");
        Ok(body.result)
    }

    async fn patch_status(
        &self,
        order_id: &OrderId,
        status: OrderStatus,
    ) -> Result<StatusAck, StoreError> {
        let response = self
            .mutate(&MutateRequest::set_status(order_id, status))
            .await
            .map_err(|err| not_found_for(order_id, err))?;
        let Some(result) = response.result_for(order_id) else {
            return Err(StoreError::NotFound(order_id.clone()));
        };
        info!(
            order_id = %order_id,
            status = %status,
            transaction_id = ?response.transaction_id,
            "content: status patch committed"
        );
        Ok(StatusAck {
            order_id: order_id.clone(),
            status: result.document_status(),
        })
    }

    async fn delete(&self, order_id: &OrderId) -> Result<(), StoreError> {
        let response = self
            .mutate(&MutateRequest::delete(order_id))
            .await
            .map_err(|err| not_found_for(order_id, err))?;
        // Deleting a missing document commits an empty transaction.
        if response.result_for(order_id).is_none() {
            return Err(StoreError::NotFound(order_id.clone()));
        }
        info!(
            order_id = %order_id,
            transaction_id = ?response.transaction_id,
            "content: order deleted"
        );
        Ok(())
    }
}

fn not_found_for(order_id: &OrderId, err: StoreError) -> StoreError {
    match err {
        StoreError::Rejected(api) if api.code == ErrorCode::NotFound => {
            StoreError::NotFound(order_id.clone())
        }
        other => other,
    }
}

async fn decode_response<T: DeserializeOwned>(response: Response) -> Result<T, StoreError> {
    let status = response.status();
    if status.is_success() {
        return response
            .json::<T>()
            .await
            .map_err(|e| StoreError::Decode(e.to_string()));
    }

    let code = status.as_u16();
    let body = response.text().await.unwrap_or_default();
    let api_error = match serde_json::from_str::<ErrorEnvelope>(&body) {
        Ok(envelope) => envelope.into_api_error(code),
        Err(_) if body.trim().is_empty() => ApiError::new(
            ErrorCode::from_http_status(code),
            format!("backend returned HTTP {code}"),
        ),
        Err(_) => ApiError::new(ErrorCode::from_http_status(code), body.trim()),
    };
    Err(StoreError::Rejected(api_error))
}

#[cfg(test)]
#[path = "tests/content_store_tests.rs"]
mod tests;
