//! Wire types for the hosted content backend's query and mutation endpoints.

use serde::{Deserialize, Serialize};

use crate::{
    domain::{OrderId, OrderStatus},
    error::{ApiError, ErrorCode},
};

/// Projection of every order document, with cart items dereferenced.
pub const ORDER_LIST_QUERY: &str = r#"*[_type == "order"]{
  _id,
  firstName,
  lastName,
  phone,
  email,
  address,
  city,
  zipCode,
  total,
  discount,
  orderDate,
  status,
  cartItems[]->{
    productName,
    image
  }
}"#;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryResponse<T> {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub query: Option<String>,
    pub result: T,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MutateRequest {
    pub mutations: Vec<Mutation>,
}

impl MutateRequest {
    pub fn set_status(order_id: &OrderId, status: OrderStatus) -> Self {
        Self {
            mutations: vec![Mutation::Patch(PatchMutation {
                id: order_id.clone(),
                set: StatusField { status },
            })],
        }
    }

    pub fn delete(order_id: &OrderId) -> Self {
        Self {
            mutations: vec![Mutation::Delete(DeleteMutation {
                id: order_id.clone(),
            })],
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Mutation {
    Patch(PatchMutation),
    Delete(DeleteMutation),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PatchMutation {
    pub id: OrderId,
    pub set: StatusField,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct StatusField {
    pub status: OrderStatus,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeleteMutation {
    pub id: OrderId,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MutateResponse {
    #[serde(default)]
    pub transaction_id: Option<String>,
    #[serde(default)]
    pub results: Vec<MutationResult>,
}

impl MutateResponse {
    pub fn result_for(&self, order_id: &OrderId) -> Option<&MutationResult> {
        self.results.iter().find(|result| &result.id == order_id)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MutationResult {
    pub id: OrderId,
    #[serde(default)]
    pub operation: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub document: Option<serde_json::Value>,
}

impl MutationResult {
    /// Status as stored after the mutation, when the backend returned the document.
    pub fn document_status(&self) -> Option<OrderStatus> {
        self.document
            .as_ref()?
            .get("status")?
            .as_str()
            .and_then(OrderStatus::parse)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorEnvelope {
    pub error: ErrorBody,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default, rename = "type")]
    pub kind: Option<String>,
}

impl ErrorEnvelope {
    pub fn into_api_error(self, http_status: u16) -> ApiError {
        let message = self
            .error
            .description
            .or(self.error.kind)
            .unwrap_or_else(|| format!("backend returned HTTP {http_status}"));
        ApiError::new(ErrorCode::from_http_status(http_status), message)
    }
}
