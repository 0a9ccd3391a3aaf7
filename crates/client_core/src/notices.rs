//! User-facing notices and confirmation prompts raised by the dashboard.

use std::fmt;

use shared::{
    domain::{OrderId, OrderStatus},
    error::ErrorCode,
};

use crate::StoreError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeKind {
    Success,
    Info,
    Error,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DashboardAction {
    LoadOrders,
    UpdateStatus,
    DeleteOrder,
}

impl DashboardAction {
    pub fn as_str(self) -> &'static str {
        match self {
            DashboardAction::LoadOrders => "load_orders",
            DashboardAction::UpdateStatus => "update_status",
            DashboardAction::DeleteOrder => "delete_order",
        }
    }
}

impl fmt::Display for DashboardAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub kind: NoticeKind,
    pub action: DashboardAction,
    pub title: String,
    pub text: String,
    pub hint: Option<String>,
}

impl Notice {
    /// Confirmation for an acknowledged status change. Moving back to
    /// `pending` is silent.
    pub fn status_changed(status: OrderStatus) -> Option<Self> {
        let (title, text) = match status {
            OrderStatus::Pending => return None,
            OrderStatus::Dispatch => ("Dispatch", "The order is now dispatched."),
            OrderStatus::Success => ("Success", "The order has been completed."),
        };
        Some(Self {
            kind: NoticeKind::Success,
            action: DashboardAction::UpdateStatus,
            title: title.to_string(),
            text: text.to_string(),
            hint: None,
        })
    }

    pub fn order_deleted() -> Self {
        Self {
            kind: NoticeKind::Success,
            action: DashboardAction::DeleteOrder,
            title: "Deleted!".to_string(),
            text: "Your order has been deleted.".to_string(),
            hint: None,
        }
    }

    pub fn failure(action: DashboardAction, err: &StoreError) -> Self {
        let text = match action {
            DashboardAction::LoadOrders => "Something went wrong while loading orders.",
            DashboardAction::UpdateStatus => "Something went wrong while updating the status.",
            DashboardAction::DeleteOrder => "Something went wrong while deleting.",
        };
        Self {
            kind: NoticeKind::Error,
            action,
            title: "Error!".to_string(),
            text: text.to_string(),
            hint: failure_hint(err),
        }
    }
}

fn failure_hint(err: &StoreError) -> Option<String> {
    let hint = match err {
        StoreError::NotFound(_) => "The order no longer exists; reload the list.",
        StoreError::Rejected(api) => match api.code {
            ErrorCode::Unauthorized | ErrorCode::Forbidden => {
                "The backend refused the credentials; check the API token."
            }
            ErrorCode::RateLimited => "The backend is rate limiting requests; retry shortly.",
            ErrorCode::Conflict => "The order changed concurrently; reload the list.",
            _ => return None,
        },
        StoreError::Transport(_) | StoreError::Unavailable(_) => {
            "Backend unreachable; check the network and retry."
        }
        StoreError::Decode(_) | StoreError::UnexpectedAck { .. } => return None,
    };
    Some(hint.to_string())
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfirmPrompt {
    pub order_id: OrderId,
    pub title: String,
    pub text: String,
    pub confirm_label: String,
}

impl ConfirmPrompt {
    pub fn delete_order(order_id: &OrderId) -> Self {
        Self {
            order_id: order_id.clone(),
            title: "Are you sure?".to_string(),
            text: "You won't be able to revert this!".to_string(),
            confirm_label: "Yes, delete it!".to_string(),
        }
    }
}
