use std::{
    collections::{HashMap, HashSet},
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
};

use async_trait::async_trait;
use shared::{
    domain::{Order, OrderId, OrderStatus, StatusCounts, StatusFilter},
    error::ApiError,
};
use thiserror::Error;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, error, info, warn};

pub mod content_store;
pub mod image;
pub mod local_store;
pub mod notices;

pub use content_store::{ContentOrderStore, ContentStoreConfig};
pub use image::{CdnImageResolver, ImageResolver, NoImageResolver};
pub use local_store::LocalOrderStore;
pub use notices::{ConfirmPrompt, DashboardAction, Notice, NoticeKind};

#[derive(Debug, Clone, Error)]
pub enum StoreError {
    #[error("order {0} not found")]
    NotFound(OrderId),
    #[error("backend rejected request: {0}")]
    Rejected(ApiError),
    #[error("transport failure: {0}")]
    Transport(String),
    #[error("undecodable backend response: {0}")]
    Decode(String),
    #[error("order store unavailable: {0}")]
    Unavailable(String),
    #[error("write acknowledged status {echoed:?} instead of {requested}")]
    UnexpectedAck {
        requested: OrderStatus,
        echoed: Option<OrderStatus>,
    },
}

impl From<reqwest::Error> for StoreError {
    fn from(value: reqwest::Error) -> Self {
        if value.is_decode() {
            StoreError::Decode(value.to_string())
        } else {
            StoreError::Transport(value.to_string())
        }
    }
}

/// Acknowledgment of a status write, carrying the status the store now holds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusAck {
    pub order_id: OrderId,
    pub status: Option<OrderStatus>,
}

/// System of record for orders.
#[async_trait]
pub trait OrderStore: Send + Sync {
    async fn list(&self) -> Result<Vec<Order>, StoreError>;
    async fn patch_status(
        &self,
        order_id: &OrderId,
        status: OrderStatus,
    ) -> Result<StatusAck, StoreError>;
    async fn delete(&self, order_id: &OrderId) -> Result<(), StoreError>;
}

#[async_trait]
pub trait NotificationSink: Send + Sync {
    /// Blocks the calling operation until the operator accepts or declines.
    async fn confirm(&self, prompt: &ConfirmPrompt) -> bool;
    async fn notify(&self, notice: Notice);
}

/// Sink for unattended use: logs notices and declines every confirmation.
pub struct LoggingNotificationSink;

#[async_trait]
impl NotificationSink for LoggingNotificationSink {
    async fn confirm(&self, prompt: &ConfirmPrompt) -> bool {
        warn!(order_id = %prompt.order_id, "notice: declining confirmation without an operator");
        false
    }

    async fn notify(&self, notice: Notice) {
        match notice.kind {
            NoticeKind::Error => {
                warn!(action = %notice.action, title = %notice.title, "notice: {}", notice.text)
            }
            _ => info!(action = %notice.action, title = %notice.title, "notice: {}", notice.text),
        }
    }
}

#[derive(Debug, Error)]
pub enum DashboardError {
    #[error("failed to load orders: {0}")]
    FetchFailure(#[source] StoreError),
    #[error("{action} failed for order {order_id}: {source}")]
    WriteFailure {
        action: DashboardAction,
        order_id: OrderId,
        #[source]
        source: StoreError,
    },
    #[error("order {0} is not loaded")]
    UnknownOrder(OrderId),
    #[error("dashboard is closed")]
    Closed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteOutcome {
    Deleted,
    Cancelled,
}

/// Local projection of the dashboard: the loaded orders in fetch order and
/// the order whose details are expanded, if any.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DashboardSnapshot {
    pub orders: Vec<Order>,
    pub expanded: Option<OrderId>,
}

impl DashboardSnapshot {
    fn position(&self, order_id: &OrderId) -> Option<usize> {
        self.orders.iter().position(|order| &order.id == order_id)
    }
}

/// A write applied to the local list after its acknowledgment.
#[derive(Debug, Clone)]
enum AppliedWrite {
    Status(OrderId, OrderStatus),
    Deleted(OrderId),
}

/// The snapshot plus the bookkeeping that keeps a slow list fetch from
/// undoing writes acknowledged while it was in flight.
#[derive(Debug, Default)]
struct DashboardState {
    view: DashboardSnapshot,
    generation: u64,
    fetches_in_flight: usize,
    journal: Vec<(u64, AppliedWrite)>,
}

impl DashboardState {
    fn begin_fetch(&mut self) -> u64 {
        self.fetches_in_flight += 1;
        self.generation
    }

    fn finish_fetch(&mut self) {
        self.fetches_in_flight = self.fetches_in_flight.saturating_sub(1);
        if self.fetches_in_flight == 0 {
            self.journal.clear();
        }
    }

    fn record(&mut self, write: AppliedWrite) {
        self.generation += 1;
        if self.fetches_in_flight > 0 {
            self.journal.push((self.generation, write));
        }
    }

    /// Re-applies writes acknowledged after `generation` to a fetched list.
    fn replay_since(&self, generation: u64, orders: &mut Vec<Order>) {
        for (_, write) in self.journal.iter().filter(|(at, _)| *at > generation) {
            match write {
                AppliedWrite::Status(order_id, status) => {
                    if let Some(order) = orders.iter_mut().find(|order| &order.id == order_id) {
                        order.status = Some(*status);
                    }
                }
                AppliedWrite::Deleted(order_id) => orders.retain(|order| &order.id != order_id),
            }
        }
    }
}

/// Keeps the loaded order list consistent with operator-issued status
/// changes and deletions. Local state changes only after the store
/// acknowledges a write.
pub struct DashboardController {
    store: Arc<dyn OrderStore>,
    notifier: Arc<dyn NotificationSink>,
    state: RwLock<DashboardState>,
    mutation_locks: Mutex<HashMap<OrderId, Arc<Mutex<()>>>>,
    closed: AtomicBool,
}

impl DashboardController {
    pub fn new(store: Arc<dyn OrderStore>, notifier: Arc<dyn NotificationSink>) -> Arc<Self> {
        Arc::new(Self {
            store,
            notifier,
            state: RwLock::new(DashboardState::default()),
            mutation_locks: Mutex::new(HashMap::new()),
            closed: AtomicBool::new(false),
        })
    }

    /// Replaces the local list with a fresh fetch. Returns the number of orders loaded.
    ///
    /// Writes acknowledged while the fetch was in flight are re-applied to the
    /// fetched list, so a deleted order cannot come back from a stale response.
    pub async fn load_orders(&self) -> Result<usize, DashboardError> {
        self.ensure_open()?;
        let started_at = self.state.write().await.begin_fetch();
        let fetched = self.store.list().await;

        let mut guard = self.state.write().await;
        if self.is_closed() {
            guard.finish_fetch();
            debug!("dashboard: discarding order list received after close");
            return Err(DashboardError::Closed);
        }

        match fetched {
            Ok(orders) => {
                let mut orders = dedupe_by_id(orders);
                guard.replay_since(started_at, &mut orders);
                guard.finish_fetch();

                let count = orders.len();
                let present: HashSet<OrderId> =
                    orders.iter().map(|order| order.id.clone()).collect();
                let keep_expanded = guard
                    .view
                    .expanded
                    .as_ref()
                    .is_some_and(|id| present.contains(id));
                if !keep_expanded {
                    guard.view.expanded = None;
                }
                guard.view.orders = orders;
                drop(guard);

                self.prune_mutation_locks(&present).await;
                info!(count, "dashboard: orders loaded");
                Ok(count)
            }
            Err(err) => {
                guard.finish_fetch();
                drop(guard);
                error!(error = %err, "dashboard: failed to load orders");
                self.notifier
                    .notify(Notice::failure(DashboardAction::LoadOrders, &err))
                    .await;
                Err(DashboardError::FetchFailure(err))
            }
        }
    }

    pub async fn set_status(
        &self,
        order_id: &OrderId,
        status: OrderStatus,
    ) -> Result<(), DashboardError> {
        self.ensure_open()?;
        self.ensure_loaded(order_id).await?;

        let lock = self.mutation_lock(order_id).await;
        let _serialized = lock.lock().await;
        // The dashboard may have closed, or a mutation queued ahead of this
        // one may have deleted the order.
        self.ensure_open()?;
        self.ensure_loaded(order_id).await?;

        let outcome = match self.store.patch_status(order_id, status).await {
            Ok(ack) if ack.status == Some(status) => Ok(()),
            Ok(ack) => Err(StoreError::UnexpectedAck {
                requested: status,
                echoed: ack.status,
            }),
            Err(err) => Err(err),
        };
        if self.is_closed() {
            debug!(order_id = %order_id, "dashboard: discarding status result after close");
            return Err(DashboardError::Closed);
        }

        match outcome {
            Ok(()) => {
                let applied = {
                    let mut guard = self.state.write().await;
                    guard.record(AppliedWrite::Status(order_id.clone(), status));
                    match guard.view.orders.iter_mut().find(|order| &order.id == order_id) {
                        Some(order) => {
                            order.status = Some(status);
                            true
                        }
                        None => false,
                    }
                };
                if applied {
                    info!(order_id = %order_id, status = %status, "dashboard: status updated");
                } else {
                    warn!(order_id = %order_id, "dashboard: order left the list before its status ack");
                }
                if let Some(notice) = Notice::status_changed(status) {
                    self.notifier.notify(notice).await;
                }
                Ok(())
            }
            Err(source) => {
                error!(
                    order_id = %order_id,
                    status = %status,
                    error = %source,
                    "dashboard: status update failed"
                );
                self.notifier
                    .notify(Notice::failure(DashboardAction::UpdateStatus, &source))
                    .await;
                Err(DashboardError::WriteFailure {
                    action: DashboardAction::UpdateStatus,
                    order_id: order_id.clone(),
                    source,
                })
            }
        }
    }

    pub async fn delete_order(&self, order_id: &OrderId) -> Result<DeleteOutcome, DashboardError> {
        self.ensure_open()?;
        self.ensure_loaded(order_id).await?;

        if !self
            .notifier
            .confirm(&ConfirmPrompt::delete_order(order_id))
            .await
        {
            info!(order_id = %order_id, "dashboard: delete cancelled by operator");
            return Ok(DeleteOutcome::Cancelled);
        }

        let lock = self.mutation_lock(order_id).await;
        let _serialized = lock.lock().await;
        self.ensure_open()?;
        self.ensure_loaded(order_id).await?;

        let outcome = self.store.delete(order_id).await;
        if self.is_closed() {
            debug!(order_id = %order_id, "dashboard: discarding delete result after close");
            return Err(DashboardError::Closed);
        }

        match outcome {
            Ok(()) => {
                {
                    let mut guard = self.state.write().await;
                    guard.record(AppliedWrite::Deleted(order_id.clone()));
                    if let Some(index) = guard.view.position(order_id) {
                        guard.view.orders.remove(index);
                    }
                    if guard.view.expanded.as_ref() == Some(order_id) {
                        guard.view.expanded = None;
                    }
                }
                self.mutation_locks.lock().await.remove(order_id);
                info!(order_id = %order_id, "dashboard: order deleted");
                self.notifier.notify(Notice::order_deleted()).await;
                Ok(DeleteOutcome::Deleted)
            }
            Err(source) => {
                error!(order_id = %order_id, error = %source, "dashboard: delete failed");
                self.notifier
                    .notify(Notice::failure(DashboardAction::DeleteOrder, &source))
                    .await;
                Err(DashboardError::WriteFailure {
                    action: DashboardAction::DeleteOrder,
                    order_id: order_id.clone(),
                    source,
                })
            }
        }
    }

    /// Expands the order's details, or collapses them if they were already
    /// expanded. Returns the order expanded afterwards.
    pub async fn toggle_details(&self, order_id: &OrderId) -> Option<OrderId> {
        let mut guard = self.state.write().await;
        let view = &mut guard.view;
        if view.expanded.as_ref() == Some(order_id) {
            view.expanded = None;
        } else {
            view.expanded = Some(order_id.clone());
        }
        view.expanded.clone()
    }

    pub async fn expanded(&self) -> Option<OrderId> {
        self.state.read().await.view.expanded.clone()
    }

    pub async fn counts(&self) -> StatusCounts {
        StatusCounts::tally(&self.state.read().await.view.orders)
    }

    pub async fn orders(&self) -> Vec<Order> {
        self.state.read().await.view.orders.clone()
    }

    pub async fn filtered_orders(&self, filter: StatusFilter) -> Vec<Order> {
        self.state
            .read()
            .await
            .view
            .orders
            .iter()
            .filter(|order| filter.matches(order))
            .cloned()
            .collect()
    }

    pub async fn order(&self, order_id: &OrderId) -> Option<Order> {
        let guard = self.state.read().await;
        guard
            .view
            .position(order_id)
            .map(|index| guard.view.orders[index].clone())
    }

    pub async fn snapshot(&self) -> DashboardSnapshot {
        self.state.read().await.view.clone()
    }

    /// Tears the dashboard down. Results of requests still in flight are dropped.
    pub fn close(&self) {
        if !self.closed.swap(true, Ordering::SeqCst) {
            info!("dashboard: closed");
        }
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    fn ensure_open(&self) -> Result<(), DashboardError> {
        if self.is_closed() {
            return Err(DashboardError::Closed);
        }
        Ok(())
    }

    async fn ensure_loaded(&self, order_id: &OrderId) -> Result<(), DashboardError> {
        if self.state.read().await.view.position(order_id).is_some() {
            return Ok(());
        }
        warn!(order_id = %order_id, "dashboard: ignoring operation on an order that is not loaded");
        Err(DashboardError::UnknownOrder(order_id.clone()))
    }

    async fn mutation_lock(&self, order_id: &OrderId) -> Arc<Mutex<()>> {
        self.mutation_locks
            .lock()
            .await
            .entry(order_id.clone())
            .or_default()
            .clone()
    }

    /// Drops locks of orders that left the list and are not held by a caller.
    async fn prune_mutation_locks(&self, present: &HashSet<OrderId>) {
        self.mutation_locks
            .lock()
            .await
            .retain(|order_id, lock| present.contains(order_id) || Arc::strong_count(lock) > 1);
    }
}

fn dedupe_by_id(orders: Vec<Order>) -> Vec<Order> {
    let mut seen = HashSet::with_capacity(orders.len());
    orders
        .into_iter()
        .filter(|order| {
            let fresh = seen.insert(order.id.clone());
            if !fresh {
                warn!(order_id = %order.id, "dashboard: dropping duplicate order from fetch");
            }
            fresh
        })
        .collect()
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
