//! Adapter exposing the local SQLite store through the `OrderStore` seam.

use anyhow::Result;
use async_trait::async_trait;
use shared::domain::{Order, OrderId, OrderStatus};
use storage::Storage;

use crate::{OrderStore, StatusAck, StoreError};

#[derive(Clone)]
pub struct LocalOrderStore {
    storage: Storage,
}

impl LocalOrderStore {
    pub fn new(storage: Storage) -> Self {
        Self { storage }
    }

    pub async fn open(database_url: &str) -> Result<Self> {
        Ok(Self::new(Storage::new(database_url).await?))
    }

    pub fn storage(&self) -> &Storage {
        &self.storage
    }
}

fn unavailable(err: anyhow::Error) -> StoreError {
    StoreError::Unavailable(format!("{err:#}"))
}

#[async_trait]
impl OrderStore for LocalOrderStore {
    async fn list(&self) -> Result<Vec<Order>, StoreError> {
        self.storage.list_orders().await.map_err(unavailable)
    }

    async fn patch_status(
        &self,
        order_id: &OrderId,
        status: OrderStatus,
    ) -> Result<StatusAck, StoreError> {
        match self
            .storage
            .set_order_status(order_id, status)
            .await
            .map_err(unavailable)?
        {
            Some(order) => Ok(StatusAck {
                order_id: order.id,
                status: order.status,
            }),
            None => Err(StoreError::NotFound(order_id.clone())),
        }
    }

    async fn delete(&self, order_id: &OrderId) -> Result<(), StoreError> {
        if self
            .storage
            .delete_order(order_id)
            .await
            .map_err(unavailable)?
        {
            Ok(())
        } else {
            Err(StoreError::NotFound(order_id.clone()))
        }
    }
}
