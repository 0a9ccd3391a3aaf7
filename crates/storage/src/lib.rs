use anyhow::{Context, Result};
use shared::domain::{CartItem, Order, OrderId, OrderStatus};
use sqlx::{
    sqlite::{SqliteConnectOptions, SqlitePoolOptions, SqliteRow},
    Pool, Row, Sqlite,
};
use std::{
    fs,
    path::{Path, PathBuf},
    str::FromStr,
};
use tracing::{debug, warn};

const ORDER_COLUMNS: &str = "id, first_name, last_name, phone, email, address, city, zip_code, \
     total, discount, order_date, status, cart_items";

/// Local SQLite order store. Orders keep the position of their first insert.
#[derive(Clone)]
pub struct Storage {
    pool: Pool<Sqlite>,
}

impl Storage {
    pub async fn new(database_url: &str) -> Result<Self> {
        ensure_sqlite_parent_dir_exists(database_url)?;

        let connect_options = SqliteConnectOptions::from_str(database_url)
            .with_context(|| format!("invalid sqlite url '{database_url}'"))?
            .create_if_missing(true);
        // In-memory databases live and die with their single connection.
        let pool = if database_url.contains(":memory:") {
            SqlitePoolOptions::new()
                .max_connections(1)
                .min_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
        } else {
            SqlitePoolOptions::new().max_connections(5)
        }
        .connect_with(connect_options)
        .await?;
        sqlx::migrate!("./migrations").run(&pool).await?;
        Ok(Self { pool })
    }

    pub async fn health_check(&self) -> Result<()> {
        let _: i64 = sqlx::query_scalar("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .context("sqlite ping failed")?;
        Ok(())
    }

    /// Inserts the order, or replaces every field of an existing one in place.
    pub async fn upsert_order(&self, order: &Order) -> Result<()> {
        let cart_items = serde_json::to_string(&order.cart_items)
            .context("failed to encode cart items")?;
        sqlx::query(
            "INSERT INTO orders (id, first_name, last_name, phone, email, address, city, zip_code,
                                 total, discount, order_date, status, cart_items)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
             ON CONFLICT(id) DO UPDATE SET
                first_name=excluded.first_name, last_name=excluded.last_name,
                phone=excluded.phone, email=excluded.email, address=excluded.address,
                city=excluded.city, zip_code=excluded.zip_code, total=excluded.total,
                discount=excluded.discount, order_date=excluded.order_date,
                status=excluded.status, cart_items=excluded.cart_items,
                updated_at=CURRENT_TIMESTAMP",
        )
        .bind(order.id.as_str())
        .bind(&order.first_name)
        .bind(&order.last_name)
        .bind(&order.phone)
        .bind(&order.email)
        .bind(&order.address)
        .bind(&order.city)
        .bind(&order.zip_code)
        .bind(order.total)
        .bind(order.discount)
        .bind(&order.order_date)
        .bind(order.status.map(OrderStatus::as_str))
        .bind(cart_items)
        .execute(&self.pool)
        .await
        .with_context(|| format!("failed to upsert order {}", order.id))?;
        Ok(())
    }

    pub async fn list_orders(&self) -> Result<Vec<Order>> {
        let rows = sqlx::query(&format!("SELECT {ORDER_COLUMNS} FROM orders ORDER BY seq ASC"))
            .fetch_all(&self.pool)
            .await
            .context("failed to list orders")?;
        rows.iter().map(order_from_row).collect()
    }

    pub async fn find_order(&self, order_id: &OrderId) -> Result<Option<Order>> {
        let row = sqlx::query(&format!("SELECT {ORDER_COLUMNS} FROM orders WHERE id = ?"))
            .bind(order_id.as_str())
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(order_from_row).transpose()
    }

    /// Returns the updated order, or `None` when no order has this id.
    pub async fn set_order_status(
        &self,
        order_id: &OrderId,
        status: OrderStatus,
    ) -> Result<Option<Order>> {
        let affected = sqlx::query(
            "UPDATE orders SET status = ?, updated_at = CURRENT_TIMESTAMP WHERE id = ?",
        )
        .bind(status.as_str())
        .bind(order_id.as_str())
        .execute(&self.pool)
        .await
        .with_context(|| format!("failed to update status of order {order_id}"))?
        .rows_affected();

        if affected == 0 {
            debug!(order_id = %order_id, "storage: status update for unknown order");
            return Ok(None);
        }
        self.find_order(order_id).await
    }

    /// Returns whether a row was removed.
    pub async fn delete_order(&self, order_id: &OrderId) -> Result<bool> {
        let affected = sqlx::query("DELETE FROM orders WHERE id = ?")
            .bind(order_id.as_str())
            .execute(&self.pool)
            .await
            .with_context(|| format!("failed to delete order {order_id}"))?
            .rows_affected();
        Ok(affected > 0)
    }

    pub async fn count_orders(&self) -> Result<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM orders")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}

fn order_from_row(row: &SqliteRow) -> Result<Order> {
    let id: String = row.try_get("id")?;
    let raw_status: Option<String> = row.try_get("status")?;
    let status = raw_status.as_deref().and_then(|raw| {
        let parsed = OrderStatus::parse(raw);
        if parsed.is_none() {
            warn!(order_id = %id, status = raw, "storage: ignoring unknown stored status");
        }
        parsed
    });
    let raw_items: String = row.try_get("cart_items")?;
    let cart_items: Vec<CartItem> = serde_json::from_str(&raw_items)
        .with_context(|| format!("corrupt cart items for order {id}"))?;

    Ok(Order {
        id: OrderId(id),
        first_name: row.try_get("first_name")?,
        last_name: row.try_get("last_name")?,
        phone: row.try_get("phone")?,
        email: row.try_get("email")?,
        address: row.try_get("address")?,
        city: row.try_get("city")?,
        zip_code: row.try_get("zip_code")?,
        total: row.try_get("total")?,
        discount: row.try_get("discount")?,
        order_date: row.try_get("order_date")?,
        status,
        cart_items,
    })
}

fn ensure_sqlite_parent_dir_exists(database_url: &str) -> Result<()> {
    let Some(path) = sqlite_path(database_url) else {
        return Ok(());
    };

    let Some(parent) = path.parent() else {
        return Ok(());
    };

    fs::create_dir_all(parent).with_context(|| {
        format!(
            "failed to create parent directory '{}' for database url '{database_url}'",
            parent.display()
        )
    })?;

    Ok(())
}

fn sqlite_path(database_url: &str) -> Option<PathBuf> {
    if database_url.starts_with("sqlite::memory:") || !database_url.starts_with("sqlite:") {
        return None;
    }

    let path = database_url
        .trim_start_matches("sqlite://")
        .trim_start_matches("sqlite:")
        .split('?')
        .next()
        .unwrap_or_default();

    if path.is_empty() {
        return None;
    }

    Some(Path::new(path).to_path_buf())
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
