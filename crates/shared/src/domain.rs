use std::fmt;

use chrono::{DateTime, FixedOffset, NaiveDate};
use serde::{Deserialize, Deserializer, Serialize};

macro_rules! id_newtype {
    ($name:ident) => {
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            pub fn new(value: impl Into<String>) -> Self {
                Self(value.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.pad(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.to_string())
            }
        }
    };
}

id_newtype!(OrderId);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    Pending,
    Dispatch,
    Success,
}

impl OrderStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Dispatch => "dispatch",
            OrderStatus::Success => "success",
        }
    }

    /// Operator-facing label, as shown in the status selector.
    pub fn label(self) -> &'static str {
        match self {
            OrderStatus::Pending => "Pending",
            OrderStatus::Dispatch => "Dispatch",
            OrderStatus::Success => "Completed",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "pending" => Some(OrderStatus::Pending),
            "dispatch" => Some(OrderStatus::Dispatch),
            "success" => Some(OrderStatus::Success),
            _ => None,
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl std::str::FromStr for OrderStatus {
    type Err = crate::error::UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| crate::error::UnknownStatus(s.to_string()))
    }
}

/// Opaque reference to an image asset held by the content backend.
///
/// The backend hands these out either as a bare reference string or as an
/// image object wrapping `asset._ref`; both forms decode to the same value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ImageRef(pub String);

impl ImageRef {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl<'de> Deserialize<'de> for ImageRef {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        struct AssetPointer {
            #[serde(rename = "_ref")]
            reference: String,
        }

        #[derive(Deserialize)]
        #[serde(untagged)]
        enum RawImage {
            Reference(String),
            Object { asset: AssetPointer },
        }

        Ok(match RawImage::deserialize(deserializer)? {
            RawImage::Reference(reference) => ImageRef(reference),
            RawImage::Object { asset } => ImageRef(asset.reference),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartItem {
    #[serde(default, deserialize_with = "null_as_default")]
    pub product_name: String,
    #[serde(default, deserialize_with = "lenient_image")]
    pub image: Option<ImageRef>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    #[serde(rename = "_id")]
    pub id: OrderId,
    #[serde(default, deserialize_with = "null_as_default")]
    pub first_name: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub last_name: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub phone: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub email: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub address: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub city: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub zip_code: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub total: f64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub discount: f64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub order_date: String,
    #[serde(default, deserialize_with = "lenient_status")]
    pub status: Option<OrderStatus>,
    #[serde(default, deserialize_with = "dereferenced_items")]
    pub cart_items: Vec<CartItem>,
}

impl Order {
    pub fn customer_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
            .trim()
            .to_string()
    }

    /// Calendar date of `order_date` for display. Falls back to the raw value
    /// when the backend sent something that is not a recognizable timestamp.
    pub fn display_date(&self) -> String {
        let raw = self.order_date.trim();
        if let Ok(parsed) = DateTime::<FixedOffset>::parse_from_rfc3339(raw) {
            return parsed.date_naive().to_string();
        }
        if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
            return date.to_string();
        }
        raw.to_string()
    }
}

/// Per-status tallies over the loaded order list.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatusCounts {
    pub total: usize,
    pub pending: usize,
    pub dispatch: usize,
    pub success: usize,
    pub unset: usize,
}

impl StatusCounts {
    pub fn tally<'a>(orders: impl IntoIterator<Item = &'a Order>) -> Self {
        let mut counts = Self::default();
        for order in orders {
            counts.total += 1;
            match order.status {
                Some(OrderStatus::Pending) => counts.pending += 1,
                Some(OrderStatus::Dispatch) => counts.dispatch += 1,
                Some(OrderStatus::Success) => counts.success += 1,
                None => counts.unset += 1,
            }
        }
        counts
    }

    pub fn for_status(&self, status: OrderStatus) -> usize {
        match status {
            OrderStatus::Pending => self.pending,
            OrderStatus::Dispatch => self.dispatch,
            OrderStatus::Success => self.success,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum StatusFilter {
    #[default]
    All,
    Only(OrderStatus),
    Unset,
}

impl StatusFilter {
    pub fn matches(self, order: &Order) -> bool {
        match self {
            StatusFilter::All => true,
            StatusFilter::Only(status) => order.status == Some(status),
            StatusFilter::Unset => order.status.is_none(),
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "all" => Some(StatusFilter::All),
            "unset" | "none" => Some(StatusFilter::Unset),
            other => OrderStatus::parse(other).map(StatusFilter::Only),
        }
    }
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

// Values outside the closed status set read as unset rather than failing the
// whole list.
fn lenient_status<'de, D>(deserializer: D) -> Result<Option<OrderStatus>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    Ok(raw.as_deref().and_then(OrderStatus::parse))
}

fn lenient_image<'de, D>(deserializer: D) -> Result<Option<ImageRef>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(raw.and_then(|value| serde_json::from_value::<ImageRef>(value).ok()))
}

// Dangling cart references come back as null entries.
fn dereferenced_items<'de, D>(deserializer: D) -> Result<Vec<CartItem>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<Vec<Option<CartItem>>>::deserialize(deserializer)?;
    Ok(raw.unwrap_or_default().into_iter().flatten().collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn decodes_backend_projection_with_nulls() {
        let order: Order = serde_json::from_value(json!({
            "_id": "o1",
            "firstName": "Ada",
            "lastName": null,
            "total": 50,
            "discount": null,
            "orderDate": "2025-02-10T09:30:00Z",
            "status": null,
            "cartItems": [
                {"productName": "Chair", "image": {"_type": "image", "asset": {"_ref": "image-abc-40x40-png"}}},
                null,
                {"productName": "Lamp", "image": null}
            ]
        }))
        .expect("decode");

        assert_eq!(order.id, OrderId::from("o1"));
        assert_eq!(order.last_name, "");
        assert_eq!(order.discount, 0.0);
        assert_eq!(order.status, None);
        assert_eq!(order.cart_items.len(), 2);
        assert_eq!(
            order.cart_items[0].image,
            Some(ImageRef("image-abc-40x40-png".into()))
        );
        assert_eq!(order.cart_items[1].image, None);
        assert_eq!(order.display_date(), "2025-02-10");
    }

    #[test]
    fn unknown_status_reads_as_unset() {
        let order: Order =
            serde_json::from_value(json!({"_id": "o9", "status": "cancelled"})).expect("decode");
        assert_eq!(order.status, None);
        assert!(order.cart_items.is_empty());
    }

    #[test]
    fn status_serializes_as_lowercase_name() {
        assert_eq!(
            serde_json::to_value(OrderStatus::Dispatch).expect("encode"),
            json!("dispatch")
        );
        assert_eq!("SUCCESS".parse::<OrderStatus>().ok(), Some(OrderStatus::Success));
        assert!("shipped".parse::<OrderStatus>().is_err());
    }

    #[test]
    fn counts_partition_total() {
        let mk = |id: &str, status| Order {
            id: OrderId::from(id),
            first_name: String::new(),
            last_name: String::new(),
            phone: String::new(),
            email: String::new(),
            address: String::new(),
            city: String::new(),
            zip_code: String::new(),
            total: 0.0,
            discount: 0.0,
            order_date: String::new(),
            status,
            cart_items: Vec::new(),
        };
        let orders = vec![
            mk("a", Some(OrderStatus::Pending)),
            mk("b", None),
            mk("c", Some(OrderStatus::Success)),
            mk("d", Some(OrderStatus::Pending)),
        ];
        let counts = StatusCounts::tally(&orders);
        assert_eq!(counts.total, 4);
        assert_eq!(counts.for_status(OrderStatus::Pending), 2);
        assert_eq!(
            counts.pending + counts.dispatch + counts.success + counts.unset,
            counts.total
        );
        assert_eq!(
            orders
                .iter()
                .filter(|o| StatusFilter::Unset.matches(o))
                .count(),
            1
        );
    }

    #[test]
    fn display_date_falls_back_to_raw_value() {
        let order: Order =
            serde_json::from_value(json!({"_id": "o2", "orderDate": "last tuesday"}))
                .expect("decode");
        assert_eq!(order.display_date(), "last tuesday");
    }
}
