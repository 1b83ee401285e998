use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use time::OffsetDateTime;

/* ================== Menu ================== */

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Menu {
    #[serde(default)]
    pub categories: Vec<MenuCategory>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MenuCategory {
    pub name: String,
    #[serde(default)]
    pub items: Vec<MenuItem>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MenuItem {
    pub name: String,
    pub price: f64,
}

impl Menu {
    /// Human-readable complaints about the menu file: duplicate item names
    /// inside one category and prices below zero. The menu is served as-is
    /// either way; these only end up in the log.
    pub fn problems(&self) -> Vec<String> {
        let mut out = vec![];
        for cat in &self.categories {
            let mut seen: Vec<&str> = vec![];
            for item in &cat.items {
                if seen.contains(&item.name.as_str()) {
                    out.push(format!("duplicate item '{}' in category '{}'", item.name, cat.name));
                } else {
                    seen.push(&item.name);
                }
                if item.price.is_nan() || item.price < 0.0 {
                    out.push(format!(
                        "item '{}' in category '{}' has invalid price {}",
                        item.name, cat.name, item.price
                    ));
                }
            }
        }
        out
    }
}

/* ================== Orders ================== */

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OrderStatus {
    Pending,
    Preparing,
    Served,
    Paid,
    Cancelled,
}

impl OrderStatus {
    pub const ALL: [OrderStatus; 5] = [
        OrderStatus::Pending,
        OrderStatus::Preparing,
        OrderStatus::Served,
        OrderStatus::Paid,
        OrderStatus::Cancelled,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            OrderStatus::Pending => "Pending",
            OrderStatus::Preparing => "Preparing",
            OrderStatus::Served => "Served",
            OrderStatus::Paid => "Paid",
            OrderStatus::Cancelled => "Cancelled",
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown order status '{0}'")]
pub struct UnknownStatus(pub String);

impl FromStr for OrderStatus {
    type Err = UnknownStatus;

    // Exact, case-sensitive match: "paid" is not a status.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        OrderStatus::ALL
            .into_iter()
            .find(|st| st.as_str() == s)
            .ok_or_else(|| UnknownStatus(s.to_string()))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderLine {
    pub name: String,
    pub price: f64,
    pub qty: u32,
}

impl OrderLine {
    pub fn subtotal(&self) -> f64 {
        self.price * f64::from(self.qty)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: String,
    pub table: String,
    pub items: Vec<OrderLine>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    pub total: f64,
    pub status: OrderStatus,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

/// One slot of the orders file. Records written by older versions of the
/// service may not fit [`Order`] (fractional quantities, missing fields);
/// those stay `Raw` and are written back exactly as they were read.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum StoredOrder {
    Order(Order),
    Raw(Value),
}

impl StoredOrder {
    pub fn decode(raw: Value) -> Result<Self, (Value, serde_json::Error)> {
        match serde_json::from_value::<Order>(raw.clone()) {
            Ok(order) => Ok(StoredOrder::Order(order)),
            Err(e) => Err((raw, e)),
        }
    }

    pub fn id(&self) -> Option<&str> {
        match self {
            StoredOrder::Order(o) => Some(&o.id),
            StoredOrder::Raw(v) => v.get("id").and_then(Value::as_str),
        }
    }

    pub fn as_order(&self) -> Option<&Order> {
        match self {
            StoredOrder::Order(o) => Some(o),
            StoredOrder::Raw(_) => None,
        }
    }

    pub fn set_status(&mut self, status: OrderStatus) {
        match self {
            StoredOrder::Order(o) => o.status = status,
            StoredOrder::Raw(v) => {
                if let Some(obj) = v.as_object_mut() {
                    obj.insert("status".into(), Value::String(status.as_str().into()));
                }
            }
        }
    }
}

pub fn lines_total(lines: &[OrderLine]) -> f64 {
    lines.iter().map(OrderLine::subtotal).sum()
}
