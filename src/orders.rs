//! Order lifecycle: creation from a staff cart, listing, status changes and
//! deletion. Any status may follow any other.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};
use serde_json::{Number, Value};
use time::OffsetDateTime;
use tracing::info;

use crate::{
    error::AppError,
    model::{lines_total, Order, OrderLine, OrderStatus, StoredOrder},
    store::JsonStore,
};

/// Order body as sent by a client. Fields stay loosely typed because the
/// staff screen sends tables and quantities as either numbers or strings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OrderDraft {
    #[serde(default)]
    pub table: Value,
    #[serde(default)]
    pub items: Value,
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub note: Value,
}

/// A draft that passed validation.
#[derive(Debug, Clone, PartialEq)]
pub struct NewOrder {
    pub table: String,
    pub items: Vec<OrderLine>,
    pub note: Option<String>,
}

impl NewOrder {
    pub fn from_draft(draft: &OrderDraft) -> Result<Self, AppError> {
        let table = table_from(&draft.table).ok_or_else(|| AppError::bad_request("Table is required"))?;

        let raw_items = match &draft.items {
            Value::Array(items) if !items.is_empty() => items,
            _ => return Err(AppError::bad_request("Items required")),
        };

        let items: Vec<OrderLine> = raw_items.iter().filter_map(clean_line).collect();
        if items.is_empty() {
            return Err(AppError::bad_request("No valid items"));
        }

        // A total that overflows would be written as `null` and never read back.
        if !lines_total(&items).is_finite() {
            return Err(AppError::bad_request("Order total out of range"));
        }

        Ok(Self {
            table,
            items,
            note: note_from(&draft.note),
        })
    }

    pub fn total(&self) -> f64 {
        lines_total(&self.items)
    }
}

/* ================== Utilities ================== */

// Zero counts as missing; whole floats lose their ".0" (5.0 becomes "5").
fn number_text(n: &Number) -> Option<String> {
    let x = n.as_f64()?;
    if x == 0.0 {
        return None;
    }
    if let Some(i) = n.as_i64() {
        return Some(i.to_string());
    }
    if let Some(u) = n.as_u64() {
        return Some(u.to_string());
    }
    if x.fract() == 0.0 && x.abs() < 1e15 {
        return Some(format!("{x:.0}"));
    }
    Some(x.to_string())
}

fn table_from(v: &Value) -> Option<String> {
    match v {
        Value::String(s) => Some(s.trim().to_string()).filter(|t| !t.is_empty()),
        Value::Number(n) => number_text(n),
        _ => None,
    }
}

/// Notes are stored as typed; only a blank note is dropped.
fn note_from(v: &Value) -> Option<String> {
    match v {
        Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
        Value::Number(n) => number_text(n),
        _ => None,
    }
}

fn f64_from(v: &Value) -> Option<f64> {
    match v {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
    .filter(|x| x.is_finite())
}

fn clean_line(v: &Value) -> Option<OrderLine> {
    let obj = v.as_object()?;

    let name = match obj.get("name")? {
        Value::String(s) if !s.trim().is_empty() => s.clone(),
        Value::Number(n) => number_text(n)?,
        _ => return None,
    };

    let qty = obj
        .get("qty")
        .and_then(f64_from)
        .filter(|q| *q >= 1.0 && q.fract() == 0.0 && *q <= f64::from(u32::MAX))?;

    let price = obj
        .get("price")
        .and_then(f64_from)
        .unwrap_or(0.0)
        .max(0.0);

    Some(OrderLine {
        name,
        price,
        // bounds checked above
        qty: qty as u32,
    })
}

fn now_millis(now: OffsetDateTime) -> u64 {
    u64::try_from(now.unix_timestamp_nanos() / 1_000_000).unwrap_or(0)
}

/* ================== Order book ================== */

pub struct OrderBook {
    store: JsonStore,
    last_id: AtomicU64,
}

impl OrderBook {
    pub fn new(store: JsonStore) -> Self {
        Self {
            store,
            last_id: AtomicU64::new(0),
        }
    }

    pub fn store(&self) -> &JsonStore {
        &self.store
    }

    // Called with the store's write lock held, so load/store need no CAS loop.
    fn next_id(&self, now_ms: u64, existing: &[StoredOrder]) -> String {
        let mut candidate = now_ms.max(self.last_id.load(Ordering::Relaxed) + 1);
        while existing.iter().any(|o| o.id() == Some(candidate.to_string().as_str())) {
            candidate += 1;
        }
        self.last_id.store(candidate, Ordering::Relaxed);
        candidate.to_string()
    }

    pub async fn create(&self, draft: &OrderDraft) -> Result<Order, AppError> {
        let new = NewOrder::from_draft(draft)?;
        let total = new.total();

        let order = self
            .store
            .update_orders(|orders| {
                let created_at = OffsetDateTime::now_utc();
                let order = Order {
                    id: self.next_id(now_millis(created_at), orders),
                    table: new.table,
                    items: new.items,
                    note: new.note,
                    total,
                    status: OrderStatus::Pending,
                    created_at,
                };
                orders.insert(0, StoredOrder::Order(order.clone()));
                Ok::<_, AppError>(order)
            })
            .await?;

        info!(id = %order.id, table = %order.table, total = order.total, "order created");
        Ok(order)
    }

    /// Every stored record, newest first. Records from older versions that
    /// do not fit [`Order`] are listed as they are on disk.
    pub async fn list(&self) -> Vec<StoredOrder> {
        self.store.orders().await
    }

    pub async fn update_status(&self, id: &str, status: &Value) -> Result<StoredOrder, AppError> {
        let status: OrderStatus = status
            .as_str()
            .and_then(|s| s.parse().ok())
            .ok_or_else(|| AppError::bad_request("Invalid status"))?;

        let updated = self
            .store
            .update_orders(|orders| {
                let order = orders
                    .iter_mut()
                    .find(|o| o.id() == Some(id))
                    .ok_or(AppError::OrderNotFound)?;
                order.set_status(status);
                Ok::<_, AppError>(order.clone())
            })
            .await?;

        info!(id, status = %status, "order status updated");
        Ok(updated)
    }

    pub async fn delete(&self, id: &str) -> Result<(), AppError> {
        self.store
            .update_orders(|orders| {
                let idx = orders
                    .iter()
                    .position(|o| o.id() == Some(id))
                    .ok_or(AppError::OrderNotFound)?;
                orders.remove(idx);
                Ok::<_, AppError>(())
            })
            .await?;

        info!(id, "order deleted");
        Ok(())
    }
}
