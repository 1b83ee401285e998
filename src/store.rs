//! Whole-file JSON persistence for the menu and the order list.
//!
//! Every read goes to disk; every mutation reads the full order list,
//! changes it in memory and writes the whole file back. Reads never fail:
//! a missing, blank or unparsable file is treated as empty. Individual
//! records that do not decode are kept verbatim in their slot.

use std::path::{Path, PathBuf};

use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::model::{Menu, StoredOrder};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("write {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("encode {path}: {source}")]
    Encode {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

pub struct JsonStore {
    menu_path: PathBuf,
    orders_path: PathBuf,
    // Serializes read-modify-write cycles on the orders file within this process.
    write_lock: Mutex<()>,
}

impl JsonStore {
    pub fn new(menu_path: impl Into<PathBuf>, orders_path: impl Into<PathBuf>) -> Self {
        Self {
            menu_path: menu_path.into(),
            orders_path: orders_path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn menu_path(&self) -> &Path {
        &self.menu_path
    }

    pub fn orders_path(&self) -> &Path {
        &self.orders_path
    }

    pub async fn menu(&self) -> Menu {
        read_json(&self.menu_path).await.unwrap_or_default()
    }

    /// Stored orders, newest first.
    pub async fn orders(&self) -> Vec<StoredOrder> {
        read_orders(&self.orders_path).await
    }

    /// Runs `f` against the current order list and persists the list if `f`
    /// succeeds. Nothing is written when `f` returns an error.
    pub async fn update_orders<T, E, F>(&self, f: F) -> Result<T, E>
    where
        F: FnOnce(&mut Vec<StoredOrder>) -> Result<T, E>,
        E: From<StoreError>,
    {
        let _guard = self.write_lock.lock().await;

        let mut orders = read_orders(&self.orders_path).await;
        let out = f(&mut orders)?;
        write_json(&self.orders_path, &orders).await?;

        Ok(out)
    }
}

/* ================== Low-level helpers ================== */

async fn read_raw(path: &Path) -> Option<Value> {
    let raw = match tokio::fs::read_to_string(path).await {
        Ok(raw) => raw,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            debug!(path = %path.display(), "file missing, using empty default");
            return None;
        }
        Err(e) => {
            warn!(path = %path.display(), error = %e, "read failed, using empty default");
            return None;
        }
    };

    if raw.trim().is_empty() {
        return None;
    }

    match serde_json::from_str(&raw) {
        Ok(v) => Some(v),
        Err(e) => {
            warn!(path = %path.display(), error = %e, "invalid JSON, using empty default");
            None
        }
    }
}

async fn read_json<T: DeserializeOwned>(path: &Path) -> Option<T> {
    let value = read_raw(path).await?;
    serde_json::from_value(value)
        .map_err(|e| warn!(path = %path.display(), error = %e, "unexpected shape, using empty default"))
        .ok()
}

// Decodes record by record so one odd order does not hide the others.
async fn read_orders(path: &Path) -> Vec<StoredOrder> {
    let Some(value) = read_raw(path).await else {
        return vec![];
    };

    let Value::Array(records) = value else {
        warn!(path = %path.display(), "orders file is not an array, using empty list");
        return vec![];
    };

    records
        .into_iter()
        .enumerate()
        .map(|(idx, rec)| {
            StoredOrder::decode(rec).unwrap_or_else(|(raw, e)| {
                debug!(path = %path.display(), idx, error = %e, "keeping order record as raw JSON");
                StoredOrder::Raw(raw)
            })
        })
        .collect()
}

async fn write_json<T: Serialize + ?Sized>(path: &Path, data: &T) -> Result<(), StoreError> {
    let bytes = serde_json::to_vec_pretty(data).map_err(|source| StoreError::Encode {
        path: path.to_path_buf(),
        source,
    })?;

    tokio::fs::write(path, bytes)
        .await
        .map_err(|source| StoreError::Io {
            path: path.to_path_buf(),
            source,
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Order, OrderLine, OrderStatus};
    use serde_json::json;
    use tempfile::tempdir;
    use time::OffsetDateTime;

    fn order(id: &str) -> StoredOrder {
        StoredOrder::Order(Order {
            id: id.to_string(),
            table: "1".into(),
            items: vec![OrderLine { name: "Tea".into(), price: 50.0, qty: 1 }],
            note: None,
            total: 50.0,
            status: OrderStatus::Pending,
            created_at: OffsetDateTime::UNIX_EPOCH,
        })
    }

    #[tokio::test]
    async fn missing_and_blank_files_read_as_empty() {
        let dir = tempdir().unwrap();
        let store = JsonStore::new(dir.path().join("menu.json"), dir.path().join("orders.json"));
        assert!(store.orders().await.is_empty());
        assert!(store.menu().await.categories.is_empty());

        std::fs::write(store.orders_path(), "   \n").unwrap();
        std::fs::write(store.menu_path(), "{ not json").unwrap();
        assert!(store.orders().await.is_empty());
        assert!(store.menu().await.categories.is_empty());
    }

    #[tokio::test]
    async fn odd_records_survive_a_rewrite() {
        let dir = tempdir().unwrap();
        let store = JsonStore::new(dir.path().join("menu.json"), dir.path().join("orders.json"));
        let legacy = json!({
            "id": "1",
            "table": "4",
            "items": [{ "name": "Tea", "price": 50, "qty": 1.5 }],
            "note": "",
            "total": 75,
            "status": "Pending",
            "createdAt": "2024-05-29T16:26:40.000Z"
        });
        let good = serde_json::to_value(order("2")).unwrap();
        let body = json!([good, legacy, { "id": "3", "status": "Lost" }]);
        std::fs::write(store.orders_path(), body.to_string()).unwrap();

        let orders = store.orders().await;
        let ids: Vec<Option<&str>> = orders.iter().map(StoredOrder::id).collect();
        assert_eq!(ids, vec![Some("2"), Some("1"), Some("3")]);
        assert!(orders[0].as_order().is_some());
        assert!(orders[1].as_order().is_none());

        store
            .update_orders(|orders| {
                orders.insert(0, order("4"));
                Ok::<_, StoreError>(())
            })
            .await
            .unwrap();

        let written: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(store.orders_path()).unwrap()).unwrap();
        assert_eq!(written.as_array().map(Vec::len), Some(4));
        assert_eq!(written[2], legacy);
        assert_eq!(written[3], json!({ "id": "3", "status": "Lost" }));
    }

    #[tokio::test]
    async fn update_persists_only_on_success() {
        let dir = tempdir().unwrap();
        let store = JsonStore::new(dir.path().join("menu.json"), dir.path().join("orders.json"));

        store
            .update_orders(|orders| {
                orders.insert(0, order("1"));
                Ok::<_, StoreError>(())
            })
            .await
            .unwrap();

        #[derive(Debug)]
        struct Nope;
        impl From<StoreError> for Nope {
            fn from(_: StoreError) -> Self {
                Nope
            }
        }

        let res = store
            .update_orders(|orders| {
                orders.clear();
                Err::<(), _>(Nope)
            })
            .await;
        assert!(res.is_err());
        assert_eq!(store.orders().await.len(), 1);

        let raw = std::fs::read_to_string(store.orders_path()).unwrap();
        assert!(raw.starts_with("[\n  {"), "pretty printed with two spaces: {raw}");
    }

    #[tokio::test]
    async fn write_into_missing_directory_is_an_error() {
        let dir = tempdir().unwrap();
        let store = JsonStore::new(
            dir.path().join("menu.json"),
            dir.path().join("nope").join("orders.json"),
        );
        let res = store
            .update_orders(|orders| {
                orders.push(order("1"));
                Ok::<_, StoreError>(())
            })
            .await;
        assert!(matches!(res, Err(StoreError::Io { .. })));
    }
}
