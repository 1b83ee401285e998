//! The staff screen's cart: quantities per menu item, keyed by item name.

use serde_json::Value;

use crate::{
    model::{lines_total, MenuItem, OrderLine},
    orders::OrderDraft,
};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Cart {
    lines: Vec<OrderLine>,
}

impl Cart {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn increment(&mut self, item: &MenuItem) {
        match self.lines.iter_mut().find(|l| l.name == item.name) {
            Some(line) => line.qty += 1,
            None => self.lines.push(OrderLine {
                name: item.name.clone(),
                price: item.price,
                qty: 1,
            }),
        }
    }

    /// Drops the line once its quantity reaches zero.
    pub fn decrement(&mut self, name: &str) {
        if let Some(idx) = self.lines.iter().position(|l| l.name == name) {
            if self.lines[idx].qty <= 1 {
                self.lines.remove(idx);
            } else {
                self.lines[idx].qty -= 1;
            }
        }
    }

    pub fn qty(&self, name: &str) -> u32 {
        self.lines
            .iter()
            .find(|l| l.name == name)
            .map_or(0, |l| l.qty)
    }

    pub fn lines(&self) -> &[OrderLine] {
        &self.lines
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn clear(&mut self) {
        self.lines.clear();
    }

    pub fn total(&self) -> f64 {
        lines_total(&self.lines)
    }

    pub fn into_draft(self, table: &str, note: Option<&str>) -> OrderDraft {
        let items = self
            .lines
            .into_iter()
            .map(|l| serde_json::json!({ "name": l.name, "price": l.price, "qty": l.qty }))
            .collect();

        OrderDraft {
            table: Value::String(table.trim().to_string()),
            items: Value::Array(items),
            note: note.map_or(Value::Null, |n| Value::String(n.to_string())),
        }
    }
}
