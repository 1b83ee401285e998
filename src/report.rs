//! Daily sales summary: one calendar day of orders grouped by table.

use std::fmt::Write as _;

use serde::Serialize;
use time::{macros::format_description, Date, UtcOffset};

use crate::model::Order;

const UNKNOWN_TABLE: &str = "Unknown";

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyReport {
    pub date: String,
    pub total_orders: usize,
    pub grand_total: f64,
    pub tables: Vec<TableSales>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TableSales {
    pub table: String,
    pub orders: usize,
    pub total: f64,
    pub items: Vec<ItemTally>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ItemTally {
    pub name: String,
    pub qty: u64,
}

pub fn parse_day(raw: &str) -> Result<Date, time::error::Parse> {
    Date::parse(raw.trim(), format_description!("[year]-[month]-[day]"))
}

fn format_day(day: Date) -> String {
    format!("{:04}-{:02}-{:02}", day.year(), u8::from(day.month()), day.day())
}

// Numeric table names sort numerically and ahead of the rest.
fn table_key(name: &str) -> (bool, u64, &str) {
    match name.parse::<u64>() {
        Ok(n) => (false, n, name),
        Err(_) => (true, 0, name),
    }
}

/// Aggregates the orders created on `day`, as seen from `offset`.
/// Every status counts, cancelled orders included.
pub fn daily_report(orders: &[Order], day: Date, offset: UtcOffset) -> DailyReport {
    let mut tables: Vec<TableSales> = vec![];
    let mut total_orders = 0;
    let mut grand_total = 0.0;

    for order in orders
        .iter()
        .filter(|o| o.created_at.to_offset(offset).date() == day)
    {
        let name = match order.table.trim() {
            "" => UNKNOWN_TABLE,
            t => t,
        };

        let idx = match tables.iter().position(|t| t.table == name) {
            Some(idx) => idx,
            None => {
                tables.push(TableSales {
                    table: name.to_string(),
                    orders: 0,
                    total: 0.0,
                    items: vec![],
                });
                tables.len() - 1
            }
        };
        let entry = &mut tables[idx];

        entry.orders += 1;
        entry.total += order.total;
        for line in &order.items {
            match entry.items.iter_mut().find(|i| i.name == line.name) {
                Some(tally) => tally.qty += u64::from(line.qty),
                None => entry.items.push(ItemTally {
                    name: line.name.clone(),
                    qty: u64::from(line.qty),
                }),
            }
        }

        total_orders += 1;
        grand_total += order.total;
    }

    tables.sort_by(|a, b| table_key(&a.table).cmp(&table_key(&b.table)));

    DailyReport {
        date: format_day(day),
        total_orders,
        grand_total,
        tables,
    }
}

pub fn money(currency: &str, amount: f64) -> String {
    if amount.fract() == 0.0 {
        format!("{currency} {amount:.0}")
    } else {
        format!("{currency} {amount:.2}")
    }
}

fn escape_html(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// A self-contained A4 page that opens the browser's print dialog on load.
pub fn render_html(report: &DailyReport, restaurant: &str, currency: &str) -> String {
    let restaurant = escape_html(restaurant);
    let grand = escape_html(&money(currency, report.grand_total));

    let mut rows = String::new();
    for t in &report.tables {
        let items = t
            .items
            .iter()
            .map(|i| format!("{} &times; {}", escape_html(&i.name), i.qty))
            .collect::<Vec<_>>()
            .join(", ");
        // writing into a String cannot fail
        let _ = write!(
            rows,
            "<tr><td>{}</td><td>{}</td><td>{}</td><td>{}</td></tr>",
            escape_html(&t.table),
            t.orders,
            items,
            escape_html(&money(currency, t.total)),
        );
    }
    if rows.is_empty() {
        rows.push_str(r#"<tr><td colspan="4">No orders today</td></tr>"#);
    }

    format!(
        r#"<!DOCTYPE html>
<html>
<head>
<meta charset="utf-8">
<title>Daily Sales Report</title>
<style>
body {{ font-family: Arial, sans-serif; }}
h1, h2 {{ text-align: center; margin: 0; }}
table {{ width: 100%; border-collapse: collapse; margin-top: 16px; }}
th, td {{ border: 1px solid #000; padding: 8px; text-align: left; }}
@page {{ size: A4; margin: 18mm; }}
</style>
</head>
<body>
<h1>{restaurant}</h1>
<h2>Daily Sales Report</h2>
<p><b>Date:</b> {date} | <b>Total Orders:</b> {count} | <b>Grand Total:</b> {grand}</p>
<table>
<thead><tr><th>Table</th><th>Orders</th><th>Items</th><th>Total Sales</th></tr></thead>
<tbody>{rows}</tbody>
<tfoot><tr><th colspan="3">Grand Total</th><th>{grand}</th></tr></tfoot>
</table>
<script>window.print();</script>
</body>
</html>
"#,
        date = escape_html(&report.date),
        count = report.total_orders,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{OrderLine, OrderStatus};
    use time::macros::{date, datetime, offset};

    fn order(table: &str, at: time::OffsetDateTime, lines: &[(&str, f64, u32)]) -> Order {
        let items: Vec<OrderLine> = lines
            .iter()
            .map(|(n, p, q)| OrderLine { name: n.to_string(), price: *p, qty: *q })
            .collect();
        Order {
            id: at.unix_timestamp().to_string(),
            table: table.into(),
            total: crate::model::lines_total(&items),
            items,
            note: None,
            status: OrderStatus::Paid,
            created_at: at,
        }
    }

    #[test]
    fn groups_one_day_by_table() {
        let orders = vec![
            order("2", datetime!(2026-10-19 12:00 UTC), &[("Tea", 50.0, 2)]),
            order("10", datetime!(2026-10-19 11:00 UTC), &[("Momo", 150.0, 1)]),
            order("2", datetime!(2026-10-19 10:00 UTC), &[("Tea", 50.0, 1), ("Momo", 150.0, 1)]),
            order("2", datetime!(2026-10-18 10:00 UTC), &[("Tea", 50.0, 9)]),
            order("", datetime!(2026-10-19 09:00 UTC), &[("Coke", 80.0, 1)]),
        ];

        let r = daily_report(&orders, date!(2026 - 10 - 19), UtcOffset::UTC);

        assert_eq!(r.date, "2026-10-19");
        assert_eq!(r.total_orders, 4);
        assert_eq!(r.grand_total, 530.0);

        let names: Vec<&str> = r.tables.iter().map(|t| t.table.as_str()).collect();
        assert_eq!(names, vec!["2", "10", "Unknown"]);

        let t2 = &r.tables[0];
        assert_eq!(t2.orders, 2);
        assert_eq!(t2.total, 300.0);
        assert_eq!(
            t2.items,
            vec![
                ItemTally { name: "Tea".into(), qty: 3 },
                ItemTally { name: "Momo".into(), qty: 1 },
            ]
        );
    }

    #[test]
    fn day_boundary_follows_the_offset() {
        // 20:00 UTC on the 18th is already the 19th in Kathmandu (+05:45)
        let orders = vec![order("1", datetime!(2026-10-18 20:00 UTC), &[("Tea", 50.0, 1)])];

        let utc = daily_report(&orders, date!(2026 - 10 - 19), UtcOffset::UTC);
        assert_eq!(utc.total_orders, 0);

        let npt = daily_report(&orders, date!(2026 - 10 - 19), offset!(+5:45));
        assert_eq!(npt.total_orders, 1);
    }

    #[test]
    fn html_escapes_names_and_handles_empty_days() {
        let orders = vec![order("<b>5</b>", datetime!(2026-10-19 12:00 UTC), &[("Fish & Chips", 12.5, 1)])];
        let r = daily_report(&orders, date!(2026 - 10 - 19), UtcOffset::UTC);
        let html = render_html(&r, "Kahundanda \"Resort\"", "NPR");

        assert!(html.contains("&lt;b&gt;5&lt;/b&gt;"));
        assert!(html.contains("Fish &amp; Chips &times; 1"));
        assert!(html.contains("Kahundanda &quot;Resort&quot;"));
        assert!(html.contains("NPR 12.50"));

        let empty = daily_report(&[], date!(2026 - 10 - 19), UtcOffset::UTC);
        assert!(render_html(&empty, "R", "NPR").contains("No orders today"));
    }

    #[test]
    fn day_parsing() {
        assert_eq!(parse_day("2026-10-19").unwrap(), date!(2026 - 10 - 19));
        assert!(parse_day("19/10/2026").is_err());
        assert!(parse_day("2026-02-30").is_err());
    }

    #[test]
    fn money_drops_zero_cents() {
        assert_eq!(money("NPR", 100.0), "NPR 100");
        assert_eq!(money("NPR", 12.5), "NPR 12.50");
    }
}
