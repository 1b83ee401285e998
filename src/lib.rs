//! Order taking for a single restaurant.
//!
//! Staff log in with a shared PIN and submit table orders built from the
//! menu; admins log in with their own PIN, poll the order list, move orders
//! between statuses, delete them, and print the day's sales per table.
//!
//! State lives in two JSON files: `menu.json` (read-only) and `orders.json`
//! (rewritten on every change). See [`config::Config`] for the environment
//! variables.

pub mod auth;
pub mod cart;
pub mod config;
pub mod error;
pub mod http_api;
pub mod model;
pub mod orders;
pub mod report;
pub mod store;

pub use config::Config;
pub use http_api::{router, run_http_server, ApiCtx};
