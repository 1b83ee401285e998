use std::{env, fmt::Display, path::PathBuf, str::FromStr};

use time::{macros::format_description, UtcOffset};
use tracing::{info, warn};

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub staff_pin: String,
    pub admin_pin: String,
    /// Second PIN asked for before an order is deleted.
    pub delete_pin: String,
    pub menu_path: PathBuf,
    pub orders_path: PathBuf,
    pub public_dir: PathBuf,
    pub restaurant_name: String,
    pub currency: String,
    /// Offset used to decide which calendar day an order belongs to.
    pub utc_offset: UtcOffset,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: 3000,
            staff_pin: "0000".into(),
            admin_pin: "6969".into(),
            delete_pin: "6969".into(),
            menu_path: "menu.json".into(),
            orders_path: "orders.json".into(),
            public_dir: "public".into(),
            restaurant_name: "Restaurant".into(),
            currency: "NPR".into(),
            utc_offset: UtcOffset::UTC,
        }
    }
}

impl Config {
    /// Reads the environment. Must run before any worker threads exist:
    /// the local UTC offset cannot be queried safely afterwards.
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let admin_pin = string_or("ADMIN_PIN", &defaults.admin_pin);
        let delete_pin = string_or("DELETE_PIN", &admin_pin);

        Self {
            port: try_load("PORT", defaults.port),
            staff_pin: string_or("STAFF_PIN", &defaults.staff_pin),
            admin_pin,
            delete_pin,
            menu_path: path_or("MENU_PATH", defaults.menu_path),
            orders_path: path_or("ORDERS_PATH", defaults.orders_path),
            public_dir: path_or("PUBLIC_DIR", defaults.public_dir),
            restaurant_name: string_or("RESTAURANT_NAME", &defaults.restaurant_name),
            currency: string_or("CURRENCY", &defaults.currency),
            utc_offset: load_offset(),
        }
    }
}

fn var(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn string_or(key: &str, default: &str) -> String {
    var(key).unwrap_or_else(|| {
        info!("{key} not set, using default");
        default.to_string()
    })
}

fn path_or(key: &str, default: PathBuf) -> PathBuf {
    var(key).map(PathBuf::from).unwrap_or_else(|| {
        info!("{key} not set, using default: {}", default.display());
        default
    })
}

fn try_load<T>(key: &str, default: T) -> T
where
    T: FromStr + Display,
    T::Err: Display,
{
    match var(key) {
        None => {
            info!("{key} not set, using default: {default}");
            default
        }
        Some(raw) => raw.trim().parse().unwrap_or_else(|e| {
            warn!("Invalid {key} value '{raw}': {e}, using default: {default}");
            default
        }),
    }
}

pub fn parse_offset(raw: &str) -> Result<UtcOffset, time::error::Parse> {
    UtcOffset::parse(
        raw.trim(),
        format_description!("[offset_hour sign:mandatory]:[offset_minute]"),
    )
}

fn load_offset() -> UtcOffset {
    if let Some(raw) = var("REPORT_UTC_OFFSET") {
        match parse_offset(&raw) {
            Ok(offset) => return offset,
            Err(e) => warn!("Invalid REPORT_UTC_OFFSET value '{raw}': {e}"),
        }
    }

    UtcOffset::current_local_offset().unwrap_or_else(|e| {
        warn!("Local UTC offset unavailable ({e}), reports use UTC days");
        UtcOffset::UTC
    })
}
