use dotenvy::dotenv;
use tableside_orders::{run_http_server, Config};
use tracing_subscriber::{fmt, EnvFilter};

fn main() -> anyhow::Result<()> {
    // .env first so RUST_LOG and the PINs can come from it
    dotenv().ok();

    fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    // Config reads the local UTC offset, which only works before the
    // runtime starts its worker threads.
    let config = Config::from_env();

    tokio::runtime::Runtime::new()?.block_on(run_http_server(config))
}
