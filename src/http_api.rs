use std::{net::SocketAddr, sync::Arc};

use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    middleware::from_fn,
    response::Html,
    routing::{any, get, patch, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use time::{format_description::well_known::Rfc3339, Date, OffsetDateTime};
use tokio::signal;
use tower_http::{
    cors::{Any, CorsLayer},
    services::ServeDir,
    trace::TraceLayer,
};
use tracing::{info, warn};

use crate::{
    auth::{self, require_admin, require_staff, Role},
    config::Config,
    error::AppError,
    model::{Menu, StoredOrder},
    orders::{OrderBook, OrderDraft},
    report::{self, DailyReport},
    store::JsonStore,
};

fn now_iso_rfc3339() -> String {
    OffsetDateTime::now_utc()
        .format(&Rfc3339)
        .unwrap_or_else(|_| "1970-01-01T00:00:00Z".to_string())
}

/* ================== Context ================== */

pub struct ApiCtx {
    pub config: Config,
    pub orders: OrderBook,
}

impl ApiCtx {
    pub fn new(config: Config) -> Arc<Self> {
        let store = JsonStore::new(config.menu_path.clone(), config.orders_path.clone());
        Arc::new(Self {
            orders: OrderBook::new(store),
            config,
        })
    }

    fn today(&self) -> Date {
        OffsetDateTime::now_utc().to_offset(self.config.utc_offset).date()
    }
}

#[derive(Serialize)]
struct OkMsg {
    ok: bool,
}

/* ================== Request / response bodies ================== */

#[derive(Deserialize)]
struct PinReq {
    #[serde(default)]
    pin: Value,
}

#[derive(Serialize)]
struct LoginResp {
    ok: bool,
    role: &'static str,
    token: &'static str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CreateOrderResp {
    ok: bool,
    order_id: String,
}

#[derive(Deserialize)]
struct StatusReq {
    #[serde(default)]
    status: Value,
}

#[derive(Serialize)]
struct StatusResp {
    ok: bool,
    updated: StoredOrder,
}

#[derive(Deserialize)]
struct ReportQuery {
    date: Option<String>,
}

/* ================== Routes: public / Health ================== */

async fn health() -> Json<Value> {
    Json(serde_json::json!({
        "ok": true,
        "service": "tableside-orders",
        "ts": now_iso_rfc3339()
    }))
}

async fn menu(State(ctx): State<Arc<ApiCtx>>) -> Json<Menu> {
    Json(ctx.orders.store().menu().await)
}

/* ---- logins ---- */

fn login_for(role: Role, pin: &Value, expected: &str) -> Result<Json<LoginResp>, AppError> {
    let token = auth::login(role, pin, expected)?;
    Ok(Json(LoginResp {
        ok: true,
        role: role.as_str(),
        token,
    }))
}

async fn staff_login(
    State(ctx): State<Arc<ApiCtx>>,
    req: Result<Json<PinReq>, JsonRejection>,
) -> Result<Json<LoginResp>, AppError> {
    let Json(req) = req?;
    login_for(Role::Staff, &req.pin, &ctx.config.staff_pin)
}

async fn admin_login(
    State(ctx): State<Arc<ApiCtx>>,
    req: Result<Json<PinReq>, JsonRejection>,
) -> Result<Json<LoginResp>, AppError> {
    let Json(req) = req?;
    login_for(Role::Admin, &req.pin, &ctx.config.admin_pin)
}

/* ================== Staff: orders ================== */

async fn order_create(
    State(ctx): State<Arc<ApiCtx>>,
    req: Result<Json<OrderDraft>, JsonRejection>,
) -> Result<Json<CreateOrderResp>, AppError> {
    let Json(draft) = req?;
    let order = ctx.orders.create(&draft).await?;

    Ok(Json(CreateOrderResp {
        ok: true,
        order_id: order.id,
    }))
}

/* ================== Admin: orders ================== */

async fn orders_list(State(ctx): State<Arc<ApiCtx>>) -> Json<Vec<StoredOrder>> {
    Json(ctx.orders.list().await)
}

async fn order_update_status(
    State(ctx): State<Arc<ApiCtx>>,
    Path(id): Path<String>,
    req: Result<Json<StatusReq>, JsonRejection>,
) -> Result<Json<StatusResp>, AppError> {
    let Json(req) = req?;
    let updated = ctx.orders.update_status(&id, &req.status).await?;

    Ok(Json(StatusResp { ok: true, updated }))
}

async fn order_delete(
    State(ctx): State<Arc<ApiCtx>>,
    Path(id): Path<String>,
) -> Result<Json<OkMsg>, AppError> {
    ctx.orders.delete(&id).await?;
    Ok(Json(OkMsg { ok: true }))
}

// The delete endpoint does not check this itself; the admin screen asks
// for the PIN and calls here before issuing the DELETE.
async fn verify_delete_pin(
    State(ctx): State<Arc<ApiCtx>>,
    req: Result<Json<PinReq>, JsonRejection>,
) -> Result<Json<OkMsg>, AppError> {
    let Json(req) = req?;

    if !auth::pin_matches(&req.pin, &ctx.config.delete_pin) {
        warn!("delete PIN rejected");
        return Err(AppError::unauthorized("Wrong PIN"));
    }

    Ok(Json(OkMsg { ok: true }))
}

/* ================== Admin: daily report ================== */

async fn build_report(ctx: &ApiCtx, q: &ReportQuery) -> Result<DailyReport, AppError> {
    let day = match q.date.as_deref() {
        Some(raw) => report::parse_day(raw).map_err(|_| AppError::bad_request("Invalid date"))?,
        None => ctx.today(),
    };

    let orders: Vec<_> = ctx
        .orders
        .list()
        .await
        .iter()
        .filter_map(StoredOrder::as_order)
        .cloned()
        .collect();
    Ok(report::daily_report(&orders, day, ctx.config.utc_offset))
}

async fn report_daily(
    State(ctx): State<Arc<ApiCtx>>,
    Query(q): Query<ReportQuery>,
) -> Result<Json<DailyReport>, AppError> {
    Ok(Json(build_report(&ctx, &q).await?))
}

async fn report_daily_print(
    State(ctx): State<Arc<ApiCtx>>,
    Query(q): Query<ReportQuery>,
) -> Result<Html<String>, AppError> {
    let report = build_report(&ctx, &q).await?;
    Ok(Html(report::render_html(
        &report,
        &ctx.config.restaurant_name,
        &ctx.config.currency,
    )))
}

async fn api_not_found() -> AppError {
    AppError::RouteNotFound
}

/* ================== Router ================== */

pub fn router(ctx: Arc<ApiCtx>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let public = Router::new()
        .route("/api/health", get(health))
        .route("/api/menu", get(menu))
        .route("/api/staff/login", post(staff_login))
        .route("/api/admin/login", post(admin_login))
        // keeps unknown API paths out of the static file fallback
        .route("/api/*rest", any(api_not_found));

    let staff = Router::new()
        .route("/api/orders", post(order_create))
        .route_layer(from_fn(require_staff));

    let admin = Router::new()
        .route("/api/admin/orders", get(orders_list))
        .route("/api/admin/orders/:id", patch(order_update_status).delete(order_delete))
        .route("/api/admin/verify-delete-pin", post(verify_delete_pin))
        .route("/api/admin/reports/daily", get(report_daily))
        .route("/api/admin/reports/daily/print", get(report_daily_print))
        .route_layer(from_fn(require_admin));

    public
        .merge(staff)
        .merge(admin)
        .fallback_service(ServeDir::new(&ctx.config.public_dir))
        .with_state(ctx)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

/* ================== Runner ================== */

pub async fn run_http_server(config: Config) -> anyhow::Result<()> {
    let port = config.port;
    let ctx = ApiCtx::new(config);

    let menu = ctx.orders.store().menu().await;
    for problem in menu.problems() {
        warn!(target: "menu", "{problem}");
    }
    info!(
        categories = menu.categories.len(),
        menu = %ctx.orders.store().menu_path().display(),
        orders = %ctx.orders.store().orders_path().display(),
        "data files"
    );

    let app = router(ctx);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(target: "http", "[http] listening on http://{addr}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        match signal::ctrl_c().await {
            Ok(()) => info!("Received Ctrl+C, shutting down"),
            Err(e) => {
                warn!("Failed to install Ctrl+C handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use signal::unix::{signal, SignalKind};

        match signal(SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
                info!("Received terminate signal, shutting down");
            }
            Err(e) => {
                warn!("Failed to install terminate handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
