//! Static PIN login and the sentinel bearer tokens it hands out.
//!
//! Tokens never expire and are the same for every session; logging out is a
//! client-side affair.

use axum::{
    body::Body,
    http::{header::AUTHORIZATION, HeaderMap, Method, Request},
    middleware::Next,
    response::Response,
};
use serde_json::Value;
use tracing::{info, warn};

use crate::error::AppError;

pub const STAFF_TOKEN: &str = "staff-ok";
pub const ADMIN_TOKEN: &str = "admin-ok";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Staff,
    Admin,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::Staff => "staff",
            Role::Admin => "admin",
        }
    }

    pub fn token(self) -> &'static str {
        match self {
            Role::Staff => STAFF_TOKEN,
            Role::Admin => ADMIN_TOKEN,
        }
    }

    fn wrong_pin(self) -> &'static str {
        match self {
            Role::Staff => "Wrong staff PIN",
            Role::Admin => "Wrong admin PIN",
        }
    }

    fn unauthorized(self) -> &'static str {
        match self {
            Role::Staff => "Staff unauthorized",
            Role::Admin => "Admin unauthorized",
        }
    }
}

/// PINs arrive as JSON strings or numbers; anything else counts as empty.
pub fn pin_text(pin: &Value) -> String {
    match pin {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        _ => String::new(),
    }
}

pub fn pin_matches(given: &Value, expected: &str) -> bool {
    let given = pin_text(given);
    !given.is_empty() && given == expected.trim()
}

/// Checks a login PIN and returns the role's token.
pub fn login(role: Role, given: &Value, expected: &str) -> Result<&'static str, AppError> {
    if pin_matches(given, expected) {
        info!(role = role.as_str(), "login ok");
        Ok(role.token())
    } else {
        warn!(role = role.as_str(), "login rejected (wrong PIN)");
        Err(AppError::unauthorized(role.wrong_pin()))
    }
}

pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
}

/* ================== Auth Middleware ================== */

async fn require_role(role: Role, req: Request<Body>, next: Next) -> Result<Response, AppError> {
    info!("HTTP {} {}", req.method(), req.uri().path());

    if req.method() == Method::OPTIONS {
        return Ok(next.run(req).await);
    }

    if bearer_token(req.headers()) != Some(role.token()) {
        warn!(role = role.as_str(), path = %req.uri().path(), "unauthorized (bearer token)");
        return Err(AppError::unauthorized(role.unauthorized()));
    }

    Ok(next.run(req).await)
}

pub async fn require_staff(req: Request<Body>, next: Next) -> Result<Response, AppError> {
    require_role(Role::Staff, req, next).await
}

pub async fn require_admin(req: Request<Body>, next: Next) -> Result<Response, AppError> {
    require_role(Role::Admin, req, next).await
}
