//! Local JSON API for presentation-layer clients
//!
//! Listens on localhost and exposes the progression operations as plain
//! JSON request/response endpoints:
//! - GET  /ping
//! - GET  /users/<id>/profile
//! - GET  /users/<id>/transactions?limit=N
//! - POST /users/<id>/xp               {action_type, amount, description}
//! - POST /users/<id>/claim            {date?}
//! - POST /users/<id>/activity         {date?}
//! - POST /users/<id>/badges/evaluate
//! - GET  /leaderboard/<category>?limit=N&user=<id>
//!
//! Conflicts are never surfaced as failures: a raced daily claim comes
//! back 200 with `already_claimed=true`.

mod handlers;

use std::io::Read;

use tiny_http::{Response, Server};
use tracing::{error, info};

use crate::progression::ProgressionManager;

const AUTH_HEADER: &str = "X-PROPQUEST-Token";
const MAX_BODY_BYTES: usize = 64 * 1024;

/// Run the API server on the current thread until the process exits
pub fn run(engine: ProgressionManager, port: u16, auth_token: Option<String>) -> anyhow::Result<()> {
    let bind_addr = format!("127.0.0.1:{}", port);
    let server = Server::http(&bind_addr)
        .map_err(|e| anyhow::anyhow!("Failed to start server on {}: {}", bind_addr, e))?;

    let auth_enabled = auth_token.as_deref().is_some_and(|t| !t.trim().is_empty());
    info!(
        "[propquest:http] Server listening on http://{} (auth: {})",
        bind_addr,
        if auth_enabled { "enabled" } else { "disabled" }
    );

    for mut request in server.incoming_requests() {
        let method = request.method().to_string();
        let url = request.url().to_string();
        let path = url.split('?').next().unwrap_or(url.as_str());
        let query = url.split_once('?').map(|(_, q)| q.to_string());

        if !is_authorized(&request, auth_token.as_deref()) {
            let response = Response::from_string("{\"error\":\"unauthorized\"}")
                .with_status_code(401)
                .with_header(json_content_type());
            let _ = request.respond(response);
            continue;
        }

        match (method.as_str(), path) {
            ("GET", "/ping") => {
                respond_json(
                    request,
                    200,
                    serde_json::json!({
                        "status": "ok",
                        "version": env!("CARGO_PKG_VERSION"),
                    }),
                );
            }

            ("GET", p) if p.starts_with("/users/") && p.ends_with("/profile") => {
                handlers::handle_profile(&engine, p, request);
            }
            ("GET", p) if p.starts_with("/users/") && p.ends_with("/transactions") => {
                handlers::handle_transactions(&engine, p, query.as_deref(), request);
            }
            ("POST", p) if p.starts_with("/users/") && p.ends_with("/xp") => {
                let body = match read_request_body(&mut request) {
                    Ok(body) => body,
                    Err(response) => {
                        let _ = request.respond(response);
                        continue;
                    }
                };
                handlers::handle_grant(&engine, p, &body, request);
            }
            ("POST", p) if p.starts_with("/users/") && p.ends_with("/claim") => {
                let body = match read_request_body(&mut request) {
                    Ok(body) => body,
                    Err(response) => {
                        let _ = request.respond(response);
                        continue;
                    }
                };
                handlers::handle_claim(&engine, p, &body, request);
            }
            ("POST", p) if p.starts_with("/users/") && p.ends_with("/activity") => {
                let body = match read_request_body(&mut request) {
                    Ok(body) => body,
                    Err(response) => {
                        let _ = request.respond(response);
                        continue;
                    }
                };
                handlers::handle_activity(&engine, p, &body, request);
            }
            ("POST", p) if p.starts_with("/users/") && p.ends_with("/badges/evaluate") => {
                handlers::handle_evaluate_badges(&engine, p, request);
            }

            ("GET", p) if p.starts_with("/leaderboard/") => {
                handlers::handle_leaderboard(&engine, p, query.as_deref(), request);
            }

            _ => {
                let response = Response::from_string("{\"error\":\"not_found\"}")
                    .with_status_code(404)
                    .with_header(json_content_type());
                let _ = request.respond(response);
            }
        }
    }

    Ok(())
}

fn is_authorized(request: &tiny_http::Request, expected: Option<&str>) -> bool {
    let Some(expected) = expected.filter(|t| !t.trim().is_empty()) else {
        return true;
    };

    request
        .headers()
        .iter()
        .find(|h| h.field.equiv(AUTH_HEADER))
        .map(|h| h.value.as_str() == expected)
        .unwrap_or(false)
}

fn json_content_type() -> tiny_http::Header {
    tiny_http::Header::from_bytes(&b"Content-Type"[..], &b"application/json"[..]).unwrap()
}

fn read_request_body(
    request: &mut tiny_http::Request,
) -> Result<String, Response<std::io::Cursor<Vec<u8>>>> {
    let mut body = String::new();
    let mut reader = request.as_reader().take((MAX_BODY_BYTES + 1) as u64);
    if let Err(e) = reader.read_to_string(&mut body) {
        error!("[propquest:http] Failed to read body: {}", e);
        let response = Response::from_string("{\"error\":\"bad_request\"}")
            .with_status_code(400)
            .with_header(json_content_type());
        return Err(response);
    }

    if body.len() > MAX_BODY_BYTES {
        let response = Response::from_string("{\"error\":\"payload_too_large\"}")
            .with_status_code(413)
            .with_header(json_content_type());
        return Err(response);
    }

    Ok(body)
}

fn respond_json(request: tiny_http::Request, status_code: u16, value: serde_json::Value) {
    let body =
        serde_json::to_string(&value).unwrap_or_else(|_| "{\"error\":\"serialize\"}".to_string());
    let response = Response::from_string(body)
        .with_status_code(status_code)
        .with_header(json_content_type());
    let _ = request.respond(response);
}

/// Extract a query-string parameter ("limit=10&user=ann")
fn query_param<'a>(query: Option<&'a str>, key: &str) -> Option<&'a str> {
    query?
        .split('&')
        .filter_map(|pair| pair.split_once('='))
        .find(|(k, _)| *k == key)
        .map(|(_, v)| v)
}

/// Extract the user id from "/users/<id>/<suffix>"
fn parse_user_from_path(path: &str, suffix: &str) -> Result<String, &'static str> {
    let rest = path.strip_prefix("/users/").ok_or("bad_path")?;
    let user_id = rest.strip_suffix(suffix).ok_or("bad_path")?;
    let user_id = user_id.trim_end_matches('/');
    if user_id.is_empty() || user_id.contains('/') {
        return Err("bad_user_id");
    }
    Ok(user_id.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_user_from_path() {
        assert_eq!(
            parse_user_from_path("/users/ann/profile", "/profile").unwrap(),
            "ann"
        );
        assert_eq!(
            parse_user_from_path("/users/u-42/badges/evaluate", "/badges/evaluate").unwrap(),
            "u-42"
        );
        assert!(parse_user_from_path("/users//profile", "/profile").is_err());
        assert!(parse_user_from_path("/users/a/b/profile", "/profile").is_err());
        assert!(parse_user_from_path("/leaderboard/top_xp", "/profile").is_err());
    }

    #[test]
    fn test_query_param() {
        assert_eq!(query_param(Some("limit=10&user=ann"), "user"), Some("ann"));
        assert_eq!(query_param(Some("limit=10"), "user"), None);
        assert_eq!(query_param(None, "limit"), None);
    }
}
