//! Endpoint handlers for the local JSON API
//!
//! Handlers translate engine results into status codes: NotFound -> 404,
//! Validation -> 400, durable-store failures -> 500 (retryable by the
//! client). Raced claims and repeated badge evaluations stay 200 - they
//! are idempotent successes, not errors.

use chrono::NaiveDate;
use serde::Deserialize;
use tracing::error;

use super::{parse_user_from_path, query_param, respond_json};
use crate::progression::models::ActionType;
use crate::progression::{day_key, LeaderboardCategory, ProgressionError, ProgressionManager};

const DEFAULT_BOARD_LIMIT: usize = 10;
const MAX_BOARD_LIMIT: usize = 100;
const DEFAULT_TX_LIMIT: usize = 50;

#[derive(Debug, Deserialize)]
struct GrantRequest {
    action_type: String,
    amount: i64,
    #[serde(default)]
    description: String,
}

#[derive(Debug, Deserialize, Default)]
struct DayRequest {
    /// Calendar day "YYYY-MM-DD"; defaults to today (UTC)
    date: Option<String>,
}

fn error_status(err: &ProgressionError) -> u16 {
    match err {
        ProgressionError::NotFound(_) => 404,
        ProgressionError::Validation(_) => 400,
        _ => 500,
    }
}

fn respond_engine_error(request: tiny_http::Request, err: ProgressionError) {
    let status = error_status(&err);
    if status == 500 {
        error!("[propquest:http] engine error: {err}");
    }
    respond_json(
        request,
        status,
        serde_json::json!({ "error": err.to_string() }),
    );
}

/// Resolve the request day, defaulting to today under the UTC policy
fn resolve_day(raw: Option<&str>) -> Result<NaiveDate, ProgressionError> {
    match raw {
        None => Ok(day_key::today_utc()),
        Some(s) => day_key::parse_day(s)
            .ok_or_else(|| ProgressionError::validation(format!("invalid date: {s}"))),
    }
}

pub(super) fn handle_profile(
    engine: &ProgressionManager,
    path: &str,
    request: tiny_http::Request,
) {
    let user_id = match parse_user_from_path(path, "/profile") {
        Ok(id) => id,
        Err(err) => {
            respond_json(request, 400, serde_json::json!({ "error": err }));
            return;
        }
    };

    match engine.profile(&user_id) {
        Ok(profile) => respond_json(
            request,
            200,
            serde_json::to_value(&profile)
                .unwrap_or_else(|_| serde_json::json!({ "error": "serialize" })),
        ),
        Err(e) => respond_engine_error(request, e),
    }
}

pub(super) fn handle_transactions(
    engine: &ProgressionManager,
    path: &str,
    query: Option<&str>,
    request: tiny_http::Request,
) {
    let user_id = match parse_user_from_path(path, "/transactions") {
        Ok(id) => id,
        Err(err) => {
            respond_json(request, 400, serde_json::json!({ "error": err }));
            return;
        }
    };
    let limit = query_param(query, "limit")
        .and_then(|v| v.parse().ok())
        .unwrap_or(DEFAULT_TX_LIMIT);

    match engine.transactions(&user_id, limit) {
        Ok(transactions) => respond_json(
            request,
            200,
            serde_json::json!({ "transactions": transactions }),
        ),
        Err(e) => respond_engine_error(request, e),
    }
}

pub(super) fn handle_grant(
    engine: &ProgressionManager,
    path: &str,
    body: &str,
    request: tiny_http::Request,
) {
    let user_id = match parse_user_from_path(path, "/xp") {
        Ok(id) => id,
        Err(err) => {
            respond_json(request, 400, serde_json::json!({ "error": err }));
            return;
        }
    };

    let req: GrantRequest = match serde_json::from_str(body) {
        Ok(req) => req,
        Err(e) => {
            respond_json(
                request,
                400,
                serde_json::json!({ "error": "invalid_json", "details": e.to_string() }),
            );
            return;
        }
    };

    let action = match ActionType::parse(&req.action_type) {
        Ok(action) => action,
        Err(e) => {
            respond_engine_error(request, e);
            return;
        }
    };

    match engine.grant_xp(&user_id, action, req.amount, &req.description) {
        Ok((transaction, level_up)) => respond_json(
            request,
            200,
            serde_json::json!({
                "transaction": transaction,
                "level_up": level_up,
            }),
        ),
        Err(e) => respond_engine_error(request, e),
    }
}

pub(super) fn handle_claim(
    engine: &ProgressionManager,
    path: &str,
    body: &str,
    request: tiny_http::Request,
) {
    let user_id = match parse_user_from_path(path, "/claim") {
        Ok(id) => id,
        Err(err) => {
            respond_json(request, 400, serde_json::json!({ "error": err }));
            return;
        }
    };

    let req: DayRequest = if body.trim().is_empty() {
        DayRequest::default()
    } else {
        match serde_json::from_str(body) {
            Ok(req) => req,
            Err(e) => {
                respond_json(
                    request,
                    400,
                    serde_json::json!({ "error": "invalid_json", "details": e.to_string() }),
                );
                return;
            }
        }
    };

    let today = match resolve_day(req.date.as_deref()) {
        Ok(day) => day,
        Err(e) => {
            respond_engine_error(request, e);
            return;
        }
    };

    // A claim is a user-visible action: first contact creates the row.
    if let Err(e) = engine.ensure_user(&user_id) {
        respond_engine_error(request, e);
        return;
    }

    match engine.claim_daily(&user_id, today) {
        Ok(outcome) => respond_json(
            request,
            200,
            serde_json::to_value(&outcome)
                .unwrap_or_else(|_| serde_json::json!({ "error": "serialize" })),
        ),
        Err(e) => respond_engine_error(request, e),
    }
}

pub(super) fn handle_activity(
    engine: &ProgressionManager,
    path: &str,
    body: &str,
    request: tiny_http::Request,
) {
    let user_id = match parse_user_from_path(path, "/activity") {
        Ok(id) => id,
        Err(err) => {
            respond_json(request, 400, serde_json::json!({ "error": err }));
            return;
        }
    };

    let req: DayRequest = if body.trim().is_empty() {
        DayRequest::default()
    } else {
        match serde_json::from_str(body) {
            Ok(req) => req,
            Err(e) => {
                respond_json(
                    request,
                    400,
                    serde_json::json!({ "error": "invalid_json", "details": e.to_string() }),
                );
                return;
            }
        }
    };

    let day = match resolve_day(req.date.as_deref()) {
        Ok(day) => day,
        Err(e) => {
            respond_engine_error(request, e);
            return;
        }
    };

    if let Err(e) = engine.ensure_user(&user_id) {
        respond_engine_error(request, e);
        return;
    }

    match engine.record_activity(&user_id, day) {
        Ok(update) => respond_json(
            request,
            200,
            serde_json::to_value(&update)
                .unwrap_or_else(|_| serde_json::json!({ "error": "serialize" })),
        ),
        Err(e) => respond_engine_error(request, e),
    }
}

pub(super) fn handle_evaluate_badges(
    engine: &ProgressionManager,
    path: &str,
    request: tiny_http::Request,
) {
    let user_id = match parse_user_from_path(path, "/badges/evaluate") {
        Ok(id) => id,
        Err(err) => {
            respond_json(request, 400, serde_json::json!({ "error": err }));
            return;
        }
    };

    match engine.evaluate_badges(&user_id) {
        Ok(newly) => {
            let unlocked: Vec<_> = newly
                .iter()
                .map(|b| {
                    serde_json::json!({
                        "key": b.key,
                        "name": b.name,
                        "description": b.description,
                        "icon": b.icon,
                        "category": b.category,
                        "xp_reward": b.xp_reward,
                    })
                })
                .collect();
            respond_json(request, 200, serde_json::json!({ "unlocked": unlocked }));
        }
        Err(e) => respond_engine_error(request, e),
    }
}

pub(super) fn handle_leaderboard(
    engine: &ProgressionManager,
    path: &str,
    query: Option<&str>,
    request: tiny_http::Request,
) {
    let category_name = path.trim_start_matches("/leaderboard/").trim_end_matches('/');
    let category = match LeaderboardCategory::parse(category_name) {
        Ok(category) => category,
        Err(e) => {
            respond_engine_error(request, e);
            return;
        }
    };

    let limit = query_param(query, "limit")
        .and_then(|v| v.parse().ok())
        .unwrap_or(DEFAULT_BOARD_LIMIT)
        .min(MAX_BOARD_LIMIT);

    let entries = match engine.leaderboard(category, limit) {
        Ok(entries) => entries,
        Err(e) => {
            respond_engine_error(request, e);
            return;
        }
    };

    // Optional viewer rank, independent of the top-N cutoff
    let viewer_rank = match query_param(query, "user") {
        Some(user_id) => match engine.rank_for(category, user_id) {
            Ok(rank) => rank,
            Err(ProgressionError::NotFound(_)) => None,
            Err(e) => {
                respond_engine_error(request, e);
                return;
            }
        },
        None => None,
    };

    respond_json(
        request,
        200,
        serde_json::json!({
            "category": category.as_str(),
            "entries": entries,
            "viewer_rank": viewer_rank,
        }),
    );
}
