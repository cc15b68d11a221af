use rusqlite::Connection;
use tracing::error;

use crate::error::{EngineError, EngineResult};
use crate::ipc::error::{engine_err, err, ok};
use crate::ipc::types::{AppState, Request};

/// Runs `f` on a fresh connection to the selected workspace and wraps the outcome in the
/// response envelope.
pub fn with_conn(
    state: &AppState,
    req: &Request,
    f: impl FnOnce(&Connection) -> EngineResult<serde_json::Value>,
) -> serde_json::Value {
    let conn = match state.connect() {
        Ok(Some(conn)) => conn,
        Ok(None) => return err(&req.id, "no_workspace", "select a workspace first", None),
        Err(e) => {
            error!(target: "ecotaskd", method = %req.method, error = %e, "connection failed");
            return err(&req.id, "db_open_failed", format!("{e:#}"), None);
        }
    };
    match f(&conn) {
        Ok(result) => ok(&req.id, result),
        Err(e) => {
            if matches!(e, EngineError::Db(_)) {
                error!(target: "ecotaskd", method = %req.method, error = %e, "request failed");
            }
            engine_err(&req.id, &e)
        }
    }
}

pub fn str_param(req: &Request, key: &str) -> EngineResult<String> {
    match req.params.get(key) {
        Some(v) => v
            .as_str()
            .map(|s| s.to_string())
            .ok_or_else(|| EngineError::Validation(format!("params.{key} must be a string"))),
        None => Err(EngineError::Validation(format!("missing params.{key}"))),
    }
}

pub fn opt_str_param(req: &Request, key: &str) -> EngineResult<Option<String>> {
    match req.params.get(key) {
        None | Some(serde_json::Value::Null) => Ok(None),
        Some(_) => str_param(req, key).map(Some),
    }
}

pub fn opt_u64_param(req: &Request, key: &str) -> EngineResult<Option<u64>> {
    match req.params.get(key) {
        None | Some(serde_json::Value::Null) => Ok(None),
        Some(v) => v.as_u64().map(Some).ok_or_else(|| {
            EngineError::Validation(format!("params.{key} must be a non-negative integer"))
        }),
    }
}

pub fn bool_param(req: &Request, key: &str, default: bool) -> EngineResult<bool> {
    match req.params.get(key) {
        None | Some(serde_json::Value::Null) => Ok(default),
        Some(v) => v
            .as_bool()
            .ok_or_else(|| EngineError::Validation(format!("params.{key} must be a boolean"))),
    }
}
