mod badges;
mod config;
mod db;
mod error;
mod grading;
mod ipc;
mod ledger;
mod leaderboard;
mod models;
mod registry;
mod seed;
mod tasks;
mod telemetry;

use std::io::{self, BufRead, Write};
use std::sync::{Arc, Mutex};
use std::thread;

use tracing::{error, info, warn};

fn write_line(stdout: &Mutex<io::Stdout>, resp: &serde_json::Value) {
    let line = serde_json::to_string(resp).unwrap_or_else(|_| "{\"ok\":false}".to_string());
    let mut out = stdout.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
    let _ = writeln!(out, "{}", line);
    let _ = out.flush();
}

fn main() {
    telemetry::init_tracing();
    let config = config::DaemonConfig::from_env();
    let state = Arc::new(ipc::AppState::new(config));

    if let Some(path) = state.config.workspace.clone() {
        match state.select_workspace(&path) {
            Ok(seeded) => info!(
                target: "ecotaskd",
                workspace = %path.to_string_lossy(),
                badges = seeded.badges,
                tasks = seeded.tasks,
                "startup workspace selected"
            ),
            Err(e) => error!(target: "ecotaskd", error = %e, "startup workspace failed"),
        }
    }
    info!(target: "ecotaskd", version = env!("CARGO_PKG_VERSION"), "ready");

    let stdout = Arc::new(Mutex::new(io::stdout()));
    let mut workers: Vec<thread::JoinHandle<()>> = Vec::new();

    for line in io::stdin().lock().lines() {
        let line = match line {
            Ok(v) => v,
            Err(e) => {
                warn!(target: "ecotaskd", error = %e, "stdin closed");
                break;
            }
        };
        if line.trim().is_empty() {
            continue;
        }

        let req: ipc::Request = match serde_json::from_str(&line) {
            Ok(v) => v,
            Err(e) => {
                warn!(target: "ecotaskd", error = %e, "unparseable request line");
                let resp = serde_json::json!({
                    "id": null,
                    "ok": false,
                    "error": { "code": "bad_json", "message": e.to_string() }
                });
                write_line(&stdout, &resp);
                continue;
            }
        };

        let state = Arc::clone(&state);
        let stdout = Arc::clone(&stdout);
        workers.retain(|w| !w.is_finished());
        workers.push(thread::spawn(move || {
            let resp = ipc::handle_request(&state, req);
            write_line(&stdout, &resp);
        }));
    }

    for w in workers {
        let _ = w.join();
    }
}
