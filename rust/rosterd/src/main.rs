mod budget;
mod config;
mod db;
mod error;
mod evaluations;
mod ipc;
mod logging;
mod model;
mod relations;
mod store;
mod sync;

use std::io::{self, BufRead, Write};
use tracing::{error, warn};

fn main() {
    let config = match config::Config::from_env() {
        Ok(c) => c,
        Err(e) => {
            logging::init(config::DEFAULT_LOG_FILTER);
            error!("invalid configuration: {e:#}");
            std::process::exit(2);
        }
    };
    logging::init(&config.log_filter);

    let startup_workspace = config.workspace.clone();
    let mut state = ipc::AppState::new(config);
    if let Some(path) = startup_workspace {
        // The UI can still pick a workspace later; a bad default is not fatal.
        if let Err(e) = ipc::open_workspace(&mut state, &path) {
            warn!(workspace = %path.to_string_lossy(), "startup workspace not opened: {e:#}");
        }
    }

    let stdin = io::stdin();
    let mut input = stdin.lock();
    let mut stdout = io::stdout();
    let mut buf = Vec::new();

    loop {
        buf.clear();
        match input.read_until(b'\n', &mut buf) {
            Ok(0) => break,
            Ok(_) => {}
            Err(e) => {
                error!("stdin read failed: {e}");
                break;
            }
        }

        // Can't reply without id.
        let line = match String::from_utf8(std::mem::take(&mut buf)) {
            Ok(v) => v,
            Err(e) => {
                bad_json(&mut stdout, &format!("request is not valid UTF-8: {e}"));
                continue;
            }
        };
        if line.trim().is_empty() {
            continue;
        }

        let req: ipc::Request = match serde_json::from_str(&line) {
            Ok(v) => v,
            Err(e) => {
                bad_json(&mut stdout, &e.to_string());
                continue;
            }
        };

        let resp = ipc::handle_request(&mut state, req);
        let _ = writeln!(
            stdout,
            "{}",
            serde_json::to_string(&resp).unwrap_or_else(|_| "{\"ok\":false}".to_string())
        );
        let _ = stdout.flush();
    }
}

fn bad_json(stdout: &mut io::Stdout, message: &str) {
    let resp = serde_json::json!({
        "ok": false,
        "error": { "code": "bad_json", "message": message }
    });
    let _ = writeln!(stdout, "{}", resp);
    let _ = stdout.flush();
}
