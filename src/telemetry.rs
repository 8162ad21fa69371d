//! Tracing setup.
//!
//! `LOG_LEVEL` takes an EnvFilter directive string, e.g.
//! "info,challenge=debug,gate=debug,tower_http=info". Without it the default
//! below applies. `LOG_FORMAT=json` switches to structured JSON lines; anything
//! else prints human-readable output.
//!
//! Log targets: "challenge" (selection, completion), "gate" (validation,
//! runs), "prabodha" (sessions, storage, transport).

use tracing_subscriber::EnvFilter;

const DEFAULT_FILTER: &str = "info,challenge=debug,gate=info,prabodha=debug,tower_http=info,axum=info";

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_env("LOG_LEVEL").unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
}

fn wants_json() -> bool {
    std::env::var("LOG_FORMAT").map(|v| v.eq_ignore_ascii_case("json")).unwrap_or(false)
}

pub fn init_tracing() {
    let builder = tracing_subscriber::fmt()
        .with_env_filter(env_filter())
        .with_target(true)
        .with_file(true)
        .with_line_number(true);

    // The json and plain builders are distinct types.
    if wants_json() {
        builder.json().init();
    } else {
        builder.init();
    }
}
