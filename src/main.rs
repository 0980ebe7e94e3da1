//! Process entry point: a stdin/stdout newline-delimited JSON loop.
//! Stdout is reserved for the wire protocol; all logging goes to stderr.

use std::io::{self, BufReader};

fn main() {
    // Respects RUST_LOG (default: info). Stderr only, so stdout stays
    // reserved for protocol responses.
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .target(env_logger::Target::Stderr)
        .format_timestamp_millis()
        .init();

    log::info!("logscope-engine starting");

    let stdin = io::stdin();
    let stdout = io::stdout();

    if let Err(e) = logscope_engine_lib::protocol::run(BufReader::new(stdin.lock()), stdout.lock()) {
        log::error!("dispatcher exited with an I/O error: {}", e);
        std::process::exit(1);
    }

    log::info!("logscope-engine shutting down (stdin closed)");
}
