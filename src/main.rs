use std::env;

use tollbook_config::Logging;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

fn init_logging(logging: &Logging) {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&logging.level));

    let registry = tracing_subscriber::registry().with(env_filter);
    let _ = if logging.format == "json" {
        registry
            .with(fmt::layer().json().with_current_span(true))
            .try_init()
    } else {
        registry.with(fmt::layer().with_target(false)).try_init()
    };
}

#[tokio::main]
async fn main() {
    let mut args = env::args().skip(1);
    let cmd = args.next().unwrap_or_default();
    if cmd != "serve" && cmd != "check-config" {
        eprintln!("Usage: tollbook <serve|check-config> --config <path>");
        std::process::exit(2);
    }

    let mut config_path = String::from("./config/example-config.yaml");
    while let Some(arg) = args.next() {
        if arg == "--config" {
            if let Some(v) = args.next() {
                config_path = v;
            }
        }
    }

    let cfg = match tollbook_config::load_and_validate(&config_path) {
        Ok(v) => v,
        Err(e) => {
            eprintln!("failed to load config: {e}");
            std::process::exit(1);
        }
    };
    if cmd == "check-config" {
        println!("config ok: {config_path}");
        return;
    }

    init_logging(&cfg.logging);
    tracing::info!(
        config = %config_path,
        store = %cfg.store.kind,
        callback = %cfg.server.callback_path,
        "starting tollbook"
    );

    if let Err(e) = tollbook_server::serve(cfg).await {
        tracing::error!(error = %e, "server exited with error");
        std::process::exit(1);
    }
}
