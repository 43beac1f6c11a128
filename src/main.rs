use noobhttp::config::Config;
use noobhttp::handler::AppState;
use noobhttp::{logger, server};
use std::sync::Arc;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cfg = Config::load_from("config")?;

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;

    runtime.block_on(async_main(cfg))
}

async fn async_main(cfg: Config) -> Result<(), Box<dyn std::error::Error>> {
    logger::init(&cfg)?;

    let addr = cfg.get_socket_addr()?;
    let listener = server::create_reusable_listener(addr)?;

    logger::log_server_start(&addr, &cfg);
    if cfg.server.ssl.is_some() {
        logger::log_warning(
            "TLS configuration present; terminate TLS at a fronting proxy, this listener is plain HTTP",
        );
    }

    let state = Arc::new(AppState::new(cfg));
    server::run(listener, state).await;

    Ok(())
}
