use teamboard::logger::*;

fn main() -> anyhow::Result<()> {
    let logger = Logger::new_bootstrap();
    trace!("bootstrap trace log");
    debug!("bootstrap debug log");
    info!("bootstrap info log");

    let config = LogConfig {
        filter: "debug".to_string(),
    };
    let applied = logger.reload_from_config(&config)?;
    info!(applied, "reloaded from config");
    trace!("application trace log");
    debug!("application debug log");
    info!("application info log");

    Ok(())
}
