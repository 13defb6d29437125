use clap::Parser;
use sales_dashboard::{Config, app, loader};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::parse();

    let level = if config.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    config.validate()?;

    let table = match loader::load_orders(&config.data, &config.sheet) {
        Ok(table) => table,
        Err(e) => {
            log::error!("Could not load orders from {}: {}", config.data.display(), e);
            return Err(e.into());
        }
    };
    if table.is_empty() {
        log::warn!("{} holds no order rows, charts will be empty", config.data.display());
    }

    app::run(&config, table).await?;

    Ok(())
}
