use streetview_route::{App, Config};

use anyhow::Context;
use log::LevelFilter;

fn main() -> anyhow::Result<()> {
    let config = Config::new();

    let level = if config.verbose { LevelFilter::Debug } else { LevelFilter::Info };
    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .format_target(false)
        .init();

    log::info!("streetview-route v{}", env!("CARGO_PKG_VERSION"));

    let mut app = App::new(config).context("Could not start")?;
    app.run().context("Run aborted, run counter left unchanged")?;

    Ok(())
}
