use roomview::{app::ViewerApp, config::ViewerConfig};

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = ViewerConfig::from_env();
    log::info!("Loading room from {}", config.asset_root.display());

    ViewerApp::new(config)?.run()
}
