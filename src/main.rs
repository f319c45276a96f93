use glb_viewer::cli::CliOverrides;
use glb_viewer::config::ViewerConfig;
use log::{error, info};

const DEFAULT_CONFIG_PATH: &str = "config/viewer.json";

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = match CliOverrides::parse_from_env() {
        Ok(parsed) => parsed,
        Err(err) => {
            error!("[cli] {err}");
            std::process::exit(2);
        }
    };
    let mut config = match cli.config_path() {
        Some(path) => match ViewerConfig::load(path) {
            Ok(cfg) => cfg,
            Err(err) => {
                error!("[config] {err:?}");
                std::process::exit(2);
            }
        },
        None => ViewerConfig::load_or_default(DEFAULT_CONFIG_PATH),
    };
    let overrides = cli.into_config_overrides();
    if !overrides.is_empty() {
        info!("[cli] overriding {}", overrides.applied_fields().join(", "));
        config.apply_overrides(&overrides);
    }
    if let Err(err) = glb_viewer::run(config) {
        error!("Application error: {err:?}");
    }
}
