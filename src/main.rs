use shapeswarm::config::SwarmConfig;

fn main() {
    env_logger::init();

    let config = match std::env::args().nth(1) {
        Some(path) => match SwarmConfig::load(&path) {
            Ok(config) => {
                log::info!("Loaded config from {}", path);
                config
            }
            Err(e) => {
                log::error!("{}", e);
                std::process::exit(1);
            }
        },
        None => SwarmConfig::default(),
    };

    if let Err(e) = shapeswarm::app::run(config) {
        log::error!("{}", e);
        std::process::exit(1);
    }
}
