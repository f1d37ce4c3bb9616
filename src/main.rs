use std::path::PathBuf;

use script_bindings::codegen;
use script_bindings::config::BindgenConfig;
use script_bindings::core::logging::initialize_logging;

const DEFAULT_CONFIG: &str = "bindgen.toml";

fn main() {
    let config_path = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG));

    let mut config = match BindgenConfig::from_file(&config_path) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load {}: {}", config_path.display(), e);
            std::process::exit(1);
        }
    };
    config.apply_env_overrides();
    initialize_logging(&config.logging);

    if let Err(e) = config.validate() {
        tracing::error!(target: "bindgen", "Invalid configuration: {}", e);
        std::process::exit(1);
    }

    match codegen::run(&config) {
        Ok(report) if report.is_success() => {
            tracing::info!(
                target: "bindgen",
                "Generated {} files into {}",
                report.files.len(),
                config.output.output_dir.display()
            );
        }
        Ok(report) => {
            for failure in &report.failures {
                tracing::error!(
                    target: "bindgen",
                    "Failed to generate {}: {}",
                    failure.interface,
                    failure.error
                );
            }
            std::process::exit(1);
        }
        Err(e) => {
            tracing::error!(target: "bindgen", "Binding generation failed: {}", e);
            std::process::exit(1);
        }
    }
}
