use clap::Parser;
use ngconf::cli::{Cli, Commands};
use ngconf::config::ServiceConfig;
use ngconf::http::AuthConfig;
use ngconf::service::HostedInstance;
use ngconf_engine::facade::Bundle;
use ngconf_watch::WatcherPool;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Serve { config } => run_serve(&config),
        Commands::View { file } => run_view(&file),
        Commands::Stats { file } => run_stats(&file),
    }
}

fn run_serve(config_path: &std::path::Path) -> ExitCode {
    let config = match ServiceConfig::from_file(config_path) {
        Ok(config) => config,
        Err(err) => {
            eprintln!("failed to load service configuration: {err}");
            return ExitCode::FAILURE;
        }
    };

    let backup_root = config
        .log_config
        .as_ref()
        .map(|log| log.log_dir.join("backups"))
        .unwrap_or_else(|| std::path::PathBuf::from("./backups"));

    let watcher_pool = WatcherPool::new(ngconf_watch::DEFAULT_MAX_WATCHERS);
    let mut instances = Vec::with_capacity(config.ng_configs.len());

    for ng_config in &config.ng_configs {
        let auth = ng_config.auth.as_ref().map(|auth| {
            Arc::new(AuthConfig::single_user(
                auth.secret.as_bytes(),
                auth.username.clone(),
                auth.password.clone(),
            ))
        });
        match HostedInstance::start(ng_config, &watcher_pool, &backup_root, auth) {
            Ok(instance) => {
                tracing::info!(name = %ng_config.name, port = ng_config.port, "hosting instance started");
                instances.push(instance);
            }
            Err(err) => {
                eprintln!("failed to start instance '{}': {err}", ng_config.name);
                return ExitCode::FAILURE;
            }
        }
    }

    if instances.is_empty() {
        eprintln!("service configuration named no instances under 'ngConfigs'");
        return ExitCode::FAILURE;
    }

    loop {
        std::thread::sleep(Duration::from_secs(3600));
    }
}

fn run_view(file: &std::path::Path) -> ExitCode {
    match Bundle::load(file) {
        Ok(bundle) => {
            print!("{}", String::from_utf8_lossy(&bundle.view()));
            ExitCode::SUCCESS
        }
        Err(err) => {
            eprintln!("failed to load '{}': {err}", file.display());
            ExitCode::FAILURE
        }
    }
}

fn run_stats(file: &std::path::Path) -> ExitCode {
    match Bundle::load(file) {
        Ok(bundle) => {
            let stats = bundle.statistics_by_json();
            println!("{}", serde_json::to_string_pretty(&stats).unwrap_or_default());
            ExitCode::SUCCESS
        }
        Err(err) => {
            eprintln!("failed to load '{}': {err}", file.display());
            ExitCode::FAILURE
        }
    }
}
