//! Registry extract PDF generation service

mod http;
mod logging;

use clap::{Arg, Command};
use logging::LogSettings;
use regprint_core::{
    CountingObserver, DocxRenderer, LopdfPageCounter, Pipeline, ServiceConfig, SofficeConverter,
    WorkspaceManager,
};
use std::path::PathBuf;
use std::sync::Arc;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let matches = Command::new("regprint-server")
        .version("1.0.0")
        .about("Registry extract PDF generation service")
        .arg(
            Arg::new("listen")
                .long("listen")
                .value_name("ADDR")
                .help("Address to listen on")
                .env("REGPRINT_LISTEN")
                .default_value("0.0.0.0:8000"),
        )
        .arg(
            Arg::new("template")
                .long("template")
                .value_name("FILE")
                .help("DOCX template path")
                .env("REGPRINT_TEMPLATE")
                .default_value("templates/template.docx"),
        )
        .arg(
            Arg::new("temp-dir")
                .long("temp-dir")
                .value_name("DIR")
                .help("Base directory for per-request workspaces (defaults to TMPDIR)")
                .env("REGPRINT_TEMP_DIR"),
        )
        .arg(
            Arg::new("soffice")
                .long("soffice")
                .value_name("FILE")
                .help("Converter binary path (conventional locations probed when unset)")
                .env("SOFFICE_PATH"),
        )
        .arg(
            Arg::new("convert-timeout")
                .long("convert-timeout")
                .value_name("SECS")
                .help("Conversion timeout in seconds")
                .env("REGPRINT_CONVERT_TIMEOUT")
                .default_value("60"),
        )
        .arg(
            Arg::new("log-level")
                .long("log-level")
                .value_name("LEVEL")
                .help("Log level when RUST_LOG is unset")
                .env("LOG_LEVEL")
                .default_value("info"),
        )
        .arg(
            Arg::new("environment")
                .long("environment")
                .value_name("ENV")
                .help("'production' switches to JSON log lines")
                .env("ENVIRONMENT")
                .default_value("development"),
        )
        .get_matches();

    let environment = matches.get_one::<String>("environment").unwrap();
    LogSettings {
        level: matches.get_one::<String>("log-level").unwrap().clone(),
        production: environment == "production",
    }
    .init();

    let temp_dir = matches
        .get_one::<String>("temp-dir")
        .cloned()
        .or_else(|| std::env::var("TMPDIR").ok())
        .unwrap_or_else(|| "/tmp".to_string());

    let config = ServiceConfig {
        temp_dir: PathBuf::from(temp_dir),
        template_path: PathBuf::from(matches.get_one::<String>("template").unwrap()),
        soffice_path: matches.get_one::<String>("soffice").map(PathBuf::from),
        convert_timeout_secs: matches
            .get_one::<String>("convert-timeout")
            .unwrap()
            .parse()?,
    };
    config.validate()?;
    log::info!(
        "using template {} and workspace base {}",
        config.template_path.display(),
        config.temp_dir.display()
    );

    let converter = SofficeConverter::new(config.soffice_path.clone(), config.convert_timeout());
    match converter.probe().await {
        Ok(version) => log::info!("converter available: {version}"),
        Err(e) => log::warn!("converter probe failed, requests will error: {e}"),
    }

    let observer = Arc::new(CountingObserver::new());
    let pipeline = Arc::new(Pipeline::new(
        config.template_path.clone(),
        WorkspaceManager::new(&config.temp_dir),
        DocxRenderer::new(),
        converter,
        LopdfPageCounter::new(),
        observer,
    ));

    let listen = matches.get_one::<String>("listen").unwrap();
    let listener = tokio::net::TcpListener::bind(listen.as_str()).await?;
    log::info!("listening on {listen}");
    axum::serve(listener, http::router(pipeline)).await?;

    Ok(())
}
