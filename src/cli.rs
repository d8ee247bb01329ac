use env_loadr::{BindOptions, EnvLoader, FromEnv, docs};
use std::{process::ExitCode, time::Duration};
use tracing_subscriber::EnvFilter;

#[derive(Debug, FromEnv)]
struct DatabaseConfig {
    /// Database connection string
    #[field(env = "URL", required)]
    url: String,

    /// Maximum number of pooled connections
    #[field(env = "POOL_SIZE", default = "10")]
    pool_size: u32,
}

#[derive(Debug, FromEnv)]
struct DemoConfig {
    /// Service name
    #[field(env = "APP_NAME", default = "util-cli")]
    app_name: String,

    /// Server port
    #[field(env = "PORT", default = "8080")]
    port: u16,

    /// Hosts allowed to connect
    #[field(env = "ALLOWED_HOSTS", delimiter = ";")]
    allowed_hosts: Vec<String>,

    /// Request timeout
    #[field(env = "REQUEST_TIMEOUT", default = "30s")]
    request_timeout: Duration,

    #[field(nested, prefix = "DB_")]
    database: DatabaseConfig,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    match args.first().map(String::as_str) {
        Some("load") => load(&args[1..]),
        Some("docs") => generate_docs(args.get(1).map_or("CONFIG.md", String::as_str)),
        Some(arg) => {
            eprintln!("unknown arg: {}. Available: load, docs", arg);
            ExitCode::FAILURE
        }
        None => {
            println!("Usage: util-cli [command]");
            println!("Commands:");
            println!("  load <env files..>  - Load the demo config, skipping missing files");
            println!("  docs [path]         - Write markdown documentation (default CONFIG.md)");
            ExitCode::SUCCESS
        }
    }
}

fn load(files: &[String]) -> ExitCode {
    let loader = EnvLoader::<DemoConfig>::builder()
        .sources(files)
        .skip_missing_files()
        .build();

    match loader.and_then(|loader| loader.load()) {
        Ok(config) => {
            println!("Config loaded successfully!");
            println!("  app_name: {}", config.app_name);
            println!("  port: {}", config.port);
            println!("  allowed_hosts: {:?}", config.allowed_hosts);
            println!(
                "  request_timeout: {}",
                humantime::format_duration(config.request_timeout)
            );
            println!("  database.url: {}", config.database.url);
            println!("  database.pool_size: {}", config.database.pool_size);
            ExitCode::SUCCESS
        }
        Err(error) => {
            eprintln!("Failed to load config:");
            eprintln!("\t- {}", error);
            ExitCode::FAILURE
        }
    }
}

fn generate_docs(path: &str) -> ExitCode {
    println!("Generating documentation for DemoConfig...");
    for field in DemoConfig::fields(&BindOptions::default()) {
        println!("  {} ({})", field.key, field.type_name);
    }

    match docs::write_docs::<DemoConfig>(path, &BindOptions::default()) {
        Ok(_) => {
            println!("✓ Documentation written to {}", path);
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("✗ Failed to write documentation: {}", e);
            ExitCode::FAILURE
        }
    }
}
