use anyhow::{Context, anyhow, bail};
use clap::Parser;
use log::{error, info};
use relay_gate::config::Config;
use relay_gate::config_validation::ConfigValidator;
use relay_gate::logging::{self, CustomLogger};
use relay_gate::proxy::ProxyServer;
use std::path::{Path, PathBuf};
use tokio::signal;

#[derive(Parser)]
#[clap(
    version,
    about = "Minimal HTTP forwarding proxy routing /o, /c and /p prefixes to upstream origins"
)]
struct Args {
    #[clap(long, value_name = "PORT", help = "The port on which the service runs (default: 9000)")]
    port: Option<u16>,

    #[clap(long, help = "Enable any site proxy router")]
    enable_proxy_any_site: bool,

    #[clap(short, long, value_name = "FILE", help = "Configuration file path")]
    config: Option<String>,

    #[clap(long, value_name = "FILE", help = "Landing page served on / (default: index.html)")]
    index_file: Option<PathBuf>,

    #[clap(long, value_name = "BYTES", help = "Size of each pooled response relay buffer")]
    buffer_size: Option<usize>,

    #[clap(long, value_name = "LEVEL", help = "Log level: trace, debug, info, warn, error")]
    log_level: Option<String>,

    #[clap(long, value_name = "FORMAT", help = "Log format: text or json")]
    log_format: Option<String>,

    #[clap(long, value_name = "FILE", help = "Generate a sample configuration file")]
    generate_config: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    if let Some(config_file) = &args.generate_config {
        Config::default()
            .to_file(config_file)
            .map_err(|e| anyhow!("writing {}: {}", config_file, e))?;
        println!("Sample configuration file generated: {}", config_file);
        return Ok(());
    }

    let config = load_config(&args)?;
    init_logging(&args, &config)?;

    let validation = ConfigValidator::new(&config).validate();
    validation.log();
    if !validation.is_valid {
        for err in &validation.errors {
            error!("{}", err);
        }
        bail!("invalid configuration: {}", validation.errors.join("; "));
    }

    info!(
        "Service running on http://127.0.0.1:{} (Press CTRL+C to quit)",
        config.port
    );

    let server = ProxyServer::from_config(&config);
    let addr = config.listen_addr();

    tokio::select! {
        result = server.run(addr) => {
            result.with_context(|| format!("proxy server on {} stopped", addr))?;
        }
        _ = signal::ctrl_c() => {
            info!("Received Ctrl+C, shutting down");
        }
    }

    Ok(())
}

fn load_config(args: &Args) -> anyhow::Result<Config> {
    let mut config = match &args.config {
        Some(config_file) => {
            if !Path::new(config_file).exists() {
                bail!("Configuration file not found: {}", config_file);
            }
            Config::from_file(config_file).map_err(|e| anyhow!("loading {}: {}", config_file, e))?
        }
        None => Config::default(),
    };

    // Command line flags win over the file
    if let Some(port) = args.port {
        config.port = port;
    }
    if args.enable_proxy_any_site {
        config.enable_proxy_any_site = true;
    }
    if let Some(index_file) = &args.index_file {
        config.index_file = index_file.clone();
    }
    if let Some(buffer_size) = args.buffer_size {
        config.buffer_size = buffer_size;
    }

    Ok(config)
}

fn init_logging(args: &Args, config: &Config) -> anyhow::Result<()> {
    match &config.logging {
        Some(logging_config) => {
            let mut logging_config = logging_config.clone();
            if let Some(level) = &args.log_level {
                logging_config.level =
                    Some(logging::parse_log_level(level).map_err(|e| anyhow!("{}", e))?);
            }
            if let Some(format) = &args.log_format {
                logging_config.format =
                    Some(logging::parse_log_format(format).map_err(|e| anyhow!("{}", e))?);
            }
            CustomLogger::init(logging_config).map_err(|e| anyhow!("initializing logger: {}", e))
        }
        None => logging::init_fallback(args.log_level.as_deref(), args.log_format.as_deref())
            .map_err(|e| anyhow!("initializing logger: {}", e)),
    }
}
