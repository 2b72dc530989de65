use anyhow::Context;
use clap::{Arg, ArgAction, Command};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use activity_map_sync::client::HereClient;
use activity_map_sync::config::{ToolConfig, DEFAULT_CONFIG_FILE};
use activity_map_sync::credentials::Credentials;
use activity_map_sync::transport::ReqwestTransport;
use activity_map_sync::{upload_geo_data, UploadError};

fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .without_time()
        .init();
}

fn run(
    config_path: PathBuf,
    file: Option<PathBuf>,
    credentials: Option<PathBuf>,
    refresh: bool,
) -> anyhow::Result<()> {
    let config = ToolConfig::load_from(&config_path)?;

    let geo_data_file = file.unwrap_or(config.paths.geo_data_file);
    let credentials_file = credentials.unwrap_or(config.paths.here_credentials_file);

    let credentials = Credentials::from_file(&credentials_file)?;
    let transport = ReqwestTransport::with_timeout(config.here.timeout_secs)?;
    let client = HereClient::connect(transport, &credentials, &config.here)
        .context("Failed to authenticate with the HERE platform")?;

    match upload_geo_data(&client, &geo_data_file, refresh, &config.here) {
        Ok(_) => Ok(()),
        Err(err @ UploadError::Provisioning(_)) => {
            eprintln!("[ERROR]: {}", err);
            std::process::exit(1);
        }
        Err(UploadError::Sync(err)) => Err(err).context("Failed to sync activities"),
    }
}

fn main() {
    let matches = Command::new("Activity Map Sync")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Uploads GeoJSON activity data to a HERE interactive map layer")
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .num_args(1)
                .default_value(DEFAULT_CONFIG_FILE)
                .help("Path of the tool configuration file"),
        )
        .arg(
            Arg::new("file")
                .short('f')
                .long("file")
                .num_args(1)
                .help("GeoJSON file to upload (overrides paths.geo_data_file)"),
        )
        .arg(
            Arg::new("credentials")
                .long("credentials")
                .num_args(1)
                .help("HERE credentials file (overrides paths.here_credentials_file)"),
        )
        .arg(
            Arg::new("refresh")
                .short('r')
                .long("refresh")
                .action(ArgAction::SetTrue)
                .help("Delete the existing activities from the layer before uploading"),
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .action(ArgAction::SetTrue)
                .help("Enable debug logging"),
        )
        .get_matches();

    init_logging(matches.get_flag("verbose"));

    let config_path = matches
        .get_one::<String>("config")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE));
    let file = matches.get_one::<String>("file").map(PathBuf::from);
    let credentials = matches.get_one::<String>("credentials").map(PathBuf::from);
    let refresh = matches.get_flag("refresh");

    if let Err(e) = run(config_path, file, credentials, refresh) {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}
