use std::path::PathBuf;
use std::thread;
use std::time::Duration;

use clap::{Parser, Subcommand};

use cloudsync::{CloudConfig, CloudCoordinator, CloudError, CloudResult, SyncDirection, UploadSelection};

const TICK_INTERVAL: Duration = Duration::from_millis(50);

/// cloudsync - back up game settings and assets to a sync service
#[derive(Parser, Debug)]
#[command(name = "cloudsync")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// JSON config file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Service root, overriding the config and CLOUDSYNC_URL
    #[arg(long)]
    url: Option<String>,

    /// Directory synced files live under
    #[arg(long)]
    save_dir: Option<PathBuf>,

    #[arg(long, short)]
    user: Option<String>,

    #[arg(long, short)]
    password: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Log in and pull settings
    Login,
    /// Create an account
    Register,
    /// Download settings and save them locally
    PullSettings,
    /// Upload local settings
    PushSettings,
    /// Upload one file from the save directory
    Upload { path: String },
    /// Upload every file in a folder (not recursive)
    UploadFolder { folder: String },
    /// Upload the default selection of config files
    Backup,
    /// Download one file
    Download { filename: String },
    /// Download every config file in the inventory
    DownloadConfigs,
    /// List stored files
    Inventory,
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let args = Args::parse();

    match run(args) {
        Ok(true) => {}
        Ok(false) => std::process::exit(1),
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    }
}

fn load_config(args: &Args) -> CloudResult<CloudConfig> {
    let mut config = match &args.config {
        Some(path) => CloudConfig::load(path)?,
        None => CloudConfig::default(),
    }
    .with_env_overrides();

    if let Some(url) = &args.url {
        config.service_url = url.clone();
    }
    if let Some(save_dir) = &args.save_dir {
        config.save_dir = save_dir.clone();
    }
    config.validate()?;
    Ok(config)
}

fn credentials(args: &Args) -> CloudResult<(&str, &str)> {
    match (&args.user, &args.password) {
        (Some(user), Some(password)) => Ok((user.as_str(), password.as_str())),
        _ => Err(CloudError::Config {
            message: "--user and --password are required".to_string(),
        }),
    }
}

/// Tick until nothing is in flight, printing events as they arrive.
/// Returns false if any operation failed.
fn settle(cloud: &mut CloudCoordinator) -> bool {
    let mut ok = true;
    loop {
        cloud.tick();
        for event in cloud.drain_events() {
            if event.is_failure() {
                ok = false;
                eprintln!("{}", event);
            } else {
                println!("{}", event);
            }
        }
        if !cloud.has_pending() {
            return ok;
        }
        thread::sleep(TICK_INTERVAL);
    }
}

fn run(args: Args) -> CloudResult<bool> {
    let config = load_config(&args)?;
    let mut cloud = CloudCoordinator::from_config(&config)?;
    let (user, password) = credentials(&args)?;

    if let Command::Register = args.command {
        cloud.register(user, password)?;
        return Ok(settle(&mut cloud));
    }

    cloud.login(user, password)?;
    if !settle(&mut cloud) || !cloud.is_logged_in() {
        return Ok(false);
    }

    match &args.command {
        Command::Login | Command::Register => return Ok(true),
        Command::PullSettings => cloud.sync_settings(SyncDirection::Download)?,
        Command::PushSettings => cloud.sync_settings(SyncDirection::Upload)?,
        Command::Upload { path } => cloud.upload_asset(path)?,
        Command::UploadFolder { folder } => {
            cloud.upload_asset_folder(folder)?;
        }
        Command::Backup => {
            cloud.upload_selection(&UploadSelection::default())?;
        }
        Command::Download { filename } => cloud.download_asset(filename)?,
        Command::DownloadConfigs => {
            cloud.download_all_configs()?;
        }
        Command::Inventory => {
            print_inventory(&cloud);
            return Ok(true);
        }
    }

    Ok(settle(&mut cloud))
}

fn print_inventory(cloud: &CloudCoordinator) {
    let inventory = cloud.inventory();
    if inventory.is_empty() {
        println!("No files stored");
    }
    for asset in inventory.iter() {
        println!(
            "{:<9} {}  v{} ({} versions, {} bytes, {})",
            asset.kind().badge(),
            asset.filename,
            asset.latest_version,
            asset.version_count,
            asset.total_size,
            asset.last_updated
        );
    }

    let summary = inventory.summary();
    if let (Some(used), Some(limit)) = (summary.storage_used_mb, summary.storage_limit_mb) {
        println!("Storage: {:.2} / {:.0} MB", used, limit);
    }
    if let Some(versions) = summary.version_limit {
        println!("Keeping up to {} versions per file", versions);
    }
}
