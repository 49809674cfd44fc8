use std::path::PathBuf;

use markd_syncd::config::{ConfigError, DEFAULT_CONFIG_FILE, EXAMPLE_CONFIG, SyncConfig};
use markd_syncd::daemon::SyncRuntime;
use markd_syncd::logging;

#[derive(Debug, Clone, PartialEq, Eq)]
enum CliMode {
    Watch,
    Push(PathBuf),
    Pull,
    Help,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct CliArgs {
    config: PathBuf,
    mode: CliMode,
}

fn parse_cli_args<I>(args: I) -> anyhow::Result<CliArgs>
where
    I: IntoIterator<Item = String>,
{
    let mut config = None;
    let mut mode = CliMode::Watch;
    let mut args = args.into_iter().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--push" => {
                let Some(path) = args.next() else {
                    anyhow::bail!("--push requires a file path");
                };
                mode = CliMode::Push(PathBuf::from(path));
            }
            "--pull" => mode = CliMode::Pull,
            "--help" | "-h" => mode = CliMode::Help,
            other if other.starts_with('-') => anyhow::bail!("unknown argument: {other}"),
            other => {
                if config.is_some() {
                    anyhow::bail!("unexpected extra argument: {other}");
                }
                config = Some(PathBuf::from(other));
            }
        }
    }
    Ok(CliArgs {
        config: config.unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE)),
        mode,
    })
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    logging::init();

    let args = parse_cli_args(std::env::args())?;
    if args.mode == CliMode::Help {
        println!("Usage: markd-syncd [CONFIG] [--push <FILE> | --pull]");
        println!("  CONFIG         Path to the sync config (default {DEFAULT_CONFIG_FILE})");
        println!("  --push <FILE>  Push a single file and exit");
        println!("  --pull         Pull the whole workspace and exit");
        println!("Without --push/--pull the daemon pulls (auto_pull) and watches (watch_enabled).");
        return Ok(());
    }

    let config = match SyncConfig::load(&args.config) {
        Ok(config) => config,
        Err(err @ ConfigError::NotFound(_)) => {
            eprintln!("Create {} with:\n{EXAMPLE_CONFIG}", args.config.display());
            return Err(err.into());
        }
        Err(err) => return Err(err.into()),
    };

    match args.mode {
        CliMode::Push(path) => {
            if !path.exists() {
                anyhow::bail!("file not found: {}", path.display());
            }
            let runtime = SyncRuntime::bootstrap(config).await?;
            if runtime.push_once(&path).await.is_none() {
                anyhow::bail!("push of {} failed", path.display());
            }
        }
        CliMode::Pull => {
            let runtime = SyncRuntime::bootstrap(config).await?;
            runtime.pull_once().await?;
        }
        CliMode::Watch => {
            let runtime = SyncRuntime::bootstrap(config).await?;
            runtime.run().await?;
        }
        CliMode::Help => {}
    }
    Ok(())
}
