//! timelock: token ledger with time-locked staking.

use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;

use timelock_cli::{App, CliConfig};
use timelock_types::{HolderId, SystemClock};
use timelock_utils::LogFormat;

#[derive(Parser)]
#[command(name = "timelock", about = "Token ledger with time-locked staking", version)]
struct Cli {
    /// Data directory for ledger and registry storage.
    /// Defaults to the config file's value, then "./timelock_data".
    #[arg(long, env = "TIMELOCK_DATA_DIR")]
    data_dir: Option<PathBuf>,

    /// Path to a TOML configuration file. File settings are the base;
    /// CLI flags and env vars override them.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Log level: "trace", "debug", "info", "warn", "error".
    #[arg(long, env = "TIMELOCK_LOG_LEVEL")]
    log_level: Option<String>,

    /// Log format: "human" or "json".
    #[arg(long, env = "TIMELOCK_LOG_FORMAT")]
    log_format: Option<LogFormat>,

    /// Seconds in one unit of stake duration (default: one day).
    #[arg(long, env = "TIMELOCK_LOCK_UNIT_SECS")]
    lock_unit_secs: Option<u64>,

    #[command(subcommand)]
    command: Command,
}

#[derive(clap::Subcommand)]
enum Command {
    /// Credit new tokens to a holder.
    Mint {
        #[arg(long)]
        to: HolderId,
        #[arg(long)]
        amount: u128,
    },
    /// Destroy tokens from a holder's balance.
    Burn {
        #[arg(long)]
        from: HolderId,
        #[arg(long)]
        amount: u128,
    },
    /// Move tokens between holders.
    Transfer {
        #[arg(long)]
        from: HolderId,
        #[arg(long)]
        to: HolderId,
        #[arg(long)]
        amount: u128,
    },
    /// Print a holder's balance.
    Balance { holder: HolderId },
    /// Time-locked staking positions.
    Stake {
        #[command(subcommand)]
        action: StakeAction,
    },
    /// Supply, custody and integrity summary as JSON.
    Status,
    /// Print the effective configuration as TOML.
    Config,
}

#[derive(clap::Subcommand)]
enum StakeAction {
    /// Lock tokens for a number of lock units; prints the position index.
    Open {
        #[arg(long)]
        holder: HolderId,
        #[arg(long)]
        amount: u128,
        #[arg(long)]
        duration: u64,
    },
    /// Reclaim an expired position.
    Settle {
        #[arg(long)]
        holder: HolderId,
        #[arg(long)]
        index: u64,
    },
    /// Print one position as JSON.
    Get {
        #[arg(long)]
        holder: HolderId,
        #[arg(long)]
        index: u64,
    },
    /// Print all of a holder's positions as JSON.
    List {
        #[arg(long)]
        holder: HolderId,
    },
}

impl Cli {
    /// File config (or defaults) with flags and env vars applied on top.
    fn effective_config(&self) -> anyhow::Result<CliConfig> {
        let mut config = match &self.config {
            Some(path) => CliConfig::from_toml_file(path)?,
            None => CliConfig::default(),
        };
        if let Some(data_dir) = &self.data_dir {
            config.data_dir = data_dir.clone();
        }
        if let Some(level) = &self.log_level {
            config.log_level = level.clone();
        }
        if let Some(format) = self.log_format {
            config.log_format = format;
        }
        if let Some(unit) = self.lock_unit_secs {
            config.staking.lock_unit_secs = unit;
        }
        config.validate()?;
        Ok(config)
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = cli.effective_config()?;

    timelock_utils::init_tracing(&config.log_level, config.log_format);
    if let Some(path) = &cli.config {
        tracing::debug!(path = %path.display(), "loaded config file");
    }

    if let Command::Config = cli.command {
        print!("{}", config.to_toml_string()?);
        return Ok(());
    }

    let app = App::open(&config, Arc::new(SystemClock))?;

    match cli.command {
        Command::Mint { to, amount } => {
            let balance = app.mint(&to, amount)?;
            app.save()?;
            println!("{balance}");
        }
        Command::Burn { from, amount } => {
            let balance = app.burn(&from, amount)?;
            app.save()?;
            println!("{balance}");
        }
        Command::Transfer { from, to, amount } => {
            app.transfer(&from, &to, amount)?;
            app.save()?;
            println!("{}", app.balance(&from));
        }
        Command::Balance { holder } => println!("{}", app.balance(&holder)),
        Command::Stake { action } => match action {
            StakeAction::Open {
                holder,
                amount,
                duration,
            } => {
                let index = app.stake_open(&holder, amount, duration)?;
                app.save()?;
                println!("{index}");
            }
            StakeAction::Settle { holder, index } => {
                let amount = app.stake_settle(&holder, index)?;
                app.save()?;
                println!("{amount}");
            }
            StakeAction::Get { holder, index } => {
                let view = app.stake_get(&holder, index)?;
                println!("{}", serde_json::to_string_pretty(&view)?);
            }
            StakeAction::List { holder } => {
                let views = app.stake_list(&holder);
                println!("{}", serde_json::to_string_pretty(&views)?);
            }
        },
        Command::Status => {
            let report = app.status()?;
            println!("{}", serde_json::to_string_pretty(&report)?);
            if !report.custody_consistent {
                anyhow::bail!(
                    "custody balance {} does not match open positions {}",
                    report.custody_balance,
                    report.total_locked
                );
            }
        }
        Command::Config => {}
    }

    Ok(())
}
