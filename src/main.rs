use clap::error::ErrorKind;
use clap::Parser;
use crypt_snapshot::backup::backup_config::{BackupConfig, DEFAULT_CONFIG_PATH};
use crypt_snapshot::backup::command::{ProcessRunner, Tools};
use crypt_snapshot::backup::profile::{usage, Operation, Profile};
use crypt_snapshot::backup::report::{ColorChoice, Reporter};
use crypt_snapshot::backup::result_error::error::EXIT_USAGE;
use std::io::IsTerminal;
use std::path::PathBuf;
use std::process::exit;
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

/// Rotating incremental backups onto an encrypted disk
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Location of config file
    #[arg(short, long, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,
    /// Colour in status output
    #[arg(long, value_enum, default_value_t = ColorChoice::Auto)]
    color: ColorChoice,
    /// Print mutating commands instead of running them
    #[arg(long)]
    dry_run: bool,
    #[arg(value_enum)]
    profile: Profile,
    #[arg(value_enum)]
    operation: Operation,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = match Args::try_parse() {
        Ok(args) => args,
        Err(e) if matches!(e.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) => {
            e.exit()
        }
        Err(e) => {
            let reporter = Reporter::new(ColorChoice::Auto.resolve(std::io::stdout().is_terminal()));
            let program = std::env::args()
                .next()
                .unwrap_or_else(|| env!("CARGO_BIN_NAME").to_owned());
            tracing::debug!("{e}");
            print!("{}", usage(&program, &reporter));
            exit(EXIT_USAGE);
        }
    };

    let reporter = Reporter::new(args.color.resolve(std::io::stdout().is_terminal()));
    let res = BackupConfig::from_file(&args.config).and_then(|config| {
        let runner = ProcessRunner::builder()
            .sudo(&config.tools().sudo)
            .use_sudo(*config.use_sudo())
            .dry_run(args.dry_run)
            .reporter(reporter)
            .build();
        let tools = Tools {
            paths: Arc::new(config.tools().clone()),
            runner: Arc::new(runner),
            reporter,
        };
        info!("Running {} {}", args.profile, args.operation);
        args.profile
            .build(&config, tools)?
            .execute(args.operation)
    });

    match res {
        Ok(_) => info!("Finished {} {}", args.profile, args.operation),
        Err(e) => {
            error!("{e}");
            exit(e.exit_code());
        }
    }
}
