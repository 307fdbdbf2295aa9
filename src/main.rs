//! vulnscope - web vulnerability scan orchestration and reporting

use clap::{CommandFactory, Parser};

mod archive;
mod catalog;
mod cli;
mod config;
mod engine;
mod error;
mod models;
mod orchestrator;
mod output;
mod report;

#[cfg(test)]
mod fixtures;

use cli::{
    ArchiveCommands, Cli, CommandContext, Commands, ConfigCommands, GlobalOptions,
    HistoryCommands,
};
use error::Result;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_logging(cli.debug);

    if let Err(err) = run(cli).await {
        eprintln!("Error: {}", err);
        std::process::exit(1);
    }
}

/// `RUST_LOG` wins over `--debug`, which wins over the quiet default
fn init_logging(debug: bool) {
    let default_filter = if debug { "warn,vulnscope=debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .format_timestamp_millis()
        .init();
}

async fn run(cli: Cli) -> Result<()> {
    let opts = GlobalOptions::from_cli(&cli);

    match cli.command {
        Commands::Scan(args) => {
            let ctx = CommandContext::new(&opts)?;
            cli::scan::run(&ctx, &args).await
        }
        Commands::Report {
            scan,
            report_type,
            output,
        } => {
            let ctx = CommandContext::new(&opts)?;
            cli::report::run(&ctx, &scan, report_type, output.as_deref())
        }
        Commands::History(history_cmd) => {
            let ctx = CommandContext::new(&opts)?;
            match history_cmd {
                HistoryCommands::List { limit } => cli::history::list(&ctx, limit),
                HistoryCommands::Show { scan } => cli::history::show(&ctx, &scan),
            }
        }
        Commands::Catalog => cli::catalog::run(opts.format),
        Commands::Archive(archive_cmd) => {
            let ctx = CommandContext::new(&opts)?;
            match archive_cmd {
                ArchiveCommands::Status => cli::archive::status(&ctx),
                ArchiveCommands::Clear { yes } => cli::archive::clear(&ctx, yes),
                ArchiveCommands::Path => cli::archive::path(&ctx),
            }
        }
        Commands::Config(config_cmd) => match config_cmd {
            ConfigCommands::Init { force } => cli::config::init(&opts, force),
            ConfigCommands::Show => cli::config::show(&CommandContext::new(&opts)?),
            ConfigCommands::Path => cli::config::path(&opts),
        },
        Commands::Completion { shell } => {
            clap_complete::generate(
                shell,
                &mut Cli::command(),
                "vulnscope",
                &mut std::io::stdout(),
            );
            Ok(())
        }
        Commands::Version => {
            println!("vulnscope version {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}
