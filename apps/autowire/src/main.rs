mod commands;
mod reporter;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use log::debug;
use std::io::{BufWriter, Write};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "autowire")]
#[command(about = "Automatic imports for Svelte components and modules", long_about = None)]
struct Cli {
    #[command(flatten)]
    global: GlobalArgs,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Clone, Args)]
pub struct GlobalArgs {
    /// Project root (defaults to the nearest folder with package.json or .git)
    #[arg(long, global = true)]
    pub root: Option<PathBuf>,

    /// Configuration file, relative to the root
    #[arg(long, global = true, default_value = "autowire.config.json")]
    pub config: PathBuf,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Add missing imports to components and scripts
    Transform(commands::TransformArgs),
    /// List every symbol that can be used without an import
    Mapping,
    /// Print or write ambient type declarations for editor tooling
    Types(commands::TypesArgs),
    /// Rebuild the mapping whenever component files are added or removed
    Watch,
}

fn main() -> Result<()> {
    env_logger::init();

    // stdio is blocked by LineWriter, use a BufWriter to reduce syscalls.
    // See https://github.com/rust-lang/rust/issues/60673
    let mut stdout = BufWriter::new(std::io::stdout());

    let cli = Cli::parse();
    debug!("Parsed CLI arguments: {:?} {:?}", cli.global, cli.command);

    let plugin = commands::load_plugin(&cli.global)?;

    match cli.command {
        Commands::Transform(args) => {
            let would_change = commands::run_transform(&mut stdout, &plugin, &args)?;
            stdout.flush()?;
            if args.check && would_change {
                // Non-zero exit to fail CI
                std::process::exit(1);
            }
        }
        Commands::Mapping => commands::run_mapping(&mut stdout, &plugin)?,
        Commands::Types(args) => commands::run_types(&mut stdout, &plugin, &args)?,
        Commands::Watch => commands::run_watch(&mut stdout, plugin)?,
    }
    stdout.flush()?;
    Ok(())
}
