mod cmd;
mod output;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use cmd::{DeployArgs, ResolveArgs, cmd_deploy, cmd_verify};
use output::{OutputFormat, print_error};

/// skiff - compile service descriptors into scheduler manifests and deploy them
#[derive(Parser)]
#[command(name = "skiff")]
#[command(author, version, about, long_about = None)]
struct Cli {
  /// Enable verbose output
  #[arg(short, long, global = true)]
  verbose: bool,

  /// Output format
  #[arg(short, long, global = true, value_enum, default_value_t)]
  output: OutputFormat,

  #[command(subcommand)]
  command: Commands,
}

#[derive(Subcommand)]
enum Commands {
  /// Resolve service files and deploy them to the scheduler
  Deploy(DeployArgs),

  /// Resolve service files and check them for plaintext secrets
  Verify(ResolveArgs),
}

fn main() {
  let cli = Cli::parse();

  let default_level = if cli.verbose { "debug" } else { "info" };
  tracing_subscriber::fmt()
    .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)))
    .with_writer(std::io::stderr)
    .without_time()
    .init();

  let result = match cli.command {
    Commands::Deploy(args) => cmd_deploy(args, cli.output),
    Commands::Verify(args) => cmd_verify(args, cli.output),
  };

  if let Err(e) = result {
    print_error(&format!("{e:#}"));
    std::process::exit(1);
  }
}
