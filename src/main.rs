use clap::{Parser, Subcommand};
use repoman::commands::{self, CheckoutArgs, CheckoutListArgs, PerformArgs, PrepareArgs, ReleaseArgs};
use repoman::core::context::RepomanContext;
use repoman::core::error::{RepoError, RepoResult, print_error};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Check out and release workspaces of independently versioned packages
#[derive(Parser)]
#[command(name = "repoman")]
#[command(version, about, long_about = None)]
#[command(propagate_version = true)]
#[command(styles = get_styles())]
struct Cli {
  /// Workspace directory (default: current directory)
  #[arg(long, short = 'w', env = "WORKSPACE_DIR", global = true, value_name = "DIR")]
  workspace: Option<PathBuf>,

  /// Base URL that package names are appended to
  #[arg(long, env = "REMOTE_BASE", global = true, value_name = "URL")]
  remote_base: Option<String>,

  /// Verbose output (shows git commands)
  #[arg(short, long, global = true)]
  verbose: bool,

  #[command(subcommand)]
  command: Commands,
}

#[derive(Subcommand)]
enum Commands {
  // ============================================================================
  // Workspace
  // ============================================================================
  /// Check out a package (tag, branch or commit) and the packages it lists
  Checkout(CheckoutArgs),

  /// Check out every package in a package list
  #[command(name = "checkout-list")]
  CheckoutList(CheckoutListArgs),

  // ============================================================================
  // Releases
  // ============================================================================
  /// Prepare and perform a release
  Release(ReleaseArgs),

  /// Compute the next version, update release notes and record the release
  #[command(name = "release-prepare")]
  ReleasePrepare(PrepareArgs),

  /// Commit, tag and push a prepared release
  #[command(name = "release-perform")]
  ReleasePerform(PerformArgs),
}

fn get_styles() -> clap::builder::Styles {
  clap::builder::Styles::styled()
    .usage(
      anstyle::Style::new()
        .bold()
        .underline()
        .fg_color(Some(anstyle::Color::Ansi(anstyle::AnsiColor::Yellow))),
    )
    .header(
      anstyle::Style::new()
        .bold()
        .underline()
        .fg_color(Some(anstyle::Color::Ansi(anstyle::AnsiColor::Yellow))),
    )
    .literal(anstyle::Style::new().fg_color(Some(anstyle::Color::Ansi(anstyle::AnsiColor::Green))))
    .invalid(
      anstyle::Style::new()
        .bold()
        .fg_color(Some(anstyle::Color::Ansi(anstyle::AnsiColor::Red))),
    )
    .error(
      anstyle::Style::new()
        .bold()
        .fg_color(Some(anstyle::Color::Ansi(anstyle::AnsiColor::Red))),
    )
    .valid(
      anstyle::Style::new()
        .bold()
        .underline()
        .fg_color(Some(anstyle::Color::Ansi(anstyle::AnsiColor::Green))),
    )
}

fn main() {
  let cli = Cli::parse();

  let filter = if cli.verbose {
    EnvFilter::new("repoman=debug")
  } else {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("repoman=info"))
  };
  tracing_subscriber::fmt()
    .with_env_filter(filter)
    .with_target(false)
    .without_time()
    .with_writer(std::io::stderr)
    .init();

  if let Err(err) = run(cli) {
    handle_error(err);
  }
}

fn run(cli: Cli) -> RepoResult<()> {
  let ctx = build_context(cli.workspace, cli.remote_base)?;

  match cli.command {
    Commands::Checkout(args) => commands::run_checkout(&ctx, &args),
    Commands::CheckoutList(args) => commands::run_checkout_list(&ctx, &args),
    Commands::Release(args) => commands::run_release(&ctx, &args),
    Commands::ReleasePrepare(args) => commands::run_prepare(&ctx, &args),
    Commands::ReleasePerform(args) => commands::run_perform(&ctx, &args),
  }
}

/// Load repoman.toml from the workspace, then apply CLI overrides
fn build_context(workspace: Option<PathBuf>, remote_base: Option<String>) -> RepoResult<RepomanContext> {
  let root = match workspace {
    Some(dir) => dir,
    None => std::env::current_dir()?,
  };
  if !root.is_dir() {
    return Err(RepoError::with_help(
      format!("Workspace directory {} does not exist", root.display()),
      "Create it or point --workspace / WORKSPACE_DIR at an existing directory.",
    ));
  }

  let ctx = RepomanContext::build(&root)?;
  Ok(match remote_base {
    Some(base) => ctx.with_remote_base(base),
    None => ctx,
  })
}

fn handle_error(err: RepoError) -> ! {
  print_error(&err);
  std::process::exit(err.exit_code().as_i32());
}
