use std::path::PathBuf;

use clap::{Args as ClapArgs, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;

use skiff::render::Site;

#[derive(Parser)]
#[command(version, about = "Generate static sites from Markdown and templates")]
struct Args {
    /// The command to execute
    #[command(subcommand)]
    command: SkiffCommand,
}

/// Flags shared by every subcommand.
#[derive(ClapArgs)]
struct SiteArgs {
    /// The site root directory (default: current directory)
    #[arg(value_name = "SITE-DIR", default_value = ".")]
    site_dir: PathBuf,

    /// The output directory (default: SITE-DIR/output)
    #[arg(long, value_name = "OUTPUT-DIR")]
    output: Option<PathBuf>,

    /// Use COUNT render workers
    #[arg(long, value_name = "COUNT", default_value = "8")]
    workers: usize,

    /// Print detailed logging to the console
    #[arg(long)]
    verbose: bool,

    /// Print no logging to the console
    #[arg(long)]
    quiet: bool,
}

impl SiteArgs {
    fn to_site(&self) -> Site {
        let mut site = Site::new(&self.site_dir).with_workers(self.workers);
        if let Some(output) = &self.output {
            site = site.with_output_dir(output.clone());
        }
        site
    }
}

#[derive(Parser)]
struct InitArgs {
    #[command(flatten)]
    site: SiteArgs,
}

#[derive(Parser)]
struct RenderArgs {
    /// Render all input files, including unchanged ones
    #[arg(short, long)]
    force: bool,

    #[command(flatten)]
    site: SiteArgs,
}

#[derive(Parser)]
struct ServeArgs {
    /// Listen on PORT
    #[arg(short, long, default_value = "8080")]
    port: u16,

    /// Open the site in the default browser
    #[arg(long)]
    open: bool,

    #[command(flatten)]
    site: SiteArgs,
}

#[derive(Subcommand)]
enum SkiffCommand {
    /// Create files and directories for a new site
    Init(InitArgs),

    /// Generate output files
    Render(RenderArgs),

    /// Generate output files and serve the site on a local port
    Serve(ServeArgs),
}

impl SkiffCommand {
    fn site_args(&self) -> &SiteArgs {
        match self {
            SkiffCommand::Init(args) => &args.site,
            SkiffCommand::Render(args) => &args.site,
            SkiffCommand::Serve(args) => &args.site,
        }
    }
}

fn init_logging(verbose: bool, quiet: bool) {
    let level = if quiet {
        "skiff=error"
    } else if verbose {
        "skiff=debug"
    } else {
        "skiff=info"
    };

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time()
        .init();
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    let site_args = args.command.site_args();
    init_logging(site_args.verbose, site_args.quiet);

    let result = match &args.command {
        SkiffCommand::Init(args) => commands::init::run(args).await,
        SkiffCommand::Render(args) => commands::render::run(args).await,
        SkiffCommand::Serve(args) => commands::serve::run(args).await,
    };

    if let Err(err) = result {
        eprintln!("Error! {err:#}");
        std::process::exit(1);
    }
}
