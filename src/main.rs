//! # reqforge CLI
//!
//! The `reqforge` binary turns UI screenshots into structured requirements
//! documentation, one screen at a time, grounded in the screens already
//! analyzed for the same project.
//!
//! ## Usage
//!
//! ```bash
//! reqforge --config ./config/reqforge.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `reqforge init` | Create the SQLite database and run schema migrations |
//! | `reqforge project create` | Create an empty project |
//! | `reqforge project list` | List projects with their screen counts |
//! | `reqforge project show <id>` | Print a project and its analyzed screens as JSON |
//! | `reqforge analyze` | Analyze a screenshot and append it to a project |
//! | `reqforge context <id>` | Print the context documents a new screen would see |
//!
//! ## Examples
//!
//! ```bash
//! reqforge init
//! reqforge project create --name "Banking" --description "Retail banking mobile app"
//! GEMINI_API_KEY=... reqforge analyze --project <id> --image ./login.png \
//!     --description "login form with remember-me"
//! reqforge context <id> --query "dashboard"
//! ```

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use reqforge::{app, config};

/// reqforge: screenshot-to-requirements analysis.
///
/// All commands accept a `--config` flag pointing to a TOML configuration
/// file. See `config/reqforge.example.toml` for a full example.
#[derive(Parser)]
#[command(
    name = "reqforge",
    about = "Turn UI screenshots into structured requirements documentation",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/reqforge.toml")]
    config: PathBuf,

    /// Log at debug level unless REQFORGE_LOG is set.
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize the database schema.
    ///
    /// Idempotent; running it multiple times is safe.
    Init,

    /// Manage projects.
    Project {
        #[command(subcommand)]
        action: ProjectAction,
    },

    /// Analyze a screenshot and append the result to a project.
    ///
    /// Prints the validated analysis as JSON. Requires `GEMINI_API_KEY`
    /// (or `GOOGLE_API_KEY`) in the environment.
    Analyze {
        /// Project id.
        #[arg(long)]
        project: String,

        /// Path to the screenshot.
        #[arg(long)]
        image: PathBuf,

        /// Short description of the screen; used to find related prior screens.
        #[arg(long)]
        description: Option<String>,

        /// Image MIME type. Inferred from the file extension when omitted.
        #[arg(long)]
        mime: Option<String>,
    },

    /// Show the prior-screen context retrieved for a project.
    Context {
        /// Project id.
        project: String,

        /// Query text; defaults to the configured placeholder query.
        #[arg(long)]
        query: Option<String>,
    },
}

#[derive(Subcommand)]
enum ProjectAction {
    /// Create an empty project and print its id.
    Create {
        #[arg(long)]
        name: String,

        #[arg(long, default_value = "")]
        description: String,
    },
    /// List all projects.
    List,
    /// Print one project with its screens.
    Show { id: String },
}

fn init_tracing(verbose: bool) {
    let fallback = if verbose { "debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_env("REQFORGE_LOG").unwrap_or_else(|_| EnvFilter::new(fallback));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let cfg = config::load_config(&cli.config)?;

    match cli.command {
        Commands::Init => {
            app::run_init(&cfg).await?;
        }
        Commands::Project { action } => match action {
            ProjectAction::Create { name, description } => {
                app::create_project(&cfg, &name, &description).await?;
            }
            ProjectAction::List => {
                app::list_projects(&cfg).await?;
            }
            ProjectAction::Show { id } => {
                app::show_project(&cfg, &id).await?;
            }
        },
        Commands::Analyze {
            project,
            image,
            description,
            mime,
        } => {
            app::analyze(&cfg, &project, &image, description, mime).await?;
        }
        Commands::Context { project, query } => {
            app::show_context(&cfg, &project, query.as_deref()).await?;
        }
    }

    Ok(())
}
