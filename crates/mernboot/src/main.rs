mod commands;
mod menu;
mod progress;
mod prompt;

use clap::{Parser, Subcommand};
use commands::atlas::{AtlasContext, SetupOptions};
use prompt::Prompter;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "mernboot")]
#[command(about = "Provision a MongoDB Atlas backend for your MERN project", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage the MongoDB Atlas backend
    #[command(subcommand)]
    Atlas(AtlasCommands),
    /// Show version information
    Version,
}

#[derive(Subcommand)]
enum AtlasCommands {
    /// Create project, cluster, database user and network access
    Setup {
        /// Atlas project name
        #[arg(long)]
        project_name: Option<String>,
        /// Cluster name (default: myCluster)
        #[arg(long)]
        cluster_name: Option<String>,
        /// Database username
        #[arg(short, long)]
        username: Option<String>,
        /// Continue with the project from the saved configuration
        #[arg(long)]
        resume: bool,
        /// Environment file that receives MONGO_URI
        #[arg(long, env = "MERNBOOT_ENV_FILE")]
        env_file: Option<PathBuf>,
    },
    /// Get the connection string of the saved cluster and write MONGO_URI
    Url {
        /// Environment file that receives MONGO_URI
        #[arg(long, env = "MERNBOOT_ENV_FILE")]
        env_file: Option<PathBuf>,
    },
    /// Show the status of the saved cluster
    Status,
    /// Write a connection string you already have
    UseUrl {
        /// mongodb:// or mongodb+srv:// connection string
        uri: String,
        /// Environment file that receives MONGO_URI
        #[arg(long, env = "MERNBOOT_ENV_FILE")]
        env_file: Option<PathBuf>,
    },
    /// Skip Atlas and point MONGO_URI at a local MongoDB
    Local {
        /// Environment file that receives MONGO_URI
        #[arg(long, env = "MERNBOOT_ENV_FILE")]
        env_file: Option<PathBuf>,
    },
    /// Log out from MongoDB Atlas
    Logout,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Logs go to stderr so they never mix with prompts and the printed URI
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    if matches!(cli.command, Some(Commands::Version)) {
        println!("mernboot {}", env!("CARGO_PKG_VERSION"));
        return Ok(());
    }

    let ctx = AtlasContext::load()?;
    let mut prompt = Prompter::stdin();

    let Some(Commands::Atlas(command)) = cli.command else {
        return menu::run(&ctx, &mut prompt).await;
    };

    match command {
        AtlasCommands::Setup {
            project_name,
            cluster_name,
            username,
            resume,
            env_file,
        } => {
            let options = SetupOptions {
                project_name,
                cluster_name,
                username,
                resume,
                env_file,
            };
            commands::atlas::handle_setup(&ctx, &mut prompt, &options).await?;
        }
        AtlasCommands::Url { env_file } => {
            commands::atlas::handle_url(&ctx, &mut prompt, env_file.as_deref()).await?;
        }
        AtlasCommands::Status => {
            commands::atlas::handle_status(&ctx).await?;
        }
        AtlasCommands::UseUrl { uri, env_file } => {
            commands::atlas::handle_use_url(&ctx, &uri, env_file.as_deref()).await?;
        }
        AtlasCommands::Local { env_file } => {
            commands::atlas::handle_local(&ctx, env_file.as_deref()).await?;
        }
        AtlasCommands::Logout => {
            commands::atlas::handle_logout(&ctx).await?;
        }
    }

    Ok(())
}
