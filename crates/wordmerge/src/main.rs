//! wordmerge CLI - Main entry point

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;

#[derive(Parser)]
#[command(name = "wordmerge")]
#[command(version = wordmerge_template::ENGINE_VERSION)]
#[command(about = "Merge data into office document templates", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Render the merge fields of a document part
    Render {
        /// Document part to render (e.g. an extracted word/document.xml)
        input: PathBuf,

        /// JSON file with the render context (an object)
        #[arg(short = 'c', long)]
        context: Option<PathBuf>,

        /// Write output to FILE (stdout when omitted)
        #[arg(short = 'o', long)]
        output: Option<PathBuf>,

        /// TOML file with render options
        #[arg(long)]
        config: Option<PathBuf>,

        /// Directory for the field cache (overrides the config file)
        #[arg(long)]
        cache_dir: Option<PathBuf>,

        /// First page number of the document (overrides the config file)
        #[arg(long)]
        start_page_number: Option<u32>,

        /// Treat the input as a header or footer part
        #[arg(long)]
        header_footer: bool,
    },

    /// List the merge fields of a document part
    Fields {
        /// Document part to inspect
        input: PathBuf,

        /// Print the fields as JSON
        #[arg(long)]
        json: bool,

        /// Directory for the field cache
        #[arg(long)]
        cache_dir: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "wordmerge=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Render {
            input,
            context,
            output,
            config,
            cache_dir,
            start_page_number,
            header_footer,
        } => commands::render::execute(commands::render::RenderArgs {
            input,
            context,
            output,
            config,
            cache_dir,
            start_page_number,
            header_footer,
        }),
        Commands::Fields {
            input,
            json,
            cache_dir,
        } => commands::fields::execute(commands::fields::FieldsArgs {
            input,
            json,
            cache_dir,
        }),
    }
}
