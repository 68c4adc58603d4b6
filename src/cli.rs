use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "tldv",
    about = "YouTube video summarizer",
    version = env!("GIT_DESCRIBE"),
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Show extra detail on stderr
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Command {
    /// Run the HTTP backend
    Serve {
        /// Port to listen on (defaults to $PORT, then config, then 4000)
        #[arg(short, long)]
        port: Option<u16>,

        /// Address to bind
        #[arg(long)]
        host: Option<String>,

        /// LLM model for summarization
        #[arg(long)]
        model: Option<String>,
    },

    /// Summarize a video through a running backend
    Summarize {
        /// YouTube video URL
        url: String,

        /// Also write the summary text to this file (.txt or .md)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Backend URL (defaults to $TLDV_SERVER, then config, then http://localhost:4000)
        #[arg(long)]
        server: Option<String>,

        /// Don't record the summary in local history
        #[arg(long)]
        no_history: bool,
    },

    /// Show video metadata only
    Preview {
        /// YouTube video URL
        url: String,

        /// Backend URL
        #[arg(long)]
        server: Option<String>,
    },

    /// List recent summaries
    History {
        /// Remove all stored summaries
        #[arg(long)]
        clear: bool,
    },
}
