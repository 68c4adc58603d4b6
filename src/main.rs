use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::sync::Arc;

use eyre::{Result, WrapErr, bail};
use log::{debug, info};

mod cli;

use cli::{Cli, Command};
use tldv::client::{BackendClient, RequestState, Session};
use tldv::config::{self, Config};
use tldv::history::HistoryStore;
use tldv::metadata::YoutubeMetadata;
use tldv::server::{self, Pipeline};
use tldv::summarize::{LlmSummarizer, Provider};
use tldv::youtube::{self, CaptionClient};

fn setup_logging(to_stderr: bool) -> Result<()> {
    if to_stderr {
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
        return Ok(());
    }

    let log_dir = log_dir();
    std::fs::create_dir_all(&log_dir)?;
    let log_file = log_dir.join("tldv.log");

    let target = Box::new(std::fs::OpenOptions::new().create(true).append(true).open(&log_file)?);

    env_logger::Builder::from_default_env()
        .target(env_logger::Target::Pipe(target))
        .init();

    info!("Logging initialized: {}", log_file.display());
    Ok(())
}

fn log_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("tldv")
        .join("logs")
}

fn key_line(var: &str, purpose: &str) -> String {
    match config::api_key(var) {
        Some(_) => format!("  \x1b[32m✅\x1b[0m {var:<18} set"),
        None => format!("  \x1b[31m❌\x1b[0m {var:<18} (not set — {purpose})"),
    }
}

fn build_after_help() -> String {
    format!(
        "\nAPI KEYS:\n{}\n{}\n{}\n\nConfig: {}\nHistory: {}\nLogs (client commands): {}",
        key_line("OPENAI_API_KEY", "needed by serve for OpenAI models"),
        key_line("ANTHROPIC_API_KEY", "needed by serve for Claude models"),
        key_line("YOUTUBE_API_KEY", "optional, enables video duration"),
        config::config_path().display(),
        tldv::history::history_path().display(),
        log_dir().join("tldv.log").display(),
    )
}

async fn serve(config: &Config, port: Option<u16>, host: Option<String>, model: Option<String>) -> Result<()> {
    let model = model.unwrap_or_else(|| config.model().to_string());
    let provider = Provider::for_model(&model);
    let Some(api_key) = config::api_key(provider.api_key_var()) else {
        bail!("{} environment variable not set (required for {model})", provider.api_key_var());
    };

    let host: IpAddr = host
        .as_deref()
        .unwrap_or(config.host())
        .parse()
        .wrap_err("invalid listen address")?;
    let addr = SocketAddr::new(host, port.unwrap_or_else(|| config.port()));

    let client = reqwest::Client::new();
    let youtube_key = config::api_key("YOUTUBE_API_KEY");
    if youtube_key.is_none() {
        info!("YOUTUBE_API_KEY not set; video duration will be omitted");
    }
    debug!("Model {model}, caption language {}", config.caption_lang());

    let pipeline = Pipeline {
        sources: youtube::default_sources(CaptionClient::new(client.clone()), config.caption_lang()),
        metadata: Arc::new(YoutubeMetadata::new(client.clone(), youtube_key)),
        summarizer: Arc::new(
            LlmSummarizer::new(client, &model, &api_key)
                .with_temperature(config.temperature())
                .with_max_chars(config.max_transcript_chars()),
        ),
    };

    server::serve(pipeline, addr).await
}

async fn summarize(
    config: &Config,
    url: &str,
    output: Option<PathBuf>,
    server_url: Option<String>,
    no_history: bool,
    verbose: bool,
) -> Result<()> {
    let server_url = server_url.unwrap_or_else(|| config.server_url());
    let backend = BackendClient::new(reqwest::Client::new(), &server_url);
    let store = HistoryStore::default();
    let mut session = Session::with_history(store.load());

    if verbose {
        eprintln!("Backend: {server_url}");
        session.set_preview(backend.preview(url).await);
        if let Some(video) = session.video() {
            eprintln!("{}\n", tldv::output::render_preview(video));
        }
        eprintln!("Working on your summary...");
    }

    match session.submit(&backend, url).await {
        RequestState::Success(result) => {
            println!("{}", tldv::output::render_summary(&result.summary, result.video.as_ref()));
            if let Some(path) = &output {
                tldv::output::export_summary(path, &result.summary)?;
                if verbose {
                    eprintln!("Summary written to: {}", path.display());
                }
            }
        }
        RequestState::Failed(message) => bail!("{message}"),
        state => bail!("request did not complete: {state:?}"),
    }

    if !no_history {
        store.save(session.history())?;
        debug!("History saved to {}", store.path().display());
    }
    Ok(())
}

async fn preview(config: &Config, url: &str, server_url: Option<String>) -> Result<()> {
    let server_url = server_url.unwrap_or_else(|| config.server_url());
    let backend = BackendClient::new(reqwest::Client::new(), &server_url);
    match backend.preview(url).await {
        Some(video) => {
            println!("{}", tldv::output::render_preview(&video));
            Ok(())
        }
        None => bail!("Unable to fetch metadata."),
    }
}

fn history(clear: bool) -> Result<()> {
    let store = HistoryStore::default();
    let mut history = store.load();
    if clear {
        history.clear();
        store.save(&history)?;
        println!("History cleared.");
    } else if history.is_empty() {
        println!("No summaries yet.");
    } else {
        println!("{}", tldv::output::render_history(&history));
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let after_help = build_after_help();
    let cmd = <Cli as clap::CommandFactory>::command().after_help(after_help);
    let matches = cmd.get_matches();
    let cli = <Cli as clap::FromArgMatches>::from_arg_matches(&matches)?;

    setup_logging(matches!(cli.command, Command::Serve { .. }))?;

    // Load config file (non-fatal if missing/invalid)
    let config = Config::load().unwrap_or_default();

    if cli.verbose {
        let config_path = config::config_path();
        if config_path.exists() {
            eprintln!("Config: {}", config_path.display());
        }
    }

    match cli.command {
        Command::Serve { port, host, model } => serve(&config, port, host, model).await,
        Command::Summarize {
            url,
            output,
            server,
            no_history,
        } => summarize(&config, &url, output, server, no_history, cli.verbose).await,
        Command::Preview { url, server } => preview(&config, &url, server).await,
        Command::History { clear } => history(clear),
    }
}
