use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use aria_gateway::db::AnalyticsRepo;
use aria_gateway::tts::Priority;
use aria_gateway::{App, Config};

/// Aria - WhatsApp safety assistant gateway
#[derive(Parser)]
#[command(name = "aria", version, about)]
struct Cli {
    /// Port to listen on
    #[arg(long, env = "ARIA_PORT")]
    port: Option<u16>,

    /// Path to a TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Synthesize a phrase through the configured engine chain
    TestTts {
        /// Text to speak
        #[arg(default_value = "Hello! This is a test of the Aria voice system.")]
        text: String,
    },
    /// Print delivery analytics for the last week
    Analytics,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => "info,aria_gateway=info",
        1 => "info,aria_gateway=debug",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .init();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("fatal: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let mut config = Config::load(cli.config.as_ref())?;
    if let Some(port) = cli.port {
        config.port = port;
    }

    if let Some(cmd) = cli.command {
        return match cmd {
            Command::TestTts { text } => test_tts(config, &text).await,
            Command::Analytics => show_analytics(&config),
        };
    }

    tracing::info!(port = config.port, "starting aria gateway");

    let app = App::build(config).await?;
    app.run().await?;

    Ok(())
}

async fn test_tts(config: Config, text: &str) -> anyhow::Result<()> {
    use aria_gateway::tts::{SpeechCache, SpeechGateway};

    let pool = aria_gateway::db::init(config.db_path())?;
    let gateway = SpeechGateway::new(
        aria_gateway::app::speech_engines(&config),
        SpeechCache::new(config.audio_dir.clone()),
        AnalyticsRepo::new(pool),
    );

    let prefs = aria_gateway::db::MessagingPrefs::default();
    match gateway.synthesize(text, &prefs, Priority::Normal).await {
        Some(handle) => {
            let path = config.audio_dir.join(&handle.filename);
            println!("synthesized: {}", path.display());
            Ok(())
        }
        None => anyhow::bail!("synthesis failed; check engine configuration"),
    }
}

fn show_analytics(config: &Config) -> anyhow::Result<()> {
    let pool = aria_gateway::db::init(config.db_path())?;
    let summary = AnalyticsRepo::new(pool).summary(7)?;
    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}
