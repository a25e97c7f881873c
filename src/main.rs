use clap::{Parser, Subcommand};
use tracing::warn;
use tracing_subscriber::EnvFilter;

use snips::config::{Config, ConfigArgs, DEFAULT_HMAC_KEY, usage_table};
use snips::{app, id};

#[derive(Parser)]
#[command(name = "snips")]
#[command(version, about = "A passwordless, anonymous SSH-powered pastebin", long_about = None)]
struct Cli {
    #[command(flatten)]
    config: ConfigArgs,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the SSH and HTTP servers (default)
    Serve,

    /// Print every configuration variable with its default
    Usage,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    if let Some(Commands::Usage) = cli.command {
        print!("{}", usage_table());
        return Ok(());
    }

    let directive = if cli.config.debug {
        "snips=debug"
    } else {
        "snips=info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(directive.parse()?))
        .init();

    id::init()?;

    let config = Config::try_from(cli.config)?;
    if config.hmac_key == DEFAULT_HMAC_KEY {
        warn!("using the default hmac key, set SNIPS_HMACKEY before exposing signed urls");
    }

    app::run(config).await?;
    Ok(())
}
