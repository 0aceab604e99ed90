// cmdsage - ask for a terminal command in plain language
// Main entry point

use anyhow::{Context, Result};
use clap::Parser;
use std::io::{self, IsTerminal, Read};

use cmdsage::cli::{ask_once, render_answer, Session};
use cmdsage::config::{ConfigStore, SetupFlow};
use cmdsage::errors::render_error;
use cmdsage::providers::{create_from_app_config, EnvOverrides};
use tracing_subscriber::prelude::*;

#[derive(Parser, Debug)]
#[command(name = "cmdsage")]
#[command(about = "Ask for a terminal command in plain language", version)]
struct Args {
    #[command(subcommand)]
    command: Option<Command>,

    /// Provider to use for this run (a name from the config file)
    #[arg(short = 'p', long = "provider")]
    provider: Option<String>,

    /// Model override
    #[arg(short = 'm', long = "model")]
    model: Option<String>,

    /// Local daemon host override (local provider only)
    #[arg(long = "host")]
    host: Option<String>,

    /// The question; omit it to start an interactive session
    #[arg(trailing_var_arg = true)]
    question: Vec<String>,
}

#[derive(clap::Subcommand, Debug)]
enum Command {
    /// Interactive configuration
    Setup,
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();

    let args = Args::parse();

    if let Some(Command::Setup) = args.command {
        return run_setup();
    }

    let store = ConfigStore::new()?;
    let mut app_config = store.load();

    // Overlay order: CLI flag > environment > persisted config. The flag
    // overwrites the captured environment field, so one overlay pass in
    // the factory covers both.
    let mut env = EnvOverrides::capture();
    if let Some(model) = args.model {
        env.model = Some(model);
    }
    if let Some(host) = args.host {
        env.host = Some(host);
    }
    if let Some(provider) = args.provider.or_else(|| env.provider.clone()) {
        // Ephemeral selection: not persisted unless the session switches
        app_config.current_provider = provider;
    }

    let client = match create_from_app_config(&app_config, &env) {
        Ok(client) => client,
        Err(e) => {
            let kind = app_config
                .current()
                .map(|entry| entry.kind())
                .unwrap_or(cmdsage::providers::ProviderKind::Local);
            eprintln!("{}", render_error(&e, kind));
            std::process::exit(1);
        }
    };

    // One-shot question from the argument list
    if !args.question.is_empty() {
        let question = args.question.join(" ");
        return run_one_shot(client.as_ref(), &question).await;
    }

    // Piped input is a one-shot question too
    if !io::stdin().is_terminal() {
        let mut input = String::new();
        io::stdin().read_to_string(&mut input)?;
        let input = input.trim();
        if input.is_empty() {
            return Ok(());
        }
        return run_one_shot(client.as_ref(), input).await;
    }

    Session::new(client, app_config, store, env).run().await
}

async fn run_one_shot(
    client: &dyn cmdsage::providers::ProviderClient,
    question: &str,
) -> Result<()> {
    match ask_once(client, question).await {
        Ok(reply) => {
            println!("{}", render_answer(&reply));
            Ok(())
        }
        Err(e) => {
            eprintln!("{}", render_error(&e, client.provider_kind()));
            std::process::exit(1);
        }
    }
}

fn run_setup() -> Result<()> {
    let store = ConfigStore::new()?;
    let existing = store.load();

    let stdin = io::stdin();
    let stdout = io::stdout();
    let mut flow = SetupFlow::new(stdin.lock(), stdout.lock());
    let config = flow.run(&existing).context("setup flow failed")?;

    store.save(&config)?;
    println!("\nConfiguration saved to {}.", store.path().display());
    Ok(())
}

/// Logging to stderr so answers on stdout stay clean. Default level is
/// warn; RUST_LOG overrides.
fn init_tracing() {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(io::stderr)
                .without_time(),
        )
        .init();

    // Bridge log crate → tracing (for dependencies using log crate)
    let _ = tracing_log::LogTracer::init();
}
