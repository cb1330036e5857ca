// Defensive programming lints - prevent panics and unsafe patterns
#![deny(clippy::indexing_slicing)]
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![warn(clippy::fallible_impl_from)]
#![warn(clippy::wildcard_enum_match_arm)]
#![warn(clippy::fn_params_excessive_bools)]
// Idiomatic Rust lints
#![warn(clippy::needless_return)]
#![warn(clippy::let_and_return)]
#![warn(clippy::must_use_candidate)]
#![warn(clippy::redundant_closure_for_method_calls)]
#![warn(clippy::map_unwrap_or)]
#![warn(clippy::explicit_iter_loop)]

mod app;
mod backends;
mod catalog;
mod config;
mod error;
mod server;
mod services;
mod storage;

use app::Session;
use app::chat::commands::CommandOutcome;
use app::chat::intent::IntentClassifier;
use backends::Dispatcher;
use color_eyre::Result;
use color_eyre::eyre::eyre;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    // Setup error handling
    color_eyre::install()?;

    // Load config
    let config = config::Config::load()?;

    let args: Vec<String> = std::env::args().collect();
    if args.len() > 1 {
        return handle_cli_args(&args, config).await;
    }

    init_tracing("warn");
    run_repl(config).await
}

/// Installs the log subscriber; `RUST_LOG` overrides the default level
fn init_tracing(default_level: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

async fn handle_cli_args(args: &[String], config: config::Config) -> Result<()> {
    let cmd = args
        .get(1)
        .ok_or_else(|| eyre!("No command provided"))?;
    let program_name = args.first().map_or("alphadeal", String::as_str);

    match cmd.as_str() {
        "--help" | "-h" | "help" => print_help(program_name),
        "--version" | "-v" => println!("AlphaDeal router v{}", env!("CARGO_PKG_VERSION")),
        "serve" => {
            init_tracing("info");
            let port = match args.get(2) {
                Some(port) => port
                    .parse::<u16>()
                    .map_err(|error| eyre!("Invalid port '{port}': {error}"))?,
                None => config.server.port,
            };
            let state = server::ServerState::new(
                Dispatcher::new(&config)?,
                &config.persona,
                config.default_provider,
            );
            server::serve(state, port).await?;
        }
        "route" => {
            let text = args.get(2..).unwrap_or_default().join(" ");
            if text.trim().is_empty() {
                return Err(eyre!("Usage: {program_name} route <text>"));
            }
            print_route(&text, &config);
        }
        cmd_str => {
            eprintln!("Unknown command: {}", cmd_str);
            eprintln!("Run with --help for available commands.");
            std::process::exit(1);
        }
    }
    Ok(())
}

fn print_help(program_name: &str) {
    println!("AlphaDeal - intent-routed investment banking assistant");
    println!();
    println!("Usage: {} [command]", program_name);
    println!();
    println!("Commands:");
    println!("  serve [port]  - Run the HTTP endpoint (default port from config)");
    println!("  route <text>  - Show which context a request would be routed to");
    println!("  --help        - Show this help");
    println!("  --version     - Show version");
    println!();
    println!("Run without arguments to start interactive mode.");
    println!("Credentials: API_KEY (Gemini), DEEPSEEK_API_KEY (DeepSeek).");
}

fn print_route(text: &str, config: &config::Config) {
    let classifier = IntentClassifier::new(config.routing.keyword_weight);
    let target = classifier.classify(text);
    let name = target.display_name().unwrap_or("dashboard");
    println!("{target} ({name})");
    for (context, score) in classifier.scores(text) {
        println!("  {:<10} {}", context.as_str(), score);
    }
    for capability in classifier.matched_capabilities(text) {
        println!("  matched {} ({})", capability.id, capability.name);
    }
}

async fn run_repl(config: config::Config) -> Result<()> {
    let dispatcher = Dispatcher::new(&config)?;
    let mut session = Session::new(&config);
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();

    println!("AlphaDeal ({}). Type /help for commands.", session.provider());
    loop {
        stdout.write_all(b"> ").await?;
        stdout.flush().await?;
        let Some(line) = lines.next_line().await? else {
            break;
        };

        let input = match session.handle_command(&line) {
            CommandOutcome::Quit => break,
            CommandOutcome::Reply(text) => {
                println!("{text}");
                continue;
            }
            CommandOutcome::Chat(input) => input,
        };
        if input.is_empty() {
            continue;
        }

        let was_unrouted = session.is_unrouted();
        match session.submit(&dispatcher, &input).await {
            Ok(reply) => {
                if was_unrouted {
                    let name = session.current_context().display_name().unwrap_or_default();
                    println!("[routed to {name}]");
                }
                println!("{}", reply.text);
                if let Some(chart) = reply.chart_payload() {
                    println!("{}", chart.describe());
                }
            }
            Err(error) => eprintln!("{error}"),
        }
    }
    Ok(())
}
