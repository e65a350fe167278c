use std::net::IpAddr;
use std::sync::Arc;

use clap::Parser;
use crossterm::style::Stylize;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tracing::{info, warn};

use hub_chat::channel::MAX_MESSAGE_LEN;
use hub_chat::cli::{Cli, Command, HubArgs, JoinArgs, prompt_async};
use hub_chat::client;
use hub_chat::config::{ClientConfig, ServerConfig};
use hub_chat::error::ChatError;
use hub_chat::logger::setup_logger;
use hub_chat::operator::run_operator;
use hub_chat::server::{Hub, Server};
use hub_chat::terminal::{Console, LineEditor, RawMode, Terminal, spawn_key_reader};

#[tokio::main]
async fn main() -> Result<(), ChatError> {
    let cli = Cli::parse();
    setup_logger(if cli.verbose { "debug" } else { "warn" });

    match cli.command {
        Command::Hub(args) => run_hub(args).await,
        Command::Join(args) => run_join(args).await,
    }
}

async fn run_hub(args: HubArgs) -> Result<(), ChatError> {
    println!("{}", "Collaborate, Think Free. No Bloat. Just Talk >_".yellow());

    let nickname = match args.nickname {
        Some(nickname) => nickname,
        None => prompt_async("Enter your nickname (default is 'Server'): ".into()).await?,
    };
    let welcome = match args.welcome {
        Some(welcome) => welcome,
        None => prompt_async("Enter a welcome message for clients (optional): ".into()).await?,
    };

    let config = ServerConfig::builder()
        .addr(args.listen.to_string())
        .port(args.port)
        .max_clients(args.max_clients)
        .nickname(nickname)
        .welcome(welcome)
        .build();

    let listener = TcpListener::bind(config.bind_addr()).await?;
    let addr = listener.local_addr()?;
    info!(%addr, "hub listening");
    println!("{}", format!("Server listening on port {}...", addr.port()).green());

    let max_len = MAX_MESSAGE_LEN.saturating_sub(config.nickname.len() + 4);
    let raw = RawMode::enable()?;
    let mut terminal = Terminal::spawn(LineEditor::new(std::io::stdout(), "You: ", max_len))?;
    let console = terminal.console();
    spawn_key_reader(console.clone());

    let hub = Arc::new(Hub::new(config, Arc::new(console.clone())));
    let server = Server::new(listener, Arc::clone(&hub));
    let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
    let server_task = tokio::spawn(server.run_until(async move {
        let _ = shutdown_rx.await;
    }));

    let outcome = run_operator(&hub, &console, terminal.edits()).await;
    console.alert("Server shutting down.");

    let _ = shutdown_tx.send(());
    let served = match server_task.await {
        Ok(result) => result,
        Err(error) => {
            warn!(?error, "accept loop ended abnormally");
            Ok(())
        }
    };

    terminal.finish().await;
    drop(raw);
    served?;
    outcome
}

async fn run_join(args: JoinArgs) -> Result<(), ChatError> {
    let ip = match args.server {
        Some(ip) => ip,
        None => {
            let answer = prompt_async("Enter server IP address: ".into()).await?;
            answer
                .trim()
                .parse::<IpAddr>()
                .map_err(|error| ChatError::Parse(format!("invalid address '{answer}': {error}")))?
        }
    };
    let nickname = match args.nickname.clone() {
        Some(nickname) => nickname,
        None => prompt_async("Enter your nickname (default is 'Client'): ".into()).await?,
    };

    client::run(ClientConfig::new(args.socket_addr(ip), nickname)).await
}
