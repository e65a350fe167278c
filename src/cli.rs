use std::io::{self, BufRead, Write};
use std::net::{IpAddr, SocketAddr};

use clap::{Args, Parser, Subcommand};

use crate::config::DEFAULT_PORT;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Log at debug level (RUST_LOG overrides).
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the hub: accept peers and relay their messages.
    Hub(HubArgs),
    /// Connect to a hub and chat.
    Join(JoinArgs),
}

#[derive(Args, Debug, Clone)]
pub struct HubArgs {
    /// Address to listen on.
    #[arg(long, default_value = "0.0.0.0")]
    pub listen: IpAddr,

    /// Port to listen on.
    #[arg(long, default_value_t = DEFAULT_PORT)]
    pub port: u16,

    /// Operator nickname. Prompted for when omitted.
    #[arg(long)]
    pub nickname: Option<String>,

    /// Welcome message for newly admitted peers. Prompted for when omitted.
    #[arg(long)]
    pub welcome: Option<String>,

    /// Maximum number of admitted peers.
    #[arg(long, default_value_t = 32)]
    pub max_clients: usize,
}

#[derive(Args, Debug, Clone)]
pub struct JoinArgs {
    /// Hub IP address. Prompted for when omitted.
    #[arg(long)]
    pub server: Option<IpAddr>,

    /// Hub port.
    #[arg(long, default_value_t = DEFAULT_PORT)]
    pub port: u16,

    /// Nickname to request. Prompted for when omitted.
    #[arg(long)]
    pub nickname: Option<String>,
}

impl JoinArgs {
    pub fn socket_addr(&self, ip: IpAddr) -> SocketAddr {
        SocketAddr::new(ip, self.port)
    }
}

/// Ask a question on stdout and read one line from stdin, without the
/// line ending. Only used before the terminal enters raw mode.
pub fn prompt(question: &str) -> io::Result<String> {
    let mut stdout = io::stdout();
    write!(stdout, "{question}")?;
    stdout.flush()?;

    let mut answer = String::new();
    io::stdin().lock().read_line(&mut answer)?;
    Ok(answer.trim_end_matches(['\r', '\n']).to_string())
}

/// [`prompt`] on the blocking pool, for use inside the runtime.
pub async fn prompt_async(question: String) -> io::Result<String> {
    tokio::task::spawn_blocking(move || prompt(&question))
        .await
        .map_err(io::Error::other)?
}
