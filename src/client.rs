use std::sync::Arc;

use crossterm::style::Stylize;
use tokio::net::TcpStream;
use tokio::select;
use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::channel::{MAX_MESSAGE_LEN, MessageReader, MessageWriter};
use crate::cli::prompt_async;
use crate::config::{ClientConfig, DEFAULT_CLIENT_NICKNAME, non_blank_or};
use crate::error::ChatError;
use crate::message::{SERVER_FULL_NOTICE, is_rejection};
use crate::terminal::{Console, Edit, LineEditor, RawMode, Terminal, spawn_key_reader};

/// The hub's answer to a nickname request.
#[derive(Debug, PartialEq, Eq)]
pub enum Reply {
    Welcome(String),
    Rejected(String),
    Full,
    Closed,
}

/// Send one nickname candidate and classify the answer.
pub async fn request_nickname(
    reader: &mut MessageReader,
    writer: &mut MessageWriter,
    nickname: &str,
) -> Result<Reply, ChatError> {
    writer.send(nickname).await?;
    let reply = match reader.read_message().await? {
        None => Reply::Closed,
        Some(text) if text.starts_with(SERVER_FULL_NOTICE) => Reply::Full,
        Some(text) if is_rejection(&text) => Reply::Rejected(text),
        Some(text) => Reply::Welcome(text),
    };
    Ok(reply)
}

/// Connected and admitted: both halves of the socket, ready to chat.
pub struct Session {
    pub nickname: String,
    pub welcome: String,
    reader: MessageReader,
    writer: MessageWriter,
}

/// Connect and negotiate, prompting for a new nickname after each
/// rejection. `Ok(None)` when the hub is full or hangs up first.
pub async fn connect(config: &ClientConfig) -> Result<Option<Session>, ChatError> {
    let stream = TcpStream::connect(config.server).await?;
    info!(server = %config.server, "connected");
    println!("Connected to server.");

    let (read_half, write_half) = stream.into_split();
    let mut reader = MessageReader::new(read_half);
    let mut writer = MessageWriter::new(write_half);
    let mut nickname = config.nickname.clone();

    loop {
        match request_nickname(&mut reader, &mut writer, &nickname).await? {
            Reply::Welcome(welcome) => {
                return Ok(Some(Session {
                    nickname,
                    welcome,
                    reader,
                    writer,
                }));
            }
            Reply::Rejected(notice) => {
                let answer = prompt_async(notice).await?;
                nickname = non_blank_or(Some(answer), DEFAULT_CLIENT_NICKNAME);
            }
            Reply::Full => {
                println!("{}", SERVER_FULL_NOTICE.red());
                return Ok(None);
            }
            Reply::Closed => {
                println!("{}", "Server disconnected.".red());
                return Ok(None);
            }
        }
    }
}

/// Participant chat loop: incoming messages go to the console, submitted
/// lines are sent as-is and the hub adds the nickname.
pub async fn chat(
    session: Session,
    console: Arc<dyn Console>,
    edits: &mut mpsc::UnboundedReceiver<Edit>,
) -> Result<(), ChatError> {
    let Session {
        mut reader,
        mut writer,
        ..
    } = session;

    let mut incoming = {
        let console = Arc::clone(&console);
        tokio::spawn(async move {
            loop {
                match reader.read_message().await {
                    Ok(Some(message)) => console.message(&message),
                    Ok(None) => break,
                    Err(error) => {
                        debug!(?error, "read from hub failed");
                        break;
                    }
                }
            }
        })
    };

    let mut hub_closed = false;
    loop {
        select! {
            _ = &mut incoming => {
                hub_closed = true;
                console.alert("Server disconnected.");
                break;
            }
            edit = edits.recv() => {
                match edit {
                    Some(Edit::Submit(line)) => {
                        if let Err(error) = writer.send(&line).await {
                            debug!(?error, "send to hub failed");
                            console.alert("Server disconnected.");
                            break;
                        }
                    }
                    Some(Edit::Continue) => {}
                    Some(Edit::Quit) | None => break,
                }
            }
        }
    }

    if !hub_closed {
        incoming.abort();
        let _ = incoming.await;
    }
    // Best effort; the hub treats a reset like a clean close.
    let _ = writer.shutdown().await;
    Ok(())
}

/// Entry point for `hub-chat join`.
pub async fn run(config: ClientConfig) -> Result<(), ChatError> {
    let Some(session) = connect(&config).await? else {
        return Ok(());
    };
    println!("{}", session.welcome.as_str().yellow());

    let max_len = MAX_MESSAGE_LEN.saturating_sub(session.nickname.len() + 4);
    let raw = RawMode::enable()?;
    let mut terminal = Terminal::spawn(LineEditor::new(std::io::stdout(), "You: ", max_len))?;
    spawn_key_reader(terminal.console());

    let console: Arc<dyn Console> = Arc::new(terminal.console());
    let outcome = chat(session, console, terminal.edits()).await;

    terminal.finish().await;
    drop(raw);
    outcome
}
