use std::fmt;

/// Sent in reply to a nickname that is taken, empty or too long.
pub const REJECTION_NOTICE: &str = "Nickname already taken. Please choose another: ";

/// Sent to a connection accepted while the registry is full.
pub const SERVER_FULL_NOTICE: &str = "Server is full. Try again later.";

pub const DEFAULT_WELCOME: &str = "Welcome to the server!";

/// A chat message with a nickname and body.
///
/// Wire format: `[nickname]: body`, written as a single message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatLine {
    pub nickname: String,
    pub body: String,
}

impl ChatLine {
    pub fn new(nickname: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            nickname: nickname.into(),
            body: body.into(),
        }
    }
}

impl fmt::Display for ChatLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}]: {}", self.nickname, self.body)
    }
}

impl From<ChatLine> for String {
    fn from(line: ChatLine) -> Self {
        line.to_string()
    }
}

/// Plain-text notices generated by the hub. They carry no tag on the
/// wire; peers tell them apart from chat lines by content alone.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    Joined(String),
    Left(String),
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Notice::Joined(nickname) => write!(f, "{nickname} has joined the chat."),
            Notice::Left(nickname) => write!(f, "{nickname} has left the chat."),
        }
    }
}

/// Strip the line ending a terminal or netcat-style peer may append.
pub fn strip_line_ending(text: &str) -> &str {
    text.trim_end_matches(['\r', '\n'])
}

/// True when a reply to a nickname candidate means "try again".
pub fn is_rejection(reply: &str) -> bool {
    reply.starts_with(REJECTION_NOTICE.trim_end())
}
