use std::net::SocketAddr;

use crate::message::DEFAULT_WELCOME;

pub const DEFAULT_PORT: u16 = 12345;
pub const DEFAULT_OPERATOR_NICKNAME: &str = "Server";
pub const DEFAULT_CLIENT_NICKNAME: &str = "Client";

/// Settings for one hub process. Built with [`ServerConfig::builder`];
/// `build` clamps the limits to at least one and fills blank names in.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub addr: String,
    pub port: u16,
    pub max_clients: usize,
    pub max_nickname_len: usize,
    pub nickname: String,
    pub welcome: String,
}

pub struct ServerConfigBuilder {
    addr: String,
    port: u16,
    max_clients: usize,
    max_nickname_len: usize,
    nickname: Option<String>,
    welcome: Option<String>,
}

impl ServerConfig {
    pub fn builder() -> ServerConfigBuilder {
        ServerConfigBuilder {
            addr: "0.0.0.0".to_string(),
            port: DEFAULT_PORT,
            max_clients: 32,
            max_nickname_len: 32,
            nickname: None,
            welcome: None,
        }
    }

    pub fn bind_addr(&self) -> String {
        if self.addr.contains(':') {
            format!("[{}]:{}", self.addr, self.port)
        } else {
            format!("{}:{}", self.addr, self.port)
        }
    }
}

impl ServerConfigBuilder {
    pub fn addr(mut self, addr: impl Into<String>) -> Self {
        self.addr = addr.into();
        self
    }

    pub fn port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn max_clients(mut self, max: usize) -> Self {
        self.max_clients = max;
        self
    }

    pub fn max_nickname_len(mut self, max: usize) -> Self {
        self.max_nickname_len = max;
        self
    }

    /// The operator's own nickname. Blank falls back to the default.
    pub fn nickname(mut self, nickname: impl Into<String>) -> Self {
        self.nickname = Some(nickname.into());
        self
    }

    /// Message sent to each peer on admission. Blank falls back to the
    /// default.
    pub fn welcome(mut self, welcome: impl Into<String>) -> Self {
        self.welcome = Some(welcome.into());
        self
    }

    pub fn build(self) -> ServerConfig {
        ServerConfig {
            addr: self.addr,
            port: self.port,
            max_clients: self.max_clients.max(1),
            max_nickname_len: self.max_nickname_len.max(1),
            nickname: non_blank_or(self.nickname, DEFAULT_OPERATOR_NICKNAME),
            welcome: non_blank_or(self.welcome, DEFAULT_WELCOME),
        }
    }
}

/// Participant configuration.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub server: SocketAddr,
    pub nickname: String,
}

impl ClientConfig {
    pub fn new(server: SocketAddr, nickname: impl Into<String>) -> Self {
        Self {
            server,
            nickname: non_blank_or(Some(nickname.into()), DEFAULT_CLIENT_NICKNAME),
        }
    }
}

/// Default substitution applied to every user-entered name or message.
pub fn non_blank_or(value: Option<String>, default: &str) -> String {
    match value {
        Some(value) if !value.trim().is_empty() => value.trim().to_string(),
        _ => default.to_string(),
    }
}
