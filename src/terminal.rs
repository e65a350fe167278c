//! The local half of the chat: a raw-mode line editor and the thread that
//! owns the terminal.
//!
//! [`LineEditor`] holds the unsent line and the output. It lives on one
//! dedicated thread, spawned by [`Terminal::spawn`], which applies
//! keystrokes and incoming lines strictly one after the other: a keystroke
//! echo and a "print incoming line, then prompt + unsent text" redraw can
//! never tear each other. Everything else talks to that thread through a
//! [`ConsoleHandle`], which only queues, so no async task ever waits on
//! terminal output.

use std::io::{self, Write};
use std::thread;

use crossterm::cursor::{MoveLeft, MoveToColumn};
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::queue;
use crossterm::style::{Color, Print, PrintStyledContent, Stylize};
use crossterm::terminal::{self, Clear, ClearType};
use tokio::sync::mpsc;
use tracing::{debug, warn};

/// Where the hub shows relayed chat and connection events.
pub trait Console: Send + Sync {
    /// A chat line.
    fn message(&self, line: &str);
    /// A join or informational notice.
    fn notice(&self, line: &str);
    /// A departure or failure.
    fn alert(&self, line: &str);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    Char(char),
    Backspace,
    Enter,
    Quit,
}

#[derive(Debug, PartialEq, Eq)]
pub enum Edit {
    Continue,
    Submit(String),
    Quit,
}

/// The unsent line. The cursor always sits at the end.
#[derive(Debug, Default)]
pub struct InputLine {
    text: String,
    len: usize,
    max_len: usize,
}

impl InputLine {
    pub fn new(max_len: usize) -> Self {
        Self {
            text: String::new(),
            len: 0,
            max_len,
        }
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }

    /// Append at the cursor. Returns false once the ceiling is reached.
    pub fn push(&mut self, c: char) -> bool {
        if self.len >= self.max_len {
            return false;
        }
        self.text.push(c);
        self.len += 1;
        true
    }

    /// Remove the character before the cursor, if any.
    pub fn pop(&mut self) -> bool {
        if self.text.pop().is_some() {
            self.len -= 1;
            true
        } else {
            false
        }
    }

    pub fn take(&mut self) -> String {
        self.len = 0;
        std::mem::take(&mut self.text)
    }
}

pub struct LineEditor<W: Write> {
    prompt: String,
    line: InputLine,
    out: W,
}

impl<W: Write> LineEditor<W> {
    pub fn new(out: W, prompt: impl Into<String>, max_len: usize) -> Self {
        Self {
            prompt: prompt.into(),
            line: InputLine::new(max_len),
            out,
        }
    }

    /// The text typed so far and not yet submitted.
    pub fn pending(&self) -> &str {
        self.line.as_str()
    }

    pub fn into_output(self) -> W {
        self.out
    }

    pub fn show_prompt(&mut self) -> io::Result<()> {
        redraw_prompt(&mut self.out, &self.prompt, self.line.as_str())?;
        self.out.flush()
    }

    /// Apply one keystroke and echo its effect.
    pub fn handle_key(&mut self, key: Key) -> io::Result<Edit> {
        let Self { prompt, line, out } = self;

        let edit = match key {
            Key::Char(c) if c.is_control() => Edit::Continue,
            Key::Char(c) => {
                if line.push(c) {
                    queue!(out, Print(c))?;
                }
                Edit::Continue
            }
            Key::Backspace => {
                if line.pop() {
                    queue!(out, MoveLeft(1), Print(' '), MoveLeft(1))?;
                }
                Edit::Continue
            }
            Key::Enter => {
                let text = line.take();
                if text.is_empty() {
                    redraw_prompt(out, prompt, "")?;
                    Edit::Continue
                } else {
                    queue!(out, Print("\r\n"))?;
                    redraw_prompt(out, prompt, "")?;
                    Edit::Submit(text)
                }
            }
            Key::Quit => {
                queue!(out, Print("\r\n"))?;
                Edit::Quit
            }
        };

        out.flush()?;
        Ok(edit)
    }

    /// Print a line above the prompt and restore the unsent text.
    pub fn print_incoming(&mut self, text: &str, color: Option<Color>) -> io::Result<()> {
        let out = &mut self.out;
        queue!(out, MoveToColumn(0), Clear(ClearType::CurrentLine))?;
        match color {
            Some(color) => queue!(out, PrintStyledContent(text.with(color)))?,
            None => queue!(out, Print(text))?,
        }
        queue!(out, Print("\r\n"))?;
        redraw_prompt(out, &self.prompt, self.line.as_str())?;
        out.flush()
    }
}

fn redraw_prompt<W: Write>(out: &mut W, prompt: &str, pending: &str) -> io::Result<()> {
    queue!(
        out,
        MoveToColumn(0),
        Clear(ClearType::CurrentLine),
        PrintStyledContent(prompt.green()),
        Print(pending)
    )
}

/// Work for the terminal thread, applied in arrival order.
enum Draw {
    Line { text: String, color: Option<Color> },
    Key(Key),
    Stop,
}

/// Cheap, cloneable way to reach the terminal thread from anywhere.
#[derive(Clone)]
pub struct ConsoleHandle {
    draws: mpsc::UnboundedSender<Draw>,
}

impl ConsoleHandle {
    /// Queue a keystroke. False once the terminal thread is gone.
    pub fn key(&self, key: Key) -> bool {
        self.draws.send(Draw::Key(key)).is_ok()
    }

    fn show(&self, text: &str, color: Option<Color>) {
        let draw = Draw::Line {
            text: text.to_string(),
            color,
        };
        if self.draws.send(draw).is_err() {
            debug!("terminal closed; dropping console line");
        }
    }
}

impl Console for ConsoleHandle {
    fn message(&self, line: &str) {
        self.show(line, None);
    }

    fn notice(&self, line: &str) {
        self.show(line, Some(Color::Yellow));
    }

    fn alert(&self, line: &str) {
        self.show(line, Some(Color::Red));
    }
}

/// The terminal thread and the submitted lines coming out of it.
pub struct Terminal<W: Write> {
    console: ConsoleHandle,
    edits: mpsc::UnboundedReceiver<Edit>,
    thread: thread::JoinHandle<LineEditor<W>>,
}

impl<W> Terminal<W>
where
    W: Write + Send + 'static,
{
    /// Hand `editor` to a new thread and draw the first prompt.
    pub fn spawn(editor: LineEditor<W>) -> io::Result<Self> {
        let (draws_tx, draws_rx) = mpsc::unbounded_channel();
        let (edits_tx, edits) = mpsc::unbounded_channel();
        let thread = thread::Builder::new()
            .name("terminal".into())
            .spawn(move || drive(editor, draws_rx, edits_tx))?;

        Ok(Self {
            console: ConsoleHandle { draws: draws_tx },
            edits,
            thread,
        })
    }

    pub fn console(&self) -> ConsoleHandle {
        self.console.clone()
    }

    /// Submitted lines and quit requests, in the order they were typed.
    pub fn edits(&mut self) -> &mut mpsc::UnboundedReceiver<Edit> {
        &mut self.edits
    }

    /// Draw everything queued so far, then stop the thread and return the
    /// editor.
    pub async fn finish(self) -> Option<LineEditor<W>> {
        let _ = self.console.draws.send(Draw::Stop);
        let thread = self.thread;
        match tokio::task::spawn_blocking(move || thread.join()).await {
            Ok(Ok(editor)) => Some(editor),
            _ => {
                warn!("terminal thread did not finish cleanly");
                None
            }
        }
    }
}

fn drive<W: Write>(
    mut editor: LineEditor<W>,
    mut draws: mpsc::UnboundedReceiver<Draw>,
    edits: mpsc::UnboundedSender<Edit>,
) -> LineEditor<W> {
    if let Err(error) = editor.show_prompt() {
        debug!(?error, "console write failed");
    }

    while let Some(draw) = draws.blocking_recv() {
        let result = match draw {
            Draw::Line { text, color } => editor.print_incoming(&text, color),
            Draw::Key(key) => editor.handle_key(key).map(|edit| {
                if edit != Edit::Continue {
                    // The reader may already be gone during shutdown.
                    let _ = edits.send(edit);
                }
            }),
            Draw::Stop => break,
        };
        if let Err(error) = result {
            debug!(?error, "console write failed");
        }
    }
    editor
}

/// Map a terminal key event to an editor key.
pub fn translate(event: KeyEvent) -> Option<Key> {
    if event.kind != KeyEventKind::Press {
        return None;
    }
    let ctrl = event.modifiers.contains(KeyModifiers::CONTROL);
    match event.code {
        KeyCode::Char('c' | 'd') if ctrl => Some(Key::Quit),
        KeyCode::Char(_) if ctrl => None,
        KeyCode::Char(c) => Some(Key::Char(c)),
        KeyCode::Backspace => Some(Key::Backspace),
        KeyCode::Enter => Some(Key::Enter),
        _ => None,
    }
}

/// Read keys on their own thread, since terminal reads block, and feed
/// them to the terminal thread.
pub fn spawn_key_reader(console: ConsoleHandle) {
    thread::spawn(move || {
        loop {
            match event::read() {
                Ok(Event::Key(key_event)) => {
                    let Some(key) = translate(key_event) else {
                        continue;
                    };
                    if !console.key(key) || key == Key::Quit {
                        break;
                    }
                }
                Ok(_) => {}
                Err(error) => {
                    warn!(?error, "terminal read failed");
                    console.key(Key::Quit);
                    break;
                }
            }
        }
    });
}

/// RAII: raw mode is on while this value lives.
pub struct RawMode(());

impl RawMode {
    pub fn enable() -> io::Result<Self> {
        terminal::enable_raw_mode()?;
        Ok(Self(()))
    }
}

impl Drop for RawMode {
    fn drop(&mut self) {
        if let Err(error) = terminal::disable_raw_mode() {
            warn!(?error, "failed to leave raw mode");
        }
    }
}
