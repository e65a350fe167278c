mod common;

use std::io::{self, Write};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use common::{Peer, TestHub, serve};
use hub_chat::config::ServerConfig;
use hub_chat::message::{REJECTION_NOTICE, SERVER_FULL_NOTICE};
use hub_chat::server::Hub;
use hub_chat::terminal::{LineEditor, Terminal};

#[tokio::test]
async fn duplicate_nickname_is_rejected_then_admitted() -> Result<()> {
    let hub = TestHub::start(8).await?;
    let mut alice = Peer::join(hub.addr, "alice").await?;

    let mut bob = Peer::connect(hub.addr).await?;
    assert_eq!(bob.ask("alice").await?, REJECTION_NOTICE);
    assert_eq!(bob.ask("alice").await?, REJECTION_NOTICE);
    assert_eq!(hub.hub.registry().nicknames().await, vec!["alice".to_string()]);

    assert_eq!(bob.ask("bob").await?, "Welcome to the server!");
    assert_eq!(alice.read().await?, "bob has joined the chat.");
    assert_eq!(
        hub.hub.registry().nicknames().await,
        vec!["alice".to_string(), "bob".to_string()]
    );

    hub.stop().await;
    Ok(())
}

#[tokio::test]
async fn operator_nickname_is_reserved() -> Result<()> {
    let hub = TestHub::start(8).await?;

    let mut eve = Peer::connect(hub.addr).await?;
    assert_eq!(eve.ask("Server").await?, REJECTION_NOTICE);
    assert_eq!(eve.ask("   ").await?, REJECTION_NOTICE);
    assert_eq!(eve.ask("eve\r\n").await?, "Welcome to the server!");

    hub.stop().await;
    Ok(())
}

#[tokio::test]
async fn chat_is_relayed_with_the_sender_nickname() -> Result<()> {
    let hub = TestHub::start(8).await?;
    let mut alice = Peer::join(hub.addr, "alice").await?;
    let mut bob = Peer::join(hub.addr, "bob").await?;
    assert_eq!(alice.read().await?, "bob has joined the chat.");

    alice.send("hello").await?;
    assert_eq!(bob.read().await?, "[alice]: hello");
    hub.console.wait_for("[alice]: hello").await?;

    bob.send("hi alice\n").await?;
    assert_eq!(alice.read().await?, "[bob]: hi alice");

    hub.stop().await;
    Ok(())
}

#[tokio::test]
async fn operator_messages_reach_everyone() -> Result<()> {
    let hub = TestHub::start(8).await?;
    let mut alice = Peer::join(hub.addr, "alice").await?;
    let mut bob = Peer::join(hub.addr, "bob").await?;
    assert_eq!(alice.read().await?, "bob has joined the chat.");

    let report = hub.hub.say("welcome both").await;
    assert_eq!(report.delivered, 2);
    assert_eq!(alice.read().await?, "[Server]: welcome both");
    assert_eq!(bob.read().await?, "[Server]: welcome both");

    hub.stop().await;
    Ok(())
}

#[tokio::test]
async fn full_hub_refuses_new_connections() -> Result<()> {
    let hub = TestHub::start(2).await?;
    let mut alice = Peer::join(hub.addr, "alice").await?;
    let mut bob = Peer::join(hub.addr, "bob").await?;
    assert_eq!(alice.read().await?, "bob has joined the chat.");

    let mut carol = Peer::connect(hub.addr).await?;
    assert_eq!(carol.read_to_close().await?, SERVER_FULL_NOTICE);
    assert_eq!(hub.hub.registry().len().await, 2);

    alice.send("still here").await?;
    assert_eq!(bob.read().await?, "[alice]: still here");

    hub.stop().await;
    Ok(())
}

#[tokio::test]
async fn departure_is_announced_and_frees_the_nickname() -> Result<()> {
    let hub = TestHub::start(8).await?;
    let alice = Peer::join(hub.addr, "alice").await?;
    let mut bob = Peer::join(hub.addr, "bob").await?;

    drop(alice);
    assert_eq!(bob.read().await?, "alice has left the chat.");
    hub.console.wait_for("alice has left the chat.").await?;
    assert!(!hub.hub.registry().contains("alice").await);

    let _alice_again = Peer::join(hub.addr, "alice").await?;
    assert_eq!(bob.read().await?, "alice has joined the chat.");

    hub.stop().await;
    Ok(())
}

#[tokio::test]
async fn abandoned_negotiation_leaves_no_trace() -> Result<()> {
    let hub = TestHub::start(8).await?;

    let mut quitter = Peer::connect(hub.addr).await?;
    quitter.writer.shutdown().await?;
    assert!(quitter.read().await.is_err());
    drop(quitter);

    let _alice = Peer::join(hub.addr, "alice").await?;
    assert_eq!(hub.hub.registry().nicknames().await, vec!["alice".to_string()]);

    hub.stop().await;
    Ok(())
}

/// Operator terminal that stalls on every flush.
struct StalledTerminal;

impl Write for StalledTerminal {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        std::thread::sleep(Duration::from_secs(1));
        Ok(())
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn slow_operator_terminal_does_not_hold_up_relay() -> Result<()> {
    let terminal = Terminal::spawn(LineEditor::new(StalledTerminal, "You: ", 256))?;
    let hub = Arc::new(Hub::new(
        ServerConfig::builder().build(),
        Arc::new(terminal.console()),
    ));
    let (addr, shutdown, task) = serve(hub).await?;

    let mut alice = Peer::join(addr, "alice").await?;
    let mut bob = Peer::join(addr, "bob").await?;
    assert_eq!(alice.read().await?, "bob has joined the chat.");
    let mut carol = Peer::join(addr, "carol").await?;
    assert_eq!(alice.read().await?, "carol has joined the chat.");
    assert_eq!(bob.read().await?, "carol has joined the chat.");

    carol.send("ping").await?;
    assert_eq!(alice.read().await?, "[carol]: ping");
    assert_eq!(bob.read().await?, "[carol]: ping");

    let _ = shutdown.send(());
    let _ = task.await;
    Ok(())
}
