//! Serial console command channel.
//!
//! Implements [`CommandChannel`] over line-oriented text: a reader thread
//! pushes each line from stdin (the UART console on the device, the
//! terminal in the simulation) into an mpsc queue, and `poll` waits on
//! that queue for at most the given timeout.  Replies are written to a
//! [`Write`] sink, stdout by default.
//!
//! The console is a single conversation, so every message carries the
//! same chat id.

use std::io::{BufRead, Write};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::thread;
use std::time::Duration;

use log::{info, warn};

use crate::app::ports::{ChannelError, ChatId, CommandChannel, InboundMessage};

/// Chat id used for the console conversation.
pub const CONSOLE_CHAT: ChatId = 0;

pub struct ConsoleChannel<W = std::io::Stdout> {
    rx: Receiver<String>,
    out: W,
    sender: Option<String>,
    closed: bool,
}

impl ConsoleChannel {
    /// Spawn the stdin reader thread and reply on stdout.
    pub fn spawn(sender: Option<String>) -> Self {
        let (tx, rx) = mpsc::channel();
        let reader = thread::Builder::new()
            .name("console-rx".into())
            .stack_size(8192)
            .spawn(move || {
                for line in std::io::stdin().lock().lines() {
                    let Ok(line) = line else { break };
                    if tx.send(line).is_err() {
                        break;
                    }
                }
            });
        if let Err(e) = reader {
            warn!("Console: reader thread not started: {}", e);
        }
        info!("Console command channel ready");
        Self::with_parts(rx, std::io::stdout(), sender)
    }
}

impl<W: Write> ConsoleChannel<W> {
    /// Build from an existing line queue and reply sink.
    pub fn with_parts(rx: Receiver<String>, out: W, sender: Option<String>) -> Self {
        Self {
            rx,
            out,
            sender,
            closed: false,
        }
    }

    pub fn output(&self) -> &W {
        &self.out
    }
}

impl<W: Write> CommandChannel for ConsoleChannel<W> {
    fn poll(&mut self, timeout: Duration) -> Result<Option<InboundMessage>, ChannelError> {
        if self.closed {
            return Ok(None);
        }
        let mut wait = timeout;
        loop {
            let line = match self.rx.recv_timeout(wait) {
                Ok(line) => line,
                Err(RecvTimeoutError::Timeout) => return Ok(None),
                Err(RecvTimeoutError::Disconnected) => {
                    // Reported once; afterwards the console is just silent.
                    self.closed = true;
                    return Err(ChannelError::Disconnected);
                }
            };
            if !line.trim().is_empty() {
                return Ok(Some(InboundMessage {
                    chat_id: CONSOLE_CHAT,
                    sender: self.sender.clone(),
                    text: line,
                }));
            }
            // Blank line: take whatever is already queued behind it.
            wait = Duration::ZERO;
        }
    }

    fn reply(&mut self, chat_id: ChatId, text: &str) -> Result<(), ChannelError> {
        if chat_id != CONSOLE_CHAT {
            return Err(ChannelError::SendFailed);
        }
        writeln!(self.out, "{text}")
            .and_then(|()| self.out.flush())
            .map_err(|_| ChannelError::SendFailed)
    }
}
