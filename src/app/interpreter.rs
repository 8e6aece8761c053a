//! Command interpreter — turns inbound messages into settings mutations
//! and status replies.
//!
//! ```text
//!  CommandChannel ──▶ CommandInterpreter ──▶ SharedState (settings)
//!         ▲                  │     └──────▶ SettingsPort (persist)
//!         └──── reply ───────┘
//! ```
//!
//! A bare `/setTemp*` arms a pending edit for the sending chat; that
//! chat's next message is read as the value.  A message starting with `/`
//! cancels the pending edit and is handled as a command instead.

use core::time::Duration;

use log::{debug, info, warn};

use super::commands::{self, Command, Step};
use super::events::AppEvent;
use super::ports::{ChatId, CommandChannel, EventSink, InboundMessage, SettingsPort};
use super::shared::SharedState;
use super::status;
use crate::config::{SelectedMode, Settings, Threshold};
use crate::error::CommandError;
use crate::sensors::SampleStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct PendingEdit {
    chat_id: ChatId,
    which: Threshold,
}

/// Read-side collaborators for status replies.
pub struct StatusSources<'a> {
    pub shared: &'a SharedState,
    pub samples: &'a SampleStore,
}

pub struct CommandInterpreter<S> {
    settings_store: S,
    pending: Option<PendingEdit>,
}

impl<S: SettingsPort> CommandInterpreter<S> {
    pub fn new(settings_store: S) -> Self {
        Self {
            settings_store,
            pending: None,
        }
    }

    /// Threshold awaiting a value from `chat_id`, if any.
    pub fn pending_edit(&self, chat_id: ChatId) -> Option<Threshold> {
        self.pending
            .filter(|p| p.chat_id == chat_id)
            .map(|p| p.which)
    }

    pub fn settings_store(&self) -> &S {
        &self.settings_store
    }

    pub fn into_settings_store(self) -> S {
        self.settings_store
    }

    /// Drain up to `max` messages from `channel`.
    ///
    /// Only the first poll waits (at most `timeout`); later polls just
    /// pick up what is already queued, so one call stays bounded.
    pub fn process_inbound(
        &mut self,
        channel: &mut impl CommandChannel,
        max: u8,
        timeout: Duration,
        sources: &StatusSources<'_>,
        sink: &mut impl EventSink,
    ) -> usize {
        let mut handled = 0;
        for i in 0..max {
            let wait = if i == 0 { timeout } else { Duration::ZERO };
            let msg = match channel.poll(wait) {
                Ok(Some(msg)) => msg,
                Ok(None) => break,
                Err(e) => {
                    warn!("Command channel poll failed: {}", e);
                    break;
                }
            };
            handled += 1;
            if let Some(reply) = self.handle(&msg, sources, sink) {
                if let Err(e) = channel.reply(msg.chat_id, &reply) {
                    warn!("Reply to chat {} failed: {}", msg.chat_id, e);
                }
            }
        }
        handled
    }

    /// Interpret one message.  Returns the reply text, or `None` when the
    /// message is ignored.
    pub fn handle(
        &mut self,
        msg: &InboundMessage,
        sources: &StatusSources<'_>,
        sink: &mut impl EventSink,
    ) -> Option<String> {
        let text = msg.text.trim();

        if let Some(which) = self.pending_edit(msg.chat_id) {
            self.pending = None;
            if !text.starts_with('/') {
                return Some(self.apply_value(which, text, sources.shared, sink));
            }
            debug!("Pending edit of {} cancelled by {}", which.key(), text);
        }

        let Some(cmd) = commands::parse_command(text) else {
            debug!("Ignoring message from chat {}", msg.chat_id);
            return None;
        };

        let reply = match cmd {
            Command::Start => status::help_text(msg.sender.as_deref()),
            Command::Status => status::status_text(
                &sources.shared.settings(),
                &sources.shared.status(),
                &sources.samples.snapshot(),
            ),
            Command::GetTemp => status::temperatures_text(&sources.samples.snapshot()),
            Command::GetChamberTemp => status::chamber_line(&sources.samples.snapshot()),
            Command::GetLiquidTemp => status::liquid_line(&sources.samples.snapshot()),
            Command::SetMode(mode) => self.apply_mode(mode, sources.shared, sink),
            Command::EditThreshold(which) => {
                self.pending = Some(PendingEdit {
                    chat_id: msg.chat_id,
                    which,
                });
                let current = sources.shared.settings().thresholds.get(which);
                status::prompt_text(which, current)
            }
            Command::StepThreshold(which, step) => {
                self.apply_step(which, step, sources.shared, sink)
            }
        };
        Some(reply)
    }

    // ── Mutations ─────────────────────────────────────────────

    fn apply_mode(
        &mut self,
        mode: SelectedMode,
        shared: &SharedState,
        sink: &mut impl EventSink,
    ) -> String {
        let settings = shared.update_settings(|s| s.selected = mode);
        info!("Selected mode set to {}", mode);
        sink.emit(&AppEvent::SelectedModeChanged(mode));
        let reply = status::mode_text(mode);
        self.persist(&settings, reply, sink)
    }

    fn apply_value(
        &mut self,
        which: Threshold,
        text: &str,
        shared: &SharedState,
        sink: &mut impl EventSink,
    ) -> String {
        match commands::parse_celsius(text) {
            Ok(value) => self.apply_threshold(which, value, shared, sink),
            Err(e) => reject(which, e),
        }
    }

    fn apply_step(
        &mut self,
        which: Threshold,
        step: Step,
        shared: &SharedState,
        sink: &mut impl EventSink,
    ) -> String {
        let current = shared.settings().thresholds.get(which);
        match commands::check_celsius(current + step.delta()) {
            Ok(value) => self.apply_threshold(which, value, shared, sink),
            Err(e) => reject(which, e),
        }
    }

    fn apply_threshold(
        &mut self,
        which: Threshold,
        value: f32,
        shared: &SharedState,
        sink: &mut impl EventSink,
    ) -> String {
        let settings = shared.update_settings(|s| s.thresholds.set(which, value));
        info!("{} set to {:.2}", which.key(), value);
        sink.emit(&AppEvent::ThresholdChanged { which, value });

        let mut reply = status::threshold_text(which, value);
        if !settings.thresholds.is_ordered() {
            warn!("Thresholds out of order: {:?}", settings.thresholds);
            sink.emit(&AppEvent::ThresholdsOutOfOrder);
            reply.push('\n');
            reply.push_str(status::ORDER_WARNING);
        }
        self.persist(&settings, reply, sink)
    }

    /// Persist `settings`; a failure keeps the in-memory change and is
    /// appended to the reply.
    fn persist(&mut self, settings: &Settings, mut reply: String, sink: &mut impl EventSink) -> String {
        if let Err(e) = self.settings_store.save_settings(settings) {
            warn!("Settings not saved: {}", e);
            sink.emit(&AppEvent::PersistFailed);
            reply.push_str("\nWarning: could not save settings, change is lost on restart");
        }
        reply
    }
}

fn reject(which: Threshold, e: CommandError) -> String {
    info!("Rejected value for {}: {}", which.key(), e);
    format!("{} unchanged: {}", which.label(), e)
}
