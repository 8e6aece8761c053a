//! Integration tests for the command interpreter over a mock channel.

use std::time::Duration;

use fermctl::app::events::AppEvent;
use fermctl::app::interpreter::{CommandInterpreter, StatusSources};
use fermctl::app::ports::ChatId;
use fermctl::app::shared::SharedState;
use fermctl::app::status::ORDER_WARNING;
use fermctl::config::{SelectedMode, Settings, Threshold};
use fermctl::control::clock::Instant;
use fermctl::sensors::{ProbeReadings, SampleStore};

use crate::mock_hw::{MockChannel, MockSettings, RecordingSink};

const CHAT: ChatId = 42;
const OTHER_CHAT: ChatId = 7;
const POLL_TIMEOUT: Duration = Duration::from_millis(200);

struct Bot {
    interp: CommandInterpreter<MockSettings>,
    channel: MockChannel,
    sink: RecordingSink,
    shared: SharedState,
    samples: SampleStore,
}

impl Bot {
    fn new() -> Self {
        Self {
            interp: CommandInterpreter::new(MockSettings::default()),
            channel: MockChannel::new(),
            sink: RecordingSink::new(),
            shared: SharedState::new(Settings::FACTORY),
            samples: SampleStore::new(),
        }
    }

    fn drain(&mut self, max: u8) -> usize {
        let sources = StatusSources {
            shared: &self.shared,
            samples: &self.samples,
        };
        self.interp
            .process_inbound(&mut self.channel, max, POLL_TIMEOUT, &sources, &mut self.sink)
    }

    /// Send one message from `CHAT` and return the reply, if any.
    fn say(&mut self, text: &str) -> Option<String> {
        self.say_from(CHAT, text)
    }

    fn say_from(&mut self, chat: ChatId, text: &str) -> Option<String> {
        let before = self.channel.replies.len();
        self.channel.send(chat, text);
        self.drain(1);
        if self.channel.replies.len() > before {
            self.channel.last_reply().map(str::to_owned)
        } else {
            None
        }
    }

    fn threshold(&self, which: Threshold) -> f32 {
        self.shared.settings().thresholds.get(which)
    }

    fn saved(&self) -> Option<Settings> {
        *self.interp.settings_store().saved.borrow()
    }
}

// ── Informational commands ───────────────────────────────────

#[test]
fn start_greets_sender() {
    let mut bot = Bot::new();
    let reply = bot.say("/start").unwrap();
    assert!(reply.starts_with("Hello, Ana."));
    assert!(reply.contains("/setModeAuto"));
}

#[test]
fn temperature_queries_read_the_sample_store() {
    let mut bot = Bot::new();
    bot.samples.publish(
        ProbeReadings {
            chamber_c: 19.5,
            liquid_c: 18.25,
        },
        Instant::from_millis(100),
    );
    assert_eq!(
        bot.say("/getChamberTemp").unwrap(),
        "Chamber temperature: 19.50\u{00b0}C"
    );
    assert_eq!(
        bot.say("/getLiquidTemp").unwrap(),
        "Liquid temperature: 18.25\u{00b0}C"
    );
    let both = bot.say("/getTemp").unwrap();
    assert!(both.contains("19.50") && both.contains("18.25"));
}

#[test]
fn status_reports_selected_mode() {
    let mut bot = Bot::new();
    let reply = bot.say("/status").unwrap();
    assert!(reply.contains("Selected mode: Off"));
    assert!(reply.contains("Operating mode: Undefined"));
    assert!(reply.contains("Chamber temperature: no reading"));
}

#[test]
fn unknown_text_is_ignored_silently() {
    let mut bot = Bot::new();
    assert_eq!(bot.say("hello"), None);
    assert_eq!(bot.say("/setTempX"), None);
    assert!(bot.channel.replies.is_empty());
    assert!(bot.sink.events.is_empty());
}

// ── Mode selection ───────────────────────────────────────────

#[test]
fn set_mode_updates_and_persists() {
    let mut bot = Bot::new();
    let reply = bot.say("/setModeAuto").unwrap();
    assert_eq!(reply, "Selected mode: Automatic");
    assert_eq!(bot.shared.settings().selected, SelectedMode::Auto);
    assert_eq!(bot.saved().map(|s| s.selected), Some(SelectedMode::Auto));
    assert!(matches!(
        bot.sink.events[..],
        [AppEvent::SelectedModeChanged(SelectedMode::Auto)]
    ));

    bot.say("/setModeCool");
    assert_eq!(bot.shared.settings().selected, SelectedMode::CoolOnly);
    assert_eq!(bot.interp.settings_store().saves.get(), 2);
}

// ── Threshold edits ──────────────────────────────────────────

#[test]
fn bare_command_prompts_then_applies_value() {
    let mut bot = Bot::new();
    let prompt = bot.say("/setTempH").unwrap();
    assert_eq!(
        prompt,
        "Upper hysteresis temperature is 22.00\u{00b0}C. Send the new value in \u{00b0}C."
    );
    assert_eq!(bot.interp.pending_edit(CHAT), Some(Threshold::InnerHigh));

    let reply = bot.say("21.5").unwrap();
    assert_eq!(reply, "Upper hysteresis temperature set to 21.50\u{00b0}C");
    assert_eq!(bot.threshold(Threshold::InnerHigh), 21.5);
    assert_eq!(bot.interp.pending_edit(CHAT), None);
    assert_eq!(bot.saved().map(|s| s.thresholds.inner_high), Some(21.5));
}

#[test]
fn slash_message_cancels_pending_edit() {
    let mut bot = Bot::new();
    bot.say("/setTempLL");
    let reply = bot.say("/setModeHeat").unwrap();
    assert_eq!(reply, "Selected mode: Heating only");
    assert_eq!(bot.interp.pending_edit(CHAT), None);
    assert_eq!(bot.threshold(Threshold::OuterLow), 17.0);

    // The next plain number is no longer a value.
    assert_eq!(bot.say("10"), None);
    assert_eq!(bot.threshold(Threshold::OuterLow), 17.0);
}

#[test]
fn pending_edit_belongs_to_one_chat() {
    let mut bot = Bot::new();
    bot.say("/setTempHH");
    assert_eq!(bot.interp.pending_edit(OTHER_CHAT), None);

    assert_eq!(bot.say_from(OTHER_CHAT, "30"), None);
    assert_eq!(bot.threshold(Threshold::OuterHigh), 23.0);

    bot.say("24");
    assert_eq!(bot.threshold(Threshold::OuterHigh), 24.0);
}

#[test]
fn step_commands_move_one_degree() {
    let mut bot = Bot::new();
    assert_eq!(
        bot.say("/setTempLp").unwrap(),
        "Lower hysteresis temperature set to 19.00\u{00b0}C"
    );
    bot.say("/setTempHHm");
    assert_eq!(bot.threshold(Threshold::InnerLow), 19.0);
    assert_eq!(bot.threshold(Threshold::OuterHigh), 22.0);
    assert_eq!(bot.interp.settings_store().saves.get(), 2);
}

#[test]
fn step_past_probe_range_is_rejected() {
    let mut bot = Bot::new();
    bot.shared
        .update_settings(|s| s.thresholds.set(Threshold::OuterHigh, 125.0));
    let reply = bot.say("/setTempHHp").unwrap();
    assert!(reply.starts_with("Upper mode-change temperature unchanged:"));
    assert_eq!(bot.threshold(Threshold::OuterHigh), 125.0);
}

#[test]
fn bad_values_leave_threshold_unchanged() {
    for (text, reason) in [
        ("warm", "not a decimal number"),
        ("NaN", "value is not finite"),
        ("200", "value outside -55..125"),
    ] {
        let mut bot = Bot::new();
        bot.say("/setTempL");
        let reply = bot.say(text).unwrap();
        assert!(
            reply.starts_with("Lower hysteresis temperature unchanged:") && reply.contains(reason),
            "{text:?} gave {reply:?}"
        );
        assert_eq!(bot.threshold(Threshold::InnerLow), 18.0);
        assert_eq!(bot.interp.pending_edit(CHAT), None, "one attempt per prompt");
        assert_eq!(bot.interp.settings_store().saves.get(), 0);
    }
}

#[test]
fn out_of_order_thresholds_are_accepted_with_warning() {
    let mut bot = Bot::new();
    bot.say("/setTempL");
    let reply = bot.say("25").unwrap();
    assert!(reply.contains(ORDER_WARNING));
    assert_eq!(bot.threshold(Threshold::InnerLow), 25.0);
    assert_eq!(bot.sink.count(|e| matches!(e, AppEvent::ThresholdsOutOfOrder)), 1);
    assert!(bot.saved().is_some());
}

#[test]
fn persist_failure_keeps_change_and_warns() {
    let mut bot = Bot::new();
    bot.interp.settings_store().fail.set(true);
    let reply = bot.say("/setModeAuto").unwrap();
    assert!(reply.starts_with("Selected mode: Automatic"));
    assert!(reply.contains("could not save settings"));
    assert_eq!(bot.shared.settings().selected, SelectedMode::Auto);
    assert_eq!(bot.sink.count(|e| matches!(e, AppEvent::PersistFailed)), 1);
    assert!(bot.saved().is_none());
}

// ── Drain bounds ─────────────────────────────────────────────

#[test]
fn drain_is_bounded_and_only_first_poll_waits() {
    let mut bot = Bot::new();
    for _ in 0..5 {
        bot.channel.send(CHAT, "/status");
    }
    assert_eq!(bot.drain(3), 3);
    assert_eq!(bot.channel.replies.len(), 3);
    assert_eq!(bot.channel.inbox.len(), 2);
    assert_eq!(
        bot.channel.poll_timeouts,
        vec![POLL_TIMEOUT, Duration::ZERO, Duration::ZERO]
    );

    bot.channel.poll_timeouts.clear();
    assert_eq!(bot.drain(8), 2);
    // Two messages plus the empty poll that ended the drain.
    assert_eq!(bot.channel.poll_timeouts.len(), 3);
}

#[test]
fn poll_error_ends_the_drain() {
    let mut bot = Bot::new();
    bot.channel.send(CHAT, "/status");
    bot.channel.fail_poll = true;
    assert_eq!(bot.drain(4), 0);
    assert_eq!(bot.channel.poll_timeouts.len(), 1);
    assert!(bot.channel.replies.is_empty());
}

#[test]
fn replies_go_to_the_sending_chat() {
    let mut bot = Bot::new();
    bot.channel.send(CHAT, "/status");
    bot.channel.send(OTHER_CHAT, "/getTemp");
    bot.drain(4);
    let chats: Vec<ChatId> = bot.channel.replies.iter().map(|(c, _)| *c).collect();
    assert_eq!(chats, vec![CHAT, OTHER_CHAT]);
}

#[test]
fn console_blank_line_does_not_end_the_drain() {
    use fermctl::adapters::console::ConsoleChannel;
    use std::sync::mpsc;

    let (tx, rx) = mpsc::channel();
    let mut console = ConsoleChannel::with_parts(rx, Vec::new(), None);
    tx.send(String::new()).unwrap();
    tx.send("/setModeAuto".to_string()).unwrap();

    let mut bot = Bot::new();
    let sources = StatusSources {
        shared: &bot.shared,
        samples: &bot.samples,
    };
    let handled =
        bot.interp
            .process_inbound(&mut console, 8, Duration::ZERO, &sources, &mut bot.sink);

    assert_eq!(handled, 1);
    assert_eq!(bot.shared.settings().selected, SelectedMode::Auto);
    assert!(String::from_utf8_lossy(console.output()).contains("Auto"));
}
