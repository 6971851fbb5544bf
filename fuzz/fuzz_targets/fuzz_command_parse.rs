//! Fuzz target: inbound command decoding
//!
//! Feeds arbitrary payloads through `ProtocolHandler::parse_inbound` and
//! `Command::parse`, asserting that decoding never panics, never keeps
//! more than `MAX_COMMAND_LEN` characters, and is stable under re-parsing of
//! its own normalized output.
//!
//! cargo fuzz run fuzz_command_parse

#![no_main]

use libfuzzer_sys::fuzz_target;
use rosecompass::app::commands::{Command, MAX_COMMAND_LEN};
use rosecompass::app::ports::InboundMessage;
use rosecompass::app::protocol::ProtocolHandler;
use rosecompass::config::SystemConfig;

// Linked so `critical-section/std` provides the lock symbols.
use critical_section as _;

fuzz_target!(|data: &[u8]| {
    let handler = ProtocolHandler::new(&SystemConfig::default());
    let msg = InboundMessage::new(handler.topics().command.clone(), data);

    let Some(cmd) = handler.parse_inbound(&msg) else {
        panic!("command-topic messages always decode");
    };
    if let Command::Unknown(text) = &cmd {
        assert!(text.chars().count() <= MAX_COMMAND_LEN);
    }

    // Normalized text parses back to the same command.
    let again = Command::parse(&cmd.to_string());
    assert_eq!(again, cmd);
});
