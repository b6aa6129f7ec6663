// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use yare::parameterized;

use super::*;
use crate::handler::HandlerKind;
use crate::state::StateName;

#[parameterized(
    invalid_state_name = { HsmError::InvalidStateName { name: "foo".into() }, "INVALID_STATE_NAME" },
    bad_return = { HsmError::BadReturn, "BAD_RETURN" },
    transition_inert = { HsmError::TransitionInert, "TRANSITION_INERT" },
    stack_empty = { HsmError::StackEmpty, "STACK_EMPTY" },
    timeout = { HsmError::Timeout, "TIMEOUT" },
    eof = { HsmError::Eof, "EOF" },
)]
fn category_matches_variant(err: HsmError, expected: &str) {
    assert_eq!(err.category(), expected);
}

#[test]
fn no_handler_category_and_display() {
    let state = StateName::parse("FOO__BAR").unwrap();
    let err = HsmError::NoHandler { state: state.clone(), kind: HandlerKind::Do };
    assert_eq!(err.category(), "NO_HANDLER");
    let message = err.to_string();
    assert!(message.contains("FOO__BAR"));
    assert!(message.contains("do"));
}

#[test]
fn transition_missed_exact_display_names_both_states() {
    let target = StateName::parse("DISCONNECTED").unwrap();
    let landed = StateName::parse("CONNECTING").unwrap();
    let err = HsmError::TransitionMissedExact { target, landed };
    let message = err.to_string();
    assert!(message.contains("DISCONNECTED"));
    assert!(message.contains("CONNECTING"));
}

#[test]
fn is_a_std_error() {
    fn assert_std_error<E: std::error::Error>() {}
    assert_std_error::<HsmError>();
}

#[test]
fn key_missing_display_joins_section_and_item() {
    let err = HsmError::KeyMissing { section: "General".into(), item: "term".into() };
    assert_eq!(err.to_string(), "missing config key General.term");
}
