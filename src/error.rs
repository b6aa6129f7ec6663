// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::fmt;

use crate::handler::HandlerKind;
use crate::state::StateName;

/// Unified error categories for the HSM core and its screen-imaging
/// pipeline.
///
/// `NonFatal` diversions and the `Finished` exit signal are *not* part of
/// this enum — they travel as [`crate::handler::ControlSignal`] values
/// returned alongside `Ok(..)`, not as errors. Everything here propagates
/// as a genuine fault and, at the top of [`crate::engine::Automaton::run`],
/// drives the stack-reset / `INVALID` recovery.
#[derive(Debug, Clone, PartialEq)]
pub enum HsmError {
    /// A state or handler name did not match the state-name grammar.
    InvalidStateName { name: String },
    /// No handler or transition helper matched any candidate name.
    NoHandler { state: StateName, kind: HandlerKind },
    /// A handler returned a value outside the `{none, name, (name, data)}`
    /// sum type.
    BadReturn,
    /// `transition_to` invoked a handler but the state did not change.
    TransitionInert,
    /// `transition_to(exact=true)` landed outside the target/substate.
    TransitionMissedExact { target: StateName, landed: StateName },
    /// `transition_to(exact=false)` landed outside the target and no
    /// handler exists for the landing state.
    TransitionMissedWithNoHandler { target: StateName, landed: StateName },
    /// `pop()` was called against an empty state stack.
    StackEmpty,
    /// A terminal-façade wait exceeded its deadline.
    Timeout,
    /// The child process closed its end of the pseudo-TTY.
    Eof,
    /// A `SECTION.OPTION=VALUE` command-line argument did not parse.
    BadOptionFormat { arg: String },
    /// A required config key was absent and no default was supplied.
    KeyMissing { section: String, item: String },
    /// `send_key` was asked for a key with no built-in or config mapping.
    UnknownKey { key: String },
    /// A `redirect_*` config entry named a kind other than
    /// `regex`/`always`/`error`.
    UnknownRedirectKind { kind: String },
    /// A `data__*` config entry named a kind other than `fixedpos`.
    UnknownDataKind { kind: String },
    /// A `redirect_*` entry of kind `error` fired.
    RedirectedToError { args: Vec<String> },
    /// Catch-all for collaborator failures (spawn, I/O) and malformed
    /// screen-imaging config clauses.
    Other { detail: String },
}

impl HsmError {
    /// Coarse category, stable across variant additions, suitable for
    /// metrics labels and log fields.
    pub fn category(&self) -> &'static str {
        match self {
            Self::InvalidStateName { .. } => "INVALID_STATE_NAME",
            Self::NoHandler { .. } => "NO_HANDLER",
            Self::BadReturn => "BAD_RETURN",
            Self::TransitionInert => "TRANSITION_INERT",
            Self::TransitionMissedExact { .. } => "TRANSITION_MISSED_EXACT",
            Self::TransitionMissedWithNoHandler { .. } => "TRANSITION_MISSED_NO_HANDLER",
            Self::StackEmpty => "STACK_EMPTY",
            Self::Timeout => "TIMEOUT",
            Self::Eof => "EOF",
            Self::BadOptionFormat { .. } => "BAD_OPTION_FORMAT",
            Self::KeyMissing { .. } => "KEY_MISSING",
            Self::UnknownKey { .. } => "UNKNOWN_KEY",
            Self::UnknownRedirectKind { .. } => "UNKNOWN_REDIRECT_KIND",
            Self::UnknownDataKind { .. } => "UNKNOWN_DATA_KIND",
            Self::RedirectedToError { .. } => "REDIRECTED_TO_ERROR",
            Self::Other { .. } => "OTHER",
        }
    }
}

impl fmt::Display for HsmError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidStateName { name } => write!(f, "invalid state name: {name:?}"),
            Self::NoHandler { state, kind } => {
                write!(f, "no {kind} handler for state {state}")
            }
            Self::BadReturn => write!(f, "handler returned an unrecognized shape"),
            Self::TransitionInert => write!(f, "transition handler did not change state"),
            Self::TransitionMissedExact { target, landed } => write!(
                f,
                "transition wanted {target} but landed in {landed} (not a substate)"
            ),
            Self::TransitionMissedWithNoHandler { target, landed } => write!(
                f,
                "transition wanted {target} but landed in {landed} with no handler"
            ),
            Self::StackEmpty => write!(f, "pop() on an empty state stack"),
            Self::Timeout => write!(f, "timed out waiting on the terminal"),
            Self::Eof => write!(f, "child process closed the pseudo-TTY"),
            Self::BadOptionFormat { arg } => write!(f, "malformed option: {arg:?}"),
            Self::KeyMissing { section, item } => {
                write!(f, "missing config key {section}.{item}")
            }
            Self::UnknownKey { key } => write!(f, "no mapping for key {key:?}"),
            Self::UnknownRedirectKind { kind } => write!(f, "unknown redirect kind {kind:?}"),
            Self::UnknownDataKind { kind } => write!(f, "unknown data capture kind {kind:?}"),
            Self::RedirectedToError { args } => write!(f, "redirected to error: {args:?}"),
            Self::Other { detail } => write!(f, "{detail}"),
        }
    }
}

impl std::error::Error for HsmError {}

#[cfg(test)]
#[path = "error_tests.rs"]
mod error_tests;
