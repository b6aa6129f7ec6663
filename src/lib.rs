// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `scry`: a hierarchical state machine (HSM) runtime tightly coupled
//! with a terminal-emulation I/O layer, for driving and observing an
//! interactive child process over a pseudo-TTY.
//!
//! The crate is organized around the three subsystems a screen-scraping
//! automaton needs:
//!
//! - [`state`]/[`handler`]/[`registry`]/[`compose`]/[`engine`] — the HSM
//!   engine: state names, the behavior-unit capability set, the composed
//!   handler index, runtime composition, and the run loop itself.
//! - [`terminal`] — the terminal I/O façade: pseudo-TTY spawn, a
//!   non-blocking reader, the VT100/ANSI emulator, and the fixed key
//!   table.
//! - [`imaging`] — the screen-imaging pipeline: settle, verify, redirect,
//!   capture, keyed off `(origin-unit, state, substate)` configuration
//!   read through [`config`].
//!
//! [`examples_builtin`] is a small demonstration behavior unit, not part
//! of the engine proper; see its module docs. `src/bin/scry-demo.rs`
//! wires all of the above into a runnable binary against a real child
//! process.

pub mod compose;
pub mod config;
pub mod engine;
pub mod error;
pub mod examples_builtin;
pub mod handler;
pub mod imaging;
pub mod registry;
pub mod state;
pub mod terminal;

#[cfg(test)]
pub mod test_support;

pub use config::ConfigTree;
pub use engine::Automaton;
pub use error::HsmError;
pub use handler::{
    Arg, BehaviorUnit, BehaviorUnitRef, ControlSignal, ExitSignal, HandlerKind, ReturnValue,
};
pub use imaging::image_screen;
pub use state::{StateData, StateName, StateValue};
