// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared test infrastructure: a deterministic terminal double and builder
//! helpers for constructing an `Automaton` without a real pseudo-TTY.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use regex::Regex;

use crate::config::ConfigTree;
use crate::engine::Automaton;
use crate::error::HsmError;
use crate::handler::{Arg, BehaviorUnit, BehaviorUnitRef, ControlSignal};
use crate::state::StateData;
use crate::terminal::TerminalFacade;

/// An in-memory [`TerminalFacade`] driven entirely by pre-scripted screen
/// states, with no subprocess and no real time passing.
///
/// Each call to [`MockTerminal::push_frame`] queues a screen state; `pump`
/// (and therefore every `expect_*`) advances to the next queued frame the
/// first time it is called after the previous frame was consumed, then
/// reports no further input once the queue is empty. This gives
/// `expect_delay`'s settle detection something to observe without a real
/// clock: once the queue drains, every subsequent `pump` reports zero
/// bytes, so a `delay` window always appears to have elapsed immediately.
pub struct MockTerminal {
    frames: Mutex<Vec<Frame>>,
    current: Mutex<Frame>,
    sent: Mutex<Vec<Vec<u8>>>,
}

#[derive(Clone)]
struct Frame {
    rows: Vec<String>,
    cursor: (u16, u16),
}

impl Default for Frame {
    fn default() -> Self {
        Self { rows: Vec::new(), cursor: (0, 0) }
    }
}

impl MockTerminal {
    pub fn new(cols: u16, rows: u16) -> Self {
        let blank = vec![" ".repeat(cols as usize); rows as usize];
        Self {
            frames: Mutex::new(Vec::new()),
            current: Mutex::new(Frame { rows: blank, cursor: (0, 0) }),
            sent: Mutex::new(Vec::new()),
        }
    }

    /// Queue a screen state to appear on the next `pump`. `rows` need not
    /// be padded; `dump_row`/`get_region` read past the end of a short row
    /// as empty.
    pub fn push_frame(&self, rows: Vec<&str>, cursor: (u16, u16)) {
        self.frames.lock().unwrap().push(Frame {
            rows: rows.into_iter().map(str::to_string).collect(),
            cursor,
        });
    }

    /// Every byte buffer passed to `send`, in call order.
    pub fn sent(&self) -> Vec<Vec<u8>> {
        self.sent.lock().unwrap().clone()
    }
}

impl TerminalFacade for MockTerminal {
    fn send(&mut self, bytes: &[u8]) -> Result<(), HsmError> {
        self.sent.lock().unwrap().push(bytes.to_vec());
        Ok(())
    }

    fn expect_delay(
        &mut self,
        _delay: Duration,
        _timeout: Duration,
        _resolution: Duration,
        require_input: usize,
    ) -> Result<(), HsmError> {
        if require_input > 0 && self.pump(Duration::ZERO)? == 0 {
            return Err(HsmError::Timeout);
        }
        Ok(())
    }

    fn expect_line_matching(
        &mut self,
        pattern: &Regex,
        lineno: u16,
        _timeout: Duration,
    ) -> Result<(), HsmError> {
        loop {
            let matched = if lineno > 0 {
                pattern.is_match(&self.dump_row(lineno - 1))
            } else {
                self.dump_rows().iter().any(|row| pattern.is_match(row))
            };
            if matched {
                return Ok(());
            }
            if self.pump(Duration::ZERO)? == 0 {
                return Err(HsmError::Timeout);
            }
        }
    }

    fn expect_cursor_position(
        &mut self,
        row: Option<u16>,
        column: Option<u16>,
        _timeout: Duration,
        _resolution: Duration,
    ) -> Result<(), HsmError> {
        loop {
            let row_ok = row.map(|r| r == self.cursor_row()).unwrap_or(true);
            let col_ok = column.map(|c| c == self.cursor_col()).unwrap_or(true);
            if row_ok && col_ok {
                return Ok(());
            }
            if self.pump(Duration::ZERO)? == 0 {
                return Err(HsmError::Timeout);
            }
        }
    }

    fn row_count(&self) -> u16 {
        self.current.lock().unwrap().rows.len() as u16
    }

    fn col_count(&self) -> u16 {
        self.current.lock().unwrap().rows.first().map(|r| r.len()).unwrap_or(0) as u16
    }

    fn dump_row(&self, i: u16) -> String {
        self.current.lock().unwrap().rows.get(i as usize).cloned().unwrap_or_default()
    }

    fn dump_rows(&self) -> Vec<String> {
        self.current.lock().unwrap().rows.clone()
    }

    fn get_region(&self, r1: u16, c1: u16, r2: u16, c2: u16) -> Vec<String> {
        (r1..=r2)
            .map(|r| {
                let row = self.dump_row(r);
                let chars: Vec<char> = row.chars().collect();
                let start = (c1 as usize).min(chars.len());
                let end = (c2 as usize).min(chars.len()).max(start);
                chars[start..end].iter().collect()
            })
            .collect()
    }

    fn cursor_row(&self) -> u16 {
        self.current.lock().unwrap().cursor.0
    }

    fn cursor_col(&self) -> u16 {
        self.current.lock().unwrap().cursor.1
    }

    fn pump(&mut self, _timeout: Duration) -> Result<usize, HsmError> {
        let mut frames = self.frames.lock().unwrap();
        if frames.is_empty() {
            return Ok(0);
        }
        let next = frames.remove(0);
        let len: usize = next.rows.iter().map(|r| r.len()).sum();
        *self.current.lock().unwrap() = next;
        Ok(len.max(1))
    }
}

/// A [`TerminalFacade`] that delegates to a shared, cloneable
/// [`MockTerminal`], so a test can keep its own handle to inspect `sent()`
/// after handing the facade's ownership to an [`Automaton`]. `MockTerminal`
/// is already interior-mutable (every field is a `Mutex`), so the `&mut
/// self` the trait requires is never load-bearing here.
#[derive(Clone)]
pub struct SharedMockTerminal(pub Arc<MockTerminal>);

impl TerminalFacade for SharedMockTerminal {
    fn send(&mut self, bytes: &[u8]) -> Result<(), HsmError> {
        self.0.sent.lock().unwrap().push(bytes.to_vec());
        Ok(())
    }

    fn expect_delay(
        &mut self,
        _delay: Duration,
        _timeout: Duration,
        _resolution: Duration,
        require_input: usize,
    ) -> Result<(), HsmError> {
        if require_input > 0 && self.pump_shared()? == 0 {
            return Err(HsmError::Timeout);
        }
        Ok(())
    }

    fn expect_line_matching(&mut self, pattern: &Regex, lineno: u16, _timeout: Duration) -> Result<(), HsmError> {
        loop {
            let matched = if lineno > 0 {
                pattern.is_match(&self.0.dump_row(lineno - 1))
            } else {
                self.0.dump_rows().iter().any(|row| pattern.is_match(row))
            };
            if matched {
                return Ok(());
            }
            if self.pump_shared()? == 0 {
                return Err(HsmError::Timeout);
            }
        }
    }

    fn expect_cursor_position(
        &mut self,
        row: Option<u16>,
        column: Option<u16>,
        _timeout: Duration,
        _resolution: Duration,
    ) -> Result<(), HsmError> {
        loop {
            let row_ok = row.map(|r| r == self.0.cursor_row()).unwrap_or(true);
            let col_ok = column.map(|c| c == self.0.cursor_col()).unwrap_or(true);
            if row_ok && col_ok {
                return Ok(());
            }
            if self.pump_shared()? == 0 {
                return Err(HsmError::Timeout);
            }
        }
    }

    fn row_count(&self) -> u16 {
        self.0.row_count()
    }

    fn col_count(&self) -> u16 {
        self.0.col_count()
    }

    fn dump_row(&self, i: u16) -> String {
        self.0.dump_row(i)
    }

    fn dump_rows(&self) -> Vec<String> {
        self.0.dump_rows()
    }

    fn get_region(&self, r1: u16, c1: u16, r2: u16, c2: u16) -> Vec<String> {
        self.0.get_region(r1, c1, r2, c2)
    }

    fn cursor_row(&self) -> u16 {
        self.0.cursor_row()
    }

    fn cursor_col(&self) -> u16 {
        self.0.cursor_col()
    }

    fn pump(&mut self, _timeout: Duration) -> Result<usize, HsmError> {
        self.pump_shared()
    }
}

impl SharedMockTerminal {
    fn pump_shared(&self) -> Result<usize, HsmError> {
        let mut frames = self.0.frames.lock().unwrap();
        if frames.is_empty() {
            return Ok(0);
        }
        let next = frames.remove(0);
        let len: usize = next.rows.iter().map(|r| r.len()).sum();
        *self.0.current.lock().unwrap() = next;
        Ok(len.max(1))
    }
}

/// Build an [`Automaton`] wired to a [`SharedMockTerminal`] and an empty
/// [`ConfigTree`], returning both the automaton and a handle that can still
/// inspect `sent()`/queue frames after the automaton owns the facade.
pub fn mock_automaton_with_shared_terminal(
    units: Vec<BehaviorUnitRef>,
    cols: u16,
    rows: u16,
) -> (Automaton, Arc<MockTerminal>) {
    let handle = Arc::new(MockTerminal::new(cols, rows));
    let mut automaton = Automaton::new(
        units,
        Box::new(SharedMockTerminal(handle.clone())),
        ConfigTree::new(),
    );
    #[allow(clippy::expect_used)]
    automaton.compose(Vec::new()).expect("composing the base chain cannot fail");
    (automaton, handle)
}

/// Build an [`Automaton`] wired to a fresh [`MockTerminal`] and an empty
/// [`ConfigTree`], with `units` composed as its base chain.
pub fn mock_automaton(units: Vec<BehaviorUnitRef>, cols: u16, rows: u16) -> Automaton {
    let mut automaton =
        Automaton::new(units, Box::new(MockTerminal::new(cols, rows)), ConfigTree::new());
    #[allow(clippy::expect_used)]
    automaton.compose(Vec::new()).expect("composing the base chain cannot fail");
    automaton
}

/// Build an [`Automaton`] wired to a fresh [`MockTerminal`] and `config`,
/// with `units` composed as its base chain. For tests that need
/// `screens.*`/`os.*` config entries in place before the first iteration.
pub fn mock_automaton_with_config(
    units: Vec<BehaviorUnitRef>,
    config: ConfigTree,
    cols: u16,
    rows: u16,
) -> Automaton {
    let mut automaton = Automaton::new(units, Box::new(MockTerminal::new(cols, rows)), config);
    #[allow(clippy::expect_used)]
    automaton.compose(Vec::new()).expect("composing the base chain cannot fail");
    automaton
}

type HandlerFn = dyn Fn(&mut Automaton) -> Result<ControlSignal, HsmError> + Send + Sync;
type TransitionFn = dyn Fn(&mut Automaton, &[Arg]) -> Result<Option<StateData>, HsmError> + Send + Sync;

/// A [`BehaviorUnit`] built from closures instead of a dedicated struct, for
/// tests that need a one-off unit with a handful of handlers.
pub struct TestUnit {
    name: String,
    handlers: HashMap<String, Box<HandlerFn>>,
    transitions: HashMap<String, Box<TransitionFn>>,
    init_count: Arc<AtomicUsize>,
}

impl TestUnit {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            handlers: HashMap::new(),
            transitions: HashMap::new(),
            init_count: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Register a `do__`/`pre__`/`post__` handler under `key`.
    pub fn with_handler(
        mut self,
        key: &str,
        f: impl Fn(&mut Automaton) -> Result<ControlSignal, HsmError> + Send + Sync + 'static,
    ) -> Self {
        self.handlers.insert(key.to_string(), Box::new(f));
        self
    }

    /// Register a `transition__…__to__…` handler under `key`.
    pub fn with_transition(
        mut self,
        key: &str,
        f: impl Fn(&mut Automaton, &[Arg]) -> Result<Option<StateData>, HsmError> + Send + Sync + 'static,
    ) -> Self {
        self.transitions.insert(key.to_string(), Box::new(f));
        self
    }

    /// A shared counter incremented once per `initialize()` call, so tests
    /// can assert the initializer-once invariant.
    pub fn init_counter(&self) -> Arc<AtomicUsize> {
        self.init_count.clone()
    }

    pub fn build(self) -> BehaviorUnitRef {
        Arc::new(self)
    }
}

impl BehaviorUnit for TestUnit {
    fn name(&self) -> &str {
        &self.name
    }

    fn handler_keys(&self) -> Vec<String> {
        self.handlers.keys().cloned().collect()
    }

    fn transition_keys(&self) -> Vec<String> {
        self.transitions.keys().cloned().collect()
    }

    fn invoke_handler(&self, key: &str, automaton: &mut Automaton) -> Result<ControlSignal, HsmError> {
        (self.handlers.get(key).ok_or_else(|| HsmError::Other {
            detail: format!("{}: no handler registered for {key:?}", self.name),
        })?)(automaton)
    }

    fn invoke_transition(
        &self,
        key: &str,
        automaton: &mut Automaton,
        args: &[Arg],
    ) -> Result<Option<StateData>, HsmError> {
        (self.transitions.get(key).ok_or_else(|| HsmError::Other {
            detail: format!("{}: no transition registered for {key:?}", self.name),
        })?)(automaton, args)
    }

    fn initialize(&self, _automaton: &mut Automaton) -> Result<(), HsmError> {
        self.init_count.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
