// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The terminal I/O façade: `send`/`send_key`/`expect_*`/`screen_dump`
//! plus read access into the emulated screen, driving and observing a
//! child process over a pseudo-TTY.
//!
//! [`TerminalFacade`] is the narrow interface handlers need; they reach it
//! through `Automaton::terminal`. [`PtyTerminal`] is the production
//! implementation wired to a real child process; `crate::test_support`
//! carries a deterministic in-memory mock for unit tests that don't need a
//! real pty.

pub mod emulator;
pub mod keys;
pub mod nbio;
pub mod pty;

use std::io::Write;
use std::time::{Duration, Instant};

use regex::Regex;
use tracing::debug;

use crate::error::HsmError;
use emulator::Emulator;
use pty::PtyChild;

/// The narrow interface handlers need: send bytes/keys to the child,
/// block on screen conditions, and read back the emulated screen.
pub trait TerminalFacade: Send {
    /// Transmit raw bytes to the child.
    fn send(&mut self, bytes: &[u8]) -> Result<(), HsmError>;

    /// Block until no input has arrived for at least `delay`, bounded by
    /// `timeout`. If `require_input > 0`, first block until at least that
    /// many bytes have arrived. Polls at `resolution` intervals.
    fn expect_delay(
        &mut self,
        delay: Duration,
        timeout: Duration,
        resolution: Duration,
        require_input: usize,
    ) -> Result<(), HsmError>;

    /// Consume input until some row matches `pattern`; if `lineno > 0`,
    /// match only that row (1-indexed). Consumes the entire pending buffer
    /// on success.
    fn expect_line_matching(
        &mut self,
        pattern: &Regex,
        lineno: u16,
        timeout: Duration,
    ) -> Result<(), HsmError>;

    /// Poll until the cursor is at the stated row and/or column (an
    /// unspecified component acts as a wildcard).
    fn expect_cursor_position(
        &mut self,
        row: Option<u16>,
        column: Option<u16>,
        timeout: Duration,
        resolution: Duration,
    ) -> Result<(), HsmError>;

    fn row_count(&self) -> u16;
    fn col_count(&self) -> u16;
    fn dump_row(&self, i: u16) -> String;
    fn dump_rows(&self) -> Vec<String>;
    fn get_region(&self, r1: u16, c1: u16, r2: u16, c2: u16) -> Vec<String>;
    fn cursor_row(&self) -> u16;
    fn cursor_col(&self) -> u16;

    /// Pull any bytes that have arrived since the last call into the
    /// emulator, blocking up to `timeout` for the first chunk. Used
    /// internally by `expect_*`; exposed so callers can drain pending
    /// output without waiting on a specific condition.
    fn pump(&mut self, timeout: Duration) -> Result<usize, HsmError>;
}

/// Ruler-prefixed, line-numbered dump of `term`'s contents to `sink`,
/// ending with a cursor-position line.
pub fn screen_dump(term: &dyn TerminalFacade, sink: &mut dyn Write) -> Result<(), HsmError> {
    let cols = term.col_count() as usize;
    let tens: String =
        (0..cols).map(|n| if (n + 1) % 10 == 0 { char::from(b'0' + (((n + 1) / 10) % 10) as u8) } else { ' ' }).collect();
    let ones: String = "1234567890".chars().cycle().take(cols).collect();

    write_line(sink, &format!("   {tens}"))?;
    write_line(sink, &format!("   {ones}"))?;
    write_line(sink, &format!("   {}", "=".repeat(cols)))?;

    for (i, row) in term.dump_rows().iter().enumerate() {
        let rownum = i + 1;
        let tens_digit = if rownum % 10 == 0 { char::from(b'0' + ((rownum / 10) % 10) as u8) } else { ' ' };
        let ones_digit = char::from(b'0' + (rownum % 10) as u8);
        write_line(sink, &format!("{tens_digit}{ones_digit}|{row}"))?;
    }
    write_line(sink, &format!("Cursor pos: ({},{})", term.cursor_row(), term.cursor_col()))?;
    Ok(())
}

fn write_line(sink: &mut dyn Write, line: &str) -> Result<(), HsmError> {
    writeln!(sink, "{line}").map_err(|e| HsmError::Other { detail: e.to_string() })
}

/// Production [`TerminalFacade`] wired to a real child process: a pseudo-TTY
/// child ([`PtyChild`]) whose bytes are fed into an [`Emulator`].
pub struct PtyTerminal {
    child: PtyChild,
    emulator: Emulator,
}

impl PtyTerminal {
    pub fn spawn(command: &[String], cols: u16, rows: u16, term: &str) -> Result<Self, HsmError> {
        let child = PtyChild::spawn(command, cols, rows, term)?;
        Ok(Self { child, emulator: Emulator::new(cols, rows) })
    }

    pub fn resize(&mut self, cols: u16, rows: u16) {
        self.emulator.resize(cols, rows);
    }

    pub fn child_pid(&self) -> nix::unistd::Pid {
        self.child.pid()
    }
}

impl TerminalFacade for PtyTerminal {
    fn send(&mut self, bytes: &[u8]) -> Result<(), HsmError> {
        self.child.master.write_all(bytes)
    }

    fn expect_delay(
        &mut self,
        delay: Duration,
        timeout: Duration,
        resolution: Duration,
        require_input: usize,
    ) -> Result<(), HsmError> {
        let deadline = Instant::now() + timeout;
        let mut received = 0usize;

        if require_input > 0 {
            while received < require_input {
                if Instant::now() >= deadline {
                    return Err(HsmError::Timeout);
                }
                received += self.pump(resolution.min(remaining(deadline)))?;
            }
        }

        let mut quiet_since = Instant::now();
        loop {
            if Instant::now().duration_since(quiet_since) >= delay {
                return Ok(());
            }
            if Instant::now() >= deadline {
                return Err(HsmError::Timeout);
            }
            let got = self.pump(resolution.min(remaining(deadline)))?;
            if got > 0 {
                quiet_since = Instant::now();
            }
        }
    }

    fn expect_line_matching(
        &mut self,
        pattern: &Regex,
        lineno: u16,
        timeout: Duration,
    ) -> Result<(), HsmError> {
        let deadline = Instant::now() + timeout;
        loop {
            if row_matches(&self.emulator, pattern, lineno) {
                return Ok(());
            }
            if Instant::now() >= deadline {
                return Err(HsmError::Timeout);
            }
            self.pump(remaining(deadline).min(Duration::from_millis(50)))?;
        }
    }

    fn expect_cursor_position(
        &mut self,
        row: Option<u16>,
        column: Option<u16>,
        timeout: Duration,
        resolution: Duration,
    ) -> Result<(), HsmError> {
        let deadline = Instant::now() + timeout;
        loop {
            let row_ok = row.map(|r| r == self.emulator.cursor_row()).unwrap_or(true);
            let col_ok = column.map(|c| c == self.emulator.cursor_col()).unwrap_or(true);
            if row_ok && col_ok {
                return Ok(());
            }
            if Instant::now() >= deadline {
                return Err(HsmError::Timeout);
            }
            self.pump(resolution.min(remaining(deadline)))?;
        }
    }

    fn row_count(&self) -> u16 {
        self.emulator.row_count()
    }

    fn col_count(&self) -> u16 {
        self.emulator.col_count()
    }

    fn dump_row(&self, i: u16) -> String {
        self.emulator.dump_row(i)
    }

    fn dump_rows(&self) -> Vec<String> {
        self.emulator.dump_rows()
    }

    fn get_region(&self, r1: u16, c1: u16, r2: u16, c2: u16) -> Vec<String> {
        self.emulator.get_region(r1, c1, r2, c2)
    }

    fn cursor_row(&self) -> u16 {
        self.emulator.cursor_row()
    }

    fn cursor_col(&self) -> u16 {
        self.emulator.cursor_col()
    }

    fn pump(&mut self, timeout: Duration) -> Result<usize, HsmError> {
        let chunk = self.child.master.read_chunk(timeout)?;
        if !chunk.is_empty() {
            debug!(bytes = chunk.len(), "pty read");
            self.emulator.feed(&chunk);
        }
        Ok(chunk.len())
    }
}

fn remaining(deadline: Instant) -> Duration {
    deadline.saturating_duration_since(Instant::now())
}

fn row_matches(emulator: &Emulator, pattern: &Regex, lineno: u16) -> bool {
    if lineno > 0 {
        pattern.is_match(&emulator.dump_row(lineno - 1))
    } else {
        emulator.dump_rows().iter().any(|row| pattern.is_match(row))
    }
}
