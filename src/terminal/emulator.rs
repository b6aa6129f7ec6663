// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The VT100/ANSI emulator: cursor tracking and row dumps over an
//! `avt::Vt`, fed with bytes read from the child.
//!
//! Wraps `avt::Vt` with UTF-8 chunk-boundary buffering, since the child
//! may write a multi-byte sequence split across two reads; only
//! `feed`/`view`/`cursor` are needed here.

pub struct Emulator {
    vt: avt::Vt,
    /// Buffer for incomplete UTF-8 trailing bytes between `feed()` calls,
    /// since the child may write multi-byte sequences split across reads.
    utf8_buf: Vec<u8>,
}

impl Emulator {
    pub fn new(cols: u16, rows: u16) -> Self {
        Self { vt: avt::Vt::new(cols as usize, rows as usize), utf8_buf: Vec::new() }
    }

    /// Feed raw bytes read from the child into the virtual terminal.
    pub fn feed(&mut self, data: &[u8]) {
        if data.is_empty() {
            return;
        }
        let mut input = std::mem::take(&mut self.utf8_buf);
        input.extend_from_slice(data);

        let tail = incomplete_utf8_tail_len(&input);
        let split_at = input.len() - tail;
        let to_buffer = input[split_at..].to_vec();
        input.truncate(split_at);

        if !input.is_empty() {
            let s = String::from_utf8_lossy(&input);
            let _ = self.vt.feed_str(&s);
        }
        self.utf8_buf = to_buffer;
    }

    pub fn row_count(&self) -> u16 {
        self.vt.size().1 as u16
    }

    pub fn col_count(&self) -> u16 {
        self.vt.size().0 as u16
    }

    pub fn cursor_row(&self) -> u16 {
        self.vt.cursor().row as u16
    }

    pub fn cursor_col(&self) -> u16 {
        self.vt.cursor().col as u16
    }

    /// The full text of row `i` (0-indexed), trailing whitespace preserved —
    /// callers needing a region slice it themselves by column.
    pub fn dump_row(&self, i: u16) -> String {
        self.vt.view().nth(i as usize).map(|line| line.text()).unwrap_or_default()
    }

    pub fn dump_rows(&self) -> Vec<String> {
        self.vt.view().map(|line| line.text()).collect()
    }

    /// `(r1, c1)..(r2, c2)` inclusive of `r1..=r2`, each row's slice spanning
    /// `c1..c2` (both 0-indexed, `c2` exclusive). A row shorter than `c2`
    /// yields whatever characters exist.
    pub fn get_region(&self, r1: u16, c1: u16, r2: u16, c2: u16) -> Vec<String> {
        (r1..=r2)
            .map(|row| {
                let text = self.dump_row(row);
                let chars: Vec<char> = text.chars().collect();
                let start = (c1 as usize).min(chars.len());
                let end = (c2 as usize).min(chars.len()).max(start);
                chars[start..end].iter().collect()
            })
            .collect()
    }

    pub fn resize(&mut self, cols: u16, rows: u16) {
        let _ = self.vt.resize(cols as usize, rows as usize);
    }
}

/// Returns the number of trailing bytes in `data` that form an incomplete
/// UTF-8 sequence, so they can be buffered and prepended to the next feed.
fn incomplete_utf8_tail_len(data: &[u8]) -> usize {
    let len = data.len();
    for i in 1..=len.min(3) {
        let byte = data[len - i];
        if byte < 0x80 {
            return 0;
        }
        if byte >= 0xC0 {
            let expected = if byte < 0xE0 {
                2
            } else if byte < 0xF0 {
                3
            } else {
                4
            };
            return if i < expected { i } else { 0 };
        }
    }
    0
}

#[cfg(test)]
#[path = "emulator_tests.rs"]
mod emulator_tests;
