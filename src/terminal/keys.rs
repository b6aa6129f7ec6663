// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The fixed key table: symbolic key names to the byte sequences a
//! VT100/ANSI terminal expects for them.

/// `(name, bytes)` pairs for every built-in key `send_key` understands
/// without a config override. `F1`..`F7` are bare control codes
/// (`0x01`..`0x07`), not the xterm CSI sequences — only `F8`..`F12`
/// assume that level of terminfo support.
pub const BUILTIN_KEYS: &[(&str, &[u8])] = &[
    ("ESC", b"\x1b"),
    ("UP", b"\x1bOA"),
    ("DOWN", b"\x1bOB"),
    ("RIGHT", b"\x1bOC"),
    ("LEFT", b"\x1bOD"),
    ("F1", b"\x01"),
    ("F2", b"\x02"),
    ("F3", b"\x03"),
    ("F4", b"\x04"),
    ("F5", b"\x05"),
    ("F6", b"\x06"),
    ("F7", b"\x07"),
    ("F8", b"\x1b[19~"),
    ("F9", b"\x1b[20~"),
    ("F10", b"\x1b[21~"),
    ("F11", b"\x1b[23~"),
    ("F12", b"\x1b[24~"),
];

/// Look up a key's byte sequence by name.
pub fn lookup(name: &str) -> Option<&'static [u8]> {
    BUILTIN_KEYS.iter().find(|(n, _)| *n == name).map(|(_, bytes)| *bytes)
}

#[cfg(test)]
#[path = "keys_tests.rs"]
mod keys_tests;
