// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn feed_plain_text_lands_on_first_row() {
    let mut emu = Emulator::new(20, 5);
    emu.feed(b"hello world");
    assert!(emu.dump_row(0).starts_with("hello world"));
}

#[test]
fn cursor_advances_after_feeding_text() {
    let mut emu = Emulator::new(20, 5);
    emu.feed(b"abc");
    assert_eq!(emu.cursor_row(), 0);
    assert_eq!(emu.cursor_col(), 3);
}

#[test]
fn newline_moves_cursor_to_next_row() {
    let mut emu = Emulator::new(20, 5);
    emu.feed(b"abc\r\ndef");
    assert_eq!(emu.cursor_row(), 1);
    assert_eq!(emu.cursor_col(), 3);
    assert!(emu.dump_row(0).starts_with("abc"));
    assert!(emu.dump_row(1).starts_with("def"));
}

#[test]
fn get_region_slices_a_single_row_by_column() {
    let mut emu = Emulator::new(20, 5);
    emu.feed(b"0123456789");
    let region = emu.get_region(0, 2, 0, 5);
    assert_eq!(region, vec!["234".to_string()]);
}

#[test]
fn get_region_spans_multiple_rows() {
    let mut emu = Emulator::new(20, 5);
    emu.feed(b"aaaaa\r\nbbbbb\r\nccccc");
    let region = emu.get_region(0, 0, 2, 3);
    assert_eq!(region, vec!["aaa".to_string(), "bbb".to_string(), "ccc".to_string()]);
}

#[test]
fn row_count_and_col_count_reflect_construction_size() {
    let emu = Emulator::new(40, 10);
    assert_eq!(emu.col_count(), 40);
    assert_eq!(emu.row_count(), 10);
}

#[test]
fn resize_updates_row_and_col_count() {
    let mut emu = Emulator::new(20, 5);
    emu.resize(10, 3);
    assert_eq!(emu.col_count(), 10);
    assert_eq!(emu.row_count(), 3);
}

#[test]
fn split_utf8_sequence_across_two_feeds_renders_correctly() {
    let mut emu = Emulator::new(20, 5);
    let bytes = "caf\u{e9}".as_bytes().to_vec(); // "café"
    let (first, second) = bytes.split_at(bytes.len() - 1);
    emu.feed(first);
    emu.feed(second);
    assert!(emu.dump_row(0).starts_with("caf\u{e9}"));
}

#[test]
fn dump_rows_returns_one_entry_per_row() {
    let emu = Emulator::new(20, 4);
    assert_eq!(emu.dump_rows().len(), 4);
}
