// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The screen-imaging pipeline: settle, optionally dump, verify,
//! redirect, then capture — keyed off `(origin-unit, current-state,
//! substate)` configuration.
//!
//! The handler currently executing carries its own identity on
//! [`crate::engine::CurrentHandler`], read via
//! [`Automaton::current_handler`], so the config path for a given screen
//! never has to be threaded through as an argument.

use regex::Regex;
use tracing::debug;

use crate::config::defaults;
use crate::engine::Automaton;
use crate::error::HsmError;

/// Default `timeout`/`resolution` for the pipeline's settle step, which
/// (unlike `verify_*`) has no per-screen override.
const SETTLE_TIMEOUT_SECS: f64 = 30.0;
const SETTLE_RESOLUTION_SECS: f64 = 0.25;

/// Wait for the screen to settle, then verify/redirect/capture against the
/// config section for the handler currently executing.
///
/// `settle_time` defaults to `General.settle_time` (spec default `0.5`);
/// `substate` defaults to `"default"` at call sites that don't need a
/// distinct screen within the same state.
pub fn image_screen(
    automaton: &mut Automaton,
    expect_updates: bool,
    settle_time: Option<f64>,
    substate: &str,
) -> Result<(), HsmError> {
    let current = automaton.current_handler().ok_or_else(|| HsmError::Other {
        detail: "image_screen invoked with no handler currently executing".to_string(),
    })?;
    let origin_unit = current.origin_unit.clone();
    let current_state = current.state.as_str().to_string();

    let settle_time = match settle_time {
        Some(t) => t,
        None => automaton.config.get_float(Some("General"), "settle_time", Some(defaults::SETTLE_TIME))?,
    };

    let section = format!("screens.{origin_unit}.{current_state}.{substate}");

    settle(automaton, settle_time, expect_updates)?;
    maybe_dump(automaton)?;
    verify(automaton, &section, settle_time)?;
    if let Some(target) = redirect(automaton, &section, settle_time)? {
        return image_screen(automaton, false, Some(settle_time), &target);
    }
    capture(automaton, &origin_unit, &current_state, substate)?;
    Ok(())
}

fn settle(automaton: &mut Automaton, settle_time: f64, expect_updates: bool) -> Result<(), HsmError> {
    automaton.terminal.expect_delay(
        std::time::Duration::from_secs_f64(settle_time),
        std::time::Duration::from_secs_f64(SETTLE_TIMEOUT_SECS),
        std::time::Duration::from_secs_f64(SETTLE_RESOLUTION_SECS),
        usize::from(expect_updates),
    )
}

fn maybe_dump(automaton: &mut Automaton) -> Result<(), HsmError> {
    if automaton.config.get_bool(Some("General"), "dump_screen", Some(defaults::DUMP_SCREEN))? {
        let mut buf = Vec::new();
        crate::terminal::screen_dump(automaton.terminal.as_ref(), &mut buf)?;
        eprint!("{}", String::from_utf8_lossy(&buf));
    }
    Ok(())
}

/// Enumerate `verify_*` entries under `section` and block on each in turn.
/// Enumeration order is not observable behavior; each entry's value is
/// `[lineno, pattern]` or `[lineno, pattern, timeout]`.
fn verify(automaton: &mut Automaton, section: &str, settle_time: f64) -> Result<(), HsmError> {
    for (name, value) in automaton.config.get_list_items(Some(section), "verify_", false) {
        debug!(name, ?value, "validating verify clause");
        if value.len() != 2 && value.len() != 3 {
            return Err(malformed(&name, "must have 2 or 3 elements"));
        }
        let lineno = parse_u16(&name, &value[0])?;
        let pattern = Regex::new(&value[1]).map_err(|e| HsmError::Other { detail: e.to_string() })?;
        let timeout = if value.len() == 3 { parse_f64(&name, &value[2])? } else { settle_time };
        automaton.terminal.expect_line_matching(
            &pattern,
            lineno,
            std::time::Duration::from_secs_f64(timeout),
        )?;
    }
    Ok(())
}

/// Enumerate `redirect_*` entries under `section` in ascending numeric-suffix
/// order and return the substate to recurse into, if any fires. Processing
/// stops at the first redirect that fires.
fn redirect(automaton: &mut Automaton, section: &str, _settle_time: f64) -> Result<Option<String>, HsmError> {
    for (name, value) in automaton.config.get_list_items(Some(section), "redirect_", true) {
        debug!(name, ?value, "processing redirect");
        let kind = value.first().map(String::as_str).unwrap_or_default();
        match kind {
            "regex" => {
                if value.len() != 6 {
                    return Err(malformed(&name, "regex redirect needs 6 elements"));
                }
                let lineno = parse_u16(&name, &value[1])?;
                let startcol = parse_u16(&name, &value[2])?;
                let length = parse_u16(&name, &value[3])?;
                let re = Regex::new(&value[4]).map_err(|e| HsmError::Other { detail: e.to_string() })?;
                let row = lineno.saturating_sub(1);
                let text = automaton
                    .terminal
                    .get_region(row, startcol, row, startcol.saturating_add(length))
                    .into_iter()
                    .next()
                    .unwrap_or_default();
                if re.is_match(&text) {
                    return Ok(Some(value[5].clone()));
                }
            }
            "always" => {
                if value.len() != 2 {
                    return Err(malformed(&name, "always redirect needs 2 elements"));
                }
                return Ok(Some(value[1].clone()));
            }
            "error" => {
                return Err(HsmError::RedirectedToError { args: value[1..].to_vec() });
            }
            other => return Err(HsmError::UnknownRedirectKind { kind: other.to_string() }),
        }
    }
    Ok(None)
}

/// Walk the `inherit_from` chain, capturing `data__*` entries at each step
/// into the per-origin-unit captured-data dictionary. The `substate`
/// segment of the config path never changes across the chain — only
/// `current_state` does.
fn capture(
    automaton: &mut Automaton,
    origin_unit: &str,
    current_state: &str,
    substate: &str,
) -> Result<(), HsmError> {
    let mut state = current_state.to_string();
    loop {
        let path = format!("screens.{origin_unit}.{state}.{substate}");
        debug!(path, "evaluating captures");
        for (name, value) in automaton.config.get_list_items(Some(&path), "data__", true) {
            let captured = match value.first().map(String::as_str).unwrap_or_default() {
                "fixedpos" => {
                    if value.len() != 5 {
                        return Err(malformed(&name, "fixedpos capture needs 5 elements"));
                    }
                    let lineno = parse_u16(&name, &value[1])?;
                    let startcol = parse_u16(&name, &value[2])?;
                    let length = parse_u16(&name, &value[3])?;
                    let strip = parse_u16(&name, &value[4])? != 0;
                    let row = lineno.saturating_sub(1);
                    let text = automaton
                        .terminal
                        .get_region(row, startcol, row, startcol.saturating_add(length))
                        .into_iter()
                        .next()
                        .unwrap_or_default();
                    if strip { text.trim().to_string() } else { text }
                }
                other => return Err(HsmError::UnknownDataKind { kind: other.to_string() }),
            };
            automaton.captured_data_mut(origin_unit).insert(name, captured);
        }
        if !automaton.config.exists(Some(&path), "inherit_from") {
            break;
        }
        state = automaton.config.get(Some(&path), "inherit_from", None)?;
    }
    Ok(())
}

fn malformed(name: &str, why: &str) -> HsmError {
    HsmError::Other { detail: format!("{name}: {why}") }
}

fn parse_u16(name: &str, raw: &str) -> Result<u16, HsmError> {
    raw.trim().parse().map_err(|_| malformed(name, &format!("expected an integer, got {raw:?}")))
}

fn parse_f64(name: &str, raw: &str) -> Result<f64, HsmError> {
    raw.trim().parse().map_err(|_| malformed(name, &format!("expected a number, got {raw:?}")))
}

#[cfg(test)]
#[path = "imaging_tests.rs"]
mod imaging_tests;
