// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! State-name grammar, candidate generation, and substate queries.

use std::fmt;
use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::HsmError;
use crate::handler::HandlerKind;

fn grammar() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        #[allow(clippy::unwrap_used)]
        Regex::new(r"^[A-Z][A-Z0-9_]+(__[A-Z][A-Z0-9_]+)*$").unwrap()
    })
}

/// A structured, hierarchical state name: UPPERCASE segments joined by `__`.
///
/// `A__B__C` is a substate of `A__B` and of `A`. Internally this keeps the
/// canonical string around (it is what config lookups and diagnostics need)
/// but treats the segment list as the first-class value for resolver and
/// substate logic.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct StateName(String);

impl StateName {
    /// Validate and wrap a state name. Fails with
    /// [`HsmError::InvalidStateName`] unless the full grammar matches.
    pub fn parse(name: impl Into<String>) -> Result<Self, HsmError> {
        let name = name.into();
        if grammar().is_match(&name) {
            Ok(Self(name))
        } else {
            Err(HsmError::InvalidStateName { name })
        }
    }

    /// The canonical string form, e.g. `"FOO__BAR__BAZ"`.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The `__`-separated segments, e.g. `["FOO", "BAR", "BAZ"]`.
    pub fn segments(&self) -> Vec<&str> {
        self.0.split("__").collect()
    }

    /// Every proper, non-empty prefix of the segment list, longest first,
    /// rejoined with `__`. Excludes the full name itself.
    pub fn proper_prefixes(&self) -> Vec<String> {
        let segments = self.segments();
        (1..segments.len()).rev().map(|n| segments[..n].join("__")).collect()
    }

    /// True iff `child` is `self` or begins with `self + "__"`.
    pub fn is_substate(&self, child: &StateName) -> bool {
        is_substate(self.as_str(), child.as_str())
    }

    /// Append a literal suffix segment, producing e.g. `FOO__BAR__UNKNOWN`
    /// from `FOO__BAR` and `"UNKNOWN"`. The suffix must itself be a valid
    /// segment; this is used by the engine's `NonFatal` diversion, which
    /// always appends a fixed, known-good suffix.
    pub fn with_suffix(&self, suffix: &str) -> Result<StateName, HsmError> {
        StateName::parse(format!("{}__{suffix}", self.0))
    }

    /// Build a `StateName` from a literal the caller guarantees already
    /// matches the grammar (e.g. the fixed `"INITIAL_STATE"`/`"INVALID"`
    /// constants), without paying for `unwrap`/`expect` at the call site.
    /// Debug builds assert the grammar still holds.
    pub(crate) fn new_unchecked(name: &'static str) -> Self {
        debug_assert!(grammar().is_match(name), "invalid literal state name: {name}");
        Self(name.to_string())
    }
}

impl fmt::Display for StateName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for StateName {
    type Error = HsmError;
    fn try_from(value: String) -> Result<Self, Self::Error> {
        StateName::parse(value)
    }
}

impl From<StateName> for String {
    fn from(value: StateName) -> Self {
        value.0
    }
}

/// True iff `child == parent` or `child` begins with `parent + "__"`.
///
/// Operates on raw strings (rather than requiring two parsed
/// [`StateName`]s) so callers in the resolver can test candidate fragments
/// that are not themselves full state names.
pub fn is_substate(parent: &str, child: &str) -> bool {
    if parent == child {
        return true;
    }
    child.len() > parent.len()
        && child.as_bytes()[parent.len()..].starts_with(b"__")
        && &child[..parent.len()] == parent
}

/// Enumerate, in priority order, the candidate handler names for `state`
/// and `kind`:
///
/// 1. `kind__<state>`
/// 2. for each proper prefix `P` of `state` (longest first): `kind__P__default`
/// 3. `kind__default`
pub fn candidate_handlers(state: &StateName, kind: HandlerKind) -> Vec<String> {
    let mut out = Vec::with_capacity(state.segments().len() + 1);
    out.push(format!("{kind}__{state}"));
    for prefix in state.proper_prefixes() {
        out.push(format!("{kind}__{prefix}__default"));
    }
    out.push(format!("{kind}__default"));
    out
}

/// Enumerate, in priority order, the candidate transition-helper names for
/// moving from `from_state` to `to_state`:
///
/// 1. `transition__<from>__to__<to>`
/// 2. for each proper prefix `P` of `from` (longest first):
///    `transition__P__default__to__<to>`
/// 3. `transition__default__to__<to>`
pub fn candidate_transitions(from_state: &StateName, to_state: &StateName) -> Vec<String> {
    let mut out = Vec::with_capacity(from_state.segments().len() + 1);
    out.push(format!("transition__{from_state}__to__{to_state}"));
    for prefix in from_state.proper_prefixes() {
        out.push(format!("transition__{prefix}__default__to__{to_state}"));
    }
    out.push(format!("transition__default__to__{to_state}"));
    out
}

#[cfg(test)]
#[path = "name_tests.rs"]
mod name_tests;
