// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The hierarchical config adapter: a tree of sections keyed by dotted
//! paths, with typed accessors and ordered enumeration.
//!
//! Sections nest over an [`indexmap::IndexMap`] so iteration order
//! matches insertion order, the same way `indexmap` is used elsewhere in
//! this crate for insertion-ordered collections.

use std::sync::OnceLock;

use indexmap::IndexMap;
use regex::Regex;

use crate::error::HsmError;

/// A leaf config value. Everything scalar is stored as a string and
/// decoded on read according to the accessor called (`get_bool`,
/// `get_int`, `get_float`, `get_escaped`). `List` covers the
/// `verify_*`/`redirect_*`/`data__*` screen-imaging entries, which are
/// list-valued rather than scalar; the command-line argument grammar only
/// ever produces `Leaf`s, so behavior units build `List` entries
/// programmatically via [`ConfigTree::set_list`].
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigValue {
    Leaf(String),
    List(Vec<String>),
    Section(ConfigTree),
}

/// A hierarchical, insertion-ordered key/value tree.
///
/// A path is a `.`-joined sequence of section names ending in an option
/// name, e.g. `"General.term"` or `"DISCONNECTED.redirect_1"`. Sections
/// nest arbitrarily; this crate's own usage never goes deeper than two
/// levels, but nothing in the type enforces that.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConfigTree {
    entries: IndexMap<String, ConfigValue>,
}

fn arg_grammar() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        #[allow(clippy::unwrap_used)]
        Regex::new(r"^(?:([A-Za-z0-9_]+(?:\.[A-Za-z0-9_]+)*)\.)?([A-Za-z0-9_]+)=(.*)$").unwrap()
    })
}

impl ConfigTree {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a tree from a list of `[SECTION[.SUBSECTION…].]OPTION=VALUE`
    /// strings, e.g. from trailing CLI arguments.
    pub fn from_argument_list<I, S>(args: I) -> Result<Self, HsmError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut tree = Self::new();
        tree.update_from_argument_list(args)?;
        Ok(tree)
    }

    /// Merge a list of `[SECTION[.SUBSECTION…].]OPTION=VALUE` strings into
    /// this tree, overwriting any existing value at the same path.
    /// Equivalent to `config_update_from_argument_list`.
    pub fn update_from_argument_list<I, S>(&mut self, args: I) -> Result<(), HsmError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for arg in args {
            let arg = arg.as_ref();
            let caps = arg_grammar()
                .captures(arg)
                .ok_or_else(|| HsmError::BadOptionFormat { arg: arg.to_string() })?;
            let section = caps.get(1).map(|m| m.as_str());
            let option = &caps[2];
            let value = &caps[3];
            self.set(section, option, value);
        }
        Ok(())
    }

    /// Set `section.option = value`, creating intermediate sections as
    /// needed. `section` may itself be dotted (`"A.B"`).
    pub fn set(&mut self, section: Option<&str>, option: &str, value: &str) {
        let node = match section {
            None => self,
            Some(path) => path.split('.').fold(self, |node, seg| node.child_mut(seg)),
        };
        node.entries.insert(option.to_string(), ConfigValue::Leaf(value.to_string()));
    }

    /// Set `section.option` to a list value (the shape every `screens.…`
    /// entry the screen-imaging pipeline reads takes), creating
    /// intermediate sections as needed.
    pub fn set_list(&mut self, section: Option<&str>, option: &str, value: Vec<String>) {
        let node = match section {
            None => self,
            Some(path) => path.split('.').fold(self, |node, seg| node.child_mut(seg)),
        };
        node.entries.insert(option.to_string(), ConfigValue::List(value));
    }

    /// Fetch a list-valued option. Returns `None` if the option exists but
    /// is not a list; `verify_*`/`redirect_*`/`data__*` values are always
    /// lists of 2+ elements.
    pub fn get_list(&self, section: Option<&str>, option: &str) -> Option<Vec<String>> {
        match self.resolve_section(section).and_then(|s| s.entries.get(option)) {
            Some(ConfigValue::List(items)) => Some(items.clone()),
            _ => None,
        }
    }

    fn child_mut(&mut self, name: &str) -> &mut ConfigTree {
        let entry = self
            .entries
            .entry(name.to_string())
            .or_insert_with(|| ConfigValue::Section(ConfigTree::new()));
        match entry {
            ConfigValue::Section(tree) => tree,
            ConfigValue::Leaf(_) => {
                *entry = ConfigValue::Section(ConfigTree::new());
                match entry {
                    ConfigValue::Section(tree) => tree,
                    ConfigValue::Leaf(_) => unreachable!(),
                }
            }
        }
    }

    fn resolve_section(&self, section: Option<&str>) -> Option<&ConfigTree> {
        match section {
            None => Some(self),
            Some(path) => {
                let mut node = self;
                for seg in path.split('.') {
                    match node.entries.get(seg) {
                        Some(ConfigValue::Section(tree)) => node = tree,
                        _ => return None,
                    }
                }
                Some(node)
            }
        }
    }

    /// True iff `section.option` (section may be `None` for the root) has
    /// a leaf value. Equivalent to `config_exists`.
    pub fn exists(&self, section: Option<&str>, option: &str) -> bool {
        matches!(
            self.resolve_section(section).and_then(|s| s.entries.get(option)),
            Some(ConfigValue::Leaf(_))
        )
    }

    /// Fetch a raw string value, falling back to `default` when absent.
    /// `default = None` and a missing key yields
    /// [`HsmError::KeyMissing`]; equivalent to `config_get` with no
    /// `default` argument.
    pub fn get(
        &self,
        section: Option<&str>,
        option: &str,
        default: Option<&str>,
    ) -> Result<String, HsmError> {
        match self.resolve_section(section).and_then(|s| s.entries.get(option)) {
            Some(ConfigValue::Leaf(value)) => Ok(value.clone()),
            _ => default.map(str::to_string).ok_or_else(|| HsmError::KeyMissing {
                section: section.unwrap_or("").to_string(),
                item: option.to_string(),
            }),
        }
    }

    pub fn get_bool(&self, section: Option<&str>, option: &str, default: Option<bool>) -> Result<bool, HsmError> {
        let raw = self.get(section, option, default.map(|b| if b { "true" } else { "false" }))?;
        Ok(matches!(raw.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on"))
    }

    pub fn get_int(&self, section: Option<&str>, option: &str, default: Option<i64>) -> Result<i64, HsmError> {
        let default_str = default.map(|v| v.to_string());
        let raw = self.get(section, option, default_str.as_deref())?;
        raw.trim()
            .parse()
            .map_err(|_| HsmError::BadOptionFormat { arg: format!("{option}={raw}") })
    }

    pub fn get_float(&self, section: Option<&str>, option: &str, default: Option<f64>) -> Result<f64, HsmError> {
        let default_str = default.map(|v| v.to_string());
        let raw = self.get(section, option, default_str.as_deref())?;
        raw.trim()
            .parse()
            .map_err(|_| HsmError::BadOptionFormat { arg: format!("{option}={raw}") })
    }

    /// Fetch a raw string value and decode backslash escapes in it
    /// (`\n`, `\r`, `\t`, `\0`, `\\`, `\xHH`); used for `os.endline` and
    /// `os.term_key_<K>`, which need their literal control bytes rather
    /// than the two-character escape sequence stored in config.
    pub fn get_escaped(
        &self,
        section: Option<&str>,
        option: &str,
        default: Option<&str>,
    ) -> Result<Vec<u8>, HsmError> {
        self.get(section, option, default).map(|raw| decode_escaped(&raw))
    }

    /// Enumerate every leaf option name in `section` whose name starts with
    /// `prefix`, in ascending numeric-suffix order when the remainder after
    /// `prefix` is an integer (e.g. `redirect_2` before `redirect_10`), then
    /// lexicographically for anything else. Equivalent to
    /// `config_get_items(section, prefix, sort=integer_sort_order)`.
    ///
    /// When `strip_prefix` is true, returned names have `prefix` removed.
    pub fn get_items(
        &self,
        section: Option<&str>,
        prefix: &str,
        strip_prefix: bool,
    ) -> Vec<(String, String)> {
        let Some(node) = self.resolve_section(section) else {
            return Vec::new();
        };
        let mut matches: Vec<(String, String)> = node
            .entries
            .iter()
            .filter_map(|(name, value)| match value {
                ConfigValue::Leaf(v) if name.starts_with(prefix) => Some((name.clone(), v.clone())),
                _ => None,
            })
            .collect();
        matches.sort_by(|(a, _), (b, _)| integer_sort_key(a, prefix).cmp(&integer_sort_key(b, prefix)));
        if strip_prefix {
            for (name, _) in matches.iter_mut() {
                *name = name[prefix.len()..].to_string();
            }
        }
        matches
    }

    /// Like [`ConfigTree::get_items`], but for list-valued options (the
    /// `verify_*`/`redirect_*`/`data__*` entries, each of which is a list
    /// rather than a scalar). Entries present as a plain `Leaf` are
    /// skipped rather than erroring, since a section may mix scalar and
    /// list options under the same prefix only by misconfiguration.
    pub fn get_list_items(
        &self,
        section: Option<&str>,
        prefix: &str,
        strip_prefix: bool,
    ) -> Vec<(String, Vec<String>)> {
        let Some(node) = self.resolve_section(section) else {
            return Vec::new();
        };
        let mut matches: Vec<(String, Vec<String>)> = node
            .entries
            .iter()
            .filter_map(|(name, value)| match value {
                ConfigValue::List(v) if name.starts_with(prefix) => Some((name.clone(), v.clone())),
                _ => None,
            })
            .collect();
        matches.sort_by(|(a, _), (b, _)| integer_sort_key(a, prefix).cmp(&integer_sort_key(b, prefix)));
        if strip_prefix {
            for (name, _) in matches.iter_mut() {
                *name = name[prefix.len()..].to_string();
            }
        }
        matches
    }
}

/// Sort key used by [`ConfigTree::get_items`]: `(0, n)` for a numeric
/// suffix after `prefix`, `(1, full_name)` otherwise, so e.g.
/// `redirect_2` sorts before `redirect_10`, and any non-numeric leftover
/// sorts after all numeric ones, lexicographically among themselves.
fn integer_sort_key(name: &str, prefix: &str) -> (u8, i64, String) {
    let suffix = &name[prefix.len()..];
    match suffix.parse::<i64>() {
        Ok(n) => (0, n, String::new()),
        Err(_) => (1, 0, name.to_string()),
    }
}

/// Decode `\n`/`\r`/`\t`/`\0`/`\\`/`\xHH` escapes in `raw`, leaving any
/// other backslash sequence as a literal backslash followed by the next
/// character.
fn decode_escaped(raw: &str) -> Vec<u8> {
    let bytes = raw.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] != b'\\' || i + 1 >= bytes.len() {
            out.push(bytes[i]);
            i += 1;
            continue;
        }
        match bytes[i + 1] {
            b'n' => {
                out.push(b'\n');
                i += 2;
            }
            b'r' => {
                out.push(b'\r');
                i += 2;
            }
            b't' => {
                out.push(b'\t');
                i += 2;
            }
            b'0' => {
                out.push(0);
                i += 2;
            }
            b'\\' => {
                out.push(b'\\');
                i += 2;
            }
            b'x' if i + 3 < bytes.len() => {
                let hex = std::str::from_utf8(&bytes[i + 2..i + 4]).unwrap_or("");
                match u8::from_str_radix(hex, 16) {
                    Ok(byte) => {
                        out.push(byte);
                        i += 4;
                    }
                    Err(_) => {
                        out.push(bytes[i]);
                        i += 1;
                    }
                }
            }
            other => {
                out.push(b'\\');
                out.push(other);
                i += 2;
            }
        }
    }
    out
}

/// Named defaults for the well-known top-level config keys:
/// `General.term` is `"ANSI"` and `General.settle_time` is `0.5` seconds
/// unless overridden.
pub mod defaults {
    pub const TERM: &str = "ANSI";
    pub const SETTLE_TIME: f64 = 0.5;
    pub const DUMP_SCREEN: bool = false;
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod config_tests;
