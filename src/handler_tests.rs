// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn exit_signal_new_has_no_state_change() {
    let exit = ExitSignal::new(7);
    assert_eq!(exit.retval, 7);
    assert!(exit.new_state.is_none());
    assert!(exit.new_state_data.is_none());
}

#[test]
fn exit_signal_with_state_attaches_name_and_data() {
    let state = StateName::parse("DONE").unwrap();
    let data: StateData = std::sync::Arc::new("payload".to_string());
    let exit = ExitSignal::new(0).with_state(state.clone(), Some(data));
    assert_eq!(exit.new_state, Some(state));
    assert!(exit.new_state_data.is_some());
}

#[test]
fn handler_kind_display_matches_prefix() {
    assert_eq!(HandlerKind::Do.to_string(), "do");
    assert_eq!(HandlerKind::Pre.to_string(), "pre");
    assert_eq!(HandlerKind::Post.to_string(), "post");
}

/// A minimal in-test behavior unit, used to exercise the trait's default
/// `initialize` and the `BehaviorUnitRef` object-safety contract.
struct NoopUnit;

impl BehaviorUnit for NoopUnit {
    fn name(&self) -> &str {
        "noop"
    }

    fn handler_keys(&self) -> Vec<String> {
        vec!["do__FOO".to_string()]
    }

    fn transition_keys(&self) -> Vec<String> {
        Vec::new()
    }

    fn invoke_handler(
        &self,
        _key: &str,
        _automaton: &mut Automaton,
    ) -> Result<ControlSignal, HsmError> {
        Ok(ControlSignal::Return(ReturnValue::None))
    }

    fn invoke_transition(
        &self,
        _key: &str,
        _automaton: &mut Automaton,
        _args: &[Arg],
    ) -> Result<Option<StateData>, HsmError> {
        Ok(None)
    }
}

#[test]
fn unit_ref_is_object_safe_and_reports_its_declared_keys() {
    let unit: BehaviorUnitRef = std::sync::Arc::new(NoopUnit);
    assert_eq!(unit.name(), "noop");
    assert_eq!(unit.handler_keys(), vec!["do__FOO".to_string()]);
    assert!(unit.transition_keys().is_empty());
}
