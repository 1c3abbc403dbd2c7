use lockstep_types::{Action, Reducer};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CounterState {
    pub count: i64,
}

impl CounterState {
    pub fn new(count: i64) -> Self {
        Self { count }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "camelCase")]
pub enum CounterAction {
    Increment,
    Decrement,
    Change(i64),
    IncrementBy(i64),
    /// Any action type this reducer does not know.
    #[serde(other)]
    Unknown,
}

impl Action for CounterAction {
    fn kind(&self) -> &str {
        match self {
            CounterAction::Increment => "increment",
            CounterAction::Decrement => "decrement",
            CounterAction::Change(_) => "change",
            CounterAction::IncrementBy(_) => "incrementBy",
            CounterAction::Unknown => "unknown",
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct CounterReducer;

impl Reducer for CounterReducer {
    type State = CounterState;
    type Action = CounterAction;

    fn reduce(&self, state: &CounterState, action: &CounterAction) -> CounterState {
        match action {
            CounterAction::Increment => CounterState::new(state.count + 1),
            CounterAction::Decrement => CounterState::new(state.count - 1),
            CounterAction::Change(count) => CounterState::new(*count),
            CounterAction::IncrementBy(by) => CounterState::new(state.count + by),
            CounterAction::Unknown => *state,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn wire_shape_is_type_and_payload() {
        let value = serde_json::to_value(CounterAction::IncrementBy(3)).unwrap();
        assert_eq!(value, json!({"type": "incrementBy", "payload": 3}));

        let parsed: CounterAction = serde_json::from_value(json!({"type": "change", "payload": 5})).unwrap();
        assert_eq!(parsed, CounterAction::Change(5));
    }

    #[test]
    fn foreign_actions_leave_state_unchanged() {
        let parsed: CounterAction = serde_json::from_value(json!({"type": "somethingElse"})).unwrap();
        assert_eq!(parsed, CounterAction::Unknown);
        assert_eq!(CounterReducer.reduce(&CounterState::new(4), &parsed), CounterState::new(4));
    }

    #[test]
    fn arithmetic() {
        let reducer = CounterReducer;
        let state = CounterState::default();
        let state = reducer.reduce(&state, &CounterAction::Increment);
        let state = reducer.reduce(&state, &CounterAction::IncrementBy(10));
        let state = reducer.reduce(&state, &CounterAction::Decrement);
        assert_eq!(state.count, 10);
        assert_eq!(reducer.reduce(&state, &CounterAction::Change(-2)).count, -2);
    }
}
