//! Core traits for the state engine.

use std::sync::Arc;

use anyhow::Result;

use crate::pipeline::Next;

/// Actions carry a type string identifying the intended transition.
pub trait ActionLike: Send + Sync + 'static {
    /// The discriminant used in logs and errors. Reducers are free to match
    /// on richer structure; the engine never validates it.
    fn action_type(&self) -> String;
}

/// Tagged JSON records, e.g. `{"type": "INCREMENT", "by": 2}`.
///
/// A record without a string `type` field reports an empty discriminant.
impl ActionLike for serde_json::Value {
    fn action_type(&self) -> String {
        self.get("type")
            .and_then(serde_json::Value::as_str)
            .unwrap_or_default()
            .to_string()
    }
}

/// Pure state transition. Must not mutate its input.
///
/// Errors propagate out of `dispatch` and nothing is committed.
pub trait Reducer<S, A>: Send + Sync {
    fn reduce(&self, state: &S, action: &A) -> Result<S>;
}

impl<S, A, F> Reducer<S, A> for F
where
    F: Fn(&S, &A) -> Result<S> + Send + Sync,
{
    fn reduce(&self, state: &S, action: &A) -> Result<S> {
        self(state, action)
    }
}

/// Wraps the reducer pipeline.
///
/// `next` is the pipeline as composed before this middleware was registered.
/// A middleware may call it any number of times (including zero) and may
/// replace its result.
pub trait Middleware<S, A>: Send + Sync {
    fn handle(&self, state: &S, action: &A, next: Next<'_, S, A>) -> Result<S>;
}

impl<S, A, F> Middleware<S, A> for F
where
    F: Fn(&S, &A, Next<'_, S, A>) -> Result<S> + Send + Sync,
{
    fn handle(&self, state: &S, action: &A, next: Next<'_, S, A>) -> Result<S> {
        self(state, action, next)
    }
}

/// Inspects committed state and may demand one corrective action.
///
/// Evaluated for its decision only. The returned action must remove the
/// condition that selected it, otherwise the reactor keeps firing.
pub trait Reactor<S, A>: Send + Sync {
    fn react(&self, state: &S) -> Option<A>;
}

impl<S, A, F> Reactor<S, A> for F
where
    F: Fn(&S) -> Option<A> + Send + Sync,
{
    fn react(&self, state: &S) -> Option<A> {
        self(state)
    }
}

/// Binding-layer hook called once per commit with the new state.
pub trait Subscriber<S>: Send + Sync {
    fn on_commit(&self, state: &Arc<S>);
}

impl<S, F> Subscriber<S> for F
where
    F: Fn(&Arc<S>) + Send + Sync,
{
    fn on_commit(&self, state: &Arc<S>) {
        self(state)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn json_action_type_reads_type_field() {
        assert_eq!(json!({"type": "INCREMENT", "by": 2}).action_type(), "INCREMENT");
    }

    #[test]
    fn json_action_without_discriminant_is_empty() {
        assert_eq!(json!({"payload": 1}).action_type(), "");
        assert_eq!(json!({"type": 7}).action_type(), "");
        assert_eq!(json!("INCREMENT").action_type(), "");
    }
}
