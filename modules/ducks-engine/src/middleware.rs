//! Standard middleware: transition logging and state persistence.

use std::fmt::Debug;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use anyhow::Result;
use chrono::{DateTime, Utc};
use tracing::{info, trace};

use crate::pipeline::Next;
use crate::traits::{ActionLike, Middleware};

// ---------------------------------------------------------------------------
// Transition sinks
// ---------------------------------------------------------------------------

/// Receives the before/after record of each transition seen by
/// [`LoggerMiddleware`].
pub trait TransitionSink<S, A>: Send + Sync {
    /// Called before the inner pipeline runs.
    fn before(&self, _prior: &S, _action: &A) {}

    /// Called after the inner pipeline returned successfully.
    fn record(&self, prior: &S, action: &A, next: &S);
}

/// Emits transitions as `tracing` events under the `ducks::dispatch` target.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl<S, A> TransitionSink<S, A> for TracingSink
where
    S: Debug,
    A: ActionLike + Debug,
{
    fn before(&self, prior: &S, action: &A) {
        trace!(
            target: "ducks::dispatch",
            action_type = action.action_type().as_str(),
            state = ?prior,
            action = ?action,
            "Dispatch"
        );
    }

    fn record(&self, prior: &S, action: &A, next: &S) {
        info!(
            target: "ducks::dispatch",
            action_type = action.action_type().as_str(),
            state = ?prior,
            action = ?action,
            next_state = ?next,
            "Dispatch"
        );
    }
}

/// A transition captured by [`MemoryTransitionSink`].
#[derive(Debug, Clone, PartialEq)]
pub struct Transition<S, A> {
    pub seq: u64,
    pub ts: DateTime<Utc>,
    pub prior: S,
    pub action: A,
    pub next: S,
}

/// In-memory sink for tests. Records every completed transition with an
/// incrementing sequence number. Thread-safe.
pub struct MemoryTransitionSink<S, A> {
    next_seq: AtomicU64,
    transitions: Mutex<Vec<Transition<S, A>>>,
}

impl<S: Clone, A: Clone> MemoryTransitionSink<S, A> {
    pub fn new() -> Self {
        Self {
            next_seq: AtomicU64::new(1),
            transitions: Mutex::new(Vec::new()),
        }
    }

    /// Read all recorded transitions (for test assertions).
    pub fn transitions(&self) -> Vec<Transition<S, A>> {
        self.transitions.lock().unwrap().clone()
    }
}

impl<S: Clone, A: Clone> Default for MemoryTransitionSink<S, A> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S, A> TransitionSink<S, A> for MemoryTransitionSink<S, A>
where
    S: Clone + Send + Sync,
    A: Clone + Send + Sync,
{
    fn record(&self, prior: &S, action: &A, next: &S) {
        let seq = self.next_seq.fetch_add(1, Ordering::SeqCst);
        self.transitions.lock().unwrap().push(Transition {
            seq,
            ts: Utc::now(),
            prior: prior.clone(),
            action: action.clone(),
            next: next.clone(),
        });
    }
}

// Arc<K> blanket — lets tests keep a handle on the sink for assertions.
impl<S, A, K> TransitionSink<S, A> for Arc<K>
where
    K: TransitionSink<S, A> + ?Sized,
{
    fn before(&self, prior: &S, action: &A) {
        (**self).before(prior, action)
    }

    fn record(&self, prior: &S, action: &A, next: &S) {
        (**self).record(prior, action, next)
    }
}

// ---------------------------------------------------------------------------
// LoggerMiddleware
// ---------------------------------------------------------------------------

/// Reports prior state, action and resulting state around `next`.
#[derive(Debug, Default, Clone)]
pub struct LoggerMiddleware<K = TracingSink> {
    sink: K,
}

impl LoggerMiddleware {
    pub fn new() -> Self {
        Self { sink: TracingSink }
    }
}

impl<K> LoggerMiddleware<K> {
    pub fn with_sink(sink: K) -> Self {
        Self { sink }
    }
}

impl<S, A, K> Middleware<S, A> for LoggerMiddleware<K>
where
    K: TransitionSink<S, A>,
{
    fn handle(&self, state: &S, action: &A, next: Next<'_, S, A>) -> Result<S> {
        self.sink.before(state, action);
        let next_state = next.run(state, action)?;
        self.sink.record(state, action, &next_state);
        Ok(next_state)
    }
}

// ---------------------------------------------------------------------------
// StorageMiddleware
// ---------------------------------------------------------------------------

/// Hands the resulting state to `save_state` after every successful `next`.
///
/// A failing save fails the dispatch, so nothing is committed.
pub struct StorageMiddleware<F> {
    save_state: F,
}

impl<F> StorageMiddleware<F> {
    pub fn new(save_state: F) -> Self {
        Self { save_state }
    }
}

impl<S, A, F> Middleware<S, A> for StorageMiddleware<F>
where
    F: Fn(&S) -> Result<()> + Send + Sync,
{
    fn handle(&self, state: &S, action: &A, next: Next<'_, S, A>) -> Result<S> {
        let next_state = next.run(state, action)?;
        (self.save_state)(&next_state)?;
        Ok(next_state)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::Pipeline;
    use anyhow::bail;

    #[derive(Debug, Clone, PartialEq)]
    struct Bump(i64);

    impl ActionLike for Bump {
        fn action_type(&self) -> String {
            "BUMP".into()
        }
    }

    fn bump(state: &i64, action: &Bump) -> Result<i64> {
        Ok(state + action.0)
    }

    #[test]
    fn logger_records_prior_action_and_next() {
        let sink: Arc<MemoryTransitionSink<i64, Bump>> = Arc::new(MemoryTransitionSink::new());
        let pipeline = Pipeline::new(bump).with(LoggerMiddleware::with_sink(Arc::clone(&sink)));

        assert_eq!(pipeline.invoke(&1, &Bump(2)).unwrap(), 3);
        assert_eq!(pipeline.invoke(&3, &Bump(-1)).unwrap(), 2);

        let transitions = sink.transitions();
        assert_eq!(transitions.len(), 2);
        assert_eq!(transitions[0].seq, 1);
        assert_eq!(
            (transitions[0].prior, &transitions[0].action, transitions[0].next),
            (1, &Bump(2), 3)
        );
        assert_eq!(transitions[1].seq, 2);
        assert_eq!(transitions[1].next, 2);
        assert!(transitions[0].ts <= transitions[1].ts);
    }

    #[test]
    fn logger_records_nothing_when_inner_pipeline_fails() {
        fn failing(_: &i64, _: &Bump) -> Result<i64> {
            bail!("nope")
        }

        let sink: Arc<MemoryTransitionSink<i64, Bump>> = Arc::new(MemoryTransitionSink::new());
        let pipeline = Pipeline::new(failing).with(LoggerMiddleware::with_sink(Arc::clone(&sink)));

        assert!(pipeline.invoke(&0, &Bump(1)).is_err());
        assert!(sink.transitions().is_empty());
    }

    #[test]
    fn tracing_logger_passes_result_through() {
        let pipeline = Pipeline::new(bump).with(LoggerMiddleware::new());
        assert_eq!(pipeline.invoke(&10, &Bump(5)).unwrap(), 15);
    }

    #[test]
    fn storage_saves_resulting_state() {
        let saved = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&saved);
        let storage = StorageMiddleware::new(move |state: &i64| -> Result<()> {
            sink.lock().unwrap().push(*state);
            Ok(())
        });
        let pipeline = Pipeline::new(bump).with(storage);

        pipeline.invoke(&0, &Bump(4)).unwrap();
        pipeline.invoke(&4, &Bump(1)).unwrap();

        assert_eq!(*saved.lock().unwrap(), vec![4, 5]);
    }

    #[test]
    fn storage_failure_fails_the_transition() {
        let storage = StorageMiddleware::new(|_: &i64| -> Result<()> { bail!("disk full") });
        let pipeline = Pipeline::new(bump).with(storage);

        let err = pipeline.invoke(&0, &Bump(1)).unwrap_err();
        assert_eq!(err.to_string(), "disk full");
    }
}
