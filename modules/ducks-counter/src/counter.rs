//! Counter state, actions, reducer and reactor.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use ducks_engine::{
    ActionLike, Dispatchable, EngineConfig, EngineError, LoggerMiddleware, Pipeline, StorageMiddleware, Store,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CounterState {
    pub count: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CounterAction {
    Increment,
    Decrement,
    /// Acknowledges a deferred increment; leaves the count alone.
    IncrementLater,
}

impl ActionLike for CounterAction {
    fn action_type(&self) -> String {
        match self {
            CounterAction::Increment => "INCREMENT".into(),
            CounterAction::Decrement => "DECREMENT".into(),
            CounterAction::IncrementLater => "INCREMENT_LATER".into(),
        }
    }
}

pub type CounterStore = Store<CounterState, CounterAction>;

pub fn reduce(state: &CounterState, action: &CounterAction) -> Result<CounterState> {
    let count = match action {
        CounterAction::Increment => state.count + 1,
        CounterAction::Decrement => state.count - 1,
        CounterAction::IncrementLater => state.count,
    };
    Ok(CounterState { count })
}

/// Keeps the count from going negative.
pub fn min_zero(state: &CounterState) -> Option<CounterAction> {
    (state.count < 0).then_some(CounterAction::Increment)
}

pub fn count(state: &CounterState) -> i64 {
    state.count
}

/// Thunk: acknowledge now, increment once `delay` has elapsed.
///
/// Must be dispatched from within a tokio runtime.
pub fn increment_later(delay: Duration) -> Dispatchable<CounterState, CounterAction> {
    Dispatchable::thunk(move |store: &CounterStore, _state: Arc<CounterState>| {
        store.dispatch(CounterAction::IncrementLater)?;

        let runtime = tokio::runtime::Handle::try_current()
            .context("increment_later must be dispatched inside a tokio runtime")?;
        let store = store.clone();
        runtime.spawn(async move {
            tokio::time::sleep(delay).await;
            if let Err(err) = store.dispatch(CounterAction::Increment) {
                warn!(error = %err, "Deferred increment failed");
            }
        });

        debug!(delay = ?delay, "Increment scheduled");
        Ok(())
    })
}

/// Counter store with the logger and storage middleware and the `min_zero`
/// reactor. Storage is registered last, so it wraps the logger.
///
/// A negative `initial` count is corrected (and saved) before this returns.
pub fn build_store<F>(
    initial: CounterState,
    config: EngineConfig,
    save_state: F,
) -> Result<CounterStore, EngineError>
where
    F: Fn(&CounterState) -> Result<()> + Send + Sync + 'static,
{
    let pipeline = Pipeline::new(reduce)
        .with(LoggerMiddleware::new())
        .with(StorageMiddleware::new(save_state));

    let store = Store::builder(pipeline, initial)
        .reactor(min_zero)
        .config(config)
        .build();
    store.react()?;
    Ok(store)
}
