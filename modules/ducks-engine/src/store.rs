//! The state cell and its dispatcher.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock};

use tokio::sync::watch;
use tracing::{debug, trace, warn};

use crate::config::EngineConfig;
use crate::error::EngineError;
use crate::pipeline::Pipeline;
use crate::reactor::{run_reactors, Reactors};
use crate::traits::{ActionLike, Reactor, Subscriber};

/// Deferred action. Receives the store (for `dispatch` and `state`) and a
/// snapshot of the state at the time it was dispatched.
pub type Thunk<S, A> = Box<dyn FnOnce(&Store<S, A>, Arc<S>) -> anyhow::Result<()> + Send>;

/// Input accepted by [`Store::dispatch`].
pub enum Dispatchable<S, A> {
    Action(A),
    Thunk(Thunk<S, A>),
}

impl<S, A> Dispatchable<S, A> {
    pub fn thunk<F>(f: F) -> Self
    where
        F: FnOnce(&Store<S, A>, Arc<S>) -> anyhow::Result<()> + Send + 'static,
    {
        Self::Thunk(Box::new(f))
    }
}

impl<S, A: ActionLike> From<A> for Dispatchable<S, A> {
    fn from(action: A) -> Self {
        Self::Action(action)
    }
}

impl<S, A: ActionLike> fmt::Debug for Dispatchable<S, A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Action(action) => f.debug_tuple("Action").field(&action.action_type()).finish(),
            Self::Thunk(_) => f.write_str("Thunk"),
        }
    }
}

/// Handle returned by [`Store::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

/// Single state cell driven by a reducer pipeline.
///
/// Dispatch → reduce → commit → notify → react, repeated until no reactor
/// fires. Cloning yields another handle to the same cell.
pub struct Store<S, A> {
    inner: Arc<Inner<S, A>>,
}

struct Inner<S, A> {
    pipeline: Pipeline<S, A>,
    reactors: Reactors<S, A>,
    config: EngineConfig,
    // Authoritative value read by `state()`. Updated before any notification.
    state: RwLock<Arc<S>>,
    // Serializes read-modify-commit; never held while user callbacks other
    // than the pipeline run.
    commit_lock: Mutex<()>,
    commits: AtomicU64,
    watch: watch::Sender<Arc<S>>,
    subscribers: RwLock<Vec<(SubscriptionId, Arc<dyn Subscriber<S>>)>>,
    next_subscription: AtomicU64,
}

impl<S, A> Clone for Store<S, A> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<S, A> Store<S, A>
where
    S: Send + Sync + 'static,
    A: ActionLike,
{
    pub fn new(pipeline: Pipeline<S, A>, initial_state: S) -> Self {
        Self::builder(pipeline, initial_state).build()
    }

    pub fn builder(pipeline: Pipeline<S, A>, initial_state: S) -> StoreBuilder<S, A> {
        StoreBuilder::new(pipeline, initial_state)
    }

    /// The latest committed state.
    pub fn state(&self) -> Arc<S> {
        Arc::clone(&self.inner.state.read().unwrap_or_else(PoisonError::into_inner))
    }

    /// Read a derived value from the latest committed state.
    pub fn select<T>(&self, selector: impl FnOnce(&S) -> T) -> T {
        selector(&self.state())
    }

    /// Number of commits performed so far.
    pub fn commits(&self) -> u64 {
        self.inner.commits.load(Ordering::SeqCst)
    }

    /// Dispatch an action or a thunk.
    ///
    /// A plain action is reduced and committed, subscribers are notified,
    /// then reactors run against the new state; any action they pick is
    /// dispatched the same way before this call returns. A thunk is invoked
    /// immediately and commits nothing by itself.
    pub fn dispatch(&self, input: impl Into<Dispatchable<S, A>>) -> Result<(), EngineError> {
        match input.into() {
            Dispatchable::Action(action) => self.settle(action),
            Dispatchable::Thunk(thunk) => {
                trace!("Running thunk");
                thunk(self, self.state()).map_err(EngineError::Thunk)
            }
        }
    }

    /// Register a commit callback.
    ///
    /// Callbacks run after the commit lock is released, so when several
    /// threads dispatch at once a callback may see commits out of order.
    /// Multi-threaded hosts that need the latest value should use
    /// [`Store::watch`], which is updated under the lock.
    pub fn subscribe<Sub>(&self, subscriber: Sub) -> SubscriptionId
    where
        Sub: Subscriber<S> + 'static,
    {
        let id = SubscriptionId(self.inner.next_subscription.fetch_add(1, Ordering::SeqCst));
        let subscriber: Arc<dyn Subscriber<S>> = Arc::new(subscriber);
        self.inner
            .subscribers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push((id, subscriber));
        id
    }

    /// Returns `false` if the subscription was already removed.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut subscribers = self
            .inner
            .subscribers
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        let before = subscribers.len();
        subscribers.retain(|(existing, _)| *existing != id);
        subscribers.len() != before
    }

    /// Receiver marked changed on every commit, including commits of an
    /// unchanged value.
    pub fn watch(&self) -> watch::Receiver<Arc<S>> {
        self.inner.watch.subscribe()
    }

    /// Run reactors against the current state, committing their picks until
    /// none fires. Nothing is committed when the state is already settled.
    ///
    /// `dispatch` does this after every commit. Call it once after building
    /// a store whose initial state may need correcting.
    pub fn react(&self) -> Result<(), EngineError> {
        let mut reactions = 0usize;

        while let Some(reaction) = run_reactors(&*self.state(), &self.inner.reactors) {
            reactions += 1;
            if let Some(limit) = self.inner.config.max_reactions {
                if reactions > limit {
                    let last_action = reaction.action_type();
                    warn!(limit, action_type = last_action.as_str(), "Reactor loop did not settle");
                    return Err(EngineError::ReactorLimit { limit, last_action });
                }
            }

            trace!(action_type = reaction.action_type().as_str(), reactions, "Reactor fired");
            self.commit(&reaction)?;
        }

        Ok(())
    }

    /// Commit `action`, then keep committing reactor picks until none fires.
    fn settle(&self, action: A) -> Result<(), EngineError> {
        self.commit(&action)?;
        self.react()
    }

    fn commit(&self, action: &A) -> Result<(), EngineError> {
        let inner = &self.inner;
        let next = {
            let _guard = inner.commit_lock.lock().unwrap_or_else(PoisonError::into_inner);
            let prior = self.state();
            let next = inner
                .pipeline
                .invoke(&prior, action)
                .map(Arc::new)
                .map_err(|source| EngineError::Transition {
                    action_type: action.action_type(),
                    source,
                })?;

            *inner.state.write().unwrap_or_else(PoisonError::into_inner) = Arc::clone(&next);
            let seq = inner.commits.fetch_add(1, Ordering::SeqCst) + 1;
            inner.watch.send_replace(Arc::clone(&next));
            debug!(action_type = action.action_type().as_str(), commit = seq, "State committed");
            next
        };

        self.notify(&next);
        Ok(())
    }

    fn notify(&self, state: &Arc<S>) {
        let subscribers: Vec<Arc<dyn Subscriber<S>>> = self
            .inner
            .subscribers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|(_, subscriber)| Arc::clone(subscriber))
            .collect();

        for subscriber in subscribers {
            subscriber.on_commit(state);
        }
    }
}

impl<S, A> fmt::Debug for Store<S, A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Store")
            .field("pipeline", &self.inner.pipeline)
            .field("reactors", &self.inner.reactors.len())
            .field("config", &self.inner.config)
            .field("commits", &self.inner.commits.load(Ordering::SeqCst))
            .finish()
    }
}

/// Assembles a [`Store`] with reactors, subscribers and configuration.
pub struct StoreBuilder<S, A> {
    pipeline: Pipeline<S, A>,
    initial_state: S,
    reactors: Reactors<S, A>,
    subscribers: Vec<Arc<dyn Subscriber<S>>>,
    config: EngineConfig,
}

impl<S, A> StoreBuilder<S, A>
where
    S: Send + Sync + 'static,
    A: ActionLike,
{
    pub fn new(pipeline: Pipeline<S, A>, initial_state: S) -> Self {
        Self {
            pipeline,
            initial_state,
            reactors: Vec::new(),
            subscribers: Vec::new(),
            config: EngineConfig::default(),
        }
    }

    /// Append a reactor. Reactors are evaluated in the order added.
    pub fn reactor<R>(mut self, reactor: R) -> Self
    where
        R: Reactor<S, A> + 'static,
    {
        self.reactors.push(Box::new(reactor));
        self
    }

    pub fn subscriber<Sub>(mut self, subscriber: Sub) -> Self
    where
        Sub: Subscriber<S> + 'static,
    {
        self.subscribers.push(Arc::new(subscriber));
        self
    }

    pub fn config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    pub fn build(self) -> Store<S, A> {
        let initial = Arc::new(self.initial_state);
        let (watch, _) = watch::channel(Arc::clone(&initial));
        let subscribers: Vec<_> = self
            .subscribers
            .into_iter()
            .enumerate()
            .map(|(i, subscriber)| (SubscriptionId(i as u64), subscriber))
            .collect();

        Store {
            inner: Arc::new(Inner {
                pipeline: self.pipeline,
                reactors: self.reactors,
                config: self.config,
                state: RwLock::new(initial),
                commit_lock: Mutex::new(()),
                commits: AtomicU64::new(0),
                watch,
                next_subscription: AtomicU64::new(subscribers.len() as u64),
                subscribers: RwLock::new(subscribers),
            }),
        }
    }
}
