//! Single-cell state engine.
//!
//! A store holds one state value, updated only by dispatching actions through
//! a reducer pipeline: dispatch → reduce → commit → notify → react. Reactors
//! inspect every committed state and may dispatch one corrective action,
//! repeating the cycle until none fires.
//!
//! Consumers define their domain by providing a `Reducer` (pure transitions),
//! optional `Middleware` layers around it, and `Reactor`s. Side effects live
//! in thunks, which get the store handle and may dispatch now or later.

pub mod config;
pub mod error;
pub mod middleware;
pub mod pipeline;
pub mod reactor;
pub mod store;
pub mod traits;

pub use config::EngineConfig;
pub use error::EngineError;
pub use middleware::{
    LoggerMiddleware, MemoryTransitionSink, StorageMiddleware, TracingSink, Transition,
    TransitionSink,
};
pub use pipeline::{Identity, Next, Pipeline};
pub use reactor::{run_reactors, Reactors};
pub use store::{Dispatchable, Store, StoreBuilder, SubscriptionId, Thunk};
pub use traits::{ActionLike, Middleware, Reactor, Reducer, Subscriber};
