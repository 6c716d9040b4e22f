//! Counter demo for the ducks engine.
//!
//! Plays the parts the engine leaves to its host: a console view bound to
//! commits, a JSON state file behind the storage middleware, and a thunk
//! that schedules a later dispatch on the tokio runtime.

pub mod command;
pub mod counter;
pub mod storage;

pub use command::{parse_command, Command};
pub use counter::{
    build_store, count, increment_later, min_zero, reduce, CounterAction, CounterState,
    CounterStore,
};
pub use storage::StateFile;
