//! The reducer pipeline: a base reducer wrapped by middleware layers.
//!
//! Layers are kept as an ordered list and folded at invoke time. The most
//! recently registered middleware is the outermost layer, so it runs first
//! and returns last:
//!
//! ```text
//! register(m1); register(m2); register(m3);
//! invoke → m3 → m2 → m1 → base → m1 → m2 → m3
//! ```

use std::fmt;

use anyhow::Result;

use crate::traits::{Middleware, Reducer};

/// Reducer that returns the state unchanged.
#[derive(Debug, Default, Clone, Copy)]
pub struct Identity;

impl<S: Clone, A> Reducer<S, A> for Identity {
    fn reduce(&self, state: &S, _action: &A) -> Result<S> {
        Ok(state.clone())
    }
}

/// A composed transition function.
pub struct Pipeline<S, A> {
    base: Box<dyn Reducer<S, A>>,
    layers: Vec<Box<dyn Middleware<S, A>>>,
}

impl<S: 'static, A: 'static> Pipeline<S, A> {
    pub fn new<R>(base: R) -> Self
    where
        R: Reducer<S, A> + 'static,
    {
        Self {
            base: Box::new(base),
            layers: Vec::new(),
        }
    }

    /// Wrap the current pipeline with `middleware`, which becomes the
    /// outermost layer.
    pub fn register<M>(&mut self, middleware: M) -> &mut Self
    where
        M: Middleware<S, A> + 'static,
    {
        self.layers.push(Box::new(middleware));
        self
    }

    /// Builder form of [`Pipeline::register`].
    pub fn with<M>(mut self, middleware: M) -> Self
    where
        M: Middleware<S, A> + 'static,
    {
        self.register(middleware);
        self
    }
}

impl<S: Clone + 'static, A: 'static> Pipeline<S, A> {
    /// A pipeline whose base reducer is [`Identity`].
    pub fn identity() -> Self {
        Self::new(Identity)
    }
}

impl<S, A> Pipeline<S, A> {
    /// Run `action` through every layer and the base reducer.
    pub fn invoke(&self, state: &S, action: &A) -> Result<S> {
        self.outermost().run(state, action)
    }

    /// Number of registered middleware layers.
    pub fn len(&self) -> usize {
        self.layers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    fn outermost(&self) -> Next<'_, S, A> {
        Next {
            layers: &self.layers,
            base: self.base.as_ref(),
        }
    }
}

impl<S: Clone + 'static, A: 'static> Default for Pipeline<S, A> {
    fn default() -> Self {
        Self::identity()
    }
}

impl<S, A> fmt::Debug for Pipeline<S, A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pipeline")
            .field("layers", &self.layers.len())
            .finish()
    }
}

/// The remainder of the pipeline below a middleware layer.
pub struct Next<'a, S, A> {
    layers: &'a [Box<dyn Middleware<S, A>>],
    base: &'a dyn Reducer<S, A>,
}

impl<S, A> Next<'_, S, A> {
    /// Invoke the inner layers and, at the bottom, the base reducer.
    pub fn run(&self, state: &S, action: &A) -> Result<S> {
        match self.layers.split_last() {
            Some((outer, inner)) => outer.handle(
                state,
                action,
                Next {
                    layers: inner,
                    base: self.base,
                },
            ),
            None => self.base.reduce(state, action),
        }
    }
}

impl<S, A> Clone for Next<'_, S, A> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<S, A> Copy for Next<'_, S, A> {}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::bail;
    use std::sync::{Arc, Mutex};

    type Log = Arc<Mutex<Vec<String>>>;

    struct Marker {
        name: &'static str,
        log: Log,
    }

    impl Middleware<i64, i64> for Marker {
        fn handle(&self, state: &i64, action: &i64, next: Next<'_, i64, i64>) -> Result<i64> {
            self.log.lock().unwrap().push(format!("{}:before", self.name));
            let out = next.run(state, action)?;
            self.log.lock().unwrap().push(format!("{}:after", self.name));
            Ok(out)
        }
    }

    fn add(state: &i64, action: &i64) -> Result<i64> {
        Ok(state + action)
    }

    fn marker(name: &'static str, log: &Log) -> Marker {
        Marker {
            name,
            log: Arc::clone(log),
        }
    }

    #[test]
    fn empty_pipeline_behaves_like_base_reducer() {
        let pipeline = Pipeline::new(add);
        assert!(pipeline.is_empty());
        assert_eq!(pipeline.invoke(&2, &3).unwrap(), 5);
    }

    #[test]
    fn identity_pipeline_returns_state_unchanged() {
        let pipeline: Pipeline<String, i64> = Pipeline::default();
        assert_eq!(pipeline.invoke(&"same".to_string(), &9).unwrap(), "same");
    }

    #[test]
    fn last_registered_middleware_runs_outermost() {
        let log: Log = Arc::default();
        let base_log = Arc::clone(&log);
        let base = move |state: &i64, action: &i64| -> Result<i64> {
            base_log.lock().unwrap().push("reducer".into());
            Ok(state + action)
        };

        let mut pipeline = Pipeline::new(base);
        pipeline
            .register(marker("m1", &log))
            .register(marker("m2", &log))
            .register(marker("m3", &log));

        assert_eq!(pipeline.len(), 3);
        assert_eq!(pipeline.invoke(&1, &1).unwrap(), 2);
        assert_eq!(
            *log.lock().unwrap(),
            vec![
                "m3:before",
                "m2:before",
                "m1:before",
                "reducer",
                "m1:after",
                "m2:after",
                "m3:after",
            ]
        );
    }

    #[test]
    fn middleware_can_skip_next_and_replace_result() {
        struct Veto;

        impl Middleware<i64, i64> for Veto {
            fn handle(&self, state: &i64, action: &i64, next: Next<'_, i64, i64>) -> Result<i64> {
                if *action < 0 {
                    return Ok(*state);
                }
                next.run(state, action).map(|n| n * 10)
            }
        }

        let pipeline = Pipeline::new(add).with(Veto);
        assert_eq!(pipeline.invoke(&5, &-1).unwrap(), 5);
        assert_eq!(pipeline.invoke(&5, &1).unwrap(), 60);
    }

    #[test]
    fn middleware_may_call_next_twice() {
        struct Twice;

        impl Middleware<i64, i64> for Twice {
            fn handle(&self, state: &i64, action: &i64, next: Next<'_, i64, i64>) -> Result<i64> {
                let once = next.run(state, action)?;
                next.run(&once, action)
            }
        }

        let pipeline = Pipeline::new(add).with(Twice);
        assert_eq!(pipeline.invoke(&0, &3).unwrap(), 6);
    }

    #[test]
    fn reducer_errors_propagate_through_layers() {
        fn failing(_: &i64, _: &i64) -> Result<i64> {
            bail!("reducer exploded")
        }

        let log: Log = Arc::default();
        let pipeline = Pipeline::new(failing).with(marker("m1", &log));

        let err = pipeline.invoke(&0, &0).unwrap_err();
        assert_eq!(err.to_string(), "reducer exploded");
        assert_eq!(*log.lock().unwrap(), vec!["m1:before"]);
    }
}
