use thiserror::Error;

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Transition error for action `{action_type}`")]
    Transition {
        action_type: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("Thunk failed")]
    Thunk(#[source] anyhow::Error),

    #[error("Reactor limit exceeded: {limit} consecutive reactions (last action `{last_action}`)")]
    ReactorLimit { limit: usize, last_action: String },

    #[error("Configuration error: {0}")]
    Config(String),
}
