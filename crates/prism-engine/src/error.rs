#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("controller stopped")]
    ControllerStopped,

    #[error("internal: {0}")]
    Internal(String),
}
