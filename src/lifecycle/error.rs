use crate::config::ConfigError;
use crate::loader::LoadError;
use tokio::task::JoinError;

/// Errors that stop a simulation from starting or finishing.
///
/// Stages never report cancellation as an error; they return a
/// [`StageExit`](crate::framework::StageExit) instead. What reaches this type
/// is bad input or a stage task that panicked.
#[derive(Debug, thiserror::Error)]
pub enum SimulationError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Load(#[from] LoadError),

    #[error("The {stage} stage failed: {source}")]
    StageFailed {
        stage: &'static str,
        #[source]
        source: JoinError,
    },
}
