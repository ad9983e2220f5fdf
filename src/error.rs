use thiserror::Error;

/// A fault in the arrival schedule, detected when it is loaded.
#[derive(Debug, Error)]
pub enum ScheduleError {
    #[error("schedule parse error: {0}")]
    Parse(String),

    #[error("arrival {index} has an invalid time {time}")]
    InvalidTime { index: usize, time: f64 },

    #[error("arrival {index} at t={time} is earlier than the preceding arrival at t={previous}")]
    Decreasing { index: usize, time: f64, previous: f64 },

    #[error("arrival {index} refers to unknown lane {lane}")]
    UnknownLane { index: usize, lane: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<serde_json::Error> for ScheduleError {
    fn from(err: serde_json::Error) -> Self {
        ScheduleError::Parse(err.to_string())
    }
}

pub type ScheduleResult<T> = Result<T, ScheduleError>;

/// A fault which prevents the simulation from running.
#[derive(Debug, Error)]
pub enum SimError {
    #[error(transparent)]
    Schedule(#[from] ScheduleError),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("failed to start worker thread `{name}`: {source}")]
    Spawn {
        name: String,
        #[source]
        source: std::io::Error,
    },
}

pub type SimResult<T> = Result<T, SimError>;
