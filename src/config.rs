//! Simulation parameters and scenario files.
//!
//! A scenario file is a JSON object holding the [SimConfig] fields next to the
//! list of arrivals. Every config field is optional:
//!
//! ```json
//! {
//!     "crossing_time": 5,
//!     "time_scale": 0.1,
//!     "arrivals": [
//!         { "side": "north", "direction": "straight", "time": 0 },
//!         { "side": "east", "direction": "left", "time": 2.5 }
//!     ]
//! }
//! ```

use crate::error::{ScheduleError, SimError, SimResult};
use crate::schedule::{RawArrival, Schedule};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// The time a vehicle's light stays green, in simulated s.
pub const DEFAULT_CROSSING_TIME: f64 = 5.0;

/// The parameters of a simulation run.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    /// How long a lane's light stays green for each vehicle, in simulated s.
    pub crossing_time: f64,
    /// Real seconds per simulated second.
    pub time_scale: f64,
}

/// A configuration together with the arrivals to simulate.
#[derive(Clone, Debug, PartialEq)]
pub struct Scenario {
    pub config: SimConfig,
    pub schedule: Schedule,
}

#[derive(Deserialize)]
struct ScenarioFile {
    #[serde(flatten)]
    config: SimConfig,
    arrivals: Vec<RawArrival>,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            crossing_time: DEFAULT_CROSSING_TIME,
            time_scale: 1.0,
        }
    }
}

impl SimConfig {
    /// Checks that the parameters describe a runnable simulation.
    pub fn validate(&self) -> SimResult<()> {
        if !self.crossing_time.is_finite() || self.crossing_time <= 0.0 {
            return Err(SimError::Config(format!(
                "crossing time must be positive, got {}",
                self.crossing_time
            )));
        }
        if !self.time_scale.is_finite() || self.time_scale < 0.0 {
            return Err(SimError::Config(format!(
                "time scale must not be negative, got {}",
                self.time_scale
            )));
        }
        Ok(())
    }
}

impl Scenario {
    /// Parses and validates a scenario from JSON.
    pub fn from_json_str(json: &str) -> SimResult<Self> {
        let file: ScenarioFile = serde_json::from_str(json).map_err(ScheduleError::from)?;
        file.config.validate()?;
        Ok(Self {
            config: file.config,
            schedule: Schedule::from_raw(file.arrivals)?,
        })
    }

    /// Loads and validates a scenario file.
    pub fn load(path: impl AsRef<Path>) -> SimResult<Self> {
        let content = std::fs::read_to_string(path).map_err(ScheduleError::from)?;
        Self::from_json_str(&content)
    }

    /// The built-in demonstration scenario, run ten times faster than real time.
    pub fn demo() -> Self {
        Self {
            config: SimConfig {
                time_scale: 0.1,
                ..Default::default()
            },
            schedule: Schedule::demo(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;

    #[test]
    fn missing_fields_take_defaults() {
        let scenario = Scenario::from_json_str(
            r#"{"arrivals": [{"side": "west", "direction": "left", "time": 0}]}"#,
        )
        .unwrap();
        assert_eq!(scenario.config, SimConfig::default());
        assert_eq!(scenario.schedule.len(), 1);
    }

    #[test]
    fn config_fields_are_read_alongside_arrivals() {
        let scenario = Scenario::from_json_str(
            r#"{"crossing_time": 2.5, "time_scale": 0.01, "arrivals": []}"#,
        )
        .unwrap();
        assert_approx_eq!(scenario.config.crossing_time, 2.5);
        assert_approx_eq!(scenario.config.time_scale, 0.01);
        assert!(scenario.schedule.is_empty());
    }

    #[test]
    fn invalid_crossing_time_is_rejected() {
        let err = Scenario::from_json_str(r#"{"crossing_time": 0, "arrivals": []}"#).unwrap_err();
        assert!(matches!(err, SimError::Config(_)), "{err}");
    }

    #[test]
    fn malformed_schedule_is_a_schedule_error() {
        let err = Scenario::from_json_str(
            r#"{"arrivals": [
                {"side": "north", "direction": "left", "time": 3},
                {"side": "north", "direction": "left", "time": 1}
            ]}"#,
        )
        .unwrap_err();
        assert!(matches!(
            err,
            SimError::Schedule(ScheduleError::Decreasing { index: 1, .. })
        ));
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let err = Scenario::load("/nonexistent/scenario.json").unwrap_err();
        assert!(matches!(err, SimError::Schedule(ScheduleError::Io(_))));
    }
}
