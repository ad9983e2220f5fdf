pub use admission::{AdmissionController, AdmissionStats};
pub use clock::{Clock, ManualClock, ScaledClock};
pub use config::{Scenario, SimConfig, DEFAULT_CROSSING_TIME};
pub use conflict::ConflictTable;
pub use controller::LaneController;
pub use error::{ScheduleError, ScheduleResult, SimError, SimResult};
pub use feed::ArrivalFeed;
pub use lane::{Direction, Lane, LaneId, Side, LANE_COUNT};
pub use light::{
    EventLog, GreenPhase, LightEvent, LightObserver, LightState, LogObserver, NullObserver,
};
pub use schedule::{Arrival, ArrivalRecord, Schedule};
pub use simulation::{SimReport, Simulation};

mod admission;
pub mod clock;
pub mod config;
mod conflict;
mod controller;
mod error;
mod feed;
mod lane;
mod light;
pub mod math;
mod schedule;
mod simulation;
