use crate::admission::{AdmissionController, AdmissionStats};
use crate::clock::{Clock, ScaledClock};
use crate::config::{Scenario, SimConfig};
use crate::conflict::ConflictTable;
use crate::controller::LaneController;
use crate::error::{SimError, SimResult};
use crate::feed::ArrivalFeed;
use crate::lane::{Lane, LaneId, LANE_COUNT};
use crate::light::LightObserver;
use crate::schedule::Schedule;
use std::fmt;
use std::panic;
use std::thread::{self, ScopedJoinHandle};

/// A simulation of the intersection running through a fixed schedule of arrivals.
///
/// Every lane is served by its own controller thread, and a further thread
/// delivers the arrivals. A run ends once every scheduled vehicle has crossed.
pub struct Simulation {
    /// The run parameters.
    config: SimConfig,
    /// The arrivals to simulate.
    schedule: Schedule,
    /// The conflicts between lanes.
    conflicts: ConflictTable,
}

/// The outcome of a simulation run.
#[derive(Clone, Debug, PartialEq)]
pub struct SimReport {
    /// The number of vehicles which crossed from each lane, indexed by [LaneId::index].
    pub crossings: [usize; LANE_COUNT],
    /// The admission controller's counters.
    pub admission: AdmissionStats,
    /// The simulated time at which the last vehicle finished crossing, in s.
    pub elapsed: f64,
    /// The largest number of lanes which could have been green at once.
    pub max_concurrency: usize,
}

impl Simulation {
    /// Creates a simulation using the intersection's geometric conflicts.
    pub fn new(config: SimConfig, schedule: Schedule) -> SimResult<Self> {
        config.validate()?;
        Ok(Self {
            config,
            schedule,
            conflicts: ConflictTable::geometric().clone(),
        })
    }

    /// Creates a simulation of a loaded scenario.
    pub fn from_scenario(scenario: Scenario) -> SimResult<Self> {
        Self::new(scenario.config, scenario.schedule)
    }

    /// Replaces the conflicts between lanes.
    pub fn with_conflicts(mut self, conflicts: ConflictTable) -> Self {
        self.conflicts = conflicts;
        self
    }

    /// Gets the run parameters.
    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    /// Gets the arrivals to simulate.
    pub fn schedule(&self) -> &Schedule {
        &self.schedule
    }

    /// Gets the conflicts between lanes.
    pub fn conflicts(&self) -> &ConflictTable {
        &self.conflicts
    }

    /// Runs the simulation on a clock scaled by the configured time scale.
    pub fn run(&self, observer: &dyn LightObserver) -> SimResult<SimReport> {
        let clock = ScaledClock::new(self.config.time_scale);
        self.run_with_clock(&clock, observer)
    }

    /// Runs the simulation to completion on the given clock.
    ///
    /// If a worker thread cannot be started, every lane is closed so the workers
    /// already running exit, and the error is returned. A worker which panics has
    /// its panic resumed on the calling thread.
    pub fn run_with_clock(
        &self,
        clock: &dyn Clock,
        observer: &dyn LightObserver,
    ) -> SimResult<SimReport> {
        let lanes = Lane::all();
        let admission = AdmissionController::new(&self.conflicts);
        let feed = ArrivalFeed {
            schedule: &self.schedule,
            lanes: &lanes,
            clock,
        };

        log::info!(
            "starting simulation of {} arrivals (crossing time {}s, time scale {})",
            self.schedule.len(),
            self.config.crossing_time,
            self.config.time_scale
        );
        clock.start();

        let crossings = thread::scope(|s| {
            let mut workers = Vec::with_capacity(LANE_COUNT);
            for lane in &lanes {
                let controller = LaneController {
                    lane,
                    admission: &admission,
                    clock,
                    observer,
                    crossing_time: self.config.crossing_time,
                };
                let name = format!("lane-{}", lane.id()).to_lowercase();
                match thread::Builder::new()
                    .name(name.clone())
                    .spawn_scoped(s, move || controller.run())
                {
                    Ok(handle) => workers.push(handle),
                    Err(source) => {
                        feed.close_all();
                        return Err(SimError::Spawn { name, source });
                    }
                }
            }

            let feeder = thread::Builder::new()
                .name("arrival-feed".into())
                .spawn_scoped(s, || feed.run());
            let feeder = match feeder {
                Ok(handle) => handle,
                Err(source) => {
                    feed.close_all();
                    return Err(SimError::Spawn {
                        name: "arrival-feed".into(),
                        source,
                    });
                }
            };

            join(feeder);
            let mut crossings = [0; LANE_COUNT];
            for (count, worker) in crossings.iter_mut().zip(workers) {
                *count = join(worker);
            }
            Ok(crossings)
        })?;

        let report = SimReport {
            crossings,
            admission: admission.stats(),
            elapsed: clock.now(),
            max_concurrency: self.conflicts.max_concurrency(),
        };
        log::info!("simulation finished: {}", report);
        Ok(report)
    }
}

/// Joins a worker thread, resuming its panic if it had one.
fn join<T>(handle: ScopedJoinHandle<'_, T>) -> T {
    match handle.join() {
        Ok(value) => value,
        Err(payload) => panic::resume_unwind(payload),
    }
}

impl SimReport {
    /// Gets the total number of vehicles which crossed.
    pub fn total_crossings(&self) -> usize {
        self.crossings.iter().sum()
    }

    /// Gets the number of vehicles which crossed from the given lane.
    pub fn crossings(&self, lane: LaneId) -> usize {
        self.crossings[lane.index()]
    }
}

impl fmt::Display for SimReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} vehicles crossed in {:.2}s, at most {} of {} possible lanes green at once",
            self.total_crossings(),
            self.elapsed,
            self.admission.peak_active,
            self.max_concurrency
        )
    }
}
