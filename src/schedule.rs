use crate::error::{ScheduleError, ScheduleResult};
use crate::lane::{Direction, LaneId, Side};
use rand::Rng;
use rand_distr::{Distribution, Exp};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// A vehicle arriving at one of the intersection's lanes.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct Arrival {
    /// The vehicle's position in the schedule.
    pub vehicle: usize,
    /// The lane the vehicle arrives at.
    pub lane: LaneId,
    /// The simulated arrival time in s.
    pub time: f64,
}

/// A scheduled arrival, as written in a schedule file.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ArrivalRecord {
    pub side: Side,
    pub direction: Direction,
    /// The simulated arrival time in s.
    pub time: f64,
}

/// A lane component given either by name or by its index.
#[derive(Clone, Copy, Debug, Deserialize)]
#[serde(untagged)]
enum Component<T> {
    Index(usize),
    Named(T),
}

/// An arrival record as it appears in a file, before its lane has been resolved.
#[derive(Clone, Copy, Debug, Deserialize)]
pub(crate) struct RawArrival {
    side: Component<Side>,
    direction: Component<Direction>,
    time: f64,
}

/// A validated list of arrivals, ordered by arrival time.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Schedule {
    arrivals: Vec<Arrival>,
}

impl<T: TryFrom<usize, Error = usize>> Component<T> {
    fn resolve(self, index: usize, what: &str) -> ScheduleResult<T> {
        match self {
            Component::Named(value) => Ok(value),
            Component::Index(value) => {
                T::try_from(value).map_err(|value| ScheduleError::UnknownLane {
                    index,
                    lane: format!("{} {}", what, value),
                })
            }
        }
    }
}

impl Schedule {
    /// Validates a list of arrival records.
    ///
    /// Arrival times must be finite, non-negative and non-decreasing.
    pub fn from_records(records: impl IntoIterator<Item = ArrivalRecord>) -> ScheduleResult<Self> {
        let mut previous = 0.0;
        let arrivals = records
            .into_iter()
            .enumerate()
            .map(|(index, record)| {
                let time = record.time;
                if !time.is_finite() || time < 0.0 {
                    return Err(ScheduleError::InvalidTime { index, time });
                }
                if time < previous {
                    return Err(ScheduleError::Decreasing {
                        index,
                        time,
                        previous,
                    });
                }
                previous = time;
                Ok(Arrival {
                    vehicle: index,
                    lane: LaneId::new(record.side, record.direction),
                    time,
                })
            })
            .collect::<ScheduleResult<Vec<_>>>()?;
        Ok(Self { arrivals })
    }

    /// Resolves and validates raw records read from a file.
    pub(crate) fn from_raw(raw: Vec<RawArrival>) -> ScheduleResult<Self> {
        let records = raw
            .into_iter()
            .enumerate()
            .map(|(index, raw)| -> ScheduleResult<ArrivalRecord> {
                Ok(ArrivalRecord {
                    side: raw.side.resolve(index, "side")?,
                    direction: raw.direction.resolve(index, "direction")?,
                    time: raw.time,
                })
            })
            .collect::<ScheduleResult<Vec<_>>>()?;
        Self::from_records(records)
    }

    /// Parses a schedule from a JSON array of `{side, direction, time}` records.
    ///
    /// Sides and directions may be given by name (`"north"`, `"uturn"`) or by index.
    pub fn from_json_str(json: &str) -> ScheduleResult<Self> {
        let raw: Vec<RawArrival> = serde_json::from_str(json)?;
        Self::from_raw(raw)
    }

    /// Loads a schedule from a JSON file.
    pub fn load(path: impl AsRef<Path>) -> ScheduleResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json_str(&content)
    }

    /// Generates a random schedule of `count` arrivals spread uniformly over the lanes,
    /// with exponentially distributed gaps averaging `mean_gap` seconds.
    pub fn random<R: Rng>(rng: &mut R, count: usize, mean_gap: f64) -> ScheduleResult<Self> {
        let gaps = Exp::new(1.0 / mean_gap).map_err(|_| ScheduleError::InvalidTime {
            index: 0,
            time: mean_gap,
        })?;
        let mut time = 0.0;
        let records = (0..count)
            .map(|_| {
                let record = ArrivalRecord {
                    side: Side::ALL[rng.gen_range(0..4)],
                    direction: Direction::ALL[rng.gen_range(0..4)],
                    time,
                };
                time += gaps.sample(&mut *rng);
                record
            })
            .collect::<Vec<_>>();
        Self::from_records(records)
    }

    /// A small mixed schedule exercising conflicting and compatible lanes.
    pub fn demo() -> Self {
        use Direction::*;
        use Side::*;
        let records = [
            (North, Straight, 0.0),
            (South, Straight, 0.0),
            (East, Left, 1.0),
            (West, Right, 2.0),
            (North, Left, 3.0),
            (North, Straight, 3.0),
            (East, Straight, 4.0),
            (South, UTurn, 6.0),
            (West, Straight, 7.0),
            (East, Right, 7.0),
            (North, Right, 9.0),
            (South, Left, 10.0),
        ]
        .map(|(side, direction, time)| ArrivalRecord {
            side,
            direction,
            time,
        });
        Self {
            arrivals: records
                .iter()
                .enumerate()
                .map(|(vehicle, record)| Arrival {
                    vehicle,
                    lane: LaneId::new(record.side, record.direction),
                    time: record.time,
                })
                .collect(),
        }
    }

    /// Gets the scheduled arrivals, in order.
    pub fn arrivals(&self) -> &[Arrival] {
        &self.arrivals
    }

    /// Gets the number of scheduled arrivals.
    pub fn len(&self) -> usize {
        self.arrivals.len()
    }

    /// Checks whether the schedule has no arrivals.
    pub fn is_empty(&self) -> bool {
        self.arrivals.is_empty()
    }

    /// Counts the arrivals scheduled for each lane, indexed by [LaneId::index].
    pub fn arrivals_per_lane(&self) -> [usize; crate::LANE_COUNT] {
        let mut counts = [0; crate::LANE_COUNT];
        for arrival in &self.arrivals {
            counts[arrival.lane.index()] += 1;
        }
        counts
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn parses_named_and_indexed_lanes() {
        let schedule = Schedule::from_json_str(
            r#"[
                {"side": "north", "direction": "straight", "time": 0},
                {"side": 2, "direction": 3, "time": 1.5}
            ]"#,
        )
        .unwrap();
        assert_eq!(schedule.len(), 2);
        assert_eq!(
            schedule.arrivals()[0].lane,
            LaneId::new(Side::North, Direction::Straight)
        );
        assert_eq!(
            schedule.arrivals()[1].lane,
            LaneId::new(Side::South, Direction::UTurn)
        );
        assert_eq!(schedule.arrivals()[1].vehicle, 1);
    }

    #[test]
    fn rejects_unknown_lane_index() {
        let err =
            Schedule::from_json_str(r#"[{"side": 4, "direction": 0, "time": 0}]"#).unwrap_err();
        assert!(matches!(err, ScheduleError::UnknownLane { index: 0, .. }), "{err}");
    }

    #[test]
    fn rejects_unknown_lane_name() {
        let err = Schedule::from_json_str(r#"[{"side": "up", "direction": "left", "time": 0}]"#)
            .unwrap_err();
        assert!(matches!(err, ScheduleError::Parse(_)), "{err}");
    }

    #[test]
    fn rejects_decreasing_times() {
        let records = [
            ArrivalRecord {
                side: Side::East,
                direction: Direction::Left,
                time: 2.0,
            },
            ArrivalRecord {
                side: Side::West,
                direction: Direction::Left,
                time: 1.0,
            },
        ];
        let err = Schedule::from_records(records).unwrap_err();
        assert!(matches!(err, ScheduleError::Decreasing { index: 1, .. }));
    }

    #[test]
    fn rejects_negative_and_non_finite_times() {
        for time in [-1.0, f64::NAN, f64::INFINITY] {
            let record = ArrivalRecord {
                side: Side::North,
                direction: Direction::Right,
                time,
            };
            let err = Schedule::from_records([record]).unwrap_err();
            assert!(matches!(err, ScheduleError::InvalidTime { index: 0, .. }));
        }
    }

    #[test]
    fn random_schedules_are_ordered_and_reproducible() {
        let a = Schedule::random(&mut StdRng::seed_from_u64(7), 50, 0.5).unwrap();
        let b = Schedule::random(&mut StdRng::seed_from_u64(7), 50, 0.5).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.len(), 50);
        assert!(a.arrivals().windows(2).all(|w| w[0].time <= w[1].time));
        assert_eq!(a.arrivals_per_lane().iter().sum::<usize>(), 50);
    }

    #[test]
    fn demo_schedule_is_valid() {
        let demo = Schedule::demo();
        let records = demo.arrivals().iter().map(|a| ArrivalRecord {
            side: a.lane.side(),
            direction: a.lane.direction(),
            time: a.time,
        });
        assert_eq!(Schedule::from_records(records).unwrap(), demo);
    }
}
