use crate::admission::AdmissionController;
use crate::clock::Clock;
use crate::lane::Lane;
use crate::light::{LightEvent, LightObserver, LightState};

/// The traffic light controller of a single lane.
///
/// Each cycle waits for a vehicle, requests admission, holds the light green for
/// the crossing time, then turns it red and releases the admission. The light
/// turns red before the admission is released, so no observer ever sees two
/// conflicting lanes green at once.
pub struct LaneController<'a> {
    pub lane: &'a Lane,
    pub admission: &'a AdmissionController<'a>,
    pub clock: &'a dyn Clock,
    pub observer: &'a dyn LightObserver,
    /// How long the light stays green for each vehicle, in simulated s.
    pub crossing_time: f64,
}

impl LaneController<'_> {
    /// Serves vehicles until the lane is closed and empty, returning the number served.
    pub fn run(&self) -> usize {
        let lane = self.lane.id();
        let mut crossings = 0;

        while let Some(arrival) = self.lane.wait_for_arrival() {
            self.admission.request_crossing(lane);
            self.set_light(LightState::Green, arrival.vehicle);

            self.clock.sleep(self.crossing_time);

            self.set_light(LightState::Red, arrival.vehicle);
            self.admission.release_crossing(lane);
            self.lane.pop_front();
            crossings += 1;
        }

        log::debug!("lane {} finished after {} crossings", lane, crossings);
        crossings
    }

    fn set_light(&self, state: LightState, vehicle: usize) {
        self.lane.set_light(state);
        self.observer.on_transition(&LightEvent {
            lane: self.lane.id(),
            state,
            time: self.clock.now(),
            vehicle,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::conflict::ConflictTable;
    use crate::lane::{Direction, LaneId, Side};
    use crate::light::EventLog;
    use crate::schedule::Arrival;
    use std::thread;
    use std::time::Duration;

    fn arrival(vehicle: usize, lane: LaneId) -> Arrival {
        Arrival {
            vehicle,
            lane,
            time: 0.0,
        }
    }

    #[test]
    fn light_is_green_only_while_crossing() {
        let id = LaneId::new(Side::North, Direction::Left);
        let lane = Lane::new(id);
        let admission = AdmissionController::new(ConflictTable::geometric());
        let clock = ManualClock::new();
        let log = EventLog::new();
        let controller = LaneController {
            lane: &lane,
            admission: &admission,
            clock: &clock,
            observer: &log,
            crossing_time: 5.0,
        };
        assert_eq!(lane.light(), LightState::Red);

        let crossings = thread::scope(|s| {
            let worker = s.spawn(|| controller.run());
            lane.append(arrival(0, id));

            clock.wait_for_sleepers(1);
            assert_eq!(lane.light(), LightState::Green);
            assert_eq!(admission.active_lanes(), vec![id]);
            assert_eq!(lane.depth(), 1);

            lane.close();
            clock.advance(5.0);
            worker.join().unwrap()
        });

        assert_eq!(crossings, 1);
        assert_eq!(lane.light(), LightState::Red);
        assert!(admission.active_lanes().is_empty());
        assert_eq!(lane.depth(), 0);
        let phases = log.green_phases();
        assert_eq!(phases.len(), 1);
        assert_eq!((phases[0].start, phases[0].end), (0.0, 5.0));
    }

    #[test]
    fn light_stays_red_until_admitted() {
        let id = LaneId::new(Side::North, Direction::Left);
        let blocker = LaneId::new(Side::East, Direction::Straight);
        let lane = Lane::new(id);
        let admission = AdmissionController::new(ConflictTable::geometric());
        let clock = ManualClock::new();
        let controller = LaneController {
            lane: &lane,
            admission: &admission,
            clock: &clock,
            observer: &crate::light::NullObserver,
            crossing_time: 5.0,
        };
        admission.request_crossing(blocker);

        thread::scope(|s| {
            s.spawn(|| controller.run());
            lane.append(arrival(0, id));
            while admission.pending() != vec![id] {
                thread::sleep(Duration::from_millis(1));
            }
            assert_eq!(lane.light(), LightState::Red);

            admission.release_crossing(blocker);
            clock.wait_for_sleepers(1);
            assert_eq!(lane.light(), LightState::Green);

            lane.close();
            clock.advance(5.0);
        });

        assert_eq!(lane.light(), LightState::Red);
        assert_eq!(admission.stats().grants, 2);
    }
}
