use crate::clock::Clock;
use crate::lane::Lane;
use crate::schedule::Schedule;

/// Replays a schedule, delivering each arrival to its lane at its scheduled time.
pub struct ArrivalFeed<'a> {
    pub schedule: &'a Schedule,
    /// The lanes, indexed by [crate::LaneId::index].
    pub lanes: &'a [Lane],
    pub clock: &'a dyn Clock,
}

impl ArrivalFeed<'_> {
    /// Delivers every scheduled arrival, then closes all the lanes.
    ///
    /// Each delay is the gap between consecutive arrival times, the first measured from `t = 0`.
    pub fn run(&self) {
        let mut time = 0.0;
        for arrival in self.schedule.arrivals() {
            self.clock.sleep(arrival.time - time);
            time = arrival.time;
            log::debug!(
                "vehicle {} arrived at lane {} (t={:.2})",
                arrival.vehicle,
                arrival.lane,
                self.clock.now()
            );
            self.lanes[arrival.lane.index()].append(*arrival);
        }
        self.close_all();
    }

    /// Signals every lane that no more arrivals will come.
    pub fn close_all(&self) {
        for lane in self.lanes {
            lane.close();
        }
    }
}
