use crate::light::LightState;
use crate::schedule::Arrival;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::fmt;
use std::sync::{Condvar, Mutex, MutexGuard};

/// The number of entry lanes at the intersection.
pub const LANE_COUNT: usize = 16;

/// A side of the intersection which vehicles enter from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    North,
    East,
    South,
    West,
}

/// The movement a vehicle makes through the intersection, relative to its entry side.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Left,
    Straight,
    Right,
    #[serde(alias = "u-turn", alias = "u_turn")]
    UTurn,
}

/// Unique ID of an entry lane, in the range `0..16`.
///
/// The index is `side * 4 + direction`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct LaneId(u8);

/// A single entry lane: a FIFO queue of waiting vehicles and its traffic light.
///
/// The queue length doubles as the arrival signal, so any number of arrivals
/// may accumulate before the lane's controller wakes without any being lost.
pub struct Lane {
    /// The lane ID.
    id: LaneId,
    /// The queue and light, guarded together.
    state: Mutex<LaneState>,
    /// Signalled whenever an arrival is appended or the lane is closed.
    available: Condvar,
}

struct LaneState {
    /// Arrivals which have not yet completed their crossing, oldest first.
    queue: VecDeque<Arrival>,
    /// Set once no more arrivals will be appended.
    closed: bool,
    /// The current light state.
    light: LightState,
}

impl Side {
    /// All sides, in index order.
    pub const ALL: [Side; 4] = [Side::North, Side::East, Side::South, Side::West];

    /// Gets the side directly across the intersection.
    pub fn opposite(self) -> Side {
        self.rotate(2)
    }

    /// Gets the side reached by turning `quarters` quarter turns clockwise.
    pub fn rotate(self, quarters: usize) -> Side {
        Side::ALL[(self as usize + quarters) % 4]
    }
}

impl TryFrom<usize> for Side {
    type Error = usize;

    fn try_from(value: usize) -> Result<Self, Self::Error> {
        Side::ALL.get(value).copied().ok_or(value)
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

impl Direction {
    /// All movement directions, in index order.
    pub const ALL: [Direction; 4] = [
        Direction::Left,
        Direction::Straight,
        Direction::Right,
        Direction::UTurn,
    ];

    /// Gets the side a vehicle entering from `side` leaves the intersection through.
    ///
    /// Sides are ordered clockwise, so a vehicle entering from the north and
    /// heading south turns left onto the east side.
    pub fn exit_side(self, side: Side) -> Side {
        match self {
            Direction::Left => side.rotate(1),
            Direction::Straight => side.opposite(),
            Direction::Right => side.rotate(3),
            Direction::UTurn => side,
        }
    }
}

impl TryFrom<usize> for Direction {
    type Error = usize;

    fn try_from(value: usize) -> Result<Self, Self::Error> {
        Direction::ALL.get(value).copied().ok_or(value)
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

impl LaneId {
    /// Creates the ID of the lane entering from `side` and making the given movement.
    pub const fn new(side: Side, direction: Direction) -> Self {
        Self(side as u8 * 4 + direction as u8)
    }

    /// Gets the lane with the given index, if it is in range.
    pub fn from_index(index: usize) -> Option<Self> {
        (index < LANE_COUNT).then(|| Self(index as u8))
    }

    /// Returns an iterator over all sixteen lanes, in index order.
    pub fn all() -> impl Iterator<Item = LaneId> + Clone {
        (0..LANE_COUNT as u8).map(LaneId)
    }

    /// Gets the lane's index in `0..16`.
    pub fn index(self) -> usize {
        self.0 as usize
    }

    /// Gets the side the lane enters from.
    pub fn side(self) -> Side {
        Side::ALL[self.index() / 4]
    }

    /// Gets the movement made by vehicles in the lane.
    pub fn direction(self) -> Direction {
        Direction::ALL[self.index() % 4]
    }
}

impl fmt::Display for LaneId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.side(), self.direction())
    }
}

impl Lane {
    /// Creates an empty lane with a red light.
    pub fn new(id: LaneId) -> Self {
        Self {
            id,
            state: Mutex::new(LaneState {
                queue: VecDeque::new(),
                closed: false,
                light: LightState::Red,
            }),
            available: Condvar::new(),
        }
    }

    /// Creates all sixteen lanes, indexed by [LaneId::index].
    pub fn all() -> Vec<Lane> {
        LaneId::all().map(Lane::new).collect()
    }

    /// Gets the lane ID.
    pub fn id(&self) -> LaneId {
        self.id
    }

    /// Appends an arrival to the back of the queue and wakes the lane's controller.
    pub fn append(&self, arrival: Arrival) {
        debug_assert_eq!(arrival.lane, self.id);
        let mut state = self.lock();
        state.queue.push_back(arrival);
        self.available.notify_one();
    }

    /// Blocks until an arrival is waiting and returns it without removing it from the queue.
    ///
    /// Returns `None` once the lane has been closed and every arrival consumed.
    pub fn wait_for_arrival(&self) -> Option<Arrival> {
        let mut state = self.lock();
        loop {
            if let Some(arrival) = state.queue.front() {
                return Some(*arrival);
            }
            if state.closed {
                return None;
            }
            log::trace!("lane {} waiting for an arrival", self.id);
            state = self.available.wait(state).expect("lane state poisoned");
        }
    }

    /// Removes the arrival at the front of the queue, once its crossing is complete.
    pub fn pop_front(&self) -> Option<Arrival> {
        self.lock().queue.pop_front()
    }

    /// Signals that no more arrivals will be appended.
    pub fn close(&self) {
        self.lock().closed = true;
        self.available.notify_all();
    }

    /// Gets the number of vehicles waiting in or crossing from the lane.
    pub fn depth(&self) -> usize {
        self.lock().queue.len()
    }

    /// Gets the current state of the lane's light.
    pub fn light(&self) -> LightState {
        self.lock().light
    }

    /// Sets the state of the lane's light.
    pub(crate) fn set_light(&self, light: LightState) {
        self.lock().light = light;
    }

    fn lock(&self) -> MutexGuard<'_, LaneState> {
        self.state.lock().expect("lane state poisoned")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
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
    fn lane_ids_round_trip_through_side_and_direction() {
        for lane in LaneId::all() {
            assert_eq!(LaneId::new(lane.side(), lane.direction()), lane);
            assert_eq!(LaneId::from_index(lane.index()), Some(lane));
        }
        assert_eq!(LaneId::from_index(16), None);
        assert_eq!(LaneId::new(Side::West, Direction::UTurn).index(), 15);
    }

    #[test]
    fn exit_sides() {
        assert_eq!(Direction::Straight.exit_side(Side::North), Side::South);
        assert_eq!(Direction::Left.exit_side(Side::North), Side::East);
        assert_eq!(Direction::Right.exit_side(Side::North), Side::West);
        assert_eq!(Direction::UTurn.exit_side(Side::East), Side::East);
        assert_eq!(Direction::Left.exit_side(Side::West), Side::North);
    }

    #[test]
    fn burst_of_arrivals_is_kept_in_order() {
        let id = LaneId::new(Side::South, Direction::Right);
        let lane = Lane::new(id);
        for vehicle in 0..5 {
            lane.append(arrival(vehicle, id));
        }
        lane.close();

        let mut served = vec![];
        while let Some(next) = lane.wait_for_arrival() {
            assert_eq!(lane.pop_front(), Some(next));
            served.push(next.vehicle);
        }
        assert_eq!(served, vec![0, 1, 2, 3, 4]);
        assert_eq!(lane.depth(), 0);
    }

    #[test]
    fn waiting_controller_is_woken_by_append() {
        let id = LaneId::new(Side::East, Direction::Left);
        let lane = Arc::new(Lane::new(id));
        let waiter = {
            let lane = lane.clone();
            thread::spawn(move || lane.wait_for_arrival())
        };
        thread::sleep(Duration::from_millis(20));
        lane.append(arrival(7, id));
        assert_eq!(waiter.join().unwrap().map(|a| a.vehicle), Some(7));
        assert_eq!(lane.depth(), 1);
    }

    #[test]
    fn close_releases_an_idle_controller() {
        let lane = Arc::new(Lane::new(LaneId::new(Side::North, Direction::Straight)));
        let waiter = {
            let lane = lane.clone();
            thread::spawn(move || lane.wait_for_arrival())
        };
        thread::sleep(Duration::from_millis(20));
        lane.close();
        assert_eq!(waiter.join().unwrap(), None);
    }
}
