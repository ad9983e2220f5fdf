use crate::lane::{LaneId, Side, LANE_COUNT};
use crate::math::{rot90_cw, LineSegment2d, Point2d, Vector2d};
use itertools::iproduct;
use once_cell::sync::Lazy;
use smallvec::SmallVec;
use std::fmt;

/// The lateral offset of a lane's centre line from the centre of its road,
/// as a fraction of the half-width of the intersection.
const LANE_OFFSET: f64 = 0.5;

static GEOMETRIC_CONFLICTS: Lazy<ConflictTable> = Lazy::new(ConflictTable::from_geometry);

/// A symmetric table of which lanes may never be green at the same time.
#[derive(Clone, PartialEq, Eq)]
pub struct ConflictTable {
    /// Bit `j` of `masks[i]` is set if lane `i` conflicts with lane `j`.
    masks: [u16; LANE_COUNT],
}

impl ConflictTable {
    /// Gets the conflict table derived from the intersection geometry,
    /// which is computed once and shared for the lifetime of the process.
    pub fn geometric() -> &'static ConflictTable {
        &GEOMETRIC_CONFLICTS
    }

    /// Computes the conflict table from the intersection geometry.
    ///
    /// The intersection is the square `[-1, 1]²` with traffic keeping to the right.
    /// Each lane's path is the chord from its entry point to its exit point, and two
    /// lanes conflict if their paths touch or cross. A shared exit point is a merge,
    /// which is a conflict. Lanes entering from the same side never conflict.
    pub fn from_geometry() -> Self {
        Self::from_fn(|a, b| {
            a.side() != b.side() && lane_path(a).intersects(&lane_path(b))
        })
    }

    /// Creates a conflict table from a predicate.
    ///
    /// The predicate is made symmetric (a pair conflicts if it conflicts either way round),
    /// and a lane never conflicts with itself.
    pub fn from_fn(mut conflicts: impl FnMut(LaneId, LaneId) -> bool) -> Self {
        let mut masks = [0u16; LANE_COUNT];
        for (a, b) in iproduct!(LaneId::all(), LaneId::all()) {
            if a != b && conflicts(a, b) {
                masks[a.index()] |= 1 << b.index();
                masks[b.index()] |= 1 << a.index();
            }
        }
        Self { masks }
    }

    /// Creates a table in which no lanes conflict.
    pub fn empty() -> Self {
        Self {
            masks: [0; LANE_COUNT],
        }
    }

    /// Checks whether two lanes may never be green at the same time.
    pub fn conflicts(&self, a: LaneId, b: LaneId) -> bool {
        self.masks[a.index()] & (1 << b.index()) != 0
    }

    /// Gets the lanes which conflict with the given lane.
    pub fn conflicts_with(&self, lane: LaneId) -> SmallVec<[LaneId; LANE_COUNT]> {
        LaneId::all()
            .filter(|other| self.conflicts(lane, *other))
            .collect()
    }

    /// Checks whether a lane conflicts with any of the given lanes.
    pub fn conflicts_with_any(
        &self,
        lane: LaneId,
        others: impl IntoIterator<Item = LaneId>,
    ) -> bool {
        others.into_iter().any(|other| self.conflicts(lane, other))
    }

    /// Checks that no two of the given lanes conflict.
    pub fn is_compatible(&self, lanes: &[LaneId]) -> bool {
        lanes
            .iter()
            .enumerate()
            .all(|(i, a)| !self.conflicts_with_any(*a, lanes[i + 1..].iter().copied()))
    }

    /// Computes the size of the largest set of lanes which may all be green at once.
    pub fn max_concurrency(&self) -> usize {
        (0u32..1 << LANE_COUNT)
            .filter(|set| {
                LaneId::all()
                    .filter(|lane| set & (1 << lane.index()) != 0)
                    .all(|lane| u32::from(self.masks[lane.index()]) & set == 0)
            })
            .map(|set| set.count_ones() as usize)
            .max()
            .unwrap_or(0)
    }
}

impl fmt::Debug for ConflictTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut map = f.debug_map();
        for lane in LaneId::all() {
            let others = self.conflicts_with(lane);
            map.entry(
                &format_args!("{}", lane),
                &format_args!("{}", itertools::join(others.iter(), ", ")),
            );
        }
        map.finish()
    }
}

/// Gets the outward normal of a side of the intersection.
fn side_normal(side: Side) -> Vector2d {
    match side {
        Side::North => Vector2d::new(0.0, 1.0),
        Side::East => Vector2d::new(1.0, 0.0),
        Side::South => Vector2d::new(0.0, -1.0),
        Side::West => Vector2d::new(-1.0, 0.0),
    }
}

/// Gets the point where a vehicle on the right-hand lane of `side` enters the intersection.
fn entry_point(side: Side) -> Point2d {
    let normal = side_normal(side);
    Point2d::new(0.0, 0.0) + normal + LANE_OFFSET * rot90_cw(-normal)
}

/// Gets the point where a vehicle on the right-hand lane of `side` leaves the intersection.
fn exit_point(side: Side) -> Point2d {
    let normal = side_normal(side);
    Point2d::new(0.0, 0.0) + normal + LANE_OFFSET * rot90_cw(normal)
}

/// Gets the path a vehicle in the lane takes through the intersection.
pub fn lane_path(lane: LaneId) -> LineSegment2d {
    let exit = lane.direction().exit_side(lane.side());
    LineSegment2d::from_ends(entry_point(lane.side()), exit_point(exit))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lane::Direction::*;
    use crate::lane::Side::*;

    fn lane(side: Side, direction: crate::lane::Direction) -> LaneId {
        LaneId::new(side, direction)
    }

    #[test]
    fn table_is_symmetric_and_irreflexive() {
        let table = ConflictTable::geometric();
        for (a, b) in iproduct!(LaneId::all(), LaneId::all()) {
            assert_eq!(table.conflicts(a, b), table.conflicts(b, a), "{a} / {b}");
        }
        for a in LaneId::all() {
            assert!(!table.conflicts(a, a));
        }
    }

    #[test]
    fn same_side_lanes_never_conflict() {
        let table = ConflictTable::geometric();
        for (a, b) in iproduct!(LaneId::all(), LaneId::all()) {
            if a.side() == b.side() {
                assert!(!table.conflicts(a, b), "{a} / {b}");
            }
        }
    }

    #[test]
    fn opposite_straight_lanes_are_compatible() {
        let table = ConflictTable::geometric();
        assert!(!table.conflicts(lane(North, Straight), lane(South, Straight)));
        assert!(!table.conflicts(lane(East, Straight), lane(West, Straight)));
    }

    #[test]
    fn crossing_and_merging_lanes_conflict() {
        let table = ConflictTable::geometric();
        // Crossing paths
        assert!(table.conflicts(lane(North, Left), lane(East, Straight)));
        assert!(table.conflicts(lane(North, Straight), lane(East, Straight)));
        // Merging into the same exit
        assert!(table.conflicts(lane(North, Right), lane(East, Straight)));
        assert!(table.conflicts(lane(South, Straight), lane(East, Right)));
    }

    #[test]
    fn right_turns_from_adjacent_sides_are_compatible() {
        let table = ConflictTable::geometric();
        assert!(!table.conflicts(lane(North, Right), lane(East, Right)));
        assert!(!table.conflicts(lane(North, Right), lane(South, Right)));
    }

    #[test]
    fn entry_and_exit_points() {
        assert_eq!(entry_point(North), Point2d::new(-0.5, 1.0));
        assert_eq!(exit_point(North), Point2d::new(0.5, 1.0));
        assert_eq!(entry_point(West), Point2d::new(-1.0, -0.5));
    }

    #[test]
    fn compatibility_of_lane_sets() {
        let table = ConflictTable::geometric();
        assert!(table.is_compatible(&[lane(North, Straight), lane(South, Straight)]));
        assert!(!table.is_compatible(&[
            lane(North, Straight),
            lane(South, Straight),
            lane(West, Straight)
        ]));
    }

    #[test]
    fn max_concurrency_of_simple_tables() {
        assert_eq!(ConflictTable::empty().max_concurrency(), LANE_COUNT);
        let all = ConflictTable::from_fn(|_, _| true);
        assert_eq!(all.max_concurrency(), 1);
        let geometric = ConflictTable::geometric().max_concurrency();
        assert!(geometric >= 4 && geometric < LANE_COUNT);
    }
}
