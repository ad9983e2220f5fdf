use crate::conflict::ConflictTable;
use crate::lane::{LaneId, LANE_COUNT};
use arrayvec::ArrayVec;
use std::collections::VecDeque;
use std::sync::{Condvar, Mutex, MutexGuard};

/// Grants lanes permission to turn green, so that no two conflicting lanes are green together.
///
/// Requests are served in the order they were made, except that a request may
/// overtake older ones it does not conflict with. An older request reserves
/// every lane it conflicts with, so a request waits at most for the conflicting
/// lanes which were already green or already queued when it was made.
pub struct AdmissionController<'a> {
    /// The conflicts between lanes.
    conflicts: &'a ConflictTable,
    /// The admission state, guarded as a whole.
    state: Mutex<AdmissionState>,
    /// Signalled whenever a lane is released.
    released: Condvar,
}

/// Counters describing the controller's activity.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct AdmissionStats {
    /// The number of crossings granted.
    pub grants: usize,
    /// The number of crossings released.
    pub releases: usize,
    /// The largest number of lanes green at the same time.
    pub peak_active: usize,
}

/// A pending request to cross.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct Request {
    lane: LaneId,
    /// The global order in which the request was made.
    seq: u64,
}

#[derive(Debug, Default)]
struct AdmissionState {
    /// The lanes currently green.
    active: ArrayVec<LaneId, LANE_COUNT>,
    /// Pending requests, oldest first.
    requests: VecDeque<Request>,
    /// The sequence number of the next request.
    next_seq: u64,
    stats: AdmissionStats,
}

impl<'a> AdmissionController<'a> {
    /// Creates a controller enforcing the given conflicts, with every lane red.
    pub fn new(conflicts: &'a ConflictTable) -> Self {
        Self {
            conflicts,
            state: Mutex::new(AdmissionState::default()),
            released: Condvar::new(),
        }
    }

    /// Blocks until the lane may safely turn green, then marks it as active.
    ///
    /// # Panics
    /// Panics if the lane is already active or already waiting, which would mean
    /// its controller requested a second crossing without releasing the first.
    pub fn request_crossing(&self, lane: LaneId) {
        let mut state = self.lock();
        if state.is_active(lane) || state.is_pending(lane) {
            self.fail(&state, format_args!("lane {} requested a crossing twice", lane));
        }

        let seq = state.enqueue(lane);
        log::debug!("lane {} requested crossing #{}", lane, seq);

        while !state.is_eligible(seq, self.conflicts) {
            log::trace!("lane {} waiting for admission", lane);
            state = self.released.wait(state).expect("admission state poisoned");
        }

        state.admit(seq);
        if !self.conflicts.is_compatible(&state.active) {
            self.fail(&state, format_args!("admitting lane {} broke the active set", lane));
        }
        log::debug!("lane {} admitted, active: {:?}", lane, state.active);
    }

    /// Marks the lane as no longer green and wakes every waiting request to re-check it.
    ///
    /// # Panics
    /// Panics if the lane is not active.
    pub fn release_crossing(&self, lane: LaneId) {
        let mut state = self.lock();
        if !state.release(lane) {
            self.fail(&state, format_args!("lane {} released without being active", lane));
        }
        log::debug!("lane {} released", lane);
        self.released.notify_all();
    }

    /// Gets the lanes which are currently green.
    pub fn active_lanes(&self) -> Vec<LaneId> {
        self.lock().active.to_vec()
    }

    /// Gets the lanes waiting for admission, oldest request first.
    pub fn pending(&self) -> Vec<LaneId> {
        self.lock().requests.iter().map(|request| request.lane).collect()
    }

    /// Gets the controller's activity counters.
    pub fn stats(&self) -> AdmissionStats {
        self.lock().stats
    }

    fn lock(&self) -> MutexGuard<'_, AdmissionState> {
        self.state.lock().expect("admission state poisoned")
    }

    /// Dumps the admission state and aborts the calling thread.
    ///
    /// Waiting requests are woken first, so they see the poisoned state and
    /// abort too instead of waiting forever.
    fn fail(&self, state: &AdmissionState, reason: std::fmt::Arguments) -> ! {
        log::error!(
            "admission invariant violated: {}; active: {:?}; pending: {:?}; stats: {:?}",
            reason,
            state.active,
            state.requests,
            state.stats
        );
        self.released.notify_all();
        panic!("admission invariant violated: {}", reason);
    }
}

impl AdmissionState {
    fn is_active(&self, lane: LaneId) -> bool {
        self.active.contains(&lane)
    }

    fn is_pending(&self, lane: LaneId) -> bool {
        self.requests.iter().any(|request| request.lane == lane)
    }

    /// Queues a request for the lane, returning its sequence number.
    fn enqueue(&mut self, lane: LaneId) -> u64 {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.requests.push_back(Request { lane, seq });
        seq
    }

    /// Checks whether a pending request may be admitted now.
    ///
    /// The request must not conflict with any active lane,
    /// nor with any older request which is still pending.
    fn is_eligible(&self, seq: u64, conflicts: &ConflictTable) -> bool {
        let Some(idx) = self.requests.iter().position(|request| request.seq == seq) else {
            return false;
        };
        let lane = self.requests[idx].lane;
        let older = self.requests.iter().take(idx).map(|request| request.lane);
        !conflicts.conflicts_with_any(lane, self.active.iter().copied())
            && !conflicts.conflicts_with_any(lane, older)
    }

    /// Moves a pending request into the active set.
    fn admit(&mut self, seq: u64) {
        if let Some(idx) = self.requests.iter().position(|request| request.seq == seq) {
            if let Some(request) = self.requests.remove(idx) {
                self.active.push(request.lane);
                self.stats.grants += 1;
                self.stats.peak_active = self.stats.peak_active.max(self.active.len());
            }
        }
    }

    /// Removes a lane from the active set, returning whether it was active.
    fn release(&mut self, lane: LaneId) -> bool {
        match self.active.iter().position(|active| *active == lane) {
            Some(idx) => {
                self.active.swap_remove(idx);
                self.stats.releases += 1;
                true
            }
            None => false,
        }
    }
}
