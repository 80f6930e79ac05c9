//! # Sequenced
//! Async requests for the same field can finish in any order. To keep the newest one authoritative, every request is tagged with a `RequestId`.
//! Ids are issued by a per-field `RequestSequencer` and increase monotonically, so "latest issued" is simply the largest id handed out so far.

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize)]
pub struct RequestId(u64);

impl RequestId {
    pub fn get(self) -> u64 {
        self.0
    }
}

#[derive(Clone, Debug, Default)]
pub struct RequestSequencer {
    latest_issued: u64,
    latest_settled: u64,
}

impl RequestSequencer {
    pub fn issue(&mut self) -> RequestId {
        self.latest_issued += 1;
        RequestId(self.latest_issued)
    }

    pub fn is_current(&self, id: RequestId) -> bool {
        id.0 == self.latest_issued
    }

    /// Returns true if `id` is the latest request, in which case its result should be applied.
    /// Stale ids are rejected and leave the sequencer untouched.
    pub fn settle(&mut self, id: RequestId) -> bool {
        if !self.is_current(id) {
            return false;
        }
        self.latest_settled = id.0;
        true
    }

    /// True while the latest issued request has not settled yet
    pub fn in_flight(&self) -> bool {
        self.latest_settled < self.latest_issued
    }

    /// Makes every outstanding request stale without starting a new one, for when a local change
    /// has made their answers out of date. Returns true if a request was in flight.
    pub fn supersede(&mut self) -> bool {
        let was_in_flight = self.in_flight();
        self.latest_issued += 1;
        self.latest_settled = self.latest_issued;
        was_in_flight
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Sequenced<T> {
    pub request_id: RequestId,
    pub value: T,
}

impl<T> Sequenced<T> {
    pub fn new(request_id: RequestId, value: T) -> Self {
        Self { request_id, value }
    }

    pub fn map<G, F: FnOnce(T) -> G>(self, f: F) -> Sequenced<G> {
        Sequenced {
            request_id: self.request_id,
            value: f(self.value),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ids_increase() {
        let mut sequencer = RequestSequencer::default();
        assert!(!sequencer.in_flight());
        let first = sequencer.issue();
        let second = sequencer.issue();
        assert!(first < second);
        assert!(sequencer.is_current(second));
        assert!(!sequencer.is_current(first));
    }

    #[test]
    fn test_stale_completion_is_rejected() {
        let mut sequencer = RequestSequencer::default();
        let first = sequencer.issue();
        let second = sequencer.issue();

        assert!(sequencer.settle(second));
        assert!(!sequencer.in_flight());

        // the superseded request finishes last
        assert!(!sequencer.settle(first));
        assert!(!sequencer.in_flight());
    }

    #[test]
    fn test_stale_completion_does_not_end_flight() {
        let mut sequencer = RequestSequencer::default();
        let first = sequencer.issue();
        let second = sequencer.issue();

        assert!(!sequencer.settle(first));
        assert!(sequencer.in_flight());
        assert!(sequencer.settle(second));
        assert!(!sequencer.in_flight());
    }

    #[test]
    fn test_supersede_drops_outstanding_requests() {
        let mut sequencer = RequestSequencer::default();
        let load = sequencer.issue();

        assert!(sequencer.supersede());
        assert!(!sequencer.in_flight());
        assert!(!sequencer.settle(load));

        // nothing left to supersede
        assert!(!sequencer.supersede());

        let next = sequencer.issue();
        assert!(sequencer.in_flight());
        assert!(sequencer.settle(next));
    }

    #[test]
    fn test_map_keeps_request_id() {
        let mut sequencer = RequestSequencer::default();
        let id = sequencer.issue();
        let mapped = Sequenced::new(id, "4").map(|value| value.len());
        assert_eq!(mapped, Sequenced::new(id, 1));
    }
}
