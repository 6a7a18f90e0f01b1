//! Time-ordered event queue driving a fight

use crate::procs::ProcId;
use std::cmp::Ordering;
use std::collections::BinaryHeap;

/// What happens when an event is dispatched
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    MainHandSwing,
    OffHandSwing,
    /// Extra main-hand swing granted by a proc; that proc cannot chain off it
    ExtraSwing { source: ProcId },
    GlobalCooldown,
    /// Training dummy rage feed
    RageTick,
}

/// Event in the simulation queue
#[derive(Debug, Clone, Copy)]
pub struct Event {
    pub time: f64,
    seq: u64,
    pub kind: EventKind,
}

impl PartialEq for Event {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Event {}

impl PartialOrd for Event {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Event {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reverse ordering for min-heap behavior
        other
            .time
            .total_cmp(&self.time)
            .then(other.seq.cmp(&self.seq))
    }
}

/// Min-heap of events keyed by (time, insertion order), bounded by a horizon.
#[derive(Debug, Clone)]
pub struct EventQueue {
    heap: BinaryHeap<Event>,
    next_seq: u64,
    horizon: f64,
    last_dispatched: f64,
}

impl EventQueue {
    /// Queue that never dispatches anything later than `horizon`
    pub fn new(horizon: f64) -> Self {
        Self {
            heap: BinaryHeap::with_capacity(64),
            next_seq: 0,
            horizon,
            last_dispatched: 0.0,
        }
    }

    /// Insert an event. Events past the horizon are dropped; returns whether
    /// it was queued.
    pub fn schedule(&mut self, time: f64, kind: EventKind) -> bool {
        debug_assert!(
            time >= self.last_dispatched,
            "event scheduled in the past: {time} < {}",
            self.last_dispatched
        );
        if !(time <= self.horizon) {
            return false;
        }
        let seq = self.next_seq;
        self.next_seq += 1;
        self.heap.push(Event { time: time.max(self.last_dispatched), seq, kind });
        true
    }

    /// Earliest pending event, FIFO among equal times.
    pub fn pop_next(&mut self) -> Option<Event> {
        let event = self.heap.pop()?;
        if event.time > self.horizon {
            self.heap.clear();
            return None;
        }
        self.last_dispatched = event.time;
        Some(event)
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.heap.len()
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pops_in_time_order() {
        let mut q = EventQueue::new(60.0);
        q.schedule(2.0, EventKind::GlobalCooldown);
        q.schedule(0.5, EventKind::MainHandSwing);
        q.schedule(1.0, EventKind::OffHandSwing);

        let times: Vec<f64> = std::iter::from_fn(|| q.pop_next()).map(|e| e.time).collect();
        assert_eq!(times, vec![0.5, 1.0, 2.0]);
    }

    #[test]
    fn test_ties_are_fifo() {
        let mut q = EventQueue::new(60.0);
        q.schedule(1.0, EventKind::GlobalCooldown);
        q.schedule(1.0, EventKind::MainHandSwing);
        q.schedule(1.0, EventKind::ExtraSwing { source: ProcId::HandOfJustice });
        q.schedule(1.0, EventKind::OffHandSwing);

        let kinds: Vec<EventKind> = std::iter::from_fn(|| q.pop_next()).map(|e| e.kind).collect();
        assert_eq!(
            kinds,
            vec![
                EventKind::GlobalCooldown,
                EventKind::MainHandSwing,
                EventKind::ExtraSwing { source: ProcId::HandOfJustice },
                EventKind::OffHandSwing,
            ]
        );
    }

    #[test]
    fn test_horizon_drops_late_events() {
        let mut q = EventQueue::new(10.0);
        assert!(q.schedule(10.0, EventKind::MainHandSwing));
        assert!(!q.schedule(10.01, EventKind::MainHandSwing));
        assert_eq!(q.len(), 1);
        assert_eq!(q.pop_next().map(|e| e.time), Some(10.0));
        assert!(q.pop_next().is_none());
        assert!(q.is_empty());
    }

    #[test]
    fn test_same_time_reinsert_runs_after_pending() {
        let mut q = EventQueue::new(10.0);
        q.schedule(1.0, EventKind::MainHandSwing);
        q.schedule(1.0, EventKind::GlobalCooldown);
        let first = q.pop_next().unwrap();
        assert_eq!(first.kind, EventKind::MainHandSwing);
        // A bonus swing at the current time goes behind what is already queued
        q.schedule(1.0, EventKind::ExtraSwing { source: ProcId::FlurryAxe });
        assert_eq!(q.pop_next().unwrap().kind, EventKind::GlobalCooldown);
        assert!(matches!(q.pop_next().unwrap().kind, EventKind::ExtraSwing { .. }));
    }
}
