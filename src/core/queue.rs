use keyed_priority_queue::KeyedPriorityQueue;
use rustc_hash::FxHashMap;
use std::cmp::Ordering;

use super::{event::EventKind, state::Pid, Ticks};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EventId(u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EventKey {
    pub time: Ticks,
    pub rank: u8,
    seq: u64,
}

// KeyedPriorityQueue is a max-heap, so the earliest key must compare greatest
impl PartialOrd for EventKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for EventKey {
    fn cmp(&self, other: &Self) -> Ordering {
        (other.time, other.rank, other.seq).cmp(&(self.time, self.rank, self.seq))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PendingEvent {
    pub time: Ticks,
    pub kind: EventKind,
    // None for dispatch evaluations
    pub pid: Option<Pid>,
}

#[derive(Debug)]
pub struct EventQueue {
    heap: KeyedPriorityQueue<EventId, EventKey>,
    events: FxHashMap<EventId, PendingEvent>,
    next_seq: u64,
}

impl EventQueue {
    pub fn new() -> Self {
        Self {
            heap: KeyedPriorityQueue::new(),
            events: FxHashMap::default(),
            next_seq: 0,
        }
    }

    pub fn push(&mut self, time: Ticks, kind: EventKind, pid: Option<Pid>) -> EventId {
        let seq = self.next_seq;
        self.next_seq += 1;

        let id = EventId(seq);
        let key = EventKey {
            time,
            rank: kind.rank(),
            seq,
        };
        self.heap.push(id, key);
        self.events.insert(id, PendingEvent { time, kind, pid });
        id
    }

    pub fn pop(&mut self) -> Option<PendingEvent> {
        let (id, _) = self.heap.pop()?;
        let event = self.events.remove(&id);
        debug_assert!(event.is_some(), "Queued event {id:?} missing its payload");
        event
    }

    pub fn cancel(&mut self, id: EventId) -> Option<PendingEvent> {
        self.heap.remove(&id)?;
        self.events.remove(&id)
    }

    pub fn len(&self) -> usize {
        self.heap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }
}

impl Default for EventQueue {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::PreemptCause;

    fn drain(queue: &mut EventQueue) -> Vec<(Ticks, EventKind)> {
        std::iter::from_fn(|| queue.pop())
            .map(|e| (e.time, e.kind))
            .collect()
    }

    #[test]
    fn earlier_time_wins_over_rank() {
        let mut queue = EventQueue::new();
        queue.push(5, EventKind::Terminate, None);
        queue.push(2, EventKind::TerminationComplete, None);

        assert_eq!(
            drain(&mut queue),
            vec![(2, EventKind::TerminationComplete), (5, EventKind::Terminate)]
        );
    }

    #[test]
    fn same_time_follows_rank_table() {
        let mut queue = EventQueue::new();
        queue.push(4, EventKind::TerminationComplete, None);
        queue.push(4, EventKind::Dispatch, None);
        queue.push(4, EventKind::AdmissionComplete, None);
        queue.push(4, EventKind::IoComplete, None);
        queue.push(4, EventKind::Preempt(PreemptCause::TimeSlice), None);
        queue.push(4, EventKind::Block, None);
        queue.push(4, EventKind::Terminate, None);

        let ranks: Vec<u8> = drain(&mut queue).iter().map(|(_, k)| k.rank()).collect();
        assert_eq!(ranks, vec![1, 2, 3, 4, 5, 6, 7]);
    }

    #[test]
    fn equal_rank_keeps_insertion_order() {
        let mut queue = EventQueue::new();
        queue.push(1, EventKind::AdmissionComplete, None);
        queue.push(1, EventKind::Arrival, None);
        queue.push(1, EventKind::AdmissionComplete, None);

        assert_eq!(
            drain(&mut queue),
            vec![
                (1, EventKind::AdmissionComplete),
                (1, EventKind::Arrival),
                (1, EventKind::AdmissionComplete),
            ]
        );
    }

    #[test]
    fn cancelled_event_never_pops() {
        let mut queue = EventQueue::new();
        let doomed = queue.push(3, EventKind::Terminate, None);
        queue.push(6, EventKind::Dispatch, None);

        assert!(queue.cancel(doomed).is_some());
        assert!(queue.cancel(doomed).is_none());
        assert_eq!(queue.len(), 1);
        assert_eq!(drain(&mut queue), vec![(6, EventKind::Dispatch)]);
        assert!(queue.is_empty());
    }
}
