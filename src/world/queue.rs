//! Work queue (spec.md §4.6): FIFO-tiebreak priority queue of mesh-job
//! requests, `max_per_frame = 5` dispatched by the caller per tick.

use std::cmp::Ordering;

use priority_queue::PriorityQueue;

use crate::coords::ChunkPos;

/// Priority is clamped to this range (spec.md §4.6).
const MAX_PRIORITY: i32 = 999;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
struct QueuePriority {
    priority: i32,
    /// Insertion sequence; lower means earlier. Used only as a tie-break —
    /// ties on `priority` must resolve FIFO (spec.md §4.6 determinism note).
    seq: u64,
    is_regeneration: bool,
}

impl PartialOrd for QueuePriority {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for QueuePriority {
    fn cmp(&self, other: &Self) -> Ordering {
        // `priority_queue` pops the greatest element; lower `priority` value
        // and lower (earlier) `seq` must both sort as "greater" here.
        other
            .priority
            .cmp(&self.priority)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

/// A mutex-guarded instance of this is the single lock held by the
/// dispatcher (spec.md §5 "Work queue: mutated under a mutex").
pub struct WorkQueue {
    queue: PriorityQueue<ChunkPos, QueuePriority>,
    next_seq: u64,
}

impl Default for WorkQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl WorkQueue {
    pub fn new() -> Self {
        Self {
            queue: PriorityQueue::new(),
            next_seq: 0,
        }
    }

    /// Enqueues (or re-prioritizes, if already queued) `chunk_pos`.
    pub fn push(&mut self, chunk_pos: ChunkPos, priority: i32, is_regeneration: bool) {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.queue.push(
            chunk_pos,
            QueuePriority {
                priority: priority.clamp(0, MAX_PRIORITY),
                seq,
                is_regeneration,
            },
        );
    }

    /// Pops the highest-priority task (lowest `priority` number, FIFO among ties).
    pub fn pop(&mut self) -> Option<(ChunkPos, i32, bool)> {
        self.queue
            .pop()
            .map(|(pos, p)| (pos, p.priority, p.is_regeneration))
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }
}
