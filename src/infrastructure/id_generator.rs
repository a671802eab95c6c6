// Snowflake ids for every document collection
// 64-bit layout: [timestamp:42][node_id:10][sequence:12]

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

const NODE_BITS: u64 = 10;
const SEQUENCE_BITS: u64 = 12;
const SEQUENCE_MASK: u64 = (1 << SEQUENCE_BITS) - 1;
const TIMESTAMP_MASK: u64 = (1 << 42) - 1;

/// Ids are unique across collections, so an association row can name any
/// document without also storing its type.
#[derive(Debug)]
pub struct IdGenerator {
    node_id: u16,
    /// Packed `(timestamp << SEQUENCE_BITS) | sequence` of the last issued id.
    state: AtomicU64,
}

impl IdGenerator {
    pub fn new(node_id: u16) -> Self {
        assert!(node_id < 1024, "Node ID must be less than 1024");
        Self {
            node_id,
            state: AtomicU64::new(0),
        }
    }

    pub fn next_id(&self) -> i64 {
        loop {
            let now = now_millis() & TIMESTAMP_MASK;
            let prev = self.state.load(Ordering::Acquire);
            let prev_ts = prev >> SEQUENCE_BITS;
            let prev_seq = prev & SEQUENCE_MASK;

            let (ts, seq) = if now > prev_ts {
                (now, 0)
            } else if prev_seq < SEQUENCE_MASK {
                // Same millisecond, or the clock stepped back: keep counting on the last timestamp
                (prev_ts, prev_seq + 1)
            } else {
                std::thread::yield_now();
                continue;
            };

            let next = (ts << SEQUENCE_BITS) | seq;
            if self
                .state
                .compare_exchange(prev, next, Ordering::AcqRel, Ordering::Acquire)
                .is_ok()
            {
                let id = (ts << (NODE_BITS + SEQUENCE_BITS))
                    | ((self.node_id as u64) << SEQUENCE_BITS)
                    | seq;
                return id as i64;
            }
        }
    }

    pub fn node_of(id: i64) -> u16 {
        (((id as u64) >> SEQUENCE_BITS) & ((1 << NODE_BITS) - 1)) as u16
    }
}

fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::sync::Arc;

    #[test]
    fn test_ids_are_unique_and_increasing() {
        let generator = IdGenerator::new(7);
        let ids: Vec<i64> = (0..10_000).map(|_| generator.next_id()).collect();

        assert!(ids.windows(2).all(|w| w[0] < w[1]));
        assert!(ids.iter().all(|id| *id > 0));
        assert!(ids.iter().all(|id| IdGenerator::node_of(*id) == 7));
    }

    #[test]
    fn test_unique_across_threads() {
        let generator = Arc::new(IdGenerator::new(1));
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let generator = generator.clone();
                std::thread::spawn(move || (0..2_000).map(|_| generator.next_id()).collect::<Vec<_>>())
            })
            .collect();

        let mut seen = HashSet::new();
        for handle in handles {
            for id in handle.join().unwrap() {
                assert!(seen.insert(id), "duplicate id {}", id);
            }
        }
        assert_eq!(seen.len(), 8_000);
    }
}
