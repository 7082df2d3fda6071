#[cfg(test)]
mod sequence_test;

use std::sync::atomic::{AtomicU16, AtomicU64, Ordering};
use std::sync::Arc;

use rand::Rng;

/// Sequencer generates sequential sequence numbers for building RTP
/// packets, tracking 16-bit rollovers for the SRTP layer.
pub trait Sequencer: Send + Sync {
    fn next_sequence_number(&self) -> u16;
    fn roll_over_count(&self) -> u64;
    fn clone_to(&self) -> Box<dyn Sequencer>;
}

impl Clone for Box<dyn Sequencer> {
    fn clone(&self) -> Box<dyn Sequencer> {
        self.clone_to()
    }
}

/// new_random_sequencer returns a new sequencer starting from a random
/// sequence number.
pub fn new_random_sequencer() -> impl Sequencer {
    let c = Counters {
        sequence_number: Arc::new(AtomicU16::new(rand::thread_rng().gen::<u16>())),
        roll_over_count: Arc::new(AtomicU64::new(0)),
    };
    SequencerImpl(c)
}

/// new_fixed_sequencer returns a new sequencer starting from a specific
/// sequence number.
pub fn new_fixed_sequencer(s: u16) -> impl Sequencer {
    let sequence_number = if s == 0 { u16::MAX } else { s - 1 };

    let c = Counters {
        sequence_number: Arc::new(AtomicU16::new(sequence_number)),
        roll_over_count: Arc::new(AtomicU64::new(0)),
    };

    SequencerImpl(c)
}

#[derive(Debug, Clone)]
struct SequencerImpl(Counters);

#[derive(Debug, Clone)]
struct Counters {
    sequence_number: Arc<AtomicU16>,
    roll_over_count: Arc<AtomicU64>,
}

impl Sequencer for SequencerImpl {
    /// Returns the next sequence number, incrementing the roll-over count
    /// on 16-bit wrap.
    fn next_sequence_number(&self) -> u16 {
        let sequence_number = self.0.sequence_number.load(Ordering::SeqCst);
        let next = sequence_number.wrapping_add(1);
        self.0.sequence_number.store(next, Ordering::SeqCst);
        if next == 0 {
            self.0.roll_over_count.fetch_add(1, Ordering::SeqCst);
        }
        next
    }

    /// Returns the amount of times the 16-bit sequence number has wrapped.
    fn roll_over_count(&self) -> u64 {
        self.0.roll_over_count.load(Ordering::SeqCst)
    }

    fn clone_to(&self) -> Box<dyn Sequencer> {
        Box::new(self.clone())
    }
}
