use super::*;

#[test]
fn test_sequencer_increments() {
    let s = new_fixed_sequencer(100);
    assert_eq!(s.next_sequence_number(), 100);
    assert_eq!(s.next_sequence_number(), 101);
    assert_eq!(s.roll_over_count(), 0);
}

#[test]
fn test_sequencer_rollover() {
    let s = new_fixed_sequencer(65535);
    assert_eq!(s.next_sequence_number(), 65535);
    assert_eq!(s.next_sequence_number(), 0);
    assert_eq!(s.roll_over_count(), 1);
    assert_eq!(s.next_sequence_number(), 1);
    assert_eq!(s.roll_over_count(), 1);
}

#[test]
fn test_sequencer_starting_at_zero() {
    let s = new_fixed_sequencer(0);
    assert_eq!(s.next_sequence_number(), 0);
    assert_eq!(s.roll_over_count(), 1);
}
