use super::*;

fn run(detector: &mut SlidingWindowDetector, input: &[u64], expected: &[bool]) {
    for (seq, expect) in input.iter().zip(expected.iter()) {
        let ok = detector.check(*seq);
        assert_eq!(
            ok, *expect,
            "seq {seq}: expected accept={expect}, got {ok}"
        );
        if ok {
            detector.commit(*seq);
        }
    }
}

#[test]
fn test_in_order_accepted() {
    let mut d = SlidingWindowDetector::new(64, u64::MAX);
    run(
        &mut d,
        &[0, 1, 2, 3, 4],
        &[true, true, true, true, true],
    );
}

#[test]
fn test_duplicate_rejected() {
    let mut d = SlidingWindowDetector::new(64, u64::MAX);
    run(&mut d, &[10, 10], &[true, false]);
}

#[test]
fn test_out_of_order_within_window() {
    let mut d = SlidingWindowDetector::new(64, u64::MAX);
    run(&mut d, &[100, 50, 99, 50], &[true, true, true, false]);
}

#[test]
fn test_too_old_rejected() {
    let mut d = SlidingWindowDetector::new(64, u64::MAX);
    run(&mut d, &[100, 37, 36], &[true, true, false]);
}

#[test]
fn test_max_seq_enforced() {
    let mut d = SlidingWindowDetector::new(64, 0x7fff_ffff);
    run(&mut d, &[0x8000_0000], &[false]);
}

#[test]
fn test_uncommitted_check_does_not_advance() {
    let mut d = SlidingWindowDetector::new(64, u64::MAX);
    assert!(d.check(1000));
    // not committed: the same index must still be acceptable
    assert!(d.check(1000));
    d.commit(1000);
    assert!(!d.check(1000));
}

#[test]
fn test_large_jump_clears_window() {
    let mut d = SlidingWindowDetector::new(64, u64::MAX);
    run(&mut d, &[1, 500, 499, 1], &[true, true, true, false]);
}
