use super::*;

#[test]
fn test_initial_rto() {
    let mgr = RtoManager::new();
    assert_eq!(mgr.get_rto(), RTO_INITIAL);
}

#[test]
fn test_rto_converges_toward_rtt() {
    let mut mgr = RtoManager::new();
    mgr.set_new_rtt(600.0);
    assert_eq!(mgr.srtt, 600.0);
    assert_eq!(mgr.rttvar, 300.0);
    // rto = srtt + 4 * rttvar = 1800
    assert_eq!(mgr.get_rto(), 1800.0);

    for _ in 0..20 {
        mgr.set_new_rtt(600.0);
    }
    // with a steady RTT, the variance decays and RTO hits the floor
    assert_eq!(mgr.get_rto(), RTO_MIN);
}

#[test]
fn test_backoff_doubles_and_caps() {
    let mut mgr = RtoManager::new();
    mgr.back_off();
    assert_eq!(mgr.get_rto(), RTO_INITIAL * 2.0);
    for _ in 0..10 {
        mgr.back_off();
    }
    assert_eq!(mgr.get_rto(), RTO_MAX);
}

#[test]
fn test_reset() {
    let mut mgr = RtoManager::new();
    mgr.set_new_rtt(100.0);
    mgr.back_off();
    mgr.reset();
    assert_eq!(mgr.get_rto(), RTO_INITIAL);
    assert_eq!(mgr.srtt, 0.0);
}
