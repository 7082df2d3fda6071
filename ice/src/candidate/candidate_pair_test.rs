use std::sync::Arc;

use super::*;

fn host(address: &str, component: u16) -> Arc<Candidate> {
    Arc::new(Candidate {
        network_type: NetworkType::Udp4,
        candidate_type: CandidateType::Host,
        address: address.to_owned(),
        port: 1000,
        component,
        ..Default::default()
    })
}

fn relay(address: &str) -> Arc<Candidate> {
    Arc::new(Candidate {
        network_type: NetworkType::Udp4,
        candidate_type: CandidateType::Relay,
        address: address.to_owned(),
        port: 2000,
        component: COMPONENT_RTP,
        ..Default::default()
    })
}

#[test]
fn test_pair_priority_is_symmetric_on_roles() {
    let pair = CandidatePair::new(host("10.0.0.1", 1), host("10.0.0.2", 1));
    // both agents must derive the same pair priority regardless of role
    assert_eq!(pair.priority(true), pair.priority(false));
}

#[test]
fn test_pair_priority_prefers_host_over_relay() {
    let host_pair = CandidatePair::new(host("10.0.0.1", 1), host("10.0.0.2", 1));
    let relay_pair = CandidatePair::new(relay("8.8.8.8"), host("10.0.0.2", 1));
    assert!(host_pair.priority(true) > relay_pair.priority(true));
}

#[test]
fn test_compatibility_rules() {
    // equal component required
    assert!(!CandidatePair::compatible(
        &host("10.0.0.1", 1),
        &host("10.0.0.2", 2)
    ));
    assert!(CandidatePair::compatible(
        &host("10.0.0.1", 1),
        &host("10.0.0.2", 1)
    ));

    // equal IP family required
    let v6 = Candidate {
        network_type: NetworkType::Udp6,
        candidate_type: CandidateType::Host,
        address: "::1".to_owned(),
        port: 1000,
        component: 1,
        ..Default::default()
    };
    assert!(!CandidatePair::compatible(&host("10.0.0.1", 1), &v6));

    // tcp requires compatible tcp types
    let passive = Candidate {
        network_type: NetworkType::Tcp4,
        candidate_type: CandidateType::Host,
        address: "10.0.0.2".to_owned(),
        port: 9,
        component: 1,
        tcp_type: TcpType::Passive,
        ..Default::default()
    };
    let active = Candidate {
        network_type: NetworkType::Tcp4,
        candidate_type: CandidateType::Host,
        address: "10.0.0.1".to_owned(),
        port: 9,
        component: 1,
        tcp_type: TcpType::Active,
        ..Default::default()
    };
    let passive2 = Candidate {
        network_type: NetworkType::Tcp4,
        candidate_type: CandidateType::Host,
        address: "10.0.0.3".to_owned(),
        port: 9,
        component: 1,
        tcp_type: TcpType::Passive,
        ..Default::default()
    };
    assert!(CandidatePair::compatible(&active, &passive));
    assert!(!CandidatePair::compatible(&passive, &passive2));
}
