use super::*;

#[test]
fn test_candidate_priority() {
    let host = Candidate {
        candidate_type: CandidateType::Host,
        component: COMPONENT_RTP,
        ..Default::default()
    };
    assert_eq!(host.priority(), 2130706431);

    let relay = Candidate {
        candidate_type: CandidateType::Relay,
        component: COMPONENT_RTP,
        ..Default::default()
    };
    assert!(relay.priority() < host.priority());
}

#[test]
fn test_candidate_marshal_round_trip() -> Result<()> {
    let c = Candidate {
        network_type: NetworkType::Udp4,
        candidate_type: CandidateType::ServerReflexive,
        address: "1.2.3.4".to_owned(),
        port: 5000,
        component: 1,
        related_address: Some(CandidateRelatedAddress {
            address: "192.168.0.10".to_owned(),
            port: 6000,
        }),
        ..Default::default()
    };

    let raw = c.marshal();
    let parsed = Candidate::unmarshal(&raw)?;
    assert!(parsed.equal(&c), "{raw} did not round-trip");
    assert_eq!(parsed.related_address, c.related_address);
    assert_eq!(parsed.priority(), c.priority());
    Ok(())
}

#[test]
fn test_candidate_unmarshal_with_prefixes() -> Result<()> {
    let plain = "647372371 1 udp 2130706431 10.0.0.1 53634 typ host";
    for raw in [
        plain.to_owned(),
        format!("candidate:{plain}"),
        format!("a=candidate:{plain}"),
    ] {
        let c = Candidate::unmarshal(&raw)?;
        assert_eq!(c.address, "10.0.0.1");
        assert_eq!(c.port, 53634);
        assert_eq!(c.candidate_type, CandidateType::Host);
        assert_eq!(c.priority(), 2130706431);
        assert_eq!(c.foundation(), "647372371");
    }
    Ok(())
}

#[test]
fn test_candidate_unmarshal_tcp() -> Result<()> {
    let raw = "1052353102 1 tcp 1675624447 10.0.75.1 9 typ host tcptype passive";
    let c = Candidate::unmarshal(raw)?;
    assert_eq!(c.tcp_type, TcpType::Passive);
    assert!(c.network_type.is_tcp());
    Ok(())
}

#[test]
fn test_candidate_unmarshal_mdns() -> Result<()> {
    let raw = "1 1 udp 2130706431 1f4712db-ea17-4bcf-a596-105139dfd8bf.local 9000 typ host";
    let c = Candidate::unmarshal(raw)?;
    assert!(c.is_mdns_name());
    assert!(c.addr().is_none(), "unresolved mDNS name has no address");
    Ok(())
}

#[test]
fn test_candidate_unmarshal_rejects_garbage() {
    for raw in [
        "",
        "1 1 udp 2130706431 10.0.0.1",
        "1 1 udp 2130706431 10.0.0.1 53634 invalid host",
        "1 one udp 2130706431 10.0.0.1 53634 typ host",
    ] {
        assert!(Candidate::unmarshal(raw).is_err(), "{raw} should fail");
    }
}
