use super::*;

#[test]
fn test_parse_url_success() -> Result<()> {
    let tests = vec![
        ("stun:google.de", SchemeType::Stun, "google.de", 3478, ProtoType::Udp),
        ("stun:google.de:6666", SchemeType::Stun, "google.de", 6666, ProtoType::Udp),
        ("stuns:google.de", SchemeType::Stuns, "google.de", 5349, ProtoType::Tcp),
        ("turn:google.de", SchemeType::Turn, "google.de", 3478, ProtoType::Udp),
        (
            "turn:google.de?transport=tcp",
            SchemeType::Turn,
            "google.de",
            3478,
            ProtoType::Tcp,
        ),
        ("turn:[::1]:1234", SchemeType::Turn, "::1", 1234, ProtoType::Udp),
    ];

    for (raw, scheme, host, port, proto) in tests {
        let url = Url::parse_url(raw)?;
        assert_eq!(url.scheme, scheme, "{raw}");
        assert_eq!(url.host, host, "{raw}");
        assert_eq!(url.port, port, "{raw}");
        assert_eq!(url.proto, proto, "{raw}");
    }
    Ok(())
}

#[test]
fn test_parse_url_failure() {
    for raw in [
        "",
        "google.de",
        "ftp:google.de",
        "stun:",
        "stun:google.de:port",
        "stun:google.de?transport=udp",
        "turn:google.de?transport=ip",
    ] {
        assert!(Url::parse_url(raw).is_err(), "{raw} should fail");
    }
}
