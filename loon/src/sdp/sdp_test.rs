use super::*;

const CHROME_DATACHANNEL_OFFER: &str = "v=0\r\n\
o=- 6021156581565849612 2 IN IP4 127.0.0.1\r\n\
s=-\r\n\
t=0 0\r\n\
a=group:BUNDLE 0\r\n\
a=extmap-allow-mixed\r\n\
a=msid-semantic: WMS\r\n\
m=application 9 UDP/DTLS/SCTP webrtc-datachannel\r\n\
c=IN IP4 0.0.0.0\r\n\
a=ice-ufrag:4cyS\r\n\
a=ice-pwd:fkEpAhczwOwcIP6ZSJRXAnTN\r\n\
a=ice-options:trickle\r\n\
a=fingerprint:sha-256 39:02:A6:86:95:4D:F7:88:D9:09:67:9F:5C:49:33:D3:35:78:46:63:7F:02:B6:E3:47:43:4A:41:1B:A6:A1:3D\r\n\
a=setup:actpass\r\n\
a=mid:0\r\n\
a=sctp-port:5000\r\n\
a=max-message-size:262144\r\n";

#[test]
fn test_parse_datachannel_offer() -> crate::error::Result<()> {
    let sdp = parse(CHROME_DATACHANNEL_OFFER)?;
    assert_eq!(sdp.bundle_group, vec!["0"]);
    assert!(sdp.extmap_allow_mixed);
    assert_eq!(sdp.media.len(), 1);

    let m = &sdp.media[0];
    assert!(m.is_application());
    assert_eq!(m.mid, "0");
    assert_eq!(m.ice_ufrag, "4cyS");
    assert_eq!(m.ice_pwd, "fkEpAhczwOwcIP6ZSJRXAnTN");
    assert!(m.ice_options_trickle);
    assert_eq!(m.setup, "actpass");
    assert_eq!(m.sctp_port, Some(5000));
    assert_eq!(m.max_message_size, Some(262144));
    let (alg, value) = m.fingerprint.as_ref().unwrap();
    assert_eq!(alg, "sha-256");
    assert!(value.starts_with("39:02"));
    Ok(())
}

#[test]
fn test_parse_serialize_parse_is_stable() -> crate::error::Result<()> {
    let first = parse(CHROME_DATACHANNEL_OFFER)?;
    let rendered = serialize(&first);
    let second = parse(&rendered)?;

    assert_eq!(first.bundle_group, second.bundle_group);
    assert_eq!(first.media.len(), second.media.len());
    let (a, b) = (&first.media[0], &second.media[0]);
    assert_eq!(a.mid, b.mid);
    assert_eq!(a.ice_ufrag, b.ice_ufrag);
    assert_eq!(a.ice_pwd, b.ice_pwd);
    assert_eq!(a.fingerprint, b.fingerprint);
    assert_eq!(a.setup, b.setup);
    assert_eq!(a.sctp_port, b.sctp_port);
    Ok(())
}

#[test]
fn test_parse_media_section_attributes() -> crate::error::Result<()> {
    let raw = "v=0\r\n\
o=- 1 2 IN IP4 127.0.0.1\r\n\
s=-\r\n\
t=0 0\r\n\
m=video 9 UDP/TLS/RTP/SAVPF 96 97\r\n\
a=mid:1\r\n\
a=sendrecv\r\n\
a=rtpmap:96 VP8/90000\r\n\
a=rtpmap:97 rtx/90000\r\n\
a=fmtp:97 apt=96\r\n\
a=rtcp-fb:96 nack\r\n\
a=rtcp-fb:96 nack pli\r\n\
a=extmap:3 http://www.ietf.org/id/draft-holmer-rmcat-transport-wide-cc-extensions-01\r\n\
a=ssrc-group:FID 1111 2222\r\n\
a=ssrc:1111 cname:test\r\n\
a=ssrc:2222 cname:test\r\n\
a=rid:hi send\r\n\
a=rid:lo send\r\n\
a=simulcast:send hi;lo\r\n";

    let sdp = parse(raw)?;
    let m = &sdp.media[0];
    assert_eq!(m.payload_types, vec![96, 97]);
    assert_eq!(m.direction, Some(RTCRtpTransceiverDirection::Sendrecv));
    assert_eq!(m.rtpmap.get(&96).unwrap(), "VP8/90000");
    assert_eq!(m.fmtp.get(&97).unwrap(), "apt=96");
    assert_eq!(m.rtcp_fb.len(), 2);
    assert_eq!(m.extmap[0].0, 3);
    assert_eq!(m.ssrc_groups[0], ("FID".to_owned(), vec![1111, 2222]));
    assert_eq!(m.ssrcs.len(), 2);
    assert_eq!(m.rids.len(), 2);
    assert_eq!(m.simulcast.as_deref(), Some("send hi;lo"));
    Ok(())
}
