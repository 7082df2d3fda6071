#[cfg(test)]
mod sdp_test;

pub mod sdp_type;
pub mod session_description;

use std::collections::HashMap;
use std::fmt::Write as _;

use crate::error::{Error, Result};
use crate::rtp_transceiver::RTCRtpTransceiverDirection;

/// The semantic slice of an SDP session the transport core reads and
/// writes. The full grammar lives outside the core; this model carries
/// exactly the fields negotiation needs.
#[derive(Default, Debug, Clone)]
pub struct ParsedSdp {
    pub session_id: u64,
    pub session_version: u64,
    /// mids listed in `a=group:BUNDLE`.
    pub bundle_group: Vec<String>,
    pub extmap_allow_mixed: bool,
    pub media: Vec<MediaSection>,
}

/// One m-section and the attributes the core consumes.
#[derive(Default, Debug, Clone)]
pub struct MediaSection {
    /// "audio", "video" or "application".
    pub kind: String,
    pub port: u16,
    pub proto: String,
    pub payload_types: Vec<u8>,

    pub mid: String,
    pub direction: Option<RTCRtpTransceiverDirection>,
    pub ice_ufrag: String,
    pub ice_pwd: String,
    pub ice_options_trickle: bool,
    /// (hash algorithm, value)
    pub fingerprint: Option<(String, String)>,
    /// "actpass" | "active" | "passive"
    pub setup: String,
    pub candidates: Vec<String>,
    pub end_of_candidates: bool,

    pub rtpmap: HashMap<u8, String>,
    pub fmtp: HashMap<u8, String>,
    pub rtcp_fb: Vec<(u8, String)>,
    pub extmap: Vec<(u8, String)>,
    pub ssrcs: Vec<(u32, String)>,
    /// (semantics, ssrc list), e.g. ("FID", [primary, rtx]).
    pub ssrc_groups: Vec<(String, Vec<u32>)>,
    pub rids: Vec<(String, String)>,
    pub simulcast: Option<String>,
    pub msid: Option<String>,

    pub sctp_port: Option<u16>,
    pub max_message_size: Option<u32>,
}

impl MediaSection {
    pub fn is_application(&self) -> bool {
        self.kind == "application"
    }
}

/// parse extracts the semantic model from SDP text.
pub fn parse(raw: &str) -> Result<ParsedSdp> {
    let mut sdp = ParsedSdp::default();
    let mut current: Option<MediaSection> = None;

    for line in raw.lines() {
        let line = line.trim_end();
        if line.len() < 2 {
            continue;
        }
        let (kind, value) = line.split_at(2);

        match kind {
            "o=" => {
                let parts: Vec<&str> = value.split_whitespace().collect();
                if parts.len() >= 3 {
                    sdp.session_id = parts[1].parse().unwrap_or(0);
                    sdp.session_version = parts[2].parse().unwrap_or(0);
                }
            }
            "m=" => {
                if let Some(section) = current.take() {
                    sdp.media.push(section);
                }
                let parts: Vec<&str> = value.split_whitespace().collect();
                if parts.len() < 3 {
                    return Err(Error::ErrSdpInvalid(format!("bad m-line: {line}")));
                }
                let mut section = MediaSection {
                    kind: parts[0].to_owned(),
                    port: parts[1].parse().unwrap_or(0),
                    proto: parts[2].to_owned(),
                    ..Default::default()
                };
                for pt in &parts[3..] {
                    if let Ok(pt) = pt.parse::<u8>() {
                        section.payload_types.push(pt);
                    }
                }
                current = Some(section);
            }
            "a=" => {
                let (attr, attr_value) = match value.split_once(':') {
                    Some((a, v)) => (a, v),
                    None => (value, ""),
                };
                match current.as_mut() {
                    None => parse_session_attribute(&mut sdp, attr, attr_value),
                    Some(section) => parse_media_attribute(section, attr, attr_value)?,
                }
            }
            _ => {}
        }
    }
    if let Some(section) = current.take() {
        sdp.media.push(section);
    }

    Ok(sdp)
}

fn parse_session_attribute(sdp: &mut ParsedSdp, attr: &str, value: &str) {
    match attr {
        "group" => {
            let mut parts = value.split_whitespace();
            if parts.next() == Some("BUNDLE") {
                sdp.bundle_group = parts.map(|s| s.to_owned()).collect();
            }
        }
        "extmap-allow-mixed" => sdp.extmap_allow_mixed = true,
        _ => {}
    }
}

fn parse_media_attribute(section: &mut MediaSection, attr: &str, value: &str) -> Result<()> {
    match attr {
        "mid" => section.mid = value.to_owned(),
        "ice-ufrag" => section.ice_ufrag = value.to_owned(),
        "ice-pwd" => section.ice_pwd = value.to_owned(),
        "ice-options" => {
            if value.split_whitespace().any(|o| o == "trickle") {
                section.ice_options_trickle = true;
            }
        }
        "fingerprint" => {
            let (alg, v) = value
                .split_once(' ')
                .ok_or_else(|| Error::ErrSdpInvalid(format!("bad fingerprint: {value}")))?;
            section.fingerprint = Some((alg.to_owned(), v.to_owned()));
        }
        "setup" => section.setup = value.to_owned(),
        "candidate" => section.candidates.push(value.to_owned()),
        "end-of-candidates" => section.end_of_candidates = true,
        "sendrecv" => section.direction = Some(RTCRtpTransceiverDirection::Sendrecv),
        "sendonly" => section.direction = Some(RTCRtpTransceiverDirection::Sendonly),
        "recvonly" => section.direction = Some(RTCRtpTransceiverDirection::Recvonly),
        "inactive" => section.direction = Some(RTCRtpTransceiverDirection::Inactive),
        "rtpmap" => {
            if let Some((pt, map)) = value.split_once(' ') {
                if let Ok(pt) = pt.parse() {
                    section.rtpmap.insert(pt, map.to_owned());
                }
            }
        }
        "fmtp" => {
            if let Some((pt, params)) = value.split_once(' ') {
                if let Ok(pt) = pt.parse() {
                    section.fmtp.insert(pt, params.to_owned());
                }
            }
        }
        "rtcp-fb" => {
            if let Some((pt, fb)) = value.split_once(' ') {
                if let Ok(pt) = pt.parse() {
                    section.rtcp_fb.push((pt, fb.to_owned()));
                }
            }
        }
        "extmap" => {
            if let Some((id, uri)) = value.split_once(' ') {
                // ids may carry a direction suffix ("2/recvonly")
                let id = id.split('/').next().unwrap_or(id);
                if let Ok(id) = id.parse() {
                    section.extmap.push((id, uri.to_owned()));
                }
            }
        }
        "ssrc" => {
            if let Some((ssrc, rest)) = value.split_once(' ') {
                if let Ok(ssrc) = ssrc.parse() {
                    section.ssrcs.push((ssrc, rest.to_owned()));
                }
            } else if let Ok(ssrc) = value.parse() {
                section.ssrcs.push((ssrc, String::new()));
            }
        }
        "ssrc-group" => {
            let mut parts = value.split_whitespace();
            if let Some(semantics) = parts.next() {
                let ssrcs: Vec<u32> = parts.filter_map(|s| s.parse().ok()).collect();
                section
                    .ssrc_groups
                    .push((semantics.to_owned(), ssrcs));
            }
        }
        "rid" => {
            if let Some((rid, dir)) = value.split_once(' ') {
                section.rids.push((rid.to_owned(), dir.to_owned()));
            }
        }
        "simulcast" => section.simulcast = Some(value.to_owned()),
        "msid" => section.msid = Some(value.to_owned()),
        "sctp-port" => section.sctp_port = value.parse().ok(),
        "max-message-size" => section.max_message_size = value.parse().ok(),
        _ => {}
    }
    Ok(())
}

/// serialize renders the semantic model back to SDP text.
pub fn serialize(sdp: &ParsedSdp) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "v=0");
    let _ = writeln!(
        out,
        "o=- {} {} IN IP4 0.0.0.0",
        sdp.session_id, sdp.session_version
    );
    let _ = writeln!(out, "s=-");
    let _ = writeln!(out, "t=0 0");
    if !sdp.bundle_group.is_empty() {
        let _ = writeln!(out, "a=group:BUNDLE {}", sdp.bundle_group.join(" "));
    }
    if sdp.extmap_allow_mixed {
        let _ = writeln!(out, "a=extmap-allow-mixed");
    }
    let _ = writeln!(out, "a=msid-semantic: WMS");

    for m in &sdp.media {
        let pts: Vec<String> = m.payload_types.iter().map(|p| p.to_string()).collect();
        let payload = if m.is_application() {
            "webrtc-datachannel".to_owned()
        } else {
            pts.join(" ")
        };
        let _ = writeln!(out, "m={} {} {} {}", m.kind, m.port, m.proto, payload);
        let _ = writeln!(out, "c=IN IP4 0.0.0.0");

        if !m.ice_ufrag.is_empty() {
            let _ = writeln!(out, "a=ice-ufrag:{}", m.ice_ufrag);
            let _ = writeln!(out, "a=ice-pwd:{}", m.ice_pwd);
        }
        if m.ice_options_trickle {
            let _ = writeln!(out, "a=ice-options:trickle");
        }
        if let Some((alg, v)) = &m.fingerprint {
            let _ = writeln!(out, "a=fingerprint:{alg} {v}");
        }
        if !m.setup.is_empty() {
            let _ = writeln!(out, "a=setup:{}", m.setup);
        }
        if !m.mid.is_empty() {
            let _ = writeln!(out, "a=mid:{}", m.mid);
        }
        for (id, uri) in &m.extmap {
            let _ = writeln!(out, "a=extmap:{id} {uri}");
        }
        if let Some(direction) = m.direction {
            let _ = writeln!(out, "a={direction}");
        }
        if let Some(msid) = &m.msid {
            let _ = writeln!(out, "a=msid:{msid}");
        }
        let _ = writeln!(out, "a=rtcp-mux");

        for pt in &m.payload_types {
            if let Some(map) = m.rtpmap.get(pt) {
                let _ = writeln!(out, "a=rtpmap:{pt} {map}");
            }
            for (fb_pt, fb) in &m.rtcp_fb {
                if fb_pt == pt {
                    let _ = writeln!(out, "a=rtcp-fb:{pt} {fb}");
                }
            }
            if let Some(params) = m.fmtp.get(pt) {
                let _ = writeln!(out, "a=fmtp:{pt} {params}");
            }
        }

        for (rid, dir) in &m.rids {
            let _ = writeln!(out, "a=rid:{rid} {dir}");
        }
        if let Some(simulcast) = &m.simulcast {
            let _ = writeln!(out, "a=simulcast:{simulcast}");
        }

        for (semantics, ssrcs) in &m.ssrc_groups {
            let list: Vec<String> = ssrcs.iter().map(|s| s.to_string()).collect();
            let _ = writeln!(out, "a=ssrc-group:{} {}", semantics, list.join(" "));
        }
        for (ssrc, attr) in &m.ssrcs {
            if attr.is_empty() {
                let _ = writeln!(out, "a=ssrc:{ssrc}");
            } else {
                let _ = writeln!(out, "a=ssrc:{ssrc} {attr}");
            }
        }

        if let Some(port) = m.sctp_port {
            let _ = writeln!(out, "a=sctp-port:{port}");
        }
        if let Some(size) = m.max_message_size {
            let _ = writeln!(out, "a=max-message-size:{size}");
        }

        for candidate in &m.candidates {
            let _ = writeln!(out, "a=candidate:{candidate}");
        }
        if m.end_of_candidates {
            let _ = writeln!(out, "a=end-of-candidates");
        }
    }

    out.replace('\n', "\r\n")
}

impl ParsedSdp {
    /// The ICE credentials of the first media section carrying them.
    pub fn ice_credentials(&self) -> Option<(String, String)> {
        self.media
            .iter()
            .find(|m| !m.ice_ufrag.is_empty())
            .map(|m| (m.ice_ufrag.clone(), m.ice_pwd.clone()))
    }

    /// The fingerprint of the first media section carrying one.
    pub fn fingerprint(&self) -> Option<(String, String)> {
        self.media.iter().find_map(|m| m.fingerprint.clone())
    }

    /// Whether the peer bundled its media onto one transport.
    pub fn is_bundled(&self) -> bool {
        !self.bundle_group.is_empty()
    }
}
