use std::fmt;

/// RTPCodecType determines the type of a codec.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum RTPCodecType {
    Unspecified,
    Audio,
    Video,
}

impl Default for RTPCodecType {
    fn default() -> Self {
        RTPCodecType::Unspecified
    }
}

impl fmt::Display for RTPCodecType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RTPCodecType::Audio => "audio",
            RTPCodecType::Video => "video",
            RTPCodecType::Unspecified => "unspecified",
        };
        write!(f, "{s}")
    }
}

impl From<&str> for RTPCodecType {
    fn from(raw: &str) -> Self {
        match raw {
            "audio" => RTPCodecType::Audio,
            "video" => RTPCodecType::Video,
            _ => RTPCodecType::Unspecified,
        }
    }
}

/// RTCRtpCodecParameters is a codec table entry: payload type plus the
/// parameters that describe it in SDP.
#[derive(Default, Debug, Clone, PartialEq, Eq)]
pub struct RTCRtpCodecParameters {
    pub payload_type: u8,
    /// e.g. "video/VP8", "audio/opus", "video/rtx".
    pub mime_type: String,
    pub clock_rate: u32,
    pub channels: u16,
    pub sdp_fmtp_line: String,
    pub rtcp_feedback: Vec<String>,
    pub codec_type: RTPCodecType,
}

impl RTCRtpCodecParameters {
    /// The rtpmap encoding name portion, e.g. "VP8/90000".
    pub fn rtpmap_line(&self) -> String {
        let name = self
            .mime_type
            .split_once('/')
            .map(|(_, n)| n)
            .unwrap_or(&self.mime_type);
        if self.channels > 0 {
            format!("{}/{}/{}", name, self.clock_rate, self.channels)
        } else {
            format!("{}/{}", name, self.clock_rate)
        }
    }

    pub fn is_rtx(&self) -> bool {
        self.mime_type.to_lowercase().ends_with("/rtx")
    }

    /// For RTX codecs, the associated payload type from `apt=`.
    pub fn apt(&self) -> Option<u8> {
        self.sdp_fmtp_line
            .split(';')
            .find_map(|p| p.trim().strip_prefix("apt="))
            .and_then(|v| v.parse().ok())
    }
}
