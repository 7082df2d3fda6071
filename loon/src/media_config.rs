use crate::rtp_transceiver::rtp_codec::{RTCRtpCodecParameters, RTPCodecType};

/// Negotiated RTP header-extension URIs and the ids we offer them with.
pub const EXT_URI_MID: &str = "urn:ietf:params:rtp-hdrext:sdes:mid";
pub const EXT_URI_RID: &str = "urn:ietf:params:rtp-hdrext:sdes:rtp-stream-id";
pub const EXT_URI_TWCC: &str =
    "http://www.ietf.org/id/draft-holmer-rmcat-transport-wide-cc-extensions-01";
pub const EXT_URI_ABS_SEND_TIME: &str =
    "http://www.webrtc.org/experiments/rtp-hdrext/abs-send-time";

pub const EXT_ID_TWCC: u8 = 3;
pub const EXT_ID_MID: u8 = 4;
pub const EXT_ID_RID: u8 = 10;

/// MediaConfig carries the codec and header-extension preference tables
/// that ride next to RTCConfiguration.
#[derive(Clone)]
pub struct MediaConfig {
    pub video_codecs: Vec<RTCRtpCodecParameters>,
    pub audio_codecs: Vec<RTCRtpCodecParameters>,
    pub header_extensions: Vec<(u8, String)>,
}

impl Default for MediaConfig {
    fn default() -> Self {
        MediaConfig {
            video_codecs: vec![
                RTCRtpCodecParameters {
                    payload_type: 96,
                    mime_type: "video/VP8".to_owned(),
                    clock_rate: 90000,
                    channels: 0,
                    sdp_fmtp_line: String::new(),
                    rtcp_feedback: vec![
                        "nack".to_owned(),
                        "nack pli".to_owned(),
                        "ccm fir".to_owned(),
                        "transport-cc".to_owned(),
                        "goog-remb".to_owned(),
                    ],
                    codec_type: RTPCodecType::Video,
                },
                RTCRtpCodecParameters {
                    payload_type: 97,
                    mime_type: "video/rtx".to_owned(),
                    clock_rate: 90000,
                    channels: 0,
                    sdp_fmtp_line: "apt=96".to_owned(),
                    rtcp_feedback: vec![],
                    codec_type: RTPCodecType::Video,
                },
            ],
            audio_codecs: vec![RTCRtpCodecParameters {
                payload_type: 111,
                mime_type: "audio/opus".to_owned(),
                clock_rate: 48000,
                channels: 2,
                sdp_fmtp_line: "minptime=10;useinbandfec=1".to_owned(),
                rtcp_feedback: vec!["transport-cc".to_owned()],
                codec_type: RTPCodecType::Audio,
            }],
            header_extensions: vec![
                (EXT_ID_TWCC, EXT_URI_TWCC.to_owned()),
                (EXT_ID_MID, EXT_URI_MID.to_owned()),
                (EXT_ID_RID, EXT_URI_RID.to_owned()),
            ],
        }
    }
}

impl MediaConfig {
    pub(crate) fn codecs_for(&self, kind: RTPCodecType) -> &[RTCRtpCodecParameters] {
        match kind {
            RTPCodecType::Audio => &self.audio_codecs,
            _ => &self.video_codecs,
        }
    }
}
