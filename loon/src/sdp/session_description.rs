use super::sdp_type::RTCSdpType;
use super::ParsedSdp;
use crate::error::Result;

/// RTCSessionDescription is used to expose local and remote
/// descriptions: the W3C (type, sdp) string pair, plus the parsed
/// semantic model.
#[derive(Default, Debug, Clone)]
pub struct RTCSessionDescription {
    pub sdp_type: RTCSdpType,
    pub sdp: String,
    pub(crate) parsed: Option<ParsedSdp>,
}

impl RTCSessionDescription {
    /// offer wraps SDP text as an offer.
    pub fn offer(sdp: String) -> Result<Self> {
        let parsed = super::parse(&sdp)?;
        Ok(RTCSessionDescription {
            sdp_type: RTCSdpType::Offer,
            sdp,
            parsed: Some(parsed),
        })
    }

    /// answer wraps SDP text as an answer.
    pub fn answer(sdp: String) -> Result<Self> {
        let parsed = super::parse(&sdp)?;
        Ok(RTCSessionDescription {
            sdp_type: RTCSdpType::Answer,
            sdp,
            parsed: Some(parsed),
        })
    }

    pub(crate) fn from_parsed(sdp_type: RTCSdpType, parsed: ParsedSdp) -> Self {
        RTCSessionDescription {
            sdp_type,
            sdp: super::serialize(&parsed),
            parsed: Some(parsed),
        }
    }

    pub(crate) fn parsed(&self) -> Result<&ParsedSdp> {
        self.parsed
            .as_ref()
            .ok_or_else(|| crate::error::Error::ErrSdpInvalid("not parsed".to_owned()))
    }
}
