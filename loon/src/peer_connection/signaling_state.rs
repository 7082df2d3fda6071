use std::fmt;

use crate::error::{Error, Result};
use crate::sdp::sdp_type::RTCSdpType;

/// RTCSignalingState reflects where in the RFC 3264 offer/answer dance
/// this peer connection is.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum RTCSignalingState {
    Unspecified,
    /// No offer/answer exchange is in progress.
    Stable,
    /// A local offer has been applied.
    HaveLocalOffer,
    /// A remote offer has been applied.
    HaveRemoteOffer,
    /// A local provisional answer has been applied.
    HaveLocalPranswer,
    /// A remote provisional answer has been applied.
    HaveRemotePranswer,
    /// The connection is closed.
    Closed,
}

impl Default for RTCSignalingState {
    fn default() -> Self {
        RTCSignalingState::Stable
    }
}

impl fmt::Display for RTCSignalingState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RTCSignalingState::Unspecified => "unspecified",
            RTCSignalingState::Stable => "stable",
            RTCSignalingState::HaveLocalOffer => "have-local-offer",
            RTCSignalingState::HaveRemoteOffer => "have-remote-offer",
            RTCSignalingState::HaveLocalPranswer => "have-local-pranswer",
            RTCSignalingState::HaveRemotePranswer => "have-remote-pranswer",
            RTCSignalingState::Closed => "closed",
        };
        write!(f, "{s}")
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub(crate) enum StateChangeOp {
    SetLocal,
    SetRemote,
}

/// check_next_signaling_state implements the RFC 3264 DFA: any illegal
/// call is rejected before any state mutates.
pub(crate) fn check_next_signaling_state(
    cur: RTCSignalingState,
    next: RTCSignalingState,
    op: StateChangeOp,
    sdp_type: RTCSdpType,
) -> Result<RTCSignalingState> {
    // Each legal edge of the DFA, everything else rejects.
    let ok = match (cur, op, sdp_type, next) {
        // stable->SetLocal(offer)->have-local-offer
        (
            RTCSignalingState::Stable,
            StateChangeOp::SetLocal,
            RTCSdpType::Offer,
            RTCSignalingState::HaveLocalOffer,
        ) => true,
        // stable->SetRemote(offer)->have-remote-offer
        (
            RTCSignalingState::Stable,
            StateChangeOp::SetRemote,
            RTCSdpType::Offer,
            RTCSignalingState::HaveRemoteOffer,
        ) => true,
        // have-local-offer->SetRemote(answer)->stable
        (
            RTCSignalingState::HaveLocalOffer,
            StateChangeOp::SetRemote,
            RTCSdpType::Answer,
            RTCSignalingState::Stable,
        ) => true,
        // have-local-offer->SetRemote(pranswer)->have-remote-pranswer
        (
            RTCSignalingState::HaveLocalOffer,
            StateChangeOp::SetRemote,
            RTCSdpType::Pranswer,
            RTCSignalingState::HaveRemotePranswer,
        ) => true,
        // have-local-offer->SetLocal(offer)->have-local-offer (re-offer)
        (
            RTCSignalingState::HaveLocalOffer,
            StateChangeOp::SetLocal,
            RTCSdpType::Offer,
            RTCSignalingState::HaveLocalOffer,
        ) => true,
        // have-remote-pranswer->SetRemote(answer)->stable
        (
            RTCSignalingState::HaveRemotePranswer,
            StateChangeOp::SetRemote,
            RTCSdpType::Answer,
            RTCSignalingState::Stable,
        ) => true,
        // have-remote-offer->SetLocal(answer)->stable
        (
            RTCSignalingState::HaveRemoteOffer,
            StateChangeOp::SetLocal,
            RTCSdpType::Answer,
            RTCSignalingState::Stable,
        ) => true,
        // have-remote-offer->SetLocal(pranswer)->have-local-pranswer
        (
            RTCSignalingState::HaveRemoteOffer,
            StateChangeOp::SetLocal,
            RTCSdpType::Pranswer,
            RTCSignalingState::HaveLocalPranswer,
        ) => true,
        // have-remote-offer->SetRemote(offer)->have-remote-offer (re-offer)
        (
            RTCSignalingState::HaveRemoteOffer,
            StateChangeOp::SetRemote,
            RTCSdpType::Offer,
            RTCSignalingState::HaveRemoteOffer,
        ) => true,
        // have-local-pranswer->SetLocal(answer)->stable
        (
            RTCSignalingState::HaveLocalPranswer,
            StateChangeOp::SetLocal,
            RTCSdpType::Answer,
            RTCSignalingState::Stable,
        ) => true,
        // rollback to stable
        (_, _, RTCSdpType::Rollback, RTCSignalingState::Stable) => {
            cur != RTCSignalingState::Stable
        }
        _ => false,
    };

    if ok {
        Ok(next)
    } else {
        Err(Error::ErrSignalingStateTransitionInvalid(format!(
            "{cur} -> {op:?}({sdp_type}) -> {next}"
        )))
    }
}

#[cfg(test)]
mod signaling_state_test {
    use super::*;

    #[test]
    fn test_legal_offer_answer_path() -> Result<()> {
        // offerer
        let s = check_next_signaling_state(
            RTCSignalingState::Stable,
            RTCSignalingState::HaveLocalOffer,
            StateChangeOp::SetLocal,
            RTCSdpType::Offer,
        )?;
        assert_eq!(s, RTCSignalingState::HaveLocalOffer);
        let s = check_next_signaling_state(
            s,
            RTCSignalingState::Stable,
            StateChangeOp::SetRemote,
            RTCSdpType::Answer,
        )?;
        assert_eq!(s, RTCSignalingState::Stable);

        // answerer
        let s = check_next_signaling_state(
            RTCSignalingState::Stable,
            RTCSignalingState::HaveRemoteOffer,
            StateChangeOp::SetRemote,
            RTCSdpType::Offer,
        )?;
        let s = check_next_signaling_state(
            s,
            RTCSignalingState::Stable,
            StateChangeOp::SetLocal,
            RTCSdpType::Answer,
        )?;
        assert_eq!(s, RTCSignalingState::Stable);
        Ok(())
    }

    #[test]
    fn test_illegal_transitions_rejected() {
        // answering without an offer
        assert!(check_next_signaling_state(
            RTCSignalingState::Stable,
            RTCSignalingState::Stable,
            StateChangeOp::SetRemote,
            RTCSdpType::Answer,
        )
        .is_err());

        // applying a local offer while holding a remote offer
        assert!(check_next_signaling_state(
            RTCSignalingState::HaveRemoteOffer,
            RTCSignalingState::HaveLocalOffer,
            StateChangeOp::SetLocal,
            RTCSdpType::Offer,
        )
        .is_err());
    }
}
