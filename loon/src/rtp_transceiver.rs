pub mod rtp_codec;
pub mod rtp_receiver;
pub mod rtp_sender;

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use rtp_codec::RTPCodecType;
use rtp_receiver::RTCRtpReceiver;
use rtp_sender::RTCRtpSender;

/// RTCRtpTransceiverDirection indicates the direction of the
/// transceiver.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum RTCRtpTransceiverDirection {
    Unspecified,
    Sendrecv,
    Sendonly,
    Recvonly,
    Inactive,
}

impl Default for RTCRtpTransceiverDirection {
    fn default() -> Self {
        RTCRtpTransceiverDirection::Unspecified
    }
}

impl fmt::Display for RTCRtpTransceiverDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RTCRtpTransceiverDirection::Unspecified => "unspecified",
            RTCRtpTransceiverDirection::Sendrecv => "sendrecv",
            RTCRtpTransceiverDirection::Sendonly => "sendonly",
            RTCRtpTransceiverDirection::Recvonly => "recvonly",
            RTCRtpTransceiverDirection::Inactive => "inactive",
        };
        write!(f, "{s}")
    }
}

impl From<&str> for RTCRtpTransceiverDirection {
    fn from(raw: &str) -> Self {
        match raw {
            "sendrecv" => RTCRtpTransceiverDirection::Sendrecv,
            "sendonly" => RTCRtpTransceiverDirection::Sendonly,
            "recvonly" => RTCRtpTransceiverDirection::Recvonly,
            "inactive" => RTCRtpTransceiverDirection::Inactive,
            _ => RTCRtpTransceiverDirection::Unspecified,
        }
    }
}

impl RTCRtpTransceiverDirection {
    /// reverse returns the direction as seen from the remote side.
    pub fn reverse(&self) -> RTCRtpTransceiverDirection {
        match self {
            RTCRtpTransceiverDirection::Sendonly => RTCRtpTransceiverDirection::Recvonly,
            RTCRtpTransceiverDirection::Recvonly => RTCRtpTransceiverDirection::Sendonly,
            other => *other,
        }
    }
}

/// RTCRtpTransceiver represents a (sender, receiver, mid, direction)
/// quadruple. Once a mid is assigned it never changes across
/// renegotiations, ICE restarts included.
pub struct RTCRtpTransceiver {
    mid: Mutex<Option<String>>,
    kind: RTPCodecType,
    direction: Mutex<RTCRtpTransceiverDirection>,
    current_direction: Mutex<RTCRtpTransceiverDirection>,
    pub(crate) sender: Arc<RTCRtpSender>,
    pub(crate) receiver: Arc<RTCRtpReceiver>,
    stopped: AtomicBool,
}

impl RTCRtpTransceiver {
    pub(crate) fn new(
        kind: RTPCodecType,
        direction: RTCRtpTransceiverDirection,
        sender: Arc<RTCRtpSender>,
        receiver: Arc<RTCRtpReceiver>,
    ) -> Arc<Self> {
        Arc::new(RTCRtpTransceiver {
            mid: Mutex::new(None),
            kind,
            direction: Mutex::new(direction),
            current_direction: Mutex::new(RTCRtpTransceiverDirection::Unspecified),
            sender,
            receiver,
            stopped: AtomicBool::new(false),
        })
    }

    pub fn mid(&self) -> Option<String> {
        self.mid.lock().unwrap().clone()
    }

    /// set_mid assigns the mid; a mid is never reassigned.
    pub(crate) fn set_mid(&self, mid: String) -> crate::error::Result<()> {
        let mut guard = self.mid.lock().unwrap();
        if let Some(existing) = &*guard {
            if *existing != mid {
                return Err(crate::error::Error::ErrMidNotUnique);
            }
            return Ok(());
        }
        *guard = Some(mid);
        Ok(())
    }

    pub fn kind(&self) -> RTPCodecType {
        self.kind
    }

    pub fn direction(&self) -> RTCRtpTransceiverDirection {
        *self.direction.lock().unwrap()
    }

    pub fn set_direction(&self, direction: RTCRtpTransceiverDirection) {
        *self.direction.lock().unwrap() = direction;
    }

    /// current_direction is set only once negotiation completes.
    pub fn current_direction(&self) -> RTCRtpTransceiverDirection {
        *self.current_direction.lock().unwrap()
    }

    pub(crate) fn set_current_direction(&self, direction: RTCRtpTransceiverDirection) {
        *self.current_direction.lock().unwrap() = direction;
    }

    pub fn sender(&self) -> Arc<RTCRtpSender> {
        Arc::clone(&self.sender)
    }

    pub fn receiver(&self) -> Arc<RTCRtpReceiver> {
        Arc::clone(&self.receiver)
    }

    pub fn stopped(&self) -> bool {
        self.stopped.load(Ordering::SeqCst)
    }

    pub fn stop(&self) {
        self.stopped.store(true, Ordering::SeqCst);
    }
}
