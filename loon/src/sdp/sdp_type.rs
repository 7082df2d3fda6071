use std::fmt;

use serde::Serialize;

/// RTCSdpType describes a SessionDescription.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize)]
pub enum RTCSdpType {
    #[serde(rename = "unspecified")]
    Unspecified,
    #[serde(rename = "offer")]
    Offer,
    #[serde(rename = "pranswer")]
    Pranswer,
    #[serde(rename = "answer")]
    Answer,
    #[serde(rename = "rollback")]
    Rollback,
}

impl Default for RTCSdpType {
    fn default() -> Self {
        RTCSdpType::Unspecified
    }
}

impl fmt::Display for RTCSdpType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RTCSdpType::Unspecified => "unspecified",
            RTCSdpType::Offer => "offer",
            RTCSdpType::Pranswer => "pranswer",
            RTCSdpType::Answer => "answer",
            RTCSdpType::Rollback => "rollback",
        };
        write!(f, "{s}")
    }
}

impl From<&str> for RTCSdpType {
    fn from(raw: &str) -> Self {
        match raw {
            "offer" => RTCSdpType::Offer,
            "pranswer" => RTCSdpType::Pranswer,
            "answer" => RTCSdpType::Answer,
            "rollback" => RTCSdpType::Rollback,
            _ => RTCSdpType::Unspecified,
        }
    }
}
