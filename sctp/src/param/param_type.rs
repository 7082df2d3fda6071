use std::fmt;

/// ParamType identifies an SCTP TLV parameter.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ParamType {
    /// Heartbeat Info
    HeartbeatInfo,
    /// IPv4 IP address
    V4Addr,
    /// IPv6 IP address
    V6Addr,
    /// State Cookie
    StateCookie,
    /// Unrecognized Parameters
    UnrecognizedParam,
    /// Cookie Preservative
    CookiePreservative,
    /// Host Name Address
    HostNameAddr,
    /// Supported Address Types
    SupportedAddrTypes,
    /// Outgoing SSN Reset Request Parameter
    OutSsnResetReq,
    /// Incoming SSN Reset Request Parameter
    IncSsnResetReq,
    /// SSN/TSN Reset Request Parameter
    SsnTsnResetReq,
    /// Re-configuration Response Parameter
    ReconfigResp,
    /// Add Outgoing Streams Request Parameter
    AddOutStreamsReq,
    /// Add Incoming Streams Request Parameter
    AddIncStreamsReq,
    /// Reserved for ECN Capable (0x8000)
    EcnCapable,
    /// Random (0x8002)
    Random,
    /// Chunk List (0x8003)
    ChunkList,
    /// Requested HMAC Algorithm Parameter (0x8004)
    ReqHmacAlgo,
    /// Padding (0x8005)
    Padding,
    /// Supported Extensions (0x8008)
    SupportedExt,
    /// Forward TSN supported (0xC000)
    ForwardTsnSupp,
    /// Add IP Address (0xC001)
    AddIpAddr,
    /// Delete IP Address (0xC002)
    DelIpAddr,
    /// Error Cause Indication (0xC003)
    ErrClauseInd,
    /// Set Primary Address (0xC004)
    SetPriAddr,
    /// Success Indication (0xC005)
    SuccessInd,
    /// Adaptation Layer Indication (0xC006)
    AdaptLayerInd,
    Unknown { param_type: u16 },
}

impl fmt::Display for ParamType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{self:?}")
    }
}

impl From<u16> for ParamType {
    fn from(v: u16) -> Self {
        match v {
            1 => ParamType::HeartbeatInfo,
            5 => ParamType::V4Addr,
            6 => ParamType::V6Addr,
            7 => ParamType::StateCookie,
            8 => ParamType::UnrecognizedParam,
            9 => ParamType::CookiePreservative,
            11 => ParamType::HostNameAddr,
            12 => ParamType::SupportedAddrTypes,
            13 => ParamType::OutSsnResetReq,
            14 => ParamType::IncSsnResetReq,
            15 => ParamType::SsnTsnResetReq,
            16 => ParamType::ReconfigResp,
            17 => ParamType::AddOutStreamsReq,
            18 => ParamType::AddIncStreamsReq,
            32768 => ParamType::EcnCapable,
            32770 => ParamType::Random,
            32771 => ParamType::ChunkList,
            32772 => ParamType::ReqHmacAlgo,
            32773 => ParamType::Padding,
            32776 => ParamType::SupportedExt,
            49152 => ParamType::ForwardTsnSupp,
            49153 => ParamType::AddIpAddr,
            49154 => ParamType::DelIpAddr,
            49155 => ParamType::ErrClauseInd,
            49156 => ParamType::SetPriAddr,
            49157 => ParamType::SuccessInd,
            49158 => ParamType::AdaptLayerInd,
            _ => ParamType::Unknown { param_type: v },
        }
    }
}

impl From<ParamType> for u16 {
    fn from(v: ParamType) -> Self {
        match v {
            ParamType::HeartbeatInfo => 1,
            ParamType::V4Addr => 5,
            ParamType::V6Addr => 6,
            ParamType::StateCookie => 7,
            ParamType::UnrecognizedParam => 8,
            ParamType::CookiePreservative => 9,
            ParamType::HostNameAddr => 11,
            ParamType::SupportedAddrTypes => 12,
            ParamType::OutSsnResetReq => 13,
            ParamType::IncSsnResetReq => 14,
            ParamType::SsnTsnResetReq => 15,
            ParamType::ReconfigResp => 16,
            ParamType::AddOutStreamsReq => 17,
            ParamType::AddIncStreamsReq => 18,
            ParamType::EcnCapable => 32768,
            ParamType::Random => 32770,
            ParamType::ChunkList => 32771,
            ParamType::ReqHmacAlgo => 32772,
            ParamType::Padding => 32773,
            ParamType::SupportedExt => 32776,
            ParamType::ForwardTsnSupp => 49152,
            ParamType::AddIpAddr => 49153,
            ParamType::DelIpAddr => 49154,
            ParamType::ErrClauseInd => 49155,
            ParamType::SetPriAddr => 49156,
            ParamType::SuccessInd => 49157,
            ParamType::AdaptLayerInd => 49158,
            ParamType::Unknown { param_type } => param_type,
        }
    }
}
