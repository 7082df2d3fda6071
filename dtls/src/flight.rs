use std::fmt;

/// Flight is the position in the DTLS handshake ladder (RFC 6347
/// Section 4.2.4). A whole flight retransmits verbatim until a message
/// from the next flight arrives.
///
///  Client                                          Server
///  ------                                          ------
///  Flight 0: waiting                               Flight 1: ClientHello
///  Flight 2: HelloVerifyRequest
///  Flight 3: ClientHello (with cookie)
///  Flight 4: ServerHello..ServerHelloDone
///  Flight 5: Certificate..Finished
///  Flight 6: ChangeCipherSpec, Finished
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Flight {
    Flight0,
    Flight1,
    Flight2,
    Flight3,
    Flight4,
    Flight5,
    Flight6,
}

impl fmt::Display for Flight {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Flight::Flight0 => write!(f, "Flight 0"),
            Flight::Flight1 => write!(f, "Flight 1"),
            Flight::Flight2 => write!(f, "Flight 2"),
            Flight::Flight3 => write!(f, "Flight 3"),
            Flight::Flight4 => write!(f, "Flight 4"),
            Flight::Flight5 => write!(f, "Flight 5"),
            Flight::Flight6 => write!(f, "Flight 6"),
        }
    }
}
