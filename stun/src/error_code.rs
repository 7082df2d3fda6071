use crate::attributes::*;
use crate::checks::*;
use crate::error::*;
use crate::message::*;

/// ErrorCodeAttribute represents ERROR-CODE attribute.
///
/// RFC 5389 Section 15.6
#[derive(Default, Debug, PartialEq, Eq)]
pub struct ErrorCodeAttribute {
    pub code: ErrorCode,
    pub reason: Vec<u8>,
}

impl std::fmt::Display for ErrorCodeAttribute {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let reason = match String::from_utf8(self.reason.clone()) {
            Ok(reason) => reason,
            Err(_) => return Err(std::fmt::Error),
        };

        write!(f, "{}: {}", self.code.0, reason)
    }
}

// constants
const ERROR_CODE_REASON_START: usize = 4;
const ERROR_CODE_REASON_MAX_B: usize = 763;
const ERROR_CODE_MODULO: u16 = 100;

impl Setter for ErrorCodeAttribute {
    /// add_to adds ERROR-CODE to m.
    fn add_to(&self, m: &mut Message) -> Result<()> {
        check_overflow(
            ATTR_ERROR_CODE,
            self.reason.len() + ERROR_CODE_REASON_START,
            ERROR_CODE_REASON_MAX_B + ERROR_CODE_REASON_START,
        )?;

        let number = (self.code.0 % ERROR_CODE_MODULO) as u8; // error code modulo 100
        let class = (self.code.0 / ERROR_CODE_MODULO) as u8; // hundred digit
        let mut value: Vec<u8> = Vec::with_capacity(ERROR_CODE_REASON_MAX_B);
        value.extend_from_slice(&[0, 0]);
        value.push(class); // [ERROR_CODE_CLASS_BYTE]
        value.push(number); // [ERROR_CODE_NUMBER_BYTE]
        value.extend_from_slice(&self.reason); //[ERROR_CODE_REASON_START:]

        m.add(ATTR_ERROR_CODE, &value);

        Ok(())
    }
}

impl Getter for ErrorCodeAttribute {
    /// get_from decodes ERROR-CODE from m. Reason is valid until m.raw is
    /// valid.
    fn get_from(&mut self, m: &Message) -> Result<()> {
        let v = m.get(ATTR_ERROR_CODE)?;
        if v.len() < ERROR_CODE_REASON_START {
            return Err(Error::ErrUnexpectedEof);
        }

        let class = v[2] as u16;
        let number = v[3] as u16;
        let code = class * ERROR_CODE_MODULO + number;
        self.code = ErrorCode(code);
        self.reason = v[ERROR_CODE_REASON_START..].to_vec();

        Ok(())
    }
}

/// ErrorCode is code for ERROR-CODE attribute.
#[derive(Default, PartialEq, Eq, Debug, Copy, Clone)]
pub struct ErrorCode(pub u16);

impl Setter for ErrorCode {
    /// add_to adds ERROR-CODE with default reason to m. If there is no
    /// default reason, returns ErrNoDefaultReason.
    fn add_to(&self, m: &mut Message) -> Result<()> {
        if let Some(reason) = ERROR_REASONS.get(self) {
            let a = ErrorCodeAttribute {
                code: *self,
                reason: reason.clone(),
            };
            a.add_to(m)
        } else {
            Err(Error::ErrNoDefaultReason)
        }
    }
}

/// Possible error codes.
pub const CODE_TRY_ALTERNATE: ErrorCode = ErrorCode(300);
pub const CODE_BAD_REQUEST: ErrorCode = ErrorCode(400);
pub const CODE_UNAUTHORIZED: ErrorCode = ErrorCode(401);
pub const CODE_UNKNOWN_ATTRIBUTE: ErrorCode = ErrorCode(420);
pub const CODE_STALE_NONCE: ErrorCode = ErrorCode(438);
pub const CODE_ROLE_CONFLICT: ErrorCode = ErrorCode(487);
pub const CODE_SERVER_ERROR: ErrorCode = ErrorCode(500);

/// TURN error codes, RFC 5766 Section 15.
pub const CODE_FORBIDDEN: ErrorCode = ErrorCode(403);
pub const CODE_ALLOC_MISMATCH: ErrorCode = ErrorCode(437);
pub const CODE_ADDR_FAMILY_NOT_SUPPORTED: ErrorCode = ErrorCode(440);
pub const CODE_WRONG_CREDENTIALS: ErrorCode = ErrorCode(441);
pub const CODE_UNSUPPORTED_TRANS_PROTO: ErrorCode = ErrorCode(442);
pub const CODE_ALLOC_QUOTA_REACHED: ErrorCode = ErrorCode(486);
pub const CODE_INSUFFICIENT_CAPACITY: ErrorCode = ErrorCode(508);

lazy_static::lazy_static! {
    static ref ERROR_REASONS: std::collections::HashMap<ErrorCode, Vec<u8>> = {
        error_reasons()
    };
}

impl std::hash::Hash for ErrorCode {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.0.hash(state);
    }
}

fn error_reasons() -> std::collections::HashMap<ErrorCode, Vec<u8>> {
    let mut reasons = std::collections::HashMap::new();
    reasons.insert(CODE_TRY_ALTERNATE, b"Try Alternate".to_vec());
    reasons.insert(CODE_BAD_REQUEST, b"Bad Request".to_vec());
    reasons.insert(CODE_UNAUTHORIZED, b"Unauthorized".to_vec());
    reasons.insert(CODE_UNKNOWN_ATTRIBUTE, b"Unknown Attribute".to_vec());
    reasons.insert(CODE_STALE_NONCE, b"Stale Nonce".to_vec());
    reasons.insert(CODE_ROLE_CONFLICT, b"Role Conflict".to_vec());
    reasons.insert(CODE_SERVER_ERROR, b"Server Error".to_vec());
    reasons.insert(CODE_FORBIDDEN, b"Forbidden".to_vec());
    reasons.insert(CODE_ALLOC_MISMATCH, b"Allocation Mismatch".to_vec());
    reasons.insert(
        CODE_ADDR_FAMILY_NOT_SUPPORTED,
        b"Address Family not Supported".to_vec(),
    );
    reasons.insert(CODE_WRONG_CREDENTIALS, b"Wrong Credentials".to_vec());
    reasons.insert(
        CODE_UNSUPPORTED_TRANS_PROTO,
        b"Unsupported Transport Protocol".to_vec(),
    );
    reasons.insert(CODE_ALLOC_QUOTA_REACHED, b"Allocation Quota Reached".to_vec());
    reasons.insert(CODE_INSUFFICIENT_CAPACITY, b"Insufficient Capacity".to_vec());
    reasons
}
