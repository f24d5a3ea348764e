use super::PacketError;

/// RADIUS packet codes used by an authenticating client (RFC 2865 Section 4)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Code {
    /// Access-Request (1)
    AccessRequest = 1,
    /// Access-Accept (2)
    AccessAccept = 2,
    /// Access-Reject (3)
    AccessReject = 3,
    /// Access-Challenge (11)
    AccessChallenge = 11,
}

impl Code {
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            1 => Some(Code::AccessRequest),
            2 => Some(Code::AccessAccept),
            3 => Some(Code::AccessReject),
            11 => Some(Code::AccessChallenge),
            _ => None,
        }
    }

    pub fn as_u8(self) -> u8 {
        self as u8
    }

    /// True for the two codes that end an authentication attempt
    pub fn is_final_answer(self) -> bool {
        matches!(self, Code::AccessAccept | Code::AccessReject)
    }
}

impl TryFrom<u8> for Code {
    type Error = PacketError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Code::from_u8(value).ok_or(PacketError::InvalidCode(value))
    }
}
