//! CHAP-Password construction (RFC 2865 Section 5.3)
//!
//! The client never sends the password. It sends a CHAP identifier and
//! MD5(identifier + password + challenge), where the challenge is the
//! Request Authenticator since no CHAP-Challenge attribute is included.

/// Value of a CHAP-Password attribute: 1 byte identifier, 16 byte response
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChapResponse {
    pub ident: u8,
    pub response: [u8; 16],
}

impl ChapResponse {
    pub const LENGTH: usize = 17;

    /// Answer `challenge` with `password` under CHAP identifier `ident`
    pub fn compute(ident: u8, password: &[u8], challenge: &[u8]) -> Self {
        ChapResponse {
            ident,
            response: compute_chap_response(ident, password, challenge),
        }
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, ChapError> {
        let Some((&ident, rest)) = bytes.split_first() else {
            return Err(ChapError::InvalidLength(0));
        };
        let response = <[u8; 16]>::try_from(rest)
            .map_err(|_| ChapError::InvalidLength(bytes.len()))?;
        Ok(ChapResponse { ident, response })
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(Self::LENGTH);
        bytes.push(self.ident);
        bytes.extend_from_slice(&self.response);
        bytes
    }

    /// Server-side check of this response against a known password
    pub fn verify(&self, password: &[u8], challenge: &[u8]) -> bool {
        compute_chap_response(self.ident, password, challenge) == self.response
    }
}

/// MD5(CHAP_Identifier + Password + Challenge)
pub fn compute_chap_response(ident: u8, password: &[u8], challenge: &[u8]) -> [u8; 16] {
    let mut ctx = md5::Context::new();
    ctx.consume([ident]);
    ctx.consume(password);
    ctx.consume(challenge);
    ctx.compute().0
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum ChapError {
    #[error("Invalid CHAP-Password length: expected 17 bytes, got {0}")]
    InvalidLength(usize),
}
