use super::Code;
use crate::attributes::Attribute;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PacketError {
    #[error("Invalid packet length: {0}")]
    InvalidLength(usize),
    #[error("Declared length {declared} does not match datagram size {actual}")]
    LengthMismatch { declared: usize, actual: usize },
    #[error("Invalid packet code: {0}")]
    InvalidCode(u8),
    #[error("Attribute error: {0}")]
    AttributeError(String),
    #[error("Packet too large: {0} bytes")]
    PacketTooLarge(usize),
}

/// RADIUS Packet structure as defined in RFC 2865 Section 3
///
/// ```text
///  0                   1                   2                   3
///  0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |     Code      |  Identifier   |            Length             |
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |                         Authenticator                         |
/// |                           (16 bytes)                          |
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |  Attributes ...
/// +-+-+-+-+-+-+-+-+-+-+-+-+-
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Packet {
    pub code: Code,
    /// Correlates a reply with its request on the originating socket
    pub identifier: u8,
    /// Random nonce on a request, MD5 integrity check on a reply
    pub authenticator: [u8; 16],
    pub attributes: Vec<Attribute>,
}

impl Packet {
    /// Header size (code + identifier + length + authenticator)
    pub const HEADER_SIZE: usize = 20;
    /// Maximum RADIUS packet size (RFC 2865 Section 3)
    pub const MAX_PACKET_SIZE: usize = 4096;
    /// Byte range of the authenticator inside an encoded packet
    pub const AUTHENTICATOR_RANGE: std::ops::Range<usize> = 4..20;

    pub fn new(code: Code, identifier: u8, authenticator: [u8; 16]) -> Self {
        Packet {
            code,
            identifier,
            authenticator,
            attributes: Vec::new(),
        }
    }

    pub fn add_attribute(&mut self, attribute: Attribute) {
        self.attributes.push(attribute);
    }

    /// Total encoded length: header plus every attribute TLV
    pub fn length(&self) -> usize {
        Self::HEADER_SIZE
            + self
                .attributes
                .iter()
                .map(Attribute::encoded_length)
                .sum::<usize>()
    }

    /// Serialize the attribute section only (used for authenticator digests)
    pub fn encode_attributes(&self, buffer: &mut Vec<u8>) {
        for attr in &self.attributes {
            attr.encode_into(buffer);
        }
    }

    pub fn encode(&self) -> Result<Vec<u8>, PacketError> {
        let length = self.length();
        if length > Self::MAX_PACKET_SIZE {
            return Err(PacketError::PacketTooLarge(length));
        }

        let mut buffer = Vec::with_capacity(length);
        buffer.push(self.code.as_u8());
        buffer.push(self.identifier);
        buffer.extend_from_slice(&(length as u16).to_be_bytes());
        buffer.extend_from_slice(&self.authenticator);
        self.encode_attributes(&mut buffer);

        Ok(buffer)
    }

    /// Decode a datagram. The declared length must cover the datagram exactly.
    pub fn decode(data: &[u8]) -> Result<Self, PacketError> {
        if data.len() < Self::HEADER_SIZE {
            return Err(PacketError::InvalidLength(data.len()));
        }

        let code = Code::try_from(data[0])?;
        let identifier = data[1];
        let declared = u16::from_be_bytes([data[2], data[3]]) as usize;

        if !(Self::HEADER_SIZE..=Self::MAX_PACKET_SIZE).contains(&declared) {
            return Err(PacketError::InvalidLength(declared));
        }
        if declared != data.len() {
            return Err(PacketError::LengthMismatch {
                declared,
                actual: data.len(),
            });
        }

        let mut authenticator = [0u8; 16];
        authenticator.copy_from_slice(&data[Self::AUTHENTICATOR_RANGE]);

        let mut attributes = Vec::new();
        let mut rest = &data[Self::HEADER_SIZE..];
        while !rest.is_empty() {
            let attr = Attribute::decode(rest)?;
            rest = &rest[attr.encoded_length()..];
            attributes.push(attr);
        }

        Ok(Packet {
            code,
            identifier,
            authenticator,
            attributes,
        })
    }

    pub fn find_attribute(&self, attr_type: u8) -> Option<&Attribute> {
        self.attributes.iter().find(|a| a.attr_type == attr_type)
    }

    pub fn find_all_attributes(&self, attr_type: u8) -> impl Iterator<Item = &Attribute> {
        self.attributes
            .iter()
            .filter(move |a| a.attr_type == attr_type)
    }
}
