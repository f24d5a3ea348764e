use crate::packet::PacketError;

/// RADIUS Attribute structure as defined in RFC 2865 Section 5
///
/// ```text
///  0                   1                   2
///  0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |     Type      |    Length     |  Value ...
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    pub attr_type: u8,
    value: Vec<u8>,
}

impl Attribute {
    /// Type + length octets
    pub const HEADER_SIZE: usize = 2;
    /// Largest value that still fits the one-byte length field
    pub const MAX_VALUE_LENGTH: usize = 253;

    pub fn new(attr_type: u8, value: Vec<u8>) -> Result<Self, PacketError> {
        if value.len() > Self::MAX_VALUE_LENGTH {
            return Err(PacketError::AttributeError(format!(
                "Attribute {} value too long: {} bytes (max {})",
                attr_type,
                value.len(),
                Self::MAX_VALUE_LENGTH
            )));
        }
        Ok(Attribute { attr_type, value })
    }

    pub fn string(attr_type: u8, value: impl AsRef<str>) -> Result<Self, PacketError> {
        Self::new(attr_type, value.as_ref().as_bytes().to_vec())
    }

    pub fn value(&self) -> &[u8] {
        &self.value
    }

    /// Overwrite the value in place, keeping its length (used to sign
    /// Message-Authenticator after the packet layout is fixed)
    pub(crate) fn value_mut(&mut self) -> &mut [u8] {
        &mut self.value
    }

    pub fn encoded_length(&self) -> usize {
        Self::HEADER_SIZE + self.value.len()
    }

    pub fn encode_into(&self, buffer: &mut Vec<u8>) {
        buffer.push(self.attr_type);
        buffer.push(self.encoded_length() as u8);
        buffer.extend_from_slice(&self.value);
    }

    /// Decode the attribute at the front of `data`; trailing bytes are left
    /// for the caller.
    pub fn decode(data: &[u8]) -> Result<Self, PacketError> {
        let &[attr_type, length, ..] = data else {
            return Err(PacketError::AttributeError(format!(
                "Attribute data too short: {} bytes",
                data.len()
            )));
        };
        let length = length as usize;

        if length < Self::HEADER_SIZE {
            return Err(PacketError::AttributeError(format!(
                "Invalid attribute length: {}",
                length
            )));
        }
        if data.len() < length {
            return Err(PacketError::AttributeError(format!(
                "Attribute {} overruns packet: needs {} bytes, {} left",
                attr_type,
                length,
                data.len()
            )));
        }

        Ok(Attribute {
            attr_type,
            value: data[Self::HEADER_SIZE..length].to_vec(),
        })
    }

    pub fn as_string(&self) -> Result<String, std::string::FromUtf8Error> {
        String::from_utf8(self.value.clone())
    }
}
