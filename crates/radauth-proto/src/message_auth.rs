//! Message-Authenticator Support (RFC 2869 Section 5.14, RFC 3579 Section 3.2)
//!
//! HMAC-MD5 keyed with the shared secret over the whole packet, with the
//! attribute value zeroed during calculation. On a reply the Request
//! Authenticator of the originating request stands in for the header
//! authenticator.

use crate::attributes::{Attribute, AttributeType};
use crate::packet::{Packet, PacketError};
use hmac::{Hmac, Mac};
use md5_digest::Md5;

type HmacMd5 = Hmac<Md5>;

pub const MESSAGE_AUTHENTICATOR_LENGTH: usize = 16;

/// HMAC-MD5(secret, packet_bytes)
pub fn calculate_message_authenticator(
    packet_bytes: &[u8],
    secret: &[u8],
) -> Result<[u8; 16], PacketError> {
    let mut mac = HmacMd5::new_from_slice(secret)
        .map_err(|e| PacketError::AttributeError(format!("HMAC key rejected: {}", e)))?;
    mac.update(packet_bytes);

    let mut output = [0u8; 16];
    output.copy_from_slice(&mac.finalize().into_bytes());
    Ok(output)
}

/// Value offset and value length of the first Message-Authenticator attribute
fn locate_message_authenticator(packet_bytes: &[u8]) -> Option<(usize, usize)> {
    let mut offset = Packet::HEADER_SIZE;
    while offset + Attribute::HEADER_SIZE <= packet_bytes.len() {
        let attr_type = packet_bytes[offset];
        let length = packet_bytes[offset + 1] as usize;
        if length < Attribute::HEADER_SIZE || offset + length > packet_bytes.len() {
            return None;
        }
        if attr_type == AttributeType::MessageAuthenticator as u8 {
            return Some((offset + Attribute::HEADER_SIZE, length - Attribute::HEADER_SIZE));
        }
        offset += length;
    }
    None
}

/// Byte offset of the first Message-Authenticator value in an encoded packet.
///
/// Walks the attribute TLVs after the header; returns `None` when the
/// attribute is absent, malformed, or not 16 bytes long.
pub fn find_message_authenticator(packet_bytes: &[u8]) -> Option<usize> {
    locate_message_authenticator(packet_bytes)
        .and_then(|(offset, len)| (len == MESSAGE_AUTHENTICATOR_LENGTH).then_some(offset))
}

/// Fill in the Message-Authenticator of an encoded request.
///
/// Returns `false` when the packet carries no Message-Authenticator slot.
pub fn sign_request(packet_bytes: &mut [u8], secret: &[u8]) -> Result<bool, PacketError> {
    let Some(offset) = find_message_authenticator(packet_bytes) else {
        return Ok(false);
    };
    let slot = offset..offset + MESSAGE_AUTHENTICATOR_LENGTH;
    packet_bytes[slot.clone()].fill(0);
    let mac = calculate_message_authenticator(packet_bytes, secret)?;
    packet_bytes[slot].copy_from_slice(&mac);
    Ok(true)
}

/// Verify the Message-Authenticator of a reply datagram.
///
/// `Ok(None)` means the reply has none; `Ok(Some(valid))` otherwise. An
/// attribute whose value is not 16 bytes long never verifies.
pub fn verify_reply(
    reply_bytes: &[u8],
    request_authenticator: &[u8; 16],
    secret: &[u8],
) -> Result<Option<bool>, PacketError> {
    let Some((offset, len)) = locate_message_authenticator(reply_bytes) else {
        return Ok(None);
    };
    if len != MESSAGE_AUTHENTICATOR_LENGTH {
        return Ok(Some(false));
    }
    let slot = offset..offset + MESSAGE_AUTHENTICATOR_LENGTH;

    let mut copy = reply_bytes.to_vec();
    copy[Packet::AUTHENTICATOR_RANGE].copy_from_slice(request_authenticator);
    copy[slot.clone()].fill(0);

    let mut mac = HmacMd5::new_from_slice(secret)
        .map_err(|e| PacketError::AttributeError(format!("HMAC key rejected: {}", e)))?;
    mac.update(&copy);
    Ok(Some(mac.verify_slice(&reply_bytes[slot]).is_ok()))
}
