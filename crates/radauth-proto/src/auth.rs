//! Authenticator and User-Password transforms (RFC 2865 Sections 3 and 5.2)

use crate::packet::{Packet, PacketError};
use hmac::digest::CtOutput;
use md5_digest::Md5;
use rand::Rng;

/// Longest password the User-Password attribute may carry
pub const MAX_PAP_PASSWORD_LENGTH: usize = 128;

const BLOCK: usize = 16;

/// Generate a fresh Request Authenticator from the thread-local CSPRNG.
///
/// Every transmission needs its own value: it seeds the PAP keystream and
/// doubles as the CHAP challenge.
pub fn generate_request_authenticator() -> [u8; 16] {
    let mut authenticator = [0u8; 16];
    rand::rng().fill(&mut authenticator);
    authenticator
}

/// Response Authenticator = MD5(Code + ID + Length + Request Authenticator + Attributes + Secret)
pub fn calculate_response_authenticator(
    packet: &Packet,
    request_authenticator: &[u8; 16],
    secret: &[u8],
) -> [u8; 16] {
    let mut attributes = Vec::with_capacity(packet.length() - Packet::HEADER_SIZE);
    packet.encode_attributes(&mut attributes);

    let mut ctx = md5::Context::new();
    ctx.consume([packet.code.as_u8(), packet.identifier]);
    ctx.consume((packet.length() as u16).to_be_bytes());
    ctx.consume(request_authenticator);
    ctx.consume(&attributes);
    ctx.consume(secret);
    ctx.compute().0
}

/// Check a reply's authenticator against the one expected for `request_authenticator`.
///
/// The comparison runs in constant time.
pub fn verify_response_authenticator(
    response: &Packet,
    request_authenticator: &[u8; 16],
    secret: &[u8],
) -> bool {
    let expected = calculate_response_authenticator(response, request_authenticator, secret);
    CtOutput::<Md5>::new(expected.into()) == CtOutput::<Md5>::new(response.authenticator.into())
}

/// MD5(secret + seed), the keystream block for one 16-byte password chunk
fn keystream_block(secret: &[u8], seed: &[u8]) -> [u8; 16] {
    let mut ctx = md5::Context::new();
    ctx.consume(secret);
    ctx.consume(seed);
    ctx.compute().0
}

/// Obfuscate a password for the User-Password attribute.
///
/// The password is zero-padded to a multiple of 16 bytes (at least one
/// block). Block `i` is XORed with MD5(secret + c[i-1]) where c[-1] is the
/// Request Authenticator and c[i-1] is the previous ciphertext block.
pub fn encrypt_user_password(
    password: &[u8],
    secret: &[u8],
    authenticator: &[u8; 16],
) -> Result<Vec<u8>, PacketError> {
    if password.len() > MAX_PAP_PASSWORD_LENGTH {
        return Err(PacketError::AttributeError(format!(
            "User-Password longer than {} bytes",
            MAX_PAP_PASSWORD_LENGTH
        )));
    }

    let padded_len = password.len().div_ceil(BLOCK).max(1) * BLOCK;
    let mut output = password.to_vec();
    output.resize(padded_len, 0);

    let mut seed = *authenticator;
    for chunk in output.chunks_mut(BLOCK) {
        let key = keystream_block(secret, &seed);
        for (byte, k) in chunk.iter_mut().zip(key) {
            *byte ^= k;
        }
        seed.copy_from_slice(chunk);
    }

    Ok(output)
}

/// Reverse [`encrypt_user_password`], stripping the zero padding.
pub fn decrypt_user_password(
    encrypted: &[u8],
    secret: &[u8],
    authenticator: &[u8; 16],
) -> Result<Vec<u8>, PacketError> {
    if encrypted.is_empty()
        || encrypted.len() % BLOCK != 0
        || encrypted.len() > MAX_PAP_PASSWORD_LENGTH
    {
        return Err(PacketError::AttributeError(format!(
            "Invalid User-Password length: {}",
            encrypted.len()
        )));
    }

    let mut output = Vec::with_capacity(encrypted.len());
    let mut seed: &[u8] = authenticator;
    for chunk in encrypted.chunks(BLOCK) {
        let key = keystream_block(secret, seed);
        output.extend(chunk.iter().zip(key).map(|(c, k)| c ^ k));
        seed = chunk;
    }

    while output.last() == Some(&0) {
        output.pop();
    }
    Ok(output)
}
