/// Attribute types an authenticating client sends or reads (RFC 2865, RFC 2869)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum AttributeType {
    /// User-Name (1)
    UserName = 1,
    /// User-Password (2), PAP-obfuscated
    UserPassword = 2,
    /// CHAP-Password (3), CHAP identifier followed by the MD5 response
    ChapPassword = 3,
    /// Reply-Message (18)
    ReplyMessage = 18,
    /// NAS-Identifier (32)
    NasIdentifier = 32,
    /// Message-Authenticator (80) - RFC 2869
    MessageAuthenticator = 80,
}
