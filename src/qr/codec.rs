//! Reversible URL <-> filename encoding.
//!
//! A QR image is named after the URL it encodes so that lookups and
//! deduplication need no index. The URL's UTF-8 bytes are encoded with the
//! URL-safe base64 alphabet (`A-Z a-z 0-9 - _`) without padding, which never
//! produces `/`, `\`, `:`, `.` or NUL and is injective, so two URLs can
//! never share a file.
//!
//! Tokens are mixed case, so the store directory must live on a
//! case-sensitive filesystem. On a case-insensitive one two URLs whose tokens
//! differ only in letter case would map to the same file.
//!
//! ```text
//! https://example.com  <->  aHR0cHM6Ly9leGFtcGxlLmNvbQ  (+ ".png")
//! ```

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;

use crate::error::CodecError;

/// Suffix of every QR image file in the store.
pub const QR_FILE_SUFFIX: &str = ".png";

/// Maximum length of a single path component on common filesystems.
const MAX_FILENAME_BYTES: usize = 255;

/// Longest token that still leaves room for [`QR_FILE_SUFFIX`].
pub const MAX_TOKEN_LEN: usize = MAX_FILENAME_BYTES - QR_FILE_SUFFIX.len();

/// Encode a URL into a filesystem-safe token.
///
/// # Errors
///
/// - [`CodecError::Empty`] if `url` is empty
/// - [`CodecError::TooLong`] if the token would not fit in a filename
pub fn encode_url_to_filename(url: &str) -> Result<String, CodecError> {
    if url.is_empty() {
        return Err(CodecError::Empty);
    }

    let token = URL_SAFE_NO_PAD.encode(url.as_bytes());
    if token.len() > MAX_TOKEN_LEN {
        return Err(CodecError::TooLong {
            len: token.len(),
            max: MAX_TOKEN_LEN,
        });
    }

    Ok(token)
}

/// Decode a token produced by [`encode_url_to_filename`] back into its URL.
pub fn decode_filename_to_url(token: &str) -> Result<String, CodecError> {
    if token.is_empty() {
        return Err(CodecError::Empty);
    }

    let bytes = URL_SAFE_NO_PAD
        .decode(token.as_bytes())
        .map_err(|e| CodecError::InvalidToken(e.to_string()))?;

    String::from_utf8(bytes).map_err(|_| CodecError::InvalidUtf8)
}

/// Full image filename for a token.
pub fn qr_filename(token: &str) -> String {
    format!("{}{}", token, QR_FILE_SUFFIX)
}

/// Strip [`QR_FILE_SUFFIX`] from an image filename, if present.
pub fn strip_png_suffix(filename: &str) -> Option<&str> {
    filename.strip_suffix(QR_FILE_SUFFIX)
}
