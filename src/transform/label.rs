use sha2::{Digest, Sha256};

/// Longest label value passed through untouched.
pub const MAX_LABEL_LEN: usize = 63;
/// Number of digest hex characters kept in a compressed label.
pub const DIGEST_PREFIX_LEN: usize = 7;
/// Number of trailing bytes of the original value kept verbatim.
pub const SUFFIX_LEN: usize = 53;

const SEPARATOR: &str = "...";

/// Whether `value` exceeds the label length limit.
///
/// The limit is in bytes, like the one enforced by the plugins downstream.
pub fn needs_compression(value: &str) -> bool {
    value.len() > MAX_LABEL_LEN
}

/// Shorten `value` to `<7 hex of sha256>...<last 53 bytes>`.
///
/// The suffix starts at the first char boundary inside the last 53 bytes, so
/// the result is valid UTF-8 and never longer than 63 bytes. Callers gate
/// this with [`needs_compression`]; shorter inputs keep their whole text as
/// the suffix.
pub fn compress_label(value: &str) -> String {
    let digest = format!("{:x}", Sha256::digest(value.as_bytes()));

    let start = value.len().saturating_sub(SUFFIX_LEN);
    let start = (start..value.len())
        .find(|&offset| value.is_char_boundary(offset))
        .unwrap_or(value.len());

    format!("{}{}{}", &digest[..DIGEST_PREFIX_LEN], SEPARATOR, &value[start..])
}
