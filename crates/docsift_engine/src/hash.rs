use std::fmt::Write;

use sha2::{Digest, Sha256};

/// Number of hex characters of the URL digest used in cache file names.
pub const URL_HASH_LEN: usize = 12;

/// SHA-256 of the exact UTF-8 bytes of `cleaned_html`, as lowercase hex.
pub fn hash_content(cleaned_html: &str) -> String {
    to_hex(&Sha256::digest(cleaned_html.as_bytes()))
}

/// Short digest of a URL used to name cache files. Not an identity key.
pub fn url_hash(url: &str) -> String {
    let mut hex = hash_content(url);
    hex.truncate(URL_HASH_LEN);
    hex
}

fn to_hex(bytes: &[u8]) -> String {
    let mut hex = String::with_capacity(bytes.len() * 2);
    for byte in bytes {
        let _ = write!(&mut hex, "{byte:02x}");
    }
    hex
}
