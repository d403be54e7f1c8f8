use rand::Rng;
use sha2::{Digest, Sha256};

/// Alphabet codes are drawn from: uppercase Latin letters and digits.
const CODE_ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";
pub const CODE_LENGTH: usize = 8;
pub const DEFAULT_CODE_COUNT: usize = 10;

/// Generate `count` random recovery codes, formatted as two 4-character
/// groups joined by a hyphen (e.g. `AB3D-9F2K`) for readability.
pub fn generate_codes(count: usize) -> Vec<String> {
    let mut rng = rand::thread_rng();
    (0..count)
        .map(|_| {
            let code: String = (0..CODE_LENGTH)
                .map(|_| CODE_ALPHABET[rng.gen_range(0..CODE_ALPHABET.len())] as char)
                .collect();
            format!("{}-{}", &code[..4], &code[4..])
        })
        .collect()
}

/// Canonical form used for hashing and lookup: separators and whitespace
/// stripped, upper-cased. `ab3d-9f2k`, `AB3D 9F2K` and `AB3D9F2K` all
/// normalize to the same text.
pub fn normalize_code(code: &str) -> String {
    code.chars()
        .filter(|c| !c.is_whitespace() && *c != '-')
        .collect::<String>()
        .to_uppercase()
}

/// Hex-encoded SHA-256 over the normalized code text. This is what gets
/// persisted; the plaintext never does.
pub fn hash_code(code: &str) -> String {
    let normalized = normalize_code(code);
    let digest = Sha256::digest(normalized.as_bytes());
    hex::encode(digest)
}
