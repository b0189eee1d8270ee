// SPDX-FileCopyrightText: 2026 Clonr Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Text armor for sealed backup blobs: a literal magic tag, a colon, and a
//! base58 body, so a whole-database backup survives copy-paste, chat
//! clients, and shell quoting.

use clonr_core::ClonrError;

/// Literal prefix every armored backup starts with.
pub const MAGIC: &str = "CLONR:";

/// Armor raw blob bytes.
pub fn encode(blob: &[u8]) -> String {
    format!("{MAGIC}{}", bs58::encode(blob).into_string())
}

/// Strip the armor back to raw blob bytes.
///
/// Input without the literal `CLONR:` prefix is rejected outright -- it is
/// not a clonr backup, and guessing would mask user paste errors.
pub fn decode(text: &str) -> Result<Vec<u8>, ClonrError> {
    let body = text
        .trim()
        .strip_prefix(MAGIC)
        .ok_or_else(|| ClonrError::Backup(format!("not a clonr backup (missing `{MAGIC}` prefix)")))?;
    bs58::decode(body)
        .into_vec()
        .map_err(|_| ClonrError::WrongSecretOrCorrupted)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encode_decode_roundtrip() {
        let blob = vec![0u8, 1, 2, 255, 128, 7];
        let armored = encode(&blob);
        assert!(armored.starts_with("CLONR:"));
        assert_eq!(decode(&armored).unwrap(), blob);
    }

    #[test]
    fn missing_prefix_is_rejected() {
        let result = decode("3mJr7AoUXx2Wqd");
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("CLONR:"));
    }

    #[test]
    fn surrounding_whitespace_is_tolerated() {
        let armored = format!("  {}\n", encode(b"data"));
        assert_eq!(decode(&armored).unwrap(), b"data");
    }

    #[test]
    fn invalid_base58_body_is_corruption() {
        // 0, O, I, l are not in the base58 alphabet.
        let result = decode("CLONR:0OIl");
        assert!(matches!(result, Err(ClonrError::WrongSecretOrCorrupted)));
    }
}
