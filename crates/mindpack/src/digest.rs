//! Content hashing for bundle files.

use std::collections::BTreeMap;
use std::io::{Cursor, Read};

use sha2::{Digest, Sha256};

/// Hash algorithm identifier used as key in a file's hash map.
pub const SHA256: &str = "sha-256";

/// Stream `reader` through SHA-256 and return the lowercase hex digest.
pub fn sha256_hex_reader<R: Read>(mut reader: R) -> std::io::Result<String> {
    let mut hasher = Sha256::new();
    let mut buf = [0_u8; 8192];

    loop {
        let n = match reader.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        };
        hasher.update(&buf[..n]);
    }

    Ok(hex::encode(hasher.finalize()))
}

pub fn sha256_hex_bytes(bytes: &[u8]) -> String {
    // Single hashing path; a cursor over memory cannot fail.
    sha256_hex_reader(Cursor::new(bytes)).expect("hashing in-memory bytes via cursor must not fail")
}

/// Hash map for a bundle file entry (`{"sha-256": <hex>}`).
pub fn file_hashes<R: Read>(reader: R) -> std::io::Result<BTreeMap<String, String>> {
    let digest = sha256_hex_reader(reader)?;
    Ok(BTreeMap::from([(SHA256.to_string(), digest)]))
}

#[cfg(test)]
mod tests {
    use super::*;

    struct ChunkedReader<'a> {
        data: &'a [u8],
        pos: usize,
        max_chunk: usize,
    }

    impl Read for ChunkedReader<'_> {
        fn read(&mut self, out: &mut [u8]) -> std::io::Result<usize> {
            if self.pos >= self.data.len() {
                return Ok(0);
            }
            let n = out
                .len()
                .min(self.max_chunk)
                .min(self.data.len().saturating_sub(self.pos));
            out[..n].copy_from_slice(&self.data[self.pos..self.pos + n]);
            self.pos += n;
            Ok(n)
        }
    }

    #[test]
    fn known_vector() {
        assert_eq!(
            sha256_hex_bytes(b"abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn reader_matches_bytes_digest() {
        let payload = b"\x00\x01hello\xffbinary\n";
        let from_reader = sha256_hex_reader(Cursor::new(payload)).expect("reader hashing");
        assert_eq!(sha256_hex_bytes(payload), from_reader);
    }

    #[test]
    fn chunked_stream_parity() {
        let payload = vec![7_u8; 3 * 8192 + 17];
        let chunked = ChunkedReader {
            data: &payload,
            pos: 0,
            max_chunk: 1000,
        };
        let from_chunked = sha256_hex_reader(chunked).expect("chunked reader hashing");
        assert_eq!(sha256_hex_bytes(&payload), from_chunked);
    }

    #[test]
    fn one_byte_changes_digest() {
        let a = sha256_hex_bytes(b"rule: allow\n");
        let b = sha256_hex_bytes(b"rule: allox\n");
        assert_ne!(a, b);
        assert_eq!(a, sha256_hex_bytes(b"rule: allow\n"));
    }

    #[test]
    fn file_hashes_uses_stable_key() {
        let hashes = file_hashes(Cursor::new(b"x")).unwrap();
        assert_eq!(hashes.len(), 1);
        let digest = hashes.get(SHA256).unwrap();
        assert_eq!(digest.len(), 64);
        assert!(digest.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
    }
}
