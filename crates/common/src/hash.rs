//! Content hashes stored as object metadata.

use std::io;
use std::path::Path;

use sha1::{Digest, Sha1};
use tokio::io::AsyncReadExt;

/// Metadata key the hash is stored under.
pub const SHA1_METADATA_KEY: &str = "sha1base36";

/// Width of a base-36 rendered SHA-1 digest.
const BASE36_WIDTH: usize = 31;
const BASE36_DIGITS: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";
const READ_CHUNK: usize = 64 * 1024;

pub fn sha1_base36(data: &[u8]) -> String {
    to_base36(Sha1::digest(data).into())
}

/// Hash a local file without loading it into memory.
pub async fn sha1_base36_file(path: &Path) -> io::Result<String> {
    let mut file = tokio::fs::File::open(path).await?;
    let mut hasher = Sha1::new();
    let mut buf = vec![0u8; READ_CHUNK];
    loop {
        let n = file.read(&mut buf).await?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(to_base36(hasher.finalize().into()))
}

/// Render a big-endian integer in lowercase base 36, zero-padded.
fn to_base36(mut digest: [u8; 20]) -> String {
    let mut out = Vec::with_capacity(BASE36_WIDTH);
    while digest.iter().any(|b| *b != 0) {
        // long division of the whole digest by 36
        let mut rem: u32 = 0;
        for byte in digest.iter_mut() {
            let acc = (rem << 8) | u32::from(*byte);
            *byte = (acc / 36) as u8;
            rem = acc % 36;
        }
        out.push(BASE36_DIGITS[rem as usize]);
    }
    while out.len() < BASE36_WIDTH {
        out.push(b'0');
    }
    out.reverse();
    out.into_iter().map(char::from).collect()
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn test_known_digests() {
        assert_eq!(sha1_base36(b""), "phoiac9h4m842xq45sp7s6u21eteeq1");
        assert_eq!(sha1_base36(b"abc"), "jt72fo5t4yobf0qugwuczbwj07max7h");
    }

    #[test]
    fn test_padding() {
        let mut digest = [0u8; 20];
        digest[19] = 35;
        assert_eq!(to_base36(digest), format!("{}z", "0".repeat(30)));
        assert_eq!(to_base36([0u8; 20]), "0".repeat(31));
    }

    #[tokio::test]
    async fn test_file_matches_buffer() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        let data = b"hello world".repeat(20_000);
        file.write_all(&data).unwrap();
        file.flush().unwrap();

        let from_file = sha1_base36_file(file.path()).await.unwrap();
        assert_eq!(from_file, sha1_base36(&data));
        assert_eq!(sha1_base36(b"hello world"), "4zhesd4ug4c6doc2qpdcebei9tknylp");
    }
}
