//! Content digests and type sniffing for file snapshots

use md5::{Digest, Md5};
use serde::{Deserialize, Serialize};
use sha1::Sha1;

/// Hashes of one file's content
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentDigest {
    /// Lowercase hex MD5
    pub md5: String,
    /// Lowercase hex SHA1
    pub sha1: String,
    /// The 20 SHA1 digest bytes
    pub sha1_raw: [u8; 20],
}

impl ContentDigest {
    pub fn of(data: &[u8]) -> Self {
        let md5 = Md5::digest(data);
        let sha1 = Sha1::digest(data);
        let mut sha1_raw = [0u8; 20];
        sha1_raw.copy_from_slice(&sha1);
        Self {
            md5: hex::encode(md5),
            sha1: hex::encode(sha1),
            sha1_raw,
        }
    }
}

/// MIME type guessed from magic bytes
pub fn sniff_mime(data: &[u8]) -> Option<String> {
    infer::get(data).map(|kind| kind.mime_type().to_string())
}
