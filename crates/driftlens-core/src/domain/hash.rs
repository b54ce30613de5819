// SPDX-License-Identifier: Apache-2.0

use std::fmt::Write as _;

use sha2::{Digest, Sha256};

/// A finished SHA-256 digest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Hash256([u8; 32]);

impl Hash256 {
    /// Uppercase hex split into 8-character groups joined by `-`, the display
    /// form used to tag reports with the reference fingerprint.
    #[must_use]
    pub fn grouped_hex(&self) -> String {
        let mut out = String::with_capacity(71);
        for (i, chunk) in self.0.chunks(4).enumerate() {
            if i > 0 {
                out.push('-');
            }
            for byte in chunk {
                let _ = write!(&mut out, "{byte:02X}");
            }
        }
        out
    }
}

/// Incremental digest for multi-file fingerprints.
#[derive(Debug, Default)]
pub struct Sha256Stream {
    inner: Sha256,
}

impl Sha256Stream {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn update(&mut self, bytes: &[u8]) {
        self.inner.update(bytes);
    }

    #[must_use]
    pub fn finish(self) -> Hash256 {
        let mut out = [0_u8; 32];
        out.copy_from_slice(&self.inner.finalize());
        Hash256(out)
    }
}

#[must_use]
pub fn sha256(bytes: &[u8]) -> Hash256 {
    let mut stream = Sha256Stream::new();
    stream.update(bytes);
    stream.finish()
}

/// Plain lowercase hex digest, for checksum-style output.
#[must_use]
pub fn sha256_hex(bytes: &[u8]) -> String {
    let Hash256(digest) = sha256(bytes);
    let mut out = String::with_capacity(64);
    for byte in digest {
        let _ = write!(&mut out, "{byte:02x}");
    }
    out
}
