use sha2::{Digest, Sha256};

use crate::ports::{Digest256, DigestAccumulator};

// ============================================================================
// Sha256dDigest - Protocol Checksum Digest
// ============================================================================

/// `SHA256(SHA256(data))`, the protocol's message digest.
#[derive(Debug, Clone, Copy, Default)]
pub struct Sha256dDigest;

impl Sha256dDigest {
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl Digest256 for Sha256dDigest {
    fn digest256(&self, data: &[u8]) -> [u8; 32] {
        Sha256::digest(Sha256::digest(data)).into()
    }

    fn accumulator(&self) -> Box<dyn DigestAccumulator> {
        Box::new(Sha256dAccumulator(Sha256::new()))
    }
}

struct Sha256dAccumulator(Sha256);

impl DigestAccumulator for Sha256dAccumulator {
    fn update(&mut self, data: &[u8]) {
        self.0.update(data);
    }

    fn finalize(self: Box<Self>) -> [u8; 32] {
        Sha256::digest(self.0.finalize()).into()
    }
}
