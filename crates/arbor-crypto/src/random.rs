//! Secure random source

use rand::RngCore;

/// Source of unpredictable bytes for nonces
pub trait RandomSource: Send + Sync {
    /// Fill `buf` with random bytes
    fn fill(&self, buf: &mut [u8]);
}

/// Thread-local CSPRNG seeded from the operating system
#[derive(Debug, Clone, Copy, Default)]
pub struct OsRandom;

impl RandomSource for OsRandom {
    fn fill(&self, buf: &mut [u8]) {
        rand::rng().fill_bytes(buf);
    }
}
