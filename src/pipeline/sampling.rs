//! Reproducible subject sampling: keep a subject iff `stable_hash(subject) % M == 0`.

/// 64-bit hash of `subject`: the first 8 bytes of its blake3 digest, little endian.
/// Blake3 is a fixed algorithm, so the value is the same across runs, hosts and releases.
pub fn stable_hash(subject: &str) -> u64 {
    let digest = blake3::hash(subject.as_bytes());
    let mut head = [0u8; 8];
    head.copy_from_slice(&digest.as_bytes()[..8]);
    u64::from_le_bytes(head)
}

/// Pure accept test. `modulus` 0 or 1 accepts everything.
pub fn accept(subject: &str, modulus: u64) -> bool {
    modulus <= 1 || stable_hash(subject) % modulus == 0
}

/// Sampling filter bound to one divisor.
#[derive(Clone, Copy, Debug)]
pub struct Sampler {
    modulus: u64,
}

impl Sampler {
    pub fn new(modulus: u64) -> Self {
        Self {
            modulus: modulus.max(1),
        }
    }

    pub fn modulus(&self) -> u64 {
        self.modulus
    }

    pub fn accept(&self, subject: &str) -> bool {
        accept(subject, self.modulus)
    }
}
