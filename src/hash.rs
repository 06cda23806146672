//! Domain-separated SHA-256 wrappers.
//!
//! Every keyed hash starts with a 32-byte all-zero pad whose final byte
//! carries the domain tag: `0x00` for the chaining hash `F`, `0x01` for the
//! node hash `H`, `0x02` for message hashing and `0x03` for the PRF. The PRF
//! absorbs its tag block and 32-byte seed once at construction and reuses the
//! resulting SHA-256 midstate for every call, which is the dominant
//! constant-factor win during key generation.

use sha2::{Digest, Sha256};
use zeroize::Zeroize;

use crate::params::N;
use crate::utils::{set_u32_at, xor_n};
use crate::wots::adrs::Adrs;

#[cfg(feature = "serialization")]
use serde::{Deserialize, Deserializer, Serialize, Serializer};

const TAG_F: u8 = 0x00;
const TAG_H: u8 = 0x01;
const TAG_MSG: u8 = 0x02;
const TAG_PRF: u8 = 0x03;

fn domain_pad(tag: u8) -> [u8; N] {
    let mut pad = [0u8; N];
    pad[N - 1] = tag;
    pad
}

/// `H_msg`: hash of an arbitrary-length message under an arbitrary-length key.
pub(crate) fn hash_msg(key: &[u8], m: &[u8]) -> [u8; N] {
    let mut hasher = Sha256::new();
    hasher.update(domain_pad(TAG_MSG));
    hasher.update(key);
    hasher.update(m);
    hasher.finalize().into()
}

/// `F`: keyed chaining hash over a single n-byte block.
pub(crate) fn hash_f(key: &[u8; N], m: &[u8; N]) -> [u8; N] {
    let mut hasher = Sha256::new();
    hasher.update(domain_pad(TAG_F));
    hasher.update(key);
    hasher.update(m);
    hasher.finalize().into()
}

/// `H`: keyed node hash combining two n-byte children.
pub(crate) fn hash_h(key: &[u8; N], m1: &[u8; N], m2: &[u8; N]) -> [u8; N] {
    let mut hasher = Sha256::new();
    hasher.update(domain_pad(TAG_H));
    hasher.update(key);
    hasher.update(m1);
    hasher.update(m2);
    hasher.finalize().into()
}

/// Keyed PRF over 32-byte inputs.
///
/// Construction compresses the 64-byte block `pad(0x03) || seed` exactly once;
/// [`Prf::sum`] clones that midstate and finishes the hash over the 32-byte
/// message. The seed and midstate never change after construction.
#[derive(Clone, Debug)]
pub struct Prf {
    seed: [u8; N],
    block1: Sha256,
}

impl Prf {
    pub fn new(seed: [u8; N]) -> Self {
        let mut block1 = Sha256::new();
        block1.update(domain_pad(TAG_PRF));
        block1.update(seed);
        Self { seed, block1 }
    }

    pub(crate) fn seed(&self) -> &[u8; N] {
        &self.seed
    }

    /// PRF output for a 32-byte message (typically a hash address).
    pub(crate) fn sum(&self, m: &[u8]) -> [u8; N] {
        let mut hasher = self.block1.clone();
        hasher.update(&m[..N]);
        hasher.finalize().into()
    }

    /// PRF output for the message `zeros(28) || be32(i)`.
    pub(crate) fn sum_int(&self, i: u32) -> [u8; N] {
        let mut m = [0u8; N];
        set_u32_at(&mut m, i, N - 4);
        self.sum(&m)
    }
}

impl Zeroize for Prf {
    fn zeroize(&mut self) {
        self.seed.zeroize();
        self.block1 = Sha256::new();
    }
}

// The midstate is a pure function of the seed, so only the seed travels
// through serialization and the midstate is recomputed on the way in.
#[cfg(feature = "serialization")]
impl Serialize for Prf {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.seed.serialize(serializer)
    }
}

#[cfg(feature = "serialization")]
impl<'de> Deserialize<'de> for Prf {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Ok(Self::new(<[u8; N]>::deserialize(deserializer)?))
    }
}

/// Randomized tree-node hash: masks both children with PRF-derived bitmasks
/// before combining them with `H` under a PRF-derived key.
pub(crate) fn rand_hash(left: &[u8], right: &[u8], prf: &Prf, adrs: &mut Adrs) -> [u8; N] {
    adrs.set_key_and_mask(0);
    let key = prf.sum(adrs.as_ref());
    adrs.set_key_and_mask(1);
    let bm0 = prf.sum(adrs.as_ref());
    adrs.set_key_and_mask(2);
    let bm1 = prf.sum(adrs.as_ref());

    let mut masked_left = [0u8; N];
    xor_n(&mut masked_left, left, &bm0);
    let mut masked_right = [0u8; N];
    xor_n(&mut masked_right, right, &bm1);
    hash_h(&key, &masked_left, &masked_right)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::generate_seed;

    fn plain_sha256(tag: u8, parts: &[&[u8]]) -> [u8; N] {
        let mut fixed = [0u8; N];
        fixed[N - 1] = tag;
        let mut hasher = Sha256::new();
        hasher.update(fixed);
        for part in parts {
            hasher.update(part);
        }
        hasher.finalize().into()
    }

    #[test]
    fn wrappers_match_plain_sha256() {
        let key = generate_seed();
        let m = generate_seed();
        let m2 = generate_seed();

        assert_eq!(hash_msg(&key, &m), plain_sha256(0x02, &[&key, &m]));
        assert_eq!(hash_f(&key, &m), plain_sha256(0x00, &[&key, &m]));
        assert_eq!(hash_h(&key, &m, &m2), plain_sha256(0x01, &[&key, &m, &m2]));
    }

    #[test]
    fn prf_matches_plain_sha256() {
        let key = generate_seed();
        let m = generate_seed();
        let m2 = generate_seed();

        let prf = Prf::new(key);
        assert_eq!(prf.sum(&m), plain_sha256(0x03, &[&key, &m]));
        assert_eq!(prf.sum(&m2), plain_sha256(0x03, &[&key, &m2]));

        let mut padded = [0u8; N];
        padded[N - 4..].copy_from_slice(&123u32.to_be_bytes());
        assert_eq!(prf.sum_int(123), plain_sha256(0x03, &[&key, &padded]));
        padded[N - 4..].copy_from_slice(&456u32.to_be_bytes());
        assert_eq!(prf.sum_int(456), plain_sha256(0x03, &[&key, &padded]));
    }

    #[cfg(feature = "serialization")]
    #[test]
    fn prf_serializes_as_its_seed() {
        let prf = Prf::new(generate_seed());
        let json = serde_json::to_string(&prf).unwrap();
        let restored: Prf = serde_json::from_str(&json).unwrap();
        let m = generate_seed();
        assert_eq!(prf.sum(&m), restored.sum(&m));
    }
}
