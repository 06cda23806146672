//! Single-tree XMSS signing and verification, including the wire format.
//!
//! Signature layout (big-endian):
//! `[4 idx][32 seed][32 r][67*32 wots_sig][h*32 auth]`.

use zeroize::Zeroize;

use crate::errors::{Error, Result};
use crate::hash::{hash_msg, rand_hash, Prf};
use crate::merkle::Merkle;
use crate::params::{xmss_sig_bytes, N, WOTS_BYTES, XMSS_PK_BYTES};
use crate::utils::{bytes_to_u32, set_u32_at, u32_to_bytes};
use crate::wots;
use crate::wots::adrs::{Adrs, AdrsType};

/// One per-layer signature block: the WOTS+ signature followed by the
/// authentication path.
pub(crate) struct SigBody<'a> {
    pub(crate) wots_sig: &'a [u8],
    pub(crate) auth: &'a [u8],
}

/// Splits a `(wots_sig || auth)` block. The caller guarantees `b` is at
/// least `WOTS_BYTES` long and a multiple of `N` past that.
pub(crate) fn parse_body(b: &[u8]) -> SigBody<'_> {
    SigBody {
        wots_sig: &b[..WOTS_BYTES],
        auth: &b[WOTS_BYTES..],
    }
}

struct SigParts<'a> {
    idx: u32,
    seed: [u8; N],
    r: &'a [u8],
    body: SigBody<'a>,
}

fn parse_sig(b: &[u8]) -> Option<SigParts<'_>> {
    const FIXED: usize = 4 + N + N + WOTS_BYTES;
    if b.len() <= FIXED || (b.len() - FIXED) % N != 0 {
        return None;
    }
    let mut seed = [0u8; N];
    seed.copy_from_slice(&b[4..4 + N]);
    Some(SigParts {
        idx: bytes_to_u32(&b[..4]),
        seed,
        r: &b[4 + N..4 + 2 * N],
        body: parse_body(&b[4 + 2 * N..]),
    })
}

impl Merkle {
    /// Signs `msg` with the current leaf and advances the tree state.
    ///
    /// Fails once all `2^h` one-time leaves are spent. The signature bytes
    /// are fully assembled before the state advances, so a key serialized
    /// between calls re-signs identically.
    pub fn sign(&mut self, msg: &[u8]) -> Result<Vec<u8>> {
        if u64::from(self.leaf) >= 1u64 << self.height {
            return Err(Error::LeavesExhausted(u64::from(self.leaf)));
        }

        let mut index = [0u8; N];
        set_u32_at(&mut index, self.leaf, N - 4);
        // r || root || padded index keys the message hash.
        let mut rkey = [0u8; 3 * N];
        rkey[..N].copy_from_slice(&self.key.msg_prf.sum(&index));
        rkey[N..2 * N].copy_from_slice(&self.key.root);
        rkey[2 * N..].copy_from_slice(&index);
        let hmsg = hash_msg(&rkey, msg);

        let mut sig = Vec::with_capacity(xmss_sig_bytes(self.height));
        sig.extend_from_slice(&u32_to_bytes(self.leaf));
        sig.extend_from_slice(self.key.pub_prf.seed());
        sig.extend_from_slice(&rkey[..N]);
        sig.extend_from_slice(&self.sign_body(&hmsg));
        self.traverse(); // state must not advance before the output is complete
        Ok(sig)
    }

    /// Produces the `(wots_sig || auth)` block for a digest at the current
    /// leaf without advancing state. XMSS^MT drives leaf advancement itself.
    pub(crate) fn sign_body(&self, hmsg: &[u8; N]) -> Vec<u8> {
        let mut adrs = Adrs::default();
        adrs.set_layer(self.layer);
        adrs.set_tree(self.tree);
        adrs.set_ots(self.leaf);

        let mut sk = [0u8; WOTS_BYTES];
        self.key.wots_sk(&adrs, &mut sk);
        let wots_sig = wots::sign(&sk, hmsg, &self.key.pub_prf, &adrs);
        sk.zeroize();

        let mut body = Vec::with_capacity(WOTS_BYTES + self.auth.len() * N);
        body.extend_from_slice(&wots_sig);
        for node in &self.auth {
            body.extend_from_slice(node);
        }
        body
    }
}

/// Verifies an XMSS signature against a 65-byte public key
/// (`[1 height][32 root][32 seed]`).
///
/// All failure modes collapse into `false`.
pub fn verify(sig: &[u8], msg: &[u8], pk: &[u8]) -> bool {
    if pk.len() != XMSS_PK_BYTES {
        return false;
    }
    let Some(parts) = parse_sig(sig) else {
        return false;
    };
    let root = &pk[1..1 + N];

    let mut rkey = [0u8; 3 * N];
    rkey[..N].copy_from_slice(parts.r);
    rkey[N..2 * N].copy_from_slice(root);
    set_u32_at(&mut rkey, parts.idx, 3 * N - 4);
    let hmsg = hash_msg(&rkey, msg);

    // Masks and chain keys derive from the seed carried in the signature, so
    // a flipped seed bit invalidates the signature like any other.
    let prf = Prf::new(parts.seed);
    let node = root_from_sig(parts.idx, &hmsg, &parts.body, &prf, 0, 0);
    node[..] == *root
}

/// Recomputes the tree root implied by a signature block: recover the WOTS+
/// public key, compress it through the L-tree, then climb the tree using the
/// authentication path, taking the left or right slot as the index dictates.
pub(crate) fn root_from_sig(
    idx: u32,
    hmsg: &[u8; N],
    body: &SigBody<'_>,
    prf: &Prf,
    layer: u32,
    tree: u64,
) -> [u8; N] {
    let mut adrs = Adrs::default();
    adrs.set_layer(layer);
    adrs.set_tree(tree);
    adrs.set_ots(idx);
    let mut pk = wots::pk_from_sig(body.wots_sig, hmsg, prf, &adrs);

    adrs.set_type(AdrsType::LTree);
    adrs.set_ltree(idx);
    let mut node = wots::ltree(&mut pk, prf, &mut adrs);

    adrs.set_type(AdrsType::HashTree);
    adrs.set_ltree(0);
    let mut idx = idx;
    for (k, sibling) in body.auth.chunks_exact(N).enumerate() {
        adrs.set_height(k as u32);
        adrs.set_index(idx >> 1);
        node = if idx & 1 == 0 {
            rand_hash(&node, sibling, prf, &mut adrs)
        } else {
            rand_hash(sibling, &node, prf, &mut adrs)
        };
        idx >>= 1;
    }
    node
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::generate_seed;

    // The deterministic public key for the all-zero seed at height 2. The
    // constant was cross-checked against an independent implementation of
    // the scheme.
    const ZERO_SEED_H2_PK: &str = "02463f627732e4950bfeea2f6f0e65426cfda07d06b6903a53669aa3be3f864db3\
                                   a6d76548fe8ed070bb909d99999aab3123ea3de416a2d58bcefb8f867962bb86";

    #[test]
    fn sign_verify_every_leaf_h10() {
        let seed = generate_seed();
        let mut merkle = Merkle::new(10, &seed);
        let pk = merkle.public_key();
        let msg = b"This is a test for XMSS.";
        let mut previous: Option<Vec<u8>> = None;
        for _ in 0..1u32 << 10 {
            let sig = merkle.sign(msg).unwrap();
            assert!(verify(&sig, msg, &pk));
            if let Some(prev) = &previous {
                assert_ne!(prev, &sig, "signatures must embed distinct indices");
            }
            previous = Some(sig);
        }
    }

    #[test]
    fn tampered_message_is_rejected() {
        let mut merkle = Merkle::new(2, &generate_seed());
        let pk = merkle.public_key();
        let msg = b"This is a test for XMSS.".to_vec();
        let sig = merkle.sign(&msg).unwrap();
        assert!(verify(&sig, &msg, &pk));

        let mut tampered = msg.clone();
        tampered[0] = 0;
        assert!(!verify(&sig, &tampered, &pk));
        assert!(verify(&sig, &msg, &pk));
    }

    #[test]
    fn tampered_signature_is_rejected_h16() {
        let mut merkle = Merkle::new(16, &generate_seed());
        let pk = merkle.public_key();
        let msg = b"This is a test for XMSS height=16.";
        let sig = merkle.sign(msg).unwrap();
        assert!(verify(&sig, msg, &pk));

        // A single flipped bit anywhere in the signature must break it.
        for position in [0, 5, 40, 80, 2000, sig.len() - 1] {
            let mut bad = sig.clone();
            bad[position] ^= 1;
            assert!(!verify(&bad, msg, &pk), "flip at {position}");
        }
    }

    #[test]
    fn signing_stops_after_the_last_leaf() {
        let mut merkle = Merkle::new(2, &generate_seed());
        let pk = merkle.public_key();
        for _ in 0..4 {
            let sig = merkle.sign(b"msg").unwrap();
            assert!(verify(&sig, b"msg", &pk));
        }
        assert_eq!(merkle.sign(b"msg"), Err(Error::LeavesExhausted(4)));
        assert_eq!(merkle.leaf(), 4);
    }

    #[test]
    fn malformed_inputs_are_rejected() {
        let mut merkle = Merkle::new(2, &generate_seed());
        let pk = merkle.public_key();
        let sig = merkle.sign(b"msg").unwrap();

        assert!(!verify(&sig[..sig.len() - 1], b"msg", &pk));
        assert!(!verify(&sig[..100], b"msg", &pk));
        assert!(!verify(&[], b"msg", &pk));
        assert!(!verify(&sig, b"msg", &pk[..64]));
    }

    #[test]
    fn zero_seed_public_key_is_deterministic() {
        let merkle = Merkle::new(2, &[0u8; N]);
        let pk = merkle.public_key();
        let expected: Vec<u8> = (0..ZERO_SEED_H2_PK.len())
            .step_by(2)
            .map(|i| u8::from_str_radix(&ZERO_SEED_H2_PK[i..i + 2], 16).unwrap())
            .collect();
        assert_eq!(pk[..], expected[..]);
    }

    #[cfg(feature = "serialization")]
    #[test]
    fn serialized_key_resumes_identically() {
        let mut merkle = Merkle::new(10, &generate_seed());
        let msg = b"This is a test for XMSS height=16.";

        // Textual round-trip of the unused key: first signatures agree.
        let json = serde_json::to_string(&merkle).unwrap();
        let mut restored: Merkle = serde_json::from_str(&json).unwrap();
        assert_eq!(merkle.sign(msg).unwrap(), restored.sign(msg).unwrap());

        // Binary round-trip mid-life: the next signatures agree too.
        for _ in 0..5 {
            merkle.sign(msg).unwrap();
        }
        let bytes = bincode::serialize(&merkle).unwrap();
        let mut restored: Merkle = bincode::deserialize(&bytes).unwrap();
        assert_eq!(merkle.sign(msg).unwrap(), restored.sign(msg).unwrap());
        assert_eq!(merkle.sign(msg).unwrap(), restored.sign(msg).unwrap());
    }
}
