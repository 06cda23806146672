//! Multi-tree XMSS (XMSS^MT): a hyper-tree of `d` layers of XMSS trees of
//! height `h/d`, where each non-bottom tree signs the roots of the trees
//! below it. The signable index space grows to `2^h` while key generation
//! only ever builds one tree of `2^(h/d)` leaves at a time.
//!
//! Signature layout (big-endian):
//! `[8 idx][32 r]` followed by `d` blocks of `(wots_sig || auth)`.
//! Public key: `[1 header][32 root][32 seed]` with header `(h/20)<<4 | d`.

use crate::errors::{Error, Result};
use crate::hash::{hash_msg, Prf};
use crate::merkle::{subseed, Merkle};
use crate::params::{xmss_mt_sig_bytes, N, WOTS_LEN, XMSS_PK_BYTES};
use crate::utils::{bytes_to_u64, set_u64_at, u64_to_bytes};
use crate::xmss::{parse_body, root_from_sig};

#[cfg(feature = "serialization")]
use serde::{Deserialize, Serialize};

/// XMSS^MT private key: the global 64-bit signature counter and `d` layers of
/// lazily materialized XMSS trees. Only the top layer exists after
/// construction; lower layers are built (and rebuilt, as the global index
/// walks across tree boundaries) on demand during signing.
#[cfg_attr(feature = "serialization", derive(Serialize, Deserialize))]
#[derive(Clone)]
pub struct PrivKeyMT {
    index: u64,
    merkle: Vec<Option<Merkle>>,
    h: u32,
    d: u32,
}

/// Decoded form of the 65-byte XMSS^MT public key.
#[cfg_attr(feature = "serialization", derive(Serialize, Deserialize))]
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PublicKeyMT {
    pub h: u32,
    pub d: u32,
    pub root: [u8; N],
    pub seed: [u8; N],
}

impl PublicKeyMT {
    /// Encodes the public key; the header nibbles carry `h/20` and `d`.
    pub fn to_bytes(&self) -> [u8; XMSS_PK_BYTES] {
        let mut bytes = [0u8; XMSS_PK_BYTES];
        bytes[0] = ((self.h / 20) << 4) as u8 | self.d as u8;
        bytes[1..1 + N].copy_from_slice(&self.root);
        bytes[1 + N..].copy_from_slice(&self.seed);
        bytes
    }

    /// Decodes a 65-byte public key.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() != XMSS_PK_BYTES {
            return Err(Error::InvalidLength);
        }
        let mut root = [0u8; N];
        root.copy_from_slice(&bytes[1..1 + N]);
        let mut seed = [0u8; N];
        seed.copy_from_slice(&bytes[1 + N..]);
        Ok(Self {
            h: (u32::from(bytes[0]) >> 4) * 20,
            d: u32::from(bytes[0]) & 0x0f,
            root,
            seed,
        })
    }
}

impl PrivKeyMT {
    /// Creates an XMSS^MT key of total height `h` split across `d` layers.
    ///
    /// `h` must be a positive multiple of both `d` and 20, with `h/20` and
    /// `d` in `1..=15` and the per-layer height `h/d` below 32. Only the top
    /// layer tree is built here.
    pub fn new(seed: &[u8; N], h: u32, d: u32) -> Result<Self> {
        if d == 0 || d > 15 || h == 0 || h % 20 != 0 || h / 20 > 15 || h % d != 0 || h / d > 31 {
            return Err(Error::InvalidParams);
        }
        let mut merkle = vec![None; d as usize];
        merkle[d as usize - 1] = Some(Merkle::with_seeds(
            h / d,
            subseed(seed, 1),
            subseed(seed, 2),
            subseed(seed, 3),
            d - 1,
            0,
        ));
        Ok(Self {
            index: 0,
            merkle,
            h,
            d,
        })
    }

    /// Global signature counter: the next unused leaf index.
    pub fn index(&self) -> u64 {
        self.index
    }

    fn top(&self) -> &Merkle {
        self.merkle[self.d as usize - 1]
            .as_ref()
            .expect("the top layer tree is always present")
    }

    /// The decoded public key (top-layer root and public seed).
    pub fn public_key(&self) -> PublicKeyMT {
        let top = self.top();
        PublicKeyMT {
            h: self.h,
            d: self.d,
            root: top.key.root,
            seed: *top.key.pub_prf.seed(),
        }
    }

    /// Jumps the signature counter forward, skipping the leaves in between.
    ///
    /// Rewinding is refused: a reused leaf leaks its WOTS+ private key. Any
    /// layer tree invalidated by the jump is rebuilt lazily on the next
    /// [`PrivKeyMT::sign`].
    pub fn set_leaf_no(&mut self, n: u64) -> Result<()> {
        if n < self.index {
            return Err(Error::IndexRewind {
                requested: n,
                current: self.index,
            });
        }
        self.index = n;
        Ok(())
    }

    /// Ensures layer `j` holds the tree at `idx_tree`, rebuilding it when the
    /// slot is empty or caches a different tree.
    fn layer_tree(
        &mut self,
        j: usize,
        idx_tree: u64,
        wots_seed: [u8; N],
        msg_seed: [u8; N],
        pub_seed: [u8; N],
    ) -> &mut Merkle {
        let rebuild = match &self.merkle[j] {
            Some(m) => m.tree != idx_tree,
            None => true,
        };
        if rebuild {
            self.merkle[j] = Some(Merkle::with_seeds(
                self.h / self.d,
                wots_seed,
                msg_seed,
                pub_seed,
                j as u32,
                idx_tree,
            ));
        }
        self.merkle[j].as_mut().expect("layer tree was just ensured")
    }

    /// Signs `msg` at the current global index and advances the counter.
    ///
    /// The bottom layer signs the message hash; every layer above signs the
    /// root of the tree below. Layer trees advance leaf by leaf to the index
    /// chunk they owe, so a signature may pay for up to `2^(h/d) - 1`
    /// traversal steps after a tree boundary or an index jump.
    pub fn sign(&mut self, msg: &[u8]) -> Result<Vec<u8>> {
        if self.h < 64 && self.index >= 1u64 << self.h {
            return Err(Error::LeavesExhausted(self.index));
        }

        let mut index = [0u8; N];
        set_u64_at(&mut index, self.index, N - 8);
        let (wots_seed, msg_seed, pub_seed, r, hmsg) = {
            let top = self.top();
            let mut rkey = [0u8; 3 * N];
            rkey[..N].copy_from_slice(&top.key.msg_prf.sum(&index));
            rkey[N..2 * N].copy_from_slice(&top.key.root);
            rkey[2 * N..].copy_from_slice(&index);
            let hmsg = hash_msg(&rkey, msg);
            let mut r = [0u8; N];
            r.copy_from_slice(&rkey[..N]);
            (
                *top.key.wots_prf.seed(),
                *top.key.msg_prf.seed(),
                *top.key.pub_prf.seed(),
                r,
                hmsg,
            )
        };

        let mut sig = Vec::with_capacity(xmss_mt_sig_bytes(self.h, self.d));
        sig.extend_from_slice(&u64_to_bytes(self.index));
        sig.extend_from_slice(&r);

        let subtree_h = self.h / self.d;
        let mask = (1u64 << subtree_h) - 1;
        let mut idx_tree = self.index >> subtree_h;
        let mut idx_leaf = (self.index & mask) as u32;
        let mut root = [0u8; N];
        for j in 0..self.d as usize {
            if j > 0 {
                idx_leaf = (idx_tree & mask) as u32;
                idx_tree >>= subtree_h;
            }
            let digest = if j == 0 { hmsg } else { root };
            let tree = self.layer_tree(j, idx_tree, wots_seed, msg_seed, pub_seed);
            while tree.leaf() < idx_leaf {
                tree.traverse();
            }
            sig.extend_from_slice(&tree.sign_body(&digest));
            root = tree.key.root;
        }

        self.index += 1;
        Ok(sig)
    }
}

/// Verifies an XMSS^MT signature against a 65-byte public key.
///
/// All failure modes collapse into `false`.
pub fn verify_mt(sig: &[u8], msg: &[u8], pk: &[u8]) -> bool {
    let Ok(pk) = PublicKeyMT::from_bytes(pk) else {
        return false;
    };
    if pk.d == 0 || pk.h == 0 || pk.h % pk.d != 0 || pk.h / pk.d > 31 {
        return false;
    }
    let subtree_h = pk.h / pk.d;
    if sig.len() != xmss_mt_sig_bytes(pk.h, pk.d) {
        return false;
    }

    let idx = bytes_to_u64(&sig[..8]);
    let mut rkey = [0u8; 3 * N];
    rkey[..N].copy_from_slice(&sig[8..8 + N]);
    rkey[N..2 * N].copy_from_slice(&pk.root);
    set_u64_at(&mut rkey, idx, 3 * N - 8);
    let hmsg = hash_msg(&rkey, msg);
    let prf = Prf::new(pk.seed);

    let mask = (1u64 << subtree_h) - 1;
    let per_layer = (WOTS_LEN + subtree_h as usize) * N;
    let mut idx_tree = idx >> subtree_h;
    let mut idx_leaf = (idx & mask) as u32;
    let mut node = [0u8; N];
    for j in 0..pk.d as usize {
        if j > 0 {
            idx_leaf = (idx_tree & mask) as u32;
            idx_tree >>= subtree_h;
        }
        let digest = if j == 0 { hmsg } else { node };
        let start = 8 + N + j * per_layer;
        let body = parse_body(&sig[start..start + per_layer]);
        node = root_from_sig(idx_leaf, &digest, &body, &prf, j as u32, idx_tree);
    }
    node == pk.root
}
