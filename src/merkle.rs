//! Merkle tree construction and incremental BDS-style authentication-path
//! traversal.
//!
//! Key generation builds the full tree of `2^h` one-time leaves with a
//! leaf-by-leaf stack, snapshotting along the way the per-row stacks and the
//! sibling nodes that seed the authentication path for leaf 0. Afterwards,
//! [`Merkle::traverse`] advances the path by a single leaf in O(h) amortized
//! work: each row stack lazily regrows the next sibling subtree, one
//! merge-or-leaf step at a time, and the scheduler always advances the stack
//! with the lowest incomplete row.
//!
//! The initial build splits the bottom of the tree into `2^p` ranges (p sized
//! to the rayon pool) whose subtree roots are produced by parallel workers;
//! the driver consumes those roots in order when it reaches the boundary
//! level, which yields a tree bit-identical to a sequential build.

use std::collections::VecDeque;

use hmac::{Hmac, Mac};
use rayon::prelude::*;
use sha2::Sha256;
use zeroize::Zeroize;

use crate::hash::{rand_hash, Prf};
use crate::params::{N, WOTS_BYTES, XMSS_PK_BYTES};
use crate::wots;
use crate::wots::adrs::{Adrs, AdrsType};

#[cfg(feature = "serialization")]
use serde::{Deserialize, Serialize};

type HmacSha256 = Hmac<Sha256>;

/// Derives one of the three domain-separated sub-seeds from the master seed.
pub(crate) fn subseed(seed: &[u8; N], label: u8) -> [u8; N] {
    let mut mac = HmacSha256::new_from_slice(seed).expect("HMAC-SHA256 accepts any key length");
    mac.update(&[label]);
    mac.finalize().into_bytes().into()
}

/// A node held during leaf-by-leaf tree construction.
#[cfg_attr(feature = "serialization", derive(Serialize, Deserialize))]
#[derive(Clone, Debug)]
pub struct Node {
    pub(crate) node: [u8; N],
    pub(crate) height: u32,
    pub(crate) index: u32,
}

/// A height-bounded stack that lazily produces the root of one Merkle
/// subtree, one merge-or-leaf step at a time.
///
/// Heights are strictly increasing from bottom to top, except momentarily
/// when the two topmost nodes share a height and are about to be merged.
#[cfg_attr(feature = "serialization", derive(Serialize, Deserialize))]
#[derive(Clone, Debug)]
pub struct Stack {
    stack: Vec<Node>,
    height: u32,
    leaf: u32,
    layer: u32,
    tree: u64,
}

impl Stack {
    fn new(height: u32, leaf: u32, layer: u32, tree: u64) -> Self {
        Self {
            stack: Vec::with_capacity(height as usize + 1),
            height,
            leaf,
            layer,
            tree,
        }
    }

    /// Restarts the stack to grow a fresh subtree of `height` from `start`.
    fn initialize(&mut self, start: u32, height: u32) {
        self.leaf = start;
        self.height = height;
        self.stack.clear();
    }

    fn top(&self) -> &Node {
        self.stack.last().expect("stack holds at least one node")
    }

    /// The stack has produced its subtree root.
    fn complete(&self) -> bool {
        self.stack.last().map_or(false, |top| top.height == self.height)
    }

    /// Scheduling weight: the lowest node height held, the target height when
    /// empty, or infinity once the subtree root is complete.
    fn low(&self) -> u32 {
        if self.stack.is_empty() {
            return self.height;
        }
        if self.complete() {
            return u32::MAX;
        }
        self.stack.iter().fold(u32::MAX, |min, n| min.min(n.height))
    }

    /// Merges the two topmost nodes into their parent if they share a height.
    fn merge_top(&mut self, adrs: &mut Adrs, prf: &Prf) -> bool {
        let len = self.stack.len();
        if len < 2 {
            return false;
        }
        let (left, right) = (&self.stack[len - 2], &self.stack[len - 1]);
        if left.height != right.height {
            return false;
        }
        let height = right.height + 1;
        let index = right.index >> 1;
        adrs.set_height(right.height);
        adrs.set_index(index);
        let node = rand_hash(&left.node, &right.node, prf, adrs);
        self.stack.truncate(len - 2);
        self.stack.push(Node { node, height, index });
        true
    }

    /// Derives the WOTS+ key at the next leaf index, compresses it through
    /// the L-tree and pushes the resulting height-0 node.
    fn newleaf(&mut self, key: &PrivKey, parallel: bool) {
        let mut sk = [0u8; WOTS_BYTES];
        let mut pk = [0u8; WOTS_BYTES];
        let mut adrs = Adrs::default();
        adrs.set_layer(self.layer);
        adrs.set_tree(self.tree);
        adrs.set_ots(self.leaf);
        key.wots_sk(&adrs, &mut sk);
        if parallel {
            wots::par_pubkey_from_sk(&sk, &key.pub_prf, &adrs, &mut pk);
        } else {
            wots::pubkey_from_sk(&sk, &key.pub_prf, &adrs, &mut pk);
        }
        sk.zeroize();

        adrs.set_type(AdrsType::LTree);
        adrs.set_ltree(self.leaf);
        let node = wots::ltree(&mut pk, &key.pub_prf, &mut adrs);
        self.stack.push(Node {
            node,
            height: 0,
            index: self.leaf,
        });
        self.leaf += 1;
    }

    /// Performs up to `n` merge-or-leaf steps.
    fn update(&mut self, n: u64, key: &PrivKey) {
        self.update_with(n, key, false);
    }

    /// [`Stack::update`] with the WOTS+ chains of every fresh leaf fanned out
    /// across the rayon pool.
    fn par_update(&mut self, n: u64, key: &PrivKey) {
        self.update_with(n, key, true);
    }

    fn update_with(&mut self, n: u64, key: &PrivKey, parallel: bool) {
        let mut adrs = Adrs::from(AdrsType::HashTree);
        adrs.set_layer(self.layer);
        adrs.set_tree(self.tree);
        for _ in 0..n {
            if self.complete() {
                return;
            }
            if !self.merge_top(&mut adrs, &key.pub_prf) {
                self.newleaf(key, parallel);
            }
        }
    }

    /// Performs up to `n` steps, consuming precomputed subtree roots instead
    /// of deriving leaves. Used by the key-generation driver above the
    /// parallel boundary.
    fn update_from(&mut self, n: u64, key: &PrivKey, ready: &mut VecDeque<Node>) {
        let mut adrs = Adrs::from(AdrsType::HashTree);
        adrs.set_layer(self.layer);
        adrs.set_tree(self.tree);
        for _ in 0..n {
            if self.complete() {
                return;
            }
            if !self.merge_top(&mut adrs, &key.pub_prf) {
                let node = ready.pop_front().expect("a precomputed subtree root is ready");
                self.stack.push(node);
            }
        }
    }
}

/// Private-key bundle: the three seed-keyed PRFs and the cached tree root.
#[cfg_attr(feature = "serialization", derive(Serialize, Deserialize))]
#[derive(Clone, Zeroize)]
pub struct PrivKey {
    pub(crate) wots_prf: Prf,
    pub(crate) msg_prf: Prf,
    pub(crate) pub_prf: Prf,
    pub(crate) root: [u8; N],
}

impl PrivKey {
    /// Derives the WOTS+ private key for the OTS address in `adrs`: a chain
    /// seed from the WOTS PRF, then one secondary PRF output per chain.
    pub(crate) fn wots_sk(&self, adrs: &Adrs, sk: &mut [u8; WOTS_BYTES]) {
        let secondary = Prf::new(self.wots_prf.sum(adrs.as_ref()));
        for (i, chunk) in sk.chunks_exact_mut(N).enumerate() {
            chunk.copy_from_slice(&secondary.sum_int(i as u32));
        }
    }
}

/// An XMSS Merkle tree with incremental authentication-path state.
///
/// After construction and after every [`Merkle::traverse`], `auth[i]` holds
/// the sibling at level `i` of the path from the current leaf to the root,
/// and each row stack is primed to produce the sibling needed at the next
/// `2^i`-aligned boundary.
///
/// Signing mutates the tree; callers must serialize signing on one key.
#[cfg_attr(feature = "serialization", derive(Serialize, Deserialize))]
#[derive(Clone)]
pub struct Merkle {
    pub(crate) leaf: u32,
    pub(crate) height: u32,
    pub(crate) stacks: Vec<Stack>,
    pub(crate) auth: Vec<[u8; N]>,
    pub(crate) key: PrivKey,
    pub(crate) layer: u32,
    pub(crate) tree: u64,
}

impl Merkle {
    /// Builds a tree of height `h` from a 32-byte master seed.
    ///
    /// The WOTS, message and public sub-seeds are derived as
    /// HMAC-SHA256(seed, {0x01}), {0x02} and {0x03}. Construction performs
    /// `O(2^h)` hash work; choose `h` accordingly.
    ///
    /// # Panics
    ///
    /// Panics when `h >= 32`, which the 32-bit leaf counter cannot represent.
    pub fn new(h: u32, seed: &[u8; N]) -> Self {
        Self::with_seeds(h, subseed(seed, 1), subseed(seed, 2), subseed(seed, 3), 0, 0)
    }

    pub(crate) fn with_seeds(
        h: u32,
        wots_seed: [u8; N],
        msg_seed: [u8; N],
        pub_seed: [u8; N],
        layer: u32,
        tree: u64,
    ) -> Self {
        let ncpu = rayon::current_num_threads();
        let mut split = 0u32;
        while (1usize << split) < ncpu {
            split += 1;
        }
        if h <= split {
            split = 0;
        }
        Self::build_with_split(h, wots_seed, msg_seed, pub_seed, layer, tree, split)
    }

    fn build_with_split(
        h: u32,
        wots_seed: [u8; N],
        msg_seed: [u8; N],
        pub_seed: [u8; N],
        layer: u32,
        tree: u64,
        split: u32,
    ) -> Self {
        assert!(h < 32, "tree height must fit the 32-bit leaf counter");
        let mut key = PrivKey {
            wots_prf: Prf::new(wots_seed),
            msg_prf: Prf::new(msg_seed),
            pub_prf: Prf::new(pub_seed),
            root: [0u8; N],
        };

        // Workers build the 2^split - 1 rightmost subtrees of height
        // h - split; the driver consumes their roots in order once its own
        // leaf counter crosses the boundary.
        let mut ready: VecDeque<Node> = (1..1u32 << split)
            .into_par_iter()
            .map(|i| {
                let mut s = Stack::new(h - split, i << (h - split), layer, tree);
                s.update((1u64 << (h - split + 1)) - 1, &key);
                s.top().clone()
            })
            .collect::<Vec<_>>()
            .into();

        let mut stacks = Vec::with_capacity(h as usize);
        let mut auth = Vec::with_capacity(h as usize);
        let mut driver = Stack::new(h, 0, layer, tree);
        for i in 0..h {
            driver.update(1, &key);
            // The first finished left-subtree root of height i seeds the row
            // stack; the second becomes the initial auth node.
            let mut row = Stack::new(i, 1 << i, layer, tree);
            row.stack.push(driver.top().clone());
            stacks.push(row);
            if i < h - split {
                driver.update((1u64 << (i + 1)) - 1, &key);
            } else {
                driver.update_from((1u64 << (i - (h - split) + 1)) - 1, &key, &mut ready);
            }
            auth.push(driver.top().node);
        }
        driver.update(1, &key);
        key.root = driver.top().node;

        Merkle {
            leaf: 0,
            height: h,
            stacks,
            auth,
            key,
            layer,
            tree,
        }
    }

    /// Next unused one-time leaf index.
    pub fn leaf(&self) -> u32 {
        self.leaf
    }

    /// Tree height.
    pub fn height(&self) -> u32 {
        self.height
    }

    /// The 65-byte public key: `[1 height][32 root][32 public seed]`.
    pub fn public_key(&self) -> [u8; XMSS_PK_BYTES] {
        let mut pk = [0u8; XMSS_PK_BYTES];
        pk[0] = self.height as u8;
        pk[1..1 + N].copy_from_slice(&self.key.root);
        pk[1 + N..].copy_from_slice(self.key.pub_prf.seed());
        pk
    }

    /// Swaps in the freshly completed sibling for every row whose boundary
    /// the next leaf crosses, and restarts that row's stack at the subtree
    /// the leaf after that will need.
    fn refresh_auth(&mut self) {
        for h in 0..self.height {
            let pow = 1u32 << h;
            if (self.leaf + 1) & (pow - 1) == 0 {
                self.auth[h as usize] = self.stacks[h as usize].top().node;
                let start = ((self.leaf + 1) + pow) ^ pow;
                self.stacks[h as usize].initialize(start, h);
            }
        }
    }

    /// Spends 2h-1 update steps on whichever row stacks are furthest behind,
    /// lowest row first on ties.
    fn build(&mut self) {
        for _ in 0..(2 * self.height).saturating_sub(1) {
            let mut min = u32::MAX;
            let mut focus = 0usize;
            for h in 0..self.height as usize {
                let low = self.stacks[h].low();
                if low < min {
                    min = low;
                    focus = h;
                }
            }
            self.stacks[focus].par_update(1, &self.key);
        }
    }

    /// Advances the authentication path by one leaf.
    pub fn traverse(&mut self) {
        self.refresh_auth();
        self.build();
        self.leaf += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::generate_seed;

    #[test]
    fn split_build_matches_sequential_build() {
        let wots_seed = generate_seed();
        let msg_seed = generate_seed();
        let pub_seed = generate_seed();

        let sequential = Merkle::build_with_split(5, wots_seed, msg_seed, pub_seed, 0, 0, 0);
        for split in 1..=3 {
            let parallel =
                Merkle::build_with_split(5, wots_seed, msg_seed, pub_seed, 0, 0, split);
            assert_eq!(sequential.key.root, parallel.key.root, "split {split}");
            assert_eq!(sequential.auth, parallel.auth, "split {split}");
        }
    }

    #[test]
    fn subseeds_are_domain_separated() {
        let seed = generate_seed();
        let a = subseed(&seed, 1);
        let b = subseed(&seed, 2);
        let c = subseed(&seed, 3);
        assert_ne!(a, b);
        assert_ne!(b, c);
        assert_eq!(a, subseed(&seed, 1));
    }

    #[test]
    fn traverse_keeps_row_stacks_primed() {
        let mut merkle = Merkle::new(3, &generate_seed());
        for _ in 0..(1 << 3) - 1 {
            merkle.traverse();
        }
        assert_eq!(merkle.leaf(), 7);
    }

    #[cfg(feature = "serialization")]
    #[test]
    fn merkle_round_trips_through_json() {
        let merkle = Merkle::new(4, &generate_seed());
        let json = serde_json::to_string(&merkle).unwrap();
        let restored: Merkle = serde_json::from_str(&json).unwrap();
        assert_eq!(merkle.key.root, restored.key.root);
        assert_eq!(merkle.auth, restored.auth);
        assert_eq!(merkle.leaf, restored.leaf);
    }
}
