use crate::params::{
    ADRS_OFFSET_CHAIN, ADRS_OFFSET_HASH, ADRS_OFFSET_HEIGHT, ADRS_OFFSET_INDEX,
    ADRS_OFFSET_KEY_AND_MASK, ADRS_OFFSET_LAYER, ADRS_OFFSET_LTREE, ADRS_OFFSET_OTS,
    ADRS_OFFSET_TREE, ADRS_OFFSET_TYPE,
};
use crate::utils::{set_u32_at, set_u64_at};

/// The three address types used to domain-separate hash calls.
/// The value is written into the `type` field of an [`Adrs`].
#[derive(Copy, Clone, Debug)]
#[repr(u32)]
pub enum AdrsType {
    /// Type 0: a position inside one WOTS+ chain.
    Ots = 0,
    /// Type 1: L-tree compression of a WOTS+ public key.
    LTree = 1,
    /// Type 2: combination of two Merkle tree nodes.
    HashTree = 2,
}

/// A 32-byte structured hash address (ADRS).
///
/// The address carries the layer, the 64-bit tree index, the address type and
/// three type-dependent fields (OTS/chain/hash for chains, L-tree/height/index
/// for leaf compression, pad/height/index for tree nodes), followed by the
/// `keyAndMask` word set transiently around every keyed hash call. All fields
/// are big-endian. Addresses are plain values: workers receive their own copy
/// so concurrent producers never race on one.
#[derive(Copy, Clone, Default, Debug)]
pub struct Adrs([u8; 32]);

impl AsRef<[u8]> for Adrs {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl From<AdrsType> for Adrs {
    fn from(adrs_type: AdrsType) -> Self {
        let mut adrs = Self([0; 32]);
        adrs.set_type(adrs_type);
        adrs
    }
}

impl Adrs {
    /// Specify which hyper-tree layer we are working on.
    pub fn set_layer(&mut self, layer: u32) {
        set_u32_at(&mut self.0, layer, ADRS_OFFSET_LAYER);
    }

    /// Specify which tree within the layer we are working on.
    pub fn set_tree(&mut self, tree: u64) {
        set_u64_at(&mut self.0, tree, ADRS_OFFSET_TREE);
    }

    /// Specify what kind of hash this address will key, so unrelated hash
    /// invocations never share an address.
    pub fn set_type(&mut self, adrs_type: AdrsType) {
        set_u32_at(&mut self.0, adrs_type as u32, ADRS_OFFSET_TYPE);
    }

    /// Specify which OTS key pair (Merkle leaf) we are working on.
    pub fn set_ots(&mut self, ots: u32) {
        set_u32_at(&mut self.0, ots, ADRS_OFFSET_OTS);
    }

    /// Specify which WOTS+ chain within the OTS key we are working on.
    pub fn set_chain(&mut self, chain: u32) {
        set_u32_at(&mut self.0, chain, ADRS_OFFSET_CHAIN);
    }

    /// Specify the position within the WOTS+ chain.
    pub fn set_hash_addr(&mut self, hash: u32) {
        set_u32_at(&mut self.0, hash, ADRS_OFFSET_HASH);
    }

    /// Specify which leaf an L-tree compresses.
    pub fn set_ltree(&mut self, ltree: u32) {
        set_u32_at(&mut self.0, ltree, ADRS_OFFSET_LTREE);
    }

    /// Specify the node height within the L-tree or hash tree.
    pub fn set_height(&mut self, height: u32) {
        set_u32_at(&mut self.0, height, ADRS_OFFSET_HEIGHT);
    }

    /// Specify the node index within its row.
    pub fn set_index(&mut self, index: u32) {
        set_u32_at(&mut self.0, index, ADRS_OFFSET_INDEX);
    }

    /// Select which of the key and bitmask outputs a PRF call derives.
    pub fn set_key_and_mask(&mut self, key_and_mask: u32) {
        set_u32_at(&mut self.0, key_and_mask, ADRS_OFFSET_KEY_AND_MASK);
    }
}
