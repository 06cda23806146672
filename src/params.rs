//! Scheme constants for the SHA-256 parameter set and the byte layout of the
//! 32-byte hash address.

/// Hash output size in bytes.
pub const N: usize = 32;

/// Winternitz parameter: every chain digit is in `0..W`.
pub const WOTS_W: usize = 16;

/// Number of base-`W` digits covering the 256-bit message digest.
pub const WOTS_LEN1: usize = 64;

/// Number of base-`W` digits covering the checksum.
pub const WOTS_LEN2: usize = 3;

/// Total number of WOTS+ chains per one-time key.
pub const WOTS_LEN: usize = WOTS_LEN1 + WOTS_LEN2;

/// Flat byte size of a WOTS+ key or signature: `WOTS_LEN` chains of `N` bytes.
pub const WOTS_BYTES: usize = WOTS_LEN * N;

/// Byte size of an XMSS or XMSS^MT public key: header byte, root, public seed.
pub const XMSS_PK_BYTES: usize = 1 + N + N;

// ADRS field offsets inside the 32-byte address. All fields are big-endian;
// the tree address is 64 bits, everything else 32.
pub const ADRS_OFFSET_LAYER: usize = 0;
pub const ADRS_OFFSET_TREE: usize = 4;
pub const ADRS_OFFSET_TYPE: usize = 12;
pub const ADRS_OFFSET_OTS: usize = 16;
pub const ADRS_OFFSET_CHAIN: usize = 20;
pub const ADRS_OFFSET_HASH: usize = 24;
pub const ADRS_OFFSET_LTREE: usize = 16;
pub const ADRS_OFFSET_HEIGHT: usize = 20;
pub const ADRS_OFFSET_INDEX: usize = 24;
pub const ADRS_OFFSET_KEY_AND_MASK: usize = 28;

/// Byte size of an XMSS signature for a tree of height `h`:
/// `[4 idx][32 seed][32 r][wots_sig][h auth nodes]`.
pub const fn xmss_sig_bytes(h: u32) -> usize {
    4 + N + N + WOTS_BYTES + h as usize * N
}

/// Byte size of an XMSS^MT signature for total height `h` over `d` layers:
/// `[8 idx][32 r]` followed by `d` per-layer `(wots_sig || auth)` blocks.
pub const fn xmss_mt_sig_bytes(h: u32, d: u32) -> usize {
    8 + N + (WOTS_LEN + (h / d) as usize) * N * d as usize
}
