//! # XMSS: stateful hash-based signatures over SHA-256
//!
//! This crate implements the eXtended Merkle Signature Scheme in its
//! single-tree ([`Merkle`]) and multi-tree ([`PrivKeyMT`], XMSS^MT) variants,
//! built from the WOTS+ one-time-signature primitive, L-tree leaf compression
//! and Merkle authentication trees with incremental BDS-style traversal.
//! Security reduces to the second-preimage resistance of SHA-256, so the
//! scheme remains sound against quantum adversaries. Signatures are opaque
//! byte strings meant to be embedded in higher-level systems.
//!
//! A key of height `h` signs at most `2^h` messages. Key generation costs
//! `O(2^h)` hash work (fanned out over the rayon pool); each signature then
//! advances the authentication path in `O(h)` amortized work.
//!
//! ## Statefulness
//!
//! Signing **mutates the key**: every signature consumes one leaf, and the
//! leaf counter advances only after the signature bytes are assembled.
//! Reusing a leaf leaks the WOTS+ private key, so the counter never moves
//! backwards. Persist the key after signing, never sign with a stale copy,
//! and serialize concurrent signers on one key.
//!
//! ## Example
//!
//! ```
//! use xmss::{generate_seed, verify, Merkle};
//!
//! let seed = generate_seed();
//! let mut merkle = Merkle::new(2, &seed);
//! let sig = merkle.sign(b"hello").unwrap();
//! assert!(verify(&sig, b"hello", &merkle.public_key()));
//! ```
//!
//! With the default `serialization` feature, every stateful type derives
//! serde traits; a key round-tripped through any format produces the same
//! signatures, bit for bit, as an uninterrupted one.

pub mod errors;
pub mod hash;
pub mod merkle;
pub mod params;
pub mod utils;
pub mod wots;
pub mod xmss;
pub mod xmss_mt;

pub use errors::{Error, Result};
pub use merkle::Merkle;
pub use utils::generate_seed;
pub use xmss::verify;
pub use xmss_mt::{verify_mt, PrivKeyMT, PublicKeyMT};
