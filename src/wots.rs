//! Winternitz one-time signatures (WOTS+) over 67 hash chains, and the L-tree
//! compression of a chain public key into a single Merkle leaf.
//!
//! A private key signs exactly one 32-byte digest. The digest is expanded
//! into 64 base-16 digits plus a 3-digit checksum; chain `i` of a signature
//! runs `digit[i]` steps from the private key, and verification runs the
//! remaining `w-1-digit[i]` steps to land back on the public key. Every chain
//! is independent, so signing and recovery fan the chains out across the
//! rayon pool with a private copy of the address per worker.

use rayon::prelude::*;

use crate::hash::{hash_f, rand_hash, Prf};
use crate::params::{N, WOTS_BYTES, WOTS_LEN, WOTS_LEN1, WOTS_W};
use crate::utils::xor_n;
use crate::wots::adrs::Adrs;

pub mod adrs;

/// Advances one chain in place by `steps` positions starting at `start`.
///
/// Each step derives a key and a bitmask from the PRF under the current
/// address, XORs the mask into the running value and applies `F`.
pub(crate) fn chain(inout: &mut [u8], start: u8, steps: u8, prf: &Prf, adrs: &mut Adrs) {
    for i in start..start + steps {
        adrs.set_hash_addr(u32::from(i));
        adrs.set_key_and_mask(0);
        let key = prf.sum(adrs.as_ref());
        adrs.set_key_and_mask(1);
        let bm = prf.sum(adrs.as_ref());

        let mut masked = [0u8; N];
        xor_n(&mut masked, &inout[..N], &bm);
        inout[..N].copy_from_slice(&hash_f(&key, &masked));
    }
}

/// Splits bytes into base-16 digits, high nibble first.
fn base16(x: &[u8], out: &mut [u8]) {
    for (i, digit) in out.iter_mut().enumerate() {
        *digit = if i & 1 == 0 {
            x[i >> 1] >> 4
        } else {
            x[i >> 1] & 0x0f
        };
    }
}

/// Expands a digest into the 67 per-chain step counts: 64 message digits
/// followed by the 3 digits of the left-shifted 16-bit checksum.
fn chain_lengths(hm: &[u8; N]) -> [u8; WOTS_LEN] {
    let mut lengths = [0u8; WOTS_LEN];
    base16(hm, &mut lengths[..WOTS_LEN1]);

    let mut csum: u16 = 0;
    for &digit in &lengths[..WOTS_LEN1] {
        csum += (WOTS_W - 1) as u16 - u16::from(digit);
    }
    // Align the 12 checksum bits to the top of the 16-bit value.
    csum <<= 4;
    let csum_bytes = csum.to_be_bytes();
    base16(&csum_bytes, &mut lengths[WOTS_LEN1..]);
    lengths
}

/// Computes the chain public key from a private key, one chain at a time.
pub(crate) fn pubkey_from_sk(sk: &[u8], prf: &Prf, adrs: &Adrs, pk: &mut [u8]) {
    let mut a = *adrs;
    for i in 0..WOTS_LEN {
        let chunk = i * N..(i + 1) * N;
        pk[chunk.clone()].copy_from_slice(&sk[chunk.clone()]);
        a.set_chain(i as u32);
        chain(&mut pk[chunk], 0, (WOTS_W - 1) as u8, prf, &mut a);
    }
}

/// Same as [`pubkey_from_sk`] with the chains fanned out across the rayon
/// pool.
pub(crate) fn par_pubkey_from_sk(sk: &[u8], prf: &Prf, adrs: &Adrs, pk: &mut [u8]) {
    pk.par_chunks_exact_mut(N)
        .zip(sk.par_chunks_exact(N))
        .enumerate()
        .for_each(|(i, (out, sk_i))| {
            let mut a = *adrs;
            a.set_chain(i as u32);
            out.copy_from_slice(sk_i);
            chain(out, 0, (WOTS_W - 1) as u8, prf, &mut a);
        });
}

/// Signs an n-byte digest: chain `i` runs `digit[i]` steps from the private
/// key.
pub(crate) fn sign(sk: &[u8], hm: &[u8; N], prf: &Prf, adrs: &Adrs) -> [u8; WOTS_BYTES] {
    let steps = chain_lengths(hm);
    let mut sig = [0u8; WOTS_BYTES];
    sig.par_chunks_exact_mut(N)
        .zip(sk.par_chunks_exact(N))
        .enumerate()
        .for_each(|(i, (out, sk_i))| {
            let mut a = *adrs;
            a.set_chain(i as u32);
            out.copy_from_slice(sk_i);
            chain(out, 0, steps[i], prf, &mut a);
        });
    sig
}

/// Recovers the chain public key from a signature by running the remaining
/// `w-1-digit[i]` steps of every chain.
pub(crate) fn pk_from_sig(sig: &[u8], hm: &[u8; N], prf: &Prf, adrs: &Adrs) -> [u8; WOTS_BYTES] {
    let steps = chain_lengths(hm);
    let mut pk = [0u8; WOTS_BYTES];
    pk.par_chunks_exact_mut(N)
        .zip(sig.par_chunks_exact(N))
        .enumerate()
        .for_each(|(i, (out, sig_i))| {
            let mut a = *adrs;
            a.set_chain(i as u32);
            out.copy_from_slice(sig_i);
            chain(out, steps[i], (WOTS_W - 1) as u8 - steps[i], prf, &mut a);
        });
    pk
}

/// Compresses the `WOTS_LEN` chain public keys into one n-byte leaf with an
/// unbalanced binary reduction: adjacent slots are combined pairwise, an odd
/// trailing element is promoted unchanged, and the row length rounds up until
/// a single node remains. The buffer contents are destroyed.
pub(crate) fn ltree(pk: &mut [u8], prf: &Prf, adrs: &mut Adrs) -> [u8; N] {
    adrs.set_height(0);
    let mut height = 0u32;
    let mut l = WOTS_LEN;
    while l > 1 {
        for i in 0..l >> 1 {
            adrs.set_index(i as u32);
            let parent = rand_hash(
                &pk[2 * i * N..(2 * i + 1) * N],
                &pk[(2 * i + 1) * N..(2 * i + 2) * N],
                prf,
                adrs,
            );
            pk[i * N..(i + 1) * N].copy_from_slice(&parent);
        }
        if l & 1 == 1 {
            pk.copy_within((l - 1) * N..l * N, (l >> 1) * N);
        }
        l = (l >> 1) + (l & 1);
        height += 1;
        adrs.set_height(height);
    }
    let mut leaf = [0u8; N];
    leaf.copy_from_slice(&pk[..N]);
    leaf
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::generate_seed;
    use rand::rngs::OsRng;
    use rand::RngCore;

    #[test]
    fn checksum_digits_of_zero_digest() {
        // All 64 digits zero: csum = 64 * 15 = 960, shifted left 4 bits is
        // 0x3c00, whose top three nibbles are 3, 12, 0.
        let lengths = chain_lengths(&[0u8; N]);
        assert_eq!(&lengths[..WOTS_LEN1], &[0u8; WOTS_LEN1]);
        assert_eq!(&lengths[WOTS_LEN1..], &[3, 12, 0]);
    }

    #[test]
    fn base16_reads_high_nibble_first() {
        let mut out = [0u8; 4];
        base16(&[0xab, 0xcd], &mut out);
        assert_eq!(out, [0xa, 0xb, 0xc, 0xd]);
    }

    #[test]
    fn signature_recovers_the_public_key() {
        let prf = Prf::new(generate_seed());
        let adrs = Adrs::default();

        let mut sk = [0u8; WOTS_BYTES];
        OsRng.fill_bytes(&mut sk);
        let mut pk = [0u8; WOTS_BYTES];
        par_pubkey_from_sk(&sk, &prf, &adrs, &mut pk);

        let hm = generate_seed();
        let sig = sign(&sk, &hm, &prf, &adrs);
        assert_eq!(pk_from_sig(&sig, &hm, &prf, &adrs)[..], pk[..]);

        // Any flipped bit must break the recovery.
        let mut bad = sig;
        bad[0] ^= 1;
        assert_ne!(pk_from_sig(&bad, &hm, &prf, &adrs)[..], pk[..]);

        let mut other = hm;
        other[31] ^= 0x10;
        assert_ne!(pk_from_sig(&sig, &other, &prf, &adrs)[..], pk[..]);
    }

    #[test]
    fn parallel_and_sequential_chains_agree() {
        let prf = Prf::new(generate_seed());
        let adrs = Adrs::default();

        let mut sk = [0u8; WOTS_BYTES];
        OsRng.fill_bytes(&mut sk);
        let mut pk_seq = [0u8; WOTS_BYTES];
        let mut pk_par = [0u8; WOTS_BYTES];
        pubkey_from_sk(&sk, &prf, &adrs, &mut pk_seq);
        par_pubkey_from_sk(&sk, &prf, &adrs, &mut pk_par);
        assert_eq!(pk_seq[..], pk_par[..]);
    }

    #[test]
    fn ltree_consumes_its_input_deterministically() {
        let prf = Prf::new(generate_seed());
        let mut pk = [0u8; WOTS_BYTES];
        OsRng.fill_bytes(&mut pk);
        let mut copy = pk;

        let mut adrs = Adrs::from(adrs::AdrsType::LTree);
        let leaf = ltree(&mut pk, &prf, &mut adrs);
        let mut adrs2 = Adrs::from(adrs::AdrsType::LTree);
        assert_eq!(leaf, ltree(&mut copy, &prf, &mut adrs2));
    }
}
