use crate::params::N;
use rand::rngs::OsRng;
use rand::RngCore;

/// Generates a fresh 32-byte seed from the operating-system RNG.
pub fn generate_seed() -> [u8; N] {
    let mut seed = [0u8; N];
    OsRng.fill_bytes(&mut seed);
    seed
}

pub(crate) fn u32_to_bytes(value: u32) -> [u8; 4] {
    value.to_be_bytes()
}

pub(crate) fn u64_to_bytes(value: u64) -> [u8; 8] {
    value.to_be_bytes()
}

pub(crate) fn bytes_to_u32(bytes: &[u8]) -> u32 {
    u32::from_be_bytes(bytes.try_into().expect("incorrect slice length"))
}

pub(crate) fn bytes_to_u64(bytes: &[u8]) -> u64 {
    u64::from_be_bytes(bytes.try_into().expect("incorrect slice length"))
}

pub(crate) fn set_u32_at(array: &mut [u8], value: u32, start_index: usize) {
    array[start_index..start_index + 4].copy_from_slice(&u32_to_bytes(value));
}

pub(crate) fn set_u64_at(array: &mut [u8], value: u64, start_index: usize) {
    array[start_index..start_index + 8].copy_from_slice(&u64_to_bytes(value));
}

/// XORs the first `N` bytes of `a` and `b` into `out`.
pub(crate) fn xor_n(out: &mut [u8; N], a: &[u8], b: &[u8]) {
    for i in 0..N {
        out[i] = a[i] ^ b[i];
    }
}
