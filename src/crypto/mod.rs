//! Opaque stand-ins for the service's cryptography.
//!
//! The backend only needs the input/output contract: a password can be
//! checked through a challenge/proof exchange, and key material is an
//! opaque armored blob. Neither is real SRP or OpenPGP.

pub mod keys;
pub mod srp;

use rand::rngs::OsRng;
use rand::RngCore;

/// `len` bytes from the operating system RNG.
pub(crate) fn random_bytes(len: usize) -> Vec<u8> {
    let mut out = vec![0u8; len];
    OsRng.fill_bytes(&mut out);
    out
}
