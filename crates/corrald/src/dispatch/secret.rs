//! Random secrets issued at registration.

use rand::Rng;
use rand::seq::SliceRandom;

/// Characters a generated secret is drawn from.
pub const SECRET_ALPHABET: &[u8] =
    b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789_";

/// Length of a generated secret.
pub const SECRET_LENGTH: usize = 10;

/// Draws a [`SECRET_LENGTH`]-character secret from [`SECRET_ALPHABET`].
pub fn generate_secret<R: Rng + ?Sized>(rng: &mut R) -> String {
    (0..SECRET_LENGTH)
        .filter_map(|_| SECRET_ALPHABET.choose(&mut *rng))
        .map(|byte| char::from(*byte))
        .collect()
}
