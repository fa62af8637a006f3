//! Profile identifier synthesis.

use rand::Rng;
use xxhash_rust::xxh3::xxh3_64;

const PROFILE_KEY_ALPHABET: &[u8] = b"abcdefghijklmnopqrstuvwxyz";

/// Length of the random key a profile id is hashed from.
pub const PROFILE_KEY_LEN: usize = 5;

/// Generate a random lowercase ASCII key of [`PROFILE_KEY_LEN`] letters.
pub fn random_profile_key<R: Rng>(rng: &mut R) -> String {
    (0..PROFILE_KEY_LEN)
        .map(|_| PROFILE_KEY_ALPHABET[rng.gen_range(0..PROFILE_KEY_ALPHABET.len())] as char)
        .collect()
}

/// Hash a key into a signed 64-bit profile id.
///
/// The key is lowercased first, so `"AbC"` and `"abc"` map to the same id.
/// The 64-bit hash is reinterpreted as `i64`, so ids are negative about half
/// of the time.
pub fn profile_id(key: &str) -> i64 {
    xxh3_64(key.to_lowercase().as_bytes()) as i64
}

/// Generate a random key and hash it.
pub fn random_profile_id<R: Rng>(rng: &mut R) -> i64 {
    profile_id(&random_profile_key(rng))
}
