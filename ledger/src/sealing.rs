//! # Sealing — Chained Digests with a Difficulty Target
//!
//! Every ledger entry carries a SHA3-256 digest computed over the previous
//! entry's digest and its own fields, plus a salt chosen so the digest has
//! a configured number of leading zero bits. This is single-writer
//! proof-of-work: it does not arbitrate between writers (there is exactly
//! one), it makes retroactive edits expensive. Forge one historical entry
//! and every entry after it needs a fresh salt search.
//!
//! The difficulty check is bit-granular. 12 bits means the first hex digit
//! triple must be zero; 13 means that plus the top bit of the fourth digit.
//! Checking at byte or hex-digit granularity would silently round the
//! difficulty down, so don't.

use rand::Rng;
use sha3::{Digest, Sha3_256};

use crate::config::{DIGEST_LENGTH, MAX_SALT};

/// A sealed digest: SHA3-256 output.
pub type Seal = [u8; DIGEST_LENGTH];

/// Computes the chained digest of `fields` on top of `prev_digest`.
///
/// The preimage is the previous digest's raw bytes followed by the UTF-8
/// encoding of each field in order, with no separators — the fields are
/// whitespace-free tokens by construction (the log format splits on
/// spaces), so no framing ambiguity arises.
pub fn seal<'a>(prev_digest: &[u8], fields: impl IntoIterator<Item = &'a str>) -> Seal {
    let mut hasher = Sha3_256::new();
    hasher.update(prev_digest);
    for field in fields {
        hasher.update(field.as_bytes());
    }
    hasher.finalize().into()
}

/// Counts the leading zero bits of a digest.
pub fn leading_zero_bits(digest: &[u8]) -> u32 {
    let mut bits = 0;
    for byte in digest {
        if *byte == 0 {
            bits += 8;
        } else {
            bits += byte.leading_zeros();
            break;
        }
    }
    bits
}

/// `true` if `digest` satisfies a `difficulty`-bit leading-zero target.
pub fn meets_difficulty(digest: &[u8], difficulty: u32) -> bool {
    leading_zero_bits(digest) >= difficulty
}

/// Searches for a salt that seals `fields` under the difficulty target.
///
/// Rejection sampling: draw a random decimal salt in `[1, MAX_SALT]`,
/// seal `[salt] ++ fields`, accept the first digest that meets the target.
/// Expected work is `2^difficulty` hashes — about 4096 at the default 12
/// bits, comfortably under a millisecond of SHA3.
///
/// Returns the winning salt (as the decimal string that was hashed) and
/// the sealed digest.
pub fn find_salt<'a>(
    prev_digest: &[u8],
    fields: impl IntoIterator<Item = &'a str> + Clone,
    difficulty: u32,
) -> (String, Seal) {
    let mut rng = rand::thread_rng();
    loop {
        let salt = rng.gen_range(1..=MAX_SALT).to_string();
        let mut salted_fields = vec![salt.as_str()];
        for field in fields.clone() {
            salted_fields.push(field);
        }
        let digest = seal(prev_digest, salted_fields);
        if meets_difficulty(&digest, difficulty) {
            return (salt, digest);
        }
    }
}
