//! # Ed25519 Helpers
//!
//! Thin wrappers over `ed25519-dalek` for the two places the ledger touches
//! signatures: alias linking (sign a challenge proving you hold a key
//! registered on the account) and key registration itself. Keys and
//! signatures travel as lowercase hex so they fit the one-token-per-field
//! log format.

use ed25519_dalek::{Signature, Signer, SigningKey, Verifier, VerifyingKey};
use rand::rngs::OsRng;

use crate::errors::{LedgerError, Result};

/// Generates a fresh Ed25519 signing key from the OS RNG.
pub fn generate_signing_key() -> SigningKey {
    SigningKey::generate(&mut OsRng)
}

/// Hex-encodes a verification key for the ledger and for chat replies.
pub fn encode_key(key: &VerifyingKey) -> String {
    hex::encode(key.as_bytes())
}

/// Decodes a hex-encoded verification key.
pub fn decode_key(hex_key: &str) -> Result<VerifyingKey> {
    let bytes = hex::decode(hex_key).map_err(|_| LedgerError::InvalidSignature)?;
    let bytes: [u8; 32] = bytes.try_into().map_err(|_| LedgerError::InvalidSignature)?;
    VerifyingKey::from_bytes(&bytes).map_err(|_| LedgerError::InvalidSignature)
}

/// Signs `message` and returns the signature as hex.
pub fn sign_message(key: &SigningKey, message: &str) -> String {
    hex::encode(key.sign(message.as_bytes()).to_bytes())
}

/// Decodes a hex-encoded signature.
pub fn decode_signature(hex_sig: &str) -> Result<Signature> {
    let bytes = hex::decode(hex_sig).map_err(|_| LedgerError::InvalidSignature)?;
    Signature::from_slice(&bytes).map_err(|_| LedgerError::InvalidSignature)
}

/// Verifies `signature` over `message` against any of `keys`.
///
/// Succeeds if at least one registered key accepts the signature; an
/// account may hold several keys and the caller does not say which one it
/// used.
pub fn verify_with_any(keys: &[VerifyingKey], message: &str, signature: &Signature) -> Result<()> {
    for key in keys {
        if key.verify(message.as_bytes(), signature).is_ok() {
            return Ok(());
        }
    }
    Err(LedgerError::InvalidSignature)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sign_and_verify_round_trips() {
        let key = generate_signing_key();
        let sig = sign_message(&key, "link discord/42");
        let sig = decode_signature(&sig).unwrap();
        verify_with_any(&[key.verifying_key()], "link discord/42", &sig).unwrap();
    }

    #[test]
    fn wrong_message_is_rejected() {
        let key = generate_signing_key();
        let sig = decode_signature(&sign_message(&key, "link alice")).unwrap();
        let result = verify_with_any(&[key.verifying_key()], "link mallory", &sig);
        assert!(matches!(result, Err(LedgerError::InvalidSignature)));
    }

    #[test]
    fn any_registered_key_suffices() {
        let old = generate_signing_key();
        let new = generate_signing_key();
        let sig = decode_signature(&sign_message(&new, "challenge")).unwrap();
        verify_with_any(
            &[old.verifying_key(), new.verifying_key()],
            "challenge",
            &sig,
        )
        .unwrap();
    }

    #[test]
    fn key_hex_round_trips() {
        let key = generate_signing_key().verifying_key();
        let decoded = decode_key(&encode_key(&key)).unwrap();
        assert_eq!(decoded, key);
    }

    #[test]
    fn malformed_hex_is_an_invalid_signature() {
        assert!(matches!(
            decode_key("not-hex"),
            Err(LedgerError::InvalidSignature)
        ));
        assert!(matches!(
            decode_signature("abcd"),
            Err(LedgerError::InvalidSignature)
        ));
    }
}
