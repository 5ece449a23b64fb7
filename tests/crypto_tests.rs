//! Integration tests for the pva crypto module.

use proptest::prelude::*;
use pva::crypto::kdf::{Argon2Params, SALT_LEN};
use pva::crypto::keypair::WRAPPED_KEY_LEN;
use pva::crypto::{
    decrypt, derive_master_key_with_params, encrypt, generate_salt, unwrap_key, wrap_key, KeyPair,
    PrivateKey, PublicKey, SymmetricKey,
};
use pva::errors::PvaError;

/// Cheapest parameters the KDF accepts; keeps the suite fast.
fn fast_params() -> Argon2Params {
    Argon2Params {
        memory_kib: 8_192,
        iterations: 1,
        parallelism: 1,
    }
}

// ---------------------------------------------------------------------------
// AEAD
// ---------------------------------------------------------------------------

#[test]
fn encrypt_decrypt_roundtrip() {
    let key = [0xABu8; 32];
    let plaintext = b"correct horse battery staple";

    let ciphertext = encrypt(&key, plaintext, b"ctx").expect("encrypt should succeed");

    // 12-byte nonce + 16-byte tag.
    assert_eq!(ciphertext.len(), plaintext.len() + 28);

    let recovered = decrypt(&key, &ciphertext, b"ctx").expect("decrypt should succeed");
    assert_eq!(recovered.as_slice(), plaintext);
}

#[test]
fn encrypt_produces_different_ciphertext_each_time() {
    let key = [0xCDu8; 32];

    let ct1 = encrypt(&key, b"same", b"").unwrap();
    let ct2 = encrypt(&key, b"same", b"").unwrap();

    assert_ne!(ct1, ct2, "fresh nonce per call");
}

#[test]
fn decrypt_with_wrong_key_fails() {
    let ciphertext = encrypt(&[0x01u8; 32], b"secret", b"").unwrap();

    let err = decrypt(&[0x02u8; 32], &ciphertext, b"").unwrap_err();
    assert!(matches!(err, PvaError::DecryptionFailed));
}

#[test]
fn decrypt_with_wrong_aad_fails() {
    let key = [0x11u8; 32];
    let ciphertext = encrypt(&key, b"secret", b"pva:password:v1:1").unwrap();

    let err = decrypt(&key, &ciphertext, b"pva:password:v1:2").unwrap_err();
    assert!(matches!(err, PvaError::DecryptionFailed));
}

#[test]
fn tampered_ciphertext_fails() {
    let key = [0x22u8; 32];
    let mut ciphertext = encrypt(&key, b"secret", b"").unwrap();
    let last = ciphertext.len() - 1;
    ciphertext[last] ^= 0x01;

    assert!(matches!(
        decrypt(&key, &ciphertext, b""),
        Err(PvaError::DecryptionFailed)
    ));
}

#[test]
fn truncated_input_fails_cleanly() {
    let key = [0x33u8; 32];
    assert!(matches!(
        decrypt(&key, &[0u8; 27], b""),
        Err(PvaError::DecryptionFailed)
    ));
    assert!(matches!(
        decrypt(&key, &[], b""),
        Err(PvaError::DecryptionFailed)
    ));
}

#[test]
fn empty_plaintext_roundtrips() {
    let key = [0x44u8; 32];
    let ciphertext = encrypt(&key, b"", b"aad").unwrap();
    assert_eq!(ciphertext.len(), 28);
    assert!(decrypt(&key, &ciphertext, b"aad").unwrap().is_empty());
}

// ---------------------------------------------------------------------------
// Key derivation
// ---------------------------------------------------------------------------

#[test]
fn same_password_and_salt_give_same_key() {
    let salt = generate_salt();
    let a = derive_master_key_with_params(b"hunter22", &salt, &fast_params()).unwrap();
    let b = derive_master_key_with_params(b"hunter22", &salt, &fast_params()).unwrap();
    assert_eq!(a.as_bytes(), b.as_bytes());
}

#[test]
fn different_salt_gives_different_key() {
    let a = derive_master_key_with_params(b"hunter22", &[1u8; SALT_LEN], &fast_params()).unwrap();
    let b = derive_master_key_with_params(b"hunter22", &[2u8; SALT_LEN], &fast_params()).unwrap();
    assert_ne!(a.as_bytes(), b.as_bytes());
}

#[test]
fn different_password_gives_different_key() {
    let salt = [7u8; SALT_LEN];
    let a = derive_master_key_with_params(b"hunter22", &salt, &fast_params()).unwrap();
    let b = derive_master_key_with_params(b"hunter23", &salt, &fast_params()).unwrap();
    assert_ne!(a.as_bytes(), b.as_bytes());
}

#[test]
fn generated_salts_are_unique() {
    assert_ne!(generate_salt(), generate_salt());
}

#[test]
fn weak_params_are_rejected() {
    let weak = Argon2Params {
        memory_kib: 1_024,
        ..fast_params()
    };
    assert!(weak.validate().is_err());
    assert!(derive_master_key_with_params(b"pw", &[0u8; SALT_LEN], &weak).is_err());

    let no_lanes = Argon2Params {
        parallelism: 0,
        ..fast_params()
    };
    assert!(no_lanes.validate().is_err());
}

// ---------------------------------------------------------------------------
// Key wrapping
// ---------------------------------------------------------------------------

#[test]
fn wrap_unwrap_roundtrip() {
    let pair = KeyPair::generate();
    let key = SymmetricKey::generate();

    let wrapped = wrap_key(&key, &pair.public).unwrap();
    assert_eq!(wrapped.len(), WRAPPED_KEY_LEN);

    let recovered = unwrap_key(&wrapped, &pair.private).unwrap();
    assert_eq!(recovered.as_bytes(), key.as_bytes());
}

#[test]
fn wrapping_twice_differs() {
    let pair = KeyPair::generate();
    let key = SymmetricKey::generate();

    let a = wrap_key(&key, &pair.public).unwrap();
    let b = wrap_key(&key, &pair.public).unwrap();
    assert_ne!(a, b, "ephemeral key per wrap");
}

#[test]
fn unwrap_with_other_private_key_fails() {
    let alice = KeyPair::generate();
    let bob = KeyPair::generate();
    let wrapped = wrap_key(&SymmetricKey::generate(), &alice.public).unwrap();

    assert!(matches!(
        unwrap_key(&wrapped, &bob.private),
        Err(PvaError::DecryptionFailed)
    ));
}

#[test]
fn unwrap_rejects_malformed_input() {
    let pair = KeyPair::generate();
    let mut wrapped = wrap_key(&SymmetricKey::generate(), &pair.public).unwrap();

    assert!(unwrap_key(&wrapped[..40], &pair.private).is_err());

    wrapped[0] ^= 0xFF;
    assert!(unwrap_key(&wrapped, &pair.private).is_err());
}

#[test]
fn private_key_bytes_roundtrip() {
    let pair = KeyPair::generate();
    let bytes = pair.private.to_bytes();

    let restored = PrivateKey::from_slice(&bytes[..]).unwrap();
    assert!(restored.public_key() == pair.public);

    let public = PublicKey::from_slice(pair.public.as_bytes()).unwrap();
    assert!(public == pair.public);
}

#[test]
fn generated_key_pairs_are_fresh_and_consistent() {
    let a = KeyPair::generate();
    let b = KeyPair::generate();

    assert_ne!(a.public.as_bytes(), b.public.as_bytes());
    assert_ne!(*a.private.to_bytes(), [0u8; 32]);
    assert!(a.private.public_key() == a.public);
}

#[test]
fn key_length_is_checked() {
    assert!(PrivateKey::from_slice(&[0u8; 31]).is_err());
    assert!(PublicKey::from_slice(&[0u8; 33]).is_err());
    assert!(SymmetricKey::from_slice(&[0u8; 16]).is_err());
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn aead_roundtrips_any_plaintext(
        key in any::<[u8; 32]>(),
        plaintext in proptest::collection::vec(any::<u8>(), 0..512),
        aad in proptest::collection::vec(any::<u8>(), 0..64),
    ) {
        let ciphertext = encrypt(&key, &plaintext, &aad).unwrap();
        let recovered = decrypt(&key, &ciphertext, &aad).unwrap();
        prop_assert_eq!(recovered.as_slice(), plaintext.as_slice());
    }

    #[test]
    fn any_single_bit_flip_is_detected(
        plaintext in proptest::collection::vec(any::<u8>(), 1..64),
        bit in 0usize..8,
        pos_seed in any::<usize>(),
    ) {
        let key = [0x5Au8; 32];
        let mut ciphertext = encrypt(&key, &plaintext, b"").unwrap();
        let pos = pos_seed % ciphertext.len();
        ciphertext[pos] ^= 1 << bit;
        prop_assert!(decrypt(&key, &ciphertext, b"").is_err());
    }
}
