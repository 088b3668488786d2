// Copyright 2022-2023 Lantern Contributors
// SPDX-License-Identifier: Apache-2.0, MIT

use libsecp256k1::{sign as secp_sign, Message as SecpMessage, PublicKey as SecpPublic, SecretKey as SecpPrivate};
use rand::rngs::OsRng;

use super::errors::Error;
use crate::address::Address;
use crate::crypto::{Signature, SignatureType, SECP_SIG_LEN};
use crate::encoding::blake2b_256;

/// Return the public key for a given private key and SignatureType.
pub fn to_public(sig_type: SignatureType, private_key: &[u8]) -> Result<Vec<u8>, Error> {
    match sig_type {
        SignatureType::Secp256k1 => {
            let private_key = SecpPrivate::parse_slice(private_key)
                .map_err(|err| Error::Other(err.to_string()))?;
            let public_key = SecpPublic::from_secret_key(&private_key);
            Ok(public_key.serialize().to_vec())
        }
        SignatureType::BLS => Err(Error::Other(
            "bls keys are not supported by the light signer".to_string(),
        )),
    }
}

/// Return a new Address derived from the supplied public key.
pub fn new_address(sig_type: SignatureType, public_key: &[u8]) -> Result<Address, Error> {
    match sig_type {
        SignatureType::Secp256k1 => {
            Address::new_secp256k1(public_key).map_err(|err| Error::Other(err.to_string()))
        }
        SignatureType::BLS => {
            Address::new_bls(public_key).map_err(|err| Error::Other(err.to_string()))
        }
    }
}

/// Sign takes in SignatureType, private key and message. Returns a Signature
/// for that message. The message digest is blake2b-256; the signature is the
/// 65 byte `r || s || v` form with the recovery byte last.
pub fn sign(sig_type: SignatureType, private_key: &[u8], msg: &[u8]) -> Result<Signature, Error> {
    match sig_type {
        SignatureType::Secp256k1 => {
            let priv_key = SecpPrivate::parse_slice(private_key)
                .map_err(|err| Error::Other(err.to_string()))?;
            let msg_hash = blake2b_256(msg);
            let message = SecpMessage::parse(&msg_hash);
            let (sig, recovery_id) = secp_sign(&message, &priv_key);
            let mut new_bytes = [0; SECP_SIG_LEN];
            new_bytes[..64].copy_from_slice(&sig.serialize());
            new_bytes[64] = recovery_id.serialize();
            Ok(Signature::new_secp256k1(new_bytes.to_vec()))
        }
        SignatureType::BLS => Err(Error::Other(
            "bls signing is not supported by the light signer".to_string(),
        )),
    }
}

/// Generate a new private key.
pub fn generate(sig_type: SignatureType) -> Result<Vec<u8>, Error> {
    match sig_type {
        SignatureType::Secp256k1 => {
            let key = SecpPrivate::random(&mut OsRng);
            Ok(key.serialize().to_vec())
        }
        SignatureType::BLS => Err(Error::Other(
            "bls keys are not supported by the light signer".to_string(),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sign_and_verify() {
        let priv_key = generate(SignatureType::Secp256k1).unwrap();
        let pub_key = to_public(SignatureType::Secp256k1, &priv_key).unwrap();
        let addr = new_address(SignatureType::Secp256k1, &pub_key).unwrap();

        let msg = b"in the bleak midwinter";
        let sig = sign(SignatureType::Secp256k1, &priv_key, msg).unwrap();
        assert_eq!(sig.bytes().len(), SECP_SIG_LEN);
        sig.verify(msg, &addr).unwrap();
    }

    #[test]
    fn tampered_payload_fails_verification() {
        let priv_key = generate(SignatureType::Secp256k1).unwrap();
        let pub_key = to_public(SignatureType::Secp256k1, &priv_key).unwrap();
        let addr = new_address(SignatureType::Secp256k1, &pub_key).unwrap();

        let sig = sign(SignatureType::Secp256k1, &priv_key, b"original").unwrap();
        assert!(sig.verify(b"tampered", &addr).is_err());
    }
}
