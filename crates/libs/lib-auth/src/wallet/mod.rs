//! # Wallet Signatures
//!
//! Wallets are base58-encoded Ed25519 public keys. A wallet proves ownership by
//! signing the login message built from the server-issued nonce.

use crate::error::{Error, Result};
use ed25519_dalek::{Signature, Verifier, VerifyingKey};

/// Message a wallet signs to log in.
pub fn login_message(nonce: &str) -> String {
    format!("Sign in to ReliefLedger\n\nNonce: {}", nonce)
}

/// Decode a wallet address into its verifying key.
pub fn validate_wallet_address(address: &str) -> Result<VerifyingKey> {
    let bytes = bs58::decode(address)
        .into_vec()
        .map_err(|e| Error::InvalidWallet(e.to_string()))?;
    let bytes: [u8; 32] = bytes
        .try_into()
        .map_err(|_| Error::InvalidWallet("expected 32 bytes".to_string()))?;

    VerifyingKey::from_bytes(&bytes).map_err(|e| Error::InvalidWallet(e.to_string()))
}

/// Verify a base58 signature over `message` made by `address`.
pub fn verify_wallet_signature(address: &str, message: &str, signature: &str) -> Result<()> {
    let key = validate_wallet_address(address)?;

    let sig_bytes = bs58::decode(signature)
        .into_vec()
        .map_err(|_| Error::SignatureFormat)?;
    let sig_bytes: [u8; 64] = sig_bytes.try_into().map_err(|_| Error::SignatureFormat)?;
    let signature = Signature::from_bytes(&sig_bytes);

    key.verify(message.as_bytes(), &signature)
        .map_err(|_| Error::SignatureMismatch)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ed25519_dalek::{Signer, SigningKey};

    fn keypair() -> (SigningKey, String) {
        let signing = SigningKey::from_bytes(&[42u8; 32]);
        let address = bs58::encode(signing.verifying_key().as_bytes()).into_string();
        (signing, address)
    }

    #[test]
    fn test_valid_signature() {
        let (signing, address) = keypair();
        let message = login_message("abc123");
        let signature = bs58::encode(signing.sign(message.as_bytes()).to_bytes()).into_string();

        assert!(verify_wallet_signature(&address, &message, &signature).is_ok());
    }

    #[test]
    fn test_signature_over_other_nonce_rejected() {
        let (signing, address) = keypair();
        let signature = bs58::encode(signing.sign(login_message("old").as_bytes()).to_bytes())
            .into_string();

        let result = verify_wallet_signature(&address, &login_message("new"), &signature);
        assert!(matches!(result, Err(Error::SignatureMismatch)));
    }

    #[test]
    fn test_invalid_address() {
        assert!(validate_wallet_address("0xnotbase58").is_err());
        assert!(validate_wallet_address("3yZe7d").is_err());
    }

    #[test]
    fn test_garbage_signature() {
        let (_, address) = keypair();
        let result = verify_wallet_signature(&address, "msg", "tooshort");
        assert!(matches!(result, Err(Error::SignatureFormat)));
    }
}
