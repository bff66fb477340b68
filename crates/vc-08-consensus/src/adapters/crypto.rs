use crate::ports::{BlockSigner, SignatureVerifier};
use shared_crypto::{verify_signature, ValidatorKeyPair};
use shared_types::{Hash, PublicKey, Signature};

/// Signs with the node's Ed25519 validator key.
pub struct Ed25519Signer {
    keypair: ValidatorKeyPair,
}

impl Ed25519Signer {
    pub fn new(keypair: ValidatorKeyPair) -> Self {
        Self { keypair }
    }
}

impl BlockSigner for Ed25519Signer {
    fn public_key(&self) -> PublicKey {
        self.keypair.public_key()
    }

    fn sign(&self, digest: &Hash) -> Signature {
        self.keypair.sign(digest)
    }
}

/// Ed25519 signature verification.
#[derive(Debug, Default, Clone, Copy)]
pub struct Ed25519Verifier;

impl SignatureVerifier for Ed25519Verifier {
    fn verify(&self, public_key: &PublicKey, message: &[u8], signature: &Signature) -> bool {
        verify_signature(public_key, message, signature).is_ok()
    }
}
