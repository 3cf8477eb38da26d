use async_trait::async_trait;
use sha2::{Digest, Sha256};

use crate::application::ports::PasswordHasher;
use crate::error::AppResult;

/// Deterministic stand-in for a real password-hashing library (spec §1:
/// hashing itself is out of scope). Never use this for anything that
/// needs to resist offline brute force.
#[derive(Default)]
pub struct InMemoryPasswordHasher;

impl InMemoryPasswordHasher {
    pub fn new() -> Self {
        InMemoryPasswordHasher
    }
}

#[async_trait]
impl PasswordHasher for InMemoryPasswordHasher {
    async fn hash(&self, password: &str) -> AppResult<String> {
        let mut hasher = Sha256::new();
        hasher.update(password.as_bytes());
        Ok(hex::encode(hasher.finalize()))
    }
}
