// src/services/password.rs

use bcrypt::{hash, verify, DEFAULT_COST};

use crate::common::error::AppError;

// bcrypt é CPU-bound: roda fora do executor assíncrono
pub async fn hash_password(password: &str) -> Result<String, AppError> {
    let password_clone = password.to_owned();
    let hashed = tokio::task::spawn_blocking(move || hash(&password_clone, DEFAULT_COST))
        .await
        .map_err(|e| anyhow::anyhow!("Falha na task de hashing: {}", e))??;
    Ok(hashed)
}

pub async fn verify_password(password: &str, password_hash: &str) -> Result<bool, AppError> {
    if password_hash.is_empty() {
        return Ok(false);
    }
    let password_clone = password.to_owned();
    let hash_clone = password_hash.to_owned();

    let result = tokio::task::spawn_blocking(move || verify(&password_clone, &hash_clone))
        .await
        .map_err(|e| anyhow::anyhow!("Falha na task de verificação de senha: {}", e))?;

    match result {
        Ok(valid) => Ok(valid),
        // Hash malformado no banco não deve virar 500 no login
        Err(bcrypt::BcryptError::InvalidHash(_)) => Ok(false),
        Err(e) => Err(e.into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn hash_then_verify() {
        let hashed = hash_password("Pw0rd!").await.unwrap();
        assert!(verify_password("Pw0rd!", &hashed).await.unwrap());
        assert!(!verify_password("wrong", &hashed).await.unwrap());
    }

    #[tokio::test]
    async fn empty_hash_never_verifies() {
        assert!(!verify_password("anything", "").await.unwrap());
    }
}
