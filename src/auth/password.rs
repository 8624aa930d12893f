use super::AuthError;
use tokio::task;

/// bcrypt work factor for stored passwords
pub const HASH_COST: u32 = 10;

/// Hash on the blocking pool; bcrypt is deliberately slow
pub async fn hash_password(password: String) -> Result<String, AuthError> {
    hash_with_cost(password, HASH_COST).await
}

async fn hash_with_cost(password: String, cost: u32) -> Result<String, AuthError> {
    let hash = task::spawn_blocking(move || bcrypt::hash(password, cost)).await??;
    Ok(hash)
}

pub async fn verify_password(password: String, hash: String) -> Result<bool, AuthError> {
    let ok = task::spawn_blocking(move || bcrypt::verify(password, &hash)).await??;
    Ok(ok)
}
