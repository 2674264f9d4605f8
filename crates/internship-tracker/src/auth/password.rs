use super::AuthError;

/// Work factor used when no cost is configured.
pub const DEFAULT_PASSWORD_COST: u32 = bcrypt::DEFAULT_COST;
/// Lowest work factor bcrypt accepts.
pub const MIN_PASSWORD_COST: u32 = 4;
const MAX_PASSWORD_COST: u32 = 31;

pub fn is_valid_cost(cost: u32) -> bool {
    (MIN_PASSWORD_COST..=MAX_PASSWORD_COST).contains(&cost)
}

/// bcrypt hash in modular crypt format; the salt travels inside the hash.
pub(super) fn hash_password(password: &str, cost: u32) -> Result<String, AuthError> {
    bcrypt::hash(password, cost)
        .map_err(|err| AuthError::Unavailable(format!("password hashing failed: {err}")))
}

pub(super) fn verify_password(password: &str, stored: &str) -> bool {
    bcrypt::verify(password, stored).unwrap_or(false)
}
