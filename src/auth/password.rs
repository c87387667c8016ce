//! One-way password hashing at the credential-store boundary.
//!
//! bcrypt with the default work factor (12); verification is the library's
//! constant-shape comparison, so plaintext never touches a table and string
//! equality never touches a hash.

use bcrypt::{BcryptError, DEFAULT_COST};

pub type PasswordResult<T> = core::result::Result<T, BcryptError>;

pub fn hash(plain: &str) -> PasswordResult<String> {
    bcrypt::hash(plain, DEFAULT_COST)
}

pub fn verify(plain: &str, hashed: &str) -> PasswordResult<bool> {
    bcrypt::verify(plain, hashed)
}

#[cfg(test)]
mod test {
    use super::*;

    // low cost factor to keep the suite quick; production path uses DEFAULT_COST
    const TEST_COST: u32 = 4;

    #[test]
    fn verify_accepts_matching_password() {
        let hashed = bcrypt::hash("hunter2", TEST_COST).unwrap();
        assert!(verify("hunter2", &hashed).unwrap());
    }

    #[test]
    fn verify_rejects_wrong_password() {
        let hashed = bcrypt::hash("hunter2", TEST_COST).unwrap();
        assert!(!verify("hunter3", &hashed).unwrap());
    }

    #[test]
    fn verify_errors_on_garbage_hash() {
        assert!(verify("hunter2", "not-a-bcrypt-hash").is_err());
    }

    #[test]
    fn hash_is_salted() {
        let a = bcrypt::hash("same-input", TEST_COST).unwrap();
        let b = bcrypt::hash("same-input", TEST_COST).unwrap();
        assert_ne!(a, b);
    }
}
