// ============================
// slax-backend-lib/src/auth/hasher.rs
// ============================
//! Interchangeable password hashing strategies.
use std::fmt;
use std::str::FromStr;

use pwhash::bcrypt::{self, BcryptSetup};
use rand::{distr::Alphanumeric, Rng};
use scrypt::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Params, Scrypt,
};
use sha2::{Digest, Sha256};
use whirlpool::Whirlpool;

use crate::error::{AuthError, ConfigurationError};

/// Length of the random salt prepended by the digest hashers
pub const SALT_LENGTH: usize = 16;

/// Default bcrypt cost factor
pub const DEFAULT_BCRYPT_COST: u32 = 8;

/// The fixed set of selectable hashers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HasherKind {
    Native,
    Bcrypt,
    Sha256,
    Whirlpool,
}

impl HasherKind {
    pub const ALL: [HasherKind; 4] = [
        HasherKind::Native,
        HasherKind::Bcrypt,
        HasherKind::Sha256,
        HasherKind::Whirlpool,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            HasherKind::Native => "native",
            HasherKind::Bcrypt => "bcrypt",
            HasherKind::Sha256 => "sha256",
            HasherKind::Whirlpool => "whirlpool",
        }
    }
}

impl fmt::Display for HasherKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HasherKind {
    type Err = ConfigurationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "native" => Ok(HasherKind::Native),
            "bcrypt" => Ok(HasherKind::Bcrypt),
            "sha256" => Ok(HasherKind::Sha256),
            "whirlpool" => Ok(HasherKind::Whirlpool),
            other => Err(ConfigurationError::UnknownHasher(other.to_string())),
        }
    }
}

/// Password hashing strategy.
///
/// Implementations are stateless apart from their cost parameters.
/// `check` never fails: a malformed stored hash simply does not match.
pub trait Hasher: Send + Sync + fmt::Debug {
    fn kind(&self) -> HasherKind;

    /// Hash a plain-text password into its storable form
    fn hash(&self, plain: &str) -> Result<String, AuthError>;

    /// Verify a plain-text password against a stored hash
    fn check(&self, plain: &str, hashed: &str) -> bool;
}

/// Build the default-configured hasher for a kind
pub fn hasher_for(kind: HasherKind) -> Box<dyn Hasher> {
    match kind {
        HasherKind::Native => Box::new(NativeHasher::default()),
        HasherKind::Bcrypt => Box::new(BcryptHasher::default()),
        HasherKind::Sha256 => Box::new(Sha256Hasher),
        HasherKind::Whirlpool => Box::new(WhirlpoolHasher),
    }
}

/// Platform-recommended password hashing: scrypt PHC strings
#[derive(Debug, Clone)]
pub struct NativeHasher {
    params: Params,
}

impl Default for NativeHasher {
    fn default() -> Self {
        Self {
            params: Params::recommended(),
        }
    }
}

impl NativeHasher {
    pub fn with_params(params: Params) -> Self {
        Self { params }
    }
}

impl Hasher for NativeHasher {
    fn kind(&self) -> HasherKind {
        HasherKind::Native
    }

    fn hash(&self, plain: &str) -> Result<String, AuthError> {
        let salt = SaltString::generate(&mut OsRng);
        let hash = Scrypt
            .hash_password_customized(plain.as_bytes(), None, None, self.params, &salt)
            .map_err(|e| AuthError::Hashing(e.to_string()))?
            .to_string();
        Ok(hash)
    }

    fn check(&self, plain: &str, hashed: &str) -> bool {
        let parsed_hash = match PasswordHash::new(hashed) {
            Ok(h) => h,
            Err(_) => return false,
        };
        Scrypt.verify_password(plain.as_bytes(), &parsed_hash).is_ok()
    }
}

/// bcrypt (`$2b$`) with a configurable cost
#[derive(Debug, Clone)]
pub struct BcryptHasher {
    cost: u32,
}

impl Default for BcryptHasher {
    fn default() -> Self {
        Self {
            cost: DEFAULT_BCRYPT_COST,
        }
    }
}

impl BcryptHasher {
    pub fn with_cost(cost: u32) -> Self {
        Self { cost }
    }
}

impl Hasher for BcryptHasher {
    fn kind(&self) -> HasherKind {
        HasherKind::Bcrypt
    }

    fn hash(&self, plain: &str) -> Result<String, AuthError> {
        let setup = BcryptSetup {
            cost: Some(self.cost),
            ..Default::default()
        };
        bcrypt::hash_with(setup, plain).map_err(|e| AuthError::Hashing(e.to_string()))
    }

    fn check(&self, plain: &str, hashed: &str) -> bool {
        bcrypt::verify(plain, hashed)
    }
}

/// Salted SHA-256: `salt || hex(sha256(salt || password))`
#[derive(Debug, Clone, Copy, Default)]
pub struct Sha256Hasher;

impl Hasher for Sha256Hasher {
    fn kind(&self) -> HasherKind {
        HasherKind::Sha256
    }

    fn hash(&self, plain: &str) -> Result<String, AuthError> {
        let salt = create_salt();
        Ok(format!("{salt}{}", digest_hex::<Sha256>(&salt, plain)))
    }

    fn check(&self, plain: &str, hashed: &str) -> bool {
        check_salted::<Sha256>(plain, hashed)
    }
}

/// Salted Whirlpool: `salt || hex(whirlpool(salt || password))`
#[derive(Debug, Clone, Copy, Default)]
pub struct WhirlpoolHasher;

impl Hasher for WhirlpoolHasher {
    fn kind(&self) -> HasherKind {
        HasherKind::Whirlpool
    }

    fn hash(&self, plain: &str) -> Result<String, AuthError> {
        let salt = create_salt();
        Ok(format!("{salt}{}", digest_hex::<Whirlpool>(&salt, plain)))
    }

    fn check(&self, plain: &str, hashed: &str) -> bool {
        check_salted::<Whirlpool>(plain, hashed)
    }
}

fn create_salt() -> String {
    rand::rng()
        .sample_iter(&Alphanumeric)
        .take(SALT_LENGTH)
        .map(char::from)
        .collect()
}

fn digest_hex<D: Digest>(salt: &str, plain: &str) -> String {
    let mut hasher = D::new();
    hasher.update(salt.as_bytes());
    hasher.update(plain.as_bytes());
    hex::encode(hasher.finalize())
}

fn check_salted<D: Digest>(plain: &str, hashed: &str) -> bool {
    // salt is ASCII alphanumeric, so the split lands on a char boundary
    if hashed.len() <= SALT_LENGTH || !hashed.is_char_boundary(SALT_LENGTH) {
        return false;
    }
    let (salt, expected) = hashed.split_at(SALT_LENGTH);
    constant_time_eq(digest_hex::<D>(salt, plain).as_bytes(), expected.as_bytes())
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}
