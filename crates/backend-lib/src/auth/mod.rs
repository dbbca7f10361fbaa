// ============================
// slax-backend-lib/src/auth/mod.rs
// ============================
//! Authentication building blocks: hashers, credentials, sessions and cookies.

pub mod cookie;
pub mod credentials;
pub mod hasher;
pub mod session;
pub mod token_generator;

pub use cookie::{CookieStore, NativeCookie, PERSIST_CODE_TTL};
pub use credentials::Credentials;
pub use hasher::{
    hasher_for, BcryptHasher, Hasher, HasherKind, NativeHasher, Sha256Hasher, WhirlpoolHasher,
};
pub use session::{NativeSession, Session, SessionStore, CLEANUP_INTERVAL, SESSION_TTL};
