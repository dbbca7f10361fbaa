// ==============================
// tests/unit/hasher_tests.rs
// ==============================
//! Round trips for every hashing strategy.
use scrypt::Params;
use slax_backend_lib::auth::{
    BcryptHasher, Hasher, HasherKind, NativeHasher, Sha256Hasher, WhirlpoolHasher,
};

fn hashers() -> Vec<Box<dyn Hasher>> {
    vec![
        // cheap scrypt parameters keep the suite fast
        Box::new(NativeHasher::with_params(Params::new(10, 8, 1, 32).unwrap())),
        Box::new(BcryptHasher::with_cost(4)),
        Box::new(Sha256Hasher),
        Box::new(WhirlpoolHasher),
    ]
}

#[test]
fn test_every_hasher_verifies_its_own_hash() {
    for hasher in hashers() {
        let hash = hasher.hash("SecureP@ssw0rd").unwrap();
        assert_ne!(hash, "SecureP@ssw0rd", "{} stored plain text", hasher.kind());
        assert!(hasher.check("SecureP@ssw0rd", &hash), "{}", hasher.kind());
        assert!(!hasher.check("securep@ssw0rd", &hash), "{}", hasher.kind());
    }
}

#[test]
fn test_hashes_are_salted() {
    for hasher in hashers() {
        let first = hasher.hash("same").unwrap();
        let second = hasher.hash("same").unwrap();
        assert_ne!(first, second, "{} produced identical hashes", hasher.kind());
    }
}

#[test]
fn test_hashers_do_not_accept_each_others_output() {
    let bcrypt = BcryptHasher::with_cost(4).hash("secret").unwrap();
    let sha = Sha256Hasher.hash("secret").unwrap();

    assert!(!Sha256Hasher.check("secret", &bcrypt));
    assert!(!WhirlpoolHasher.check("secret", &sha));
    assert!(!BcryptHasher::default().check("secret", &sha));
}

#[test]
fn test_kinds_report_their_names() {
    let names: Vec<_> = hashers().iter().map(|h| h.kind()).collect();
    assert_eq!(names, HasherKind::ALL.to_vec());
}
