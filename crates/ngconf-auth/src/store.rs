//! User credential lookup, abstracting `validUser`'s single-user branch
//! behind a trait so a database-backed store can be dropped in later
//! without the token issuer knowing the difference.

/// Verifies a username/password pair. A database-backed implementation
/// (mirroring `validUser`'s MySQL branch and `getPasswd`) is a documented
/// extension point rather than something this crate implements — see
/// DESIGN.md.
pub trait UserStore: Send + Sync {
    fn verify(&self, username: &str, password: &str) -> bool;
}

/// A single statically configured user, mirroring the `authDBConfig == nil`
/// branch of `validUser`: `claims.Username == authConfig.Username &&
/// claims.Password == authConfig.Password`.
pub struct StaticUserStore {
    username: String,
    password: String,
}

impl StaticUserStore {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

impl UserStore for StaticUserStore {
    fn verify(&self, username: &str, password: &str) -> bool {
        username == self.username && password == self.password
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_matching_credentials() {
        let store = StaticUserStore::new("admin", "secret");
        assert!(store.verify("admin", "secret"));
    }

    #[test]
    fn rejects_wrong_username_or_password() {
        let store = StaticUserStore::new("admin", "secret");
        assert!(!store.verify("admin", "wrong"));
        assert!(!store.verify("nobody", "secret"));
    }
}
