//! Rate limit key generation.

/// A key identifying the entity being rate limited.
///
/// The limiter itself treats keys as opaque strings; this type only gives
/// callers one consistent way to build them.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LimitKey(String);

impl LimitKey {
    /// Key for a messaging-platform user, e.g. `user:12345`.
    pub fn user(user_id: i64) -> Self {
        Self(format!("user:{}", user_id))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for LimitKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for LimitKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_key_format() {
        assert_eq!(LimitKey::user(12345).as_str(), "user:12345");
        assert_eq!(LimitKey::user(-7).to_string(), "user:-7");
    }

    #[test]
    fn test_user_key_equality() {
        assert_eq!(LimitKey::user(1), LimitKey::user(1));
        assert_ne!(LimitKey::user(1), LimitKey::user(2));
    }
}
