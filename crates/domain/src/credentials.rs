/// Portal account credentials for a single run.
///
/// Read once at process start and never persisted.  `Debug` is manually
/// implemented to redact the password.
#[derive(Clone)]
pub struct Credentials {
    pub user_id: String,
    pub user_password: String,
}

impl Credentials {
    pub fn new(user_id: impl Into<String>, user_password: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            user_password: user_password.into(),
        }
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("user_id", &self.user_id)
            .field("user_password", &"[REDACTED]")
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn debug_redacts_password() {
        let creds = Credentials::new("2024123456", "hunter2");
        let shown = format!("{creds:?}");
        assert!(shown.contains("2024123456"));
        assert!(!shown.contains("hunter2"));
        assert!(shown.contains("[REDACTED]"));
    }
}
