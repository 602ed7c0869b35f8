use serde::{Deserialize, Serialize};

use crate::credentials::Credentials;
use crate::error::{Error, Result};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Account
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Where the portal credentials come from.  The config file only names
/// the environment variables; the secrets themselves never touch disk.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountConfig {
    #[serde(default = "d_user_id_env")]
    pub user_id_env: String,
    #[serde(default = "d_password_env")]
    pub password_env: String,
}

impl Default for AccountConfig {
    fn default() -> Self {
        Self {
            user_id_env: d_user_id_env(),
            password_env: d_password_env(),
        }
    }
}

impl AccountConfig {
    /// Resolve credentials from the process environment.
    pub fn credentials(&self) -> Result<Credentials> {
        self.credentials_from(|name| std::env::var(name).ok())
    }

    /// Resolve credentials through `lookup` (env var name → value).
    pub fn credentials_from(
        &self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Credentials> {
        let read = |name: &str| {
            lookup(name)
                .filter(|v| !v.is_empty())
                .ok_or_else(|| Error::Config(format!("environment variable {name} is not set")))
        };
        Ok(Credentials::new(
            read(&self.user_id_env)?,
            read(&self.password_env)?,
        ))
    }
}

fn d_user_id_env() -> String {
    "USER_ID".into()
}
fn d_password_env() -> String {
    "USER_PW".into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn resolves_from_named_variables() {
        let env: HashMap<&str, &str> = [("USER_ID", "2024123456"), ("USER_PW", "pw")].into();
        let creds = AccountConfig::default()
            .credentials_from(|k| env.get(k).map(|v| v.to_string()))
            .unwrap();
        assert_eq!(creds.user_id, "2024123456");
        assert_eq!(creds.user_password, "pw");
    }

    #[test]
    fn missing_password_is_config_error() {
        let err = AccountConfig::default()
            .credentials_from(|k| (k == "USER_ID").then(|| "someone".to_string()))
            .unwrap_err();
        assert!(matches!(err, Error::Config(ref m) if m.contains("USER_PW")));
    }

    #[test]
    fn empty_value_counts_as_missing() {
        let err = AccountConfig::default()
            .credentials_from(|_| Some(String::new()))
            .unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }
}
