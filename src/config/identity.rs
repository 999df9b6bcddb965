//! Resolution of the user the installer runs for.
use crate::error::ConfigError;

/// Who the machine is being set up for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    /// Login name.
    pub username: String,
    /// Display name, taken from the passwd GECOS field when available.
    pub full_name: String,
    /// Email address; usually supplied on the command line.
    pub email: Option<String>,
}

impl Identity {
    /// Build an identity with the given login name and display name.
    #[must_use]
    pub fn new(username: impl Into<String>, full_name: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            full_name: full_name.into(),
            email: None,
        }
    }

    /// Resolve the current user from the environment.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Identity`] if none of `USER`, `USERNAME` or
    /// `LOGNAME` is set.
    pub fn from_env() -> Result<Self, ConfigError> {
        let username = ["USER", "USERNAME", "LOGNAME"]
            .iter()
            .find_map(|var| std::env::var(var).ok().filter(|v| !v.is_empty()))
            .ok_or_else(|| {
                ConfigError::Identity("none of USER, USERNAME or LOGNAME is set".to_string())
            })?;

        let full_name = std::fs::read_to_string("/etc/passwd")
            .ok()
            .and_then(|passwd| full_name_from_passwd(&passwd, &username))
            .unwrap_or_else(|| username.clone());

        Ok(Self::new(username, full_name))
    }
}

/// Extract the display name for `username` from passwd-formatted text.
///
/// The GECOS field is the fifth colon-separated column; only the part before
/// the first comma is the name.
fn full_name_from_passwd(passwd: &str, username: &str) -> Option<String> {
    passwd
        .lines()
        .map(|line| line.split(':').collect::<Vec<_>>())
        .find(|fields| fields.first() == Some(&username))
        .and_then(|fields| fields.get(4).copied())
        .and_then(|gecos| gecos.split(',').next())
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(String::from)
}
