use mlflow_audit_core::AuditError;

/// Address of the tracking server.
pub const TRACKING_URI_ENV: &str = "MLFLOW_TRACKING_URI";
/// User name for basic authentication.
pub const TRACKING_USERNAME_ENV: &str = "MLFLOW_TRACKING_USERNAME";
/// Password for basic authentication.
pub const TRACKING_PASSWORD_ENV: &str = "MLFLOW_TRACKING_PASSWORD";

/// Connection settings of the tracking server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackingSettings {
    pub uri: String,
    pub user_name: Option<String>,
    pub password: Option<String>,
}

impl TrackingSettings {
    /// Reads the settings from environment variables.
    ///
    /// [`TRACKING_URI_ENV`] is required. Credentials are optional.
    pub fn from_env() -> Result<Self, AuditError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Reads the settings with `lookup` standing for the environment.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, AuditError> {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let uri = non_empty(TRACKING_URI_ENV)
            .ok_or_else(|| AuditError::MissingConfig(TRACKING_URI_ENV.to_string()))?;

        Ok(Self {
            uri: uri.trim_end_matches('/').to_string(),
            user_name: non_empty(TRACKING_USERNAME_ENV),
            password: non_empty(TRACKING_PASSWORD_ENV),
        })
    }
}
