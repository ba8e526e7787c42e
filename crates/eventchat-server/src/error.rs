use std::net::AddrParseError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Missing required environment variable: {env_var}")]
    MissingEnvVar { env_var: String },

    #[error("Invalid server address: {0}")]
    InvalidAddress(#[from] AddrParseError),

    #[error("Configuration error: {0}")]
    Other(#[from] config::ConfigError),
}

/// Environment variable that sets a dotted configuration key, e.g.
/// `provider.api_key` -> `EVENTCHAT_PROVIDER__API_KEY`
pub fn to_env_var(field_path: &str) -> String {
    let mut env_var = String::from("EVENTCHAT_");
    env_var.push_str(&field_path.split('.').collect::<Vec<_>>().join("__").to_uppercase());
    env_var
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_env_var() {
        assert_eq!(to_env_var("provider.api_key"), "EVENTCHAT_PROVIDER__API_KEY");
        assert_eq!(to_env_var("database.path"), "EVENTCHAT_DATABASE__PATH");
        assert_eq!(to_env_var("port"), "EVENTCHAT_PORT");
    }

    #[test]
    fn test_missing_env_var_message() {
        let err = ConfigError::MissingEnvVar {
            env_var: to_env_var("provider.api_key"),
        };
        assert_eq!(
            err.to_string(),
            "Missing required environment variable: EVENTCHAT_PROVIDER__API_KEY"
        );
    }
}
