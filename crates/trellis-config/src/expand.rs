//! Environment variable expansion for configuration strings.

use crate::ConfigError;

/// Expand `${VAR}` and `${VAR:-default}` references in `value`.
///
/// `field` names the config key for error messages.
pub(crate) fn expand_env(value: &str, field: &str) -> Result<String, ConfigError> {
    shellexpand::env(value)
        .map(std::borrow::Cow::into_owned)
        .map_err(|e| ConfigError::EnvVar {
            field: field.to_owned(),
            message: format!("${{{}}} not set", e.var_name),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_literal_unchanged() {
        assert_eq!(expand_env("site.yaml", "site.tree").unwrap(), "site.yaml");
    }

    #[test]
    fn test_default_used_when_unset() {
        // SAFETY: test runs single-threaded per test function
        unsafe {
            std::env::remove_var("TRELLIS_EXPAND_UNSET");
        }

        let expanded = expand_env("${TRELLIS_EXPAND_UNSET:-fallback.yaml}", "site.tree").unwrap();

        assert_eq!(expanded, "fallback.yaml");
    }

    #[test]
    fn test_missing_var_names_field() {
        // SAFETY: test runs single-threaded per test function
        unsafe {
            std::env::remove_var("TRELLIS_EXPAND_MISSING");
        }

        let err = expand_env("${TRELLIS_EXPAND_MISSING}", "site.tree").unwrap_err();

        assert_eq!(
            err.to_string(),
            "Environment variable error in site.tree: ${TRELLIS_EXPAND_MISSING} not set"
        );
    }
}
