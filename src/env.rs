//! Environment variable substitution for configuration files
//!
//! `${VAR_NAME}` references are replaced with the variable's value before
//! the YAML is parsed, so secrets such as static tokens can stay out of
//! the configuration file.

use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use std::env;

use crate::config::ConfigError;

/// Regex pattern for matching environment variable references: ${VAR_NAME}
static ENV_VAR_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)\}").expect("env var pattern is valid")
});

/// Substitute environment variable references in a string.
///
/// Returns an error listing every missing variable if any are unset.
pub fn substitute_env_vars(input: &str) -> Result<String, ConfigError> {
    let mut missing_vars: Vec<String> = Vec::new();

    let result = ENV_VAR_PATTERN.replace_all(input, |caps: &Captures<'_>| {
        let var_name = &caps[1];
        match env::var(var_name) {
            Ok(value) => value,
            Err(_) => {
                if !missing_vars.iter().any(|v| v == var_name) {
                    missing_vars.push(var_name.to_string());
                }
                String::new()
            }
        }
    });

    if !missing_vars.is_empty() {
        return Err(ConfigError::ValidationError(format!(
            "Missing environment variables: {}",
            missing_vars.join(", ")
        )));
    }

    Ok(result.into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_substitution_needed() {
        let input = "root_folder_id: root";
        assert_eq!(substitute_env_vars(input).unwrap(), input);
    }

    #[test]
    fn test_variable_substitution() {
        env::set_var("DRIVEFS_ENV_MOUNT", "/mnt/drive");
        env::set_var("DRIVEFS_ENV_FOLDER", "1AbC");
        let result =
            substitute_env_vars("path: ${DRIVEFS_ENV_MOUNT}, id: ${DRIVEFS_ENV_FOLDER}").unwrap();
        assert_eq!(result, "path: /mnt/drive, id: 1AbC");
        env::remove_var("DRIVEFS_ENV_MOUNT");
        env::remove_var("DRIVEFS_ENV_FOLDER");
    }

    #[test]
    fn test_same_variable_multiple_times() {
        env::set_var("DRIVEFS_ENV_REPEAT", "x");
        let result = substitute_env_vars("${DRIVEFS_ENV_REPEAT}-${DRIVEFS_ENV_REPEAT}").unwrap();
        assert_eq!(result, "x-x");
        env::remove_var("DRIVEFS_ENV_REPEAT");
    }

    #[test]
    fn test_missing_variables_listed_once() {
        let err = substitute_env_vars("${DRIVEFS_MISSING_A} ${DRIVEFS_MISSING_B} ${DRIVEFS_MISSING_A}")
            .unwrap_err()
            .to_string();
        assert!(err.contains("DRIVEFS_MISSING_A, DRIVEFS_MISSING_B"));
        assert_eq!(err.matches("DRIVEFS_MISSING_A").count(), 1);
    }

    #[test]
    fn test_partial_match_not_substituted() {
        let result = substitute_env_vars("$VAR and {VAR} remain unchanged").unwrap();
        assert_eq!(result, "$VAR and {VAR} remain unchanged");
    }
}
