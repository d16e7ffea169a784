//! Environment variable interpolation for config files.
//!
//! Supports the following syntax:
//! - `$VAR` or `${VAR}` - substitute with env var value, error if missing
//! - `${VAR:-default}` - use default if VAR is unset OR empty
//! - `${VAR-default}` - use default only if VAR is unset
//! - `$$` - escape sequence for literal `$`

use regex::Regex;
use std::env;
use std::sync::LazyLock;

static VAR_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?x)
        \$\$                                   # literal $
        |
        \$\{(?P<name>[A-Za-z_][A-Za-z0-9_]*)   # ${NAME
            (?:(?P<sep>:?-)(?P<default>[^}]*))? #   optional default
        \}
        |
        \$(?P<bare>[A-Za-z_][A-Za-z0-9_]*)     # bare $NAME
        ",
    )
    .expect("invalid interpolation pattern")
});

/// Result of environment variable interpolation.
#[derive(Debug)]
pub struct InterpolationResult {
    /// The interpolated text.
    pub text: String,
    /// Any errors encountered during interpolation.
    pub errors: Vec<String>,
}

impl InterpolationResult {
    /// Returns true if there were no errors.
    pub fn is_ok(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Substitute environment variables in the given text.
///
/// Errors are accumulated rather than returned on first failure so the
/// user sees every missing variable at once.
pub fn interpolate(input: &str) -> InterpolationResult {
    let mut errors = Vec::new();

    let text = VAR_PATTERN
        .replace_all(input, |caps: &regex::Captures| {
            let raw = caps.get(0).map(|m| m.as_str()).unwrap_or_default();
            if raw == "$$" {
                return "$".to_string();
            }

            let name = caps
                .name("name")
                .or_else(|| caps.name("bare"))
                .map(|m| m.as_str())
                .unwrap_or_default();
            let sep = caps.name("sep").map(|m| m.as_str());
            let default = caps.name("default").map(|m| m.as_str());

            match resolve(name, sep, default) {
                Ok(value) => value,
                Err(message) => {
                    errors.push(message);
                    raw.to_string()
                }
            }
        })
        .into_owned();

    InterpolationResult { text, errors }
}

/// Resolve one variable reference against the process environment.
fn resolve(name: &str, sep: Option<&str>, default: Option<&str>) -> Result<String, String> {
    match env::var(name) {
        Ok(value) => {
            // Values carrying newlines could splice extra YAML keys in
            if value.contains('\n') || value.contains('\r') {
                return Err(format!(
                    "environment variable '{name}' contains newlines, which is not allowed"
                ));
            }
            if value.is_empty() && sep == Some(":-") {
                return Ok(default.unwrap_or_default().to_string());
            }
            Ok(value)
        }
        Err(_) => match sep {
            Some(_) => Ok(default.unwrap_or_default().to_string()),
            None => Err(format!("environment variable '{name}' is not set")),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Serialize env-mutating tests to avoid cross-test interference.
    static ENV_LOCK: std::sync::Mutex<()> = std::sync::Mutex::new(());

    #[test]
    fn test_braced_and_bare_substitution() {
        let _guard = ENV_LOCK.lock().unwrap();
        unsafe { env::set_var("STARLING_TEST_BUCKET", "mybucket") };
        let result = interpolate("s3://${STARLING_TEST_BUCKET}/in and $STARLING_TEST_BUCKET");
        assert!(result.is_ok());
        assert_eq!(result.text, "s3://mybucket/in and mybucket");
        unsafe { env::remove_var("STARLING_TEST_BUCKET") };
    }

    #[test]
    fn test_default_when_unset() {
        let _guard = ENV_LOCK.lock().unwrap();
        unsafe { env::remove_var("STARLING_TEST_MISSING") };
        let result = interpolate("${STARLING_TEST_MISSING:-fallback}");
        assert!(result.is_ok());
        assert_eq!(result.text, "fallback");
    }

    #[test]
    fn test_empty_value_defaults_only_with_colon() {
        let _guard = ENV_LOCK.lock().unwrap();
        unsafe { env::set_var("STARLING_TEST_EMPTY", "") };
        assert_eq!(interpolate("${STARLING_TEST_EMPTY:-d}").text, "d");
        assert_eq!(interpolate("${STARLING_TEST_EMPTY-d}").text, "");
        unsafe { env::remove_var("STARLING_TEST_EMPTY") };
    }

    #[test]
    fn test_missing_variable_is_an_error() {
        let _guard = ENV_LOCK.lock().unwrap();
        unsafe { env::remove_var("STARLING_TEST_ABSENT") };
        let result = interpolate("path: $STARLING_TEST_ABSENT");
        assert!(!result.is_ok());
        assert_eq!(result.errors.len(), 1);
    }

    #[test]
    fn test_dollar_escape() {
        let result = interpolate("cost: $$5");
        assert!(result.is_ok());
        assert_eq!(result.text, "cost: $5");
    }
}
