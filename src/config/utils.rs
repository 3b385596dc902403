use std::env;
use std::str::FromStr;

/// Read an environment variable, treating unset and blank the same.
pub(super) fn env_var(name: &str) -> Option<String> {
    env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Read and parse an environment variable.
pub(super) fn env_parse<T>(name: &str) -> Result<Option<T>, Box<dyn std::error::Error>>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match env_var(name) {
        Some(raw) => raw
            .parse::<T>()
            .map(Some)
            .map_err(|e| format!("Invalid value for {name}: {raw:?} ({e})").into()),
        None => Ok(None),
    }
}

/// Parse a boolean flag: `true/false`, `1/0`, `yes/no`, `on/off`.
pub(super) fn parse_bool(name: &str, raw: &str) -> Result<bool, Box<dyn std::error::Error>> {
    match raw.trim().to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Ok(true),
        "false" | "0" | "no" | "off" => Ok(false),
        _ => Err(format!("Invalid boolean for {name}: {raw:?}").into()),
    }
}

pub(super) fn env_bool(name: &str) -> Result<Option<bool>, Box<dyn std::error::Error>> {
    env_var(name).map(|raw| parse_bool(name, &raw)).transpose()
}

/// Empty strings disable optional URLs.
pub(super) fn optional(value: String) -> Option<String> {
    let value = value.trim().to_string();
    (!value.is_empty()).then_some(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_bool() {
        assert!(parse_bool("X", "Yes").unwrap());
        assert!(!parse_bool("X", "0").unwrap());
        assert!(
            parse_bool("PERSIST_NOTES", "maybe")
                .unwrap_err()
                .to_string()
                .contains("PERSIST_NOTES")
        );
    }

    #[test]
    fn test_optional() {
        assert_eq!(optional("  ".to_string()), None);
        assert_eq!(optional(" x ".to_string()), Some("x".to_string()));
    }
}
