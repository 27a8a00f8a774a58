use thiserror::Error;

/// An environment variable required by the application is not set.
#[derive(Debug, Error)]
#[error("Missing environment variable: {0}")]
pub struct MissingEnvVarError(pub String);

/// Reads an environment variable, returning a structured error if it's missing.
///
/// Empty values are treated as missing, so `FOO= pv-sync ...` does not
/// silently pass an empty credential downstream.
///
/// # Arguments
/// * `name` - The name of the environment variable to read.
pub fn get_env_var(name: &str) -> Result<String, MissingEnvVarError> {
    match std::env::var(name) {
        Ok(v) if !v.trim().is_empty() => Ok(v),
        _ => Err(MissingEnvVarError(name.to_string())),
    }
}

/// Returns `configured` when it holds a non-empty value, otherwise falls back
/// to the environment variable `name`.
pub fn configured_or_env(
    configured: Option<String>,
    name: &str,
) -> Result<String, MissingEnvVarError> {
    match configured {
        Some(v) if !v.trim().is_empty() => Ok(v),
        _ => get_env_var(name),
    }
}
