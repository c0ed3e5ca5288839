//! Configuration loader, credential resolution and path helpers.
//!
//! Uses Figment to merge `config.toml` + `config.<env>.toml` + `APP_*` env vars.
//! The API key itself never lives in a config file: it comes from
//! `LABELBOX_API_KEY` or from the file named by `LABELBOX_API_KEY_FILE`.
use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use secrecy::{ExposeSecret, Secret};
use std::env;
use std::fmt;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

pub const API_KEY_VAR: &str = "LABELBOX_API_KEY";
pub const API_KEY_FILE_VAR: &str = "LABELBOX_API_KEY_FILE";
pub const API_URL_VAR: &str = "LABELBOX_API_URL";
pub const DEFAULT_ENDPOINT: &str = "https://api.labelbox.com/";

pub struct Config {
    figment: Figment,
    base_dir: PathBuf,
}

impl Config {
    /// Load from the current directory.
    pub fn load() -> Result<Self> {
        Self::load_from(&env::current_dir()?)
    }

    /// Load `config.toml` and the per-environment overlay found in `dir`.
    /// Relative paths in the configuration resolve against `dir`.
    pub fn load_from(dir: &Path) -> Result<Self> {
        let env_name = env::var("RUST_ENV").unwrap_or_else(|_| "dev".to_string());

        let mut figment = Figment::new().merge(Toml::file(dir.join("config.toml")));
        match env_name.as_str() {
            "dev" | "development" => figment = figment.merge(Toml::file(dir.join("config.dev.toml"))),
            "prod" | "production" => figment = figment.merge(Toml::file(dir.join("config.prod.toml"))),
            "test" | "testing" => figment = figment.merge(Toml::file(dir.join("config.test.toml"))),
            _ => {}
        }
        figment = figment.merge(Env::prefixed("APP_").split("__"));

        Ok(Self { figment, base_dir: dir.to_path_buf() })
    }

    /// Wrap an already assembled figment, mostly for tests.
    pub fn from_figment(figment: Figment, base_dir: impl Into<PathBuf>) -> Self {
        Self { figment, base_dir: base_dir.into() }
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    pub fn get<T>(&self, key: &str) -> Result<T>
    where
        T: serde::de::DeserializeOwned,
    {
        self.figment
            .extract_inner(key)
            .map_err(|e| Error::Config(format!("Failed to get '{}': {}", key, e)))
    }

    /// Like `get`, but a missing key is `None` rather than an error.
    pub fn get_opt<T>(&self, key: &str) -> Result<Option<T>>
    where
        T: serde::de::DeserializeOwned,
    {
        if self.figment.find_value(key).is_err() {
            return Ok(None);
        }
        self.get(key).map(Some)
    }
}

/// Endpoint configuration: base URL plus bearer key. Immutable once built.
pub struct ClientSettings {
    endpoint: String,
    api_key: Secret<String>,
}

impl ClientSettings {
    pub fn new(endpoint: impl Into<String>, api_key: impl Into<String>) -> Result<Self> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(Error::Config("API key must not be empty".to_string()));
        }
        let endpoint = endpoint.into();
        if endpoint.trim().is_empty() {
            return Err(Error::Config("API endpoint must not be empty".to_string()));
        }
        Ok(Self { endpoint, api_key: Secret::new(api_key) })
    }

    /// Resolve settings from the process environment and the loaded config.
    /// An explicit `api_key` wins over the environment.
    pub fn resolve(config: &Config, api_key: Option<String>) -> Result<Self> {
        Self::resolve_with(config, api_key, |name| env::var(name).ok())
    }

    /// Same as `resolve`, with the environment supplied by `lookup`.
    pub fn resolve_with<F>(config: &Config, api_key: Option<String>, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let endpoint = match lookup(API_URL_VAR).filter(|v| !v.is_empty()) {
            Some(url) => url,
            None => config
                .get_opt::<String>("api.endpoint")?
                .unwrap_or_else(|| DEFAULT_ENDPOINT.to_string()),
        };
        let api_key = match api_key {
            Some(key) => key,
            None => load_api_key(&lookup, config.base_dir())?,
        };
        Self::new(endpoint, api_key)
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn api_key(&self) -> &str {
        self.api_key.expose_secret()
    }
}

impl fmt::Debug for ClientSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientSettings")
            .field("endpoint", &self.endpoint)
            .field("api_key", &"[REDACTED]")
            .finish()
    }
}

/// Read the API key from `LABELBOX_API_KEY`, falling back to the file named
/// by `LABELBOX_API_KEY_FILE`. A relative key-file path resolves against
/// `base_dir`.
pub fn load_api_key<F>(lookup: F, base_dir: &Path) -> Result<String>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(key) = lookup(API_KEY_VAR).filter(|k| !k.is_empty()) {
        return Ok(key);
    }

    if let Some(path) = lookup(API_KEY_FILE_VAR).filter(|p| !p.is_empty()) {
        let path = resolve_with_base(base_dir, &path);
        let key = std::fs::read_to_string(&path).map_err(|e| {
            Error::Config(format!("Failed to read API key file {}: {}", path.display(), e))
        })?;
        let key = key.trim();
        if key.is_empty() {
            return Err(Error::Config(format!("API key file {} is empty", path.display())));
        }
        return Ok(key.to_string());
    }

    Err(Error::Config(format!(
        "Set API key in either {} or {} env vars",
        API_KEY_VAR, API_KEY_FILE_VAR
    )))
}

/// Expand a user-provided path string:
/// - Expands leading '~' to the user's home directory
/// - Expands ${VAR} and $VAR environment variables
/// - Returns a PathBuf without attempting to canonicalize
pub fn expand_path<S: AsRef<str>>(input: S) -> PathBuf {
    let s = input.as_ref();
    let expanded_env = shellexpand::env(s).unwrap_or(std::borrow::Cow::Borrowed(s));
    let expanded = shellexpand::tilde(&expanded_env);
    PathBuf::from(expanded.as_ref())
}

/// Resolve a possibly relative path against a given base directory after expansion.
/// If `p` is absolute, it's returned as-is; otherwise `base.join(p)` is returned.
pub fn resolve_with_base<S: AsRef<str>>(base: &Path, p: S) -> PathBuf {
    let p = expand_path(p);
    if p.is_absolute() { p } else { base.join(p) }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn settings_reject_blank_key() {
        let err = ClientSettings::new(DEFAULT_ENDPOINT, "   ").unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn debug_output_hides_key() {
        let settings = ClientSettings::new(DEFAULT_ENDPOINT, "sekrit").unwrap();
        let shown = format!("{settings:?}");
        assert!(!shown.contains("sekrit"));
        assert!(shown.contains("REDACTED"));
    }

    #[test]
    fn resolve_with_base_keeps_absolute_paths() {
        let base = Path::new("/etc/advtool");
        assert_eq!(resolve_with_base(base, "/keys/api"), PathBuf::from("/keys/api"));
        assert_eq!(resolve_with_base(base, "keys/api"), PathBuf::from("/etc/advtool/keys/api"));
    }
}
