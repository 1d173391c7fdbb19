use crate::models::Settings;
use anyhow::{Context, Result};
use camino::{Utf8Path, Utf8PathBuf};
use config::{Config, Environment, File, FileFormat};
use std::fs;

/// Default config file name, created next to the working directory on first run
pub const DEFAULT_CONFIG_FILE: &str = "plex-cleanup.json";

/// Settings keys that accept a comma-separated list from the environment
const LIST_KEYS: [&str; 3] = [
    "movie_libraries",
    "movie_name_enforce_skip_characters",
    "enforce_movie_names_exclude",
];

/// Every settings key, in file order
pub const SETTINGS_KEYS: [&str; 10] = [
    "plex_url",
    "api_key",
    "movie_libraries",
    "minimum_collection_size",
    "delete_undersized_collections",
    "enforce_movie_names_match_file_names",
    "movie_name_enforce_skip_characters",
    "enforce_movie_names_exclude",
    "verify_ssl",
    "request_timeout_secs",
];

/// Outcome of loading the config file
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigLoad {
    /// The file existed and produced valid settings
    Loaded(Settings),

    /// The file was missing, a template was written at this path
    Created(Utf8PathBuf),
}

/// Configuration manager for the JSON settings file.
///
/// Loading layers the file under environment variables named after the
/// upper-cased settings keys, then validates the result.
#[derive(Debug, Clone)]
pub struct ConfigManager {
    config_path: Utf8PathBuf,
}

impl ConfigManager {
    /// Create a new ConfigManager for the given settings file.
    ///
    /// The file itself is not touched until [`load`](Self::load) is called.
    pub fn new<P: AsRef<Utf8Path>>(config_path: P) -> Self {
        Self {
            config_path: config_path.as_ref().to_path_buf(),
        }
    }

    /// Load the settings, overlaying the process environment.
    pub fn load(&self) -> Result<ConfigLoad> {
        self.load_with_env(environment_overrides())
    }

    /// Load the settings with an explicit set of environment overrides.
    ///
    /// # Arguments
    /// * `env` - Upper-case variable names mapped to their raw values
    ///
    /// # Returns
    /// [`ConfigLoad::Created`] when the file had to be written first,
    /// otherwise the validated settings
    pub fn load_with_env(&self, env: config::Map<String, String>) -> Result<ConfigLoad> {
        if !self.config_path.exists() {
            self.create_default_config()?;
            tracing::info!(
                "Config file wasn't found, created a new one at: {}",
                self.config_path
            );
            return Ok(ConfigLoad::Created(self.config_path.clone()));
        }

        tracing::debug!("Attempting to read config file: {}", self.config_path);

        let mut builder = Config::builder()
            .add_source(File::from(self.config_path.as_std_path()).format(FileFormat::Json));

        // List keys become overrides, a single entry like `1917` stays a string
        let mut scalars = config::Map::new();
        for (name, value) in env {
            if value.is_empty() {
                continue;
            }
            let key = name.to_lowercase();
            if LIST_KEYS.contains(&key.as_str()) {
                builder = builder
                    .set_override(&key, split_list(&value))
                    .with_context(|| format!("Invalid environment override: {}", name))?;
            } else {
                scalars.insert(name, value);
            }
        }

        let layered = builder
            .add_source(Environment::default().source(Some(scalars)))
            .build()
            .with_context(|| format!("Failed to read config file: {}", self.config_path))?;

        let settings: Settings = layered
            .try_deserialize()
            .with_context(|| format!("Failed to parse config file: {}", self.config_path))?;

        settings
            .validate()
            .with_context(|| format!("Invalid settings in {}", self.config_path))?;

        tracing::info!("Loaded config from {}", self.config_path);
        Ok(ConfigLoad::Loaded(settings))
    }

    /// Write a settings value to the config file as pretty JSON.
    pub fn save(&self, settings: &Settings) -> Result<()> {
        if let Some(parent) = self.config_path.parent() {
            if !parent.as_str().is_empty() && !parent.exists() {
                fs::create_dir_all(parent)
                    .with_context(|| format!("Failed to create config directory: {}", parent))?;
            }
        }

        let json = serde_json::to_string_pretty(settings)
            .context("Failed to serialize settings to JSON")?;

        fs::write(&self.config_path, json)
            .with_context(|| format!("Failed to write config file: {}", self.config_path))?;

        tracing::info!("Saved config to {}", self.config_path);
        Ok(())
    }

    /// Write the first-run template for the operator to edit.
    pub fn create_default_config(&self) -> Result<()> {
        tracing::debug!(
            "Attempting to create default config file at: {}",
            self.config_path
        );
        self.save(&Settings::template())
    }

    /// Get the config file path.
    pub fn config_path(&self) -> &Utf8Path {
        &self.config_path
    }
}

/// Split a comma-separated environment value into list entries
fn split_list(value: &str) -> Vec<String> {
    value.split(',').map(String::from).collect()
}

/// Collect `PLEX_URL`, `API_KEY`, ... from the process environment
pub fn environment_overrides() -> config::Map<String, String> {
    SETTINGS_KEYS
        .iter()
        .filter_map(|key| {
            let name = key.to_uppercase();
            std::env::var(&name).ok().map(|value| (name, value))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::PLACEHOLDER_API_KEY;
    use tempfile::TempDir;

    fn create_test_config_manager() -> (ConfigManager, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let dir = Utf8PathBuf::try_from(temp_dir.path().to_path_buf()).unwrap();
        let manager = ConfigManager::new(dir.join(DEFAULT_CONFIG_FILE));
        (manager, temp_dir)
    }

    fn env(pairs: &[(&str, &str)]) -> config::Map<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_missing_file_writes_template() {
        let (manager, _temp_dir) = create_test_config_manager();

        let outcome = manager.load_with_env(env(&[])).unwrap();
        assert_eq!(
            outcome,
            ConfigLoad::Created(manager.config_path().to_path_buf())
        );

        let written = fs::read_to_string(manager.config_path()).unwrap();
        assert!(written.contains(PLACEHOLDER_API_KEY));
    }

    #[test]
    fn test_template_is_rejected_until_edited() {
        let (manager, _temp_dir) = create_test_config_manager();
        manager.create_default_config().unwrap();

        assert!(manager.load_with_env(env(&[])).is_err());
    }

    #[test]
    fn test_environment_fills_placeholders() {
        let (manager, _temp_dir) = create_test_config_manager();
        manager.create_default_config().unwrap();

        let outcome = manager
            .load_with_env(env(&[
                ("PLEX_URL", "http://10.0.0.5:32400"),
                ("API_KEY", "secret"),
            ]))
            .unwrap();

        let ConfigLoad::Loaded(settings) = outcome else {
            panic!("expected settings to load");
        };
        assert_eq!(settings.plex_url, "http://10.0.0.5:32400");
        assert_eq!(settings.api_key, "secret");
    }

    #[test]
    fn test_environment_overrides_scalars() {
        let (manager, _temp_dir) = create_test_config_manager();
        fs::write(
            manager.config_path(),
            r#"{"plex_url": "http://plex:32400", "api_key": "abc"}"#,
        )
        .unwrap();

        let outcome = manager
            .load_with_env(env(&[
                ("MINIMUM_COLLECTION_SIZE", "4"),
                ("DELETE_UNDERSIZED_COLLECTIONS", "true"),
            ]))
            .unwrap();

        let ConfigLoad::Loaded(settings) = outcome else {
            panic!("expected settings to load");
        };
        assert_eq!(settings.minimum_collection_size, 4);
        assert!(settings.delete_undersized_collections);
        assert!(!settings.enforce_movie_names_match_file_names);
    }

    #[test]
    fn test_numeric_and_boolean_list_entries_stay_strings() {
        let (manager, _temp_dir) = create_test_config_manager();
        fs::write(
            manager.config_path(),
            r#"{"plex_url": "http://plex:32400", "api_key": "abc"}"#,
        )
        .unwrap();

        let outcome = manager
            .load_with_env(env(&[
                ("ENFORCE_MOVIE_NAMES_EXCLUDE", "1917"),
                ("MOVIE_LIBRARIES", "2023"),
                ("MOVIE_NAME_ENFORCE_SKIP_CHARACTERS", "true"),
            ]))
            .unwrap();

        let ConfigLoad::Loaded(settings) = outcome else {
            panic!("expected settings to load");
        };
        assert!(settings.is_excluded("1917"));
        assert!(settings.movie_libraries.contains("2023"));
        assert!(settings.movie_name_enforce_skip_characters.contains("true"));
        assert_eq!(settings.movie_libraries.len(), 1);
    }

    #[test]
    fn test_split_list_keeps_entries_verbatim() {
        assert_eq!(split_list("Movies,Kids"), vec!["Movies", "Kids"]);
        assert_eq!(split_list("1917"), vec!["1917"]);
        assert_eq!(split_list(": ,-"), vec![": ", "-"]);
    }
}
