use crate::dispatch::FailureLogPolicy;
use crate::error::{ConfigError, ConfigErrorKind};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::str::FromStr;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Worker threads running command bodies
    pub worker_threads: usize,
    /// Jobs the privileged thread may have pending before new ones are dropped
    pub main_queue_capacity: usize,
    pub console_failure_log: FailureLogPolicy,
    /// TOML file holding translation overrides
    pub translations_path: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            worker_threads: 2,
            main_queue_capacity: 1024,
            console_failure_log: FailureLogPolicy::default(),
            translations_path: PathBuf::from("translations.toml"),
        }
    }
}

impl Config {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let file_err = |source| ConfigError::File { path: path.to_path_buf(), source };

        let data = std::fs::read_to_string(path).map_err(|e| file_err(ConfigErrorKind::Read(e)))?;
        toml::from_str(&data).map_err(|e| file_err(ConfigErrorKind::Parse(e)))
    }

    /// Defaults overridden by `CMD_*` variables, read after loading `.env` if present.
    pub fn from_env() -> Result<Self, ConfigError> {
        let _ = dotenvy::from_filename(".env");
        let defaults = Self::default();

        Ok(Self {
            worker_threads: env_or("CMD_WORKER_THREADS", defaults.worker_threads)?,
            main_queue_capacity: env_or("CMD_MAIN_QUEUE_CAPACITY", defaults.main_queue_capacity)?,
            console_failure_log: env_or("CMD_CONSOLE_FAILURE_LOG", defaults.console_failure_log)?,
            translations_path: std::env::var("CMD_TRANSLATIONS_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.translations_path),
        })
    }
}

fn env_or<T>(name: &str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(name) {
        Ok(raw) => raw
            .parse()
            .map_err(|e: T::Err| ConfigError::InvalidEnv(name.to_string(), e.to_string())),
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn t_partial_file_keeps_defaults() {
        let path = std::env::temp_dir().join(format!("command-config-{}.toml", std::process::id()));
        std::fs::write(&path, "worker_threads = 6\nconsole_failure_log = \"always\"\n").unwrap();

        let cfg = Config::load(&path).unwrap();
        assert_eq!(cfg.worker_threads, 6);
        assert_eq!(cfg.console_failure_log, FailureLogPolicy::Always);
        assert_eq!(cfg.main_queue_capacity, 1024);
        assert_eq!(cfg.translations_path, PathBuf::from("translations.toml"));

        let _ = std::fs::remove_file(path);
    }

    #[test]
    fn t_missing_file_names_path() {
        let err = Config::load("/definitely/not/here.toml").unwrap_err();
        assert!(matches!(err, ConfigError::File { source: ConfigErrorKind::Read(_), .. }));
        assert!(err.to_string().contains("/definitely/not/here.toml"));
    }

    #[test]
    fn t_unset_env_uses_default() {
        let value = env_or::<usize>("CMD_TEST_SURELY_UNSET_VAR", 3);
        assert_eq!(value.unwrap(), 3);
    }
}
