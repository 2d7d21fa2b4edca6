pub use batchjpg_core::config::*;

use anyhow::{Context, Result};
use std::path::Path;

/// Load configuration from a TOML file
pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config = Config::from_toml(&content)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

    tracing::debug!(path = %path.display(), "Loaded config");
    Ok(config)
}

/// Load config from default locations or return default config
pub fn load_config_or_default(custom_path: Option<&Path>) -> Result<Config> {
    if let Some(path) = custom_path {
        return load_config(path);
    }

    let default_paths = ["./batchjpg.toml", "~/.config/batchjpg/config.toml"];

    for path_str in default_paths {
        let path = shellexpand::tilde(path_str);
        let path = Path::new(path.as_ref());
        if path.exists() {
            return load_config(path);
        }
    }

    Ok(Config::default())
}

/// Reject settings the run cannot work with and log the merely odd ones.
///
/// Run once, after command-line overrides are applied.
pub fn validate_config(config: &Config) -> Result<()> {
    if config.scan.max_files_per_batch == 0 {
        anyhow::bail!("scan.max_files_per_batch must be at least 1");
    }

    if config.scan.max_outstanding_batches == 0 {
        anyhow::bail!("scan.max_outstanding_batches must be at least 1");
    }

    if !(1..=100).contains(&config.conversion.quality) {
        anyhow::bail!(
            "conversion.quality must be between 1 and 100, got {}",
            config.conversion.quality
        );
    }

    if config.scan.normalized_extension().is_empty()
        || config.conversion.normalized_extension().is_empty()
    {
        anyhow::bail!("source and target extensions must not be empty");
    }

    if config.scan.normalized_extension() == config.conversion.normalized_extension() {
        anyhow::bail!(
            "source and target extension are both '{}'; converted files would overwrite originals",
            config.scan.normalized_extension()
        );
    }

    for warning in config.validate() {
        tracing::warn!("{}", warning);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn loads_file_and_keeps_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("batchjpg.toml");
        fs::write(
            &path,
            "[scan]\nskip_dirs = [\"node_modules\", \"target\"]\n\n[workers]\nmax_workers = 4\n",
        )
        .unwrap();

        let config = load_config(&path).unwrap();
        assert_eq!(config.scan.skip_dirs, vec!["node_modules", "target"]);
        assert_eq!(config.workers.max_workers, Some(4));
        assert_eq!(config.conversion.quality, 90);
    }

    #[test]
    fn missing_explicit_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_config_or_default(Some(&dir.path().join("nope.toml"))).unwrap_err();
        assert!(err.to_string().contains("Failed to read config file"));
    }

    #[test]
    fn parse_errors_name_the_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.toml");
        fs::write(&path, "[scan\n").unwrap();
        let err = load_config(&path).unwrap_err();
        assert!(err.to_string().contains("Failed to parse config file"));
        assert!(format!("{err:#}").contains("config parse error"));
    }

    #[test]
    fn zero_batch_size_is_rejected() {
        let mut config = Config::default();
        config.scan.max_files_per_batch = 0;
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn quality_out_of_range_is_rejected() {
        let mut config = Config::default();
        config.conversion.quality = 0;
        assert!(validate_config(&config).is_err());
        config.conversion.quality = 101;
        assert!(validate_config(&config).is_err());
        config.conversion.quality = 100;
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn identical_extensions_are_rejected() {
        let mut config = Config::default();
        config.conversion.target_extension = ".PNG".into();
        let err = validate_config(&config).unwrap_err();
        assert!(err.to_string().contains("overwrite"));
    }

    #[test]
    fn defaults_are_valid() {
        assert!(validate_config(&Config::default()).is_ok());
    }
}
