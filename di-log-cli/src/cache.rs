//! Preprocessed topology cache
//!
//! The topology index is materialized to a JSON file so report runs can skip
//! re-reading the reference exports. The cache is reused while it is newer
//! than every reference file that still exists and was built from the same
//! reference files; otherwise it is rebuilt.

use anyhow::{Context, Result};
use di_log_analyzer::{DataSource, TopologyIndex};
use std::fs;
use std::path::Path;
use std::time::SystemTime;

fn modified(path: &Path) -> Result<SystemTime> {
    fs::metadata(path)
        .and_then(|m| m.modified())
        .with_context(|| format!("Failed to read modification time of {:?}", path))
}

/// Check whether the cache exists and no reference file is newer than it
pub fn is_fresh(cache_path: &Path, source: &DataSource) -> Result<bool> {
    if !cache_path.exists() {
        return Ok(false);
    }

    let cache_time = modified(cache_path)?;
    for reference in source.reference_paths() {
        if reference.exists() && modified(&reference)? > cache_time {
            log::info!("{:?} changed since the cache was written", reference);
            return Ok(false);
        }
    }

    Ok(true)
}

/// Rebuild the index from the reference exports and write it to the cache
pub fn rebuild(source: &DataSource, cache_path: &Path) -> Result<TopologyIndex> {
    log::info!("Preprocessing topology from {:?}", source.data_dir());

    let index = source
        .build_topology()
        .context("Cannot preprocess topology")?;

    if let Some(parent) = cache_path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create cache directory: {:?}", parent))?;
        }
    }
    index
        .save(cache_path)
        .with_context(|| format!("Failed to write cache: {:?}", cache_path))?;

    if !index.collapsed().is_empty() {
        log::warn!(
            "{} devices were hidden by composite-key clashes",
            index.collapsed().len()
        );
    }

    Ok(index)
}

/// Use the cached index when fresh, otherwise rebuild it
pub fn load_or_rebuild(source: &DataSource, cache_path: &Path) -> Result<TopologyIndex> {
    if is_fresh(cache_path, source)? {
        let index = TopologyIndex::load(cache_path)
            .with_context(|| format!("Failed to read cache: {:?}", cache_path))?;
        if index.sources() == source.reference_paths().as_slice() {
            log::info!("Using preprocessed topology: {:?}", cache_path);
            return Ok(index);
        }
        log::info!("Preprocessed topology was built from other reference files");
    }

    log::info!("Preprocessed topology missing or stale, rebuilding");
    rebuild(source, cache_path)
}

/// Delete the cache; returns whether a file was removed
pub fn clean(cache_path: &Path) -> Result<bool> {
    if !cache_path.exists() {
        return Ok(false);
    }

    fs::remove_file(cache_path)
        .with_context(|| format!("Failed to remove cache: {:?}", cache_path))?;
    log::info!("Removed preprocessed topology: {:?}", cache_path);
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use di_log_analyzer::AnalyzerConfig;
    use std::time::Duration;

    fn write_references(dir: &Path) {
        fs::write(dir.join("airaConnect.maps.json"), "[]").unwrap();
        fs::write(
            dir.join("airaConnect.devices.json"),
            r#"[{"name": "Press", "gatewayId": "gw1", "communicationEquipmentId": "eq1",
                 "signal": [{"pin": "R1", "light": "G"}]}]"#,
        )
        .unwrap();
        fs::write(dir.join("airaConnect.communicationEquipments.json"), "[]").unwrap();
    }

    #[test]
    fn test_rebuild_then_reuse() {
        let dir = tempfile::tempdir().unwrap();
        write_references(dir.path());
        let source = DataSource::new(dir.path(), AnalyzerConfig::new()).unwrap();
        let cache_path = dir.path().join("cache").join("preprocessed_data.json");

        assert!(!is_fresh(&cache_path, &source).unwrap());

        let built = load_or_rebuild(&source, &cache_path).unwrap();
        assert!(cache_path.exists());
        assert!(is_fresh(&cache_path, &source).unwrap());

        let reused = load_or_rebuild(&source, &cache_path).unwrap();
        assert_eq!(built, reused);
    }

    #[test]
    fn test_newer_reference_makes_cache_stale() {
        let dir = tempfile::tempdir().unwrap();
        write_references(dir.path());
        let source = DataSource::new(dir.path(), AnalyzerConfig::new()).unwrap();
        let cache_path = dir.path().join("preprocessed_data.json");
        rebuild(&source, &cache_path).unwrap();

        let devices = dir.path().join("airaConnect.devices.json");
        let file = fs::File::options().write(true).open(&devices).unwrap();
        file.set_modified(SystemTime::now() + Duration::from_secs(60)).unwrap();

        assert!(!is_fresh(&cache_path, &source).unwrap());
    }

    #[test]
    fn test_changed_prefixes_make_cache_stale() {
        let dir = tempfile::tempdir().unwrap();
        write_references(dir.path());
        fs::write(
            dir.path().join("plant.devices.json"),
            r#"[{"name": "Drill", "gatewayId": "gw2", "communicationEquipmentId": "eq2",
                 "signal": [{"pin": "R3", "light": "R"}]}]"#,
        )
        .unwrap();
        let cache_path = dir.path().join("preprocessed_data.json");
        let source = DataSource::new(dir.path(), AnalyzerConfig::new()).unwrap();
        rebuild(&source, &cache_path).unwrap();
        let config = AnalyzerConfig::new().with_device_prefix("plant.devices");
        let other = DataSource::new(dir.path(), config).unwrap();

        let index = load_or_rebuild(&other, &cache_path).unwrap();

        assert!(is_fresh(&cache_path, &other).unwrap());
        assert_eq!(index.sources(), other.reference_paths().as_slice());
        assert!(index.device("gw2/eq2/R3").is_some());
        assert!(index.device("gw1/eq1/R1").is_none());
        assert_eq!(TopologyIndex::load(&cache_path).unwrap(), index);
    }

    #[test]
    fn test_missing_references_abort_rebuild() {
        let dir = tempfile::tempdir().unwrap();
        let source = DataSource::new(dir.path(), AnalyzerConfig::new()).unwrap();
        let cache_path = dir.path().join("preprocessed_data.json");

        assert!(load_or_rebuild(&source, &cache_path).is_err());
        assert!(!cache_path.exists());
    }

    #[test]
    fn test_clean() {
        let dir = tempfile::tempdir().unwrap();
        let cache_path = dir.path().join("preprocessed_data.json");

        assert!(!clean(&cache_path).unwrap());
        fs::write(&cache_path, "{}").unwrap();
        assert!(clean(&cache_path).unwrap());
        assert!(!cache_path.exists());
    }
}
