//! Input loading
//!
//! Reads the JSON exports from a data directory. Reference collections live in
//! `<prefix>.json`; telemetry is spread over any number of files whose names
//! start with the telemetry prefix. A required file that is absent is an error,
//! never an empty collection.

use crate::config::AnalyzerConfig;
use crate::topology::TopologyIndex;
use crate::types::{
    AnalyzerError, CommunicationEquipment, ConnectMap, Device, Result, TelemetryEvent,
    TelemetryPayload,
};
use serde::de::DeserializeOwned;
use std::fs;
use std::path::{Path, PathBuf};

/// Read and parse one JSON file
pub fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    if !path.exists() {
        return Err(AnalyzerError::MissingInput(path.to_path_buf()));
    }

    log::info!("Reading {:?}", path);
    let content = fs::read_to_string(path)?;

    serde_json::from_str(&content).map_err(|e| AnalyzerError::JsonParse {
        path: path.to_path_buf(),
        source: e,
    })
}

/// A data directory plus the naming rules for the files inside it
#[derive(Debug, Clone)]
pub struct DataSource {
    data_dir: PathBuf,
    config: AnalyzerConfig,
}

impl DataSource {
    /// Create a data source; fails on an invalid configuration
    pub fn new(data_dir: impl Into<PathBuf>, config: AnalyzerConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            data_dir: data_dir.into(),
            config,
        })
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn config(&self) -> &AnalyzerConfig {
        &self.config
    }

    fn collection_path(&self, prefix: &str) -> PathBuf {
        self.data_dir.join(format!("{}.json", prefix))
    }

    /// Paths of the three reference collections (maps, devices, equipment)
    pub fn reference_paths(&self) -> [PathBuf; 3] {
        [
            self.collection_path(&self.config.map_file_prefix),
            self.collection_path(&self.config.device_file_prefix),
            self.collection_path(&self.config.equipment_file_prefix),
        ]
    }

    pub fn load_maps(&self) -> Result<Vec<ConnectMap>> {
        read_json(&self.collection_path(&self.config.map_file_prefix))
    }

    pub fn load_devices(&self) -> Result<Vec<Device>> {
        read_json(&self.collection_path(&self.config.device_file_prefix))
    }

    pub fn load_equipment(&self) -> Result<Vec<CommunicationEquipment>> {
        read_json(&self.collection_path(&self.config.equipment_file_prefix))
    }

    /// Read all three reference collections and index them
    pub fn build_topology(&self) -> Result<TopologyIndex> {
        let maps = self.load_maps()?;
        let devices = self.load_devices()?;
        let equipment = self.load_equipment()?;

        Ok(TopologyIndex::build(&maps, &devices, &equipment).with_sources(self.reference_paths()))
    }

    /// Every telemetry file in the data directory, sorted by name
    pub fn telemetry_files(&self) -> Result<Vec<PathBuf>> {
        if !self.data_dir.is_dir() {
            return Err(AnalyzerError::MissingInput(self.data_dir.clone()));
        }

        let mut files = Vec::new();
        for entry in fs::read_dir(&self.data_dir)? {
            let entry = entry?;
            let name = entry.file_name();
            let Some(name) = name.to_str() else {
                continue;
            };
            if self.config.is_telemetry_file(name) && entry.path().is_file() {
                files.push(entry.path());
            }
        }
        files.sort();

        if files.is_empty() {
            return Err(AnalyzerError::NoTelemetryFiles {
                dir: self.data_dir.clone(),
                prefix: self.config.telemetry_file_prefix.clone(),
            });
        }

        log::debug!("Found {} telemetry files in {:?}", files.len(), self.data_dir);
        Ok(files)
    }

    /// Narrow the telemetry files to a selection
    ///
    /// Names may be given with or without the `.json` extension. An empty
    /// selection means every available file; selection order is kept.
    pub fn select_telemetry_files(&self, names: &[String]) -> Result<Vec<PathBuf>> {
        let available = self.telemetry_files()?;
        if names.is_empty() {
            return Ok(available);
        }

        names
            .iter()
            .map(|name| {
                let wanted = if name.ends_with(".json") {
                    name.clone()
                } else {
                    format!("{}.json", name)
                };
                available
                    .iter()
                    .find(|path| path.file_name().and_then(|n| n.to_str()) == Some(wanted.as_str()))
                    .cloned()
                    .ok_or_else(|| AnalyzerError::MissingInput(self.data_dir.join(&wanted)))
            })
            .collect()
    }

    /// Read and flatten the telemetry documents from the given files, in order
    pub fn load_events(&self, files: &[PathBuf]) -> Result<Vec<TelemetryEvent>> {
        let mut events = Vec::new();

        for path in files {
            let payloads: Vec<TelemetryPayload> = read_json(path)?;
            log::debug!("{} telemetry documents in {:?}", payloads.len(), path);
            events.extend(
                payloads
                    .into_iter()
                    .map(|payload| payload.into_event(self.config.pin_count)),
            );
        }

        Ok(events)
    }
}
