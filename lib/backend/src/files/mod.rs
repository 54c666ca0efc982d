//! Serves the RDF files of a directory as data origins.
//!
//! Every file with a known RDF extension becomes a data origin whose graph name is the configured
//! prefix followed by the path of the file relative to the directory. Files never expire. Changes
//! are picked up by polling the modification time of the files.

mod accessor;
mod observer;

pub use accessor::RdfFileAccessor;
pub use observer::RdfFileObserver;

use crate::{Registry, RegistryConfig};
use dashmap::DashMap;
use ssp_bus::MessageBus;
use ssp_model::io::RdfFormat;
use ssp_model::{DataOrigin, NamedNode, RegistrationError};
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, SystemTime};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

/// The name under which the file backend registers its data origins.
pub const BACKEND_NAME: &str = "files";

/// Holds the configuration of the [FilesBackend].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilesBackendConfig {
    /// The directory that is served. Subdirectories are included.
    pub directory: PathBuf,
    /// Prepended to the relative path of a file to build its graph name.
    pub graph_name_prefix: String,
    /// The interval in which the directory and the files are checked for changes.
    pub poll_interval: Duration,
}

impl FilesBackendConfig {
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: directory.into(),
            graph_name_prefix: "http://localhost/files/".to_owned(),
            poll_interval: Duration::from_secs(1),
        }
    }
}

/// The identifier of a file data origin.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RdfFile(PathBuf);

impl RdfFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self(path.into())
    }

    pub fn path(&self) -> &Path {
        &self.0
    }

    /// The serialization format, derived from the file extension.
    pub fn format(&self) -> Option<RdfFormat> {
        rdf_format(&self.0)
    }
}

impl Display for RdfFile {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.display())
    }
}

fn rdf_format(path: &Path) -> Option<RdfFormat> {
    path.extension()
        .and_then(|extension| extension.to_str())
        .and_then(RdfFormat::from_extension)
}

/// Registers the files of a directory and keeps the registrations in sync with the directory.
pub struct FilesBackend {
    registry: Registry<RdfFile>,
    config: FilesBackendConfig,
    /// Files that could not be registered, with their modification time at that point.
    failed: DashMap<PathBuf, SystemTime>,
}

impl FilesBackend {
    /// Creates a new [FilesBackend]. No file is registered before [FilesBackend::scan] runs.
    pub fn new(bus: MessageBus, config: FilesBackendConfig, registry_config: RegistryConfig) -> Self {
        let registry = Registry::new(
            BACKEND_NAME,
            bus,
            Arc::new(RdfFileAccessor),
            Arc::new(RdfFileObserver::new(config.poll_interval)),
            registry_config,
        );
        Self {
            registry,
            config,
            failed: DashMap::new(),
        }
    }

    pub fn registry(&self) -> &Registry<RdfFile> {
        &self.registry
    }

    /// Builds the data origin for a file within the served directory.
    pub fn data_origin(&self, path: &Path) -> Option<DataOrigin<RdfFile>> {
        let relative = path.strip_prefix(&self.config.directory).ok()?;
        let segments = relative
            .components()
            .map(|component| component.as_os_str().to_string_lossy())
            .collect::<Vec<_>>();
        let graph_name = format!("{}{}", self.config.graph_name_prefix, segments.join("/"));

        match NamedNode::new(&graph_name) {
            Ok(graph_name) => Some(DataOrigin::new(RdfFile::new(path), graph_name, true)),
            Err(error) => {
                warn!("Cannot derive a graph name for {}: {error}", path.display());
                None
            }
        }
    }

    /// Registers every file of the directory that is not registered yet. Returns the number of
    /// newly registered files.
    pub async fn scan(&self) -> usize {
        let directory = self.config.directory.clone();
        let paths = match tokio::task::spawn_blocking(move || list_rdf_files(&directory)).await {
            Ok(paths) => paths,
            Err(error) => {
                warn!("Could not list {}: {error}", self.config.directory.display());
                return 0;
            }
        };

        let mut registered = 0;
        for path in paths {
            let identifier = RdfFile::new(&path);
            if self.registry.data_origin(&identifier).is_some() || self.failed_before(&path).await {
                continue;
            }
            let Some(origin) = self.data_origin(&path) else {
                continue;
            };

            match self.registry.register_data_origin(origin).await {
                Ok(()) => {
                    self.failed.remove(&path);
                    registered += 1;
                }
                Err(RegistrationError::IdentifierConflict(_)) => {}
                Err(error) => {
                    debug!("Skipping {} until it changes: {error}", path.display());
                    if let Some(modified) = modified(&path).await {
                        self.failed.insert(path, modified);
                    }
                }
            }
        }

        if registered > 0 {
            info!(
                "Registered {registered} new file(s) from {}",
                self.config.directory.display()
            );
        }
        registered
    }

    /// Scans the directory periodically until the returned task is aborted.
    pub fn spawn_scanner(self: Arc<Self>) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(self.config.poll_interval);
            loop {
                interval.tick().await;
                self.scan().await;
            }
        })
    }

    async fn failed_before(&self, path: &Path) -> bool {
        let Some(failed_at) = self.failed.get(path).map(|entry| *entry) else {
            return false;
        };
        modified(path).await == Some(failed_at)
    }
}

fn list_rdf_files(directory: &Path) -> Vec<PathBuf> {
    WalkDir::new(directory)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|entry| entry.file_type().is_file() && rdf_format(entry.path()).is_some())
        .map(walkdir::DirEntry::into_path)
        .collect()
}

async fn modified(path: &Path) -> Option<SystemTime> {
    tokio::fs::metadata(path).await.ok()?.modified().ok()
}
