//! Dataset provider: makes the GeoNames dump available on local disk.
//!
//! Flow: cached text file → cached archive (extract) → download + extract → error.
//! Download failures are fatal for the run and are never retried here.

use super::types::{GazetteerError, Result};
use crate::config::DatasetConfig;
use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub struct DatasetProvider {
    config: DatasetConfig,
    offline: bool,
}

impl DatasetProvider {
    pub fn new(config: DatasetConfig) -> Self {
        Self { config, offline: false }
    }

    /// Offline mode: only use what is already in the cache directory.
    pub fn set_offline(&mut self, offline: bool) {
        self.offline = offline;
    }

    pub fn text_path(&self) -> PathBuf {
        self.config.cache_dir.join(&self.config.member_name)
    }

    pub fn archive_path(&self) -> PathBuf {
        self.config.cache_dir.join(&self.config.archive_name)
    }

    /// Return the path of the extracted dump, fetching it if needed.
    pub fn ensure(&self) -> Result<PathBuf> {
        let text = self.text_path();
        if text.exists() {
            tracing::debug!(path = %text.display(), "using cached gazetteer dump");
            return Ok(text);
        }

        let archive = self.archive_path();
        if !archive.exists() {
            if self.offline {
                return Err(GazetteerError::Acquisition {
                    url: self.config.url.clone(),
                    reason: format!("offline and no cached dataset in {}", self.config.cache_dir.display()),
                });
            }
            fs::create_dir_all(&self.config.cache_dir)?;
            self.download(&archive)?;
        }

        extract_member(&archive, &self.config.member_name, &text)?;
        tracing::info!(path = %text.display(), "extracted gazetteer dump");
        Ok(text)
    }

    fn download(&self, dest: &Path) -> Result<()> {
        let acquisition = |reason: String| GazetteerError::Acquisition {
            url: self.config.url.clone(),
            reason,
        };

        tracing::info!(url = %self.config.url, "downloading gazetteer archive");
        let agent = ureq::AgentBuilder::new()
            .timeout(Duration::from_secs(self.config.timeout_secs))
            .build();
        let response = agent
            .get(&self.config.url)
            .set("User-Agent", &self.config.user_agent)
            .call()
            .map_err(|e| acquisition(e.to_string()))?;

        write_atomically(dest, |out| {
            io::copy(&mut response.into_reader(), out).map_err(|e| acquisition(e.to_string()))?;
            Ok(())
        })
    }
}

/// `cities5000.zip` -> `cities5000.zip.part`, so archive and text never share a temp file.
fn partial_path(dest: &Path) -> PathBuf {
    let mut name = dest.file_name().unwrap_or_default().to_os_string();
    name.push(".part");
    dest.with_file_name(name)
}

/// Fill a sibling `.part` file and rename it over `dest`. On failure the
/// partial file is removed and `dest` is left untouched.
fn write_atomically<F>(dest: &Path, fill: F) -> Result<()>
where
    F: FnOnce(&mut File) -> Result<()>,
{
    let partial = partial_path(dest);
    let result = File::create(&partial)
        .map_err(GazetteerError::from)
        .and_then(|mut out| {
            fill(&mut out)?;
            out.sync_all()?;
            Ok(())
        })
        .and_then(|()| fs::rename(&partial, dest).map_err(GazetteerError::from));

    if result.is_err() {
        if let Err(e) = fs::remove_file(&partial) {
            if e.kind() != io::ErrorKind::NotFound {
                tracing::warn!(path = %partial.display(), error = %e, "could not remove partial file");
            }
        }
    }
    result
}

/// Copy one member of a zip archive to `dest`.
pub fn extract_member(archive: &Path, member: &str, dest: &Path) -> Result<()> {
    let file = File::open(archive)?;
    let mut zip = zip::ZipArchive::new(file).map_err(|e| GazetteerError::Archive(e.to_string()))?;
    let mut entry = zip
        .by_name(member)
        .map_err(|e| GazetteerError::Archive(format!("{}: {}", member, e)))?;

    write_atomically(dest, |out| {
        io::copy(&mut entry, out)?;
        Ok(())
    })
}
