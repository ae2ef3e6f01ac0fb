use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use arc_swap::ArcSwap;
use tracing::{info, warn};

use crate::error::Error;

/// A reloadable set of blocked hosts, backed by a CSV file with a single
/// `host` column. Swapped atomically so the resolver and inbox never see a
/// half-applied reload while a background task re-reads the file.
pub struct Blocklist {
    path: Option<PathBuf>,
    hosts: ArcSwap<HashSet<String>>,
}

impl Blocklist {
    pub fn empty() -> Self {
        Blocklist {
            path: None,
            hosts: ArcSwap::from_pointee(HashSet::new()),
        }
    }

    pub async fn load(path: Option<PathBuf>) -> Result<Self, Error> {
        let hosts = match &path {
            Some(p) => read_csv(p)?,
            None => HashSet::new(),
        };
        info!(count = hosts.len(), "loaded blocklist");
        Ok(Blocklist {
            path,
            hosts: ArcSwap::from_pointee(hosts),
        })
    }

    pub fn is_blocked(&self, host: &str) -> bool {
        self.hosts.load().contains(host)
    }

    /// Re-reads the CSV file and swaps in the new set. Called by a
    /// periodic job; a read error leaves the previous snapshot in place.
    pub fn reload(&self) -> Result<(), Error> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        match read_csv(path) {
            Ok(hosts) => {
                let count = hosts.len();
                self.hosts.store(Arc::new(hosts));
                info!(count, "reloaded blocklist");
                Ok(())
            }
            Err(err) => {
                warn!(error = %err, "blocklist reload failed, keeping previous snapshot");
                Err(err)
            }
        }
    }
}

fn read_csv(path: &Path) -> Result<HashSet<String>, Error> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .from_path(path)
        .map_err(|e| Error::Fatal(format!("cannot open blocklist {}: {e}", path.display())))?;

    let mut hosts = HashSet::new();
    for record in reader.records() {
        let record =
            record.map_err(|e| Error::Fatal(format!("malformed blocklist row: {e}")))?;
        if let Some(host) = record.get(0) {
            let host = host.trim();
            if !host.is_empty() {
                hosts.insert(host.to_ascii_lowercase());
            }
        }
    }
    Ok(hosts)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[tokio::test]
    async fn loads_and_checks_hosts() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "host").unwrap();
        writeln!(file, "evil.example").unwrap();
        writeln!(file, "Also-Bad.example").unwrap();
        let path = file.into_temp_path();

        let blocklist = Blocklist::load(Some(path.to_path_buf())).await.unwrap();
        assert!(blocklist.is_blocked("evil.example"));
        assert!(blocklist.is_blocked("also-bad.example"));
        assert!(!blocklist.is_blocked("fine.example"));
    }
}
