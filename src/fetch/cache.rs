//! Cache-aware query reads.
//!
//! A result set is cached as a plain CSV file keyed by path. A cache file is
//! only trusted once every row deserializes into the target type; what
//! happens when that validation fails is an explicit policy, not an
//! assumption.

use std::path::Path;

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use serde::{de::DeserializeOwned, Serialize};
use tracing::{info, warn};

use super::QueryStore;
use crate::model::CsvRecord;

/// Behavior when an existing cache file fails validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StaleCachePolicy {
    /// Discard the file with a warning and query the remote store again.
    #[default]
    Refetch,
    /// Propagate the validation error and abort the run.
    Fail,
}

/// Return the rows for `sql`, reading `cache_path` if it already holds a
/// valid result and querying `store` otherwise. A fresh result is persisted
/// atomically (temp file + rename) so a crashed run never leaves a partial
/// cache behind.
pub async fn cached_read<T, S>(
    store: &S,
    sql: &str,
    cache_path: &Path,
    policy: StaleCachePolicy,
) -> Result<Vec<T>>
where
    T: Serialize + DeserializeOwned + CsvRecord,
    S: QueryStore,
{
    if cache_path.exists() {
        match read_rows(cache_path) {
            Ok(rows) => {
                info!(path = %cache_path.display(), rows = rows.len(), "cache hit");
                if rows.is_empty() {
                    warn!(path = %cache_path.display(), "cached result is empty");
                }
                return Ok(rows);
            }
            Err(err) => match policy {
                StaleCachePolicy::Fail => {
                    return Err(err.context(format!(
                        "cache file {} failed validation",
                        cache_path.display()
                    )))
                }
                StaleCachePolicy::Refetch => {
                    warn!(
                        path = %cache_path.display(),
                        error = %err,
                        "cache file failed validation; refetching"
                    );
                }
            },
        }
    }

    let body = store.execute(sql).await?;
    let rows = parse_rows(&body).context("parsing query result")?;
    write_rows(cache_path, &rows)
        .with_context(|| format!("writing cache file {}", cache_path.display()))?;
    info!(path = %cache_path.display(), rows = rows.len(), "fetched and cached");
    Ok(rows)
}

/// Parse the remote result body. Columns are matched by name, so the store
/// is free to order them however it likes.
fn parse_rows<T: DeserializeOwned>(body: &str) -> Result<Vec<T>> {
    let mut reader = csv::Reader::from_reader(body.as_bytes());
    let mut rows = Vec::new();
    for record in reader.deserialize() {
        rows.push(record?);
    }
    Ok(rows)
}

/// Load a cache file we wrote ourselves. The header must match the canonical
/// one exactly; anything else means the file is not a result set we produced
/// and it must not be trusted.
fn read_rows<T: DeserializeOwned + CsvRecord>(path: &Path) -> Result<Vec<T>> {
    let mut reader = csv::Reader::from_path(path)
        .with_context(|| format!("opening cache file {}", path.display()))?;
    let headers = reader.headers().context("reading cache header")?;
    if !headers.iter().eq(T::HEADERS.iter().copied()) {
        bail!(
            "cache header {:?} does not match expected {:?}",
            headers,
            T::HEADERS
        );
    }
    let mut rows = Vec::new();
    for record in reader.deserialize() {
        rows.push(record.context("deserializing cached row")?);
    }
    Ok(rows)
}

fn write_rows<T: Serialize + CsvRecord>(path: &Path, rows: &[T]) -> Result<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(dir)
        .with_context(|| format!("creating cache directory {}", dir.display()))?;

    let tmp = tempfile::NamedTempFile::new_in(dir).context("creating temp cache file")?;
    {
        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(tmp.as_file());
        // Header written explicitly so an empty result still caches validly.
        writer.write_record(T::HEADERS)?;
        for row in rows {
            writer.serialize(row)?;
        }
        writer.flush()?;
    }
    tmp.persist(path)
        .with_context(|| format!("moving cache file into place at {}", path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::PopulationRow;
    use std::sync::atomic::{AtomicUsize, Ordering};

    const CSV_BODY: &str = "month,region_id,list_size\n2020-01-01,08H,50000\n";

    /// Scripted store that counts how often the remote is hit.
    struct ScriptedStore {
        body: String,
        calls: AtomicUsize,
    }

    impl ScriptedStore {
        fn new(body: &str) -> Self {
            Self {
                body: body.to_string(),
                calls: AtomicUsize::new(0),
            }
        }
    }

    impl QueryStore for ScriptedStore {
        async fn execute(&self, _sql: &str) -> Result<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.body.clone())
        }
    }

    #[tokio::test]
    async fn fetches_once_then_serves_from_cache() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("list_size.csv");
        let store = ScriptedStore::new(CSV_BODY);

        let first: Vec<PopulationRow> =
            cached_read(&store, "SELECT 1", &path, StaleCachePolicy::Refetch).await?;
        let second: Vec<PopulationRow> =
            cached_read(&store, "SELECT 1", &path, StaleCachePolicy::Refetch).await?;

        assert_eq!(first, second);
        assert_eq!(first.len(), 1);
        assert_eq!(first[0].region_id, "08H");
        assert_eq!(store.calls.load(Ordering::SeqCst), 1);
        Ok(())
    }

    #[tokio::test]
    async fn corrupt_cache_refetches_under_refetch_policy() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("list_size.csv");
        std::fs::write(&path, "month,region_id,list_size\nnot-a-date,08H,xyz\n")?;
        let store = ScriptedStore::new(CSV_BODY);

        let rows: Vec<PopulationRow> =
            cached_read(&store, "SELECT 1", &path, StaleCachePolicy::Refetch).await?;

        assert_eq!(rows.len(), 1);
        assert_eq!(store.calls.load(Ordering::SeqCst), 1);
        // the corrupt file was replaced by the fresh result
        let replaced: Vec<PopulationRow> =
            cached_read(&store, "SELECT 1", &path, StaleCachePolicy::Refetch).await?;
        assert_eq!(replaced, rows);
        assert_eq!(store.calls.load(Ordering::SeqCst), 1);
        Ok(())
    }

    #[tokio::test]
    async fn corrupt_cache_is_fatal_under_fail_policy() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("list_size.csv");
        std::fs::write(&path, "some,other,header\n1,2,3\n")?;
        let store = ScriptedStore::new(CSV_BODY);

        let result: Result<Vec<PopulationRow>> =
            cached_read(&store, "SELECT 1", &path, StaleCachePolicy::Fail).await;

        assert!(result.is_err());
        assert_eq!(store.calls.load(Ordering::SeqCst), 0);
        Ok(())
    }

    #[tokio::test]
    async fn remote_failure_propagates() {
        struct FailingStore;
        impl QueryStore for FailingStore {
            async fn execute(&self, _sql: &str) -> Result<String> {
                anyhow::bail!("503 from upstream")
            }
        }

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing.csv");
        let result: Result<Vec<PopulationRow>> =
            cached_read(&FailingStore, "SELECT 1", &path, StaleCachePolicy::Refetch).await;
        assert!(result.is_err());
        assert!(!path.exists());
    }
}
