use std::path::Path;

use tokio::io::{AsyncWriteExt, BufWriter};
use tokio::sync::mpsc;

use crate::extract::StatRecord;

use super::row::{format_row, header_line};
use super::{Error, Result};

/// Worker count used when none is configured.
pub const DEFAULT_WORKERS: usize = 10;
/// Upper bound on the worker count.
pub const MAX_WORKERS: usize = 1024;

/// Rows written between two intermediate flushes.
const FLUSH_EVERY: usize = 1000;

/// Writes `records` to `destination` as a header line followed by one row per record.
///
/// Rows are formatted by `workers` concurrent tasks fed from a bounded queue, so their order in
/// the file is unspecified. A single writer drains the formatted rows and flushes every
/// [`FLUSH_EVERY`] rows and once at the end. An empty record set produces a header-only file.
///
/// # Returns
///
/// The number of rows written.
///
/// # Errors
///
/// - [`Error::MissingRecords`] if `records` is `None`.
/// - [`Error::InvalidWorkerCount`] if `workers` is zero or above [`MAX_WORKERS`].
/// - [`Error::Create`] / [`Error::Write`] on I/O failure. After the first write failure the
///   remaining rows are still drained but no longer written.
/// - [`Error::RowCountMismatch`] if fewer or more rows than records reached the file.
pub async fn export(
    records: Option<Vec<StatRecord>>,
    destination: impl AsRef<Path>,
    workers: usize,
) -> Result<usize> {
    let records = records.ok_or(Error::MissingRecords)?;
    if workers == 0 || workers > MAX_WORKERS {
        return Err(Error::InvalidWorkerCount(workers));
    }
    let destination = destination.as_ref();
    let expected = records.len();
    let write_error = |source| Error::Write {
        path: destination.to_path_buf(),
        source,
    };

    let file = tokio::fs::File::create(destination)
        .await
        .map_err(|source| Error::Create {
            path: destination.to_path_buf(),
            source,
        })?;
    let mut writer = BufWriter::new(file);
    writer
        .write_all(header_line().as_bytes())
        .await
        .map_err(write_error)?;

    let (record_tx, record_rx) = flume::bounded::<StatRecord>(workers.saturating_mul(2));
    let (row_tx, mut row_rx) = mpsc::channel::<String>(workers.saturating_mul(2));

    let producer = tokio::spawn(async move {
        for record in records {
            if record_tx.send_async(record).await.is_err() {
                break;
            }
        }
    });

    let mut pool = Vec::with_capacity(workers);
    for _ in 0..workers {
        let record_rx = record_rx.clone();
        let row_tx = row_tx.clone();
        pool.push(tokio::spawn(async move {
            while let Ok(record) = record_rx.recv_async().await {
                if row_tx.send(format_row(&record)).await.is_err() {
                    break;
                }
            }
        }));
    }
    drop(record_rx);

    // Holds the last result sender until every worker is done.
    let coordinator = tokio::spawn(async move {
        let mut outcome = Ok(());
        for worker in pool {
            if let Err(err) = worker.await {
                outcome = Err(err);
            }
        }
        drop(row_tx);
        outcome
    });

    let mut written = 0;
    let mut failure = None;
    while let Some(row) = row_rx.recv().await {
        if failure.is_some() {
            continue;
        }
        if let Err(err) = writer.write_all(row.as_bytes()).await {
            log::error!("failed to write `{}`: {}", destination.display(), err);
            failure = Some(err);
            continue;
        }
        written += 1;
        if written % FLUSH_EVERY == 0 {
            if let Err(err) = writer.flush().await {
                log::error!("failed to flush `{}`: {}", destination.display(), err);
                failure = Some(err);
            }
        }
    }

    producer.await?;
    coordinator.await??;

    if let Some(err) = failure {
        return Err(write_error(err));
    }
    writer.flush().await.map_err(write_error)?;
    writer.shutdown().await.map_err(write_error)?;

    verify_row_count(expected, written)?;
    log::info!(
        "Exported {} records to `{}`",
        written,
        destination.display()
    );
    Ok(written)
}

fn verify_row_count(expected: usize, written: usize) -> Result<()> {
    if expected == written {
        Ok(())
    } else {
        Err(Error::RowCountMismatch { expected, written })
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use super::*;
    use crate::export::row::{HEADER, parse};

    fn records(n: usize) -> Vec<StatRecord> {
        (0..n)
            .map(|i| StatRecord {
                timestamp: 1_000 + i as u64,
                packet_hash: i as u32,
                if_index: (i % 7) as u32,
                length: 60 + i as u32,
                container_name: format!("container:/app-{i}").into(),
                container_id: "aaa111".into(),
                veth_name: if i % 2 == 0 { "eth0" } else { "veth, odd" }.into(),
                hook: "tc_egress",
            })
            .collect()
    }

    fn as_tuples(records: &[StatRecord]) -> BTreeSet<Vec<String>> {
        records
            .iter()
            .map(|r| {
                vec![
                    r.timestamp.to_string(),
                    r.packet_hash.to_string(),
                    r.if_index.to_string(),
                    r.length.to_string(),
                    r.container_name.to_string(),
                    r.container_id.to_string(),
                    r.veth_name.to_string(),
                    r.hook.to_owned(),
                ]
            })
            .collect()
    }

    #[tokio::test]
    async fn test_empty_set_writes_header_only() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("stats.csv");

        let written = export(Some(Vec::new()), &path, DEFAULT_WORKERS)
            .await
            .unwrap();

        assert_eq!(written, 0);
        assert_eq!(
            std::fs::read_to_string(&path).unwrap(),
            format!("{}\n", HEADER.join(","))
        );
    }

    #[tokio::test]
    async fn test_missing_set_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("stats.csv");

        let err = export(None, &path, DEFAULT_WORKERS).await.unwrap_err();
        assert!(matches!(err, Error::MissingRecords));
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn test_zero_workers_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let err = export(Some(records(3)), dir.path().join("stats.csv"), 0)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::InvalidWorkerCount(0)));
    }

    #[tokio::test]
    async fn test_oversized_worker_count_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("stats.csv");
        let err = export(Some(Vec::new()), &path, usize::MAX)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::InvalidWorkerCount(usize::MAX)));
        assert!(!path.exists());

        let written = export(Some(records(3)), &path, MAX_WORKERS).await.unwrap();
        assert_eq!(written, 3);
    }

    #[tokio::test]
    async fn test_same_rows_for_any_worker_count() {
        let dir = tempfile::tempdir().unwrap();
        let input = records(2_345);
        let expected = as_tuples(&input);

        for workers in [1, 2, 50] {
            let path = dir.path().join(format!("stats-{workers}.csv"));
            let written = export(Some(input.clone()), &path, workers).await.unwrap();
            assert_eq!(written, input.len());

            let mut rows = parse(&std::fs::read_to_string(&path).unwrap());
            assert_eq!(rows.remove(0), HEADER.map(str::to_owned).to_vec());
            assert_eq!(rows.len(), input.len());
            assert_eq!(rows.into_iter().collect::<BTreeSet<_>>(), expected);
        }
    }

    #[tokio::test]
    async fn test_unwritable_destination() {
        let dir = tempfile::tempdir().unwrap();
        let err = export(Some(records(1)), dir.path().join("missing/stats.csv"), 2)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Create { .. }));
    }

    #[tokio::test]
    async fn test_write_failure_drains_and_reports() {
        let full = Path::new("/dev/full");
        if !full.exists() {
            return;
        }
        let err = export(Some(records(1_500)), full, 4).await.unwrap_err();
        assert!(matches!(err, Error::Write { .. }));
    }

    #[test]
    fn test_row_count_mismatch_is_an_error() {
        assert!(verify_row_count(3, 3).is_ok());
        assert!(matches!(
            verify_row_count(3, 2),
            Err(Error::RowCountMismatch {
                expected: 3,
                written: 2
            })
        ));
    }
}
