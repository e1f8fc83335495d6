use std::ffi::OsString;
use std::fs::{self, File, OpenOptions};
use std::io::{BufReader, BufWriter, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::domain::{IndexedEntry, Result, RetrievalError};
use crate::infrastructure::vector_store::record::{
    encode_record, find_complete_record, LogRecord, ReadOutcome, RecordReader,
};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReplayStats {
    pub records: u64,
    pub valid_bytes: u64,
    pub discarded_bytes: u64,
}

/// Append-only record file. Records are never rewritten in place; the only
/// rewrite is an explicit [`RecordLog::rewrite`] through a temp file.
#[derive(Debug)]
pub struct RecordLog {
    path: PathBuf,
    file: Option<File>,
    /// Bytes of complete records on disk.
    len: u64,
    /// Records on disk, superseded ones included.
    records: u64,
}

impl RecordLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            file: None,
            len: 0,
            records: 0,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn records(&self) -> u64 {
        self.records
    }

    pub fn len(&self) -> u64 {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Feeds every complete record to `apply` in file order.
    ///
    /// A torn final record is dropped, copied to [`RecordLog::torn_path`], and
    /// the file is cut back to the last record boundary so later appends frame
    /// correctly. An unreadable record with complete records behind it is
    /// interior corruption: the error is returned and the file is left alone.
    pub fn replay<F>(&mut self, dimension: usize, mut apply: F) -> Result<ReplayStats>
    where
        F: FnMut(LogRecord) -> Result<()>,
    {
        let mut stats = ReplayStats::default();

        let file = match File::open(&self.path) {
            Ok(file) => file,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "no vector log yet");
                return Ok(stats);
            }
            Err(e) => return Err(e.into()),
        };

        let mut reader = RecordReader::new(BufReader::new(file), Some(dimension));
        loop {
            match reader.next_record()? {
                ReadOutcome::Record(record) => {
                    apply(record)?;
                    stats.records += 1;
                }
                ReadOutcome::End => {
                    stats.valid_bytes = reader.position();
                    break;
                }
                ReadOutcome::Truncated { offset } => {
                    stats.valid_bytes = offset;
                    stats.discarded_bytes = self.discard_tail(dimension, offset)?;
                    break;
                }
            }
        }

        self.len = stats.valid_bytes;
        self.records = stats.records;
        Ok(stats)
    }

    pub fn append(&mut self, key: &str, content: &str, vector: &[f32]) -> Result<()> {
        let bytes = encode_record(key, content, vector)?;
        let mut file = match self.file.take() {
            Some(file) => file,
            None => self.open_for_append()?,
        };
        let committed = self.len;

        let written = file.write_all(&bytes).and_then(|()| file.flush());
        if let Err(e) = written {
            // Drop any partial bytes so the next append starts on a boundary.
            if let Err(rollback) = file.set_len(committed) {
                warn!(error = %rollback, "failed to roll back partial vector log append");
            }
            self.file = Some(file);
            return Err(e.into());
        }

        self.file = Some(file);
        self.len = committed + bytes.len() as u64;
        self.records += 1;
        Ok(())
    }

    /// Replaces the log with exactly `entries`, via temp file and rename.
    pub fn rewrite<'a, I>(&mut self, entries: I) -> Result<u64>
    where
        I: IntoIterator<Item = &'a IndexedEntry>,
    {
        let tmp_path = self.compaction_path();
        let mut records = 0u64;
        let mut written = 0u64;

        {
            let mut writer = BufWriter::new(File::create(&tmp_path)?);
            for entry in entries {
                let bytes = encode_record(&entry.key, &entry.content, entry.vector.as_slice())?;
                writer.write_all(&bytes)?;
                written += bytes.len() as u64;
                records += 1;
            }
            let file = writer.into_inner().map_err(|e| e.into_error())?;
            file.sync_all()?;
        }

        self.file = None;
        fs::rename(&tmp_path, &self.path)?;

        self.len = written;
        self.records = records;
        Ok(records)
    }

    /// Drops the bytes from `offset` to the end of the file, keeping a copy
    /// in the torn-tail sidecar. Refuses when a complete record follows
    /// `offset`, since then the unreadable record is not the last one.
    fn discard_tail(&self, dimension: usize, offset: u64) -> Result<u64> {
        let mut file = OpenOptions::new().read(true).write(true).open(&self.path)?;
        file.seek(SeekFrom::Start(offset))?;
        let mut tail = Vec::new();
        file.read_to_end(&mut tail)?;

        if let Some(next) = find_complete_record(&tail, dimension) {
            return Err(RetrievalError::corrupt(
                offset,
                format!(
                    "unreadable record followed by a complete record at offset {}",
                    offset + next as u64
                ),
            ));
        }

        let torn_path = self.torn_path();
        OpenOptions::new()
            .create(true)
            .append(true)
            .open(&torn_path)?
            .write_all(&tail)?;

        warn!(
            path = %self.path.display(),
            offset,
            discarded_bytes = tail.len(),
            torn_path = %torn_path.display(),
            "discarding truncated trailing record"
        );
        file.set_len(offset)?;
        Ok(tail.len() as u64)
    }

    fn compaction_path(&self) -> PathBuf {
        self.sidecar_path(".compact")
    }

    /// Discarded tail bytes are appended here before the log is cut back.
    pub fn torn_path(&self) -> PathBuf {
        self.sidecar_path(".torn")
    }

    fn sidecar_path(&self, suffix: &str) -> PathBuf {
        let mut name: OsString = self.path.as_os_str().to_owned();
        name.push(suffix);
        PathBuf::from(name)
    }

    fn open_for_append(&mut self) -> Result<File> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        self.len = file.metadata()?.len();
        Ok(file)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::EmbeddingVector;
    use tempfile::tempdir;

    fn collect(log: &mut RecordLog, dimension: usize) -> (Vec<LogRecord>, ReplayStats) {
        let mut records = Vec::new();
        let stats = log
            .replay(dimension, |r| {
                records.push(r);
                Ok(())
            })
            .unwrap();
        (records, stats)
    }

    #[test]
    fn test_missing_file_replays_nothing() {
        let dir = tempdir().unwrap();
        let mut log = RecordLog::new(dir.path().join("vectors.bin"));

        let (records, stats) = collect(&mut log, 2);
        assert!(records.is_empty());
        assert_eq!(stats, ReplayStats::default());
        assert!(!log.path().exists());
    }

    #[test]
    fn test_append_then_replay() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("vectors.bin");

        {
            let mut log = RecordLog::new(&path);
            log.append("a", "alpha", &[1.0, 0.0]).unwrap();
            log.append("b", "beta", &[0.0, 1.0]).unwrap();
            assert_eq!(log.records(), 2);
        }

        let mut log = RecordLog::new(&path);
        let (records, stats) = collect(&mut log, 2);
        assert_eq!(stats.records, 2);
        assert_eq!(stats.valid_bytes, fs::metadata(&path).unwrap().len());
        assert_eq!(records[0].key, "a");
        assert_eq!(records[1].vector, vec![0.0, 1.0]);
    }

    #[test]
    fn test_truncated_tail_is_cut_back() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("vectors.bin");

        {
            let mut log = RecordLog::new(&path);
            log.append("a", "alpha", &[1.0, 0.0]).unwrap();
            log.append("b", "beta", &[0.0, 1.0]).unwrap();
        }
        let full = fs::metadata(&path).unwrap().len();
        OpenOptions::new()
            .write(true)
            .open(&path)
            .unwrap()
            .set_len(full - 3)
            .unwrap();

        let mut log = RecordLog::new(&path);
        let (records, stats) = collect(&mut log, 2);
        assert_eq!(records.len(), 1);
        assert!(stats.discarded_bytes > 0);
        assert_eq!(fs::metadata(&path).unwrap().len(), stats.valid_bytes);
        assert_eq!(
            fs::metadata(log.torn_path()).unwrap().len(),
            stats.discarded_bytes
        );

        log.append("c", "gamma", &[0.5, 0.5]).unwrap();

        let mut reopened = RecordLog::new(&path);
        let (records, _) = collect(&mut reopened, 2);
        let keys: Vec<&str> = records.iter().map(|r| r.key.as_str()).collect();
        assert_eq!(keys, vec!["a", "c"]);
    }

    #[test]
    fn test_rewrite_replaces_contents() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("vectors.bin");

        let mut log = RecordLog::new(&path);
        log.append("a", "old", &[1.0, 0.0]).unwrap();
        log.append("a", "new", &[0.0, 1.0]).unwrap();
        log.append("b", "beta", &[1.0, 1.0]).unwrap();

        let live = vec![
            IndexedEntry::new("a", "new", EmbeddingVector::new(vec![0.0, 1.0])),
            IndexedEntry::new("b", "beta", EmbeddingVector::new(vec![1.0, 1.0])),
        ];
        assert_eq!(log.rewrite(live.iter()).unwrap(), 2);
        assert_eq!(log.records(), 2);

        log.append("c", "gamma", &[0.5, 0.5]).unwrap();

        let mut reopened = RecordLog::new(&path);
        let (records, stats) = collect(&mut reopened, 2);
        assert_eq!(stats.records, 3);
        assert_eq!(records[0].content, "new");
        assert_eq!(records[2].key, "c");
        assert!(!log.compaction_path().exists());
    }

    #[test]
    fn test_unreadable_interior_record_is_fatal() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("vectors.bin");

        let second = {
            let mut log = RecordLog::new(&path);
            log.append("a", "alpha", &[1.0, 0.0]).unwrap();
            let second = log.len() as usize;
            log.append("b", "beta", &[0.0, 1.0]).unwrap();
            log.append("c", "gamma", &[0.5, 0.5]).unwrap();
            log.append("d", "delta", &[1.0, 1.0]).unwrap();
            second
        };
        // A key length prefix that claims more bytes than the file holds.
        let mut bytes = fs::read(&path).unwrap();
        bytes[second] = 0xff;
        bytes[second + 1] = 0xff;
        fs::write(&path, &bytes).unwrap();

        let mut log = RecordLog::new(&path);
        let err = log.replay(2, |_| Ok(())).unwrap_err();

        match err {
            RetrievalError::CorruptLog { offset, .. } => assert_eq!(offset, second as u64),
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(fs::read(&path).unwrap(), bytes);
        assert!(!log.torn_path().exists());
    }
}
