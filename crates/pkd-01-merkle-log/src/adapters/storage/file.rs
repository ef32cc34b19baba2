use super::lock::StoreLock;
use super::memory::{apply, scan};
use crate::domain::errors::KVStoreError;
use crate::ports::outbound::{BatchOperation, KeyValueStore, ScanResult};
use parking_lot::{Mutex, RwLock};
use std::collections::BTreeMap;
use std::fs::{File, OpenOptions};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

const TAG_DELETE: u8 = 0;
const TAG_PUT: u8 = 1;
/// `[payload_len:u32][crc32:u32]`
const RECORD_HEADER: usize = 8;

fn io_error(e: std::io::Error) -> KVStoreError {
    KVStoreError::IOError {
        message: e.to_string(),
    }
}

fn push_bytes(out: &mut Vec<u8>, bytes: &[u8]) {
    out.extend_from_slice(&(bytes.len() as u32).to_le_bytes());
    out.extend_from_slice(bytes);
}

/// One journal record: header, then the batch's operations.
fn encode_record<'a>(
    operations: impl IntoIterator<Item = (&'a [u8], Option<&'a [u8]>)>,
) -> Vec<u8> {
    let mut payload = Vec::new();
    for (key, value) in operations {
        match value {
            Some(value) => {
                payload.push(TAG_PUT);
                push_bytes(&mut payload, key);
                push_bytes(&mut payload, value);
            }
            None => {
                payload.push(TAG_DELETE);
                push_bytes(&mut payload, key);
            }
        }
    }
    let mut record = Vec::with_capacity(RECORD_HEADER + payload.len());
    record.extend_from_slice(&(payload.len() as u32).to_le_bytes());
    record.extend_from_slice(&crc32fast::hash(&payload).to_le_bytes());
    record.extend_from_slice(&payload);
    record
}

fn read_u32(bytes: &[u8], at: usize) -> Option<u32> {
    let raw: [u8; 4] = bytes.get(at..at + 4)?.try_into().ok()?;
    Some(u32::from_le_bytes(raw))
}

fn decode_payload(payload: &[u8]) -> Option<Vec<BatchOperation>> {
    let mut operations = Vec::new();
    let mut cursor = 0;
    let take = |cursor: &mut usize| -> Option<Vec<u8>> {
        let len = read_u32(payload, *cursor)? as usize;
        let bytes = payload.get(*cursor + 4..*cursor + 4 + len)?.to_vec();
        *cursor += 4 + len;
        Some(bytes)
    };
    while cursor < payload.len() {
        let tag = payload[cursor];
        cursor += 1;
        let key = take(&mut cursor)?;
        match tag {
            TAG_PUT => {
                let value = take(&mut cursor)?;
                operations.push(BatchOperation::Put { key, value });
            }
            TAG_DELETE => operations.push(BatchOperation::Delete { key }),
            _ => return None,
        }
    }
    Some(operations)
}

/// Result of replaying a journal file.
struct Replay {
    data: BTreeMap<Vec<u8>, Vec<u8>>,
    records: usize,
    /// Bytes after the last complete record, left by an interrupted append.
    torn_bytes: usize,
}

/// Append handle plus the length of the valid prefix.
struct Journal {
    file: File,
    len: u64,
}

impl Journal {
    fn append(&mut self, record: &[u8]) -> Result<(), KVStoreError> {
        let written = self
            .file
            .write_all(record)
            .and_then(|()| self.file.sync_data());
        if let Err(e) = written {
            // Cut a partial record so later appends stay replayable.
            let _ = self.file.set_len(self.len);
            return Err(io_error(e));
        }
        self.len += record.len() as u64;
        Ok(())
    }
}

/// File-backed key-value store.
///
/// Reads are served from an in-memory map. Every batch is appended to a
/// journal as one checksummed record and synced before it becomes visible,
/// so a write costs what it changes. A crash mid-append leaves a torn tail,
/// which the next open discards; that open also compacts the journal into a
/// single snapshot record.
///
/// One process at a time: opening takes an exclusive [`StoreLock`].
pub struct FileBackedKVStore {
    data: RwLock<BTreeMap<Vec<u8>, Vec<u8>>>,
    journal: Mutex<Journal>,
    path: PathBuf,
    _lock: StoreLock,
}

impl FileBackedKVStore {
    /// Open (or create) the store at `path`.
    ///
    /// Fails with [`KVStoreError::AlreadyLocked`] while another store has it
    /// open.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, KVStoreError> {
        let path = path.as_ref().to_path_buf();
        let lock = StoreLock::acquire(&path)?;
        let replay = Self::replay(&path)?;

        if replay.torn_bytes > 0 {
            tracing::warn!(
                path = %path.display(),
                torn_bytes = replay.torn_bytes,
                "[pkd-01] discarding incomplete journal record"
            );
        }
        if replay.data.is_empty() {
            tracing::info!(path = %path.display(), "[pkd-01] starting with empty store");
        } else {
            tracing::info!(
                path = %path.display(),
                keys = replay.data.len(),
                records = replay.records,
                "[pkd-01] loaded store from disk"
            );
        }

        if replay.records > 1 || replay.torn_bytes > 0 {
            Self::write_snapshot(&path, &replay.data)?;
        }
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(io_error)?;
        let len = file.metadata().map_err(io_error)?.len();

        Ok(Self {
            data: RwLock::new(replay.data),
            journal: Mutex::new(Journal { file, len }),
            path,
            _lock: lock,
        })
    }

    /// Path of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Size of the journal on disk.
    pub fn journal_len(&self) -> u64 {
        self.journal.lock().len
    }

    fn replay(path: &Path) -> Result<Replay, KVStoreError> {
        let mut bytes = Vec::new();
        match File::open(path) {
            Ok(mut file) => {
                file.read_to_end(&mut bytes).map_err(io_error)?;
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(io_error(e)),
        }

        let corrupt = |at: usize, what: &str| KVStoreError::CorruptionError {
            message: format!("{what} in record at byte {at} of {}", path.display()),
        };

        let mut data = BTreeMap::new();
        let mut records = 0;
        let mut cursor = 0;
        while cursor < bytes.len() {
            let (Some(len), Some(crc)) = (read_u32(&bytes, cursor), read_u32(&bytes, cursor + 4))
            else {
                break;
            };
            let end = cursor + RECORD_HEADER + len as usize;
            let Some(payload) = bytes.get(cursor + RECORD_HEADER..end) else {
                break;
            };
            if crc32fast::hash(payload) != crc {
                if end == bytes.len() {
                    break;
                }
                return Err(corrupt(cursor, "checksum mismatch"));
            }
            let operations = decode_payload(payload).ok_or_else(|| corrupt(cursor, "bad batch"))?;
            apply(&mut data, operations);
            records += 1;
            cursor = end;
        }

        Ok(Replay {
            data,
            records,
            torn_bytes: bytes.len() - cursor,
        })
    }

    /// Replace the journal with one record holding `data`.
    fn write_snapshot(path: &Path, data: &BTreeMap<Vec<u8>, Vec<u8>>) -> Result<(), KVStoreError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(io_error)?;
        }
        let record = if data.is_empty() {
            Vec::new()
        } else {
            encode_record(data.iter().map(|(k, v)| (k.as_slice(), Some(v.as_slice()))))
        };

        let temp_path = path.with_extension("tmp");
        let mut file = File::create(&temp_path).map_err(io_error)?;
        file.write_all(&record).map_err(io_error)?;
        file.sync_all().map_err(io_error)?;
        std::fs::rename(&temp_path, path).map_err(io_error)?;
        tracing::debug!(path = %path.display(), keys = data.len(), "[pkd-01] journal compacted");
        Ok(())
    }

    /// Journal `operations`, then publish them.
    fn mutate(&self, operations: Vec<BatchOperation>) -> Result<(), KVStoreError> {
        if operations.is_empty() {
            return Ok(());
        }
        let record = encode_record(operations.iter().map(|op| match op {
            BatchOperation::Put { key, value } => (key.as_slice(), Some(value.as_slice())),
            BatchOperation::Delete { key } => (key.as_slice(), None),
        }));

        let mut journal = self.journal.lock();
        journal.append(&record)?;
        apply(&mut self.data.write(), operations);
        Ok(())
    }
}

impl KeyValueStore for FileBackedKVStore {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, KVStoreError> {
        Ok(self.data.read().get(key).cloned())
    }

    fn put(&self, key: &[u8], value: &[u8]) -> Result<(), KVStoreError> {
        self.mutate(vec![BatchOperation::put(key, value)])
    }

    fn delete(&self, key: &[u8]) -> Result<(), KVStoreError> {
        self.mutate(vec![BatchOperation::delete(key)])
    }

    fn atomic_batch_write(&self, operations: Vec<BatchOperation>) -> Result<(), KVStoreError> {
        self.mutate(operations)
    }

    fn exists(&self, key: &[u8]) -> Result<bool, KVStoreError> {
        Ok(self.data.read().contains_key(key))
    }

    fn prefix_scan(&self, prefix: &[u8]) -> Result<ScanResult, KVStoreError> {
        Ok(scan(&self.data.read(), prefix))
    }
}
