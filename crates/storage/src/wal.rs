//! Write-ahead log: framed append-only operation log.
//!
//! Frame layout (binary-safe, self-delimiting):
//! ```text
//! +----------+----------------+--------------+---------------+---------+
//! | magic(4) | payload_len(4) | crc32(4)     | payload (N)   | '\n'    |
//! +----------+----------------+--------------+---------------+---------+
//! ```
//! `payload_len` and `crc32` are little-endian and cover only the JSON
//! payload, not the trailing newline. The newline exists purely so a WAL
//! file stays greppable with line-oriented tools; replay never relies on
//! it to find frame boundaries.

use crate::error::{Error, Result};
use crate::fsutil::fsync_parent_dir;
use serde::{Deserialize, Serialize};
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

/// Fixed 4-byte frame magic.
pub const WAL_MAGIC: [u8; 4] = *b"BDWL";

const FRAME_HEADER_LEN: usize = 12;

/// The mutation an appended frame records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WalOp {
    /// Insert a new issue.
    Add,
    /// Replace an existing issue's fields.
    Update,
    /// Transition an issue to a terminal status.
    Close,
    /// Transition a terminal issue back to open.
    Reopen,
    /// Soft-delete (tombstone) an issue.
    Delete,
    /// Mark an issue blocked.
    SetBlocked,
    /// Clear an issue's blocked marker.
    UnsetBlocked,
    /// A label was attached.
    LabelAdded,
    /// A label was removed.
    LabelRemoved,
    /// A dependency edge was added.
    DependencyAdded,
    /// A dependency edge was removed.
    DependencyRemoved,
    /// A comment was appended.
    CommentAdded,
}

/// One decoded WAL entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WalRecord {
    /// What kind of mutation this is.
    pub op: WalOp,
    /// Wall-clock time the mutation was appended, epoch milliseconds.
    pub ts: i64,
    /// Monotonically increasing sequence number within this generation.
    pub seq: u64,
    /// Target issue id.
    pub id: String,
    /// Operation-specific payload: a full [`beads_core::Issue`] for
    /// `add`/`update`, or a small JSON value for the narrower ops
    /// (a label string, a [`beads_core::Dependency`], a
    /// [`beads_core::Comment`]); `null` for ops that need none.
    #[serde(default)]
    pub data: Option<serde_json::Value>,
}

fn encode_frame(payload: &[u8]) -> Vec<u8> {
    let mut buf = Vec::with_capacity(FRAME_HEADER_LEN + payload.len() + 1);
    buf.extend_from_slice(&WAL_MAGIC);
    buf.extend_from_slice(&(payload.len() as u32).to_le_bytes());
    buf.extend_from_slice(&crc32fast::hash(payload).to_le_bytes());
    buf.extend_from_slice(payload);
    buf.push(b'\n');
    buf
}

/// Outcome of replaying a WAL file.
#[derive(Debug, Default)]
pub struct WalReplay {
    /// Successfully decoded records, in file order.
    pub records: Vec<WalRecord>,
    /// `true` if replay stopped early on an invalid frame (a torn tail,
    /// or a well-framed-but-unparsable payload at the very end).
    pub torn_tail: bool,
    /// Byte offset at which replay stopped; equals file length when
    /// `torn_tail` is `false`.
    pub stopped_at: u64,
}

/// Read and validate every frame in `path`, stopping at the first
/// invalid one. Returns an empty, non-torn result if the file is absent
/// — a fresh repository has no WAL yet.
pub fn read_all(path: &Path) -> Result<WalReplay> {
    let bytes = match std::fs::read(path) {
        Ok(b) => b,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(WalReplay::default()),
        Err(e) => return Err(Error::io(path.to_path_buf(), e)),
    };

    let mut offset = 0usize;
    let mut records = Vec::new();
    let mut torn_tail = false;

    while offset < bytes.len() {
        if bytes.len() - offset < FRAME_HEADER_LEN {
            torn_tail = true;
            break;
        }
        if bytes[offset..offset + 4] != WAL_MAGIC {
            tracing::debug!(path = %path.display(), offset, "WAL frame magic mismatch, stopping replay");
            torn_tail = true;
            break;
        }
        let len = u32::from_le_bytes(bytes[offset + 4..offset + 8].try_into().unwrap()) as usize;
        let expected_crc = u32::from_le_bytes(bytes[offset + 8..offset + 12].try_into().unwrap());

        let payload_start = offset + FRAME_HEADER_LEN;
        let payload_end = payload_start.saturating_add(len);
        if payload_end >= bytes.len() || payload_end < payload_start {
            torn_tail = true;
            break;
        }
        let payload = &bytes[payload_start..payload_end];
        if crc32fast::hash(payload) != expected_crc {
            tracing::debug!(path = %path.display(), offset, "WAL frame CRC mismatch, stopping replay");
            torn_tail = true;
            break;
        }
        if bytes[payload_end] != b'\n' {
            torn_tail = true;
            break;
        }

        match serde_json::from_slice::<WalRecord>(payload) {
            Ok(record) => records.push(record),
            Err(source) => {
                tracing::warn!(path = %path.display(), offset, %source, "skipping malformed WAL payload");
            }
        }
        offset = payload_end + 1;
    }

    Ok(WalReplay {
        records,
        torn_tail,
        stopped_at: offset as u64,
    })
}

/// Appends frames to a single WAL generation file under caller-held lock.
pub struct WalWriter {
    path: PathBuf,
    file: File,
    next_seq: u64,
}

impl WalWriter {
    /// Open (creating if needed) the WAL file at `path`, computing the
    /// next sequence number from any frames already present.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let existing = read_all(&path)?;
        let next_seq = existing.records.iter().map(|r| r.seq).max().map_or(1, |s| s + 1);
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|e| Error::io(path.clone(), e))?;
        Ok(WalWriter { path, file, next_seq })
    }

    /// Append one frame: seek-to-end (implicit via the `append` open
    /// mode), write, fsync file, fsync parent directory. Returns the
    /// allocated sequence number.
    pub fn append(
        &mut self,
        op: WalOp,
        id: impl Into<String>,
        data: Option<serde_json::Value>,
        ts_ms: i64,
    ) -> Result<u64> {
        let seq = self.next_seq;
        let record = WalRecord {
            op,
            ts: ts_ms,
            seq,
            id: id.into(),
            data,
        };
        let payload = serde_json::to_vec(&record).expect("WalRecord always serialises");
        let frame = encode_frame(&payload);

        self.file
            .write_all(&frame)
            .map_err(|e| Error::io(self.path.clone(), e))?;
        self.file.sync_all().map_err(|e| Error::io(self.path.clone(), e))?;
        fsync_parent_dir(&self.path)?;

        self.next_seq += 1;
        Ok(seq)
    }

    /// The WAL file path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The sequence number that will be assigned to the next append.
    pub fn next_seq(&self) -> u64 {
        self.next_seq
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn append_then_read_all_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("beads.wal.1");
        let mut writer = WalWriter::open(&path).unwrap();

        let seq1 = writer.append(WalOp::Add, "bd-aaa", Some(json!({"title": "x"})), 1000).unwrap();
        let seq2 = writer.append(WalOp::Close, "bd-aaa", None, 2000).unwrap();
        assert_eq!(seq1, 1);
        assert_eq!(seq2, 2);

        let replay = read_all(&path).unwrap();
        assert!(!replay.torn_tail);
        assert_eq!(replay.records.len(), 2);
        assert_eq!(replay.records[0].op, WalOp::Add);
        assert_eq!(replay.records[1].seq, 2);
    }

    #[test]
    fn reopening_continues_sequence() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("beads.wal.1");
        {
            let mut writer = WalWriter::open(&path).unwrap();
            writer.append(WalOp::Add, "bd-aaa", None, 1000).unwrap();
        }
        let writer = WalWriter::open(&path).unwrap();
        assert_eq!(writer.next_seq(), 2);
    }

    #[test]
    fn missing_file_reads_as_empty_non_torn() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("beads.wal.1");
        let replay = read_all(&path).unwrap();
        assert!(replay.records.is_empty());
        assert!(!replay.torn_tail);
    }

    #[test]
    fn torn_tail_shorter_than_header_is_detected_and_prior_frames_kept() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("beads.wal.1");
        {
            let mut writer = WalWriter::open(&path).unwrap();
            writer.append(WalOp::Add, "bd-aaa", None, 1000).unwrap();
        }
        // Simulate a crash mid-write: append a short garbage suffix.
        let mut file = OpenOptions::new().append(true).open(&path).unwrap();
        file.write_all(&[0xBD, 0xAD]).unwrap();

        let replay = read_all(&path).unwrap();
        assert_eq!(replay.records.len(), 1);
        assert!(replay.torn_tail);
    }

    #[test]
    fn corrupt_crc_mid_frame_truncates_replay() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("beads.wal.1");
        {
            let mut writer = WalWriter::open(&path).unwrap();
            writer.append(WalOp::Add, "bd-aaa", None, 1000).unwrap();
            writer.append(WalOp::Close, "bd-aaa", None, 2000).unwrap();
        }
        let mut bytes = std::fs::read(&path).unwrap();
        // Flip a byte inside the first frame's payload.
        let flip_at = FRAME_HEADER_LEN + 2;
        bytes[flip_at] ^= 0xFF;
        std::fs::write(&path, &bytes).unwrap();

        let replay = read_all(&path).unwrap();
        assert!(replay.records.is_empty());
        assert!(replay.torn_tail);
    }
}
