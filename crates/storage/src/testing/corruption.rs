//! WAL corruption injection for recovery tests.
//!
//! Each helper operates on a single WAL generation file and returns a
//! small report describing what changed, so a test can assert on the
//! corruption actually applied rather than assuming it. Randomness here
//! is a tiny in-house xorshift rather than pulling in `rand` as a real
//! dependency of this always-compiled module — good enough for shaking
//! out replay robustness, not meant for anything security-sensitive.

use crate::error::Result;
use crate::wal;
use std::path::{Path, PathBuf};

/// A minimal splittable PRNG so callers can seed corruption
/// deterministically without this module depending on `rand`.
#[derive(Debug, Clone, Copy)]
pub struct Lcg(u64);

impl Lcg {
    /// Seed a new generator. Zero is remapped to a fixed non-zero seed
    /// since xorshift cannot escape the all-zero state.
    pub fn new(seed: u64) -> Self {
        Lcg(if seed == 0 { 0x9E3779B97F4A7C15 } else { seed })
    }

    fn next_u64(&mut self) -> u64 {
        let mut x = self.0;
        x ^= x << 13;
        x ^= x >> 7;
        x ^= x << 17;
        self.0 = x;
        x
    }

    /// A value in `0..bound`. `bound` must be nonzero.
    pub fn next_below(&mut self, bound: usize) -> usize {
        (self.next_u64() % bound as u64) as usize
    }

    /// A byte.
    pub fn next_byte(&mut self) -> u8 {
        self.next_u64() as u8
    }
}

/// Injects corruption into a WAL file for recovery testing.
pub struct WalCorruptionTester {
    wal_path: PathBuf,
}

/// Result of [`WalCorruptionTester::truncate_tail`].
#[derive(Debug, Clone, Copy)]
pub struct TruncationResult {
    /// File size before truncation.
    pub original_size: u64,
    /// File size after truncation.
    pub new_size: u64,
}

impl WalCorruptionTester {
    /// Target a specific WAL generation file. The file need not exist
    /// yet; corruption helpers create it empty if necessary.
    pub fn new(wal_path: impl Into<PathBuf>) -> Self {
        WalCorruptionTester {
            wal_path: wal_path.into(),
        }
    }

    /// The WAL file this tester targets.
    pub fn wal_path(&self) -> &Path {
        &self.wal_path
    }

    /// Remove `bytes_to_remove` bytes from the file's tail, simulating a
    /// crash mid-write of the last frame. A no-op (clamped) if the file
    /// is smaller than `bytes_to_remove`.
    pub fn truncate_tail(&self, bytes_to_remove: u64) -> Result<TruncationResult> {
        let original_size = std::fs::metadata(&self.wal_path)
            .map_err(|e| crate::error::Error::io(self.wal_path.clone(), e))?
            .len();
        let new_size = original_size.saturating_sub(bytes_to_remove);
        let file = std::fs::OpenOptions::new()
            .write(true)
            .open(&self.wal_path)
            .map_err(|e| crate::error::Error::io(self.wal_path.clone(), e))?;
        file.set_len(new_size)
            .map_err(|e| crate::error::Error::io(self.wal_path.clone(), e))?;
        Ok(TruncationResult {
            original_size,
            new_size,
        })
    }

    /// Append arbitrary garbage bytes after the last valid frame,
    /// simulating a partial write that never reached a full frame
    /// header.
    pub fn append_garbage(&self, garbage: &[u8]) -> Result<()> {
        use std::io::Write;
        let mut file = std::fs::OpenOptions::new()
            .append(true)
            .create(true)
            .open(&self.wal_path)
            .map_err(|e| crate::error::Error::io(self.wal_path.clone(), e))?;
        file.write_all(garbage)
            .map_err(|e| crate::error::Error::io(self.wal_path.clone(), e))
    }

    /// Append `len` random bytes drawn from `rng`.
    pub fn append_random_garbage(&self, len: usize, rng: &mut Lcg) -> Result<()> {
        let bytes: Vec<u8> = (0..len).map(|_| rng.next_byte()).collect();
        self.append_garbage(&bytes)
    }

    /// Begin a frame header (valid magic, a plausible length and CRC)
    /// but never write the payload or trailing newline — an interrupted
    /// write caught after the header landed but before the body did.
    pub fn create_partial_record(&self) -> Result<()> {
        let mut header = Vec::with_capacity(12);
        header.extend_from_slice(&wal::WAL_MAGIC);
        header.extend_from_slice(&100u32.to_le_bytes());
        header.extend_from_slice(&0u32.to_le_bytes());
        self.append_garbage(&header)
    }

    /// Flip `count` random bytes anywhere in the file, simulating bit
    /// rot. Bytes within the fixed frame headers are as eligible as
    /// payload bytes.
    pub fn corrupt_random_bytes(&self, count: usize, rng: &mut Lcg) -> Result<()> {
        let mut bytes = std::fs::read(&self.wal_path)
            .map_err(|e| crate::error::Error::io(self.wal_path.clone(), e))?;
        if bytes.is_empty() {
            return Ok(());
        }
        for _ in 0..count {
            let idx = rng.next_below(bytes.len());
            bytes[idx] ^= 0xFF;
        }
        std::fs::write(&self.wal_path, &bytes)
            .map_err(|e| crate::error::Error::io(self.wal_path.clone(), e))
    }

    /// Replay the WAL and assert recovery is graceful: replay never
    /// errors outright, and any corruption detected is reported as a
    /// torn tail rather than a panic. Returns the replay for further
    /// inspection.
    pub fn verify_recovery(&self) -> Result<wal::WalReplay> {
        wal::read_all(&self.wal_path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wal::{WalOp, WalWriter};

    #[test]
    fn truncate_tail_produces_torn_replay() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("beads.wal.1");
        {
            let mut writer = WalWriter::open(&path).unwrap();
            writer.append(WalOp::Add, "bd-001", None, 1).unwrap();
            writer.append(WalOp::Close, "bd-001", None, 2).unwrap();
        }
        let tester = WalCorruptionTester::new(&path);
        tester.truncate_tail(5).unwrap();

        let replay = tester.verify_recovery().unwrap();
        assert!(replay.torn_tail);
        assert_eq!(replay.records.len(), 1);
    }

    #[test]
    fn append_garbage_after_valid_frames_is_torn_not_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("beads.wal.1");
        {
            let mut writer = WalWriter::open(&path).unwrap();
            writer.append(WalOp::Add, "bd-001", None, 1).unwrap();
        }
        let tester = WalCorruptionTester::new(&path);
        tester.append_garbage(b"not a frame at all").unwrap();

        let replay = tester.verify_recovery().unwrap();
        assert!(replay.torn_tail);
        assert_eq!(replay.records.len(), 1);
    }

    #[test]
    fn partial_record_never_panics_replay() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("beads.wal.1");
        {
            let mut writer = WalWriter::open(&path).unwrap();
            writer.append(WalOp::Add, "bd-001", None, 1).unwrap();
        }
        let tester = WalCorruptionTester::new(&path);
        tester.create_partial_record().unwrap();

        let replay = tester.verify_recovery().unwrap();
        assert!(replay.torn_tail);
        assert_eq!(replay.records.len(), 1);
    }

    #[test]
    fn corrupt_random_bytes_never_panics_replay() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("beads.wal.1");
        {
            let mut writer = WalWriter::open(&path).unwrap();
            for i in 0..5u64 {
                writer.append(WalOp::Add, format!("bd-{i:03}"), None, i as i64).unwrap();
            }
        }
        let tester = WalCorruptionTester::new(&path);
        let mut rng = Lcg::new(42);
        tester.corrupt_random_bytes(3, &mut rng).unwrap();

        // Must not panic or return Err; replay stops at the first bad frame.
        tester.verify_recovery().unwrap();
    }
}
