use std::fs::{self, File, OpenOptions};
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};

use crate::model::Event;

/// Encode a single event to [len][bincode][crc32] format.
fn encode_frame(event: &Event) -> io::Result<Vec<u8>> {
    let payload =
        bincode::serialize(event).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
    let mut frame = Vec::with_capacity(payload.len() + 8);
    frame.extend_from_slice(&(payload.len() as u32).to_le_bytes());
    frame.extend_from_slice(&payload);
    frame.extend_from_slice(&crc32fast::hash(&payload).to_le_bytes());
    Ok(frame)
}

/// Read one length-prefixed frame. `Ok(None)` on clean EOF or a truncated tail.
fn read_frame(reader: &mut impl Read) -> io::Result<Option<(Vec<u8>, u32)>> {
    let mut len_buf = [0u8; 4];
    if !read_or_eof(reader, &mut len_buf)? {
        return Ok(None);
    }
    let mut payload = vec![0u8; u32::from_le_bytes(len_buf) as usize];
    if !read_or_eof(reader, &mut payload)? {
        return Ok(None);
    }
    let mut crc_buf = [0u8; 4];
    if !read_or_eof(reader, &mut crc_buf)? {
        return Ok(None);
    }
    Ok(Some((payload, u32::from_le_bytes(crc_buf))))
}

fn read_or_eof(reader: &mut impl Read, buf: &mut [u8]) -> io::Result<bool> {
    match reader.read_exact(buf) {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => Ok(false),
        Err(e) => Err(e),
    }
}

/// Append-only Write-Ahead Log holding every store mutation.
///
/// Format per entry: `[u32: len][bincode: Event][u32: crc32]`
/// - `len` is the byte length of the bincode payload (not including the CRC).
/// - Truncated last entry (crash) is safely discarded via length-prefix + CRC check.
///
/// A failed append is cut back off the file before the error is returned, so
/// an operation reported as failed never reappears on replay. If that cut
/// fails too the log is poisoned and refuses appends until compacted or
/// reopened.
pub struct Wal {
    file: File,
    path: PathBuf,
    entries: u64,
    len: u64,
    poisoned: bool,
}

impl Wal {
    /// Open (or create) the WAL file at `path`. `entries` is the number of
    /// records already in the file, as counted by [`Wal::replay`].
    pub fn open(path: &Path, entries: u64) -> io::Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        let len = file.metadata()?.len();
        Ok(Self {
            file,
            path: path.to_path_buf(),
            entries,
            len,
            poisoned: false,
        })
    }

    /// Append one event and fsync before returning.
    pub fn append(&mut self, event: &Event) -> io::Result<()> {
        if self.poisoned {
            return Err(io::Error::other("wal poisoned by an earlier failed append"));
        }
        let frame = encode_frame(event)?;
        let written = self
            .file
            .write_all(&frame)
            .and_then(|()| self.file.sync_all());
        if let Err(e) = written {
            self.rollback();
            return Err(e);
        }
        self.entries += 1;
        self.len += frame.len() as u64;
        Ok(())
    }

    /// Drop whatever part of a failed frame reached the file.
    fn rollback(&mut self) {
        let undone = self.file.set_len(self.len).and_then(|()| self.file.sync_all());
        if let Err(e) = undone {
            tracing::error!(
                "WAL {}: could not discard failed append: {e}; refusing further appends",
                self.path.display()
            );
            self.poisoned = true;
        }
    }

    /// Records currently in the log, including ones superseded by later events.
    pub fn entries(&self) -> u64 {
        self.entries
    }

    /// Replace the log with `events`: write a temp file, fsync, then rename over the WAL.
    pub fn compact(&mut self, events: &[Event]) -> io::Result<()> {
        let tmp_path = self.path.with_extension("wal.tmp");
        let mut len = 0u64;
        {
            let mut writer = BufWriter::new(File::create(&tmp_path)?);
            for event in events {
                let frame = encode_frame(event)?;
                writer.write_all(&frame)?;
                len += frame.len() as u64;
            }
            writer.flush()?;
            writer.get_ref().sync_all()?;
        }
        fs::rename(&tmp_path, &self.path)?;
        self.file = OpenOptions::new().create(true).append(true).open(&self.path)?;
        self.entries = events.len() as u64;
        self.len = len;
        self.poisoned = false;
        Ok(())
    }

    /// Replay the WAL from disk, returning all valid events.
    /// Replay stops at the first truncated or corrupt entry.
    pub fn replay(path: &Path) -> io::Result<Vec<Event>> {
        Self::replay_prefix(path).map(|(events, _)| events)
    }

    /// Replay, then cut any torn or corrupt tail off the file so later
    /// appends are not stranded behind it.
    pub fn recover(path: &Path) -> io::Result<Vec<Event>> {
        let (events, valid_len) = Self::replay_prefix(path)?;
        if let Ok(meta) = fs::metadata(path)
            && meta.len() > valid_len
        {
            tracing::warn!(
                "WAL {}: dropping {} trailing bytes",
                path.display(),
                meta.len() - valid_len
            );
            let file = OpenOptions::new().write(true).open(path)?;
            file.set_len(valid_len)?;
            file.sync_all()?;
        }
        Ok(events)
    }

    /// Valid events plus the byte length of the prefix holding them.
    fn replay_prefix(path: &Path) -> io::Result<(Vec<Event>, u64)> {
        let file = match File::open(path) {
            Ok(f) => f,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok((Vec::new(), 0)),
            Err(e) => return Err(e),
        };
        let mut reader = BufReader::new(file);
        let mut events = Vec::new();
        let mut valid_len = 0u64;

        while let Some((payload, stored_crc)) = read_frame(&mut reader)? {
            if crc32fast::hash(&payload) != stored_crc {
                tracing::warn!("WAL {}: crc mismatch after {} entries, ignoring tail", path.display(), events.len());
                break;
            }
            match bincode::deserialize::<Event>(&payload) {
                Ok(event) => events.push(event),
                Err(e) => {
                    tracing::warn!("WAL {}: undecodable entry after {} entries: {e}", path.display(), events.len());
                    break;
                }
            }
            valid_len += 8 + payload.len() as u64;
        }

        Ok((events, valid_len))
    }
}
