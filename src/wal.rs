use std::fs::{self, File, OpenOptions};
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};

use tracing::warn;

use crate::limits::MAX_WAL_FRAME_BYTES;
use crate::model::Event;

/// Encode a single event as `[len][bincode][crc32]`.
fn encode_event(writer: &mut impl Write, event: &Event) -> io::Result<()> {
    let payload =
        bincode::serialize(event).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
    if payload.len() > MAX_WAL_FRAME_BYTES {
        return Err(io::Error::new(io::ErrorKind::InvalidData, "event too large"));
    }
    writer.write_all(&(payload.len() as u32).to_le_bytes())?;
    writer.write_all(&payload)?;
    writer.write_all(&crc32fast::hash(&payload).to_le_bytes())?;
    Ok(())
}

/// Read `buf.len()` bytes. `Ok(false)` on a clean or partial end of file.
fn read_full(reader: &mut impl Read, buf: &mut [u8]) -> io::Result<bool> {
    match reader.read_exact(buf) {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => Ok(false),
        Err(e) => Err(e),
    }
}

/// Next intact event and its encoded size, or `None` at end of log or at the
/// first damaged entry. An oversized length word counts as damage.
fn read_frame(reader: &mut impl Read) -> io::Result<Option<(Event, u64)>> {
    let mut word = [0u8; 4];
    if !read_full(reader, &mut word)? {
        return Ok(None);
    }
    let len = u32::from_le_bytes(word) as usize;
    if len > MAX_WAL_FRAME_BYTES {
        return Ok(None);
    }
    let mut payload = vec![0u8; len];
    if !read_full(reader, &mut payload)? || !read_full(reader, &mut word)? {
        return Ok(None);
    }
    if u32::from_le_bytes(word) != crc32fast::hash(&payload) {
        return Ok(None);
    }
    Ok(bincode::deserialize::<Event>(&payload)
        .ok()
        .map(|event| (event, 8 + len as u64)))
}

/// Intact events in order, plus the byte length of that intact prefix.
fn scan(reader: &mut impl Read) -> io::Result<(Vec<Event>, u64)> {
    let mut events = Vec::new();
    let mut valid_len = 0;
    while let Some((event, size)) = read_frame(reader)? {
        events.push(event);
        valid_len += size;
    }
    Ok((events, valid_len))
}

/// File underneath the log.
pub trait LogFile: Write + Send {
    fn sync(&self) -> io::Result<()>;
    fn byte_len(&self) -> io::Result<u64>;
    fn truncate(&mut self, len: u64) -> io::Result<()>;
}

impl LogFile for File {
    fn sync(&self) -> io::Result<()> {
        self.sync_all()
    }

    fn byte_len(&self) -> io::Result<u64> {
        Ok(self.metadata()?.len())
    }

    fn truncate(&mut self, len: u64) -> io::Result<()> {
        self.set_len(len)
    }
}

/// Append-only write-ahead log of capacity changes and confirmed stays.
///
/// Entry format: `[u32 LE: payload len][bincode Event][u32 LE: crc32 of payload]`.
/// Appends are staged in memory and reach the file in `flush_sync`. A failed
/// flush truncates the file back to its last durable length, so an entry the
/// caller saw fail never comes back on replay.
pub struct Wal {
    file: Box<dyn LogFile>,
    path: PathBuf,
    /// Encoded entries not yet written.
    pending: Vec<u8>,
    pending_appends: u64,
    /// File length after the last successful flush.
    durable_len: u64,
    appends_since_compact: u64,
}

impl Wal {
    /// Open for appends. A damaged tail left by a crash is cut off first so
    /// new entries land right after the last intact one.
    pub fn open(path: &Path) -> io::Result<Self> {
        let mut file = OpenOptions::new()
            .create(true)
            .read(true)
            .append(true)
            .open(path)?;
        let (_, valid_len) = scan(&mut BufReader::new(&file))?;
        let file_len = LogFile::byte_len(&file)?;
        if file_len > valid_len {
            warn!(
                "{}: dropping {} bytes after the last intact entry",
                path.display(),
                file_len - valid_len
            );
            LogFile::truncate(&mut file, valid_len)?;
            file.sync_all()?;
        }
        Ok(Self::with_file(path, Box::new(file), valid_len))
    }

    fn with_file(path: &Path, file: Box<dyn LogFile>, durable_len: u64) -> Self {
        Self {
            file,
            path: path.to_path_buf(),
            pending: Vec::new(),
            pending_appends: 0,
            durable_len,
            appends_since_compact: 0,
        }
    }

    /// Append and fsync in one step.
    #[cfg(test)]
    pub fn append(&mut self, event: &Event) -> io::Result<()> {
        self.append_buffered(event)?;
        self.flush_sync()
    }

    /// Stage an event. Not durable until `flush_sync`.
    pub fn append_buffered(&mut self, event: &Event) -> io::Result<()> {
        let mark = self.pending.len();
        if let Err(e) = encode_event(&mut self.pending, event) {
            self.pending.truncate(mark);
            return Err(e);
        }
        self.pending_appends += 1;
        Ok(())
    }

    /// Forget staged entries without writing them.
    pub fn discard_pending(&mut self) {
        self.pending.clear();
        self.pending_appends = 0;
    }

    /// Write and fsync everything staged. On failure the staged entries are
    /// dropped and the file is cut back to its last durable length.
    pub fn flush_sync(&mut self) -> io::Result<()> {
        let bytes = self.pending.len() as u64;
        let appends = self.pending_appends;
        let written = self
            .file
            .write_all(&self.pending)
            .and_then(|()| self.file.flush())
            .and_then(|()| self.file.sync());
        self.discard_pending();

        match written {
            Ok(()) => {
                self.durable_len += bytes;
                self.appends_since_compact += appends;
                Ok(())
            }
            Err(e) => {
                let rolled_back = self
                    .file
                    .truncate(self.durable_len)
                    .and_then(|()| self.file.sync());
                match rolled_back {
                    Ok(()) => Err(e),
                    Err(t) => Err(io::Error::new(
                        e.kind(),
                        format!("{e}; truncating back to {} bytes failed: {t}", self.durable_len),
                    )),
                }
            }
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn compact_tmp_path(path: &Path) -> PathBuf {
        path.with_extension("wal.tmp")
    }

    /// Write the compacted event list next to the log and fsync it.
    pub fn write_compact_file(path: &Path, events: &[Event]) -> io::Result<()> {
        let mut writer = BufWriter::new(File::create(Self::compact_tmp_path(path))?);
        for event in events {
            encode_event(&mut writer, event)?;
        }
        writer.flush()?;
        writer.get_ref().sync_all()
    }

    /// Rename the compacted file over the log and reopen it for appends.
    pub fn swap_compact_file(&mut self) -> io::Result<()> {
        fs::rename(Self::compact_tmp_path(&self.path), &self.path)?;
        let file = OpenOptions::new().create(true).append(true).open(&self.path)?;
        self.durable_len = LogFile::byte_len(&file)?;
        self.file = Box::new(file);
        self.discard_pending();
        self.appends_since_compact = 0;
        Ok(())
    }

    #[cfg(test)]
    pub fn compact(&mut self, events: &[Event]) -> io::Result<()> {
        Self::write_compact_file(&self.path, events)?;
        self.swap_compact_file()
    }

    pub fn appends_since_compact(&self) -> u64 {
        self.appends_since_compact
    }

    /// Count entries a previous process appended after its last compaction.
    pub fn carry_appends(&mut self, appends: u64) {
        self.appends_since_compact += appends;
    }

    /// Capacity and stay entries after the last `Compacted` marker.
    pub fn appends_after_snapshot(events: &[Event]) -> u64 {
        events
            .iter()
            .rev()
            .take_while(|e| !matches!(e, Event::Compacted))
            .filter(|e| matches!(e, Event::CapacitySet { .. } | Event::StayBooked { .. }))
            .count() as u64
    }

    /// All intact events in append order. A missing file is an empty log.
    pub fn replay(path: &Path) -> io::Result<Vec<Event>> {
        let file = match File::open(path) {
            Ok(f) => f,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e),
        };
        let (events, _) = scan(&mut BufReader::new(file))?;
        Ok(events)
    }
}
