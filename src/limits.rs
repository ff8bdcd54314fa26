/// Longest stay accepted by the engine, in nights.
pub const MAX_STAY_NIGHTS: i64 = 730;

pub const MAX_HOLDER_NAME_LEN: usize = 256;

pub const MAX_CONTACT_LEN: usize = 64;

/// WAL channel depth before `book_stay` callers start waiting on the writer.
pub const WAL_CHANNEL_CAPACITY: usize = 4096;

/// Largest encoded event a WAL frame may hold. Bigger length words are treated as damage.
pub const MAX_WAL_FRAME_BYTES: usize = 16 * 1024 * 1024;
