use thiserror::Error;

/// Errors returned by map insertion.
///
/// Neither variant signals corruption: on error the map is left exactly as
/// it was before the call.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum MapError {
    /// Storage for a new entry could not be obtained.
    #[error("out of memory: no room for a new entry")]
    OutOfMemory,

    /// The key is present and the map was built with `no_overwrite`.
    #[error("key already exists")]
    AlreadyExists,
}

/// Successful outcome of `add`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Added {
    /// A new entry was created.
    Inserted,
    /// An existing entry's value was replaced; the old value was released.
    Updated,
}

pub type Result<T> = std::result::Result<T, MapError>;

/// Slot arenas address entries with 32-bit indices; the last two are
/// reserved by `slotmap`.
pub(crate) const MAX_ENTRIES: usize = (u32::MAX - 2) as usize;
