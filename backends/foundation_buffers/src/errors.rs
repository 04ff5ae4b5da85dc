// region -- BufferErrors

use core::fmt;

/// A suspended call was abandoned because its buffer (or semaphore) was
/// interrupted while the caller was parked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Interrupted;

impl std::error::Error for Interrupted {}

impl fmt::Display for Interrupted {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "wait interrupted")
    }
}

/// Why an insertion did not take place. The rejected item is always handed
/// back to the caller.
#[derive(PartialEq, Eq)]
pub enum InsertError<T> {
    /// No free slot: the buffer was full (`add`) or stayed full until the
    /// deadline passed (`offer`).
    Full(T),

    /// The caller was parked waiting for a slot when the buffer was
    /// interrupted.
    Interrupted(T),
}

impl<T> InsertError<T> {
    /// Returns the item that could not be inserted.
    #[inline]
    pub fn into_inner(self) -> T {
        match self {
            Self::Full(item) | Self::Interrupted(item) => item,
        }
    }

    #[inline]
    #[must_use]
    pub fn is_full(&self) -> bool {
        matches!(self, Self::Full(_))
    }

    #[inline]
    #[must_use]
    pub fn is_interrupted(&self) -> bool {
        matches!(self, Self::Interrupted(_))
    }
}

// The item type is not required to be `Debug`, same as `std::sync::mpsc::SendError`.
impl<T> fmt::Debug for InsertError<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Full(_) => write!(f, "Full(..)"),
            Self::Interrupted(_) => write!(f, "Interrupted(..)"),
        }
    }
}

impl<T> fmt::Display for InsertError<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Full(_) => write!(f, "buffer is full"),
            Self::Interrupted(_) => write!(f, "insert interrupted while waiting for a free slot"),
        }
    }
}

impl<T> std::error::Error for InsertError<T> {}

// --- end region: BufferErrors

// region -- ConfigError

pub type ConfigResult<T> = core::result::Result<T, ConfigError>;

#[derive(Debug, derive_more::From)]
pub enum ConfigError {
    Io(std::io::Error),

    FailedDeserialization(toml::de::Error),

    #[from(ignore)]
    UnknownStrategy(String),

    #[from(ignore)]
    UnknownMode(String),

    #[from(ignore)]
    Invalid(&'static str),
}

impl std::error::Error for ConfigError {}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{self:?}")
    }
}

// --- end region: ConfigError

// region -- WorkloadError

pub type WorkloadResult<T> = core::result::Result<T, WorkloadError>;

#[derive(Debug, derive_more::From)]
pub enum WorkloadError {
    #[from(ignore)]
    WorkerPanicked(String),

    Spawn(std::io::Error),
}

impl std::error::Error for WorkloadError {}

impl fmt::Display for WorkloadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{self:?}")
    }
}

// --- end region: WorkloadError
