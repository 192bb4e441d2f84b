//! Type aliases for the tsuji core.
//!
//! Centralized aliases for the synchronization primitives used throughout the
//! router. All internal code imports its locks from here so the whole crate
//! speaks one lock vocabulary.
//!
//! We use `parking_lot` for all synchronization primitives: no lock
//! poisoning, faster than `std::sync`, and a smaller footprint. Guards are
//! obtained without `unwrap()`.

/// RwLock used by the registry during the build phase and by the optional
/// match cache (parking_lot implementation).
///
/// # Example
///
/// ```rust
/// use tsuji_core::alias::PRwLock;
///
/// let lock = PRwLock::new(vec![1, 2, 3]);
/// let guard = lock.read();
/// assert_eq!(guard[0], 1);
/// ```
pub use parking_lot::RwLock as PRwLock;

/// Read guard for [`PRwLock`].
pub use parking_lot::RwLockReadGuard as PRwLockReadGuard;

/// Write guard for [`PRwLock`].
pub use parking_lot::RwLockWriteGuard as PRwLockWriteGuard;

/// Mutex counterpart of [`PRwLock`]. Never poisons.
pub use parking_lot::Mutex as PMutex;

/// Mutex guard for [`PMutex`].
pub use parking_lot::MutexGuard as PMutexGuard;
