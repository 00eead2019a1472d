//! The pluggable lock abstraction.

/// A raw mutual-exclusion primitive with no data attached.
///
/// This is the seam that lets a structure choose between spinning and
/// blocking without changing its code. Wrap it in [`Mutex`](crate::Mutex)
/// to get guard-based access to protected data.
///
/// # Safety
///
/// Implementors must guarantee mutual exclusion: between a successful
/// [`lock`](RawLock::lock) (or `try_lock` returning `true`) and the matching
/// [`unlock`](RawLock::unlock), no other caller may acquire the lock.
/// Acquiring must synchronize-with the previous release (acquire/release
/// semantics), so writes made while holding the lock are visible to the next
/// holder.
pub unsafe trait RawLock: Send + Sync {
    /// Acquires the lock, waiting as long as necessary.
    ///
    /// Locks are not reentrant: calling this while already holding the lock
    /// deadlocks.
    fn lock(&self);

    /// Attempts to acquire the lock without waiting.
    ///
    /// Returns `true` if the lock was acquired.
    fn try_lock(&self) -> bool;

    /// Releases the lock.
    ///
    /// # Safety
    ///
    /// The caller must currently hold the lock.
    unsafe fn unlock(&self);
}
