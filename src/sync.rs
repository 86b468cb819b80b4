//! Strategy-parameterized lock acquisition, ported from the teacher's
//! `util/sync.rs`. Chunk data access goes through this rather than calling
//! `parking_lot` directly, so callers pick a blocking policy per call site
//! instead of every call silently blocking forever.

use std::time::Duration;

use thiserror::Error;

/// The strategy to use when acquiring a lock over chunk data.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum LockStrategy {
    /// Block for at most the given duration, erroring past that.
    Timeout(Duration),
    /// Block indefinitely. Never errors, but can deadlock if misused.
    Blocking,
    /// Acquire the lock only if it's immediately free.
    Immediate,
}

/// Failure mode for a [`LockStrategy`]-governed lock attempt.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StrategySyncError {
    #[error("timed out after waiting {0:?} for lock")]
    Timeout(Duration),
    #[error("could not acquire lock immediately")]
    ImmediateFailure,
}

/// Implemented for read-write locks that can honor a [`LockStrategy`].
pub trait StrategicReadLock {
    type RGuard<'a>
    where
        Self: 'a;

    fn strategic_read(&self, strategy: LockStrategy) -> Result<Self::RGuard<'_>, StrategySyncError>;
}

/// Implemented for locks that can honor a [`LockStrategy`] for exclusive access.
pub trait StrategicWriteLock {
    type WGuard<'a>
    where
        Self: 'a;

    fn strategic_write(&self, strategy: LockStrategy) -> Result<Self::WGuard<'_>, StrategySyncError>;
}

impl<T> StrategicReadLock for parking_lot::RwLock<T> {
    type RGuard<'a> = parking_lot::RwLockReadGuard<'a, T> where T: 'a;

    #[inline]
    fn strategic_read(&self, strategy: LockStrategy) -> Result<Self::RGuard<'_>, StrategySyncError> {
        match strategy {
            LockStrategy::Timeout(dur) => self.try_read_for(dur).ok_or(StrategySyncError::Timeout(dur)),
            LockStrategy::Immediate => self.try_read().ok_or(StrategySyncError::ImmediateFailure),
            LockStrategy::Blocking => Ok(self.read()),
        }
    }
}

impl<T> StrategicWriteLock for parking_lot::RwLock<T> {
    type WGuard<'a> = parking_lot::RwLockWriteGuard<'a, T> where T: 'a;

    #[inline]
    fn strategic_write(&self, strategy: LockStrategy) -> Result<Self::WGuard<'_>, StrategySyncError> {
        match strategy {
            LockStrategy::Timeout(dur) => self.try_write_for(dur).ok_or(StrategySyncError::Timeout(dur)),
            LockStrategy::Immediate => self.try_write().ok_or(StrategySyncError::ImmediateFailure),
            LockStrategy::Blocking => Ok(self.write()),
        }
    }
}

impl<T> StrategicWriteLock for parking_lot::Mutex<T> {
    type WGuard<'a> = parking_lot::MutexGuard<'a, T> where T: 'a;

    #[inline]
    fn strategic_write(&self, strategy: LockStrategy) -> Result<Self::WGuard<'_>, StrategySyncError> {
        match strategy {
            LockStrategy::Timeout(dur) => self.try_lock_for(dur).ok_or(StrategySyncError::Timeout(dur)),
            LockStrategy::Immediate => self.try_lock().ok_or(StrategySyncError::ImmediateFailure),
            LockStrategy::Blocking => Ok(self.lock()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn immediate_strategy_fails_when_lock_is_held() {
        let lock = parking_lot::RwLock::new(0u32);
        let _guard = lock.write();
        let err = lock.strategic_read(LockStrategy::Immediate).unwrap_err();
        assert_eq!(err, StrategySyncError::ImmediateFailure);
    }

    #[test]
    fn blocking_strategy_succeeds_when_free() {
        let lock = parking_lot::RwLock::new(0u32);
        assert!(lock.strategic_read(LockStrategy::Blocking).is_ok());
    }
}
