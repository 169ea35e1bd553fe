//! Set-once cells for lazily computed package fields.

use anyhow::Result;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::sync::OnceLock;

/// A value computed on first access and never recomputed.
///
/// A failed initialization leaves the cell empty, so the next access retries.
/// Racing initializers may both run; exactly one value is stored and every
/// caller observes it.
pub struct SetOnce<T> {
    cell: OnceLock<T>,
}

impl<T> SetOnce<T> {
    pub fn new() -> Self {
        Self {
            cell: OnceLock::new(),
        }
    }

    pub fn with_value(value: T) -> Self {
        Self {
            cell: OnceLock::from(value),
        }
    }

    pub fn get(&self) -> Option<&T> {
        self.cell.get()
    }

    pub fn is_set(&self) -> bool {
        self.cell.get().is_some()
    }

    pub fn get_or_init<F>(&self, init: F) -> &T
    where
        F: FnOnce() -> T,
    {
        self.cell.get_or_init(init)
    }

    pub fn get_or_try_init<F>(&self, init: F) -> Result<&T>
    where
        F: FnOnce() -> Result<T>,
    {
        if let Some(value) = self.cell.get() {
            return Ok(value);
        }
        let value = init()?;
        Ok(self.cell.get_or_init(|| value))
    }

    /// Drop the stored value. Requires exclusive access.
    pub fn clear(&mut self) {
        self.cell.take();
    }
}

impl<T> Default for SetOnce<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Clone> Clone for SetOnce<T> {
    fn clone(&self) -> Self {
        match self.cell.get() {
            Some(value) => Self::with_value(value.clone()),
            None => Self::new(),
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for SetOnce<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.cell.get() {
            Some(value) => f.debug_tuple("SetOnce").field(value).finish(),
            None => f.write_str("SetOnce(<unset>)"),
        }
    }
}

impl<T: Serialize> Serialize for SetOnce<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.cell.get().serialize(serializer)
    }
}

impl<'de, T: Deserialize<'de>> Deserialize<'de> for SetOnce<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Ok(match Option::<T>::deserialize(deserializer)? {
            Some(value) => Self::with_value(value),
            None => Self::new(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_initializes_once() {
        let cell: SetOnce<u64> = SetOnce::new();
        let calls = AtomicUsize::new(0);

        for _ in 0..3 {
            let value = cell
                .get_or_try_init(|| {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok(42)
                })
                .unwrap();
            assert_eq!(*value, 42);
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_failure_is_not_memoized() {
        let cell: SetOnce<u64> = SetOnce::new();

        assert!(
            cell.get_or_try_init(|| anyhow::bail!("not ready"))
                .is_err()
        );
        assert!(!cell.is_set());

        assert_eq!(*cell.get_or_try_init(|| Ok(7)).unwrap(), 7);
        assert!(cell.is_set());
    }

    #[test]
    fn test_concurrent_first_access() {
        let cell: SetOnce<String> = SetOnce::new();
        std::thread::scope(|s| {
            for i in 0..8 {
                let cell = &cell;
                s.spawn(move || {
                    cell.get_or_try_init(|| Ok(format!("value-{}", i))).unwrap();
                });
            }
        });
        let stored = cell.get().unwrap().clone();
        // Every later access observes the one stored value
        assert_eq!(cell.get_or_try_init(|| Ok("other".to_string())).unwrap(), &stored);
    }

    #[test]
    fn test_clear_and_clone() {
        let mut cell = SetOnce::with_value(1u64);
        let copy = cell.clone();
        cell.clear();
        assert!(!cell.is_set());
        assert_eq!(copy.get(), Some(&1));
    }

    #[test]
    fn test_serde_as_option() {
        let cell = SetOnce::with_value(5u64);
        assert_eq!(serde_json::to_string(&cell).unwrap(), "5");
        let empty: SetOnce<u64> = serde_json::from_str("null").unwrap();
        assert!(!empty.is_set());
    }
}
