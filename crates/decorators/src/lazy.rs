//! Lazily computed, per-instance cached values.
//!
//! A [`LazyProperty`] is a field of the owning struct. The first read runs
//! the computation and stores the result; every later read returns the stored
//! value. The slot is never invalidated, so the cache lives as long as the
//! owner.
//!
//! ```ignore
//! struct ReportManager {
//!     profiles: LazyProperty<Vec<Profile>>,
//! }
//!
//! impl ReportManager {
//!     fn profiles(&self) -> &[Profile] {
//!         self.profiles.get_or_init(|| self.load_profiles())
//!     }
//! }
//! ```

use std::fmt;

use once_cell::{sync, unsync};

/// Single-threaded lazy slot. Not `Sync`.
pub struct LazyProperty<T> {
    name: &'static str,
    cell: unsync::OnceCell<T>,
}

impl<T> LazyProperty<T> {
    /// An empty slot for the attribute called `name`.
    pub const fn new(name: &'static str) -> Self {
        Self {
            name,
            cell: unsync::OnceCell::new(),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Private key the cached value is stored under: `_lazy_<name>`.
    pub fn slot_key(&self) -> String {
        slot_key(self.name)
    }

    /// Return the cached value, computing it on first access.
    pub fn get_or_init<F>(&self, compute: F) -> &T
    where
        F: FnOnce() -> T,
    {
        self.cell.get_or_init(|| {
            tracing::trace!(slot = %slot_key(self.name), "computing lazy attribute");
            compute()
        })
    }

    /// Fallible variant. An error is returned as-is and nothing is cached, so
    /// a later call runs the computation again.
    pub fn get_or_try_init<F, E>(&self, compute: F) -> Result<&T, E>
    where
        F: FnOnce() -> Result<T, E>,
    {
        self.cell.get_or_try_init(|| {
            tracing::trace!(slot = %slot_key(self.name), "computing lazy attribute");
            compute()
        })
    }

    /// The cached value, without computing it.
    pub fn get(&self) -> Option<&T> {
        self.cell.get()
    }

    pub fn is_computed(&self) -> bool {
        self.cell.get().is_some()
    }

    pub fn into_inner(self) -> Option<T> {
        self.cell.into_inner()
    }
}

impl<T: fmt::Debug> fmt::Debug for LazyProperty<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LazyProperty")
            .field("slot", &self.slot_key())
            .field("value", &self.cell.get())
            .finish()
    }
}

impl<T: Clone> Clone for LazyProperty<T> {
    fn clone(&self) -> Self {
        Self {
            name: self.name,
            cell: self.cell.clone(),
        }
    }
}

/// Thread-safe lazy slot.
///
/// Concurrent first readers block until one of them has run the computation;
/// it runs at most once.
pub struct SyncLazyProperty<T> {
    name: &'static str,
    cell: sync::OnceCell<T>,
}

impl<T> SyncLazyProperty<T> {
    pub const fn new(name: &'static str) -> Self {
        Self {
            name,
            cell: sync::OnceCell::new(),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn slot_key(&self) -> String {
        slot_key(self.name)
    }

    pub fn get_or_init<F>(&self, compute: F) -> &T
    where
        F: FnOnce() -> T,
    {
        self.cell.get_or_init(|| {
            tracing::trace!(slot = %slot_key(self.name), "computing lazy attribute");
            compute()
        })
    }

    /// Fallible variant; errors are not cached.
    pub fn get_or_try_init<F, E>(&self, compute: F) -> Result<&T, E>
    where
        F: FnOnce() -> Result<T, E>,
    {
        self.cell.get_or_try_init(|| {
            tracing::trace!(slot = %slot_key(self.name), "computing lazy attribute");
            compute()
        })
    }

    pub fn get(&self) -> Option<&T> {
        self.cell.get()
    }

    pub fn is_computed(&self) -> bool {
        self.cell.get().is_some()
    }
}

impl<T: fmt::Debug> fmt::Debug for SyncLazyProperty<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SyncLazyProperty")
            .field("slot", &self.slot_key())
            .field("value", &self.cell.get())
            .finish()
    }
}

fn slot_key(name: &str) -> String {
    format!("_lazy_{name}")
}

/// Memoize a zero-argument getter. The getter runs on the first dereference.
pub fn memoize<T, F>(getter: F) -> unsync::Lazy<T, F>
where
    F: FnOnce() -> T,
{
    unsync::Lazy::new(getter)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::thread;

    struct Foo {
        computations: Cell<u32>,
        lazy_thing: LazyProperty<String>,
    }

    impl Foo {
        fn new() -> Self {
            Self {
                computations: Cell::new(0),
                lazy_thing: LazyProperty::new("lazy_thing"),
            }
        }

        fn lazy_thing(&self) -> &str {
            self.lazy_thing.get_or_init(|| {
                self.computations.set(self.computations.get() + 1);
                format!("lazy-{}", self.computations.get())
            })
        }
    }

    #[test]
    fn computes_once_on_first_read() {
        let foo = Foo::new();
        assert!(!foo.lazy_thing.is_computed());
        assert_eq!(foo.lazy_thing.slot_key(), "_lazy_lazy_thing");

        for _ in 0..5 {
            assert_eq!(foo.lazy_thing(), "lazy-1");
        }

        assert!(foo.lazy_thing.is_computed());
        assert_eq!(foo.computations.get(), 1);
    }

    #[test]
    fn storage_is_per_instance() {
        let a = Foo::new();
        let b = Foo::new();

        a.lazy_thing();
        assert!(a.lazy_thing.is_computed());
        assert!(!b.lazy_thing.is_computed());

        b.lazy_thing();
        assert_eq!(a.computations.get(), 1);
        assert_eq!(b.computations.get(), 1);
    }

    #[test]
    fn failures_are_not_cached() {
        let slot: LazyProperty<u32> = LazyProperty::new("flaky");
        let calls = Cell::new(0);

        let first: Result<&u32, String> = slot.get_or_try_init(|| {
            calls.set(calls.get() + 1);
            Err("not yet".to_string())
        });
        assert_eq!(first, Err("not yet".to_string()));
        assert!(!slot.is_computed());

        let second: Result<&u32, String> = slot.get_or_try_init(|| {
            calls.set(calls.get() + 1);
            Ok(42)
        });
        assert_eq!(second, Ok(&42));
        assert_eq!(calls.get(), 2);
        assert_eq!(slot.get(), Some(&42));
    }

    #[test]
    fn memoize_defers_until_first_deref() {
        let calls = Cell::new(0);
        let value = memoize(|| {
            calls.set(calls.get() + 1);
            "computed"
        });

        assert_eq!(calls.get(), 0);
        assert_eq!(*value, "computed");
        assert_eq!(*value, "computed");
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn sync_slot_computes_once_across_threads() {
        let slot = Arc::new(SyncLazyProperty::new("shared"));
        let calls = Arc::new(AtomicUsize::new(0));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let slot = Arc::clone(&slot);
                let calls = Arc::clone(&calls);
                thread::spawn(move || {
                    *slot.get_or_init(|| {
                        calls.fetch_add(1, Ordering::SeqCst);
                        99u64
                    })
                })
            })
            .collect();

        for handle in handles {
            assert_eq!(handle.join().unwrap(), 99);
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(slot.name(), "shared");
    }

    #[test]
    fn sync_failures_are_not_cached() {
        let slot: SyncLazyProperty<u32> = SyncLazyProperty::new("token");
        let calls = AtomicUsize::new(0);

        let first: Result<&u32, String> = slot.get_or_try_init(|| {
            calls.fetch_add(1, Ordering::SeqCst);
            Err("expired".to_string())
        });
        assert_eq!(first, Err("expired".to_string()));
        assert!(!slot.is_computed());

        let second: Result<&u32, String> = slot.get_or_try_init(|| {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok(7)
        });
        assert_eq!(second, Ok(&7));
        assert_eq!(slot.get_or_init(|| 0), &7);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn debug_shows_slot_key_and_state() {
        let foo = Foo::new();
        assert_eq!(
            format!("{:?}", foo.lazy_thing),
            r#"LazyProperty { slot: "_lazy_lazy_thing", value: None }"#
        );

        foo.lazy_thing();
        assert_eq!(
            format!("{:?}", foo.lazy_thing),
            r#"LazyProperty { slot: "_lazy_lazy_thing", value: Some("lazy-1") }"#
        );
        assert_eq!(SyncLazyProperty::<u8>::new("token").slot_key(), "_lazy_token");
    }
}
