//! What counts as a normal return.
//!
//! The timing and memory wrappers only log calls that returned normally. A
//! `Result` that is `Err` is a failure, the same as for [`retry`](crate::retry);
//! every other return type implemented here always counts as a normal return.
//! Implement [`Outcome`] with an empty body for your own return types:
//!
//! ```ignore
//! impl Outcome for ReportSummary {}
//! ```

use std::borrow::Cow;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::rc::Rc;
use std::sync::Arc;

/// Classifies a return value as a failure or a normal return.
pub trait Outcome {
    fn is_failure(&self) -> bool {
        false
    }
}

impl<T, E> Outcome for Result<T, E> {
    fn is_failure(&self) -> bool {
        self.is_err()
    }
}

macro_rules! impl_outcome {
    ($($t:ty),* $(,)?) => {
        $(impl Outcome for $t {})*
    };
}

impl_outcome!(
    (), bool, char, u8, u16, u32, u64, u128, usize, i8, i16, i32, i64, i128, isize, f32, f64,
    String, &str,
);

impl<T> Outcome for Option<T> {}
impl<T> Outcome for Vec<T> {}
impl<T: ?Sized> Outcome for Box<T> {}
impl<T: ?Sized> Outcome for Arc<T> {}
impl<T: ?Sized> Outcome for Rc<T> {}
impl<T: ?Sized + ToOwned> Outcome for Cow<'_, T> {}
impl<K, V, S> Outcome for HashMap<K, V, S> {}
impl<T, S> Outcome for HashSet<T, S> {}
impl<K, V> Outcome for BTreeMap<K, V> {}
impl<A, B> Outcome for (A, B) {}
impl<A, B, C> Outcome for (A, B, C) {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_err_is_a_failure() {
        assert!(Err::<u8, &str>("quota exceeded").is_failure());
        assert!(!Ok::<u8, &str>(1).is_failure());
        assert!(!None::<u8>.is_failure());
        assert!(!().is_failure());
        assert!(!vec![1, 2].is_failure());
        assert!(!"row".is_failure());
    }
}
