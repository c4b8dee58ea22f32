//! Option values that remember whether the declaration set them

use serde::Serialize;

/// A resolved option value plus its provenance.
///
/// `explicit` is true when the mapping declaration set the value, false when
/// it came from a type default or an index setting. Merges only carry over
/// explicit values, and serialization only emits them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Explicit<T> {
    value: T,
    explicit: bool,
}

impl<T: Copy> Explicit<T> {
    pub fn new(value: T, explicit: bool) -> Self {
        Self { value, explicit }
    }

    pub fn explicit(value: T) -> Self {
        Self::new(value, true)
    }

    pub fn implicit(value: T) -> Self {
        Self::new(value, false)
    }

    pub fn value(&self) -> T {
        self.value
    }

    pub fn is_explicit(&self) -> bool {
        self.explicit
    }

    /// Declared value if present, otherwise the fallback marked implicit
    pub fn or_default(declared: Option<T>, fallback: T) -> Self {
        match declared {
            Some(value) => Self::explicit(value),
            None => Self::implicit(fallback),
        }
    }

    /// Merge rule for updatable options: an explicit incoming value wins
    pub fn merged_with(&self, incoming: &Explicit<T>) -> Self {
        if incoming.explicit {
            *incoming
        } else {
            *self
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_or_default_provenance() {
        let declared = Explicit::or_default(Some(true), false);
        assert!(declared.value());
        assert!(declared.is_explicit());

        let defaulted = Explicit::or_default(None, false);
        assert!(!defaulted.value());
        assert!(!defaulted.is_explicit());
    }

    #[test]
    fn test_merge_keeps_existing_unless_explicit() {
        let current = Explicit::explicit(true);
        assert!(current.merged_with(&Explicit::implicit(false)).value());
        assert!(!current.merged_with(&Explicit::explicit(false)).value());
    }
}
