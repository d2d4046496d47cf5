use std::cmp::Ordering;

/// An element extended with the two list boundaries.
///
/// Variant order gives the total order `NegInfinity < Value(_) < PosInfinity`,
/// so sentinels need no reserved values of `T`.
///
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum Key<T> {
    NegInfinity,
    Value(T),
    PosInfinity,
}

impl<T: Ord> Key<T> {
    /// Compare this key against a plain element without building a `Key`.
    #[inline]
    pub fn cmp_value(&self, value: &T) -> Ordering {
        match self {
            Key::NegInfinity => Ordering::Less,
            Key::Value(key) => key.cmp(value),
            Key::PosInfinity => Ordering::Greater,
        }
    }

    #[inline]
    pub fn is_value(&self, value: &T) -> bool {
        self.cmp_value(value) == Ordering::Equal
    }
}

impl<T> Key<T> {
    #[inline]
    pub fn value(&self) -> Option<&T> {
        match self {
            Key::Value(value) => Some(value),
            _ => None,
        }
    }

    #[inline]
    pub fn is_sentinel(&self) -> bool {
        !matches!(self, Key::Value(_))
    }
}
