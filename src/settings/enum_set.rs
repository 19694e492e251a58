//! # Closed enumerations and their sets
//!
//! Settings over enumerations track the values the device currently supports in an [EnumSet], a fixed size bit
//! set ordered like the enumeration declaration. Iteration order is stable so that changes can be detected by
//! comparing sets.

use std::fmt;
use std::marker::PhantomData;

/// Closed enumeration usable in an [EnumSet]
///
/// ```
/// use groundsdk_core::settings::SettingEnum;
///
/// #[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// enum Environment {
///     Indoor,
///     Outdoor,
/// }
///
/// impl SettingEnum for Environment {
///     const ALL: &'static [Self] = &[Environment::Indoor, Environment::Outdoor];
/// }
///
/// assert_eq!(Environment::Outdoor.index(), 1);
/// ```
pub trait SettingEnum: Copy + Eq + fmt::Debug + Send + Sync + 'static {
    /// Every value of the enumeration, in declaration order. At most 64 values.
    const ALL: &'static [Self];

    /// Position of the value in [SettingEnum::ALL]
    fn index(self) -> usize {
        Self::ALL.iter().position(|value| *value == self).unwrap_or_default()
    }

    /// First declared value, the default value of enum settings
    fn first() -> Self {
        Self::ALL[0]
    }
}

/// Set of values of a [SettingEnum]
pub struct EnumSet<E> {
    bits: u64,
    _values: PhantomData<E>,
}

impl<E: SettingEnum> EnumSet<E> {
    fn bit(value: E) -> u64 {
        debug_assert!(E::ALL.len() <= 64, "enumeration too large for an EnumSet");
        1 << value.index()
    }

    /// Empty set
    pub fn empty() -> Self {
        Self {
            bits: 0,
            _values: PhantomData,
        }
    }

    /// Set of all values
    pub fn all() -> Self {
        E::ALL.iter().copied().collect()
    }

    /// Set of the given values
    pub fn of(values: &[E]) -> Self {
        values.iter().copied().collect()
    }

    /// Add a value. Returns `true` if it was not present.
    pub fn insert(&mut self, value: E) -> bool {
        let before = self.bits;
        self.bits |= Self::bit(value);
        before != self.bits
    }

    /// Remove a value. Returns `true` if it was present.
    pub fn remove(&mut self, value: E) -> bool {
        let before = self.bits;
        self.bits &= !Self::bit(value);
        before != self.bits
    }

    /// True if the set contains `value`
    pub fn contains(&self, value: E) -> bool {
        self.bits & Self::bit(value) != 0
    }

    /// Number of values in the set
    pub fn len(&self) -> usize {
        self.bits.count_ones() as usize
    }

    /// True if the set is empty
    pub fn is_empty(&self) -> bool {
        self.bits == 0
    }

    /// Replace the content of the set. Returns `true` if it changed.
    pub fn replace(&mut self, other: EnumSet<E>) -> bool {
        let changed = self.bits != other.bits;
        self.bits = other.bits;
        changed
    }

    /// Values of both sets
    pub fn union(&self, other: &EnumSet<E>) -> Self {
        Self {
            bits: self.bits | other.bits,
            _values: PhantomData,
        }
    }

    /// Values of the set, in declaration order
    pub fn iter(&self) -> impl Iterator<Item = E> + '_ {
        E::ALL.iter().copied().filter(move |value| self.contains(*value))
    }
}

impl<E> Clone for EnumSet<E> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<E> Copy for EnumSet<E> {}

impl<E> PartialEq for EnumSet<E> {
    fn eq(&self, other: &Self) -> bool {
        self.bits == other.bits
    }
}

impl<E> Eq for EnumSet<E> {}

impl<E: SettingEnum> Default for EnumSet<E> {
    fn default() -> Self {
        Self::empty()
    }
}

impl<E: SettingEnum> FromIterator<E> for EnumSet<E> {
    fn from_iter<I: IntoIterator<Item = E>>(iter: I) -> Self {
        let mut set = Self::empty();
        for value in iter {
            set.insert(value);
        }
        set
    }
}

impl<E: SettingEnum> Extend<E> for EnumSet<E> {
    fn extend<I: IntoIterator<Item = E>>(&mut self, iter: I) {
        for value in iter {
            self.insert(value);
        }
    }
}

impl<E: SettingEnum> fmt::Debug for EnumSet<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}
