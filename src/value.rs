use std::fmt;

/// # Numeric setting value
///
/// Number types that can back a [NumericSetting](crate::settings::NumericSetting).
pub trait SettingNumber: Copy + PartialOrd + Default + fmt::Debug + Send + Sync + 'static {
    /// False for values that compare to nothing, such as floating point NaN
    fn is_comparable(self) -> bool {
        self.partial_cmp(&self).is_some()
    }
}

macro_rules! number_impl {
    ($ty:ident) => {
        impl SettingNumber for $ty {}
    };
}

number_impl!(i32);
number_impl!(i64);
number_impl!(u32);
number_impl!(f32);
number_impl!(f64);

/// # Closed range of numeric values
///
/// Bounds reported by the device for a numeric setting. The range is always ordered: building it from
/// inverted bounds swaps them.
/// ```
/// # use groundsdk_core::IntRange;
/// let range = IntRange::of(10, 1);
/// assert_eq!((range.min(), range.max()), (1, 10));
/// assert_eq!(range.clamp(42), 10);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Range<T> {
    min: T,
    max: T,
}

/// Integer range
pub type IntRange = Range<i32>;

/// Floating point range
pub type DoubleRange = Range<f64>;

impl<T: SettingNumber> Range<T> {
    /// Range from `min` to `max`, both included
    pub fn of(min: T, max: T) -> Self {
        if max < min {
            Self { min: max, max: min }
        } else {
            Self { min, max }
        }
    }

    /// Lower bound
    pub fn min(&self) -> T {
        self.min
    }

    /// Upper bound
    pub fn max(&self) -> T {
        self.max
    }

    /// True if `value` lies within the range
    pub fn contains(&self, value: T) -> bool {
        self.min <= value && value <= self.max
    }

    /// Closest value to `value` within the range
    pub fn clamp(&self, value: T) -> T {
        if value < self.min {
            self.min
        } else if value > self.max {
            self.max
        } else {
            value
        }
    }
}

impl<T: fmt::Display> fmt::Display for Range<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {}]", self.min, self.max)
    }
}
