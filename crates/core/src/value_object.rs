//! Value objects: equality by value, not identity.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::{DomainError, DomainResult};

/// Marker trait for value objects.
///
/// Value objects are immutable and compared by their attribute values. To
/// "modify" one, build a new one.
pub trait ValueObject: Clone + PartialEq + core::fmt::Debug {}

/// A percentage in the closed range `0..=100`.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "Decimal", into = "Decimal")]
pub struct Percent(Decimal);

impl Percent {
    pub const ZERO: Percent = Percent(Decimal::ZERO);
    pub const HUNDRED: Percent = Percent(Decimal::ONE_HUNDRED);

    pub fn new(value: Decimal) -> DomainResult<Self> {
        if value < Decimal::ZERO || value > Decimal::ONE_HUNDRED {
            return Err(DomainError::validation(format!(
                "percent must be within 0..=100 (got {value})"
            )));
        }
        Ok(Self(value))
    }

    pub fn value(self) -> Decimal {
        self.0
    }

    /// `amount * self / 100`, or `None` when it does not fit in a `Decimal`.
    pub fn of(self, amount: Decimal) -> Option<Decimal> {
        amount.checked_mul(self.0.checked_div(Decimal::ONE_HUNDRED)?)
    }

    /// `1 - self / 100`, the multiplier left after applying this as a discount.
    pub fn complement_factor(self) -> Decimal {
        Decimal::ONE - self.0 / Decimal::ONE_HUNDRED
    }
}

impl TryFrom<Decimal> for Percent {
    type Error = DomainError;

    fn try_from(value: Decimal) -> Result<Self, Self::Error> {
        Percent::new(value)
    }
}

impl From<Percent> for Decimal {
    fn from(value: Percent) -> Self {
        value.0
    }
}

impl core::fmt::Display for Percent {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}%", self.0)
    }
}

impl ValueObject for Percent {}

/// A value that is either derived by the system or entered by a user.
///
/// Replaces "boolean toggle + raw value" pairs: the variant says which value is
/// authoritative, and there is never a stale hidden value next to it.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", content = "value", rename_all = "lowercase")]
pub enum Override<T> {
    Auto(T),
    Manual(T),
}

impl<T> Override<T> {
    /// Manual wins when present, otherwise the derived value.
    pub fn resolve(manual: Option<T>, derived: T) -> Self {
        match manual {
            Some(v) => Override::Manual(v),
            None => Override::Auto(derived),
        }
    }

    pub fn value(&self) -> &T {
        match self {
            Override::Auto(v) | Override::Manual(v) => v,
        }
    }

    pub fn into_value(self) -> T {
        match self {
            Override::Auto(v) | Override::Manual(v) => v,
        }
    }

    pub fn is_manual(&self) -> bool {
        matches!(self, Override::Manual(_))
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Override<U> {
        match self {
            Override::Auto(v) => Override::Auto(f(v)),
            Override::Manual(v) => Override::Manual(f(v)),
        }
    }
}

impl<T: Clone + PartialEq + core::fmt::Debug> ValueObject for Override<T> {}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn percent_rejects_out_of_range() {
        assert!(Percent::new(dec!(-0.01)).is_err());
        assert!(Percent::new(dec!(100.01)).is_err());
        assert_eq!(Percent::new(dec!(100)).unwrap(), Percent::HUNDRED);
    }

    #[test]
    fn percent_arithmetic() {
        let p = Percent::new(dec!(15)).unwrap();
        assert_eq!(p.of(dec!(200)), Some(dec!(30)));
        assert_eq!(p.complement_factor(), dec!(0.85));
        assert_eq!(Percent::HUNDRED.of(Decimal::MAX), Some(Decimal::MAX));
    }

    #[test]
    fn percent_deserialization_validates() {
        let ok: Percent = serde_json::from_str("\"12.5\"").unwrap();
        assert_eq!(ok.value(), dec!(12.5));
        assert!(serde_json::from_str::<Percent>("\"150\"").is_err());
    }

    #[test]
    fn override_prefers_manual() {
        assert_eq!(Override::resolve(Some(7), 3), Override::Manual(7));
        assert_eq!(Override::resolve(None, 3), Override::Auto(3));
        assert!(Override::Manual(1).is_manual());
        assert_eq!(*Override::Auto(4).value(), 4);
        assert_eq!(Override::Manual(2).map(|v| v * 10), Override::Manual(20));
    }
}
