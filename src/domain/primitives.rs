//! Domain primitives: typed ids and the 0–100 share percentage.

use super::Decimal;
use rust_decimal::Decimal as RustDecimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

macro_rules! uuid_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub Uuid);

        impl $name {
            pub fn new(id: Uuid) -> Self {
                $name(id)
            }

            /// Fresh random id, used by producers and fixtures.
            pub fn random() -> Self {
                $name(Uuid::new_v4())
            }

            pub fn as_uuid(&self) -> &Uuid {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl FromStr for $name {
            type Err = uuid::Error;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Uuid::parse_str(s.trim()).map($name)
            }
        }
    };
}

uuid_id!(
    /// Id of any reseller node (comercializadora, subdistribuidor, agencia, taquilla).
    NodeId
);
uuid_id!(LotteryId);
uuid_id!(BetId);
uuid_id!(ResultId);

/// A contractual share, stored and consumed as 0–100 (not 0–1).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "Decimal", into = "Decimal")]
pub struct Percent(Decimal);

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("percentage must be within 0..=100, got {0}")]
pub struct PercentError(pub Decimal);

impl Percent {
    pub fn new(value: Decimal) -> Result<Self, PercentError> {
        if value.is_negative() || value > Decimal::from(100) {
            return Err(PercentError(value));
        }
        Ok(Percent(value))
    }

    pub fn zero() -> Self {
        Percent(Decimal::zero())
    }

    pub fn value(&self) -> Decimal {
        self.0
    }

    /// `amount × (self / 100)`.
    pub fn of(&self, amount: Decimal) -> Decimal {
        Decimal::new(amount.inner() * self.0.inner() / RustDecimal::ONE_HUNDRED)
    }
}

impl TryFrom<Decimal> for Percent {
    type Error = PercentError;

    fn try_from(value: Decimal) -> Result<Self, Self::Error> {
        Percent::new(value)
    }
}

impl From<Percent> for Decimal {
    fn from(value: Percent) -> Self {
        value.0
    }
}

impl fmt::Display for Percent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}%", self.0)
    }
}
