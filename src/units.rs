#![allow(missing_docs)]

//! This module defines various unit types and their conversions.
//!
//! Energies are in kWh, powers in kW (kWp for arrays) unless the type says otherwise, areas in m²
//! and money in the caller's currency.
use serde::{Deserialize, Serialize};

/// Represents a dimensionless quantity.
#[derive(
    Debug,
    Default,
    Clone,
    Copy,
    PartialEq,
    PartialOrd,
    Serialize,
    Deserialize,
    derive_more::Add,
    derive_more::Sub,
    derive_more::AddAssign,
    derive_more::Sum,
)]
pub struct Dimensionless(pub f64);

impl std::ops::Mul for Dimensionless {
    type Output = Dimensionless;

    fn mul(self, rhs: Dimensionless) -> Self::Output {
        Dimensionless(self.0 * rhs.0)
    }
}

impl std::ops::Div for Dimensionless {
    type Output = Dimensionless;

    fn div(self, rhs: Dimensionless) -> Self::Output {
        Dimensionless(self.0 / rhs.0)
    }
}

impl Dimensionless {
    pub fn powi(self, rhs: i32) -> Self {
        Dimensionless(self.0.powi(rhs))
    }

    pub fn value(self) -> f64 {
        self.0
    }

    pub fn is_finite(self) -> bool {
        self.0.is_finite()
    }
}

impl From<f64> for Dimensionless {
    fn from(val: f64) -> Self {
        Self(val)
    }
}

impl From<Dimensionless> for f64 {
    fn from(val: Dimensionless) -> Self {
        val.0
    }
}

impl float_cmp::ApproxEq for Dimensionless {
    type Margin = float_cmp::F64Margin;

    fn approx_eq<M: Into<Self::Margin>>(self, other: Self, margin: M) -> bool {
        self.0.approx_eq(other.0, margin)
    }
}

macro_rules! unit_struct {
    ($name:ident) => {
        /// Represents a type of quantity.
        #[derive(
            Debug,
            Default,
            Clone,
            Copy,
            PartialEq,
            PartialOrd,
            Serialize,
            Deserialize,
            derive_more::Add,
            derive_more::Sub,
            derive_more::AddAssign,
            derive_more::Sum,
        )]
        pub struct $name(pub f64);

        impl $name {
            /// Creates a new instance of the unit type from a f64 value.
            pub fn new(val: f64) -> Self {
                Self(val)
            }

            /// Returns the value of the unit type as a f64.
            pub fn value(self) -> f64 {
                self.0
            }

            /// Whether the underlying value is finite
            pub fn is_finite(self) -> bool {
                self.0.is_finite()
            }

            /// The smaller of two quantities of the same type
            pub fn min(self, other: Self) -> Self {
                Self(self.0.min(other.0))
            }

            /// The larger of two quantities of the same type
            pub fn max(self, other: Self) -> Self {
                Self(self.0.max(other.0))
            }
        }

        impl std::ops::Mul<Dimensionless> for $name {
            type Output = $name;
            fn mul(self, rhs: Dimensionless) -> $name {
                $name(self.0 * rhs.0)
            }
        }

        impl std::ops::Mul<$name> for Dimensionless {
            type Output = $name;
            fn mul(self, rhs: $name) -> $name {
                $name(self.0 * rhs.0)
            }
        }

        impl std::ops::Div<Dimensionless> for $name {
            type Output = $name;
            fn div(self, rhs: Dimensionless) -> $name {
                $name(self.0 / rhs.0)
            }
        }

        impl std::ops::Div for $name {
            type Output = Dimensionless;
            fn div(self, rhs: $name) -> Dimensionless {
                Dimensionless(self.0 / rhs.0)
            }
        }

        impl float_cmp::ApproxEq for $name {
            type Margin = float_cmp::F64Margin;

            fn approx_eq<M: Into<Self::Margin>>(self, other: Self, margin: M) -> bool {
                self.0.approx_eq(other.0, margin)
            }
        }
    };
}

macro_rules! impl_mul {
    ($Lhs:ty, $Rhs:ty, $Out:ty) => {
        impl std::ops::Mul<$Rhs> for $Lhs {
            type Output = $Out;
            fn mul(self, rhs: $Rhs) -> $Out {
                <$Out>::new(self.0 * rhs.0)
            }
        }
        impl std::ops::Mul<$Lhs> for $Rhs {
            type Output = $Out;
            fn mul(self, lhs: $Lhs) -> $Out {
                <$Out>::new(self.0 * lhs.0)
            }
        }
    };
}

macro_rules! impl_div {
    ($Lhs:ty, $Rhs:ty, $Out:ty) => {
        impl std::ops::Div<$Rhs> for $Lhs {
            type Output = $Out;
            fn div(self, rhs: $Rhs) -> $Out {
                <$Out>::new(self.0 / rhs.0)
            }
        }
    };
}

// Base quantities
unit_struct!(Money);
unit_struct!(Year);
unit_struct!(Day);
unit_struct!(Energy);
unit_struct!(Power);
unit_struct!(Watts);
unit_struct!(Area);

// Derived quantities
unit_struct!(EnergyPerDay);
unit_struct!(MoneyPerYear);
unit_struct!(MoneyPerEnergy);
unit_struct!(MoneyPerPower);
unit_struct!(MoneyPerWatt);

// Solar irradiation in kWh/m²/day. Numerically equal to the peak-sun-hours per day seen by a 1 kWp
// reference array, so kW × irradiation = kWh/day.
unit_struct!(Irradiation);

// Division rules
impl_div!(Energy, Day, EnergyPerDay);
impl_div!(EnergyPerDay, Irradiation, Power);
impl_div!(Money, Energy, MoneyPerEnergy);
impl_div!(Money, Power, MoneyPerPower);
impl_div!(Money, Year, MoneyPerYear);

// Multiplication rules
impl_mul!(Power, Irradiation, EnergyPerDay);
impl_mul!(EnergyPerDay, Day, Energy);
impl_mul!(Energy, MoneyPerEnergy, Money);
impl_mul!(Power, MoneyPerPower, Money);
impl_mul!(Watts, MoneyPerWatt, Money);
impl_mul!(MoneyPerYear, Year, Money);

/// Number of watts in a kilowatt
const WATTS_PER_KILOWATT: f64 = 1000.0;

impl Watts {
    /// Convert to kilowatts
    pub fn to_kilowatts(self) -> Power {
        Power(self.0 / WATTS_PER_KILOWATT)
    }
}

impl Power {
    /// Convert to watts
    pub fn to_watts(self) -> Watts {
        Watts(self.0 * WATTS_PER_KILOWATT)
    }
}

impl Money {
    /// The amount in the smallest currency unit (cents), rounded half away from zero
    #[allow(clippy::cast_possible_truncation)]
    pub fn to_cents(self) -> i64 {
        (self.0 * 100.0).round() as i64
    }

    /// Create an amount from a whole number of cents
    #[allow(clippy::cast_precision_loss)]
    pub fn from_cents(cents: i64) -> Self {
        Money(cents as f64 / 100.0)
    }

    /// Round to the nearest cent
    pub fn round_to_cents(self) -> Self {
        Self::from_cents(self.to_cents())
    }
}
