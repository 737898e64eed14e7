//! Defines the calculation configuration and the code for resolving it from defaults plus caller
//! overrides.
//!
//! A [`CalculationConfig`] is built fresh for each calculation. Lookup tables (tariffs per utility,
//! irradiation per city and the seasonal generation weights) are plain values inside it, so there
//! is no process-wide mutable state for the engine to depend on.
use crate::error::{CalculationError, CalculationResult};
use crate::units::{
    Dimensionless, Energy, Irradiation, Money, MoneyPerEnergy, MoneyPerPower, MoneyPerYear,
};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_string_enum::{DeserializeLabeledStringEnum, SerializeLabeledStringEnum};
use unicase::UniCase;

/// The number of years covered by a financial projection
pub const PROJECTION_YEARS: u32 = 25;

/// The number of months in a year
pub const MONTHS_PER_YEAR: usize = 12;

/// Irradiation used when neither an explicit value nor a known city is given (kWh/m²/day)
pub const DEFAULT_IRRADIATION: Irradiation = Irradiation(5.15);

/// Allowed deviation of the sum of seasonal weights from [`MONTHS_PER_YEAR`]
const SEASONAL_WEIGHT_TOLERANCE: f64 = 1e-6;

const DEFAULT_CONFIG_FILE_HEADER: &str = "# Default calculation configuration.
# Any of these values can be overridden in the [configuracao] table of a request file.
";

/// Tariff (currency/kWh) for each utility
pub type TariffTable = IndexMap<String, MoneyPerEnergy>;

/// Average daily irradiation for each city
pub type IrradiationTable = IndexMap<String, Irradiation>;

/// Relative generation for each calendar month, January first. Sums to 12.
pub type SeasonalWeights = [Dimensionless; MONTHS_PER_YEAR];

/// Southern-hemisphere profile: more generation in the December-February summer
const DEFAULT_SEASONAL_WEIGHTS: SeasonalWeights = [
    Dimensionless(1.12),
    Dimensionless(1.08),
    Dimensionless(1.05),
    Dimensionless(0.98),
    Dimensionless(0.90),
    Dimensionless(0.85),
    Dimensionless(0.88),
    Dimensionless(0.95),
    Dimensionless(0.98),
    Dimensionless(1.04),
    Dimensionless(1.08),
    Dimensionless(1.09),
];

const DEFAULT_UTILITY_TARIFFS: [(&str, f64); 10] = [
    ("CEMIG", 0.96),
    ("ENEL SP", 0.82),
    ("ENEL RJ", 0.98),
    ("LIGHT", 1.02),
    ("CPFL PAULISTA", 0.79),
    ("COPEL", 0.77),
    ("CELESC", 0.71),
    ("COELBA", 0.89),
    ("ENERGISA MT", 0.93),
    ("EQUATORIAL PA", 0.99),
];

const DEFAULT_CITY_IRRADIATION: [(&str, f64); 14] = [
    ("São Paulo", 4.55),
    ("Rio de Janeiro", 4.95),
    ("Belo Horizonte", 5.25),
    ("Brasília", 5.35),
    ("Curitiba", 4.28),
    ("Porto Alegre", 4.50),
    ("Florianópolis", 4.40),
    ("Salvador", 5.30),
    ("Recife", 5.38),
    ("Fortaleza", 5.62),
    ("Goiânia", 5.31),
    ("Cuiabá", 5.20),
    ("Belém", 4.90),
    ("Manaus", 4.60),
];

/// Which amount the salesperson's commission is computed on
#[derive(
    SerializeLabeledStringEnum, DeserializeLabeledStringEnum, Debug, Clone, Copy, PartialEq, Default,
)]
pub enum CommissionBase {
    /// The customer-facing sale price
    #[default]
    #[string = "preco_venda"]
    SalePrice,
    /// The internal cost subtotal
    #[string = "subtotal"]
    Subtotal,
}

/// What happens to generation in excess of consumption
#[derive(
    SerializeLabeledStringEnum, DeserializeLabeledStringEnum, Debug, Clone, Copy, PartialEq, Default,
)]
pub enum CreditPolicy {
    /// Surplus credits expire at the end of each year and are never valued
    #[default]
    #[string = "expirar"]
    Expire,
    /// Surplus credits are banked and offset later shortfalls in consumption
    #[string = "acumular"]
    RollOver,
}

impl CreditPolicy {
    /// Settle one year of credits.
    ///
    /// # Arguments
    ///
    /// * `bank` - Credits carried over from previous years, updated in place
    /// * `surplus` - Generation beyond consumption this year
    /// * `shortfall` - Consumption not offset by this year's generation
    ///
    /// # Returns
    ///
    /// The energy credited against this year's shortfall.
    pub fn settle(self, bank: &mut Energy, surplus: Energy, shortfall: Energy) -> Energy {
        match self {
            Self::Expire => {
                *bank = surplus;
                Energy(0.0)
            }
            Self::RollOver => {
                let available = *bank + surplus;
                let credited = available.min(shortfall.max(Energy(0.0)));
                *bank = available - credited;
                credited
            }
        }
    }
}

/// An immutable snapshot of every tunable used by a calculation.
///
/// Obtain one with [`resolve`]. All fractions are plain decimals (0.3 rather than 30%).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalculationConfig {
    /// Installation labour cost per kWp
    #[serde(rename = "custo_instalacao_por_kw")]
    pub installation_cost_per_kw: MoneyPerPower,
    /// Civil works cost per kWp
    #[serde(rename = "custo_obra_por_kw")]
    pub civil_works_cost_per_kw: MoneyPerPower,
    /// Fixed grounding and AC protection cost
    #[serde(rename = "custo_aterramento")]
    pub grounding_cost: Money,
    /// Fixed cost of homologation with the utility
    #[serde(rename = "custo_homologacao")]
    pub homologation_cost: Money,
    /// Fixed cost of the labelling plates
    #[serde(rename = "custo_placas")]
    pub plates_cost: Money,
    /// Margin added on top of the cost subtotal
    #[serde(rename = "margem_desejada")]
    pub margin: Dimensionless,
    /// Salesperson commission
    #[serde(rename = "comissao_vendedor")]
    pub commission: Dimensionless,
    /// The amount the commission is computed on
    #[serde(rename = "base_comissao", default)]
    pub commission_base: CommissionBase,
    /// Fraction of nominal generation left after system losses
    #[serde(rename = "eficiencia_sistema")]
    pub efficiency: Dimensionless,
    /// Annual fractional decline in module output
    #[serde(rename = "degradacao_anual")]
    pub degradation: Dimensionless,
    /// Annual tariff inflation applied to the without-solar bill
    #[serde(rename = "reajuste_tarifario_anual")]
    pub tariff_escalation: Dimensionless,
    /// Tariff multiplier for each projection year, replacing `tariff_escalation` when present
    #[serde(rename = "curva_reajuste", skip_serializing_if = "Option::is_none")]
    pub escalation_curve: Option<Vec<Dimensionless>>,
    /// Residual maintenance cost per year of operation
    #[serde(rename = "custo_manutencao_anual")]
    pub maintenance_cost: MoneyPerYear,
    /// Tariff used when the utility is not in the table
    #[serde(rename = "tarifa_padrao", skip_serializing_if = "Option::is_none")]
    pub default_tariff: Option<MoneyPerEnergy>,
    /// Irradiation used when the city is not in the table
    #[serde(rename = "irradiacao_padrao")]
    pub default_irradiation: Irradiation,
    /// Monthly generation weights for the seasonal curve
    #[serde(rename = "pesos_sazonais")]
    pub seasonal_weights: SeasonalWeights,
    /// Policy for generation surplus
    #[serde(rename = "politica_creditos", default)]
    pub credit_policy: CreditPolicy,
    /// Tariff for each utility
    #[serde(rename = "tarifas_concessionarias")]
    pub utility_tariffs: TariffTable,
    /// Irradiation for each city
    #[serde(rename = "irradiacao_cidades")]
    pub city_irradiation: IrradiationTable,
}

impl Default for CalculationConfig {
    fn default() -> Self {
        Self {
            installation_cost_per_kw: MoneyPerPower(400.0),
            civil_works_cost_per_kw: MoneyPerPower(100.0),
            grounding_cost: Money(300.0),
            homologation_cost: Money(500.0),
            plates_cost: Money(60.0),
            margin: Dimensionless(0.3),
            commission: Dimensionless(0.05),
            commission_base: CommissionBase::default(),
            efficiency: Dimensionless(0.8),
            degradation: Dimensionless(0.005),
            tariff_escalation: Dimensionless(0.05),
            escalation_curve: None,
            maintenance_cost: MoneyPerYear(0.0),
            default_tariff: Some(MoneyPerEnergy(0.85)),
            default_irradiation: DEFAULT_IRRADIATION,
            seasonal_weights: DEFAULT_SEASONAL_WEIGHTS,
            credit_policy: CreditPolicy::default(),
            utility_tariffs: DEFAULT_UTILITY_TARIFFS
                .iter()
                .map(|&(name, tariff)| (name.to_string(), MoneyPerEnergy(tariff)))
                .collect(),
            city_irradiation: DEFAULT_CITY_IRRADIATION
                .iter()
                .map(|&(name, irradiation)| (name.to_string(), Irradiation(irradiation)))
                .collect(),
        }
    }
}

/// Caller-supplied partial configuration.
///
/// Every field is optional and mirrors the field of the same name in [`CalculationConfig`]. Table
/// entries are merged into the default tables, keyed case-insensitively; every other field
/// replaces the default when present.
#[allow(missing_docs)]
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigOverrides {
    #[serde(rename = "custo_instalacao_por_kw")]
    pub installation_cost_per_kw: Option<MoneyPerPower>,
    #[serde(rename = "custo_obra_por_kw")]
    pub civil_works_cost_per_kw: Option<MoneyPerPower>,
    #[serde(rename = "custo_aterramento")]
    pub grounding_cost: Option<Money>,
    #[serde(rename = "custo_homologacao")]
    pub homologation_cost: Option<Money>,
    #[serde(rename = "custo_placas")]
    pub plates_cost: Option<Money>,
    #[serde(rename = "margem_desejada")]
    pub margin: Option<Dimensionless>,
    #[serde(rename = "comissao_vendedor")]
    pub commission: Option<Dimensionless>,
    #[serde(rename = "base_comissao")]
    pub commission_base: Option<CommissionBase>,
    #[serde(rename = "eficiencia_sistema")]
    pub efficiency: Option<Dimensionless>,
    #[serde(rename = "degradacao_anual")]
    pub degradation: Option<Dimensionless>,
    #[serde(rename = "reajuste_tarifario_anual")]
    pub tariff_escalation: Option<Dimensionless>,
    #[serde(rename = "curva_reajuste")]
    pub escalation_curve: Option<Vec<Dimensionless>>,
    #[serde(rename = "custo_manutencao_anual")]
    pub maintenance_cost: Option<MoneyPerYear>,
    #[serde(rename = "tarifa_padrao")]
    pub default_tariff: Option<MoneyPerEnergy>,
    #[serde(rename = "irradiacao_padrao")]
    pub default_irradiation: Option<Irradiation>,
    #[serde(rename = "pesos_sazonais")]
    pub seasonal_weights: Option<SeasonalWeights>,
    #[serde(rename = "politica_creditos")]
    pub credit_policy: Option<CreditPolicy>,
    #[serde(rename = "tarifas_concessionarias")]
    pub utility_tariffs: Option<TariffTable>,
    #[serde(rename = "irradiacao_cidades")]
    pub city_irradiation: Option<IrradiationTable>,
}

/// Return an error of type [`CalculationError::Config`] if the condition is false
macro_rules! ensure_config {
    ($cond:expr, $($arg:tt)+) => {
        if !$cond {
            return Err(CalculationError::Config(format!($($arg)+)));
        }
    };
}

/// Check that a monetary value is finite and non-negative
fn check_cost(name: &str, value: f64) -> CalculationResult<()> {
    ensure_config!(
        value.is_finite() && value >= 0.0,
        "{name} must be a finite, non-negative amount (got {value})"
    );

    Ok(())
}

/// Check that a fraction is between 0 and 1 inclusive
fn check_fraction(name: &str, value: Dimensionless) -> CalculationResult<()> {
    ensure_config!(
        (0.0..=1.0).contains(&value.0),
        "{name} must be between 0 and 1 (got {})",
        value.0
    );

    Ok(())
}

/// Check that seasonal weights are non-negative and sum to the number of months
#[allow(clippy::cast_precision_loss)]
fn check_seasonal_weights(weights: &SeasonalWeights) -> CalculationResult<()> {
    ensure_config!(
        weights.iter().all(|w| w.is_finite() && w.0 >= 0.0),
        "pesos_sazonais must all be finite and non-negative"
    );

    let total: Dimensionless = weights.iter().copied().sum();
    ensure_config!(
        (total.0 - MONTHS_PER_YEAR as f64).abs() <= SEASONAL_WEIGHT_TOLERANCE,
        "pesos_sazonais must sum to {MONTHS_PER_YEAR} (got {})",
        total.0
    );

    Ok(())
}

/// Check that a tariff escalation curve covers the projection and has no negative multipliers
fn check_escalation_curve(curve: &[Dimensionless]) -> CalculationResult<()> {
    ensure_config!(
        curve.len() == PROJECTION_YEARS as usize,
        "curva_reajuste must have exactly {PROJECTION_YEARS} entries (got {})",
        curve.len()
    );
    ensure_config!(
        curve.iter().all(|m| m.is_finite() && m.0 >= 0.0),
        "curva_reajuste multipliers must be finite and non-negative"
    );

    Ok(())
}

/// Look up a key in a table, ignoring case and surrounding whitespace
fn lookup_ignore_case<T: Copy>(table: &IndexMap<String, T>, key: &str) -> Option<T> {
    let key = UniCase::new(key.trim());
    table
        .iter()
        .find(|(name, _)| UniCase::new(name.as_str()) == key)
        .map(|(_, value)| *value)
}

/// Merge entries into a table, replacing any existing entry whose key matches ignoring case
fn merge_table<T: Copy>(table: &mut IndexMap<String, T>, entries: &IndexMap<String, T>) {
    for (name, value) in entries {
        let key = UniCase::new(name.trim());
        table.retain(|existing, _| UniCase::new(existing.as_str()) != key);
        table.insert(name.trim().to_string(), *value);
    }
}

impl CalculationConfig {
    /// The tariff for the given utility, if it is in the table
    pub fn tariff_for(&self, utility: &str) -> Option<MoneyPerEnergy> {
        lookup_ignore_case(&self.utility_tariffs, utility)
    }

    /// The irradiation for the given city, if it is in the table
    pub fn irradiation_for(&self, city: &str) -> Option<Irradiation> {
        lookup_ignore_case(&self.city_irradiation, city)
    }

    /// The entry of the escalation curve for the given projection year (1-based), if any
    fn curve_entry(&self, year: u32) -> Option<Dimensionless> {
        let index = usize::try_from(year.checked_sub(1)?).ok()?;
        self.escalation_curve.as_ref()?.get(index).copied()
    }

    /// The tariff multiplier for the without-solar bill in the given projection year (1-based).
    ///
    /// Years past the end of the escalation curve fall back to the fixed annual rate.
    #[allow(clippy::cast_possible_wrap)]
    pub fn bill_escalation(&self, year: u32) -> Dimensionless {
        self.curve_entry(year).unwrap_or_else(|| {
            (Dimensionless(1.0) + self.tariff_escalation).powi(year.saturating_sub(1) as i32)
        })
    }

    /// The tariff multiplier for savings in the given projection year (1-based).
    ///
    /// Savings only follow tariff changes when the caller supplies an explicit curve.
    pub fn savings_escalation(&self, year: u32) -> Dimensionless {
        self.curve_entry(year).unwrap_or(Dimensionless(1.0))
    }

    /// The contents of a TOML file containing the default configuration
    pub fn default_file_contents() -> Result<String, toml::ser::Error> {
        let body = toml::to_string(&Self::default())?;
        Ok(format!("{DEFAULT_CONFIG_FILE_HEADER}\n{body}"))
    }

    /// Apply overrides field by field on top of this configuration
    fn apply_overrides(&mut self, overrides: &ConfigOverrides) {
        macro_rules! replace_fields {
            ($($field:ident),+ $(,)?) => {
                $(
                    if let Some(value) = overrides.$field {
                        self.$field = value;
                    }
                )+
            };
        }

        replace_fields!(
            installation_cost_per_kw,
            civil_works_cost_per_kw,
            grounding_cost,
            homologation_cost,
            plates_cost,
            margin,
            commission,
            commission_base,
            efficiency,
            degradation,
            tariff_escalation,
            maintenance_cost,
            default_irradiation,
            seasonal_weights,
            credit_policy,
        );

        if let Some(curve) = &overrides.escalation_curve {
            self.escalation_curve = Some(curve.clone());
        }
        if let Some(tariff) = overrides.default_tariff {
            self.default_tariff = Some(tariff);
        }
        if let Some(tariffs) = &overrides.utility_tariffs {
            merge_table(&mut self.utility_tariffs, tariffs);
        }
        if let Some(irradiation) = &overrides.city_irradiation {
            merge_table(&mut self.city_irradiation, irradiation);
        }
    }

    /// Check every invariant of the configuration
    pub fn validate(&self) -> CalculationResult<()> {
        check_cost("custo_instalacao_por_kw", self.installation_cost_per_kw.0)?;
        check_cost("custo_obra_por_kw", self.civil_works_cost_per_kw.0)?;
        check_cost("custo_aterramento", self.grounding_cost.0)?;
        check_cost("custo_homologacao", self.homologation_cost.0)?;
        check_cost("custo_placas", self.plates_cost.0)?;
        check_cost("custo_manutencao_anual", self.maintenance_cost.0)?;

        check_fraction("margem_desejada", self.margin)?;
        check_fraction("comissao_vendedor", self.commission)?;
        check_fraction("eficiencia_sistema", self.efficiency)?;
        check_fraction("degradacao_anual", self.degradation)?;
        check_fraction("reajuste_tarifario_anual", self.tariff_escalation)?;

        // Efficiency is a divisor when sizing
        ensure_config!(
            self.efficiency.0 > 0.0,
            "eficiencia_sistema must be greater than zero"
        );

        ensure_config!(
            self.default_irradiation.is_finite() && self.default_irradiation.0 > 0.0,
            "irradiacao_padrao must be greater than zero (got {})",
            self.default_irradiation.0
        );

        if let Some(tariff) = self.default_tariff {
            check_cost("tarifa_padrao", tariff.0)?;
        }
        for (utility, tariff) in &self.utility_tariffs {
            check_cost(&format!("Tariff for {utility}"), tariff.0)?;
        }
        for (city, irradiation) in &self.city_irradiation {
            ensure_config!(
                irradiation.is_finite() && irradiation.0 > 0.0,
                "Irradiation for {city} must be greater than zero (got {})",
                irradiation.0
            );
        }

        check_seasonal_weights(&self.seasonal_weights)?;
        if let Some(curve) = &self.escalation_curve {
            check_escalation_curve(curve)?;
        }

        Ok(())
    }
}

/// Build the configuration for one calculation.
///
/// The built-in defaults are created afresh and the overrides, if any, are applied on top of
/// them. The result is validated before it is returned.
///
/// # Arguments
///
/// * `overrides` - Caller-supplied partial configuration
///
/// # Returns
///
/// The resolved configuration or [`CalculationError::Config`] if a value is out of range
pub fn resolve(overrides: Option<&ConfigOverrides>) -> CalculationResult<CalculationConfig> {
    let mut config = CalculationConfig::default();
    if let Some(overrides) = overrides {
        config.apply_overrides(overrides);
    }
    config.validate()?;

    Ok(config)
}
