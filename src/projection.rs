//! The 25-year financial projection of a system: savings, payback and the generation curve.
use crate::config::{CalculationConfig, MONTHS_PER_YEAR, PROJECTION_YEARS};
use crate::dimensioning::{ConsumptionProfile, DimensioningResult};
use crate::error::{CalculationError, CalculationResult};
use crate::finance::{CostBreakdown, build_costs};
use crate::units::{Dimensionless, Energy, Money, MoneyPerYear, Year};
use log::debug;
use serde::{Serialize, Serializer};
use strum::{EnumIter, IntoEnumIterator, IntoStaticStr};

/// Calendar months, serialised with their Portuguese abbreviations
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, IntoStaticStr)]
#[allow(missing_docs)]
pub enum Month {
    #[strum(serialize = "jan")]
    January,
    #[strum(serialize = "fev")]
    February,
    #[strum(serialize = "mar")]
    March,
    #[strum(serialize = "abr")]
    April,
    #[strum(serialize = "mai")]
    May,
    #[strum(serialize = "jun")]
    June,
    #[strum(serialize = "jul")]
    July,
    #[strum(serialize = "ago")]
    August,
    #[strum(serialize = "set")]
    September,
    #[strum(serialize = "out")]
    October,
    #[strum(serialize = "nov")]
    November,
    #[strum(serialize = "dez")]
    December,
}

impl Serialize for Month {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let name: &'static str = self.into();
        serializer.serialize_str(name)
    }
}

/// Generation and consumption for one month of the seasonal curve
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonthlyGeneration {
    /// The calendar month
    #[serde(rename = "mes")]
    pub month: Month,
    /// Expected generation in this month
    #[serde(rename = "geracao")]
    pub generation: Energy,
    /// Average consumption, for comparison
    #[serde(rename = "consumo")]
    pub consumption: Energy,
}

/// One year of the financial projection
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct YearProjection {
    /// Year of operation, starting at 1
    #[serde(rename = "ano")]
    pub year: u32,
    /// Cumulative spend on electricity without the system
    #[serde(rename = "gasto_sem_solar")]
    pub without_solar: Money,
    /// Cumulative spend with the system: its price plus maintenance
    #[serde(rename = "gasto_com_solar")]
    pub with_solar: Money,
    /// Cumulative savings (without minus with)
    #[serde(rename = "economia_acumulada")]
    pub cumulative_savings: Money,
    /// Degradation-adjusted savings in this year
    #[serde(rename = "economia_anual")]
    pub annual_savings: Money,
    /// Credits held at the end of the year
    #[serde(rename = "creditos_kwh")]
    pub credits: Energy,
}

/// The financial outlook of a system over [`PROJECTION_YEARS`] years
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FinancialProjection {
    /// Savings in a month of the first year
    #[serde(rename = "economia_mensal")]
    pub monthly_savings: Money,
    /// Savings in the first year
    #[serde(rename = "economia_anual")]
    pub annual_savings: Money,
    /// Months until savings cover the sale price; `None` if this never happens
    #[serde(rename = "meses_payback")]
    pub months_to_payback: Option<u32>,
    /// [`Self::months_to_payback`] in years
    #[serde(rename = "anos_payback")]
    pub years_to_payback: Option<f64>,
    /// Savings over the whole projection, net of the price and maintenance
    #[serde(rename = "economia_total_25_anos")]
    pub total_savings: Money,
    /// Electricity spend over the whole projection without the system
    #[serde(rename = "gasto_total_sem_solar_25_anos")]
    pub total_without_solar: Money,
    /// Generation surplus in the first year
    #[serde(rename = "creditos_anuais")]
    pub annual_credits: Energy,
    /// One entry per year
    #[serde(rename = "anos")]
    pub years: Vec<YearProjection>,
    /// Seasonal generation curve, for charting
    #[serde(rename = "curva_geracao")]
    pub generation_curve: Vec<MonthlyGeneration>,
}

impl FinancialProjection {
    /// Whether the savings pay back the sale price within the projection
    pub fn is_payback_reached(&self) -> bool {
        self.months_to_payback.is_some()
    }
}

#[allow(clippy::cast_precision_loss)]
fn months_per_year() -> Dimensionless {
    Dimensionless(MONTHS_PER_YEAR as f64)
}

/// Find the first month in which cumulative net savings reach the sale price.
///
/// Savings are spread evenly over the months of each year and maintenance is charged monthly.
///
/// # Arguments
///
/// * `sale_price` - The amount to pay back
/// * `annual_savings` - Savings for each year of the projection
/// * `maintenance` - Annual maintenance cost
///
/// # Returns
///
/// The 1-based month of payback, or `None` if it is not reached within `annual_savings`
pub fn find_payback_month(
    sale_price: Money,
    annual_savings: &[Money],
    maintenance: MoneyPerYear,
) -> Option<u32> {
    let monthly_maintenance = maintenance * Year(1.0) / months_per_year();

    let mut cumulative = Money(0.0);
    let mut month = 0;
    for savings in annual_savings {
        let monthly_net = *savings / months_per_year() - monthly_maintenance;
        for _ in 0..MONTHS_PER_YEAR {
            month += 1;
            cumulative += monthly_net;
            if cumulative >= sale_price {
                return Some(month);
            }
        }
    }

    None
}

/// Apportion the average monthly generation across the calendar by the seasonal weights.
///
/// For presentation only; the result is not used for sizing.
pub fn generation_curve(
    monthly_generation: Energy,
    monthly_consumption: Energy,
    config: &CalculationConfig,
) -> Vec<MonthlyGeneration> {
    Month::iter()
        .zip(config.seasonal_weights)
        .map(|(month, weight)| MonthlyGeneration {
            month,
            generation: monthly_generation * weight,
            consumption: monthly_consumption,
        })
        .collect()
}

/// Project savings, spend and payback for a sized and priced system.
///
/// # Arguments
///
/// * `dimensioning` - The sized system
/// * `consumption` - The household's consumption
/// * `config` - Resolved calculation configuration
/// * `sale_price` - The price the customer pays for the system
#[allow(clippy::cast_possible_wrap)]
pub fn project_savings(
    dimensioning: &DimensioningResult,
    consumption: &ConsumptionProfile,
    config: &CalculationConfig,
    sale_price: Money,
) -> FinancialProjection {
    let tariff = dimensioning.tariff;
    let monthly_consumption = consumption.monthly_consumption;
    let monthly_generation = dimensioning.monthly_generation;

    // Net metering: generation offsets consumption up to 100%
    let monthly_offset = monthly_consumption.min(monthly_generation);
    let monthly_savings = monthly_offset * tariff;

    let annual_consumption = monthly_consumption * months_per_year();
    let annual_offset = monthly_offset * months_per_year();
    let annual_surplus =
        (monthly_generation - monthly_consumption).max(Energy(0.0)) * months_per_year();
    let annual_bill = annual_consumption * tariff;

    let mut years = Vec::with_capacity(PROJECTION_YEARS as usize);
    let mut without_solar = Money(0.0);
    let mut bank = Energy(0.0);
    for year in 1..=PROJECTION_YEARS {
        // Degradation compounds from the first year of operation
        let output = (Dimensionless(1.0) - config.degradation).powi(year as i32);
        let offset = annual_offset * output;
        let surplus = annual_surplus * output;
        let credited = config
            .credit_policy
            .settle(&mut bank, surplus, annual_consumption - offset);
        let annual_savings = (offset + credited) * tariff * config.savings_escalation(year);

        without_solar += annual_bill * config.bill_escalation(year);
        let with_solar = sale_price + config.maintenance_cost * Year(f64::from(year));

        years.push(YearProjection {
            year,
            without_solar,
            with_solar,
            cumulative_savings: without_solar - with_solar,
            annual_savings,
            credits: bank,
        });
    }

    let annual_savings: Vec<_> = years.iter().map(|year| year.annual_savings).collect();
    let months_to_payback = find_payback_month(sale_price, &annual_savings, config.maintenance_cost);
    match months_to_payback {
        Some(months) => debug!("Payback after {months} months"),
        None => debug!("Payback not reached within {PROJECTION_YEARS} years"),
    }

    let maintenance_total = config.maintenance_cost * Year(f64::from(PROJECTION_YEARS));
    FinancialProjection {
        monthly_savings,
        annual_savings: monthly_savings * months_per_year(),
        months_to_payback,
        years_to_payback: months_to_payback.map(|months| f64::from(months) / 12.0),
        total_savings: without_solar - sale_price - maintenance_total,
        total_without_solar: without_solar,
        annual_credits: annual_surplus,
        years,
        generation_curve: generation_curve(monthly_generation, monthly_consumption, config),
    }
}

/// Price a sized system and project its finances.
///
/// # Arguments
///
/// * `dimensioning` - The sized system
/// * `consumption` - The household's consumption
/// * `config` - Resolved calculation configuration
/// * `equipment_cost` - The cost of the equipment kit, priced elsewhere
///
/// # Returns
///
/// The cost breakdown and the projection, or an error if an input is invalid
pub fn project(
    dimensioning: &DimensioningResult,
    consumption: &ConsumptionProfile,
    config: &CalculationConfig,
    equipment_cost: Money,
) -> CalculationResult<(CostBreakdown, FinancialProjection)> {
    config.validate()?;
    let monthly = consumption.monthly_consumption;
    if !(monthly.is_finite() && monthly > Energy(0.0)) {
        return Err(CalculationError::InvalidInput(format!(
            "Monthly consumption must be greater than zero (got {} kWh)",
            monthly.value()
        )));
    }

    let costs = build_costs(dimensioning, config, equipment_cost)?;
    let projection = project_savings(dimensioning, consumption, config, costs.sale_price);

    Ok((costs, projection))
}
