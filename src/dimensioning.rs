//! Sizing of a photovoltaic system from a household's consumption.
//!
//! The sizing is a closed-form calculation: the daily energy needed to cover the monthly
//! consumption is inflated by the system losses and divided by the peak-sun-hours to get a target
//! power, which is then rounded up to a whole number of modules.
use crate::config::CalculationConfig;
use crate::error::{CalculationError, CalculationResult};
use crate::units::{Area, Day, Dimensionless, Energy, Irradiation, MoneyPerEnergy, Power, Watts};
use log::{debug, warn};
use serde::{Deserialize, Serialize};

/// The number of days used to convert monthly energy to daily energy and back
pub const DAYS_PER_MONTH: Day = Day(30.0);

/// A household's consumption and the information needed to resolve its tariff and irradiation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConsumptionProfile {
    /// Average monthly consumption
    #[serde(rename = "consumo_mensal")]
    pub monthly_consumption: Energy,
    /// The electricity utility serving the household
    #[serde(rename = "concessionaria", default)]
    pub utility: Option<String>,
    /// Explicit tariff, taking precedence over the utility's
    #[serde(rename = "tarifa", default)]
    pub tariff: Option<MoneyPerEnergy>,
    /// The city where the system will be installed
    #[serde(rename = "cidade", default)]
    pub city: Option<String>,
    /// Explicit irradiation, taking precedence over the city's
    #[serde(rename = "irradiacao", default)]
    pub irradiation: Option<Irradiation>,
}

impl ConsumptionProfile {
    /// Create a profile with only the monthly consumption set
    pub fn new(monthly_consumption: Energy) -> Self {
        Self {
            monthly_consumption,
            utility: None,
            tariff: None,
            city: None,
            irradiation: None,
        }
    }
}

/// The photovoltaic module the system will be built from
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ModuleSpec {
    /// Rated power of one module
    #[serde(rename = "potencia")]
    pub rated_power: Watts,
    /// Footprint of one module
    #[serde(rename = "area")]
    pub area: Area,
}

/// The size of a system and its expected generation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DimensioningResult {
    /// Installed power of the whole array
    #[serde(rename = "potencia_sistema")]
    pub system_power: Power,
    /// The theoretical power needed to cover consumption
    #[serde(rename = "potencia_alvo")]
    pub target_power: Power,
    /// Number of modules
    #[serde(rename = "quantidade_modulos")]
    pub module_count: u32,
    /// Roof or ground area taken up by the modules
    #[serde(rename = "area_necessaria")]
    pub required_area: Area,
    /// Expected average monthly generation
    #[serde(rename = "geracao_mensal")]
    pub monthly_generation: Energy,
    /// The irradiation the system was sized for
    #[serde(rename = "irradiacao")]
    pub irradiation: Irradiation,
    /// The tariff the household pays
    #[serde(rename = "tarifa")]
    pub tariff: MoneyPerEnergy,
}

/// Get the irradiation for a household.
///
/// An explicit value wins, then the city table, then the configured default. Never fails.
pub fn resolve_irradiation(
    consumption: &ConsumptionProfile,
    config: &CalculationConfig,
) -> Irradiation {
    if let Some(irradiation) = consumption.irradiation {
        return irradiation;
    }

    match consumption.city.as_deref() {
        Some(city) => config.irradiation_for(city).unwrap_or_else(|| {
            warn!(
                "No irradiation data for city '{city}'; using default of {} kWh/m²/day",
                config.default_irradiation.value()
            );
            config.default_irradiation
        }),
        None => config.default_irradiation,
    }
}

/// Get the tariff for a household.
///
/// An explicit tariff wins, then the utility table, then the configured default tariff.
pub fn resolve_tariff(
    consumption: &ConsumptionProfile,
    config: &CalculationConfig,
) -> CalculationResult<MoneyPerEnergy> {
    if let Some(tariff) = consumption.tariff {
        return Ok(tariff);
    }

    let utility = consumption.utility.as_deref();
    if let Some(tariff) = utility.and_then(|name| config.tariff_for(name)) {
        return Ok(tariff);
    }

    let tariff = config
        .default_tariff
        .ok_or_else(|| CalculationError::UnknownUtility {
            utility: utility.map(str::to_string),
        })?;
    if let Some(name) = utility {
        warn!(
            "No tariff for utility '{name}'; using default of {}/kWh",
            tariff.value()
        );
    }

    Ok(tariff)
}

/// The smallest number of modules whose combined power is at least `target`.
///
/// At least one module is always returned. Fails if the count does not fit in a `u32`.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn module_count(target: Power, module_power: Watts) -> CalculationResult<u32> {
    let target = target.to_watts();
    let mut count = (target / module_power).value().ceil().max(1.0);

    // Rounding in the division can push an exact multiple up by one module
    if count > 1.0 && module_power * Dimensionless(count - 1.0) >= target {
        count -= 1.0;
    }

    if !(count.is_finite() && count <= f64::from(u32::MAX)) {
        return Err(CalculationError::InvalidInput(format!(
            "System needs too many modules ({count} of {} W)",
            module_power.value()
        )));
    }

    Ok(count as u32)
}

/// Check the household and module inputs
fn check_inputs(consumption: &ConsumptionProfile, modules: &ModuleSpec) -> CalculationResult<()> {
    let invalid = |msg: String| Err(CalculationError::InvalidInput(msg));

    let monthly = consumption.monthly_consumption;
    if !(monthly.is_finite() && monthly > Energy(0.0)) {
        return invalid(format!(
            "Monthly consumption must be greater than zero (got {} kWh)",
            monthly.value()
        ));
    }
    let bad_irradiation = consumption
        .irradiation
        .filter(|irradiation| !(irradiation.is_finite() && *irradiation > Irradiation(0.0)));
    if let Some(irradiation) = bad_irradiation {
        return invalid(format!(
            "Irradiation must be greater than zero (got {} kWh/m²/day)",
            irradiation.value()
        ));
    }
    let bad_tariff = consumption
        .tariff
        .filter(|tariff| !(tariff.is_finite() && *tariff >= MoneyPerEnergy(0.0)));
    if let Some(tariff) = bad_tariff {
        return invalid(format!("Tariff cannot be negative (got {})", tariff.value()));
    }
    if !(modules.rated_power.is_finite() && modules.rated_power > Watts(0.0)) {
        return invalid(format!(
            "Module power must be greater than zero (got {} W)",
            modules.rated_power.value()
        ));
    }
    if !(modules.area.is_finite() && modules.area >= Area(0.0)) {
        return invalid(format!(
            "Module area cannot be negative (got {} m²)",
            modules.area.value()
        ));
    }

    Ok(())
}

/// Size a system to cover a household's consumption.
///
/// # Arguments
///
/// * `consumption` - The household's consumption, location and utility
/// * `modules` - The module the array is built from
/// * `config` - Resolved calculation configuration
///
/// # Returns
///
/// The system size and expected generation, or an error if the inputs are invalid or no tariff
/// can be found.
pub fn dimension(
    consumption: &ConsumptionProfile,
    modules: &ModuleSpec,
    config: &CalculationConfig,
) -> CalculationResult<DimensioningResult> {
    config.validate()?;
    check_inputs(consumption, modules)?;

    let irradiation = resolve_irradiation(consumption, config);
    let tariff = resolve_tariff(consumption, config)?;

    // Daily energy the array must produce before losses
    let daily_need = consumption.monthly_consumption / DAYS_PER_MONTH / config.efficiency;
    let target_power = daily_need / irradiation;

    let module_count = module_count(target_power, modules.rated_power)?;
    let count = Dimensionless(f64::from(module_count));
    let system_power = (modules.rated_power * count).to_kilowatts();
    let required_area = modules.area * count;

    // Expected output feeds the savings only; it never feeds back into the size
    let monthly_generation = system_power * irradiation * DAYS_PER_MONTH * config.efficiency;

    debug!(
        "Target power {:.3} kWp -> {module_count} modules, {:.3} kWp, {:.1} kWh/month",
        target_power.value(),
        system_power.value(),
        monthly_generation.value()
    );

    Ok(DimensioningResult {
        system_power,
        target_power,
        module_count,
        required_area,
        monthly_generation,
        irradiation,
        tariff,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::{consumption, module_spec, scenario_config};
    use float_cmp::assert_approx_eq;
    use rstest::rstest;

    #[rstest]
    fn test_dimension_scenario(
        consumption: ConsumptionProfile,
        module_spec: ModuleSpec,
        scenario_config: CalculationConfig,
    ) {
        let result = dimension(&consumption, &module_spec, &scenario_config).unwrap();

        // 400 / 30 / 0.85 / 5.15 = 3.0459 kWp -> 5.2 modules of 585 W
        assert_approx_eq!(Power, result.target_power, Power(3.045_878_30), epsilon = 1e-6);
        assert_eq!(result.module_count, 6);
        assert_approx_eq!(Power, result.system_power, Power(3.51));
        assert_approx_eq!(Area, result.required_area, Area(15.48));
        assert_approx_eq!(Energy, result.monthly_generation, Energy(460.950_75), epsilon = 1e-6);
        assert_eq!(result.tariff, MoneyPerEnergy(0.75));
        assert_eq!(result.irradiation, Irradiation(5.15));

        // Never under-provisioned, and over by less than one module
        assert!(result.system_power >= result.target_power);
        assert!(result.system_power - result.target_power < module_spec.rated_power.to_kilowatts());
    }

    #[rstest]
    #[case(Power(1.5), Watts(500.0), 3)]
    #[case(Power(1.500_1), Watts(500.0), 4)]
    #[case(Power(0.01), Watts(585.0), 1)]
    #[case(Power(3.045_878), Watts(585.0), 6)]
    #[case(Power(10.0), Watts(410.0), 25)]
    #[case(Power(1.500_000_000_5), Watts(500.0), 4)]
    #[case(Power(0.0), Watts(500.0), 1)]
    fn test_module_count(#[case] target: Power, #[case] module_power: Watts, #[case] expected: u32) {
        let count = module_count(target, module_power).unwrap();
        assert_eq!(count, expected);

        // Never under-provisioned
        assert!(module_power * Dimensionless(f64::from(count)) >= target.to_watts());
    }

    #[rstest]
    #[case(Power(1e12), Watts(1.0))]
    #[case(Power(f64::INFINITY), Watts(500.0))]
    fn test_module_count_overflow(#[case] target: Power, #[case] module_power: Watts) {
        assert!(matches!(
            module_count(target, module_power),
            Err(CalculationError::InvalidInput(_))
        ));
    }

    #[rstest]
    fn test_dimension_huge_consumption(module_spec: ModuleSpec) {
        let consumption = ConsumptionProfile {
            tariff: Some(MoneyPerEnergy(0.75)),
            ..ConsumptionProfile::new(Energy(1e13))
        };
        assert!(matches!(
            dimension(&consumption, &module_spec, &CalculationConfig::default()),
            Err(CalculationError::InvalidInput(_))
        ));
    }

    #[rstest]
    fn test_dimension_unvalidated_config(consumption: ConsumptionProfile, module_spec: ModuleSpec) {
        // Built directly, without going through `resolve`
        let config = CalculationConfig {
            efficiency: Dimensionless(0.0),
            ..CalculationConfig::default()
        };
        assert!(matches!(
            dimension(&consumption, &module_spec, &config),
            Err(CalculationError::Config(_))
        ));
    }

    #[test]
    fn test_module_count_exact_multiple() {
        // 225 kWh / 30 / 1.0 / 5.0 = 1.5 kWp = 3 × 500 W exactly
        let consumption = ConsumptionProfile {
            irradiation: Some(Irradiation(5.0)),
            tariff: Some(MoneyPerEnergy(0.8)),
            ..ConsumptionProfile::new(Energy(225.0))
        };
        let modules = ModuleSpec {
            rated_power: Watts(500.0),
            area: Area(2.0),
        };
        let config = CalculationConfig {
            efficiency: Dimensionless(1.0),
            ..CalculationConfig::default()
        };
        let result = dimension(&consumption, &modules, &config).unwrap();
        assert_eq!(result.module_count, 3);
    }

    #[rstest]
    fn test_dimension_monotonic_in_consumption(
        module_spec: ModuleSpec,
        scenario_config: CalculationConfig,
    ) {
        let mut previous: Option<DimensioningResult> = None;
        for kwh in (1..=60).map(|i| f64::from(i) * 25.0) {
            let consumption = ConsumptionProfile {
                tariff: Some(MoneyPerEnergy(0.75)),
                ..ConsumptionProfile::new(Energy(kwh))
            };
            let result = dimension(&consumption, &module_spec, &scenario_config).unwrap();
            if let Some(previous) = previous {
                assert!(result.module_count >= previous.module_count);
                assert!(result.system_power >= previous.system_power);
            }
            previous = Some(result);
        }
    }

    #[rstest]
    #[case(Energy(0.0))]
    #[case(Energy(-10.0))]
    #[case(Energy(f64::NAN))]
    fn test_dimension_invalid_consumption(
        #[case] monthly: Energy,
        module_spec: ModuleSpec,
        scenario_config: CalculationConfig,
    ) {
        let consumption = ConsumptionProfile::new(monthly);
        assert!(matches!(
            dimension(&consumption, &module_spec, &scenario_config),
            Err(CalculationError::InvalidInput(_))
        ));
    }

    #[rstest]
    fn test_dimension_invalid_irradiation(
        consumption: ConsumptionProfile,
        module_spec: ModuleSpec,
        scenario_config: CalculationConfig,
    ) {
        let consumption = ConsumptionProfile {
            irradiation: Some(Irradiation(0.0)),
            ..consumption
        };
        assert_eq!(
            dimension(&consumption, &module_spec, &scenario_config),
            Err(CalculationError::InvalidInput(
                "Irradiation must be greater than zero (got 0 kWh/m²/day)".into()
            ))
        );
    }

    #[rstest]
    fn test_dimension_invalid_module(
        consumption: ConsumptionProfile,
        scenario_config: CalculationConfig,
    ) {
        let modules = ModuleSpec {
            rated_power: Watts(0.0),
            area: Area(2.0),
        };
        assert!(matches!(
            dimension(&consumption, &modules, &scenario_config),
            Err(CalculationError::InvalidInput(_))
        ));
    }

    #[rstest]
    #[case(Some(Irradiation(6.0)), Some("Curitiba"), Irradiation(6.0))]
    #[case(None, Some("curitiba"), Irradiation(4.28))]
    #[case(None, Some("Atlantis"), Irradiation(5.15))]
    #[case(None, None, Irradiation(5.15))]
    fn test_resolve_irradiation(
        #[case] explicit: Option<Irradiation>,
        #[case] city: Option<&str>,
        #[case] expected: Irradiation,
    ) {
        let consumption = ConsumptionProfile {
            irradiation: explicit,
            city: city.map(str::to_string),
            ..ConsumptionProfile::new(Energy(300.0))
        };
        assert_eq!(
            resolve_irradiation(&consumption, &CalculationConfig::default()),
            expected
        );
    }

    #[rstest]
    #[case(Some(MoneyPerEnergy(0.5)), Some("CEMIG"), MoneyPerEnergy(0.5))]
    #[case(None, Some("cemig"), MoneyPerEnergy(0.96))]
    #[case(None, Some("Unknown Power Co"), MoneyPerEnergy(0.85))]
    #[case(None, None, MoneyPerEnergy(0.85))]
    fn test_resolve_tariff(
        #[case] explicit: Option<MoneyPerEnergy>,
        #[case] utility: Option<&str>,
        #[case] expected: MoneyPerEnergy,
    ) {
        let consumption = ConsumptionProfile {
            tariff: explicit,
            utility: utility.map(str::to_string),
            ..ConsumptionProfile::new(Energy(300.0))
        };
        assert_eq!(
            resolve_tariff(&consumption, &CalculationConfig::default()),
            Ok(expected)
        );
    }

    #[test]
    fn test_resolve_tariff_unknown_utility() {
        let config = CalculationConfig {
            default_tariff: None,
            ..CalculationConfig::default()
        };
        let consumption = ConsumptionProfile {
            utility: Some("Unknown Power Co".into()),
            ..ConsumptionProfile::new(Energy(300.0))
        };
        assert_eq!(
            resolve_tariff(&consumption, &config),
            Err(CalculationError::UnknownUtility {
                utility: Some("Unknown Power Co".into())
            })
        );

        // An explicit tariff still works without a default
        let consumption = ConsumptionProfile {
            tariff: Some(MoneyPerEnergy(0.7)),
            ..consumption
        };
        assert_eq!(resolve_tariff(&consumption, &config), Ok(MoneyPerEnergy(0.7)));
    }

    #[rstest]
    fn test_dimension_idempotent(
        consumption: ConsumptionProfile,
        module_spec: ModuleSpec,
        scenario_config: CalculationConfig,
    ) {
        assert_eq!(
            dimension(&consumption, &module_spec, &scenario_config),
            dimension(&consumption, &module_spec, &scenario_config)
        );
    }
}
