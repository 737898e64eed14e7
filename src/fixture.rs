//! Fixtures for tests

use crate::config::CalculationConfig;
use crate::dimensioning::{ConsumptionProfile, DimensioningResult, ModuleSpec};
use crate::finance::EquipmentPricing;
use crate::proposal::ProposalRequest;
use crate::units::{
    Area, Dimensionless, Energy, Irradiation, Money, MoneyPerEnergy, Power, Watts,
};
use rstest::fixture;

/// Assert that an error with the given message occurs
macro_rules! assert_error {
    ($result:expr, $msg:expr) => {
        assert_eq!(
            $result.unwrap_err().chain().next().unwrap().to_string(),
            $msg
        );
    };
}
pub(crate) use assert_error;

/// A household using 400 kWh/month at 0.75/kWh with 5.15 kWh/m²/day of sun
#[fixture]
pub fn consumption() -> ConsumptionProfile {
    ConsumptionProfile {
        tariff: Some(MoneyPerEnergy(0.75)),
        irradiation: Some(Irradiation(5.15)),
        ..ConsumptionProfile::new(Energy(400.0))
    }
}

#[fixture]
pub fn module_spec() -> ModuleSpec {
    ModuleSpec {
        rated_power: Watts(585.0),
        area: Area(2.58),
    }
}

/// Defaults with 85% efficiency and 0.5%/year degradation
#[fixture]
pub fn scenario_config() -> CalculationConfig {
    CalculationConfig {
        efficiency: Dimensionless(0.85),
        degradation: Dimensionless(0.005),
        ..CalculationConfig::default()
    }
}

/// The sizing of [`consumption`] with [`module_spec`] under [`scenario_config`]
#[fixture]
pub fn dimensioning() -> DimensioningResult {
    DimensioningResult {
        system_power: Power(3.51),
        target_power: Power(3.045_878_545_592_994),
        module_count: 6,
        required_area: Area(15.48),
        monthly_generation: Energy(460.950_75),
        irradiation: Irradiation(5.15),
        tariff: MoneyPerEnergy(0.75),
    }
}

#[fixture]
pub fn proposal_request(
    consumption: ConsumptionProfile,
    module_spec: ModuleSpec,
) -> ProposalRequest {
    ProposalRequest {
        customer: Some("Maria".into()),
        consumption,
        modules: module_spec,
        equipment: EquipmentPricing::Fixed(Money(9000.0)),
        config: None,
    }
}
