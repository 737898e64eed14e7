//! General functions related to finance: the cost and price structure of an installation.
use crate::config::{CalculationConfig, CommissionBase};
use crate::dimensioning::DimensioningResult;
use crate::error::{CalculationError, CalculationResult};
use crate::units::{Money, MoneyPerWatt};
use log::debug;
use serde::{Deserialize, Serialize};

/// How the equipment (modules, inverter, structure) for a system is priced.
///
/// Pricing equipment is the job of a kit catalogue or a supplier quote; the engine only needs the
/// resulting amount.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "tipo", content = "valor")]
pub enum EquipmentPricing {
    /// A quoted total for the whole kit
    #[serde(rename = "fixo")]
    Fixed(Money),
    /// A price per watt-peak of installed power
    #[serde(rename = "por_wp")]
    PerWattPeak(MoneyPerWatt),
}

impl EquipmentPricing {
    /// The equipment cost for a sized system
    pub fn cost_for(&self, dimensioning: &DimensioningResult) -> Money {
        match *self {
            Self::Fixed(cost) => cost,
            Self::PerWattPeak(price) => dimensioning.system_power.to_watts() * price,
        }
    }
}

/// The cost and price structure of an installation.
///
/// All amounts are rounded to cents and the totals are summed in cents, so the components always
/// add up exactly to the reported totals.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CostBreakdown {
    /// Modules, inverter and mounting structure
    #[serde(rename = "custo_equipamentos")]
    pub equipment: Money,
    /// Installation labour
    #[serde(rename = "custo_instalacao")]
    pub installation: Money,
    /// Grounding and AC protection
    #[serde(rename = "custo_aterramento")]
    pub grounding: Money,
    /// Homologation with the utility
    #[serde(rename = "custo_homologacao")]
    pub homologation: Money,
    /// Labelling plates
    #[serde(rename = "custo_placas")]
    pub plates: Money,
    /// Civil works
    #[serde(rename = "custo_obra")]
    pub civil_works: Money,
    /// Sum of all costs above
    #[serde(rename = "subtotal")]
    pub subtotal: Money,
    /// Margin on top of the subtotal
    #[serde(rename = "valor_margem")]
    pub margin: Money,
    /// Salesperson commission, paid out of the margin
    #[serde(rename = "valor_comissao")]
    pub commission: Money,
    /// Price charged to the customer
    #[serde(rename = "preco_venda")]
    pub sale_price: Money,
    /// Margin left after the commission
    #[serde(rename = "lucro_liquido")]
    pub net_profit: Money,
}

impl CostBreakdown {
    /// The individual cost components making up the subtotal
    pub fn components(&self) -> [Money; 6] {
        [
            self.equipment,
            self.installation,
            self.grounding,
            self.homologation,
            self.plates,
            self.civil_works,
        ]
    }
}

/// Build the cost and price structure of a sized system.
///
/// # Arguments
///
/// * `dimensioning` - The sized system
/// * `config` - Resolved calculation configuration
/// * `equipment_cost` - The cost of the equipment kit, priced elsewhere
///
/// # Returns
///
/// The cost breakdown, or [`CalculationError::InvalidInput`] if the equipment cost is negative
pub fn build_costs(
    dimensioning: &DimensioningResult,
    config: &CalculationConfig,
    equipment_cost: Money,
) -> CalculationResult<CostBreakdown> {
    if !(equipment_cost.is_finite() && equipment_cost >= Money(0.0)) {
        return Err(CalculationError::InvalidInput(format!(
            "Equipment cost cannot be negative (got {})",
            equipment_cost.value()
        )));
    }

    let power = dimensioning.system_power;
    let mut costs = CostBreakdown {
        equipment: equipment_cost.round_to_cents(),
        installation: (power * config.installation_cost_per_kw).round_to_cents(),
        grounding: config.grounding_cost.round_to_cents(),
        homologation: config.homologation_cost.round_to_cents(),
        plates: config.plates_cost.round_to_cents(),
        civil_works: (power * config.civil_works_cost_per_kw).round_to_cents(),
        subtotal: Money(0.0),
        margin: Money(0.0),
        commission: Money(0.0),
        sale_price: Money(0.0),
        net_profit: Money(0.0),
    };

    let subtotal_cents: i64 = costs.components().iter().map(|cost| cost.to_cents()).sum();
    costs.subtotal = Money::from_cents(subtotal_cents);

    let margin_cents = (costs.subtotal * config.margin).to_cents();
    costs.margin = Money::from_cents(margin_cents);
    costs.sale_price = Money::from_cents(subtotal_cents + margin_cents);

    let commission_base = match config.commission_base {
        CommissionBase::SalePrice => costs.sale_price,
        CommissionBase::Subtotal => costs.subtotal,
    };
    let commission_cents = (commission_base * config.commission).to_cents();
    costs.commission = Money::from_cents(commission_cents);
    costs.net_profit = Money::from_cents(margin_cents - commission_cents);

    debug!(
        "Subtotal {:.2}, margin {:.2}, sale price {:.2}",
        costs.subtotal.value(),
        costs.margin.value(),
        costs.sale_price.value()
    );

    Ok(costs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::{dimensioning, scenario_config};
    use crate::units::{Dimensionless, MoneyPerPower, Power};
    use float_cmp::assert_approx_eq;
    use rstest::rstest;

    #[rstest]
    fn test_build_costs_scenario(
        dimensioning: DimensioningResult,
        scenario_config: CalculationConfig,
    ) {
        let costs = build_costs(&dimensioning, &scenario_config, Money(9000.0)).unwrap();

        // 3.51 kWp
        assert_eq!(costs.equipment, Money(9000.0));
        assert_eq!(costs.installation, Money(1404.0));
        assert_eq!(costs.civil_works, Money(351.0));
        assert_eq!(costs.grounding, Money(300.0));
        assert_eq!(costs.homologation, Money(500.0));
        assert_eq!(costs.plates, Money(60.0));
        assert_eq!(costs.subtotal, Money(11615.0));
        assert_eq!(costs.margin, Money(3484.5));
        assert_eq!(costs.sale_price, Money(15099.5));
        assert_approx_eq!(Money, costs.commission, Money(754.98), epsilon = 0.011);
        assert_eq!(
            costs.net_profit.to_cents(),
            costs.margin.to_cents() - costs.commission.to_cents()
        );
    }

    #[rstest]
    #[case(0.0, 0.0)]
    #[case(0.123, 0.07)]
    #[case(0.3, 0.05)]
    #[case(1.0, 1.0)]
    fn test_build_costs_totals_exact(
        #[case] margin: f64,
        #[case] commission: f64,
        dimensioning: DimensioningResult,
    ) {
        // Awkward rates so every component needs rounding
        let config = CalculationConfig {
            margin: Dimensionless(margin),
            commission: Dimensionless(commission),
            installation_cost_per_kw: MoneyPerPower(433.333),
            civil_works_cost_per_kw: MoneyPerPower(97.777),
            grounding_cost: Money(299.999),
            ..CalculationConfig::default()
        };
        let costs = build_costs(&dimensioning, &config, Money(8765.4321)).unwrap();

        let components: i64 = costs.components().iter().map(|c| c.to_cents()).sum();
        assert_eq!(components, costs.subtotal.to_cents());
        assert_eq!(
            costs.subtotal.to_cents() + costs.margin.to_cents(),
            costs.sale_price.to_cents()
        );
    }

    #[rstest]
    fn test_build_costs_zero_margin(dimensioning: DimensioningResult) {
        let config = CalculationConfig {
            margin: Dimensionless(0.0),
            ..CalculationConfig::default()
        };
        let costs = build_costs(&dimensioning, &config, Money(9000.0)).unwrap();
        assert_eq!(costs.sale_price, costs.subtotal);
        assert_eq!(costs.margin, Money(0.0));
    }

    #[rstest]
    fn test_build_costs_margin_raises_price(dimensioning: DimensioningResult) {
        let price_with_margin = |margin| {
            let config = CalculationConfig {
                margin: Dimensionless(margin),
                ..CalculationConfig::default()
            };
            build_costs(&dimensioning, &config, Money(9000.0))
                .unwrap()
                .sale_price
        };
        assert!(price_with_margin(0.4) > price_with_margin(0.2));
    }

    #[rstest]
    fn test_build_costs_commission_base(dimensioning: DimensioningResult) {
        let commission_on = |commission_base| {
            let config = CalculationConfig {
                commission_base,
                ..CalculationConfig::default()
            };
            build_costs(&dimensioning, &config, Money(9000.0)).unwrap()
        };
        let on_price = commission_on(CommissionBase::SalePrice);
        let on_subtotal = commission_on(CommissionBase::Subtotal);
        assert!(on_subtotal.commission < on_price.commission);
        assert_eq!(on_subtotal.sale_price, on_price.sale_price);
        assert_approx_eq!(
            Money,
            on_subtotal.commission,
            on_subtotal.subtotal * Dimensionless(0.05),
            epsilon = 0.006
        );
    }

    #[rstest]
    fn test_build_costs_negative_equipment(
        dimensioning: DimensioningResult,
        scenario_config: CalculationConfig,
    ) {
        assert!(matches!(
            build_costs(&dimensioning, &scenario_config, Money(-1.0)),
            Err(CalculationError::InvalidInput(_))
        ));
    }

    #[rstest]
    #[case(EquipmentPricing::Fixed(Money(9000.0)), Money(9000.0))]
    #[case(EquipmentPricing::PerWattPeak(MoneyPerWatt(2.5)), Money(8775.0))]
    fn test_equipment_pricing(
        #[case] pricing: EquipmentPricing,
        #[case] expected: Money,
        dimensioning: DimensioningResult,
    ) {
        assert_approx_eq!(Money, pricing.cost_for(&dimensioning), expected, epsilon = 1e-9);
    }

    #[test]
    fn test_equipment_pricing_deserialise() {
        let pricing: EquipmentPricing = toml::from_str("tipo = \"por_wp\"\nvalor = 2.1").unwrap();
        assert_eq!(pricing, EquipmentPricing::PerWattPeak(MoneyPerWatt(2.1)));
    }

    #[rstest]
    fn test_build_costs_monotonic_in_power(
        dimensioning: DimensioningResult,
        scenario_config: CalculationConfig,
    ) {
        let bigger = DimensioningResult {
            system_power: Power(4.095),
            ..dimensioning.clone()
        };
        let small = build_costs(&dimensioning, &scenario_config, Money(9000.0)).unwrap();
        let big = build_costs(&bigger, &scenario_config, Money(9000.0)).unwrap();
        assert!(big.sale_price > small.sale_price);
    }
}
