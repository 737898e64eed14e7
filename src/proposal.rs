//! The proposal aggregate: everything a sales proposal needs, computed in one call.
use crate::config::{ConfigOverrides, resolve};
use crate::dimensioning::{ConsumptionProfile, DimensioningResult, ModuleSpec, dimension};
use crate::finance::{CostBreakdown, EquipmentPricing};
use crate::input::{input_err_msg, read_toml};
use crate::projection::{FinancialProjection, project};
use anyhow::{Context, Result};
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// The inputs for one proposal, as read from a request file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProposalRequest {
    /// Customer name, carried through to the proposal
    #[serde(rename = "cliente", default)]
    pub customer: Option<String>,
    /// The household's consumption
    #[serde(rename = "consumo")]
    pub consumption: ConsumptionProfile,
    /// The module the array is built from
    #[serde(rename = "modulo")]
    pub modules: ModuleSpec,
    /// How the equipment kit is priced
    #[serde(rename = "equipamentos")]
    pub equipment: EquipmentPricing,
    /// Overrides for the calculation configuration
    #[serde(rename = "configuracao", default)]
    pub config: Option<ConfigOverrides>,
}

impl ProposalRequest {
    /// Read a request from a TOML file
    pub fn from_path(file_path: &Path) -> Result<Self> {
        read_toml(file_path)
    }
}

/// A complete proposal.
///
/// Persisting proposals and rendering them for customers is left to the caller.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Proposal {
    /// Customer name
    #[serde(rename = "cliente", skip_serializing_if = "Option::is_none")]
    pub customer: Option<String>,
    /// The sized system
    #[serde(rename = "dimensionamento")]
    pub dimensioning: DimensioningResult,
    /// The cost and price structure
    #[serde(rename = "custos")]
    pub costs: CostBreakdown,
    /// The financial projection
    #[serde(rename = "projecao")]
    pub projection: FinancialProjection,
}

/// Run the full pipeline for a request: resolve the configuration, size the system, price it
/// and project its finances.
pub fn calculate_proposal(request: &ProposalRequest) -> Result<Proposal> {
    let config = resolve(request.config.as_ref())?;
    let dimensioning = dimension(&request.consumption, &request.modules, &config)?;
    let equipment_cost = request.equipment.cost_for(&dimensioning);
    let (costs, projection) = project(
        &dimensioning,
        &request.consumption,
        &config,
        equipment_cost,
    )?;

    info!(
        "{} modules ({:.2} kWp), sale price {:.2}",
        dimensioning.module_count,
        dimensioning.system_power.value(),
        costs.sale_price.value()
    );
    if !projection.is_payback_reached() {
        warn!("Savings do not pay back the sale price within the projection");
    }

    Ok(Proposal {
        customer: request.customer.clone(),
        dimensioning,
        costs,
        projection,
    })
}

/// Read a request file and calculate its proposal
pub fn load_and_calculate(file_path: &Path) -> Result<Proposal> {
    let request = ProposalRequest::from_path(file_path)?;
    calculate_proposal(&request).with_context(|| input_err_msg(file_path))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CalculationError;
    use crate::fixture::{assert_error, proposal_request};
    use crate::units::{Dimensionless, Energy, Irradiation, MoneyPerEnergy};
    use rstest::rstest;
    use std::fs::File;
    use std::io::Write;
    use tempfile::tempdir;

    #[rstest]
    fn test_calculate_proposal(proposal_request: ProposalRequest) {
        let proposal = calculate_proposal(&proposal_request).unwrap();
        assert_eq!(proposal.customer.as_deref(), Some("Maria"));
        assert_eq!(proposal.dimensioning.module_count, 6);
        assert!(proposal.projection.months_to_payback.unwrap() <= 300);

        // Pure: same inputs, same outputs
        assert_eq!(calculate_proposal(&proposal_request).unwrap(), proposal);
    }

    #[rstest]
    fn test_calculate_proposal_margin(proposal_request: ProposalRequest) {
        let with_margin = |margin| {
            let request = ProposalRequest {
                config: Some(ConfigOverrides {
                    margin: Some(Dimensionless(margin)),
                    ..ConfigOverrides::default()
                }),
                ..proposal_request.clone()
            };
            calculate_proposal(&request).unwrap()
        };
        let low = with_margin(0.2);
        let high = with_margin(0.4);
        assert!(high.costs.sale_price > low.costs.sale_price);
        assert!(
            high.projection.months_to_payback.unwrap() >= low.projection.months_to_payback.unwrap()
        );
    }

    #[rstest]
    fn test_calculate_proposal_monotonic(proposal_request: ProposalRequest) {
        let with_consumption = |kwh| {
            let mut request = proposal_request.clone();
            request.consumption.monthly_consumption = Energy(kwh);
            calculate_proposal(&request).unwrap()
        };
        let mut previous = with_consumption(100.0);
        for kwh in [150.0, 400.0, 401.0, 800.0, 2000.0] {
            let next = with_consumption(kwh);
            assert!(next.dimensioning.system_power >= previous.dimensioning.system_power);
            assert!(next.dimensioning.module_count >= previous.dimensioning.module_count);
            assert!(next.costs.sale_price >= previous.costs.sale_price);
            previous = next;
        }
    }

    #[rstest]
    fn test_calculate_proposal_zero_consumption(mut proposal_request: ProposalRequest) {
        proposal_request.consumption.monthly_consumption = Energy(0.0);
        let err = calculate_proposal(&proposal_request).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<CalculationError>(),
            Some(CalculationError::InvalidInput(_))
        ));
    }

    #[rstest]
    fn test_calculate_proposal_bad_config(mut proposal_request: ProposalRequest) {
        proposal_request.config = Some(ConfigOverrides {
            degradation: Some(Dimensionless(-0.01)),
            ..ConfigOverrides::default()
        });
        assert_error!(
            calculate_proposal(&proposal_request),
            "Invalid configuration: degradacao_anual must be between 0 and 1 (got -0.01)"
        );
    }

    #[test]
    fn test_load_and_calculate() {
        let dir = tempdir().unwrap();
        let file_path = dir.path().join("proposta.toml");
        {
            let mut file = File::create(&file_path).unwrap();
            writeln!(
                file,
                r#"
cliente = "João"

[consumo]
consumo_mensal = 350.0
concessionaria = "CEMIG"
cidade = "Belo Horizonte"

[modulo]
potencia = 550.0
area = 2.6

[equipamentos]
tipo = "por_wp"
valor = 2.4

[configuracao]
margem_desejada = 0.25
"#
            )
            .unwrap();
        }

        let proposal = load_and_calculate(&file_path).unwrap();
        assert_eq!(proposal.customer.as_deref(), Some("João"));
        assert_eq!(proposal.dimensioning.tariff, MoneyPerEnergy(0.96));
        assert_eq!(proposal.dimensioning.irradiation, Irradiation(5.25));
        assert!(proposal.projection.is_payback_reached());
    }

    #[test]
    fn test_load_and_calculate_unknown_utility() {
        let dir = tempdir().unwrap();
        let file_path = dir.path().join("proposta.toml");
        std::fs::write(
            &file_path,
            r#"
[consumo]
consumo_mensal = 350.0
concessionaria = "Nowhere Power"

[modulo]
potencia = 550.0
area = 2.6

[equipamentos]
tipo = "fixo"
valor = 8000.0
"#,
        )
        .unwrap();

        // Falls back to the default tariff
        let proposal = load_and_calculate(&file_path).unwrap();
        assert_eq!(proposal.dimensioning.tariff, MoneyPerEnergy(0.85));
    }
}
