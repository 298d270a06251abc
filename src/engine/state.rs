//! Running totals tracked by the engine.

use crate::models::{MunicipalityBaseline, ParcelContribution, ServiceKey};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Residuals smaller than this are snapped to zero after an update.
pub const SETTLE_EPSILON: f64 = 1e-9;

pub(crate) fn settle(value: f64) -> f64 {
    if value.abs() < SETTLE_EPSILON {
        0.0
    } else {
        value
    }
}

/// How authored baseline impacts enter the nets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImpactSign {
    /// Impacts are already signed (losses negative).
    #[default]
    AsAuthored,
    /// Impacts are authored as positive magnitudes of loss.
    Negated,
}

impl ImpactSign {
    /// Signed impact. A zero impact stays `0.0`, never `-0.0`.
    pub fn apply(&self, impact: f64) -> f64 {
        let signed = match self {
            ImpactSign::AsAuthored => impact,
            ImpactSign::Negated => -impact,
        };
        if signed == 0.0 {
            0.0
        } else {
            signed
        }
    }
}

/// Engine settings fixed at startup.
#[derive(Debug, Clone, Default)]
pub struct EngineOptions {
    /// Services tracked per municipality.
    pub services: Vec<ServiceKey>,
    pub impact_sign: ImpactSign,
}

/// Running totals for one municipality.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MunicipalityState {
    pub name: String,
    pub population: f64,
    /// Selected parcels currently contributing.
    pub selected_parcels: usize,
    /// Seeded from a nonzero baseline impact; such rows are never removed.
    pub has_baseline: bool,
    /// Impacts as authored.
    pub impacts: BTreeMap<ServiceKey, f64>,
    pub offsets: BTreeMap<ServiceKey, f64>,
    /// Signed baseline plus offset.
    pub nets: BTreeMap<ServiceKey, f64>,
}

impl MunicipalityState {
    /// Seed a municipality from its baseline impacts, with zero offsets.
    pub fn from_baseline(
        name: &str,
        baseline: &MunicipalityBaseline,
        services: &[ServiceKey],
        sign: ImpactSign,
    ) -> Self {
        let mut state = Self::empty(name, baseline.population());
        state.has_baseline = true;
        for service in services {
            let impact = baseline.impact(service);
            state.impacts.insert(service.clone(), impact);
            state.offsets.insert(service.clone(), 0.0);
            state.nets.insert(service.clone(), sign.apply(impact));
        }
        state
    }

    /// Create a municipality first referenced by a selected parcel.
    pub fn from_parcel(
        name: &str,
        population: f64,
        services: &[ServiceKey],
        contribution: &ParcelContribution,
        share: f64,
    ) -> Self {
        let mut state = Self::empty(name, population);
        state.selected_parcels = 1;
        for service in services {
            let offset = contribution.service_offset(service) * share;
            state.impacts.insert(service.clone(), 0.0);
            state.offsets.insert(service.clone(), offset);
            state.nets.insert(service.clone(), offset);
        }
        state
    }

    fn empty(name: &str, population: f64) -> Self {
        Self {
            name: name.to_string(),
            population,
            selected_parcels: 0,
            has_baseline: false,
            impacts: BTreeMap::new(),
            offsets: BTreeMap::new(),
            nets: BTreeMap::new(),
        }
    }

    /// Selected parcels plus one for a baseline impact.
    pub fn ref_count(&self) -> usize {
        self.selected_parcels + usize::from(self.has_baseline)
    }

    pub fn impact(&self, service: &ServiceKey) -> f64 {
        self.impacts.get(service).copied().unwrap_or(0.0)
    }

    pub fn offset(&self, service: &ServiceKey) -> f64 {
        self.offsets.get(service).copied().unwrap_or(0.0)
    }

    pub fn net(&self, service: &ServiceKey) -> f64 {
        self.nets.get(service).copied().unwrap_or(0.0)
    }

    /// Net weighted by population.
    pub fn population_net(&self, service: &ServiceKey) -> f64 {
        self.net(service) * self.population
    }

    /// Add a signed delta to a service's offset and net.
    pub(crate) fn apply(&mut self, service: &ServiceKey, delta: f64) {
        let offset = self.offsets.entry(service.clone()).or_insert(0.0);
        *offset = settle(*offset + delta);
        let net = self.nets.entry(service.clone()).or_insert(0.0);
        *net = settle(*net + delta);
    }
}

/// Area offset against the requirement of one ecosystem type.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EcoTypeState {
    pub eco_type: String,
    pub required_offset: f64,
    pub offset: f64,
}

impl EcoTypeState {
    pub fn new(eco_type: &str, required_offset: f64) -> Self {
        Self {
            eco_type: eco_type.to_string(),
            required_offset,
            offset: 0.0,
        }
    }

    pub fn net(&self) -> f64 {
        self.offset - self.required_offset
    }
}

/// Selected offset against the baseline impact of a global service.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ServiceState {
    pub service: ServiceKey,
    /// Impact as authored.
    pub impact: f64,
    /// Signed impact the net starts from.
    pub baseline: f64,
    pub offset: f64,
}

impl ServiceState {
    pub fn new(service: ServiceKey, impact: f64, sign: ImpactSign) -> Self {
        Self {
            service,
            impact,
            baseline: sign.apply(impact),
            offset: 0.0,
        }
    }

    pub fn net(&self) -> f64 {
        self.offset + self.baseline
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn baseline(pop: f64, impacts: &[(&str, f64)]) -> MunicipalityBaseline {
        MunicipalityBaseline {
            pop: Some(pop),
            impacts: Some(
                impacts
                    .iter()
                    .map(|(k, v)| (k.to_string(), *v))
                    .collect(),
            ),
        }
    }

    #[test]
    fn test_seed_from_baseline() {
        let services = vec![ServiceKey::new("sediment")];
        let state = MunicipalityState::from_baseline(
            "Shelbyville",
            &baseline(100.0, &[("Sediment impact", 4.0)]),
            &services,
            ImpactSign::Negated,
        );

        assert_eq!(state.ref_count(), 1);
        assert_eq!(state.impact(&services[0]), 4.0);
        assert_eq!(state.offset(&services[0]), 0.0);
        assert_eq!(state.net(&services[0]), -4.0);
        assert_eq!(state.population_net(&services[0]), -400.0);
    }

    #[test]
    fn test_negated_zero_impact_is_positive_zero() {
        let services = vec![ServiceKey::new("sediment"), ServiceKey::new("nitrogen")];
        let state = MunicipalityState::from_baseline(
            "Ogdenville",
            &baseline(10.0, &[("Sediment impact", 5.0), ("Nitrogen impact", 0.0)]),
            &services,
            ImpactSign::Negated,
        );

        let net = state.net(&services[1]);
        assert_eq!(net, 0.0);
        assert!(net.is_sign_positive());
        assert!(state.population_net(&services[1]).is_sign_positive());
        assert_eq!(state.net(&services[0]), -5.0);
    }

    #[test]
    fn test_apply_settles_residuals() {
        let service = ServiceKey::new("nitrogen");
        let mut state = MunicipalityState::empty("Ogdenville", 10.0);
        state.apply(&service, 0.1);
        state.apply(&service, 0.2);
        state.apply(&service, -0.3);
        assert_eq!(state.offset(&service), 0.0);
        assert_eq!(state.net(&service), 0.0);
    }

    #[test]
    fn test_eco_and_service_nets() {
        let mut wetland = EcoTypeState::new("wetland", 100.0);
        assert_eq!(wetland.net(), -100.0);
        wetland.offset = 30.0;
        assert_eq!(wetland.net(), -70.0);

        let mut carbon =
            ServiceState::new(ServiceKey::new("carbon"), -50.0, ImpactSign::AsAuthored);
        carbon.offset = 20.0;
        assert_eq!(carbon.net(), -30.0);
    }
}
