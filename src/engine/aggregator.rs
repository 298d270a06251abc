//! Parcel selection and incremental aggregation.
//!
//! `ReportState` owns every running total of the report. Each toggle
//! applies one signed delta to the municipalities, ecosystem types and
//! global services the parcel touches, then refreshes the aggregate row,
//! so the totals are consistent after every single toggle.

use super::state::{settle, EcoTypeState, EngineOptions, MunicipalityState, ServiceState};
use crate::error::EngineError;
use crate::models::{ParcelContribution, ParcelRow, ReportInputs, ServiceKey};
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, info, warn};

/// How a toggle affected a municipality row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RowChange {
    Inserted(String),
    Updated(String),
    Removed(String),
}

/// Result of a successful toggle.
#[derive(Debug, Clone, PartialEq)]
pub struct ToggleOutcome {
    pub parcel_id: String,
    /// State of the parcel after the toggle.
    pub selected: bool,
    pub rows: Vec<RowChange>,
}

/// Result of a bulk selection change.
#[derive(Debug, Clone, Default)]
pub struct SelectionSummary {
    pub applied: usize,
    pub rejected: Vec<EngineError>,
}

/// The whole mutable state of a report session.
#[derive(Debug, Clone)]
pub struct ReportState {
    options: EngineOptions,
    contributions: BTreeMap<String, ParcelContribution>,
    populations: BTreeMap<String, f64>,
    parcels: Vec<ParcelRow>,
    selection: BTreeSet<String>,
    municipalities: BTreeMap<String, MunicipalityState>,
    /// Municipality names in presentation order.
    row_order: Vec<String>,
    totals: BTreeMap<ServiceKey, f64>,
    ecosystems: Vec<EcoTypeState>,
    global_services: Vec<ServiceState>,
}

impl ReportState {
    /// Seed the state from the input documents.
    ///
    /// Municipalities with a nonzero baseline impact get a row straight
    /// away, with zero offsets and nets equal to the signed baseline.
    pub fn initialize(inputs: ReportInputs, options: EngineOptions) -> Self {
        let ReportInputs {
            contributions,
            municipalities: baselines,
            benefits,
        } = inputs;

        let mut municipalities = BTreeMap::new();
        let mut row_order = Vec::new();
        for (name, baseline) in &baselines {
            if baseline.has_baseline() {
                let state = MunicipalityState::from_baseline(
                    name,
                    baseline,
                    &options.services,
                    options.impact_sign,
                );
                municipalities.insert(name.clone(), state);
                row_order.push(name.clone());
            }
        }

        let populations = baselines
            .iter()
            .map(|(name, baseline)| (name.clone(), baseline.population()))
            .collect();

        let ecosystems = benefits
            .ecosystems
            .iter()
            .map(|target| EcoTypeState::new(&target.eco_type, target.required_offset))
            .collect();

        let global_services = benefits
            .global_services
            .iter()
            .map(|g| ServiceState::new(g.service.clone(), g.impact, options.impact_sign))
            .collect();

        let mut state = Self {
            options,
            contributions,
            populations,
            parcels: benefits.parcels,
            selection: BTreeSet::new(),
            municipalities,
            row_order,
            totals: BTreeMap::new(),
            ecosystems,
            global_services,
        };
        state.recompute_aggregate_row();

        info!(
            "Initialized report: {} parcels, {} municipalities with baseline impacts",
            state.parcel_ids().len(),
            state.row_order.len()
        );
        state
    }

    /// Select a parcel and fold its contribution into every total.
    pub fn select_parcel(&mut self, parcel_id: &str) -> Result<ToggleOutcome, EngineError> {
        self.ensure_known(parcel_id)?;
        if !self.selection.insert(parcel_id.to_string()) {
            return Err(EngineError::AlreadySelected(parcel_id.to_string()));
        }

        let rows = self.add_municipal_contribution(parcel_id);
        self.apply_benefits(parcel_id, true);
        self.recompute_aggregate_row();

        debug!("Selected parcel {}: {:?}", parcel_id, rows);
        Ok(ToggleOutcome {
            parcel_id: parcel_id.to_string(),
            selected: true,
            rows,
        })
    }

    /// Deselect a parcel and take its contribution back out.
    pub fn deselect_parcel(&mut self, parcel_id: &str) -> Result<ToggleOutcome, EngineError> {
        self.ensure_known(parcel_id)?;
        if !self.selection.remove(parcel_id) {
            return Err(EngineError::NotSelected(parcel_id.to_string()));
        }

        let rows = self.remove_municipal_contribution(parcel_id);
        self.apply_benefits(parcel_id, false);
        self.recompute_aggregate_row();

        debug!("Deselected parcel {}: {:?}", parcel_id, rows);
        Ok(ToggleOutcome {
            parcel_id: parcel_id.to_string(),
            selected: false,
            rows,
        })
    }

    /// Flip a parcel's selection.
    pub fn toggle_parcel(&mut self, parcel_id: &str) -> Result<ToggleOutcome, EngineError> {
        if self.selection.contains(parcel_id) {
            self.deselect_parcel(parcel_id)
        } else {
            self.select_parcel(parcel_id)
        }
    }

    /// Select each listed parcel in turn.
    pub fn apply_selection<S: AsRef<str>>(&mut self, parcel_ids: &[S]) -> SelectionSummary {
        let mut summary = SelectionSummary::default();
        for id in parcel_ids {
            match self.select_parcel(id.as_ref()) {
                Ok(_) => summary.applied += 1,
                Err(e) => summary.rejected.push(e),
            }
        }
        summary
    }

    /// Select every parcel that is not selected yet.
    pub fn select_all(&mut self) -> SelectionSummary {
        let pending: Vec<String> = self
            .parcel_ids()
            .into_iter()
            .filter(|id| !self.selection.contains(id))
            .collect();
        self.apply_selection(&pending)
    }

    /// Deselect every selected parcel.
    pub fn clear_selection(&mut self) -> SelectionSummary {
        let selected: Vec<String> = self.selection.iter().cloned().collect();
        let mut summary = SelectionSummary::default();
        for id in &selected {
            match self.deselect_parcel(id) {
                Ok(_) => summary.applied += 1,
                Err(e) => summary.rejected.push(e),
            }
        }
        summary
    }

    /// Recompute the population-weighted net totals across all tracked
    /// municipalities.
    pub fn recompute_aggregate_row(&mut self) {
        let mut totals = BTreeMap::new();
        for service in &self.options.services {
            let sum: f64 = self
                .municipalities
                .values()
                .map(|m| m.population_net(service))
                .sum();
            totals.insert(service.clone(), settle(sum));
        }
        self.totals = totals;
    }

    /// Add or subtract a parcel's area from its ecosystem type.
    pub fn update_biodiversity(
        &mut self,
        parcel_id: &str,
        area: f64,
        eco_type: &str,
        selected: bool,
    ) {
        if eco_type.is_empty() {
            debug!("Parcel {} has no ecosystem type", parcel_id);
            return;
        }

        match self.ecosystems.iter_mut().find(|e| e.eco_type == eco_type) {
            Some(eco) => {
                let delta = if selected { area } else { -area };
                eco.offset = settle(eco.offset + delta);
                debug!(
                    "Ecosystem '{}' offset {} (net {})",
                    eco.eco_type,
                    eco.offset,
                    eco.net()
                );
            }
            None => warn!(
                "Parcel {} has ecosystem type '{}' with no biodiversity row, skipping",
                parcel_id, eco_type
            ),
        }
    }

    /// Add or subtract a parcel's values from the global service rows.
    ///
    /// Services the parcel has no value for are left alone.
    pub fn update_carbon(
        &mut self,
        parcel_id: &str,
        offsets: &BTreeMap<ServiceKey, f64>,
        selected: bool,
    ) {
        for service in &mut self.global_services {
            let value = offsets.get(&service.service).copied().unwrap_or(0.0);
            let delta = if selected { value } else { -value };
            service.offset = settle(service.offset + delta);
            debug!(
                "Parcel {}: {} offset {} (net {})",
                parcel_id,
                service.service,
                service.offset,
                service.net()
            );
        }
    }

    fn ensure_known(&self, parcel_id: &str) -> Result<(), EngineError> {
        let known = self.contributions.contains_key(parcel_id)
            || self.parcels.iter().any(|p| p.id == parcel_id);
        if known {
            Ok(())
        } else {
            Err(EngineError::UnknownParcel(parcel_id.to_string()))
        }
    }

    fn add_municipal_contribution(&mut self, parcel_id: &str) -> Vec<RowChange> {
        let Some(contribution) = self.contributions.get(parcel_id) else {
            debug!("Parcel {} has no municipal contribution", parcel_id);
            return Vec::new();
        };

        let services = &self.options.services;
        let mut changes = Vec::new();
        for (name, share) in &contribution.municipalities {
            match self.municipalities.get_mut(name) {
                Some(muni) => {
                    muni.selected_parcels += 1;
                    for service in services {
                        muni.apply(service, contribution.service_offset(service) * share);
                    }
                    changes.push(RowChange::Updated(name.clone()));
                }
                None => {
                    let population = match self.populations.get(name) {
                        Some(pop) => *pop,
                        None => {
                            warn!("No population data for municipality '{}', using 0", name);
                            0.0
                        }
                    };
                    let muni = MunicipalityState::from_parcel(
                        name,
                        population,
                        services,
                        contribution,
                        *share,
                    );
                    self.municipalities.insert(name.clone(), muni);
                    self.row_order.push(name.clone());
                    changes.push(RowChange::Inserted(name.clone()));
                }
            }
        }
        changes
    }

    fn remove_municipal_contribution(&mut self, parcel_id: &str) -> Vec<RowChange> {
        let Some(contribution) = self.contributions.get(parcel_id) else {
            return Vec::new();
        };

        let services = &self.options.services;
        let mut changes = Vec::new();
        for (name, share) in &contribution.municipalities {
            let Some(muni) = self.municipalities.get_mut(name) else {
                warn!(
                    "Municipality '{}' of parcel {} is not tracked, skipping",
                    name, parcel_id
                );
                continue;
            };

            muni.selected_parcels = muni.selected_parcels.saturating_sub(1);
            if muni.ref_count() == 0 {
                self.municipalities.remove(name);
                self.row_order.retain(|n| n != name);
                changes.push(RowChange::Removed(name.clone()));
            } else {
                for service in services {
                    muni.apply(service, -(contribution.service_offset(service) * share));
                }
                changes.push(RowChange::Updated(name.clone()));
            }
        }
        changes
    }

    fn apply_benefits(&mut self, parcel_id: &str, selected: bool) {
        let row = self.parcels.iter().find(|p| p.id == parcel_id);
        let contribution = self.contributions.get(parcel_id);

        let offsets: BTreeMap<ServiceKey, f64> = self
            .global_services
            .iter()
            .map(|g| {
                let value = row
                    .and_then(|r| r.service_value(&g.service))
                    .or_else(|| contribution.map(|c| c.service_offset(&g.service)))
                    .unwrap_or(0.0);
                (g.service.clone(), value)
            })
            .collect();
        let area = row.map(|r| (r.area, r.eco_type.clone()));

        if let Some((area, eco_type)) = area {
            self.update_biodiversity(parcel_id, area, &eco_type, selected);
        }
        self.update_carbon(parcel_id, &offsets, selected);
    }

    /// Every parcel id, parcel-table order first.
    pub fn parcel_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = Vec::new();
        let mut seen = BTreeSet::new();
        let table_ids = self.parcels.iter().map(|p| &p.id);
        for id in table_ids.chain(self.contributions.keys()) {
            if seen.insert(id.clone()) {
                ids.push(id.clone());
            }
        }
        ids
    }

    pub fn services(&self) -> &[ServiceKey] {
        &self.options.services
    }

    pub fn is_selected(&self, parcel_id: &str) -> bool {
        self.selection.contains(parcel_id)
    }

    pub fn selection(&self) -> &BTreeSet<String> {
        &self.selection
    }

    pub fn parcels(&self) -> &[ParcelRow] {
        &self.parcels
    }

    pub fn contribution(&self, parcel_id: &str) -> Option<&ParcelContribution> {
        self.contributions.get(parcel_id)
    }

    /// Tracked municipalities in presentation order.
    pub fn municipalities(&self) -> impl Iterator<Item = &MunicipalityState> + '_ {
        self.row_order
            .iter()
            .filter_map(|name| self.municipalities.get(name))
    }

    pub fn municipality(&self, name: &str) -> Option<&MunicipalityState> {
        self.municipalities.get(name)
    }

    /// Population-weighted net summed over tracked municipalities.
    pub fn aggregate(&self, service: &ServiceKey) -> f64 {
        self.totals.get(service).copied().unwrap_or(0.0)
    }

    pub fn ecosystems(&self) -> &[EcoTypeState] {
        &self.ecosystems
    }

    pub fn global_services(&self) -> &[ServiceState] {
        &self.global_services
    }
}
