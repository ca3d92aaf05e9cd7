//! Per-placement candidate registry, sorted descending by floor price.
//!
//! Registration happens exactly once per placement, at startup, before any
//! request for that placement. Selection walks the descending order and
//! returns the first floor strictly below the trailing CPM.

use std::collections::HashMap;

use tracing::debug;

use super::types::{Candidate, FloorError};

#[derive(Debug, Default)]
pub struct CandidateRegistry {
    entries: HashMap<String, Vec<Candidate>>,
}

impl CandidateRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store the placement's candidates sorted descending by cpm (stable on
    /// ties). Rejects re-registration and invalid cpm values; the first
    /// registered list stays intact on error.
    pub fn register(
        &mut self,
        placement: &str,
        candidates: Vec<Candidate>,
    ) -> Result<(), FloorError> {
        if self.entries.contains_key(placement) {
            return Err(FloorError::DuplicateRegistration(placement.to_string()));
        }
        for c in &candidates {
            if !c.cpm.is_finite() || c.cpm < 0.0 {
                return Err(FloorError::InvalidCpm {
                    cpm: c.cpm,
                    ad_unit: c.ad_unit.clone(),
                });
            }
        }

        let mut sorted = candidates;
        // cpm validated finite above, so total_cmp sorts by numeric value.
        sorted.sort_by(|a, b| b.cpm.total_cmp(&a.cpm));

        debug!(
            "registered {} floor candidates | placement={placement}",
            sorted.len()
        );
        self.entries.insert(placement.to_string(), sorted);
        Ok(())
    }

    /// Highest-price candidate strictly below the trailing CPM. No signal
    /// (`None` trailing) never selects, and neither does an unregistered
    /// placement.
    pub fn select(&self, placement: &str, trailing_cpm: Option<f64>) -> Option<&Candidate> {
        let trailing = trailing_cpm?;
        self.entries
            .get(placement)?
            .iter()
            .find(|c| c.cpm < trailing)
    }

    pub fn is_registered(&self, placement: &str) -> bool {
        self.entries.contains_key(placement)
    }

    pub fn candidates(&self, placement: &str) -> Option<&[Candidate]> {
        self.entries.get(placement).map(Vec::as_slice)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ladder() -> Vec<Candidate> {
        vec![
            Candidate::new(1.0, "a"),
            Candidate::new(4.0, "d"),
            Candidate::new(2.0, "b"),
            Candidate::new(3.0, "c"),
        ]
    }

    #[test]
    fn test_register_sorts_descending() {
        let mut registry = CandidateRegistry::new();
        registry.register("P", ladder()).unwrap();

        let cpms: Vec<f64> = registry
            .candidates("P")
            .unwrap()
            .iter()
            .map(|c| c.cpm)
            .collect();
        assert_eq!(cpms, vec![4.0, 3.0, 2.0, 1.0]);
    }

    #[test]
    fn test_ties_keep_input_order() {
        let mut registry = CandidateRegistry::new();
        registry
            .register(
                "P",
                vec![
                    Candidate::new(2.0, "first"),
                    Candidate::new(2.0, "second"),
                    Candidate::new(5.0, "top"),
                ],
            )
            .unwrap();

        let units: Vec<&str> = registry
            .candidates("P")
            .unwrap()
            .iter()
            .map(|c| c.ad_unit.as_str())
            .collect();
        assert_eq!(units, vec!["top", "first", "second"]);
    }

    #[test]
    fn test_select_highest_below_trailing() {
        let mut registry = CandidateRegistry::new();
        registry.register("P", ladder()).unwrap();

        let picked = registry.select("P", Some(3.0)).unwrap();
        assert_eq!(picked.ad_unit, "b");
        assert!((picked.cpm - 2.0).abs() < 1e-9);
    }

    #[test]
    fn test_select_strictly_below() {
        let mut registry = CandidateRegistry::new();
        registry.register("P", ladder()).unwrap();

        // Equal to a floor never selects it.
        let picked = registry.select("P", Some(4.0)).unwrap();
        assert_eq!(picked.ad_unit, "c");
    }

    #[test]
    fn test_select_none_when_all_floors_too_high() {
        let mut registry = CandidateRegistry::new();
        registry.register("P", ladder()).unwrap();
        assert!(registry.select("P", Some(0.5)).is_none());
    }

    #[test]
    fn test_no_signal_never_selects() {
        let mut registry = CandidateRegistry::new();
        registry.register("P", ladder()).unwrap();
        assert!(registry.select("P", None).is_none());
    }

    #[test]
    fn test_unregistered_placement_selects_none() {
        let registry = CandidateRegistry::new();
        assert!(registry.select("ghost", Some(10.0)).is_none());
    }

    #[test]
    fn test_duplicate_registration_rejected_first_intact() {
        let mut registry = CandidateRegistry::new();
        registry.register("P", ladder()).unwrap();

        let err = registry
            .register("P", vec![Candidate::new(9.9, "late")])
            .unwrap_err();
        assert!(matches!(err, FloorError::DuplicateRegistration(_)));

        // First registration untouched.
        assert_eq!(registry.candidates("P").unwrap().len(), 4);
        assert_eq!(registry.candidates("P").unwrap()[0].ad_unit, "d");
    }

    #[test]
    fn test_invalid_cpm_rejected() {
        let mut registry = CandidateRegistry::new();
        let err = registry
            .register("P", vec![Candidate::new(f64::NAN, "bad")])
            .unwrap_err();
        assert!(matches!(err, FloorError::InvalidCpm { .. }));

        let err = registry
            .register("P", vec![Candidate::new(-1.0, "neg")])
            .unwrap_err();
        assert!(matches!(err, FloorError::InvalidCpm { .. }));

        // Nothing was stored.
        assert!(!registry.is_registered("P"));
    }

    #[test]
    fn test_zero_cpm_candidate_acts_as_catch_all() {
        let mut registry = CandidateRegistry::new();
        registry
            .register("P", vec![Candidate::new(2.0, "b"), Candidate::new(0.0, "base")])
            .unwrap();

        let picked = registry.select("P", Some(0.1)).unwrap();
        assert_eq!(picked.ad_unit, "base");
    }
}
