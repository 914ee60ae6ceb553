use std::collections::BTreeMap;

use oxidize_select_core::error::{MlError, MlResult};
use oxidize_select_core::{ParamSet, ParamValue};
use serde::{Deserialize, Serialize};

/// A union of parameter grids.
///
/// Each subspace maps `step__param` names to the values to try; the
/// candidates of a subspace are the cartesian product of its lists, and the
/// candidates of the grid are those of every subspace in order. Keys are
/// enumerated in sorted order with the last key varying fastest.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ParamGrid {
    subspaces: Vec<BTreeMap<String, Vec<ParamValue>>>,
}

impl ParamGrid {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one subspace, e.g. `[("svc__c", vals), ("svc__kernel", vec!["linear".into()])]`.
    pub fn with_subspace<I, K>(mut self, entries: I) -> Self
    where
        I: IntoIterator<Item = (K, Vec<ParamValue>)>,
        K: Into<String>,
    {
        self.subspaces
            .push(entries.into_iter().map(|(k, v)| (k.into(), v)).collect());
        self
    }

    pub fn subspaces(&self) -> &[BTreeMap<String, Vec<ParamValue>>] {
        &self.subspaces
    }

    /// Number of candidates, without enumerating them.
    pub fn len(&self) -> usize {
        self.subspaces
            .iter()
            .map(|s| s.values().map(|v| v.len()).product::<usize>())
            .sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn validate(&self) -> MlResult<()> {
        if self.subspaces.is_empty() {
            return Err(MlError::invalid_param("param_grid", "has no subspaces"));
        }
        for subspace in &self.subspaces {
            if let Some((name, _)) = subspace.iter().find(|(_, v)| v.is_empty()) {
                return Err(MlError::invalid_param(name, "has an empty list of values"));
            }
        }
        Ok(())
    }

    /// Every configuration, in enumeration order.
    pub fn candidates(&self) -> MlResult<Vec<ParamSet>> {
        self.validate()?;
        let mut out = Vec::with_capacity(self.len());
        for subspace in &self.subspaces {
            let entries: Vec<(&String, &Vec<ParamValue>)> = subspace.iter().collect();
            out.extend(cartesian_product(&entries));
        }
        Ok(out)
    }
}

fn cartesian_product(entries: &[(&String, &Vec<ParamValue>)]) -> Vec<ParamSet> {
    let Some(((name, values), rest)) = entries.split_first() else {
        return vec![ParamSet::new()];
    };
    let rest_configs = cartesian_product(rest);

    values
        .iter()
        .flat_map(|v| {
            rest_configs.iter().map(move |config| {
                let mut new_config = config.clone();
                new_config.insert((*name).clone(), v.clone());
                new_config
            })
        })
        .collect()
}

/// Float values as parameter values, e.g. the `param_range` of a grid.
pub fn float_values(values: &[f64]) -> Vec<ParamValue> {
    values.iter().map(|&v| ParamValue::Float(v)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use oxidize_select_core::params::format_params;

    fn svc_grid() -> ParamGrid {
        let c = float_values(&[0.1, 1.0, 10.0]);
        ParamGrid::new()
            .with_subspace([("svc__c", c.clone()), ("svc__kernel", vec!["linear".into()])])
            .with_subspace([
                ("svc__c", c),
                ("svc__gamma", float_values(&[0.01, 0.1])),
                ("svc__kernel", vec!["rbf".into()]),
            ])
    }

    #[test]
    fn test_len_matches_enumeration() {
        let grid = svc_grid();
        assert_eq!(grid.len(), 3 + 6);
        assert_eq!(grid.candidates().unwrap().len(), 9);
    }

    #[test]
    fn test_enumeration_order() {
        let candidates = svc_grid().candidates().unwrap();
        assert_eq!(format_params(&candidates[0]), "{'svc__c': 0.1, 'svc__kernel': 'linear'}");
        assert_eq!(format_params(&candidates[2]), "{'svc__c': 10, 'svc__kernel': 'linear'}");
        // Last key varies fastest within a subspace.
        assert_eq!(candidates[3]["svc__gamma"], ParamValue::Float(0.01));
        assert_eq!(candidates[4]["svc__gamma"], ParamValue::Float(0.1));
        assert_eq!(candidates[4]["svc__c"], ParamValue::Float(0.1));
        // Kernel-conditioned parameters stay in their subspace.
        assert!(candidates[..3].iter().all(|c| !c.contains_key("svc__gamma")));
    }

    #[test]
    fn test_empty_subspace_is_one_candidate() {
        let grid = ParamGrid::new().with_subspace(Vec::<(String, Vec<ParamValue>)>::new());
        assert_eq!(grid.candidates().unwrap(), vec![ParamSet::new()]);
    }

    #[test]
    fn test_invalid_grids() {
        assert!(ParamGrid::new().candidates().is_err());
        let grid = ParamGrid::new().with_subspace([("svc__c", Vec::new())]);
        assert!(matches!(grid.candidates(), Err(MlError::InvalidParameter { .. })));
    }

    #[test]
    fn test_deserialize_from_json() {
        let grid: ParamGrid =
            serde_json::from_str(r#"[{"tree__max_depth": [1, 2, null]}]"#).unwrap();
        let candidates = grid.candidates().unwrap();
        assert_eq!(candidates.len(), 3);
        assert!(candidates[2]["tree__max_depth"].is_none());
    }
}
