use std::collections::BTreeMap;

use oxidize_select_core::error::{MlError, MlResult};
use oxidize_select_core::{ParamSet, ParamValue};
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Sampling distribution for one hyperparameter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ParamDistribution {
    /// Uniform over a fixed list of values.
    Choice { values: Vec<ParamValue> },
    /// Uniform on `[low, high)`.
    Uniform { low: f64, high: f64 },
    /// Uniform in log space on `[low, high)`, `0 < low < high`.
    LogUniform { low: f64, high: f64 },
    /// Uniform integer on `[low, high]`.
    IntUniform { low: i64, high: i64 },
}

impl ParamDistribution {
    pub fn choice<V: Into<ParamValue>>(values: impl IntoIterator<Item = V>) -> Self {
        ParamDistribution::Choice {
            values: values.into_iter().map(Into::into).collect(),
        }
    }

    pub fn log_uniform(low: f64, high: f64) -> Self {
        ParamDistribution::LogUniform { low, high }
    }

    pub fn validate(&self, name: &str) -> MlResult<()> {
        let ok = match self {
            ParamDistribution::Choice { values } => !values.is_empty(),
            ParamDistribution::Uniform { low, high } => {
                low.is_finite() && high.is_finite() && low < high
            }
            ParamDistribution::LogUniform { low, high } => {
                high.is_finite() && *low > 0.0 && low < high
            }
            ParamDistribution::IntUniform { low, high } => low <= high,
        };
        if ok {
            Ok(())
        } else {
            Err(MlError::invalid_param(name, format!("invalid distribution {:?}", self)))
        }
    }

    /// Draw one value. Call `validate` first; empty ranges panic inside `rand`.
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> ParamValue {
        match self {
            ParamDistribution::Choice { values } => {
                values[rng.gen_range(0..values.len())].clone()
            }
            ParamDistribution::Uniform { low, high } => ParamValue::Float(rng.gen_range(*low..*high)),
            ParamDistribution::LogUniform { low, high } => {
                ParamValue::Float(rng.gen_range(low.ln()..high.ln()).exp())
            }
            ParamDistribution::IntUniform { low, high } => ParamValue::Int(rng.gen_range(*low..=*high)),
        }
    }
}

/// A union of per-parameter distributions.
///
/// Sampling first picks a subspace uniformly (no draw when there is only
/// one), then draws every parameter of that subspace in key order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ParamDistributions {
    subspaces: Vec<BTreeMap<String, ParamDistribution>>,
}

impl ParamDistributions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_subspace<I, K>(mut self, entries: I) -> Self
    where
        I: IntoIterator<Item = (K, ParamDistribution)>,
        K: Into<String>,
    {
        self.subspaces
            .push(entries.into_iter().map(|(k, d)| (k.into(), d)).collect());
        self
    }

    pub fn validate(&self) -> MlResult<()> {
        if self.subspaces.is_empty() {
            return Err(MlError::invalid_param("param_distributions", "has no subspaces"));
        }
        for subspace in &self.subspaces {
            for (name, dist) in subspace {
                dist.validate(name)?;
            }
        }
        Ok(())
    }

    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> MlResult<ParamSet> {
        self.validate()?;
        let subspace = if self.subspaces.len() == 1 {
            &self.subspaces[0]
        } else {
            &self.subspaces[rng.gen_range(0..self.subspaces.len())]
        };
        Ok(subspace
            .iter()
            .map(|(name, dist)| (name.clone(), dist.sample(rng)))
            .collect())
    }

    /// Draw `n` independent configurations (with replacement).
    pub fn sample_n<R: Rng + ?Sized>(&self, n: usize, rng: &mut R) -> MlResult<Vec<ParamSet>> {
        (0..n).map(|_| self.sample(rng)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn svc_distributions() -> ParamDistributions {
        ParamDistributions::new()
            .with_subspace([
                ("svc__c", ParamDistribution::log_uniform(1e-4, 1e3)),
                ("svc__kernel", ParamDistribution::choice(["linear"])),
            ])
            .with_subspace([
                ("svc__c", ParamDistribution::log_uniform(1e-4, 1e3)),
                ("svc__gamma", ParamDistribution::log_uniform(1e-4, 1e3)),
                ("svc__kernel", ParamDistribution::choice(["rbf"])),
            ])
    }

    #[test]
    fn test_same_seed_same_draws() {
        let dists = svc_distributions();
        let a = dists.sample_n(20, &mut StdRng::seed_from_u64(1)).unwrap();
        let b = dists.sample_n(20, &mut StdRng::seed_from_u64(1)).unwrap();
        assert_eq!(a.len(), 20);
        assert_eq!(a, b);
        let c = dists.sample_n(20, &mut StdRng::seed_from_u64(2)).unwrap();
        assert_ne!(a, c);
    }

    #[test]
    fn test_conditioned_parameters() {
        let draws = svc_distributions().sample_n(200, &mut StdRng::seed_from_u64(5)).unwrap();
        for params in &draws {
            let kernel = params["svc__kernel"].as_str().unwrap();
            assert_eq!(params.contains_key("svc__gamma"), kernel == "rbf");
        }
        assert!(draws.iter().any(|p| p["svc__kernel"] == ParamValue::from("linear")));
        assert!(draws.iter().any(|p| p["svc__kernel"] == ParamValue::from("rbf")));
    }

    #[test]
    fn test_log_uniform_range_and_spread() {
        let dist = ParamDistribution::log_uniform(1e-4, 1e3);
        let mut rng = StdRng::seed_from_u64(0);
        let draws: Vec<f64> = (0..2000)
            .map(|_| dist.sample(&mut rng).as_float().unwrap())
            .collect();
        assert!(draws.iter().all(|&v| (1e-4..1e3).contains(&v)));
        // Uniform in log space: about 4/7 of draws fall below 1.
        let below_one = draws.iter().filter(|&&v| v < 1.0).count() as f64 / 2000.0;
        assert!((below_one - 4.0 / 7.0).abs() < 0.05, "{}", below_one);
    }

    #[test]
    fn test_int_uniform_inclusive() {
        let dist = ParamDistribution::IntUniform { low: 1, high: 3 };
        let mut rng = StdRng::seed_from_u64(9);
        let mut seen = [false; 3];
        for _ in 0..100 {
            let v = dist.sample(&mut rng).as_int().unwrap();
            seen[(v - 1) as usize] = true;
        }
        assert_eq!(seen, [true; 3]);
    }

    #[test]
    fn test_validate() {
        assert!(ParamDistribution::log_uniform(0.0, 1.0).validate("c").is_err());
        assert!(ParamDistribution::Uniform { low: 2.0, high: 1.0 }.validate("c").is_err());
        assert!(ParamDistribution::Choice { values: vec![] }.validate("c").is_err());
        assert!(ParamDistributions::new().sample(&mut StdRng::seed_from_u64(0)).is_err());
    }

    #[test]
    fn test_deserialize() {
        let dists: ParamDistributions = serde_json::from_str(
            r#"[{"svc__c": {"type": "log_uniform", "low": 0.0001, "high": 1000.0}}]"#,
        )
        .unwrap();
        let params = dists.sample(&mut StdRng::seed_from_u64(3)).unwrap();
        assert!(params["svc__c"].as_float().is_some());
    }
}
