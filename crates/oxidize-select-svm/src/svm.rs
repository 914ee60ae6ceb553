use oxidize_select_core::error::{MlError, MlResult};
use oxidize_select_core::estimator::check_xy;
use oxidize_select_core::tensor::{dot, squared_distance};
use oxidize_select_core::{Estimator, Float, ParamValue, Tensor};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Kernel family for [`SVC`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Kernel {
    Linear,
    Rbf,
    Polynomial,
}

impl Kernel {
    pub fn parse(name: &str) -> MlResult<Self> {
        match name {
            "linear" => Ok(Kernel::Linear),
            "rbf" => Ok(Kernel::Rbf),
            "poly" => Ok(Kernel::Polynomial),
            other => Err(MlError::invalid_param(
                "kernel",
                format!("unknown kernel '{}', expected linear, rbf or poly", other),
            )),
        }
    }
}

/// Kernel coefficient for the rbf and polynomial kernels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Gamma<T: Float> {
    /// `1 / (n_features * var(x))`, computed from the training data.
    Scale,
    Value(T),
}

/// Support Vector Classifier trained with simplified SMO.
#[derive(Debug, Clone)]
pub struct SVC<T: Float> {
    pub c: T,
    pub kernel: Kernel,
    pub gamma: Gamma<T>,
    pub degree: i32,
    pub coef0: T,
    /// Upper bound on full sweeps over the training set.
    pub max_iter: usize,
    pub tol: T,
    pub seed: u64,
    // Trained parameters
    support_vectors: Option<Tensor<T>>,
    dual_coef: Vec<T>,
    bias: T,
    fitted_gamma: T,
}

impl<T: Float> Default for SVC<T> {
    fn default() -> Self {
        SVC::new(T::ONE, Kernel::Rbf, 200)
    }
}

impl<T: Float> SVC<T> {
    pub fn new(c: T, kernel: Kernel, max_iter: usize) -> Self {
        SVC {
            c,
            kernel,
            gamma: Gamma::Scale,
            degree: 3,
            coef0: T::ZERO,
            max_iter,
            tol: T::from_f64(1e-3),
            seed: 0,
            support_vectors: None,
            dual_coef: Vec::new(),
            bias: T::ZERO,
            fitted_gamma: T::ONE,
        }
    }

    pub fn with_gamma(mut self, gamma: T) -> Self {
        self.gamma = Gamma::Value(gamma);
        self
    }

    fn kernel_eval(&self, a: &[T], b: &[T]) -> T {
        match self.kernel {
            Kernel::Linear => dot(a, b),
            Kernel::Rbf => (-self.fitted_gamma * squared_distance(a, b)).exp(),
            Kernel::Polynomial => (self.fitted_gamma * dot(a, b) + self.coef0).powi(self.degree),
        }
    }

    fn resolve_gamma(&self, x: &Tensor<T>) -> MlResult<T> {
        match self.gamma {
            Gamma::Value(g) if g > T::ZERO => Ok(g),
            Gamma::Value(g) => Err(MlError::invalid_param("gamma", format!("must be positive, got {}", g))),
            Gamma::Scale => {
                let var = x.var_all()?;
                let p = T::from_usize(x.n_cols()?);
                Ok(if var > T::ZERO { T::ONE / (p * var) } else { T::ONE })
            }
        }
    }

    /// Fit using simplified SMO over a precomputed Gram matrix.
    pub fn fit(&mut self, x: &Tensor<T>, y: &Tensor<T>) -> MlResult<()> {
        if !(self.c > T::ZERO) {
            return Err(MlError::invalid_param("c", format!("must be positive, got {}", self.c)));
        }
        let n = x.n_rows()?;
        if y.numel() != n {
            return Err(MlError::ShapeMismatch { expected: vec![n], got: y.shape_vec() });
        }
        // Labels as +1/-1
        let labels: Vec<T> = y.data().iter()
            .map(|&v| if v > T::HALF { T::ONE } else { T::NEG_ONE })
            .collect();
        if n < 2 || labels.iter().all(|&l| l == labels[0]) {
            return Err(MlError::InvalidOperation("SVC needs samples of both classes".into()));
        }

        self.fitted_gamma = self.resolve_gamma(x)?;
        let rows: Vec<&[T]> = x.rows()?.collect();
        let mut gram = vec![T::ZERO; n * n];
        for i in 0..n {
            for j in i..n {
                let k = self.kernel_eval(rows[i], rows[j]);
                gram[i * n + j] = k;
                gram[j * n + i] = k;
            }
        }

        let mut alphas = vec![T::ZERO; n];
        let mut b = T::ZERO;
        // f[k] = decision value of sample k under the current alphas and b
        let mut f = vec![T::ZERO; n];
        let mut rng = StdRng::seed_from_u64(self.seed);
        let mut quiet_sweeps = 0;

        for _sweep in 0..self.max_iter {
            let mut num_changed = 0;

            for i in 0..n {
                let yi = labels[i];
                let ei = f[i] - yi;
                if !((yi * ei < -self.tol && alphas[i] < self.c)
                    || (yi * ei > self.tol && alphas[i] > T::ZERO))
                {
                    continue;
                }

                let mut j = rng.gen_range(0..n - 1);
                if j >= i {
                    j += 1;
                }
                let yj = labels[j];
                let ej = f[j] - yj;
                let (ai_old, aj_old) = (alphas[i], alphas[j]);

                let (lo, hi) = if yi != yj {
                    (T::ZERO.max(aj_old - ai_old), self.c.min(self.c + aj_old - ai_old))
                } else {
                    (T::ZERO.max(ai_old + aj_old - self.c), self.c.min(ai_old + aj_old))
                };
                if (hi - lo).abs() < T::EPSILON {
                    continue;
                }

                let kii = gram[i * n + i];
                let kjj = gram[j * n + j];
                let kij = gram[i * n + j];
                let eta = T::TWO * kij - kii - kjj;
                if eta >= T::ZERO {
                    continue;
                }

                let aj_new = (aj_old - yj * (ei - ej) / eta).max(lo).min(hi);
                if (aj_new - aj_old).abs() < T::from_f64(1e-5) {
                    continue;
                }
                let ai_new = ai_old + yi * yj * (aj_old - aj_new);
                alphas[i] = ai_new;
                alphas[j] = aj_new;

                let di = yi * (ai_new - ai_old);
                let dj = yj * (aj_new - aj_old);
                let b1 = b - ei - di * kii - dj * kij;
                let b2 = b - ej - di * kij - dj * kjj;
                let b_new = if ai_new > T::ZERO && ai_new < self.c {
                    b1
                } else if aj_new > T::ZERO && aj_new < self.c {
                    b2
                } else {
                    (b1 + b2) / T::TWO
                };

                for k in 0..n {
                    f[k] += di * gram[i * n + k] + dj * gram[j * n + k] + (b_new - b);
                }
                b = b_new;
                num_changed += 1;
            }

            if !b.is_finite() {
                return Err(MlError::Diverged("SMO bias became non-finite".into()));
            }
            if num_changed == 0 {
                quiet_sweeps += 1;
                if quiet_sweeps >= 5 {
                    break;
                }
            } else {
                quiet_sweeps = 0;
            }
        }

        let support: Vec<usize> = (0..n).filter(|&k| alphas[k] > T::EPSILON).collect();
        self.dual_coef = support.iter().map(|&k| alphas[k] * labels[k]).collect();
        self.support_vectors = Some(x.select_rows(&support)?);
        self.bias = b;
        Ok(())
    }

    /// Signed distance-like score; positive means class 1.
    pub fn decision_function(&self, x: &Tensor<T>) -> MlResult<Tensor<T>> {
        let sv = self.support_vectors.as_ref().ok_or(MlError::NotFitted)?;
        if x.n_cols()? != sv.n_cols()? {
            return Err(MlError::ShapeMismatch {
                expected: vec![x.n_rows()?, sv.n_cols()?],
                got: x.shape_vec(),
            });
        }
        let sv_rows: Vec<&[T]> = sv.rows()?.collect();
        let scores: Vec<T> = x
            .rows()?
            .map(|row| {
                self.dual_coef
                    .iter()
                    .zip(&sv_rows)
                    .fold(self.bias, |s, (&coef, sv_row)| s + coef * self.kernel_eval(sv_row, row))
            })
            .collect();
        Ok(Tensor::from_slice(&scores))
    }

    pub fn predict(&self, x: &Tensor<T>) -> MlResult<Tensor<T>> {
        let scores = self.decision_function(x)?;
        Ok(scores.apply(|s| if s >= T::ZERO { T::ONE } else { T::ZERO }))
    }

    pub fn n_support(&self) -> usize {
        self.dual_coef.len()
    }
}

impl Estimator for SVC<f64> {
    fn name(&self) -> &'static str {
        "svc"
    }

    fn fit(&mut self, x: &Tensor<f64>, y: &Tensor<f64>) -> MlResult<()> {
        check_xy(x, y)?;
        SVC::fit(self, x, y)
    }

    fn predict(&self, x: &Tensor<f64>) -> MlResult<Tensor<f64>> {
        SVC::predict(self, x)
    }

    fn set_param(&mut self, name: &str, value: &ParamValue) -> MlResult<()> {
        match name {
            "c" => {
                let c = value.expect_float(name)?;
                if c <= 0.0 {
                    return Err(MlError::invalid_param(name, format!("must be positive, got {}", c)));
                }
                self.c = c;
            }
            "kernel" => self.kernel = Kernel::parse(value.expect_str(name)?)?,
            "gamma" => {
                self.gamma = match value {
                    ParamValue::Str(s) if s == "scale" => Gamma::Scale,
                    other => Gamma::Value(other.expect_float(name)?),
                }
            }
            "degree" => self.degree = value.expect_usize(name)? as i32,
            "coef0" => self.coef0 = value.expect_float(name)?,
            "max_iter" => self.max_iter = value.expect_usize(name)?,
            "tol" => self.tol = value.expect_float(name)?,
            _ => return Err(MlError::UnknownParameter(format!("{}__{}", self.name(), name))),
        }
        Ok(())
    }

    fn boxed_clone(&self) -> Box<dyn Estimator> {
        Box::new(self.clone())
    }
}
