use oxidize_select_core::error::{MlError, MlResult};
use oxidize_select_core::estimator::check_xy;
use oxidize_select_core::tensor::dot;
use oxidize_select_core::{Estimator, Float, ParamValue, Tensor};

/// L2-regularized logistic regression for binary labels, fitted by batch
/// gradient descent.
///
/// `c` is the inverse regularization strength: the objective is
/// `sum(log_loss) + ||w||^2 / (2c)`.
#[derive(Debug, Clone)]
pub struct LogisticRegression<T: Float> {
    pub c: T,
    pub learning_rate: T,
    pub max_iter: usize,
    pub tol: T,
    pub weights: Option<Tensor<T>>,
    pub bias: Option<T>,
}

impl<T: Float> Default for LogisticRegression<T> {
    fn default() -> Self {
        LogisticRegression::new(T::ONE, T::from_f64(0.1), 1000)
    }
}

impl<T: Float> LogisticRegression<T> {
    pub fn new(c: T, learning_rate: T, max_iter: usize) -> Self {
        LogisticRegression {
            c,
            learning_rate,
            max_iter,
            tol: T::from_f64(1e-6),
            weights: None,
            bias: None,
        }
    }

    fn sigmoid_val(z: T) -> T {
        if z >= T::ZERO {
            T::ONE / (T::ONE + (-z).exp())
        } else {
            let e = z.exp();
            e / (T::ONE + e)
        }
    }

    pub fn fit(&mut self, x: &Tensor<T>, y: &Tensor<T>) -> MlResult<()> {
        if !(self.c > T::ZERO) {
            return Err(MlError::invalid_param("c", format!("must be positive, got {}", self.c)));
        }
        let n = x.n_rows()?;
        let p = x.n_cols()?;
        if y.numel() != n {
            return Err(MlError::ShapeMismatch { expected: vec![n], got: y.shape_vec() });
        }
        if n == 0 {
            return Err(MlError::EmptyTensor);
        }
        let n_t = T::from_usize(n);
        let penalty = T::ONE / (self.c * n_t);

        let mut w = vec![T::ZERO; p];
        let mut b = T::ZERO;
        let mut dw = vec![T::ZERO; p];

        for _iter in 0..self.max_iter {
            dw.iter_mut().for_each(|g| *g = T::ZERO);
            let mut db = T::ZERO;

            for (row, &yi) in x.rows()?.zip(y.data()) {
                let error = Self::sigmoid_val(dot(&w, row) + b) - yi;
                for (g, &xj) in dw.iter_mut().zip(row) {
                    *g += error * xj;
                }
                db += error;
            }

            let mut max_grad = (db / n_t).abs();
            for (wj, &g) in w.iter_mut().zip(&dw) {
                let grad = g / n_t + penalty * *wj;
                *wj -= self.learning_rate * grad;
                max_grad = max_grad.max(grad.abs());
            }
            b -= self.learning_rate * (db / n_t);

            if !b.is_finite() || w.iter().any(|v| !v.is_finite()) {
                return Err(MlError::Diverged(format!(
                    "logistic regression weights became non-finite (learning_rate={})",
                    self.learning_rate
                )));
            }
            if max_grad < self.tol {
                break;
            }
        }

        self.weights = Some(Tensor::new(w, vec![p])?);
        self.bias = Some(b);
        Ok(())
    }

    /// Probability of the positive class for each row.
    pub fn predict_proba(&self, x: &Tensor<T>) -> MlResult<Tensor<T>> {
        let w = self.weights.as_ref().ok_or(MlError::NotFitted)?;
        if x.n_cols()? != w.numel() {
            return Err(MlError::ShapeMismatch {
                expected: vec![x.n_rows()?, w.numel()],
                got: x.shape_vec(),
            });
        }
        let b = self.bias.unwrap_or(T::ZERO);
        let proba: Vec<T> = x
            .rows()?
            .map(|row| Self::sigmoid_val(dot(w.data(), row) + b))
            .collect();
        Ok(Tensor::from_slice(&proba))
    }

    /// Predict class labels (threshold = 0.5).
    pub fn predict(&self, x: &Tensor<T>) -> MlResult<Tensor<T>> {
        let proba = self.predict_proba(x)?;
        Ok(proba.apply(|p| if p >= T::HALF { T::ONE } else { T::ZERO }))
    }
}

impl Estimator for LogisticRegression<f64> {
    fn name(&self) -> &'static str {
        "logisticregression"
    }

    fn fit(&mut self, x: &Tensor<f64>, y: &Tensor<f64>) -> MlResult<()> {
        check_xy(x, y)?;
        LogisticRegression::fit(self, x, y)
    }

    fn predict(&self, x: &Tensor<f64>) -> MlResult<Tensor<f64>> {
        LogisticRegression::predict(self, x)
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
            "learning_rate" => self.learning_rate = value.expect_float(name)?,
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

#[cfg(test)]
mod tests {
    use super::*;

    fn separable() -> (Tensor<f64>, Tensor<f64>) {
        let x: Tensor<f64> = Tensor::from_vec2d(&[
            vec![0.0, 0.0],
            vec![0.5, 0.5],
            vec![1.0, 1.0],
            vec![5.0, 5.0],
            vec![5.5, 5.5],
            vec![6.0, 6.0],
        ]).unwrap();
        let y: Tensor<f64> = Tensor::from_slice(&[0.0, 0.0, 0.0, 1.0, 1.0, 1.0]);
        (x, y)
    }

    #[test]
    fn test_logistic_regression() {
        let (x, y) = separable();
        let mut model = LogisticRegression::new(100.0, 0.1, 1000);
        model.fit(&x, &y).unwrap();

        let pred = model.predict(&x).unwrap();
        assert_eq!(pred.data(), y.data());
        let proba = model.predict_proba(&x).unwrap();
        assert!(proba.data().iter().all(|p| (0.0..=1.0).contains(p)));
    }

    #[test]
    fn test_stronger_regularization_shrinks_weights() {
        let (x, y) = separable();
        let mut loose = LogisticRegression::new(100.0, 0.1, 500);
        let mut tight = LogisticRegression::new(0.01, 0.1, 500);
        loose.fit(&x, &y).unwrap();
        tight.fit(&x, &y).unwrap();
        let norm = |m: &LogisticRegression<f64>| -> f64 {
            m.weights.as_ref().unwrap().data().iter().map(|w| w * w).sum()
        };
        assert!(norm(&tight) < norm(&loose));
    }

    #[test]
    fn test_divergence_is_reported() {
        let (x, y) = separable();
        let mut model = LogisticRegression::new(1.0, 1e300, 50);
        assert!(matches!(model.fit(&x, &y), Err(MlError::Diverged(_))));
    }

    #[test]
    fn test_set_param() {
        let mut model = LogisticRegression::<f64>::default();
        model.set_param("c", &ParamValue::Float(0.5)).unwrap();
        assert_eq!(model.c, 0.5);
        assert!(model.set_param("c", &ParamValue::Float(-1.0)).is_err());
        assert!(matches!(
            model.set_param("gamma", &ParamValue::Float(1.0)),
            Err(MlError::UnknownParameter(_))
        ));
    }

    #[test]
    fn test_predict_before_fit() {
        let (x, _) = separable();
        let model = LogisticRegression::<f64>::default();
        assert_eq!(model.predict(&x).unwrap_err(), MlError::NotFitted);
    }
}
