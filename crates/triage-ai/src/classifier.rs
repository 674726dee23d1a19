//! Multinomial (softmax) logistic regression over dense embedding vectors.
//!
//! Full-batch gradient descent with a fixed step size and iteration count,
//! zero-initialized, so fitting is fully deterministic: the same samples
//! always produce the same weights. Generic over the class label type so
//! the importance head fits on `bool` and the router head on `String`.
//!
//! Classes are stored as the sorted distinct labels seen at fit time, and
//! `predict_proba` output is aligned to that order. Callers must not
//! assume this matches any externally published label schema — that is
//! what catalog alignment is for.

use std::collections::BTreeSet;

use ndarray::{Array1, Array2, ArrayView1, Axis};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum ClassifierError {
    #[error("need at least 2 distinct classes to fit, got {0}")]
    TooFewClasses(usize),

    #[error("{rows} sample vectors but {labels} labels")]
    RowCountMismatch { rows: usize, labels: usize },

    #[error("sample vectors have zero dimensions")]
    EmptyVectors,

    #[error("input has {got} dimensions, classifier was fit on {expected}")]
    DimensionMismatch { expected: usize, got: usize },
}

/// Gradient-descent settings. The defaults mirror a max_iter=500
/// logistic-regression fit and are good enough for small triage datasets.
#[derive(Debug, Clone)]
pub struct FitParams {
    pub max_iterations: usize,
    pub learning_rate: f32,
}

impl Default for FitParams {
    fn default() -> Self {
        Self {
            max_iterations: 500,
            learning_rate: 0.5,
        }
    }
}

/// A fitted softmax regression head.
///
/// Serializable with serde so it can live inside an artifact as opaque
/// state and round-trip losslessly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SoftmaxClassifier<C: Ord> {
    classes: Vec<C>,
    /// One row of coefficients per class: shape `(n_classes, n_features)`.
    weights: Array2<f32>,
    intercept: Array1<f32>,
}

impl<C: Ord + Clone> SoftmaxClassifier<C> {
    /// Fit on `(vectors, labels)` aligned by row.
    ///
    /// Minimizes cross-entropy by full-batch gradient descent. Rejects
    /// inputs with fewer than two distinct labels; callers are expected to
    /// guard for that case before embedding anything.
    pub fn fit(
        x: &Array2<f32>,
        labels: &[C],
        params: &FitParams,
    ) -> Result<Self, ClassifierError> {
        let n = x.nrows();
        let dim = x.ncols();

        if n != labels.len() {
            return Err(ClassifierError::RowCountMismatch {
                rows: n,
                labels: labels.len(),
            });
        }
        if dim == 0 || n == 0 {
            return Err(ClassifierError::EmptyVectors);
        }

        let classes: Vec<C> = labels
            .iter()
            .cloned()
            .collect::<BTreeSet<C>>()
            .into_iter()
            .collect();
        let k = classes.len();
        if k < 2 {
            return Err(ClassifierError::TooFewClasses(k));
        }

        // Row index of each sample's class; classes are sorted so
        // binary_search always hits.
        let targets: Vec<usize> = labels
            .iter()
            .map(|label| {
                classes
                    .binary_search(label)
                    .expect("label is drawn from the class set")
            })
            .collect();

        let mut weights = Array2::<f32>::zeros((k, dim));
        let mut intercept = Array1::<f32>::zeros(k);
        let scale = 1.0 / n as f32;

        for _ in 0..params.max_iterations {
            // Probabilities: (n, k).
            let mut probs = x.dot(&weights.t()) + &intercept;
            for mut row in probs.rows_mut() {
                softmax_in_place(row.as_slice_mut().expect("contiguous row"));
            }

            // Gradient of cross-entropy: (probs - onehot) / n.
            for (i, &target) in targets.iter().enumerate() {
                probs[(i, target)] -= 1.0;
            }

            let grad_w = probs.t().dot(x) * scale;
            let grad_b = probs.sum_axis(Axis(0)) * scale;

            weights.scaled_add(-params.learning_rate, &grad_w);
            intercept.scaled_add(-params.learning_rate, &grad_b);
        }

        debug!(classes = k, dim, samples = n, "fitted softmax classifier");
        Ok(Self {
            classes,
            weights,
            intercept,
        })
    }

    /// Per-class probabilities for one vector, aligned to [`classes`](Self::classes).
    pub fn predict_proba(&self, x: ArrayView1<f32>) -> Result<Vec<f32>, ClassifierError> {
        let expected = self.weights.ncols();
        if x.len() != expected {
            return Err(ClassifierError::DimensionMismatch {
                expected,
                got: x.len(),
            });
        }

        let logits = self.weights.dot(&x) + &self.intercept;
        let mut probs = logits.to_vec();
        softmax_in_place(&mut probs);
        Ok(probs)
    }

    /// The fitted class list, in the classifier's internal order.
    pub fn classes(&self) -> &[C] {
        &self.classes
    }

    /// Number of input features the classifier was fit on.
    pub fn n_features(&self) -> usize {
        self.weights.ncols()
    }
}

/// Numerically stable in-place softmax.
fn softmax_in_place(logits: &mut [f32]) {
    let max = logits.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    let mut sum = 0.0f32;
    for v in logits.iter_mut() {
        *v = (*v - max).exp();
        sum += *v;
    }
    if sum > 0.0 {
        for v in logits.iter_mut() {
            *v /= sum;
        }
    }
}
