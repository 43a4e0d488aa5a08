//! Ordered cumulative decomposition of an attribution ("waterfall").
//!
//! Segments are ordered by descending absolute contribution. Each segment
//! starts where the previous one ended, the first at the baseline, so the last
//! segment ends at the model output.

use serde::Serialize;

use super::{Attribution, EncodedVector, FeatureCatalog, FeatureSet, OutputSpace};

/// Decimal places used for raw values in segment labels.
pub const LABEL_PRECISION: usize = 2;

/// Errors raised when an attribution cannot be laid out.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum WaterfallError {
    #[error("Attribution covers {got} features, expected {expected}")]
    LengthMismatch { expected: usize, got: usize },

    #[error("Column {index} is {got}, expected {expected}")]
    ColumnMismatch {
        index: usize,
        expected: String,
        got: String,
    },
}

/// Final waterfall offset disagrees with the model's own output.
///
/// Both values are probabilities; `space` is the space the waterfall was
/// built in.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("Waterfall implies p={waterfall:.6}, model predicts p={model:.6} ({space:?})")]
pub struct ConsistencyError {
    pub waterfall: f64,
    pub model: f64,
    pub space: OutputSpace,
}

/// One bar of the waterfall.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WaterfallSegment {
    pub feature: String,
    /// Display name and raw value, e.g. `"Depression Score = 12.00"`.
    pub label: String,
    pub start_offset: f64,
    pub delta: f64,
    pub is_positive: bool,
}

impl WaterfallSegment {
    #[must_use]
    pub fn end_offset(&self) -> f64 {
        self.start_offset + self.delta
    }
}

/// Rendering-ready decomposition from baseline to predicted value.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Waterfall {
    pub baseline: f64,
    pub segments: Vec<WaterfallSegment>,
    /// Offset after the last segment.
    pub final_value: f64,
    pub space: OutputSpace,
}

impl Waterfall {
    /// Build the waterfall for `attribution` of `vector`.
    ///
    /// Ties in absolute contribution keep feature-set order; NaN
    /// contributions go last.
    ///
    /// # Errors
    /// Returns an error if the attribution, the vector and the feature set do
    /// not describe the same columns in the same order.
    pub fn build(
        attribution: &Attribution,
        vector: &EncodedVector,
        features: &FeatureSet,
        catalog: &FeatureCatalog,
    ) -> Result<Self, WaterfallError> {
        check_columns(features.selected(), vector.columns())?;
        let attributed: Vec<String> = attribution
            .contributions
            .iter()
            .map(|c| c.feature.clone())
            .collect();
        check_columns(features.selected(), &attributed)?;

        let magnitude = |i: usize| {
            let v = attribution.contributions[i].value;
            if v.is_nan() {
                -1.0
            } else {
                v.abs()
            }
        };
        let mut order: Vec<usize> = (0..attribution.contributions.len()).collect();
        order.sort_by(|&a, &b| magnitude(b).total_cmp(&magnitude(a)));

        let raw = vector.raw_values();
        let mut offset = attribution.baseline;
        let mut segments = Vec::with_capacity(order.len());
        for i in order {
            let contribution = &attribution.contributions[i];
            segments.push(WaterfallSegment {
                feature: contribution.feature.clone(),
                label: format!(
                    "{} = {:.prec$}",
                    catalog.display_name(&contribution.feature),
                    raw[i],
                    prec = LABEL_PRECISION
                ),
                start_offset: offset,
                delta: contribution.value,
                is_positive: contribution.value > 0.0,
            });
            offset += contribution.value;
        }

        Ok(Self {
            baseline: attribution.baseline,
            segments,
            final_value: offset,
            space: attribution.space,
        })
    }

    /// Compare the final offset with the model's probability.
    ///
    /// The final offset is mapped to a probability first. Mapping the other
    /// way loses precision once the model saturates (`p` rounds to 1.0 for
    /// log-odds above ~37).
    ///
    /// # Errors
    /// Returns `ConsistencyError` if the two probabilities differ by more
    /// than `tolerance`.
    pub fn check_consistency(
        &self,
        probability: f64,
        tolerance: f64,
    ) -> Result<(), ConsistencyError> {
        let waterfall = self.space.to_probability(self.final_value);
        if (waterfall - probability).abs() <= tolerance {
            Ok(())
        } else {
            Err(ConsistencyError {
                waterfall,
                model: probability,
                space: self.space,
            })
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.segments.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }
}

fn check_columns(expected: &[String], got: &[String]) -> Result<(), WaterfallError> {
    if expected.len() != got.len() {
        return Err(WaterfallError::LengthMismatch {
            expected: expected.len(),
            got: got.len(),
        });
    }
    for (index, (e, g)) in expected.iter().zip(got).enumerate() {
        if e != g {
            return Err(WaterfallError::ColumnMismatch {
                index,
                expected: e.clone(),
                got: g.clone(),
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixture(values: Vec<f64>) -> (Attribution, EncodedVector, FeatureSet) {
        let ids: Vec<String> = ["gender", "age", "cesd", "unknown"]
            .iter()
            .map(|s| (*s).to_string())
            .collect();
        let features = FeatureSet::new(
            ids.clone(),
            vec!["gender".into()],
            vec!["age".into(), "cesd".into(), "unknown".into()],
        )
        .expect("valid feature set");
        let vector = EncodedVector::new(
            ids.clone(),
            vec![1.0, 0.9, 0.7, 0.0],
            vec![1.0, 70.0, 12.0, 3.456],
        )
        .expect("aligned columns");
        let attribution = Attribution::new(-1.0, &ids, values, OutputSpace::LogOdds);
        (attribution, vector, features)
    }

    #[test]
    fn test_orders_by_magnitude_and_accumulates() {
        let (attribution, vector, features) = fixture(vec![-0.1, 0.3, 0.2, -0.4]);
        let waterfall =
            Waterfall::build(&attribution, &vector, &features, FeatureCatalog::standard())
                .expect("consistent columns");

        let order: Vec<&str> = waterfall.segments.iter().map(|s| s.feature.as_str()).collect();
        assert_eq!(order, vec!["unknown", "age", "cesd", "gender"]);

        assert_eq!(waterfall.segments[0].start_offset, -1.0);
        for pair in waterfall.segments.windows(2) {
            assert_eq!(pair[1].start_offset, pair[0].start_offset + pair[0].delta);
        }
        assert!((waterfall.final_value - attribution.total()).abs() < 1e-12);
        assert!(!waterfall.segments[0].is_positive);
        assert!(waterfall.segments[1].is_positive);
    }

    #[test]
    fn test_labels_use_display_names_and_raw_values() {
        let (attribution, vector, features) = fixture(vec![-0.1, 0.3, 0.2, -0.4]);
        let waterfall =
            Waterfall::build(&attribution, &vector, &features, FeatureCatalog::standard())
                .expect("consistent columns");

        let labels: Vec<&str> = waterfall.segments.iter().map(|s| s.label.as_str()).collect();
        assert_eq!(
            labels,
            vec!["unknown = 3.46", "Age = 70.00", "Depression Score = 12.00", "Gender = 1.00"]
        );
    }

    #[test]
    fn test_ties_keep_feature_order() {
        let (attribution, vector, features) = fixture(vec![0.2, -0.2, 0.2, f64::NAN]);
        let waterfall =
            Waterfall::build(&attribution, &vector, &features, FeatureCatalog::standard())
                .expect("consistent columns");

        let order: Vec<&str> = waterfall.segments.iter().map(|s| s.feature.as_str()).collect();
        assert_eq!(order, vec!["gender", "age", "cesd", "unknown"]);
    }

    #[test]
    fn test_rejects_misaligned_attribution() {
        let (mut attribution, vector, features) = fixture(vec![0.1, 0.2, 0.3, 0.4]);
        attribution.contributions.swap(0, 1);

        let err = Waterfall::build(&attribution, &vector, &features, FeatureCatalog::standard())
            .expect_err("columns are swapped");
        assert!(matches!(err, WaterfallError::ColumnMismatch { index: 0, .. }));

        attribution.contributions.pop();
        let err = Waterfall::build(&attribution, &vector, &features, FeatureCatalog::standard())
            .expect_err("a column is missing");
        assert_eq!(err, WaterfallError::LengthMismatch { expected: 4, got: 3 });
    }

    #[test]
    fn test_consistency_check() {
        let (attribution, vector, features) = fixture(vec![0.1, 0.2, -0.3, 0.0]);
        let waterfall =
            Waterfall::build(&attribution, &vector, &features, FeatureCatalog::standard())
                .expect("consistent columns");

        // Final log-odds is -1.0, i.e. probability sigmoid(-1).
        let p = crate::domain::sigmoid(-1.0);
        assert!(waterfall.check_consistency(p, 1e-9).is_ok());

        let err = waterfall.check_consistency(0.9, 1e-6).expect_err("far from the model");
        assert_eq!(err.space, OutputSpace::LogOdds);
        assert!((err.waterfall - p).abs() < 1e-12);
        assert_eq!(err.model, 0.9);
    }

    #[test]
    fn test_consistency_holds_for_saturated_models() {
        for margin in [20.0, 25.0, 30.0, 40.0, 800.0, -40.0] {
            let (attribution, vector, features) = fixture(vec![margin + 1.0, 0.0, 0.0, 0.0]);
            let waterfall =
                Waterfall::build(&attribution, &vector, &features, FeatureCatalog::standard())
                    .expect("consistent columns");

            let p = crate::domain::sigmoid(margin);
            assert!(
                waterfall.check_consistency(p, 1e-6).is_ok(),
                "margin {margin} flagged as inconsistent"
            );
        }
    }
}
