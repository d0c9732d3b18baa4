//! Per-fold classifier training and evaluation
//!
//! Classifier internals stay behind the [`Classifier`] trait; the trainer
//! validates feature/classifier compatibility once, optionally balances
//! classes, fits, predicts on the held-out data and scores the result.

use crate::balance::balance_classes;
use crate::features::FeatureKind;
use crate::metrics::{accuracy_score, ClassReport, ConfusionMatrix};
use crate::split::Fold;
use bci_core::{BciError, BciResult, TaskLabel};
use ndarray::{Array2, ArrayView2, Axis};
use rand::{rngs::StdRng, Rng, SeedableRng};
use serde::{Deserialize, Serialize};

/// Classifier kind plus its hyperparameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ClassifierKind {
    /// Distance-voted k-nearest-neighbor classifier
    NearestNeighbor { k: usize },
    /// Majority vote over bootstrap-trained nearest-neighbor members
    VotingEnsemble { members: usize },
}

impl ClassifierKind {
    pub fn name(&self) -> &'static str {
        match self {
            ClassifierKind::NearestNeighbor { .. } => "nearest_neighbor",
            ClassifierKind::VotingEnsemble { .. } => "voting_ensemble",
        }
    }
}

/// Validate a feature/classifier pairing against the fixed rule table.
///
/// The ensemble votes over frequency-domain features only; the plain
/// nearest-neighbor classifier accepts any flat feature vector. Raw windows
/// are reserved for sequence models outside this crate and never pair with
/// the built-in classifiers. Custom transforms are the caller's contract and
/// pass unchecked.
pub fn validate_feature_classifier_pair(
    feature: &FeatureKind,
    classifier: &ClassifierKind,
) -> BciResult<()> {
    let compatible = match classifier {
        ClassifierKind::VotingEnsemble { .. } => matches!(
            feature,
            FeatureKind::AvgFftPower { .. }
                | FeatureKind::FftRange { .. }
                | FeatureKind::MultiAvgFftPower { .. }
                | FeatureKind::Custom
        ),
        ClassifierKind::NearestNeighbor { .. } => !matches!(feature, FeatureKind::Raw),
    };

    if compatible {
        Ok(())
    } else {
        Err(BciError::IncompatibleFeatureClassifier {
            feature: feature.name().to_string(),
            classifier: classifier.name().to_string(),
        })
    }
}

/// Fit/predict contract shared by offline training and online inference
pub trait Classifier {
    fn fit(&mut self, x: ArrayView2<'_, f32>, y: &[TaskLabel]) -> BciResult<()>;
    fn predict(&self, x: ArrayView2<'_, f32>) -> BciResult<Vec<TaskLabel>>;
}

/// Distance-voted k-nearest-neighbor classifier with per-class vote weights.
///
/// Stores its training matrix, so a loaded instance predicts exactly as the
/// fitted one did.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KnnClassifier {
    k: usize,
    class_weights: Vec<(TaskLabel, f32)>,
    train_x: Array2<f32>,
    train_y: Vec<TaskLabel>,
}

impl KnnClassifier {
    pub fn new(k: usize, class_weights: Vec<(TaskLabel, f32)>) -> Self {
        KnnClassifier {
            k: k.max(1),
            class_weights,
            train_x: Array2::zeros((0, 0)),
            train_y: Vec::new(),
        }
    }

    fn weight_for(&self, label: TaskLabel) -> f32 {
        self.class_weights
            .iter()
            .find(|(l, _)| *l == label)
            .map(|(_, w)| *w)
            .unwrap_or(1.0)
    }

    fn vote(&self, row: ArrayView2<'_, f32>) -> TaskLabel {
        let mut distances: Vec<(f32, TaskLabel)> = self
            .train_x
            .rows()
            .into_iter()
            .zip(&self.train_y)
            .map(|(train_row, &label)| {
                let dist: f32 = train_row
                    .iter()
                    .zip(row.iter())
                    .map(|(a, b)| (a - b) * (a - b))
                    .sum();
                (dist, label)
            })
            .collect();
        distances.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(std::cmp::Ordering::Equal));

        let mut votes: Vec<(TaskLabel, f32)> = Vec::new();
        for &(_, label) in distances.iter().take(self.k) {
            let weight = self.weight_for(label);
            match votes.iter_mut().find(|(l, _)| *l == label) {
                Some((_, v)) => *v += weight,
                None => votes.push((label, weight)),
            }
        }

        // Deterministic tie-break: highest vote, then label order.
        votes.sort_by(|a, b| {
            b.1.partial_cmp(&a.1)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(a.0.cmp(&b.0))
        });
        votes[0].0
    }
}

impl Classifier for KnnClassifier {
    fn fit(&mut self, x: ArrayView2<'_, f32>, y: &[TaskLabel]) -> BciResult<()> {
        if x.nrows() == 0 {
            return Err(BciError::EmptyDataset {
                reason: "no training examples".to_string(),
            });
        }
        if x.nrows() != y.len() {
            return Err(BciError::InvalidParameter {
                name: "labels",
                reason: format!("{} examples but {} labels", x.nrows(), y.len()),
            });
        }
        self.train_x = x.to_owned();
        self.train_y = y.to_vec();
        Ok(())
    }

    fn predict(&self, x: ArrayView2<'_, f32>) -> BciResult<Vec<TaskLabel>> {
        if self.train_y.is_empty() {
            return Err(BciError::EmptyDataset {
                reason: "classifier is not fitted".to_string(),
            });
        }
        if x.ncols() != self.train_x.ncols() {
            return Err(BciError::ChannelMismatch {
                expected: self.train_x.ncols(),
                actual: x.ncols(),
            });
        }

        Ok((0..x.nrows())
            .map(|i| self.vote(x.slice(ndarray::s![i..i + 1, ..])))
            .collect())
    }
}

/// Majority vote over nearest-neighbor members, each fitted on a seeded
/// bootstrap resample of the training data.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VotingClassifier {
    member_count: usize,
    k: usize,
    class_weights: Vec<(TaskLabel, f32)>,
    seed: u64,
    members: Vec<KnnClassifier>,
}

impl VotingClassifier {
    pub fn new(
        member_count: usize,
        k: usize,
        class_weights: Vec<(TaskLabel, f32)>,
        seed: u64,
    ) -> Self {
        VotingClassifier {
            member_count: member_count.max(1),
            k,
            class_weights,
            seed,
            members: Vec::new(),
        }
    }
}

impl Classifier for VotingClassifier {
    fn fit(&mut self, x: ArrayView2<'_, f32>, y: &[TaskLabel]) -> BciResult<()> {
        if x.nrows() == 0 {
            return Err(BciError::EmptyDataset {
                reason: "no training examples".to_string(),
            });
        }

        self.members = (0..self.member_count)
            .map(|m| {
                let mut rng = StdRng::seed_from_u64(self.seed.wrapping_add(m as u64));
                let indices: Vec<usize> =
                    (0..x.nrows()).map(|_| rng.gen_range(0..x.nrows())).collect();
                let sample_x = x.select(Axis(0), &indices);
                let sample_y: Vec<TaskLabel> = indices.iter().map(|&i| y[i]).collect();

                let mut member = KnnClassifier::new(self.k, self.class_weights.clone());
                member.fit(sample_x.view(), &sample_y)?;
                Ok(member)
            })
            .collect::<BciResult<Vec<_>>>()?;
        Ok(())
    }

    fn predict(&self, x: ArrayView2<'_, f32>) -> BciResult<Vec<TaskLabel>> {
        if self.members.is_empty() {
            return Err(BciError::EmptyDataset {
                reason: "ensemble is not fitted".to_string(),
            });
        }

        let member_predictions: Vec<Vec<TaskLabel>> = self
            .members
            .iter()
            .map(|member| member.predict(x))
            .collect::<BciResult<Vec<_>>>()?;

        Ok((0..x.nrows())
            .map(|i| {
                let mut votes: Vec<(TaskLabel, usize)> = Vec::new();
                for prediction in &member_predictions {
                    let label = prediction[i];
                    match votes.iter_mut().find(|(l, _)| *l == label) {
                        Some((_, v)) => *v += 1,
                        None => votes.push((label, 1)),
                    }
                }
                votes.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));
                votes[0].0
            })
            .collect())
    }
}

/// Serializable fitted model restored unchanged at inference time
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum TrainedModel {
    NearestNeighbor(KnnClassifier),
    VotingEnsemble(VotingClassifier),
}

impl TrainedModel {
    /// Instantiate an unfitted model for the configured kind.
    pub fn from_kind(
        kind: &ClassifierKind,
        class_weights: Vec<(TaskLabel, f32)>,
        seed: u64,
    ) -> Self {
        match *kind {
            ClassifierKind::NearestNeighbor { k } => {
                TrainedModel::NearestNeighbor(KnnClassifier::new(k, class_weights))
            }
            ClassifierKind::VotingEnsemble { members } => {
                TrainedModel::VotingEnsemble(VotingClassifier::new(members, 5, class_weights, seed))
            }
        }
    }
}

impl Classifier for TrainedModel {
    fn fit(&mut self, x: ArrayView2<'_, f32>, y: &[TaskLabel]) -> BciResult<()> {
        match self {
            TrainedModel::NearestNeighbor(model) => model.fit(x, y),
            TrainedModel::VotingEnsemble(model) => model.fit(x, y),
        }
    }

    fn predict(&self, x: ArrayView2<'_, f32>) -> BciResult<Vec<TaskLabel>> {
        match self {
            TrainedModel::NearestNeighbor(model) => model.predict(x),
            TrainedModel::VotingEnsemble(model) => model.predict(x),
        }
    }
}

/// Trainer configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainerConfig {
    pub classifier: ClassifierKind,
    /// Per-class vote weights, e.g. down-weighting a dominant rest class
    #[serde(default)]
    pub class_weights: Vec<(TaskLabel, f32)>,
    /// Downsample all classes to the minority class count before fitting
    #[serde(default)]
    pub balance_classes: bool,
    /// Seed for the balancing shuffle and ensemble bootstrap
    #[serde(default = "default_seed")]
    pub seed: u64,
}

fn default_seed() -> u64 {
    12
}

impl Default for TrainerConfig {
    fn default() -> Self {
        TrainerConfig {
            classifier: ClassifierKind::NearestNeighbor { k: 5 },
            class_weights: Vec::new(),
            balance_classes: false,
            seed: default_seed(),
        }
    }
}

/// Evaluation result of one fold
#[derive(Debug)]
pub struct FoldOutcome {
    pub test_subjects: Vec<u32>,
    pub accuracy: f32,
    pub confusion: ConfusionMatrix,
    pub report: ClassReport,
    pub model: TrainedModel,
}

/// Per-fold model fitting and evaluation
#[derive(Debug, Clone)]
pub struct ClassifierTrainer {
    config: TrainerConfig,
}

impl ClassifierTrainer {
    pub fn new(config: TrainerConfig) -> Self {
        ClassifierTrainer { config }
    }

    pub fn config(&self) -> &TrainerConfig {
        &self.config
    }

    /// Check the feature/classifier rule table; call before any fitting.
    pub fn validate(&self, feature: &FeatureKind) -> BciResult<()> {
        validate_feature_classifier_pair(feature, &self.config.classifier)
    }

    /// Fit on the fold's training data, predict the held-out test data and
    /// score the predictions.
    pub fn train_fold(&self, fold: &Fold) -> BciResult<FoldOutcome> {
        let (train_x, train_y) = if self.config.balance_classes {
            let (x, y, _) = balance_classes(
                fold.train_x.view(),
                &fold.train_y,
                Some(&fold.train_groups),
                self.config.seed,
            )?;
            (x, y)
        } else {
            (fold.train_x.clone(), fold.train_y.clone())
        };

        let mut model = TrainedModel::from_kind(
            &self.config.classifier,
            self.config.class_weights.clone(),
            self.config.seed,
        );
        model.fit(train_x.view(), &train_y)?;

        let y_pred = model.predict(fold.test_x.view())?;
        let accuracy = accuracy_score(&fold.test_y, &y_pred);
        let confusion = ConfusionMatrix::from_predictions(&fold.test_y, &y_pred);
        let report = ClassReport::from_predictions(&fold.test_y, &y_pred);

        Ok(FoldOutcome {
            test_subjects: fold.test_subjects.clone(),
            accuracy,
            confusion,
            report,
            model,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::NormStats;
    use bci_core::TaskLabel::*;
    use ndarray::Array2;

    /// Two well separated clusters around (0, 0) and (10, 10).
    fn clustered(n_per_class: usize) -> (Array2<f32>, Vec<TaskLabel>) {
        let n = n_per_class * 2;
        let x = Array2::from_shape_fn((n, 2), |(r, c)| {
            let base = if r < n_per_class { 0.0 } else { 10.0 };
            base + ((r * 2 + c) % 3) as f32 * 0.1
        });
        let y = (0..n)
            .map(|r| if r < n_per_class { Rest } else { LeftHand })
            .collect();
        (x, y)
    }

    #[test]
    fn test_knn_separates_clusters() {
        let (x, y) = clustered(10);
        let mut model = KnnClassifier::new(3, Vec::new());
        model.fit(x.view(), &y).unwrap();

        let probes = ndarray::arr2(&[[0.2f32, 0.1], [9.8, 10.1]]);
        let predictions = model.predict(probes.view()).unwrap();
        assert_eq!(predictions, vec![Rest, LeftHand]);
    }

    #[test]
    fn test_knn_predict_before_fit() {
        let model = KnnClassifier::new(3, Vec::new());
        let probes = ndarray::arr2(&[[0.0f32, 0.0]]);
        assert!(matches!(
            model.predict(probes.view()),
            Err(BciError::EmptyDataset { .. })
        ));
    }

    #[test]
    fn test_class_weight_downweights_dominant_class() {
        // Rest dominates the neighborhood; with full weight it wins, with
        // the down-weighted rest class the task label wins.
        let x = ndarray::arr2(&[
            [0.0f32, 0.0],
            [0.1, 0.0],
            [0.2, 0.0],
            [0.0, 0.1],
            [0.3, 0.0],
        ]);
        let y = vec![Rest, Rest, Rest, LeftHand, LeftHand];

        let mut unweighted = KnnClassifier::new(5, Vec::new());
        unweighted.fit(x.view(), &y).unwrap();
        let probe = ndarray::arr2(&[[0.1f32, 0.05]]);
        assert_eq!(unweighted.predict(probe.view()).unwrap(), vec![Rest]);

        let mut weighted = KnnClassifier::new(5, vec![(Rest, 0.25)]);
        weighted.fit(x.view(), &y).unwrap();
        assert_eq!(weighted.predict(probe.view()).unwrap(), vec![LeftHand]);
    }

    #[test]
    fn test_voting_ensemble_is_deterministic() {
        let (x, y) = clustered(12);
        let probes = ndarray::arr2(&[[0.5f32, 0.5], [9.5, 9.5]]);

        let mut a = VotingClassifier::new(7, 3, Vec::new(), 12);
        a.fit(x.view(), &y).unwrap();
        let mut b = VotingClassifier::new(7, 3, Vec::new(), 12);
        b.fit(x.view(), &y).unwrap();

        assert_eq!(
            a.predict(probes.view()).unwrap(),
            b.predict(probes.view()).unwrap()
        );
        assert_eq!(a.predict(probes.view()).unwrap(), vec![Rest, LeftHand]);
    }

    #[test]
    fn test_compatibility_table() {
        let ensemble = ClassifierKind::VotingEnsemble { members: 5 };
        let knn = ClassifierKind::NearestNeighbor { k: 3 };

        let freq = FeatureKind::AvgFftPower {
            fft_low: 7.0,
            fft_high: 14.0,
        };
        assert!(validate_feature_classifier_pair(&freq, &ensemble).is_ok());
        assert!(validate_feature_classifier_pair(&freq, &knn).is_ok());

        assert!(matches!(
            validate_feature_classifier_pair(&FeatureKind::TimeDomainStats, &ensemble),
            Err(BciError::IncompatibleFeatureClassifier { .. })
        ));
        assert!(validate_feature_classifier_pair(&FeatureKind::TimeDomainStats, &knn).is_ok());

        // Raw windows are for sequence models outside this crate.
        assert!(matches!(
            validate_feature_classifier_pair(&FeatureKind::Raw, &knn),
            Err(BciError::IncompatibleFeatureClassifier { .. })
        ));
    }

    #[test]
    fn test_train_fold_scores_separable_data() {
        let (train_x, train_y) = clustered(10);
        let (test_x, test_y) = clustered(4);
        let fold = Fold {
            train_x,
            train_y,
            train_groups: (0..20).collect(),
            test_x,
            test_y,
            test_groups: (0..8).collect(),
            test_subjects: vec![3],
            norm: None,
        };

        let trainer = ClassifierTrainer::new(TrainerConfig::default());
        let outcome = trainer.train_fold(&fold).unwrap();

        assert_eq!(outcome.test_subjects, vec![3]);
        assert!((outcome.accuracy - 1.0).abs() < 1e-6);
        assert_eq!(outcome.confusion.count(Rest, Rest), 4);
        assert_eq!(outcome.confusion.count(Rest, LeftHand), 0);
    }

    #[test]
    fn test_train_fold_with_balancing() {
        // 12 rest vs 4 left examples; balancing trims rest to 4.
        let x = Array2::from_shape_fn((16, 2), |(r, _)| if r < 12 { 0.0 } else { 10.0 });
        let y: Vec<TaskLabel> = (0..16).map(|r| if r < 12 { Rest } else { LeftHand }).collect();
        let fold = Fold {
            train_x: x.clone(),
            train_y: y.clone(),
            train_groups: (0..16).collect(),
            test_x: x,
            test_y: y,
            test_groups: (0..16).collect(),
            test_subjects: vec![1],
            norm: None,
        };

        let trainer = ClassifierTrainer::new(TrainerConfig {
            balance_classes: true,
            ..TrainerConfig::default()
        });
        let outcome = trainer.train_fold(&fold).unwrap();
        assert!(outcome.accuracy > 0.9);
    }

    #[test]
    fn test_model_serde_round_trip() {
        let (x, y) = clustered(6);
        let mut model = TrainedModel::from_kind(
            &ClassifierKind::NearestNeighbor { k: 3 },
            Vec::new(),
            12,
        );
        model.fit(x.view(), &y).unwrap();

        let json = serde_json::to_string(&model).unwrap();
        let restored: TrainedModel = serde_json::from_str(&json).unwrap();

        let probes = ndarray::arr2(&[[0.0f32, 0.0], [10.0, 10.0]]);
        assert_eq!(
            model.predict(probes.view()).unwrap(),
            restored.predict(probes.view()).unwrap()
        );
    }

    #[test]
    fn test_norm_stats_travel_with_fold() {
        let fold = Fold {
            train_x: Array2::zeros((2, 2)),
            train_y: vec![Rest, LeftHand],
            train_groups: vec![0, 1],
            test_x: Array2::zeros((1, 2)),
            test_y: vec![Rest],
            test_groups: vec![0],
            test_subjects: vec![1],
            norm: Some(NormStats {
                mean: ndarray::arr1(&[0.0, 0.0]),
                std: ndarray::arr1(&[1.0, 1.0]),
            }),
        };
        assert!(fold.norm.is_some());
    }
}
