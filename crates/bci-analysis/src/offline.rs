//! Offline batch analysis: windowing, splitting, training, logging
//!
//! Drives the full offline path over externally segmented epochs. A failing
//! fold aborts that subject's processing but never the run or the rows
//! already appended to the result log.

use crate::features::FeatureConfig;
use crate::model_store::{SubjectModel, TrainedModelMap};
use crate::result_log::ResultLog;
use crate::split::{Fold, FoldWindows, SessionData, SplitTopology, SubjectAwareSplitter, SubjectDataset};
use crate::trainer::{ClassifierTrainer, FoldOutcome, TrainerConfig};
use crate::window::{WindowConfig, WindowSegmenter};
use bci_core::{BciError, BciResult, Epoch};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;
use tracing::{info, warn};

/// Configuration of one offline experiment run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OfflineConfig {
    pub window: WindowConfig,
    pub feature: FeatureConfig,
    pub trainer: TrainerConfig,
    pub topology: SplitTopology,
    /// Identifier stored with the model map so inference agrees on
    /// preprocessing parameters
    pub processed_db_id: String,
    /// Collapse the task vocabulary to rest / calm / active before training
    #[serde(default)]
    pub make_binary_classification: bool,
    /// Append per-subject accuracies here when set
    #[serde(default)]
    pub log_file: Option<PathBuf>,
    /// Persist the subject-to-model map here when set
    #[serde(default)]
    pub model_file: Option<PathBuf>,
}

/// Result of an offline run
#[derive(Debug)]
pub struct OfflineOutcome {
    pub folds: Vec<FoldOutcome>,
    /// Per-subject fold accuracies, sorted by subject id
    pub subject_accuracies: Vec<(u32, Vec<f32>)>,
    pub model_map: Option<TrainedModelMap>,
}

/// Batch cross-validated training over a set of epochs
#[derive(Debug, Clone)]
pub struct OfflineAnalysis {
    config: OfflineConfig,
}

impl OfflineAnalysis {
    pub fn new(config: OfflineConfig) -> Self {
        OfflineAnalysis { config }
    }

    pub fn config(&self) -> &OfflineConfig {
        &self.config
    }

    /// Run the configured experiment over externally segmented epochs.
    pub fn run(&self, epochs: &[Epoch]) -> BciResult<OfflineOutcome> {
        let first = epochs.first().ok_or_else(|| BciError::EmptyDataset {
            reason: "no epochs to analyze".to_string(),
        })?;
        let sampling_rate = first.sampling_rate();

        // Configuration errors fail before any windowing or fitting.
        let feature_kind = self.config.feature.kind()?;
        let trainer = ClassifierTrainer::new(self.config.trainer.clone());
        trainer.validate(&feature_kind)?;
        let segmenter = WindowSegmenter::from_config(self.config.window)?;

        let datasets = self.build_datasets(epochs, &segmenter)?;
        let splitter = SubjectAwareSplitter::new(self.config.topology);
        let fold_windows = splitter.split(&datasets)?;

        let log = self.config.log_file.as_ref().map(ResultLog::new);
        let mut model_map = self.config.model_file.as_ref().map(|_| {
            TrainedModelMap::new(
                &self.config.processed_db_id,
                self.config.feature.clone(),
                self.config.window,
            )
        });

        let mut folds = Vec::new();
        let mut subject_accuracies: BTreeMap<u32, Vec<f32>> = BTreeMap::new();

        for (fold_idx, windows) in fold_windows.iter().enumerate() {
            let (outcome, norm) = match self.run_fold(windows, &trainer, sampling_rate) {
                Ok(result) => result,
                Err(e) => {
                    // Abort this subject's processing only; earlier log rows
                    // are already on disk.
                    warn!(fold = fold_idx, error = %e, "fold failed, skipping its subjects");
                    continue;
                }
            };

            info!(
                fold = fold_idx,
                subjects = ?outcome.test_subjects,
                accuracy = outcome.accuracy,
                "fold complete"
            );

            for &subject in &outcome.test_subjects {
                subject_accuracies
                    .entry(subject)
                    .or_default()
                    .push(outcome.accuracy);
                if let Some(map) = model_map.as_mut() {
                    map.insert(
                        subject,
                        SubjectModel {
                            model: outcome.model.clone(),
                            norm: norm.clone(),
                        },
                    );
                }
                if let Some(log) = &log {
                    if let Err(e) = log.append(subject, &[outcome.accuracy]) {
                        warn!(subject, error = %e, "could not append result row");
                    }
                }
            }
            folds.push(outcome);
        }

        if let (Some(map), Some(path)) = (model_map.as_ref(), self.config.model_file.as_ref()) {
            map.save(path)?;
        }

        Ok(OfflineOutcome {
            folds,
            subject_accuracies: subject_accuracies.into_iter().collect(),
            model_map,
        })
    }

    fn run_fold(
        &self,
        windows: &FoldWindows,
        trainer: &ClassifierTrainer,
        sampling_rate: f32,
    ) -> BciResult<(FoldOutcome, Option<crate::features::NormStats>)> {
        let fold = Fold::from_windows(windows, &self.config.feature, Some(sampling_rate))?;
        let outcome = trainer.train_fold(&fold)?;
        Ok((outcome, fold.norm))
    }

    /// Group epochs by subject and session, window each session.
    fn build_datasets(
        &self,
        epochs: &[Epoch],
        segmenter: &WindowSegmenter,
    ) -> BciResult<Vec<SubjectDataset>> {
        let mut grouped: BTreeMap<u32, BTreeMap<u32, Vec<&Epoch>>> = BTreeMap::new();
        for epoch in epochs {
            grouped
                .entry(epoch.subject)
                .or_default()
                .entry(epoch.session)
                .or_default()
                .push(epoch);
        }

        grouped
            .into_iter()
            .map(|(subject, sessions)| {
                let sessions = sessions
                    .into_iter()
                    .map(|(session, epochs)| {
                        let mut windowed = segmenter.segment_epochs(&epochs)?;
                        if self.config.make_binary_classification {
                            for label in &mut windowed.labels {
                                *label = label.to_binary();
                            }
                        }
                        SessionData::from_windowed(session, &windowed)
                    })
                    .collect::<BciResult<Vec<_>>>()?;
                SubjectDataset::new(subject, sessions)
            })
            .collect()
    }
}
