//! Persisted subject-to-model map
//!
//! Created at training time, loaded unchanged at inference time. The map
//! carries the feature configuration and a processed-database identifier so
//! training and inference agree on preprocessing parameters.

use crate::features::{FeatureConfig, NormStats};
use crate::trainer::TrainedModel;
use crate::window::WindowConfig;
use bci_core::{BciError, BciResult};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::Path;

/// A fitted model together with the fold's frozen normalization statistics
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubjectModel {
    pub model: TrainedModel,
    pub norm: Option<NormStats>,
}

/// Mapping from subject id to fitted classifier, plus the preprocessing
/// parameters both sides of the training/inference boundary must agree on.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainedModelMap {
    /// Identifier of the processed database the models were trained from
    pub processed_db_id: String,
    /// Feature pipeline configuration used at training time
    pub feature: FeatureConfig,
    /// Window geometry used at training time
    pub window: WindowConfig,
    models: HashMap<u32, SubjectModel>,
}

impl TrainedModelMap {
    pub fn new(processed_db_id: &str, feature: FeatureConfig, window: WindowConfig) -> Self {
        TrainedModelMap {
            processed_db_id: processed_db_id.to_string(),
            feature,
            window,
            models: HashMap::new(),
        }
    }

    pub fn insert(&mut self, subject: u32, model: SubjectModel) {
        self.models.insert(subject, model);
    }

    /// Look up the model for a subject; missing subjects are fatal for that
    /// subject's stream only.
    pub fn get(&self, subject: u32) -> BciResult<&SubjectModel> {
        self.models
            .get(&subject)
            .ok_or(BciError::ModelNotFound { subject })
    }

    pub fn subjects(&self) -> Vec<u32> {
        let mut subjects: Vec<u32> = self.models.keys().copied().collect();
        subjects.sort_unstable();
        subjects
    }

    pub fn len(&self) -> usize {
        self.models.len()
    }

    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }

    /// Persist the map to disk.
    pub fn save(&self, path: &Path) -> BciResult<()> {
        let serialized = serde_json::to_string(self).map_err(|e| BciError::Serialization {
            reason: e.to_string(),
        })?;
        fs::write(path, serialized)?;
        Ok(())
    }

    /// Load a previously persisted map.
    pub fn load(path: &Path) -> BciResult<Self> {
        let contents = fs::read_to_string(path)?;
        serde_json::from_str(&contents).map_err(|e| BciError::Serialization {
            reason: e.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::trainer::{Classifier, ClassifierKind, TrainedModel};
    use bci_core::TaskLabel;
    use ndarray::arr2;
    use std::path::PathBuf;

    fn scratch_path(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("bci_model_store_{}_{}", std::process::id(), name))
    }

    fn fitted_model() -> TrainedModel {
        let x = arr2(&[[0.0f32, 0.0], [10.0, 10.0]]);
        let y = vec![TaskLabel::Rest, TaskLabel::LeftHand];
        let mut model =
            TrainedModel::from_kind(&ClassifierKind::NearestNeighbor { k: 1 }, Vec::new(), 12);
        model.fit(x.view(), &y).unwrap();
        model
    }

    fn window_config() -> WindowConfig {
        WindowConfig {
            window_length: 1.0,
            window_step: 0.1,
        }
    }

    #[test]
    fn test_missing_subject() {
        let map = TrainedModelMap::new("db", FeatureConfig::time_stats(), window_config());
        assert!(matches!(
            map.get(9),
            Err(BciError::ModelNotFound { subject: 9 })
        ));
    }

    #[test]
    fn test_save_load_round_trip() {
        let mut map = TrainedModelMap::new(
            "physionet-1s-01",
            FeatureConfig::avg_fft_power(7.0, 14.0),
            window_config(),
        );
        map.insert(
            2,
            SubjectModel {
                model: fitted_model(),
                norm: None,
            },
        );

        let path = scratch_path("round_trip.json");
        map.save(&path).unwrap();
        let loaded = TrainedModelMap::load(&path).unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(loaded.processed_db_id, "physionet-1s-01");
        assert_eq!(loaded.subjects(), vec![2]);

        // The restored model honors the same predict contract.
        let probes = arr2(&[[0.0f32, 0.0], [10.0, 10.0]]);
        let restored = loaded.get(2).unwrap();
        assert_eq!(
            restored.model.predict(probes.view()).unwrap(),
            vec![TaskLabel::Rest, TaskLabel::LeftHand]
        );
    }

    #[test]
    fn test_load_missing_file() {
        let path = scratch_path("does_not_exist.json");
        assert!(matches!(
            TrainedModelMap::load(&path),
            Err(BciError::Io { .. })
        ));
    }
}
