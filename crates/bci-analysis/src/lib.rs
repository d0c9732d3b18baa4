//! BCI-Analysis: offline training path for mental-task classification
//!
//! Sliding-window segmentation, feature pipelines with fit/transform
//! separation, subject-aware cross-validation, per-fold classifier training
//! and persistence of the resulting subject-to-model map.

pub mod balance;
pub mod features;
pub mod metrics;
pub mod model_store;
pub mod offline;
pub mod result_log;
pub mod split;
pub mod trainer;
pub mod window;

pub use balance::balance_classes;
pub use features::{
    fft_band_edges, FeatureConfig, FeatureKind, FeaturePipeline, FeatureTransform, NormStats,
};
pub use metrics::{accuracy_score, ClassMetrics, ClassReport, ConfusionMatrix};
pub use model_store::{SubjectModel, TrainedModelMap};
pub use offline::{OfflineAnalysis, OfflineConfig, OfflineOutcome};
pub use result_log::{ResultLog, ResultRow};
pub use split::{
    Fold, FoldWindows, SessionData, SplitTopology, SubjectAwareSplitter, SubjectDataset,
};
pub use trainer::{
    validate_feature_classifier_pair, Classifier, ClassifierKind, ClassifierTrainer, FoldOutcome,
    TrainedModel, TrainerConfig,
};
pub use window::{WindowConfig, WindowSegmenter, WindowedEpochs};
