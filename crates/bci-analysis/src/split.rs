//! Subject-aware cross-validation splitting
//!
//! Folds never mix a test subject's data into training (leave-one-subject-out
//! and bucketed topologies), or never mix a subject's held-out session into
//! that subject's training data (cross-session topology). Fold construction
//! is deterministic for a fixed subject ordering and seed.

use crate::features::{FeatureConfig, FeaturePipeline, NormStats};
use crate::window::WindowedEpochs;
use bci_core::{BciError, BciResult, TaskLabel};
use ndarray::{Array2, Array3, ArrayView2, Axis};
use rand::seq::SliceRandom;
use rand::{rngs::StdRng, SeedableRng};
use serde::{Deserialize, Serialize};

/// Windowed data of one recording session
#[derive(Debug, Clone)]
pub struct SessionData {
    /// Session id within the subject
    pub session: u32,
    windows: Array3<f32>,
    labels: Vec<TaskLabel>,
    groups: Vec<usize>,
}

impl SessionData {
    /// Create session data, validating label/group counts against windows.
    pub fn new(
        session: u32,
        windows: Array3<f32>,
        labels: Vec<TaskLabel>,
        groups: Vec<usize>,
    ) -> BciResult<Self> {
        let n = windows.shape()[0];
        if labels.len() != n || groups.len() != n {
            return Err(BciError::InvalidParameter {
                name: "labels",
                reason: format!(
                    "{} windows but {} labels and {} groups",
                    n,
                    labels.len(),
                    groups.len()
                ),
            });
        }
        Ok(SessionData {
            session,
            windows,
            labels,
            groups,
        })
    }

    /// Materialize segmenter output into owned session data.
    pub fn from_windowed(session: u32, windowed: &WindowedEpochs<'_>) -> BciResult<Self> {
        let windows = ndarray::stack(Axis(0), &windowed.windows).map_err(|e| {
            BciError::InvalidParameter {
                name: "windows",
                reason: e.to_string(),
            }
        })?;
        Self::new(
            session,
            windows,
            windowed.labels.clone(),
            windowed.groups.clone(),
        )
    }

    pub fn window_count(&self) -> usize {
        self.windows.shape()[0]
    }
}

/// All windowed data recorded from one subject
#[derive(Debug, Clone)]
pub struct SubjectDataset {
    pub subject: u32,
    pub sessions: Vec<SessionData>,
}

impl SubjectDataset {
    pub fn new(subject: u32, sessions: Vec<SessionData>) -> BciResult<Self> {
        if sessions.is_empty() {
            return Err(BciError::EmptyDataset {
                reason: format!("subject {} has no sessions", subject),
            });
        }
        Ok(SubjectDataset { subject, sessions })
    }
}

/// Experiment topology selecting how folds are constructed
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum SplitTopology {
    /// One fold per subject; the fold tests on that subject alone
    LeaveOneSubjectOut,
    /// Per subject, hold out the session with the highest session id and
    /// train on that subject's earlier sessions
    CrossSession,
    /// Group subjects into `folds` buckets over the sorted subject list;
    /// each bucket in turn is the test set. A seed shuffles subjects into
    /// buckets reproducibly.
    SubjectBuckets { folds: usize, seed: Option<u64> },
}

/// One train/test partition at window granularity
#[derive(Debug)]
pub struct FoldWindows {
    pub train_windows: Array3<f32>,
    pub train_labels: Vec<TaskLabel>,
    pub train_groups: Vec<usize>,
    pub test_windows: Array3<f32>,
    pub test_labels: Vec<TaskLabel>,
    pub test_groups: Vec<usize>,
    /// Subjects whose data forms the test set; keys the persisted model map
    pub test_subjects: Vec<u32>,
}

/// One train/test partition with materialized feature matrices
#[derive(Debug)]
pub struct Fold {
    pub train_x: Array2<f32>,
    pub train_y: Vec<TaskLabel>,
    pub train_groups: Vec<usize>,
    pub test_x: Array2<f32>,
    pub test_y: Vec<TaskLabel>,
    pub test_groups: Vec<usize>,
    pub test_subjects: Vec<u32>,
    /// Normalization statistics fitted on this fold's training windows
    pub norm: Option<NormStats>,
}

impl Fold {
    /// Run the feature pipeline over a window-level fold: fit on training
    /// windows, transform test windows with the frozen statistics.
    pub fn from_windows(
        windows: &FoldWindows,
        feature: &FeatureConfig,
        sampling_rate: Option<f32>,
    ) -> BciResult<Self> {
        let mut pipeline = FeaturePipeline::new(feature, sampling_rate)?;

        let train_views: Vec<ArrayView2<'_, f32>> = windows.train_windows.outer_iter().collect();
        let train_x = pipeline.fit_transform(&train_views)?;

        let test_views: Vec<ArrayView2<'_, f32>> = windows.test_windows.outer_iter().collect();
        let test_x = pipeline.transform(&test_views)?;

        Ok(Fold {
            train_x,
            train_y: windows.train_labels.clone(),
            train_groups: windows.train_groups.clone(),
            test_x,
            test_y: windows.test_labels.clone(),
            test_groups: windows.test_groups.clone(),
            test_subjects: windows.test_subjects.clone(),
            norm: pipeline.fitted_stats().cloned(),
        })
    }
}

/// Fold construction over per-subject datasets
#[derive(Debug, Clone)]
pub struct SubjectAwareSplitter {
    topology: SplitTopology,
}

impl SubjectAwareSplitter {
    pub fn new(topology: SplitTopology) -> Self {
        SubjectAwareSplitter { topology }
    }

    pub fn topology(&self) -> SplitTopology {
        self.topology
    }

    /// Yield the fold sequence for the configured topology.
    pub fn split(&self, data: &[SubjectDataset]) -> BciResult<Vec<FoldWindows>> {
        let subjects = sorted_subjects(data)?;
        match self.topology {
            SplitTopology::LeaveOneSubjectOut => self.split_leave_one_out(&subjects),
            SplitTopology::CrossSession => self.split_cross_session(&subjects),
            SplitTopology::SubjectBuckets { folds, seed } => {
                self.split_buckets(&subjects, folds, seed)
            }
        }
    }

    fn split_leave_one_out(&self, subjects: &[&SubjectDataset]) -> BciResult<Vec<FoldWindows>> {
        if subjects.len() < 2 {
            return Err(BciError::EmptyDataset {
                reason: "leave-one-subject-out needs at least two subjects".to_string(),
            });
        }

        subjects
            .iter()
            .enumerate()
            .map(|(k, test_subject)| {
                let train: Vec<&SessionData> = subjects
                    .iter()
                    .enumerate()
                    .filter(|(i, _)| *i != k)
                    .flat_map(|(_, s)| s.sessions.iter())
                    .collect();
                let test: Vec<&SessionData> = test_subject.sessions.iter().collect();
                build_fold(&train, &test, vec![test_subject.subject])
            })
            .collect()
    }

    fn split_cross_session(&self, subjects: &[&SubjectDataset]) -> BciResult<Vec<FoldWindows>> {
        subjects
            .iter()
            .map(|subject| {
                let mut sessions: Vec<&SessionData> = subject.sessions.iter().collect();
                sessions.sort_by_key(|s| s.session);
                if sessions.len() < 2 {
                    return Err(BciError::InvalidParameter {
                        name: "sessions",
                        reason: format!(
                            "subject {} needs at least two sessions for the \
                             cross-session topology",
                            subject.subject
                        ),
                    });
                }
                // Highest session id is the held-out test session.
                let test = vec![*sessions.last().unwrap()];
                let train = sessions[..sessions.len() - 1].to_vec();
                build_fold(&train, &test, vec![subject.subject])
            })
            .collect()
    }

    fn split_buckets(
        &self,
        subjects: &[&SubjectDataset],
        folds: usize,
        seed: Option<u64>,
    ) -> BciResult<Vec<FoldWindows>> {
        if folds < 2 || folds >= subjects.len() {
            return Err(BciError::InvalidParameter {
                name: "folds",
                reason: format!(
                    "fold count must satisfy 2 <= k < n_subjects, got k={} with {} subjects",
                    folds,
                    subjects.len()
                ),
            });
        }

        let mut order: Vec<usize> = (0..subjects.len()).collect();
        if let Some(seed) = seed {
            order.shuffle(&mut StdRng::seed_from_u64(seed));
        }

        // First n % k buckets take one extra subject.
        let base = subjects.len() / folds;
        let extra = subjects.len() % folds;
        let mut buckets: Vec<Vec<usize>> = Vec::with_capacity(folds);
        let mut cursor = 0;
        for bucket_idx in 0..folds {
            let size = base + usize::from(bucket_idx < extra);
            buckets.push(order[cursor..cursor + size].to_vec());
            cursor += size;
        }

        buckets
            .iter()
            .map(|bucket| {
                let train: Vec<&SessionData> = order
                    .iter()
                    .filter(|i| !bucket.contains(*i))
                    .flat_map(|&i| subjects[i].sessions.iter())
                    .collect();
                let test: Vec<&SessionData> = bucket
                    .iter()
                    .flat_map(|&i| subjects[i].sessions.iter())
                    .collect();
                let mut test_subjects: Vec<u32> =
                    bucket.iter().map(|&i| subjects[i].subject).collect();
                test_subjects.sort_unstable();
                build_fold(&train, &test, test_subjects)
            })
            .collect()
    }
}

fn sorted_subjects(data: &[SubjectDataset]) -> BciResult<Vec<&SubjectDataset>> {
    if data.is_empty() {
        return Err(BciError::EmptyDataset {
            reason: "no subject datasets to split".to_string(),
        });
    }
    let mut subjects: Vec<&SubjectDataset> = data.iter().collect();
    subjects.sort_by_key(|s| s.subject);
    for pair in subjects.windows(2) {
        if pair[0].subject == pair[1].subject {
            return Err(BciError::InvalidParameter {
                name: "subjects",
                reason: format!("duplicate subject id {}", pair[0].subject),
            });
        }
    }
    Ok(subjects)
}

fn build_fold(
    train: &[&SessionData],
    test: &[&SessionData],
    test_subjects: Vec<u32>,
) -> BciResult<FoldWindows> {
    let (train_windows, train_labels, train_groups) = concat_sessions(train)?;
    let (test_windows, test_labels, test_groups) = concat_sessions(test)?;
    Ok(FoldWindows {
        train_windows,
        train_labels,
        train_groups,
        test_windows,
        test_labels,
        test_groups,
        test_subjects,
    })
}

/// Concatenate session windows, keeping source-epoch group ids distinct
/// across sessions by re-offsetting each session's group range.
fn concat_sessions(
    parts: &[&SessionData],
) -> BciResult<(Array3<f32>, Vec<TaskLabel>, Vec<usize>)> {
    if parts.is_empty() {
        return Err(BciError::EmptyDataset {
            reason: "fold side has no sessions".to_string(),
        });
    }

    let views: Vec<_> = parts.iter().map(|p| p.windows.view()).collect();
    let windows = ndarray::concatenate(Axis(0), &views).map_err(|e| {
        BciError::InvalidParameter {
            name: "sessions",
            reason: format!("window shapes differ across sessions: {}", e),
        }
    })?;

    let labels = parts.iter().flat_map(|p| p.labels.iter().copied()).collect();

    let mut groups = Vec::new();
    let mut offset = 0usize;
    for part in parts {
        groups.extend(part.groups.iter().map(|g| g + offset));
        offset += part.groups.iter().max().map(|m| m + 1).unwrap_or(0);
    }

    Ok((windows, labels, groups))
}
