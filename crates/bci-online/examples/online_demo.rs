//! End-to-end demo: offline cross-validated training followed by online
//! streaming inference against a simulated acquisition source.

use anyhow::Result;
use bci_analysis::{
    ClassifierKind, FeatureConfig, OfflineAnalysis, OfflineConfig, SplitTopology, TrainedModelMap,
    TrainerConfig, WindowConfig,
};
use bci_core::{Epoch, TaskLabel};
use bci_online::{
    online_accuracy, spawn_producer, LiveBuffer, OnlineStreamer, SignalSimulator, SimulatorConfig,
    StreamerConfig,
};
use ndarray::Array2;
use std::sync::Arc;
use tokio::sync::watch;

const FS: f32 = 160.0;
const SUBJECTS: [u32; 3] = [1, 2, 3];

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let model_file = std::env::temp_dir().join("bci_online_demo_models.json");
    let log_file = std::env::temp_dir().join("bci_online_demo_results.csv");

    println!("=== Offline: leave-one-subject-out training ===");
    let epochs = synthetic_epochs();
    let config = OfflineConfig {
        window: WindowConfig {
            window_length: 0.5,
            window_step: 0.25,
        },
        feature: FeatureConfig {
            scale_to_microvolts: false,
            ..FeatureConfig::multi_avg_fft_power(vec![(8.0, 12.0), (18.0, 22.0)])
        },
        trainer: TrainerConfig {
            classifier: ClassifierKind::NearestNeighbor { k: 3 },
            class_weights: vec![(TaskLabel::Rest, 0.25)],
            ..TrainerConfig::default()
        },
        topology: SplitTopology::LeaveOneSubjectOut,
        processed_db_id: "demo-synthetic".to_string(),
        make_binary_classification: false,
        log_file: Some(log_file.clone()),
        model_file: Some(model_file.clone()),
    };

    let outcome = OfflineAnalysis::new(config).run(&epochs)?;
    for fold in &outcome.folds {
        println!(
            "subject {:?}: accuracy {:.3}",
            fold.test_subjects, fold.accuracy
        );
        println!("{}", fold.report);
    }
    println!("result log: {}", log_file.display());

    println!("=== Online: streaming inference for subject 1 ===");
    let model_map = TrainedModelMap::load(&model_file)?;
    let buffer = Arc::new(LiveBuffer::new(2, FS, 2.0)?);
    let simulator = SignalSimulator::new(SimulatorConfig {
        sampling_rate: FS,
        channel_count: 2,
        noise_std: 0.02,
        schedule: vec![(TaskLabel::Rest, 2.0), (TaskLabel::LeftHand, 2.0)],
        seed: 42,
    })?;
    let producer = spawn_producer(buffer.clone(), simulator, 0.05, Some(6.0));

    let mut streamer = OnlineStreamer::new(
        StreamerConfig {
            subject: 1,
            collect_ground_truth: true,
        },
        &model_map,
        FS,
    )?;
    let (_stop_tx, stop_rx) = watch::channel(false);
    let summary = streamer.run(buffer.as_ref(), stop_rx).await?;
    producer.await??;

    println!(
        "{} iterations, {} underruns, {} predictions",
        summary.iterations,
        summary.underruns,
        summary.events.len()
    );
    if let Some(accuracy) = online_accuracy(&summary.events) {
        println!("online accuracy: {:.3}", accuracy);
    }
    for event in summary.events.iter().take(5) {
        println!(
            "window {}: {} -> command '{}'",
            event.window_index,
            event.predicted,
            event.predicted.command()
        );
    }

    Ok(())
}

/// Epochs with label-dependent oscillations for each demo subject.
fn synthetic_epochs() -> Vec<Epoch> {
    let mut epochs = Vec::new();
    for &subject in &SUBJECTS {
        for idx in 0..3u32 {
            for (label, freq) in [(TaskLabel::Rest, 10.0f32), (TaskLabel::LeftHand, 20.0)] {
                let phase = 0.17 * subject as f32 + 0.05 * idx as f32;
                let data = Array2::from_shape_fn((2, 320), |(c, t)| {
                    (2.0 * std::f32::consts::PI * freq * t as f32 / FS + phase + c as f32).sin()
                });
                epochs.push(
                    Epoch::new(subject, 0, label, data, FS).expect("valid demo epoch"),
                );
            }
        }
    }
    epochs
}
