use eqlearn_rs::equalizer::Evaluator;
use eqlearn_rs::settings::Settings;

fn small_run() -> Settings {
    Settings {
        memory_length: 1,
        val_frames: 6,
        val_block_length: 48,
        pilot_size: 16,
        hidden_size: 16,
        online_epochs: 5,
        aug_total_size: 4,
        aug_n_repeats: 2,
        train_minibatch_size: 16,
        val_snr: 10.0,
        ..Settings::default()
    }
}

#[test]
fn online_evaluation_round_trip_without_hardware() {
    let settings = small_run();
    let mut evaluator = Evaluator::new(&settings).expect("setup from valid settings");
    let report = evaluator.evaluate().expect("offline simulated run");

    assert_eq!(report.ser_per_block.len(), 6);
    assert_eq!(report.fer_per_block.len(), 6);
    assert!(
        report
            .ser_per_block
            .iter()
            .all(|ser| (0.0..=1.0).contains(ser)),
        "per-block SER must be a rate"
    );
    let naive_mean: f32 = report.ser_per_block.iter().sum::<f32>() / 6.0;
    assert!((report.mean_ser - naive_mean).abs() < 1e-6);
}

#[test]
fn identical_settings_reproduce_the_run() {
    let settings = small_run();
    let first = Evaluator::new(&settings).unwrap().evaluate().unwrap();
    let second = Evaluator::new(&settings).unwrap().evaluate().unwrap();
    assert_eq!(first.ser_per_block, second.ser_per_block);
}
