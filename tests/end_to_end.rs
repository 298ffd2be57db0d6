//! End-to-end tests: telemetry lines in, posture events out.
//!
//! These wire the public pieces together the way `posture-monitor` does,
//! substituting in-memory sources and sinks for the serial port and stdout.

use std::collections::VecDeque;
use std::io::{Cursor, Write};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use tokio_util::sync::CancellationToken;

use posture_monitor::acquisition::{run_reader, BufReadSource, ReaderError, ReplaySource};
use posture_monitor::classifier::{LogisticModel, PostureClassifier};
use posture_monitor::pipeline::{ConsumerLoop, LatestState, VecSink};
use posture_monitor::types::{Classification, PostureEvent, PostureLabel, Severity};

/// Returns queued labels in order, then `Safe` forever.
struct ScriptedClassifier {
    labels: Mutex<VecDeque<PostureLabel>>,
}

impl ScriptedClassifier {
    fn new(labels: &[PostureLabel]) -> Self {
        Self {
            labels: Mutex::new(labels.iter().copied().collect()),
        }
    }
}

impl PostureClassifier for ScriptedClassifier {
    fn classify(&self, _lumbar_angle: f64, _hip_angle: f64) -> Classification {
        let label = self
            .labels
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(PostureLabel::Safe);
        Classification { label, confidence: 0.9 }
    }
}

fn default_model() -> Arc<dyn PostureClassifier> {
    Arc::new(LogisticModel::new(0.35, 0.25, -13.5).unwrap())
}

fn consumer_with(
    latest: &Arc<LatestState>,
    classifier: Arc<dyn PostureClassifier>,
) -> (ConsumerLoop, Arc<Mutex<Vec<PostureEvent>>>) {
    let sink = VecSink::default();
    let events = Arc::clone(&sink.events);
    let consumer = ConsumerLoop::new(
        Arc::clone(latest),
        classifier,
        Box::new(sink),
        CancellationToken::new(),
    );
    (consumer, events)
}

// ============================================================================
// Reader → Latest State
// ============================================================================

#[tokio::test]
async fn example_line_publishes_derived_angles() {
    let latest = Arc::new(LatestState::new());
    let input = Cursor::new(b"R:10 MB:20 MM:15 MT:30 L:12\n".to_vec());

    let stats = run_reader(
        move || Ok(BufReadSource::new(input, "example")),
        Arc::clone(&latest),
        Duration::ZERO,
        CancellationToken::new(),
    )
    .await
    .unwrap();

    assert_eq!(stats.readings_published, 1);
    let reading = latest.get();
    assert_eq!(reading.sequence, 1);
    assert!((reading.angles.lumbar_angle - 21.1667).abs() < 1e-3);
    assert!((reading.angles.hip_angle - 17.5).abs() < 1e-9);
    assert!(reading.received_at.is_some());
}

#[tokio::test]
async fn noisy_stream_keeps_last_valid_reading() {
    let latest = Arc::new(LatestState::new());
    let mut bytes = b"\n\xff\xfeboot...\nR: 1 MB: 2 MM: 3 MT: 4 L: 5\n".to_vec();
    bytes.extend_from_slice(b"garbage ###\n\nR: 30 MB: 24 MM: 28 MT: 40 L: 32\nnonsense\n");
    let input = Cursor::new(bytes);

    let stats = run_reader(
        move || Ok(BufReadSource::new(input, "noisy")),
        Arc::clone(&latest),
        Duration::ZERO,
        CancellationToken::new(),
    )
    .await
    .unwrap();

    assert_eq!(stats.readings_published, 2);
    assert_eq!(stats.lines_read, 7);
    let reading = latest.get();
    assert_eq!(reading.sequence, 2);
    assert!((reading.angles.lumbar_angle - 35.0).abs() < 1e-9);
    assert!((reading.angles.hip_angle - 26.0).abs() < 1e-9);
}

#[tokio::test]
async fn replay_file_drives_model_to_sustained_alarm() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("session.log");
    let mut file = std::fs::File::create(&path).unwrap();
    writeln!(file, "R: 10 MB: 20 MM: 15 MT: 30 L: 12").unwrap();
    writeln!(file, "R: 30 MB: 24 MM: 28 MT: 40 L: 32").unwrap();
    drop(file);

    let latest = Arc::new(LatestState::new());
    let replay_path = path.clone();
    run_reader(
        move || ReplaySource::open(&replay_path, Duration::ZERO),
        Arc::clone(&latest),
        Duration::ZERO,
        CancellationToken::new(),
    )
    .await
    .unwrap();

    let (mut consumer, events) = consumer_with(&latest, default_model());
    let base = Instant::now();
    assert_eq!(consumer.poll_once(base).severity, Severity::Dangerous);
    assert_eq!(
        consumer.poll_once(base + Duration::from_secs(10)).severity,
        Severity::DangerousSustained
    );

    let events = events.lock().unwrap();
    assert_eq!(events[1].to_string(), "Lumbar=35.00, Hip=26.00 → Dangerous (10s+)");
}

// ============================================================================
// Reader Failure
// ============================================================================

#[tokio::test]
async fn consumer_runs_on_default_reading_when_port_fails() {
    let latest = Arc::new(LatestState::new());

    let result = run_reader::<BufReadSource<Cursor<Vec<u8>>>, _>(
        || {
            Err(ReaderError::Open {
                port: "/dev/does-not-exist".to_string(),
                message: "No such file or directory".to_string(),
            })
        },
        Arc::clone(&latest),
        Duration::from_secs(2),
        CancellationToken::new(),
    )
    .await;
    assert!(matches!(result, Err(ReaderError::Open { .. })));

    let (mut consumer, _events) = consumer_with(&latest, default_model());
    let event = consumer.poll_once(Instant::now());
    assert_eq!(event.lumbar_angle, 0.0);
    assert_eq!(event.hip_angle, 0.0);
    assert_eq!(event.label, PostureLabel::Safe);
    assert_eq!(event.severity, Severity::Normal);
}

// ============================================================================
// Escalation Across Polls
// ============================================================================

#[test]
fn ten_dangerous_polls_escalate_and_one_safe_resets() {
    use PostureLabel::{Dangerous, Safe};

    let mut script = vec![Dangerous; 10];
    script.push(Safe);
    script.push(Dangerous);

    let latest = Arc::new(LatestState::new());
    let (mut consumer, _events) =
        consumer_with(&latest, Arc::new(ScriptedClassifier::new(&script)));
    let base = Instant::now();
    let at = |i: u64| base + Duration::from_secs(i * 10);

    assert_eq!(consumer.poll_once(at(0)).severity, Severity::Dangerous);
    for i in 1..10 {
        assert_eq!(consumer.poll_once(at(i)).severity, Severity::DangerousSustained);
    }

    assert_eq!(consumer.poll_once(at(10)).severity, Severity::Normal);
    // Timer restarts from the next dangerous poll
    assert_eq!(consumer.poll_once(at(11)).severity, Severity::Dangerous);
}

#[test]
fn nine_seconds_of_danger_never_escalates() {
    let latest = Arc::new(LatestState::new());
    let (mut consumer, _events) = consumer_with(
        &latest,
        Arc::new(ScriptedClassifier::new(&[PostureLabel::Dangerous; 91])),
    );
    let base = Instant::now();

    for i in 0..91 {
        let event = consumer.poll_once(base + Duration::from_millis(i * 100));
        assert_eq!(event.severity, Severity::Dangerous, "poll {i}");
    }
}

#[tokio::test(start_paused = true)]
async fn running_loop_raises_alarm_on_schedule() {
    let latest = Arc::new(LatestState::new());
    let cancel = CancellationToken::new();
    let sink = VecSink::default();
    let events = Arc::clone(&sink.events);

    let consumer = ConsumerLoop::new(
        Arc::clone(&latest),
        Arc::new(ScriptedClassifier::new(&[PostureLabel::Dangerous; 200])),
        Box::new(sink),
        cancel.clone(),
    )
    .with_threshold(Duration::from_secs(5));
    let task = tokio::spawn(consumer.run());

    tokio::time::sleep(Duration::from_millis(6_050)).await;
    cancel.cancel();
    let stats = task.await.unwrap();

    assert_eq!(stats.sustained_alarms, 1);
    let events = events.lock().unwrap();
    let first_sustained = events
        .iter()
        .position(|e| e.severity == Severity::DangerousSustained)
        .unwrap();
    // Poll 50 lands exactly on t = 5.0s
    assert_eq!(first_sustained, 50);
}
