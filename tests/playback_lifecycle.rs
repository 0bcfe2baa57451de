//! Integration tests for recording replay
//!
//! Runs whole recordings through the public playback API with tokio's paused
//! clock, checking pacing, lifecycle notifications, seeking and filtering.

use std::sync::Arc;
use std::time::Duration;

use futures::StreamExt;
use skywave::{
    FrequencyFilter, Guid, Modulation, PlaybackConfig, PlaybackController, PlaybackEvent,
    PlaybackState, RadioTuning, RecordedPacket, Recording, Replayer, SeekConfig, SeekController,
    SkywaveConfig, VoiceFrame,
};
use tokio::sync::{broadcast, mpsc};
use tokio::time::Instant;

/// `count` packets 20 ms apart on 251 MHz AM, every tenth one on 30 MHz FM.
fn recording(count: u64) -> Recording {
    let guid: Guid = "ufYS_WlLVkmFPjqCgxz6GA".parse().expect("valid guid");
    (0..count)
        .map(|n| {
            let tuning = if n % 10 == 0 {
                RadioTuning::new(30e6, Modulation::Fm, 0)
            } else {
                RadioTuning::new(251e6, Modulation::Am, 0)
            };
            RecordedPacket {
                timestamp: Duration::from_secs(3600) + Duration::from_millis(20 * n),
                frame: VoiceFrame {
                    audio: vec![0; 60],
                    tunings: vec![tuning],
                    unit_id: 7,
                    packet_number: n,
                    retransmission_count: 0,
                    transmission_guid: guid,
                    client_guid: guid,
                },
            }
        })
        .collect()
}

fn quiet_config() -> SkywaveConfig {
    SkywaveConfig {
        playback: PlaybackConfig { progress_interval: Duration::ZERO, ..PlaybackConfig::default() },
        ..SkywaveConfig::default()
    }
}

async fn lifecycle_until_stopped(rx: &mut broadcast::Receiver<PlaybackEvent>) -> Vec<PlaybackEvent> {
    let mut events = Vec::new();
    loop {
        match rx.recv().await {
            Ok(PlaybackEvent::Stopped) => {
                events.push(PlaybackEvent::Stopped);
                return events;
            }
            Ok(event) if event.is_lifecycle() => events.push(event),
            Ok(_) | Err(broadcast::error::RecvError::Lagged(_)) => {}
            Err(broadcast::error::RecvError::Closed) => return events,
        }
    }
}

fn packet_numbers(rx: &mut mpsc::Receiver<RecordedPacket>) -> Vec<u64> {
    let mut numbers = Vec::new();
    while let Ok(packet) = rx.try_recv() {
        numbers.push(packet.frame.packet_number);
    }
    numbers
}

#[tokio::test(start_paused = true)]
async fn full_replay_with_pause_and_resume() {
    let _ = tracing_subscriber::fmt::try_init();

    let replayer = Replayer::from_config(recording(250), &quiet_config());
    let mut events = replayer.controller().subscribe();
    let (tx, mut rx) = mpsc::channel(512);

    let started = Instant::now();
    replayer.play(tx);
    assert_eq!(replayer.controller().state(), PlaybackState::Playing);

    // Between packets 50 and 51
    tokio::time::sleep(Duration::from_millis(1010)).await;
    assert!(replayer.pause());
    let delivered_at_pause = rx.len();
    tokio::time::sleep(Duration::from_secs(30)).await;
    assert_eq!(rx.len(), delivered_at_pause, "nothing is delivered while paused");
    assert!(replayer.resume());

    let lifecycle = lifecycle_until_stopped(&mut events).await;
    assert_eq!(
        lifecycle,
        vec![
            PlaybackEvent::Started,
            PlaybackEvent::Paused,
            PlaybackEvent::Resumed,
            PlaybackEvent::Stopped,
        ]
    );

    assert_eq!(packet_numbers(&mut rx), (0..250).collect::<Vec<_>>());
    let elapsed = started.elapsed();
    assert!(elapsed >= Duration::from_millis(34_980), "finished after {:?}", elapsed);
    assert!(elapsed < Duration::from_millis(35_100), "finished after {:?}", elapsed);
    assert_eq!(replayer.controller().state(), PlaybackState::Idle);
}

#[tokio::test(start_paused = true)]
async fn seeking_during_playback_skips_ahead() {
    let _ = tracing_subscriber::fmt::try_init();

    let replayer = Replayer::from_config(recording(500), &quiet_config());
    let mut events = replayer.controller().subscribe();
    let (tx, mut rx) = mpsc::channel(1024);

    replayer.play(tx);
    tokio::time::sleep(Duration::from_millis(190)).await;
    replayer.seek(Duration::from_secs(8));
    lifecycle_until_stopped(&mut events).await;

    let numbers = packet_numbers(&mut rx);
    assert_eq!(&numbers[..10], &(0..10).collect::<Vec<_>>()[..]);
    assert_eq!(&numbers[10..], &(400..500).collect::<Vec<_>>()[..]);
}

#[tokio::test(start_paused = true)]
async fn small_seeks_do_not_jitter_playback() {
    let replayer = Replayer::from_config(recording(100), &quiet_config());
    let mut events = replayer.controller().subscribe();
    let (tx, mut rx) = mpsc::channel(256);

    replayer.play(tx);
    tokio::time::sleep(Duration::from_millis(490)).await;
    // Packet 24 is 480 ms in; the loop sits on packet 25
    replayer.seek(Duration::from_millis(480));
    lifecycle_until_stopped(&mut events).await;

    assert_eq!(packet_numbers(&mut rx), (0..100).collect::<Vec<_>>());
}

#[tokio::test(start_paused = true)]
async fn seek_emits_time_change_immediately() {
    let replayer = Replayer::from_config(recording(500), &quiet_config());
    let mut events = replayer.controller().subscribe();

    replayer.seek(Duration::from_secs(5));
    assert_eq!(events.try_recv().expect("time event"), PlaybackEvent::TimeChanged(Duration::from_secs(5)));
    assert!(matches!(events.try_recv(), Ok(PlaybackEvent::Progress(_))));

    replayer.seek(Duration::from_secs(600));
    let clamped = replayer.recording().duration();
    assert_eq!(events.try_recv().expect("time event"), PlaybackEvent::TimeChanged(clamped));
}

#[tokio::test(start_paused = true)]
async fn shared_filter_applies_to_running_replay() {
    let controller = PlaybackController::new(quiet_config().playback);
    let filter = Arc::new(FrequencyFilter::new());
    let seek = Arc::new(SeekController::new(SeekConfig::default()));
    let replayer = Replayer::new(recording(100), controller.clone(), seek, Arc::clone(&filter));

    let mut events = controller.subscribe();
    let (tx, mut rx) = mpsc::channel(256);

    replayer.play(tx);
    tokio::time::sleep(Duration::from_millis(1010)).await;
    filter.set_selection([(30e6, Modulation::Fm)]);
    lifecycle_until_stopped(&mut events).await;

    let numbers = packet_numbers(&mut rx);
    let mut expected: Vec<u64> = (0..51).collect();
    expected.extend((60..100).step_by(10));
    assert_eq!(numbers, expected);
}

#[tokio::test(start_paused = true)]
async fn progress_stream_reports_position() {
    let config = SkywaveConfig {
        playback: PlaybackConfig { progress_interval: Duration::from_millis(100), ..PlaybackConfig::default() },
        ..SkywaveConfig::default()
    };
    let replayer = Replayer::from_config(recording(251), &config);
    let mut progress = replayer.controller().progress_stream(Duration::from_millis(500));
    let (tx, _rx) = mpsc::channel(512);

    replayer.play(tx);

    let mut snapshots = Vec::new();
    while snapshots.len() < 6 {
        match progress.next().await {
            Some(snapshot) => snapshots.push(snapshot),
            None => break,
        }
    }
    replayer.stop_and_wait().await;

    let last = snapshots.last().expect("snapshots");
    assert_eq!(last.duration, Duration::from_secs(5));
    assert!(last.percent > 0.0 && last.percent <= 100.0);
    assert!(snapshots.windows(2).all(|w| w[0].position <= w[1].position));
}

#[tokio::test(start_paused = true)]
async fn stop_while_paused_finishes_promptly() {
    let replayer = Replayer::from_config(recording(1000), &quiet_config());
    let mut events = replayer.controller().subscribe();
    let (tx, _rx) = mpsc::channel(2048);

    replayer.play(tx);
    tokio::time::sleep(Duration::from_millis(100)).await;
    replayer.pause();

    let before = Instant::now();
    replayer.stop_and_wait().await;
    assert!(before.elapsed() < Duration::from_secs(1));

    let lifecycle = lifecycle_until_stopped(&mut events).await;
    assert_eq!(lifecycle.first(), Some(&PlaybackEvent::Started));
    assert_eq!(lifecycle.last(), Some(&PlaybackEvent::Stopped));
    assert!(!lifecycle.iter().any(|e| matches!(e, PlaybackEvent::Error(_))));
}
