//! Integration test: start a session on a manual output → pull samples like
//! a device would → verify the mix, the lifecycle and the end-of-song policy.

use chip_master::{
    AudioError, Controller, ControllerError, EndOfSong, ManualHandle, ManualOutput, NoteEvent,
    PlaybackConfig, PlaybackState, Song,
};
use rand::rngs::SmallRng;
use rand::SeedableRng;
use std::thread;
use std::time::{Duration, Instant};

/// Producers render the whole song at once when the lookahead dwarfs it.
fn eager_config() -> PlaybackConfig {
    PlaybackConfig::default().with_lookahead(Duration::from_secs(600))
}

fn manual_controller(config: PlaybackConfig) -> (Controller, ManualHandle) {
    let (output, handle) = ManualOutput::new();
    (Controller::with_output(config, Box::new(output)), handle)
}

/// 440 Hz on pulse1 for one beat, then one beat of rest.
fn beep_then_rest() -> Song {
    Song::new("beep", 120, vec![NoteEvent::new(440, 0, 0, false), NoteEvent::rest()])
}

fn wait_for(what: &str, timeout: Duration, mut done: impl FnMut() -> bool) {
    let deadline = Instant::now() + timeout;
    while !done() {
        assert!(Instant::now() < deadline, "timed out waiting for {}", what);
        thread::sleep(Duration::from_millis(5));
    }
}

#[test]
fn beep_then_rest_plays_square_then_silence() {
    let (mut ctrl, handle) = manual_controller(eager_config());
    ctrl.start(beep_then_rest()).unwrap();
    assert_eq!(ctrl.state(), PlaybackState::Playing);
    assert!(handle.is_running());

    wait_for("producers to finish", Duration::from_secs(5), || ctrl.is_exhausted());

    let samples = handle.pull(44100);
    let (beep, rest) = samples.split_at(22050);

    assert!(beep.iter().all(|s| s.abs() < 1e-6 || (s.abs() - 0.3).abs() < 1e-6));
    let loud = beep.iter().filter(|s| s.abs() > 0.29).count();
    assert!(loud > 22000, "only {} full-scale samples", loud);
    let rising = beep.windows(2).filter(|w| w[0] <= 0.0 && w[1] > 0.0).count();
    assert!((219..=221).contains(&rising), "{} rising edges", rising);

    assert!(rest.iter().all(|&s| s == 0.0));
    assert_eq!(ctrl.underruns(), 0);

    let pos = ctrl.position().unwrap();
    assert_eq!(pos.event_index, 1);
    assert_eq!(pos.loop_count, 0);

    ctrl.update();
    assert_eq!(ctrl.state(), PlaybackState::Idle);
    assert!(!handle.is_open());
}

#[test]
fn session_keeps_running_until_buffers_drain() {
    let (mut ctrl, handle) = manual_controller(eager_config());
    ctrl.start(beep_then_rest()).unwrap();
    wait_for("producers to finish", Duration::from_secs(5), || ctrl.is_exhausted());

    handle.pull(22050);
    ctrl.update();
    assert!(ctrl.is_playing());

    handle.pull(22050);
    ctrl.update();
    assert!(!ctrl.is_playing());
}

#[test]
fn pulling_past_the_end_is_silence_and_counts_underruns() {
    let (mut ctrl, handle) = manual_controller(eager_config());
    ctrl.start(beep_then_rest()).unwrap();
    wait_for("producers to finish", Duration::from_secs(5), || ctrl.is_exhausted());

    handle.pull(44100);
    let tail = handle.pull(1024);
    assert!(tail.iter().all(|&s| s == 0.0));
    assert_eq!(ctrl.underruns(), 1);
}

#[test]
fn looping_song_wraps_on_every_channel() {
    let config = eager_config()
        .with_end_of_song(EndOfSong::Loop)
        .with_buffer_seconds(0.5);
    let (mut ctrl, handle) = manual_controller(config);
    ctrl.start(beep_then_rest()).unwrap();

    // Three passes, pulled in device-sized blocks while producers keep up
    let mut played = Vec::new();
    wait_for("three passes", Duration::from_secs(10), || {
        played.extend(handle.pull(1024));
        ctrl.position().is_some_and(|p| p.loop_count >= 3)
    });

    ctrl.update();
    assert!(ctrl.is_playing());
    assert!(!ctrl.is_exhausted());

    // Every pass starts with the beep again
    assert!(played.iter().filter(|s| s.abs() > 0.29).count() > 3 * 21000);

    ctrl.stop();
    assert_eq!(ctrl.state(), PlaybackState::Idle);
}

#[test]
fn streamed_loop_matches_offline_render() {
    // Distinct pitches on every tonal channel, one long event, no noise
    let song = Song::new(
        "lockstep",
        600,
        vec![
            NoteEvent::new(440, 660, 220, false),
            NoteEvent::new(330, 0, 110, false).with_duration(2),
            NoteEvent::new(0, 550, 0, false),
            NoteEvent::new(523, 262, 131, false),
        ],
    );
    let pass = chip_engine::render_song(&song, 44100, &mut SmallRng::seed_from_u64(0));
    assert_eq!(pass.len(), 5 * 4410);

    // A buffer far smaller than one pass keeps producers throttling against the device
    let config = eager_config()
        .with_end_of_song(EndOfSong::Loop)
        .with_buffer_seconds(0.05);
    let (mut ctrl, handle) = manual_controller(config);
    ctrl.start(song).unwrap();

    let mut played = Vec::new();
    while played.len() < 2 * pass.len() {
        wait_for("channels to queue a block", Duration::from_secs(5), || {
            ctrl.buffered_samples() >= 977
        });
        played.extend(handle.pull(977));
    }

    let expected = pass.iter().chain(&pass);
    if let Some(at) = played.iter().zip(expected).position(|(a, b)| a != b) {
        panic!("stream diverges from offline render at sample {}", at);
    }
    assert_eq!(ctrl.underruns(), 0);
    assert_eq!(ctrl.position().unwrap().loop_count, 2);

    ctrl.stop();
}

#[test]
fn buffered_samples_track_what_is_left_to_play() {
    let (mut ctrl, handle) = manual_controller(eager_config());
    assert_eq!(ctrl.buffered_samples(), 0);

    ctrl.start(beep_then_rest()).unwrap();
    wait_for("producers to finish", Duration::from_secs(5), || ctrl.is_exhausted());
    assert_eq!(ctrl.buffered_samples(), 44100);

    handle.pull(10000);
    assert_eq!(ctrl.buffered_samples(), 34100);

    ctrl.stop();
    assert_eq!(ctrl.buffered_samples(), 0);
}

#[test]
fn second_start_is_rejected() {
    let (mut ctrl, _handle) = manual_controller(PlaybackConfig::default());
    ctrl.start(beep_then_rest()).unwrap();

    let err = ctrl.start(beep_then_rest()).unwrap_err();
    assert!(matches!(err, ControllerError::AlreadyPlaying));
    assert!(ctrl.is_playing());
}

#[test]
fn stop_is_idempotent() {
    let (mut ctrl, handle) = manual_controller(PlaybackConfig::default());
    ctrl.stop();
    assert_eq!(ctrl.state(), PlaybackState::Idle);

    ctrl.start(beep_then_rest()).unwrap();
    ctrl.stop();
    ctrl.stop();
    assert_eq!(ctrl.state(), PlaybackState::Idle);
    assert!(!handle.is_open());
    assert!(ctrl.position().is_none());
}

#[test]
fn stop_interrupts_a_long_song_quickly() {
    let long = Song::new("long", 60, vec![NoteEvent::new(220, 330, 110, true); 600]);
    let config = PlaybackConfig::default()
        .with_end_of_song(EndOfSong::Loop)
        .with_lookahead(Duration::from_millis(50));
    let (mut ctrl, handle) = manual_controller(config);
    ctrl.start(long).unwrap();
    handle.pull(4096);

    let started = Instant::now();
    ctrl.stop();
    assert!(started.elapsed() < Duration::from_millis(500));
    assert_eq!(ctrl.state(), PlaybackState::Idle);
}

#[test]
fn controller_can_restart_after_stop() {
    let (mut ctrl, handle) = manual_controller(eager_config());
    ctrl.start(beep_then_rest()).unwrap();
    ctrl.stop();

    ctrl.start(beep_then_rest()).unwrap();
    wait_for("producers to finish", Duration::from_secs(5), || ctrl.is_exhausted());
    let samples = handle.pull(22050);
    assert!(samples.iter().any(|s| s.abs() > 0.29));
    ctrl.stop();
}

#[test]
fn invalid_song_leaves_controller_idle() {
    let (mut ctrl, handle) = manual_controller(PlaybackConfig::default());
    let err = ctrl.start(Song::new("zero", 0, vec![NoteEvent::rest()])).unwrap_err();
    assert!(matches!(err, ControllerError::InvalidSong(_)));

    let err = ctrl.start(Song::new("empty", 120, Vec::new())).unwrap_err();
    assert!(matches!(err, ControllerError::InvalidSong(_)));

    assert_eq!(ctrl.state(), PlaybackState::Idle);
    assert!(!handle.is_open());
}

#[test]
fn invalid_config_leaves_controller_idle() {
    let config = PlaybackConfig::default().with_buffer_seconds(0.0);
    let (mut ctrl, handle) = manual_controller(config);
    let err = ctrl.start(beep_then_rest()).unwrap_err();
    assert!(matches!(err, ControllerError::InvalidConfig(_)));
    assert!(!handle.is_open());
}

#[test]
fn missing_device_fails_start() {
    let mut ctrl = Controller::with_output(PlaybackConfig::default(), Box::new(ManualOutput::unavailable()));
    let err = ctrl.start(beep_then_rest()).unwrap_err();
    assert!(matches!(err, ControllerError::Device(AudioError::NoDevice)));
    assert_eq!(ctrl.state(), PlaybackState::Idle);
    assert!(ctrl.song().is_none());
}
