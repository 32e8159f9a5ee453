use super::ScreenshotCadence;

#[test]
fn it_skips_ticks_while_capturing() {
    let mut cadence = ScreenshotCadence::default();

    assert!(cadence.begin_capture());
    assert!(!cadence.begin_capture());

    cadence.finish_capture(true, 5);
    assert!(cadence.begin_capture());
}

#[test]
fn it_reaches_the_threshold_after_five_successes() {
    let mut cadence = ScreenshotCadence::default();

    for _ in 0..4 {
        assert!(cadence.begin_capture());
        assert!(!cadence.finish_capture(true, 5));
    }

    assert!(cadence.begin_capture());
    assert!(cadence.finish_capture(true, 5));
}

#[test]
fn it_resets_the_counter_at_the_threshold() {
    let mut cadence = ScreenshotCadence::default();

    for _ in 0..5 {
        cadence.begin_capture();
        cadence.finish_capture(true, 5);
    }

    // The counter restarted from zero: four more successes stay below the
    // threshold, the fifth reaches it again.
    for _ in 0..4 {
        cadence.begin_capture();
        assert!(!cadence.finish_capture(true, 5));
    }
    cadence.begin_capture();
    assert!(cadence.finish_capture(true, 5));
}

#[test]
fn it_does_not_advance_on_failed_uploads() {
    let mut cadence = ScreenshotCadence::default();

    for _ in 0..4 {
        cadence.begin_capture();
        cadence.finish_capture(true, 5);
    }

    cadence.begin_capture();
    assert!(!cadence.finish_capture(false, 5));

    // The failure occupied a slot but not the counter.
    cadence.begin_capture();
    assert!(cadence.finish_capture(true, 5));
}

#[test]
fn it_clears_on_reset() {
    let mut cadence = ScreenshotCadence::default();

    cadence.begin_capture();
    cadence.reset();

    assert!(cadence.begin_capture());
    assert!(!cadence.finish_capture(true, 2));
    assert!(cadence.begin_capture());
    assert!(cadence.finish_capture(true, 2));
}
