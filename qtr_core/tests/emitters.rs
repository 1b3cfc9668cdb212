use qtr_core::{Emitters, QtrSensors, QtrSensorsBuilder};
use qtr_hardware::{SimEvent, SimulatedBoard};
use qtr_traits::Level;
use rstest::rstest;

const ODD: u8 = 10;
const EVEN: u8 = 11;

fn one_pin(dimmable: bool, level: u8) -> QtrSensors<SimulatedBoard> {
    let mut board = SimulatedBoard::new();
    board.attach_emitter(ODD);
    QtrSensorsBuilder::new()
        .rc()
        .pins(&[2, 3])
        .emitter_pin(ODD)
        .dimmable(dimmable)
        .dimming_level(level)
        .try_build(board)
        .expect("build driver")
}

fn two_pins(dimmable: bool) -> QtrSensors<SimulatedBoard> {
    let mut board = SimulatedBoard::new();
    board.attach_emitter(ODD);
    board.attach_emitter(EVEN);
    QtrSensorsBuilder::new()
        .rc()
        .pins(&[2, 3, 4, 5])
        .emitter_pins(ODD, EVEN)
        .dimmable(dimmable)
        .try_build(board)
        .expect("build driver")
}

fn levels(qtr: &QtrSensors<SimulatedBoard>, pin: u8) -> Vec<(u32, Level)> {
    qtr.hal()
        .writes_to(pin)
        .into_iter()
        .filter_map(|e| match e.event {
            SimEvent::Write { level, .. } => Some((e.at_us, level)),
            _ => None,
        })
        .collect()
}

#[test]
fn dimmable_reassert_forces_off_then_pulses_under_mask() {
    let mut qtr = one_pin(true, 3);
    qtr.emitters_on(Emitters::All, true).unwrap();
    qtr.hal_mut().clear_events();

    qtr.emitters_on(Emitters::All, true).unwrap();

    let writes = levels(&qtr, ODD);
    assert_eq!(writes.len(), 2 + 2 * 3);
    let (off_at, first) = writes[0];
    let (on_at, second) = writes[1];
    assert_eq!(first, Level::Low);
    assert_eq!(second, Level::High);
    assert_eq!(on_at - off_at, 1200);

    // D low pulses, each leg at least 1 us.
    let pulses = &writes[2..];
    let mut prev = on_at;
    for (i, &(at, level)) in pulses.iter().enumerate() {
        let expected = if i % 2 == 0 { Level::Low } else { Level::High };
        assert_eq!(level, expected);
        assert!(at - prev >= 1);
        prev = at;
    }

    let events = qtr.hal().events();
    let masked_at = events
        .iter()
        .find(|e| e.event == SimEvent::InterruptsMasked)
        .map(|e| e.at_us)
        .unwrap();
    let restored_at = events
        .iter()
        .find(|e| e.event == SimEvent::InterruptsRestored)
        .map(|e| e.at_us)
        .unwrap();
    assert!(pulses.iter().all(|&(at, _)| at >= masked_at && at <= restored_at));
    assert_eq!(qtr.hal().longest_mask_us(), 2 * 3);

    // Turn-on wait counts from the first rising edge.
    let elapsed = qtr.hal().now() - on_at;
    assert!((300..320).contains(&elapsed), "{elapsed}");
    assert_eq!(qtr.hal().latch(ODD), Some(Level::High));
}

#[test]
fn dimming_level_zero_skips_pulses() {
    let mut qtr = one_pin(true, 0);
    qtr.hal_mut().clear_events();
    qtr.emitters_on(Emitters::All, false).unwrap();
    assert_eq!(levels(&qtr, ODD).len(), 1);
    assert!(qtr.hal().events().iter().all(|e| e.event != SimEvent::InterruptsMasked));
}

#[test]
fn non_dimmable_on_is_idempotent() {
    let mut qtr = one_pin(false, 5);
    qtr.emitters_on(Emitters::All, true).unwrap();
    let writes = levels(&qtr, ODD);
    assert_eq!(writes.last().map(|w| w.1), Some(Level::High));

    qtr.hal_mut().clear_events();
    let before = qtr.hal().now();
    qtr.emitters_on(Emitters::All, true).unwrap();
    assert!(levels(&qtr, ODD).is_empty());
    assert_eq!(qtr.hal().now(), before, "no wait when nothing changed");
}

#[rstest]
#[case(true, 1200)]
#[case(false, 200)]
fn off_waits_for_driver_settle_time(#[case] dimmable: bool, #[case] settle: u32) {
    let mut qtr = one_pin(dimmable, 0);
    qtr.emitters_on(Emitters::All, false).unwrap();

    let before = qtr.hal().now();
    qtr.emitters_off(Emitters::All, true).unwrap();
    assert_eq!(qtr.hal().now() - before, settle);
    assert_eq!(qtr.hal().latch(ODD), Some(Level::Low));

    // Already off: no write, no wait.
    let before = qtr.hal().now();
    qtr.hal_mut().clear_events();
    qtr.emitters_off(Emitters::All, true).unwrap();
    assert_eq!(qtr.hal().now(), before);
    assert!(levels(&qtr, ODD).is_empty());
}

#[test]
fn non_dimmable_on_waits_fixed_settle() {
    let mut qtr = one_pin(false, 0);
    let before = qtr.hal().now();
    qtr.emitters_on(Emitters::All, true).unwrap();
    let elapsed = qtr.hal().now() - before;
    assert!((200..210).contains(&elapsed), "{elapsed}");
}

#[rstest]
#[case(Emitters::Odd)]
#[case(Emitters::Even)]
#[case(Emitters::None)]
fn single_pin_only_responds_to_all(#[case] emitters: Emitters) {
    let mut qtr = one_pin(true, 0);
    qtr.hal_mut().clear_events();
    qtr.emitters_on(emitters, true).unwrap();
    assert!(levels(&qtr, ODD).is_empty());
}

#[test]
fn banks_switch_independently_with_two_pins() {
    let mut qtr = two_pins(false);
    qtr.emitters_on(Emitters::Even, false).unwrap();
    assert_eq!(qtr.hal().latch(ODD), Some(Level::Low));
    assert_eq!(qtr.hal().latch(EVEN), Some(Level::High));

    qtr.emitters_on(Emitters::All, false).unwrap();
    qtr.emitters_off(Emitters::Odd, false).unwrap();
    assert_eq!(qtr.hal().latch(ODD), Some(Level::Low));
    assert_eq!(qtr.hal().latch(EVEN), Some(Level::High));
}

#[test]
fn select_overlaps_off_and_on_settle_times() {
    let mut qtr = two_pins(true);
    qtr.emitters_on(Emitters::Even, false).unwrap();

    let start = qtr.hal().now();
    qtr.emitters_select(Emitters::Odd).unwrap();
    let elapsed = qtr.hal().now() - start;

    assert_eq!(qtr.hal().latch(ODD), Some(Level::High));
    assert_eq!(qtr.hal().latch(EVEN), Some(Level::Low));
    // The even bank's 1200 us turn-off time is fully waited out, but the odd
    // bank's 300 us turn-on time runs inside it.
    assert!(elapsed >= 1200, "{elapsed}");
    assert!(elapsed < 1200 + 300, "{elapsed}");
}

#[rstest]
#[case(Emitters::All, Level::High, Level::High)]
#[case(Emitters::None, Level::Low, Level::Low)]
fn select_all_or_none(#[case] sel: Emitters, #[case] odd: Level, #[case] even: Level) {
    let mut qtr = two_pins(false);
    qtr.emitters_on(Emitters::Odd, false).unwrap();
    qtr.emitters_select(sel).unwrap();
    assert_eq!(qtr.hal().latch(ODD), Some(odd));
    assert_eq!(qtr.hal().latch(EVEN), Some(even));
}

#[test]
fn by_index_ignores_unknown_selectors() {
    let mut qtr = two_pins(false);
    qtr.hal_mut().clear_events();
    qtr.emitters_on_by_index(7, true).unwrap();
    qtr.emitters_select_by_index(4).unwrap();
    assert!(levels(&qtr, ODD).is_empty());
    assert!(levels(&qtr, EVEN).is_empty());

    qtr.emitters_on_by_index(0, false).unwrap();
    assert_eq!(qtr.hal().latch(ODD), Some(Level::High));
    assert_eq!(qtr.hal().latch(EVEN), Some(Level::High));
    qtr.emitters_off_by_index(2, false).unwrap();
    assert_eq!(qtr.hal().latch(EVEN), Some(Level::Low));
}

#[test]
fn release_returns_emitter_pins_to_input() {
    let mut qtr = two_pins(true);
    assert_eq!(qtr.emitter_pin_count(), 2);
    qtr.release_emitter_pins().unwrap();
    assert_eq!(qtr.emitter_pin_count(), 0);
    assert_eq!(qtr.hal().pin_mode(ODD), Some(qtr_traits::PinMode::Input));
    assert_eq!(qtr.hal().pin_mode(EVEN), Some(qtr_traits::PinMode::Input));
}
