use qtr_core::{QtrError, QtrSensors, QtrSensorsBuilder, ReadMode};
use qtr_hardware::{SimEvent, SimulatedBoard};
use qtr_traits::{Level, PinMode};
use rstest::rstest;

const EMITTER: u8 = 10;

fn rc(board: SimulatedBoard, pins: &[u8]) -> QtrSensors<SimulatedBoard> {
    QtrSensorsBuilder::new()
        .rc()
        .pins(pins)
        .try_build(board)
        .expect("build rc driver")
}

fn analog(board: SimulatedBoard, pins: &[u8]) -> QtrSensors<SimulatedBoard> {
    QtrSensorsBuilder::new()
        .analog()
        .pins(pins)
        .try_build(board)
        .expect("build analog driver")
}

#[test]
fn rc_records_decay_time_per_channel() {
    let mut board = SimulatedBoard::new();
    board.set_decay(2, Some(100));
    board.set_decay(3, Some(400));
    board.set_decay(4, Some(1800));
    let mut qtr = rc(board, &[2, 3, 4]);

    let mut values = [0u32; 3];
    qtr.read(&mut values, ReadMode::Manual).unwrap();
    assert_eq!(values, [100, 400, 1800]);
}

#[rstest]
#[case(None, 2500)]
#[case(Some(1000), 1000)]
#[case(Some(1), 1)]
fn rc_line_that_never_decays_reports_timeout(#[case] timeout: Option<u16>, #[case] expected: u32) {
    let board = SimulatedBoard::new();
    let mut qtr = rc(board, &[2, 3]);
    if let Some(t) = timeout {
        qtr.set_timeout(t);
    }
    assert_eq!(u32::from(qtr.max_value()), expected);

    let mut values = [0u32; 2];
    qtr.read(&mut values, ReadMode::Manual).unwrap();
    assert_eq!(values, [expected, expected]);
}

#[test]
fn rc_read_survives_clock_wraparound() {
    let mut board = SimulatedBoard::starting_at(u32::MAX - 40);
    board.set_decay(2, Some(100));
    let mut qtr = rc(board, &[2, 3]);

    let mut values = [0u32; 2];
    qtr.read(&mut values, ReadMode::Manual).unwrap();
    assert_eq!(values, [100, 2500]);
}

#[test]
fn rc_lines_are_released_with_interrupts_masked() {
    let mut board = SimulatedBoard::new();
    for pin in [2, 3, 4] {
        board.set_decay(pin, Some(50));
    }
    let mut qtr = rc(board, &[2, 3, 4]);
    qtr.hal_mut().clear_events();

    let mut values = [0u32; 3];
    qtr.read(&mut values, ReadMode::Manual).unwrap();

    let mut masked = false;
    let mut released = 0;
    for e in qtr.hal().events() {
        match e.event {
            SimEvent::InterruptsMasked => masked = true,
            SimEvent::InterruptsRestored => masked = false,
            SimEvent::Mode {
                mode: PinMode::Input,
                ..
            } => {
                assert!(masked, "line released outside a masked section at {}", e.at_us);
                released += 1;
            }
            _ => {}
        }
    }
    assert_eq!(released, 3);
    assert!(!qtr.hal().interrupts_masked());
    // Each sampling instant is masked on its own.
    assert!(qtr.hal().longest_mask_us() < 10);
}

#[test]
fn rc_reads_lit_and_dark_decay_per_mode() {
    let mut board = SimulatedBoard::new();
    board.attach_emitter(EMITTER);
    board.set_decay_lit_dark(2, Some(300), Some(800));
    let mut qtr = QtrSensorsBuilder::new()
        .rc()
        .pins(&[2])
        .emitter_pin(EMITTER)
        .try_build(board)
        .unwrap();

    let mut values = [0u32; 1];
    qtr.read(&mut values, ReadMode::On).unwrap();
    assert_eq!(values, [300]);
    assert_eq!(qtr.hal().latch(EMITTER), Some(Level::Low));

    qtr.read(&mut values, ReadMode::Off).unwrap();
    assert_eq!(values, [800]);

    qtr.read(&mut values, ReadMode::OnAndOff).unwrap();
    assert_eq!(values, [300 + 2500 - 800]);
}

#[rstest]
#[case(&[1, 2, 2, 2], 2)]
#[case(&[1, 1, 1, 2], 1)]
#[case(&[1, 2, 3, 4], 3)]
#[case(&[1023, 1023, 1023, 1023], 1023)]
fn analog_average_rounds_to_nearest(#[case] samples: &[u16], #[case] expected: u32) {
    let mut board = SimulatedBoard::new();
    board.queue_analog(5, samples.iter().copied());
    let mut qtr = analog(board, &[5]);
    assert_eq!(qtr.samples_per_sensor(), 4);

    let mut values = [0u32; 1];
    qtr.read(&mut values, ReadMode::Manual).unwrap();
    assert_eq!(values, [expected]);
}

#[test]
fn ambient_subtraction_can_exceed_max_value() {
    let mut board = SimulatedBoard::new();
    board.attach_emitter(EMITTER);
    board.set_analog_lit_dark(2, 900, 100);
    board.set_analog_lit_dark(3, 100, 900);
    let mut qtr = QtrSensorsBuilder::new()
        .analog()
        .pins(&[2, 3])
        .emitter_pin(EMITTER)
        .try_build(board)
        .unwrap();

    let mut values = [0u32; 2];
    qtr.read(&mut values, ReadMode::OnAndOff).unwrap();
    assert_eq!(values, [900 + 1023 - 100, 100 + 1023 - 900]);
    assert!(values[0] > u32::from(qtr.max_value()));
}

#[test]
fn odd_even_fills_every_channel_and_leaves_emitters_off() {
    let mut board = SimulatedBoard::new();
    board.attach_emitter(10);
    board.attach_emitter(11);
    for (pin, lit) in [(2, 700), (3, 710), (4, 720), (5, 730), (6, 740)] {
        board.set_analog_lit_dark(pin, lit, 5);
    }
    let mut qtr = QtrSensorsBuilder::new()
        .analog()
        .pins(&[2, 3, 4, 5, 6])
        .emitter_pins(10, 11)
        .try_build(board)
        .unwrap();

    let mut values = [0u32; 5];
    qtr.read(&mut values, ReadMode::OddEven).unwrap();
    assert_eq!(values, [700, 710, 720, 730, 740]);
    assert_eq!(qtr.hal().latch(10), Some(Level::Low));
    assert_eq!(qtr.hal().latch(11), Some(Level::Low));

    qtr.read(&mut values, ReadMode::OddEvenAndOff).unwrap();
    assert_eq!(values, [1718, 1728, 1738, 1748, 1758]);
}

#[test]
fn manual_mode_never_touches_emitters() {
    let mut board = SimulatedBoard::new();
    board.attach_emitter(EMITTER);
    board.set_analog(2, 512);
    let mut qtr = QtrSensorsBuilder::new()
        .analog()
        .pins(&[2])
        .emitter_pin(EMITTER)
        .try_build(board)
        .unwrap();
    qtr.hal_mut().clear_events();

    let mut values = [0u32; 1];
    qtr.read(&mut values, ReadMode::Manual).unwrap();
    assert_eq!(values, [512]);
    assert!(qtr.hal().writes_to(EMITTER).is_empty());
}

#[test]
fn read_without_type_is_a_noop() {
    let mut qtr = QtrSensors::new(SimulatedBoard::new());
    qtr.set_sensor_pins(&[2, 3]);
    let mut values = [7u32; 2];
    qtr.read(&mut values, ReadMode::Manual).unwrap();
    assert_eq!(values, [7, 7]);
}

#[test]
fn unknown_mode_index_is_a_noop() {
    let mut board = SimulatedBoard::new();
    board.set_analog(2, 300);
    let mut qtr = analog(board, &[2]);

    let mut values = [7u32; 1];
    qtr.read_by_index(&mut values, 9).unwrap();
    assert_eq!(values, [7]);
    qtr.read_by_index(&mut values, 5).unwrap();
    assert_eq!(values, [300]);
}

#[test]
fn short_buffer_is_rejected() {
    let mut qtr = analog(SimulatedBoard::new(), &[2, 3, 4]);
    let mut values = [0u32; 2];
    let err = qtr.read(&mut values, ReadMode::On).unwrap_err();
    assert_eq!(
        err.downcast_ref::<QtrError>(),
        Some(&QtrError::BufferTooSmall { needed: 3, got: 2 })
    );
}

#[test]
fn failing_pin_maps_to_hardware_fault() {
    let mut board = SimulatedBoard::new();
    board.fail_pin(3);
    let mut qtr = rc(board, &[2, 3]);

    let mut values = [0u32; 2];
    let err = qtr.read(&mut values, ReadMode::Manual).unwrap_err();
    match err.downcast_ref::<QtrError>() {
        Some(QtrError::HardwareFault(msg)) => assert!(msg.contains('3'), "{msg}"),
        other => panic!("expected HardwareFault, got {other:?}"),
    }
    assert!(!qtr.hal().interrupts_masked());
}
