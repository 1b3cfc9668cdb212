use qtr_hardware::{SimEvent, SimulatedBoard, Stamped};
use qtr_traits::{Clock, Gpio, InterruptMask, Level, PinMode};
use rstest::rstest;

#[rstest]
#[case(1)]
#[case(5)]
fn micros_advances_by_tick(#[case] tick: u32) {
    let mut board = SimulatedBoard::new();
    board.set_micros_tick(tick);
    let a = board.micros();
    let b = board.micros();
    assert_eq!(b - a, tick);
}

#[test]
fn us_since_handles_counter_wrap() {
    let mut board = SimulatedBoard::starting_at(u32::MAX - 9);
    let start = board.micros();
    board.delay_us(30);
    assert_eq!(board.us_since(start), 31);
}

#[test]
fn nested_masks_record_one_section() {
    let mut board = SimulatedBoard::new();
    board.disable_interrupts();
    board.disable_interrupts();
    board.delay_us(4);
    board.enable_interrupts();
    assert!(board.interrupts_masked());
    board.enable_interrupts();
    assert!(!board.interrupts_masked());
    assert_eq!(
        board.events(),
        &[
            Stamped { at_us: 0, event: SimEvent::InterruptsMasked },
            Stamped { at_us: 4, event: SimEvent::InterruptsRestored },
        ]
    );
}

#[test]
fn output_pins_read_back_their_latch() {
    let mut board = SimulatedBoard::new();
    board.set_pin_mode(8, PinMode::Output).unwrap();
    board.digital_write(8, Level::High).unwrap();
    assert_eq!(board.digital_read(8).unwrap(), Level::High);
    assert_eq!(board.latch(8), Some(Level::High));
    assert_eq!(board.writes_to(8).len(), 1);
}

#[test]
fn emitter_must_be_an_output_to_light_the_array() {
    let mut board = SimulatedBoard::new();
    board.attach_emitter(9);
    board.set_decay_lit_dark(3, Some(10), None);
    // High latch on an input pin is only a pull-up, not a lit emitter.
    board.digital_write(9, Level::High).unwrap();
    board.set_pin_mode(3, PinMode::Output).unwrap();
    board.set_pin_mode(3, PinMode::Input).unwrap();
    board.advance(50);
    assert_eq!(board.digital_read(3).unwrap(), Level::High);

    board.set_pin_mode(9, PinMode::Output).unwrap();
    assert_eq!(board.digital_read(3).unwrap(), Level::Low);
}
