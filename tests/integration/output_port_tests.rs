//! Masked digital outputs through the port and its registers.

use picoharp::app::registers::{DigitalOutputRegister, OutputOp, Register, RegisterValue};
use picoharp::drivers::digital_output::DigitalOutputPort;
use picoharp::drivers::{shared, with_shared};
use picoharp::error::{ConfigError, IoError};

use crate::mock_hw::{MockPin, pins};

fn hw_levels(pins: &[MockPin]) -> Vec<bool> {
    pins.iter().map(MockPin::level).collect()
}

#[test]
fn masked_set_leaves_unselected_pins() {
    let (hw, pins) = pins(4);
    let mut port = DigitalOutputPort::new(hw).unwrap();
    pins[3].set(true);

    port.change_state(true, Some(0b0101)).unwrap();

    assert_eq!(hw_levels(&pins), vec![true, false, true, true]);
    assert_eq!(port.current_state(), hw_levels(&pins).as_slice());
}

#[test]
fn double_toggle_restores_cached_levels() {
    let (hw, pins) = pins(4);
    let mut port = DigitalOutputPort::new(hw).unwrap();
    port.set_state(Some(0b0001)).unwrap();
    let before = port.current_state().to_vec();

    port.toggle_state(None).unwrap();
    assert_eq!(port.current_state(), &[false, true, true, true]);
    port.toggle_state(None).unwrap();

    assert_eq!(port.current_state(), before.as_slice());
    assert_eq!(hw_levels(&pins), before);
}

#[test]
fn nine_outputs_rejected() {
    let (hw, _pins) = pins(9);
    assert!(matches!(
        DigitalOutputPort::new(hw),
        Err(IoError::Config(ConfigError::TooManyLines { requested: 9, max: 8 }))
    ));
}

#[test]
fn set_clear_toggle_registers_share_one_port() {
    let (hw, pins) = pins(4);
    let port = shared(DigitalOutputPort::new(hw).unwrap());
    let set = DigitalOutputRegister::new(port.clone(), OutputOp::Set);
    let clear = DigitalOutputRegister::new(port.clone(), OutputOp::Clear);
    let toggle = DigitalOutputRegister::new(port.clone(), OutputOp::Toggle);

    set.write(RegisterValue::U8(0b1011)).unwrap();
    clear.write(RegisterValue::U8(0b0001)).unwrap();
    toggle.write(RegisterValue::U8(0b0110)).unwrap();

    assert_eq!(set.read(), Ok(RegisterValue::U8(0b1100)));
    assert_eq!(hw_levels(&pins), vec![false, false, true, true]);
    assert_eq!(with_shared(&port, |p| p.packed_state()), 0b1100);
}

#[test]
fn wide_payload_rejected_without_side_effects() {
    let (hw, pins) = pins(2);
    let port = shared(DigitalOutputPort::new(hw).unwrap());
    let set = DigitalOutputRegister::new(port, OutputOp::Set);
    assert!(matches!(
        set.write(RegisterValue::U16(3)),
        Err(IoError::InvalidArgument(_))
    ));
    assert_eq!(hw_levels(&pins), vec![false, false]);
}
