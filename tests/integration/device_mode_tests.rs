//! Full device: register map, mode hook, periodic analog stream.

use std::sync::Arc;
use std::sync::atomic::Ordering;

use embassy_time::Duration;
use picoharp::app::ports::EdgeHandler;
use picoharp::app::registers::{RegisterValue, address};
use picoharp::drivers::digital_input::EdgeDispatcher;
use picoharp::drivers::with_shared;
use picoharp::events::MessageQueue;
use picoharp::{DeviceConfig, IoDevice, IoError, OperationMode, Peripherals};

use crate::mock_hw::{ManualClock, MockAdc, MockPin, MockPwm, RecordingSink, pins};

struct Rig {
    device: IoDevice<MockPin, MockPwm>,
    dispatcher: Arc<EdgeDispatcher<MockPin>>,
    inputs: Vec<MockPin>,
    outputs: Vec<MockPin>,
    pwm: Vec<MockPwm>,
    adc: MockAdc,
}

fn rig() -> Rig {
    let config = DeviceConfig::default();
    let (in_hw, inputs) = pins(4);
    let (out_hw, outputs) = pins(4);
    let pwm = vec![MockPwm::default(), MockPwm::default()];
    let adc = MockAdc::default();
    let peripherals = Peripherals {
        inputs: in_hw,
        outputs: out_hw,
        pwm: pwm.clone(),
        adc: adc.clone(),
    };
    let (device, dispatcher) = IoDevice::new(
        &config,
        peripherals,
        Arc::new(ManualClock::default()),
        Arc::new(MessageQueue::new()),
    )
    .unwrap();
    Rig {
        device,
        dispatcher,
        inputs,
        outputs,
        pwm,
        adc,
    }
}

impl Rig {
    fn edge(&self, line: usize, level: bool) {
        self.inputs[line].set(level);
        self.dispatcher.on_edge(line as u8);
    }
}

#[test]
fn starts_in_standby_with_events_disarmed() {
    let rig = rig();
    assert_eq!(rig.device.mode(), OperationMode::Standby);
    rig.edge(0, true);
    assert!(rig.device.queue().is_empty());
    assert_eq!(rig.device.read_register(address::DIGITAL_INPUT), Ok(RegisterValue::U8(1)));
}

#[test]
fn leaving_standby_arms_input_event() {
    let mut rig = rig();
    rig.device.on_control_write(OperationMode::Active).unwrap();
    rig.edge(2, true);

    let mut sink = RecordingSink::default();
    assert_eq!(rig.device.drain(&mut sink), 1);
    assert_eq!(sink.messages[0].address, address::DIGITAL_INPUT);
    assert_eq!(sink.messages[0].payload, RegisterValue::U8(0b0100));
}

#[test]
fn entering_standby_disarms_and_stops_running_pwm_once() {
    let mut rig = rig();
    rig.device.on_control_write(OperationMode::Active).unwrap();
    rig.device
        .write_register(address::ANALOG_STREAM_STATE, RegisterValue::U8(1))
        .unwrap();
    rig.device
        .write_register(address::PWM_START[0], RegisterValue::U8(1))
        .unwrap();

    rig.device.on_control_write(OperationMode::Standby).unwrap();

    assert!(!rig.device.input_event().is_enabled());
    assert!(!rig.device.analog_gate().is_enabled());
    assert_eq!(rig.pwm[0].deactivations(), 1);
    // Channel 1 never ran.
    assert_eq!(rig.pwm[1].deactivations(), 0);
    assert!(!with_shared(rig.device.pwm_channel(0).unwrap(), |ch| ch.is_enabled()));

    // A second Standby write finds nothing running.
    rig.device.on_control_write(OperationMode::Standby).unwrap();
    assert_eq!(rig.pwm[0].deactivations(), 1);

    rig.edge(1, true);
    assert_eq!(rig.device.tick(Duration::from_millis(50)), 0);
    assert!(rig.device.queue().is_empty());
}

#[test]
fn analog_stream_emits_per_period_when_armed() {
    let mut rig = rig();
    rig.adc.value.store(2048, Ordering::SeqCst);

    assert_eq!(rig.device.tick(Duration::from_millis(30)), 0);

    rig.device
        .write_register(address::ANALOG_STREAM_STATE, RegisterValue::U8(1))
        .unwrap();
    assert_eq!(rig.device.tick(Duration::from_millis(35)), 3);

    let mut sink = RecordingSink::default();
    rig.device.drain(&mut sink);
    assert_eq!(sink.messages.len(), 3);
    assert!(
        sink.messages
            .iter()
            .all(|m| m.address == address::ANALOG_INPUT && m.payload == RegisterValue::U16(2048))
    );
}

#[test]
fn stalled_main_loop_samples_once() {
    let mut rig = rig();
    rig.device
        .write_register(address::ANALOG_STREAM_STATE, RegisterValue::U8(1))
        .unwrap();

    assert_eq!(rig.device.tick(Duration::from_secs(60)), 1);
    assert_eq!(rig.device.queue().len(), 1);
    assert_eq!(rig.device.queue().dropped_count(), 0);
    // Back on schedule afterwards.
    assert_eq!(rig.device.tick(Duration::from_millis(20)), 2);
}

#[test]
fn output_registers_drive_pins() {
    let rig = rig();
    rig.device
        .write_register(address::DIGITAL_OUTPUT_SET, RegisterValue::U8(0b1001))
        .unwrap();
    rig.device
        .write_register(address::DIGITAL_OUTPUT_TOGGLE, RegisterValue::U8(0b0011))
        .unwrap();
    let levels: Vec<bool> = rig.outputs.iter().map(MockPin::level).collect();
    assert_eq!(levels, vec![false, true, false, true]);
    assert_eq!(
        rig.device.read_register(address::DIGITAL_OUTPUT_CLEAR),
        Ok(RegisterValue::U8(0b1010))
    );
    assert_eq!(
        with_shared(rig.device.outputs(), |p| p.current_state().to_vec()),
        vec![false, true, false, true]
    );
}

#[test]
fn register_errors() {
    let rig = rig();
    assert_eq!(rig.device.read_register(99), Err(IoError::UnknownRegister(99)));
    assert_eq!(
        rig.device.write_register(address::DIGITAL_INPUT, RegisterValue::U8(1)),
        Err(IoError::ReadOnly(address::DIGITAL_INPUT))
    );
    assert_eq!(
        rig.device.write_register(address::ANALOG_INPUT, RegisterValue::U16(1)),
        Err(IoError::ReadOnly(address::ANALOG_INPUT))
    );
}

#[test]
fn raw_control_byte_is_validated() {
    let mut rig = rig();
    assert_eq!(rig.device.on_control_write_raw(2), Err(IoError::InvalidMode(2)));
    assert_eq!(rig.device.mode(), OperationMode::Standby);
    rig.device.on_control_write_raw(3).unwrap();
    assert_eq!(rig.device.mode(), OperationMode::Speed);
    assert!(rig.device.input_event().is_enabled());
}

#[test]
fn every_mapped_address_is_bound() {
    let rig = rig();
    let addrs: Vec<u8> = rig.device.addresses().collect();
    assert_eq!(
        addrs,
        vec![32, 33, 38, 39, 40, 44, 60, 61, 64, 65, 68, 69, 70, 71]
    );
}

#[test]
fn nine_inputs_abort_construction() {
    let config = DeviceConfig::default();
    let (in_hw, _) = pins(9);
    let (out_hw, _) = pins(4);
    let peripherals = Peripherals {
        inputs: in_hw,
        outputs: out_hw,
        pwm: Vec::<MockPwm>::new(),
        adc: MockAdc::default(),
    };
    let result = IoDevice::new(
        &config,
        peripherals,
        Arc::new(ManualClock::default()),
        Arc::new(MessageQueue::new()),
    );
    assert!(matches!(result, Err(IoError::Config(_))));
}
