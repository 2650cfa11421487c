//! PWM channel lifecycle through its registers.

use picoharp::app::registers::{PwmField, PwmRegister, Register, RegisterValue};
use picoharp::drivers::pwm::{MIN_FREQUENCY_HZ, PwmChannel, duty_to_u16};
use picoharp::drivers::{shared, with_shared};

use crate::mock_hw::{MockPwm, PwmCall};

#[test]
fn out_of_range_writes_keep_previous_values() {
    let pwm = MockPwm::default();
    let channel = shared(PwmChannel::new(pwm));
    let freq = PwmRegister::new(channel.clone(), PwmField::Frequency);
    let duty = PwmRegister::new(channel.clone(), PwmField::DutyCycle);

    freq.write(RegisterValue::U16(1_000)).unwrap();
    freq.write(RegisterValue::U16(5)).unwrap();
    duty.write(RegisterValue::U8(30)).unwrap();
    duty.write(RegisterValue::U8(150)).unwrap();

    assert_eq!(freq.read(), Ok(RegisterValue::U16(1_000)));
    assert_eq!(duty.read(), Ok(RegisterValue::U8(30)));
}

#[test]
fn start_stop_start_via_registers() {
    let pwm = MockPwm::default();
    let channel = shared(PwmChannel::new(pwm.clone()));
    let duty = PwmRegister::new(channel.clone(), PwmField::DutyCycle);
    let start = PwmRegister::new(channel.clone(), PwmField::Start);
    let stop = PwmRegister::new(channel.clone(), PwmField::Stop);

    duty.write(RegisterValue::U8(25)).unwrap();
    start.write(RegisterValue::U8(1)).unwrap();
    stop.write(RegisterValue::U8(1)).unwrap();
    start.write(RegisterValue::U8(0)).unwrap();

    assert!(with_shared(&channel, |ch| ch.is_enabled()));
    assert_eq!(stop.read(), Ok(RegisterValue::U8(1)));
    let active = PwmCall::Activate {
        frequency_hz: MIN_FREQUENCY_HZ,
        duty: duty_to_u16(25),
    };
    assert_eq!(pwm.history(), vec![active, PwmCall::Deactivate, active]);
}

#[test]
fn stop_on_idle_channel_does_not_touch_generator() {
    let pwm = MockPwm::default();
    let channel = shared(PwmChannel::new(pwm.clone()));
    let stop = PwmRegister::new(channel, PwmField::Stop);
    stop.write(RegisterValue::U8(1)).unwrap();
    stop.write(RegisterValue::U8(1)).unwrap();
    assert!(pwm.history().is_empty());
}

#[test]
fn full_duty_maps_to_full_scale() {
    let pwm = MockPwm::default();
    let mut channel = PwmChannel::new(pwm.clone());
    channel.set_duty_cycle(100);
    channel.set_frequency(20_000);
    channel.start().unwrap();
    assert_eq!(
        pwm.history(),
        vec![PwmCall::Activate {
            frequency_hz: 20_000,
            duty: u16::MAX
        }]
    );
}
