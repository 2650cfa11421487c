//! The I/O device: register map, event bindings and the mode hook.
//!
//! [`IoDevice::new`] builds every driver from the supplied peripherals,
//! binds them to their register addresses, and wires the two event
//! bindings:
//!
//! - digital input (address 32), on-change, armed while not in Standby;
//! - analog input (address 44), periodic, armed by the stream-state register.
//!
//! The device framework calls [`IoDevice::on_control_write`] after every
//! operation-control write, and the main loop calls [`IoDevice::tick`] and
//! [`IoDevice::drain`].

use std::collections::BTreeMap;
use std::sync::Arc;

use embassy_time::Duration;
use embedded_hal::digital::{InputPin, OutputPin, StatefulOutputPin};
use log::{info, warn};

use super::bindings::{EventGate, OnChangeEvent, PeriodicEvent};
use super::ports::{AnalogInput, MessageSink, PwmDriver, SyncClock};
use super::registers::{
    AnalogInputRegister, AnalogStreamRegister, DigitalInputRegister, DigitalOutputRegister,
    OutputOp, PwmField, PwmRegister, Register, RegisterValue, address,
};
use crate::config::{DeviceConfig, MAX_PWM_CHANNELS};
use crate::drivers::digital_input::{DigitalInputPort, EdgeDispatcher};
use crate::drivers::digital_output::DigitalOutputPort;
use crate::drivers::pwm::PwmChannel;
use crate::drivers::{Shared, shared, with_shared};
use crate::error::{ConfigError, IoError, Result};
use crate::events::MessageQueue;
use crate::scheduler::EventScheduler;

// ── Operation mode ────────────────────────────────────────────

/// Device-wide run state written through the operation-control register.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum OperationMode {
    Standby = 0,
    Active = 1,
    Speed = 3,
}

impl TryFrom<u8> for OperationMode {
    type Error = IoError;

    fn try_from(raw: u8) -> Result<Self> {
        match raw {
            0 => Ok(Self::Standby),
            1 => Ok(Self::Active),
            3 => Ok(Self::Speed),
            other => Err(IoError::InvalidMode(other)),
        }
    }
}

// ── Peripherals ───────────────────────────────────────────────

/// Hardware handed to the device at bring-up. Pin `i` of each list is bit `i`.
pub struct Peripherals<I, O, W, A> {
    pub inputs: Vec<I>,
    pub outputs: Vec<O>,
    pub pwm: Vec<W>,
    pub adc: A,
}

// ── Device ────────────────────────────────────────────────────

pub struct IoDevice<O, W> {
    registers: BTreeMap<u8, Arc<dyn Register>>,
    outputs: Shared<DigitalOutputPort<O>>,
    pwm: Vec<Shared<PwmChannel<W>>>,
    input_event: OnChangeEvent,
    analog_gate: EventGate,
    scheduler: EventScheduler,
    queue: Arc<MessageQueue>,
    mode: OperationMode,
}

impl<O, W> IoDevice<O, W>
where
    O: OutputPin + StatefulOutputPin + Send + 'static,
    W: PwmDriver + Send + 'static,
{
    /// Build the device in Standby. Returns the device and the edge
    /// dispatcher the GPIO interrupt must be routed to.
    pub fn new<I, A>(
        config: &DeviceConfig,
        peripherals: Peripherals<I, O, W, A>,
        sync: Arc<dyn SyncClock>,
        queue: Arc<MessageQueue>,
    ) -> Result<(Self, Arc<EdgeDispatcher<I>>)>
    where
        I: InputPin + Send + 'static,
        A: AnalogInput + Send + 'static,
    {
        config.validate()?;
        if peripherals.pwm.len() > MAX_PWM_CHANNELS {
            return Err(ConfigError::TooManyPwmChannels {
                requested: peripherals.pwm.len(),
                max: MAX_PWM_CHANNELS,
            }
            .into());
        }

        let mut registers: BTreeMap<u8, Arc<dyn Register>> = BTreeMap::new();

        // Digital input + on-change event.
        let mut input_port = DigitalInputPort::new(peripherals.inputs)?;
        let input_register: Arc<dyn Register> =
            Arc::new(DigitalInputRegister::new(address::DIGITAL_INPUT, input_port.state_handle()));
        registers.insert(address::DIGITAL_INPUT, input_register.clone());
        let input_event = OnChangeEvent::attach(
            address::DIGITAL_INPUT,
            input_register,
            &mut input_port,
            sync.clone(),
            queue.clone(),
            false,
        )?;
        let dispatcher = Arc::new(EdgeDispatcher::new(input_port));

        // Digital outputs.
        let outputs = shared(DigitalOutputPort::new(peripherals.outputs)?);
        for (addr, op) in [
            (address::DIGITAL_OUTPUT_SET, OutputOp::Set),
            (address::DIGITAL_OUTPUT_CLEAR, OutputOp::Clear),
            (address::DIGITAL_OUTPUT_TOGGLE, OutputOp::Toggle),
        ] {
            registers.insert(addr, Arc::new(DigitalOutputRegister::new(outputs.clone(), op)));
        }

        // Analog input + periodic event, disarmed until the stream is enabled.
        let analog_register: Arc<dyn Register> =
            Arc::new(AnalogInputRegister::new(address::ANALOG_INPUT, shared(peripherals.adc)));
        registers.insert(address::ANALOG_INPUT, analog_register.clone());
        let analog_gate = EventGate::new(false);
        registers.insert(
            address::ANALOG_STREAM_STATE,
            Arc::new(AnalogStreamRegister::new(analog_gate.clone())),
        );
        let mut scheduler = EventScheduler::new();
        let analog_event = PeriodicEvent::new(
            "analog",
            address::ANALOG_INPUT,
            analog_register,
            Duration::from_millis(u64::from(config.analog_period_ms)),
            sync,
            queue.clone(),
            analog_gate.clone(),
        );
        if scheduler.add(analog_event).is_none() {
            return Err(IoError::InvalidArgument("no scheduler slot for analog event"));
        }

        // PWM channels.
        let mut pwm = Vec::with_capacity(peripherals.pwm.len());
        for (n, driver) in peripherals.pwm.into_iter().enumerate() {
            let mut channel = PwmChannel::new(driver);
            if !channel.set_frequency(config.pwm_frequency_hz) {
                warn!("IoDevice: PWM{} frequency {} Hz ignored", n, config.pwm_frequency_hz);
            }
            if !channel.set_duty_cycle(config.pwm_duty_percent) {
                warn!("IoDevice: PWM{} duty {}% ignored", n, config.pwm_duty_percent);
            }
            let channel = shared(channel);
            for (addrs, field) in [
                (address::PWM_FREQUENCY, PwmField::Frequency),
                (address::PWM_DUTY_CYCLE, PwmField::DutyCycle),
                (address::PWM_START, PwmField::Start),
                (address::PWM_STOP, PwmField::Stop),
            ] {
                registers.insert(addrs[n], Arc::new(PwmRegister::new(channel.clone(), field)));
            }
            pwm.push(channel);
        }

        info!(
            "IoDevice: {} inputs, {} outputs, {} PWM, analog every {} ms",
            dispatcher.with_port(|p| p.width()),
            with_shared(&outputs, |p| p.width()),
            pwm.len(),
            config.analog_period_ms
        );

        let device = Self {
            registers,
            outputs,
            pwm,
            input_event,
            analog_gate,
            scheduler,
            queue,
            mode: OperationMode::Standby,
        };
        Ok((device, dispatcher))
    }

    // ── Register access ──────────────────────────────────────

    pub fn read_register(&self, addr: u8) -> Result<RegisterValue> {
        self.register(addr)?.read()
    }

    pub fn write_register(&self, addr: u8, value: RegisterValue) -> Result<()> {
        self.register(addr)?.write(value).inspect_err(|e| {
            warn!("IoDevice: write to register {} rejected: {}", addr, e);
        })
    }

    fn register(&self, addr: u8) -> Result<&Arc<dyn Register>> {
        self.registers.get(&addr).ok_or(IoError::UnknownRegister(addr))
    }

    /// Addresses bound by this device, ascending.
    pub fn addresses(&self) -> impl Iterator<Item = u8> + '_ {
        self.registers.keys().copied()
    }

    // ── Mode hook ────────────────────────────────────────────

    /// Call after every operation-control write.
    ///
    /// Leaving Standby arms the digital-input event. Entering Standby
    /// disarms both events and stops every running PWM channel once.
    pub fn on_control_write(&mut self, mode: OperationMode) -> Result<()> {
        if mode != self.mode {
            info!("IoDevice: mode {:?} -> {:?}", self.mode, mode);
        }
        self.mode = mode;

        if mode != OperationMode::Standby {
            self.input_event.enable();
            return Ok(());
        }

        self.input_event.disable();
        self.analog_gate.disable();
        let mut first_err = None;
        for channel in &self.pwm {
            let result = with_shared(channel, |ch| {
                if ch.is_enabled() { ch.stop() } else { Ok(()) }
            });
            if let Err(e) = result {
                warn!("IoDevice: PWM stop on standby failed: {}", e);
                if first_err.is_none() {
                    first_err = Some(e);
                }
            }
        }
        first_err.map_or(Ok(()), Err)
    }

    /// Raw-byte variant for the device framework's control register.
    pub fn on_control_write_raw(&mut self, raw: u8) -> Result<()> {
        self.on_control_write(OperationMode::try_from(raw)?)
    }

    pub fn mode(&self) -> OperationMode {
        self.mode
    }

    // ── Main loop ────────────────────────────────────────────

    /// Advance periodic bindings by `delta`. Returns messages emitted.
    pub fn tick(&mut self, delta: Duration) -> usize {
        self.scheduler.tick(delta)
    }

    /// Forward queued messages to the transport. Read failures of the
    /// input event since the last drain are logged first.
    pub fn drain<S: MessageSink>(&self, sink: &mut S) -> usize {
        self.input_event.report_failures();
        self.queue.drain_to(sink)
    }

    // ── Accessors ────────────────────────────────────────────

    pub fn input_event(&self) -> &OnChangeEvent {
        &self.input_event
    }

    pub fn analog_gate(&self) -> &EventGate {
        &self.analog_gate
    }

    pub fn outputs(&self) -> &Shared<DigitalOutputPort<O>> {
        &self.outputs
    }

    pub fn pwm_channel(&self, n: usize) -> Option<&Shared<PwmChannel<W>>> {
        self.pwm.get(n)
    }

    pub fn queue(&self) -> &Arc<MessageQueue> {
        &self.queue
    }
}
