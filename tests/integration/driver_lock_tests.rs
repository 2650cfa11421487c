//! Slow cooperative driver calls must not block the edge chain.

use std::convert::Infallible;
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use picoharp::app::ports::{AnalogInput, EdgeHandler};
use picoharp::app::registers::{AnalogInputRegister, Register, RegisterValue, address};
use picoharp::drivers::digital_input::{DigitalInputPort, EdgeDispatcher};
use picoharp::drivers::shared;

use crate::mock_hw::pins;

/// ADC whose conversion parks until the test releases it.
struct ParkedAdc {
    entered: Sender<()>,
    release: Mutex<Receiver<()>>,
}

impl AnalogInput for ParkedAdc {
    type Error = Infallible;

    fn read_u16(&mut self) -> Result<u16, Infallible> {
        self.entered.send(()).unwrap();
        self.release.lock().unwrap().recv().unwrap();
        Ok(0x0abc)
    }
}

#[test]
fn edge_completes_while_adc_conversion_is_in_flight() {
    let (entered_tx, entered_rx) = mpsc::channel();
    let (release_tx, release_rx) = mpsc::channel();
    let register = Arc::new(AnalogInputRegister::new(
        address::ANALOG_INPUT,
        shared(ParkedAdc {
            entered: entered_tx,
            release: Mutex::new(release_rx),
        }),
    ));

    let (hw, lines) = pins(2);
    let dispatcher = Arc::new(EdgeDispatcher::new(DigitalInputPort::new(hw).unwrap()));

    let reader = {
        let register = register.clone();
        thread::spawn(move || register.read())
    };
    entered_rx.recv_timeout(Duration::from_secs(5)).unwrap();

    // Conversion is parked; an edge must still run to completion.
    let (done_tx, done_rx) = mpsc::channel();
    let edge = {
        let dispatcher = dispatcher.clone();
        lines[1].set(true);
        thread::spawn(move || {
            dispatcher.on_edge(1);
            done_tx.send(dispatcher.with_port(|p| p.state())).unwrap();
        })
    };
    assert_eq!(done_rx.recv_timeout(Duration::from_secs(5)), Ok(0b10));

    release_tx.send(()).unwrap();
    assert_eq!(reader.join().unwrap(), Ok(RegisterValue::U16(0x0abc)));
    edge.join().unwrap();
}
