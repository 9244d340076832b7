#![no_std]
#![no_main]
mod pio_square_wave;
mod tacho_input;

use assign_resources::assign_resources;
use embassy_rp::gpio::{AnyPin, Pin};
use embassy_rp::pio::Pio;
use embassy_rp::{bind_interrupts, peripherals};
use {defmt_rtt as _, panic_probe as _};
use fan_tach::clock::{Monotonic, SystemClock};
use fan_tach::config::{self, FAN_COUNT, MBFAN_COUNT, OUTPUT_LINKS};
use fan_tach::control::ControlLoop;
use fan_tach::pulse_counter::PulseCounters;
use fan_tach::tacho_output::TachoOutputs;
use crate::pio_square_wave::{load_square_wave_program, SquareWaveBank, SquareWavePio};
use crate::tacho_input::tacho_input_task;

/// tacho pulse counters, written from the edge tasks and read by the control loop
pub static TACHO_COUNTERS: PulseCounters<FAN_COUNT> = PulseCounters::new();

// pin numbers must match config::FAN_TACHO_READ_PINS and config::MBFAN_TACHO_GEN_PINS
assign_resources! {
    tacho_inputs: TachoInputPins {
        fan1: PIN_4,
        fan2: PIN_5,
        fan3: PIN_6,
        fan4: PIN_7,
        fan5: PIN_8,
        fan6: PIN_9,
        fan7: PIN_10,
        fan8: PIN_11,
    },
    tacho_outputs: TachoOutputPins {
        mbfan1: PIN_12,
        mbfan2: PIN_13,
        mbfan3: PIN_14,
        mbfan4: PIN_15,
        square_wave_pio: PIO0,
    }
}

bind_interrupts!(struct Irqs {
    PIO0_IRQ_0 => embassy_rp::pio::InterruptHandler<peripherals::PIO0>; // square wave gen
});


#[embassy_executor::main]
async fn main(spawner: embassy_executor::Spawner) {
    let p = embassy_rp::init(Default::default());
    let r = split_resources!(p);
    let clock = SystemClock;

    defmt::info!("Setting up Tacho Input pins...");
    let inputs: [AnyPin; FAN_COUNT] = [
        r.tacho_inputs.fan1.into(),
        r.tacho_inputs.fan2.into(),
        r.tacho_inputs.fan3.into(),
        r.tacho_inputs.fan4.into(),
        r.tacho_inputs.fan5.into(),
        r.tacho_inputs.fan6.into(),
        r.tacho_inputs.fan7.into(),
        r.tacho_inputs.fan8.into(),
    ];
    let gpios: [u8; FAN_COUNT] = core::array::from_fn(|i| inputs[i].pin());
    if gpios != config::FAN_TACHO_READ_PINS {
        defmt::warn!("Tacho input pins {} differ from board config {}", gpios, config::FAN_TACHO_READ_PINS);
    }
    if let Err(e) = TACHO_COUNTERS.configure(&gpios) {
        defmt::panic!("Invalid tacho input configuration: {:?}", e);
    }
    // counters must be mapped before the first edge can arrive
    for (channel, pin) in inputs.into_iter().enumerate() {
        spawner.spawn(tacho_input_task(pin, config::input_edge(channel))).expect("failed to spawn tacho input task");
    }

    defmt::info!("Setting up Tacho Output pins...");
    let Pio { mut common, sm0, sm1, sm2, sm3, .. } = Pio::new(r.tacho_outputs.square_wave_pio, Irqs);
    let program = load_square_wave_program(&mut common);
    let bank = SquareWaveBank {
        sm0: SquareWavePio::new(&mut common, &program, sm0, r.tacho_outputs.mbfan1),
        sm1: SquareWavePio::new(&mut common, &program, sm1, r.tacho_outputs.mbfan2),
        sm2: SquareWavePio::new(&mut common, &program, sm2, r.tacho_outputs.mbfan3),
        sm3: SquareWavePio::new(&mut common, &program, sm3, r.tacho_outputs.mbfan4),
    };
    let mut outputs: TachoOutputs<_, MBFAN_COUNT> = TachoOutputs::new(bank);

    let mut control: ControlLoop<FAN_COUNT, MBFAN_COUNT> = match ControlLoop::new(&OUTPUT_LINKS, clock.now()) {
        Ok(control) => control,
        Err(e) => defmt::panic!("Invalid tacho output configuration: {:?}", e),
    };

    let mut ticker = embassy_time::Ticker::every(config::CONTROL_LOOP_INTERVAL);
    loop {
        ticker.next().await;
        if control.tick(&TACHO_COUNTERS, &mut outputs, clock.now()) {
            for (fan, freq) in control.sampler().frequencies().iter().enumerate() {
                defmt::debug!("fan{}: {} Hz, {} rpm", fan + 1, freq, fan_tach::freq_counter::tacho_freq_to_rpm(*freq, config::PULSES_PER_REV));
            }
        }
    }
}
