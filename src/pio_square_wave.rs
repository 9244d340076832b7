use embassy_rp::clocks;
use embassy_rp::gpio::Level;
use embassy_rp::pio::{Common, Config, Direction, Instance, LoadedProgram, Pin, PioPin, StateMachine};
use fan_tach::tacho_output::SquareWaveGen;
use pio::InstructionOperands;

/// Below this the period no longer fits the 32 bit loop counter, treat as off
const MIN_OUTPUT_FREQ_HZ: f64 = 0.1;

/// every pass of `countloop` takes 3 cycles
const CYCLES_PER_COUNT: u32 = 3;

pub fn load_square_wave_program<'d, T: Instance>(pio: &mut Common<'d, T>) -> LoadedProgram<'d, T> {
    // Pin low while y counts down from the period to x, high for the remaining x counts.
    // x is refilled from the TX FIFO each period (or kept when the FIFO is empty),
    // the period itself sits in ISR.
    let prg = pio_proc::pio_asm!(
        ".side_set 1 opt"
            "pull noblock    side 0" // next high time if one was queued, else keep x; start of the low half
            "mov x, osr"
            "mov y, isr" // reload the period counter
        "countloop:"
            "jmp x!=y noset"
            "jmp skip        side 1" // reached the high half of the wave
        "noset:"
            "nop" // keeps both branches at 3 cycles per count
        "skip:"
            "jmp y-- countloop"
    );
    pio.load_program(&prg.program)
}

/// One fake tachometer output: a 50% duty square wave on a single pin
pub struct SquareWavePio<'d, T: Instance, const SM: usize> {
    sm: StateMachine<'d, T, SM>,
    pin: Pin<'d, T>,
}

impl<'d, T: Instance, const SM: usize> SquareWavePio<'d, T, SM> {
    pub fn new(
        pio: &mut Common<'d, T>,
        program: &LoadedProgram<'d, T>,
        mut sm: StateMachine<'d, T, SM>,
        pin: impl PioPin,
    ) -> Self {
        let pin = pio.make_pio_pin(pin);
        sm.set_pins(Level::Low, &[&pin]);
        sm.set_pin_dirs(Direction::Out, &[&pin]);

        let mut cfg = Config::default();
        cfg.use_program(program, &[&pin]);
        sm.set_config(&cfg);

        Self { sm, pin }
    }

    /// 0 Hz (or anything below `MIN_OUTPUT_FREQ_HZ`) stops the state machine with the pin low.
    /// Never waits on the state machine: at low frequencies it may not pull for seconds.
    pub fn set_frequency(&mut self, frequency: f64) {
        self.sm.set_enable(false);
        // a stopped state machine never drains a queued high time
        self.sm.clear_fifos();
        if !(frequency >= MIN_OUTPUT_FREQ_HZ) { // NaN lands here too
            self.sm.set_pins(Level::Low, &[&self.pin]);
            return;
        }
        let period = (clocks::clk_sys_freq() as f64 / CYCLES_PER_COUNT as f64 / frequency) as u32;
        self.load_period(period);
        self.sm.tx().push(period / 2); // high time, picked up at the next period boundary
        self.sm.set_enable(true);
    }

    /// Writes the period counter straight into ISR. State machine must be stopped with an empty FIFO.
    fn load_period(&mut self, counts: u32) {
        self.sm.tx().push(counts);
        unsafe {
            self.sm.exec_instr(
                InstructionOperands::PULL {
                    if_empty: false,
                    block: false,
                }
                .encode(),
            );
            self.sm.exec_instr(
                InstructionOperands::OUT {
                    destination: ::pio::OutDestination::ISR,
                    bit_count: 32,
                }
                .encode(),
            );
        };
    }
}

/// The four motherboard fan outputs, one state machine each
pub struct SquareWaveBank<'d, T: Instance> {
    pub sm0: SquareWavePio<'d, T, 0>,
    pub sm1: SquareWavePio<'d, T, 1>,
    pub sm2: SquareWavePio<'d, T, 2>,
    pub sm3: SquareWavePio<'d, T, 3>,
}

impl<'d, T: Instance> SquareWaveGen for SquareWaveBank<'d, T> {
    fn set_output_frequency(&mut self, channel: usize, frequency_hz: f64) {
        match channel {
            0 => self.sm0.set_frequency(frequency_hz),
            1 => self.sm1.set_frequency(frequency_hz),
            2 => self.sm2.set_frequency(frequency_hz),
            3 => self.sm3.set_frequency(frequency_hz),
            _ => defmt::error!("No square wave generator for output {}", channel),
        }
    }
}
