use embassy_rp::gpio::{AnyPin, Input, Pin, Pull};
use fan_tach::pulse_counter::Edge;

use crate::TACHO_COUNTERS;

/// Counts edges on one fan tachometer pin. The GPIO interrupt wakes this task,
/// all it does is bump the counter of the pin's channel.
#[embassy_executor::task(pool_size = 8)]
pub async fn tacho_input_task(pin: AnyPin, edge: Edge) {
    let gpio = pin.pin();
    // fan tach outputs are open collector
    let mut tach_in = Input::new(pin, Pull::Up);
    loop {
        match edge {
            Edge::Rising => tach_in.wait_for_rising_edge().await,
            Edge::Falling => tach_in.wait_for_falling_edge().await,
        }
        TACHO_COUNTERS.on_edge(gpio);
    }
}
