pub mod metrics;
pub mod tracer;

/// Index of an ADC channel within a frame.
pub type Channel = usize;
/// Index of a time bin within a frame.
pub type Time = usize;
/// Offset-corrected ADC reading.
pub type Voltage = i32;
/// Running sums over a region of interest.
pub type Charge = i64;

pub type EventIndex = usize;
pub type WireIndex = usize;

pub const CHANNELS_PER_WIRE: usize = 2;

/// The channel sensing the "left" end of the wire.
pub fn left_channel(wire: WireIndex) -> Channel {
    CHANNELS_PER_WIRE * wire
}

/// The channel sensing the "right" end of the wire.
pub fn right_channel(wire: WireIndex) -> Channel {
    CHANNELS_PER_WIRE * wire + 1
}
