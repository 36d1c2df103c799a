use dct_common::{Channel, Voltage, WireIndex, left_channel, right_channel};

/// One event's offset-corrected samples, stored per channel.
#[derive(Default, Debug, Clone, PartialEq, Eq)]
pub struct WaveformFrame {
    channels: Vec<Vec<Voltage>>,
}

impl WaveformFrame {
    pub(crate) fn with_capacity(num_channels: usize, num_time_steps: usize) -> Self {
        Self {
            channels: (0..num_channels)
                .map(|_| Vec::with_capacity(num_time_steps))
                .collect(),
        }
    }

    /// Builds a frame from whole channel traces, e.g. for synthetic events.
    pub fn from_channels(channels: Vec<Vec<Voltage>>) -> Self {
        Self { channels }
    }

    /// Appends one time step, `row[channel]` being each channel's sample.
    pub(crate) fn push_time_step(&mut self, row: impl IntoIterator<Item = Voltage>) {
        for (trace, value) in self.channels.iter_mut().zip(row) {
            trace.push(value);
        }
    }

    pub fn num_time_steps(&self) -> usize {
        self.channels.first().map(Vec::len).unwrap_or_default()
    }

    pub fn channel(&self, channel: Channel) -> Option<&[Voltage]> {
        self.channels.get(channel).map(Vec::as_slice)
    }

    /// The left and right traces of a wire, if the frame holds both channels.
    pub fn wire_pair(&self, wire: WireIndex) -> Option<(&[Voltage], &[Voltage])> {
        Option::zip(
            self.channel(left_channel(wire)),
            self.channel(right_channel(wire)),
        )
    }
}
