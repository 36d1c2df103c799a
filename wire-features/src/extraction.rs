//! Per-channel extrema and the combined wire signal.
use crate::{config::AnalysisConfig, error::WireFault};
use dct_common::{Time, Voltage, WireIndex, left_channel, right_channel};

/// A voltage and the first bin at which it occurred.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Extremum {
    pub value: Voltage,
    pub location: Time,
}

/// Running minimum and maximum of one channel. Both are `None` until a sample is recorded.
#[derive(Default, Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChannelExtrema {
    pub min: Option<Extremum>,
    pub max: Option<Extremum>,
}

impl ChannelExtrema {
    /// Records a sample. Ties keep the earlier location.
    pub fn update(&mut self, time: Time, value: Voltage) {
        if self.min.is_none_or(|min| value < min.value) {
            self.min = Some(Extremum {
                value,
                location: time,
            });
        }
        if self.max.is_none_or(|max| value > max.value) {
            self.max = Some(Extremum {
                value,
                location: time,
            });
        }
    }
}

/// The sum of a wire's left and right channels, with its running minimum.
///
/// Only the bins scanned before any malfunction are held.
#[derive(Default, Debug, Clone, PartialEq, Eq)]
pub struct WireSignal {
    wire_sum: Vec<Voltage>,
    min: Option<Extremum>,
}

impl WireSignal {
    fn with_capacity(capacity: usize) -> Self {
        Self {
            wire_sum: Vec::with_capacity(capacity),
            min: None,
        }
    }

    pub fn from_wire_sum(wire_sum: Vec<Voltage>) -> Self {
        let mut signal = Self::with_capacity(wire_sum.len());
        for value in wire_sum {
            signal.push(value);
        }
        signal
    }

    fn push(&mut self, value: Voltage) {
        let time = self.wire_sum.len();
        if self.min.is_none_or(|min| value < min.value) {
            self.min = Some(Extremum {
                value,
                location: time,
            });
        }
        self.wire_sum.push(value);
    }

    pub fn wire_sum(&self) -> &[Voltage] {
        &self.wire_sum
    }

    pub fn min(&self) -> Option<Extremum> {
        self.min
    }
}

/// Everything learnt from a single pass over a wire's two channels.
#[derive(Default, Debug, Clone, PartialEq, Eq)]
pub struct WireScan {
    pub left: ChannelExtrema,
    pub right: ChannelExtrema,
    pub signal: WireSignal,
    /// Set if a sample was outside the safe range, in which case the scan stopped there.
    pub fault: Option<WireFault>,
}

/// Scans a wire's channel pair, stopping at the first sample outside the safe range.
#[tracing::instrument(skip_all, level = "trace", fields(wire = wire))]
pub fn scan_wire(
    wire: WireIndex,
    left: &[Voltage],
    right: &[Voltage],
    config: &AnalysisConfig,
) -> WireScan {
    let mut scan = WireScan {
        signal: WireSignal::with_capacity(left.len().min(right.len())),
        ..Default::default()
    };
    for (time, (&l, &r)) in left.iter().zip(right).enumerate() {
        let malfunction = [(left_channel(wire), l), (right_channel(wire), r)]
            .into_iter()
            .find(|&(_, value)| !config.in_safe_range(value));
        if let Some((channel, value)) = malfunction {
            scan.fault = Some(WireFault::ChannelOutOfRange {
                channel,
                time,
                value,
            });
            break;
        }
        scan.left.update(time, l);
        scan.right.update(time, r);
        scan.signal.push(l + r);
    }
    scan
}
