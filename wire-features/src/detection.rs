//! Locates the region of interest of a wire signal.
//!
//! The detector is fed the wire signal one bin at a time and moves through
//! three states:
//!
//! - Searching: waiting for the signal to drop below the wire threshold at or
//!   before the signal minimum. The region of interest then opens `min_e_start`
//!   bins before the crossing, with a provisional width of `roi_size` bins.
//! - In event: waiting for the spike to close, i.e. for the signal to rise past
//!   the [CloseCondition]'s closing level. Under [StartPolicy::Retrigger] a
//!   fresh crossing in this state reopens the region at the new bin.
//! - Closed: the region ends at the closing bin. Nothing changes after this.
use crate::config::{AnalysisConfig, CloseCondition, StartPolicy};
use dct_common::{Charge, Time, Voltage, WireIndex};
use itertools::Itertools;

/// The bins believed to hold one wire's pulse for one event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegionOfInterest {
    pub start: Time,
    pub end: Time,
    /// Set once the signal has decayed past its closing level, `end` is then the closing bin.
    pub spike_over: bool,
}

/// The integrated signal and summed finite differences over a region of interest.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RoiIntegral {
    pub integral: Charge,
    pub dndt: Charge,
}

impl RegionOfInterest {
    /// The region given to wires where no event was found, so fixed-width
    /// consumers stay within bounds. It never contributes to any aggregate.
    pub fn placeholder(config: &AnalysisConfig) -> Self {
        let start = config.placeholder_start();
        Self {
            start,
            end: start + config.roi_size,
            spike_over: false,
        }
    }

    pub fn drift_time(&self) -> Time {
        self.end.saturating_sub(self.start)
    }

    /// Sums `wire_sum[t]` and `wire_sum[t] - wire_sum[t + 1]` over `start <= t < end`.
    ///
    /// Returns `None` if the region, including the bin after its last, lies outside `wire_sum`.
    pub fn integrate(&self, wire_sum: &[Voltage]) -> Option<RoiIntegral> {
        let window = wire_sum.get(self.start..=self.end)?;
        let integral = window
            .iter()
            .take(self.drift_time())
            .copied()
            .map(Charge::from)
            .sum();
        let dndt = window
            .iter()
            .copied()
            .map(Charge::from)
            .tuple_windows()
            .map(|(current, next)| current - next)
            .sum();
        Some(RoiIntegral { integral, dndt })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RoiState {
    Searching,
    InEvent(RegionOfInterest),
    Closed(RegionOfInterest),
}

#[derive(Debug, Clone)]
pub struct RoiDetector {
    state: RoiState,
    threshold: Voltage,
    closing_level: Voltage,
    min_location: Option<Time>,
    min_e_start: usize,
    roi_size: usize,
    start_policy: StartPolicy,
}

impl RoiDetector {
    pub fn new(
        threshold: Voltage,
        min_location: Option<Time>,
        min_e_start: usize,
        roi_size: usize,
        start_policy: StartPolicy,
        close_condition: CloseCondition,
    ) -> Self {
        Self {
            state: RoiState::Searching,
            threshold,
            closing_level: close_condition.closing_level(threshold),
            min_location,
            min_e_start,
            roi_size,
            start_policy,
        }
    }

    /// Creates a detector for the given wire, whose signal minimum is at `min_location`.
    pub fn for_wire(config: &AnalysisConfig, wire: WireIndex, min_location: Option<Time>) -> Self {
        Self::new(
            config.wire_threshold(wire),
            min_location,
            config.min_e_start,
            config.roi_size,
            config.start_policy,
            config.close_condition,
        )
    }

    fn open(&self, time: Time) -> RegionOfInterest {
        let start = time.saturating_sub(self.min_e_start);
        RegionOfInterest {
            start,
            end: start + self.roi_size,
            spike_over: false,
        }
    }

    fn is_start(&self, time: Time, value: Voltage) -> bool {
        value < self.threshold && self.min_location.is_some_and(|location| time <= location)
    }

    /// Feeds the next bin to the detector. Returns the region of interest
    /// when this bin closes the spike.
    pub fn signal(&mut self, time: Time, value: Voltage) -> Option<RegionOfInterest> {
        match self.state {
            RoiState::Searching => {
                if self.is_start(time, value) {
                    self.state = RoiState::InEvent(self.open(time));
                }
                None
            }
            RoiState::InEvent(roi) => {
                if self.start_policy == StartPolicy::Retrigger && self.is_start(time, value) {
                    self.state = RoiState::InEvent(self.open(time));
                    None
                } else if value > self.closing_level {
                    let roi = RegionOfInterest {
                        end: time,
                        spike_over: true,
                        ..roi
                    };
                    self.state = RoiState::Closed(roi);
                    Some(roi)
                } else {
                    None
                }
            }
            RoiState::Closed(_) => None,
        }
    }

    /// The region found so far, `None` if the start condition was never met.
    pub fn finish(&self) -> Option<RegionOfInterest> {
        match self.state {
            RoiState::Searching => None,
            RoiState::InEvent(roi) | RoiState::Closed(roi) => Some(roi),
        }
    }

    /// Runs the detector over a whole wire signal.
    pub fn detect(mut self, wire_sum: &[Voltage]) -> Option<RegionOfInterest> {
        for (time, &value) in wire_sum.iter().enumerate() {
            if let Some(roi) = self.signal(time, value) {
                return Some(roi);
            }
        }
        self.finish()
    }
}
