//! Run-wide series built up one event at a time.
use crate::{
    error::WireFault,
    event::{EventFeatures, WireFeatures},
};
use dct_common::{Charge, EventIndex, Time, Voltage, WireIndex};
use std::fmt;
use tracing::debug;

/// An append-only column indexed by event. Events where nothing was recorded hold `None`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Series<T>(Vec<Option<T>>);

impl<T> Default for Series<T> {
    fn default() -> Self {
        Self(Vec::new())
    }
}

impl<T: Copy> Series<T> {
    pub fn get(&self, event: EventIndex) -> Option<T> {
        self.0.get(event).copied().flatten()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = Option<T>> + '_ {
        self.0.iter().copied()
    }

    /// The recorded values, in event order.
    pub fn values(&self) -> impl Iterator<Item = T> + '_ {
        self.0.iter().filter_map(|value| *value)
    }

    fn grow_to(&mut self, len: usize) {
        if self.0.len() < len {
            self.0.resize_with(len, || None);
        }
    }

    fn slot(&mut self, event: EventIndex) -> &mut Option<T> {
        self.grow_to(event + 1);
        &mut self.0[event]
    }

    fn combine(&mut self, event: EventIndex, value: T, f: impl FnOnce(T, T) -> T) {
        let slot = self.slot(event);
        *slot = Some(match *slot {
            Some(existing) => f(existing, value),
            None => value,
        });
    }
}

impl<T: Copy + Ord> Series<T> {
    fn record_min(&mut self, event: EventIndex, value: T) {
        self.combine(event, value, Ord::min);
    }
}

impl<T: Copy + std::ops::Add<Output = T>> Series<T> {
    fn add(&mut self, event: EventIndex, value: T) {
        self.combine(event, value, |existing, value| existing + value);
    }
}

/// Per-event quantities of a single wire. Only valid wires are recorded.
#[derive(Default, Debug, Clone, PartialEq, Eq)]
pub struct WireSeries {
    pub min_value: Series<Voltage>,
    pub min_location: Series<Time>,
    pub start: Series<Time>,
    pub drift_time: Series<Time>,
    /// Only recorded when the spike closed.
    pub integral: Series<Charge>,
    /// Only recorded when the spike closed.
    pub dndt: Series<Charge>,
}

impl WireSeries {
    fn grow_to(&mut self, len: usize) {
        self.min_value.grow_to(len);
        self.min_location.grow_to(len);
        self.start.grow_to(len);
        self.drift_time.grow_to(len);
        self.integral.grow_to(len);
        self.dndt.grow_to(len);
    }

    fn record(&mut self, event: EventIndex, wire: &WireFeatures) {
        if let Some(min) = wire.min {
            self.min_value.record_min(event, min.value);
            if self.min_value.get(event) == Some(min.value) {
                *self.min_location.slot(event) = Some(min.location);
            }
        }
        *self.start.slot(event) = Some(wire.roi.start);
        *self.drift_time.slot(event) = Some(wire.roi.drift_time());
        if let Some(integral) = wire.integral {
            self.integral.add(event, integral.integral);
            self.dndt.add(event, integral.dndt);
        }
    }
}

/// How often a wire was accepted or rejected over a run.
#[derive(Default, Debug, Clone, Copy, PartialEq, Eq)]
pub struct WireTally {
    pub valid: usize,
    pub channel_out_of_range: usize,
    pub no_event_found: usize,
}

impl WireTally {
    fn record(&mut self, wire: &WireFeatures) {
        match wire.verdict.fault() {
            None => self.valid += 1,
            Some(WireFault::ChannelOutOfRange { .. }) => self.channel_out_of_range += 1,
            Some(WireFault::NoEventFound { .. }) => self.no_event_found += 1,
        }
    }
}

/// Owns every series of a run and the features of each event accumulated so far.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventAccumulator {
    wires: Vec<WireSeries>,
    tallies: Vec<WireTally>,
    event_min: Series<Voltage>,
    events: Vec<EventFeatures>,
    coincidence_wires: Vec<WireIndex>,
    coincidences: usize,
}

impl EventAccumulator {
    /// Creates an empty accumulator. An event counts as a coincidence when every
    /// wire of `coincidence_wires` is valid in it; an empty set never coincides.
    pub fn new(num_wires: usize, coincidence_wires: Vec<WireIndex>) -> Self {
        Self {
            wires: vec![WireSeries::default(); num_wires],
            tallies: vec![WireTally::default(); num_wires],
            event_min: Series::default(),
            events: Vec::new(),
            coincidence_wires,
            coincidences: 0,
        }
    }

    #[tracing::instrument(skip_all, level = "debug", fields(event = event.index))]
    pub fn accumulate(&mut self, event: EventFeatures) {
        let index = event.index;
        for series in &mut self.wires {
            series.grow_to(index + 1);
        }
        self.event_min.grow_to(index + 1);

        for wire in &event.wires {
            if let Some(tally) = self.tallies.get_mut(wire.wire) {
                tally.record(wire);
            }
            if !wire.is_valid() {
                continue;
            }
            if let Some(series) = self.wires.get_mut(wire.wire) {
                series.record(index, wire);
            }
            if let Some(min) = wire.min {
                self.event_min.record_min(index, min.value);
            }
        }

        if self.is_coincidence(&event) {
            debug!("Coincidence in event {index}");
            self.coincidences += 1;
        }
        self.events.push(event);
    }

    fn is_coincidence(&self, event: &EventFeatures) -> bool {
        !self.coincidence_wires.is_empty()
            && self.coincidence_wires.iter().all(|&wire| {
                event
                    .wires
                    .iter()
                    .any(|features| features.wire == wire && features.is_valid())
            })
    }

    pub fn num_events(&self) -> usize {
        self.events.len()
    }

    pub fn wire(&self, wire: WireIndex) -> Option<&WireSeries> {
        self.wires.get(wire)
    }

    /// The lowest valid-wire minimum of each event.
    pub fn event_min(&self) -> &Series<Voltage> {
        &self.event_min
    }

    pub fn events(&self) -> &[EventFeatures] {
        &self.events
    }

    pub fn coincidences(&self) -> usize {
        self.coincidences
    }

    pub fn summary(&self) -> RunSummary {
        RunSummary {
            events: self.num_events(),
            tallies: self.tallies.clone(),
            coincidence_wires: self.coincidence_wires.clone(),
            coincidences: self.coincidences,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    pub events: usize,
    /// Indexed by wire.
    pub tallies: Vec<WireTally>,
    pub coincidence_wires: Vec<WireIndex>,
    pub coincidences: usize,
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Events processed: {}", self.events)?;
        for (wire, tally) in self.tallies.iter().enumerate() {
            writeln!(
                f,
                "Wire {wire}: {} valid, {} out of range, {} without event",
                tally.valid, tally.channel_out_of_range, tally.no_event_found
            )?;
        }
        write!(
            f,
            "Coincidences on wires {:?}: {}",
            self.coincidence_wires, self.coincidences
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        detection::{RegionOfInterest, RoiIntegral},
        event::WireVerdict,
        extraction::{ChannelExtrema, Extremum},
    };

    fn wire(wire: WireIndex, min: Voltage, verdict: WireVerdict) -> WireFeatures {
        WireFeatures {
            wire,
            left: ChannelExtrema::default(),
            right: ChannelExtrema::default(),
            min: Some(Extremum {
                value: min,
                location: 40,
            }),
            roi: RegionOfInterest {
                start: 30,
                end: 45,
                spike_over: true,
            },
            integral: verdict.is_valid().then_some(RoiIntegral {
                integral: 10 * Charge::from(min),
                dndt: -3,
            }),
            verdict,
        }
    }

    const NO_EVENT: WireVerdict = WireVerdict::Invalid(WireFault::NoEventFound { threshold: -80 });
    const SATURATED: WireVerdict = WireVerdict::Invalid(WireFault::ChannelOutOfRange {
        channel: 4,
        time: 12,
        value: -2100,
    });

    #[test]
    fn invalid_wire_leaves_series_unset() {
        let mut accumulator = EventAccumulator::new(4, vec![]);
        accumulator.accumulate(EventFeatures {
            index: 0,
            wires: vec![wire(2, -90, WireVerdict::Valid), wire(3, -300, NO_EVENT)],
        });
        accumulator.accumulate(EventFeatures {
            index: 1,
            wires: vec![wire(3, -120, WireVerdict::Valid)],
        });

        let series = accumulator.wire(3).unwrap();
        assert_eq!(series.min_value.len(), 2);
        assert_eq!(series.min_value.get(0), None);
        assert_eq!(series.min_value.get(1), Some(-120));
        assert_eq!(series.min_location.get(1), Some(40));
        assert_eq!(series.integral.get(1), Some(-1200));
        assert_eq!(series.dndt.get(1), Some(-3));
        assert_eq!(series.drift_time.get(1), Some(15));

        assert_eq!(accumulator.event_min().get(0), Some(-90));
        assert_eq!(accumulator.event_min().get(1), Some(-120));
        assert_eq!(accumulator.wire(2).unwrap().min_value.get(1), None);
    }

    #[test]
    fn saturated_wire_adds_nothing() {
        let mut accumulator = EventAccumulator::new(3, vec![]);
        accumulator.accumulate(EventFeatures {
            index: 0,
            wires: vec![wire(2, -2100, SATURATED)],
        });
        let series = accumulator.wire(2).unwrap();
        assert_eq!(series.integral.get(0), None);
        assert_eq!(series.dndt.get(0), None);
        assert_eq!(series.min_value.get(0), None);
        assert_eq!(accumulator.event_min().get(0), None);
        assert_eq!(accumulator.summary().tallies[2].channel_out_of_range, 1);
    }

    #[test]
    fn unclosed_spike_has_no_integral() {
        let mut features = wire(1, -200, WireVerdict::Valid);
        features.roi.spike_over = false;
        features.integral = None;
        let mut accumulator = EventAccumulator::new(2, vec![]);
        accumulator.accumulate(EventFeatures {
            index: 0,
            wires: vec![features],
        });
        let series = accumulator.wire(1).unwrap();
        assert_eq!(series.min_value.get(0), Some(-200));
        assert_eq!(series.integral.get(0), None);
    }

    #[test]
    fn coincidences_and_summary() {
        let mut accumulator = EventAccumulator::new(5, vec![2, 3, 4]);
        accumulator.accumulate(EventFeatures {
            index: 0,
            wires: vec![
                wire(2, -90, WireVerdict::Valid),
                wire(3, -90, WireVerdict::Valid),
                wire(4, -90, WireVerdict::Valid),
            ],
        });
        accumulator.accumulate(EventFeatures {
            index: 1,
            wires: vec![
                wire(2, -90, WireVerdict::Valid),
                wire(3, -90, NO_EVENT),
                wire(4, -90, WireVerdict::Valid),
            ],
        });
        accumulator.accumulate(EventFeatures {
            index: 2,
            wires: vec![wire(2, -90, WireVerdict::Valid), wire(3, -90, SATURATED)],
        });

        assert_eq!(accumulator.coincidences(), 1);
        let summary = accumulator.summary();
        assert_eq!(summary.events, 3);
        assert_eq!(
            summary.tallies[3],
            WireTally {
                valid: 1,
                channel_out_of_range: 1,
                no_event_found: 1
            }
        );
        assert_eq!(summary.tallies[2].valid, 3);

        let text = summary.to_string();
        assert!(text.starts_with("Events processed: 3\n"));
        assert!(text.contains("Wire 3: 1 valid, 1 out of range, 1 without event"));
        assert!(text.ends_with("Coincidences on wires [2, 3, 4]: 1"));
    }

    #[test]
    fn empty_coincidence_set_never_coincides() {
        let mut accumulator = EventAccumulator::new(1, vec![]);
        accumulator.accumulate(EventFeatures {
            index: 0,
            wires: vec![wire(0, -90, WireVerdict::Valid)],
        });
        assert_eq!(accumulator.coincidences(), 0);
    }

    #[test]
    fn series_combine() {
        let mut series = Series::default();
        series.record_min(2, 5);
        series.record_min(2, -3);
        series.record_min(2, 7);
        assert_eq!(series.iter().collect::<Vec<_>>(), [None, None, Some(-3)]);

        let mut sums = Series::default();
        sums.add(0, 4i64);
        sums.add(0, -10);
        assert_eq!(sums.values().collect::<Vec<_>>(), [-6]);
    }
}
