//! Plain-text dump of per-wire features, one comma separated line per wire per event.
//!
//! Columns: event, wire, verdict, start, end, spike_over, min_value, min_location,
//! integral, dndt, then value and location of the left minimum, left maximum,
//! right minimum and right maximum. Unset values are left empty.
use crate::{
    event::{EventFeatures, WireFeatures},
    extraction::{ChannelExtrema, Extremum},
};
use std::{
    fmt::{self, Display},
    fs::File,
    io::{BufWriter, Error, Write},
    path::Path,
};

struct Unset<T>(Option<T>);

impl<T: Display> Display for Unset<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.0 {
            Some(value) => write!(f, "{value}"),
            None => Ok(()),
        }
    }
}

struct ExtremumColumns(Option<Extremum>);

impl Display for ExtremumColumns {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{},{}",
            Unset(self.0.map(|e| e.value)),
            Unset(self.0.map(|e| e.location))
        )
    }
}

struct ExtremaColumns<'a>(&'a ChannelExtrema);

impl Display for ExtremaColumns<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{},{}",
            ExtremumColumns(self.0.min),
            ExtremumColumns(self.0.max)
        )
    }
}

pub trait SavablePoint {
    fn write_to<W: Write>(&self, writer: &mut W) -> Result<(), Error>;
}

impl SavablePoint for (usize, &WireFeatures) {
    fn write_to<W: Write>(&self, writer: &mut W) -> Result<(), Error> {
        let (event, wire) = *self;
        let verdict: &str = match wire.verdict.fault() {
            None => "valid",
            Some(fault) => fault.failure_kind().into(),
        };
        writeln!(
            writer,
            "{event},{0},{verdict},{1},{2},{3},{4},{5},{6},{7},{8},{9}",
            wire.wire,
            wire.roi.start,
            wire.roi.end,
            wire.roi.spike_over,
            Unset(wire.min.map(|min| min.value)),
            Unset(wire.min.map(|min| min.location)),
            Unset(wire.integral.map(|integral| integral.integral)),
            Unset(wire.integral.map(|integral| integral.dndt)),
            ExtremaColumns(&wire.left),
            ExtremaColumns(&wire.right),
        )
    }
}

impl SavablePoint for EventFeatures {
    fn write_to<W: Write>(&self, writer: &mut W) -> Result<(), Error> {
        for wire in &self.wires {
            (self.index, wire).write_to(writer)?;
        }
        Ok(())
    }
}

impl<T: SavablePoint> SavablePoint for &T {
    fn write_to<W: Write>(&self, writer: &mut W) -> Result<(), Error> {
        T::write_to(*self, writer)
    }
}

pub trait SaveToFileFilter<I>
where
    I: Iterator,
    I::Item: SavablePoint,
{
    fn save_to_writer<W: Write>(self, writer: &mut W) -> Result<(), Error>;

    fn save_to_file(self, path: &Path) -> Result<(), Error>;
}

impl<I> SaveToFileFilter<I> for I
where
    I: Iterator,
    I::Item: SavablePoint,
{
    fn save_to_writer<W: Write>(self, writer: &mut W) -> Result<(), Error> {
        for item in self {
            item.write_to(writer)?;
        }
        Ok(())
    }

    fn save_to_file(self, path: &Path) -> Result<(), Error> {
        let mut file = BufWriter::new(File::create(path)?);
        self.save_to_writer(&mut file)?;
        file.flush()
    }
}
