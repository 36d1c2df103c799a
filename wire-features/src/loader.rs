//! Reads events from a waveform text file.
//!
//! Each line holds one time step: one comma separated integer per ADC channel.
//! An event is `num_time_steps` consecutive rows, and events follow each other
//! with no separator. Blank lines are ignored.
use crate::{
    config::AnalysisConfig,
    error::{LoadError, LoadResult, RecordFault},
    frame::WaveformFrame,
};
use csv::{StringRecord, StringRecordsIntoIter};
use dct_common::{EventIndex, Voltage};
use std::{
    fs::File,
    io::{BufReader, Read},
    path::Path,
};
use tracing::{debug, trace};

/// Iterates over the events of a waveform file, yielding one [WaveformFrame] per event.
///
/// Reading ends cleanly when the input runs out on an event boundary. Any
/// other problem is yielded once as an error, after which the iterator is
/// exhausted.
pub struct EventReader<R> {
    records: StringRecordsIntoIter<R>,
    offsets: Vec<Voltage>,
    num_time_steps: usize,
    event: EventIndex,
    line: usize,
    finished: bool,
}

impl<R: Read> EventReader<R> {
    pub fn new(reader: R, config: &AnalysisConfig) -> Self {
        let records = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(reader)
            .into_records();
        Self {
            records,
            offsets: (0..config.num_adcs)
                .map(|channel| config.adc_offset(channel))
                .collect(),
            num_time_steps: config.num_time_steps,
            event: 0,
            line: 0,
            finished: false,
        }
    }

    /// Discards the given number of rows, e.g. to skip a known-corrupt leading event.
    /// Skipping past the end of the input is not an error, the reader is just empty.
    pub fn skip_rows(mut self, rows: usize) -> LoadResult<Self> {
        for _ in 0..rows {
            if self.next_record()?.is_none() {
                break;
            }
        }
        debug!("Skipped to line {}", self.line);
        Ok(self)
    }

    /// Line number of the last row read.
    pub fn lines_read(&self) -> usize {
        self.line
    }

    fn next_record(&mut self) -> LoadResult<Option<StringRecord>> {
        let Some(record) = self.records.next() else {
            return Ok(None);
        };
        let record = record.map_err(|source| LoadError::Read {
            event: self.event,
            source,
        })?;
        self.line = record
            .position()
            .map_or(self.line + 1, |position| position.line() as usize);
        Ok(Some(record))
    }

    fn read_event(&mut self) -> LoadResult<Option<WaveformFrame>> {
        let mut frame = WaveformFrame::with_capacity(self.offsets.len(), self.num_time_steps);
        for row in 0..self.num_time_steps {
            let Some(record) = self.next_record()? else {
                if row == 0 {
                    return Ok(None);
                }
                return Err(self.malformed(RecordFault::Truncated {
                    rows: row,
                    expected: self.num_time_steps,
                }));
            };
            let values = parse_row(&record, &self.offsets).map_err(|fault| self.malformed(fault))?;
            frame.push_time_step(values);
        }
        Ok(Some(frame))
    }

    fn malformed(&self, fault: RecordFault) -> LoadError {
        LoadError::MalformedRecord {
            event: self.event,
            line: self.line,
            fault,
        }
    }
}

impl<R: Read> Iterator for EventReader<R> {
    type Item = LoadResult<WaveformFrame>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }
        match self.read_event() {
            Ok(Some(frame)) => {
                trace!("Read event {}", self.event);
                self.event += 1;
                Some(Ok(frame))
            }
            Ok(None) => {
                debug!("End of input after {} events", self.event);
                self.finished = true;
                None
            }
            Err(e) => {
                self.finished = true;
                Some(Err(e))
            }
        }
    }
}

pub fn open_waveform_file(
    path: &Path,
    config: &AnalysisConfig,
) -> LoadResult<EventReader<BufReader<File>>> {
    let file = File::open(path).map_err(|source| LoadError::IO { event: 0, source })?;
    Ok(EventReader::new(BufReader::new(file), config))
}

/// Parses one time step and subtracts each channel's offset.
fn parse_row(record: &StringRecord, offsets: &[Voltage]) -> Result<Vec<Voltage>, RecordFault> {
    if record.len() != offsets.len() {
        return Err(RecordFault::TokenCount {
            expected: offsets.len(),
            found: record.len(),
        });
    }
    record
        .iter()
        .zip(offsets)
        .map(|(token, &offset)| {
            let value = token
                .parse::<Voltage>()
                .map_err(|_| RecordFault::InvalidToken {
                    token: token.to_owned(),
                })?;
            value
                .checked_sub(offset)
                .ok_or(RecordFault::OffsetOverflow { value, offset })
        })
        .collect()
}
