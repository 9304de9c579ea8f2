use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;

use time::{OffsetDateTime, format_description};

use crate::encoding::ControllerDecision;
use crate::state::Frame;

use super::records::{DecisionRecord, FrameRecord, LogRecord, write_delimited};
use super::types::Player;

/// Per-frame diagnostic log: every in-match frame with the decision sent for it.
pub struct FrameLog {
    path: PathBuf,
    writer: BufWriter<File>,
}

impl FrameLog {
    pub fn create(folder: &Path, ego: Player) -> io::Result<Self> {
        let now = OffsetDateTime::now_local().unwrap_or_else(|_| OffsetDateTime::now_utc());
        let format =
            format_description::parse_borrowed::<2>("[year][month][day]-[hour][minute][second]")
                .map_err(|err| io::Error::new(io::ErrorKind::InvalidInput, err))?;
        let date_time_str = now
            .format(&format)
            .map_err(|err| io::Error::new(io::ErrorKind::InvalidData, err))?;

        let path = folder.join(format!("{} - {}.hallog", ego, date_time_str));
        if let Some(parent) = path.parent()
            && !parent.exists()
        {
            std::fs::create_dir_all(parent)?;
        }

        let writer = BufWriter::new(File::create(&path)?);
        Ok(Self { path, writer })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn append(
        &mut self,
        frame: &Frame,
        decision: Option<&ControllerDecision>,
        latency: Duration,
    ) -> io::Result<()> {
        let record = LogRecord {
            frame: Some(FrameRecord::from(frame)),
            decision: decision.map(DecisionRecord::from),
            step_latency_us: latency.as_micros().try_into().unwrap_or(u64::MAX),
        };
        write_delimited(&mut self.writer, &record)
    }

    pub fn flush(&mut self) -> io::Result<()> {
        self.writer.flush()
    }
}
