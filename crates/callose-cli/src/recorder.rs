use callose_core::{Frame, Recorder, Scenario, StepRecord};
use indicatif::ProgressBar;
use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

pub const RESULTS_HEADER: &str = "time,mean_infection,mean_callose,drug_concentration";
pub const FRAME_HEADER: &str = "i,j,infection,callose,drug";

/// Writes one scenario's time series to `results_<scenario>.csv` and, when
/// frames are enabled, one `data_<scenario>/frame_<day>.csv` per day.
pub struct CsvRecorder {
    results: BufWriter<File>,
    frame_dir: Option<PathBuf>,
    progress: ProgressBar,
}

impl CsvRecorder {
    pub fn create(
        output_dir: &Path,
        scenario: Scenario,
        write_frames: bool,
        progress: ProgressBar,
    ) -> io::Result<Self> {
        fs::create_dir_all(output_dir)?;
        let file = File::create(output_dir.join(format!("results_{scenario}.csv")))?;
        let mut results = BufWriter::new(file);
        writeln!(results, "{RESULTS_HEADER}")?;

        let frame_dir = if write_frames {
            let dir = output_dir.join(format!("data_{scenario}"));
            fs::create_dir_all(&dir)?;
            Some(dir)
        } else {
            None
        };

        Ok(Self {
            results,
            frame_dir,
            progress,
        })
    }

    pub fn finish(mut self) -> io::Result<()> {
        self.results.flush()?;
        self.progress.finish_and_clear();
        Ok(())
    }
}

impl Recorder for CsvRecorder {
    fn record_step(&mut self, _scenario: Scenario, record: &StepRecord) -> io::Result<()> {
        writeln!(
            self.results,
            "{},{},{},{}",
            record.day, record.mean_infection, record.mean_callose, record.drug_concentration
        )?;
        self.progress.inc(1);
        Ok(())
    }

    fn record_frame(&mut self, _scenario: Scenario, frame: &Frame) -> io::Result<()> {
        let Some(dir) = &self.frame_dir else {
            return Ok(());
        };
        let file = File::create(dir.join(format!("frame_{:05}.csv", frame.day)))?;
        let mut writer = BufWriter::new(file);
        writeln!(writer, "{FRAME_HEADER}")?;
        for cell in frame.cells() {
            writeln!(
                writer,
                "{},{},{},{},{}",
                cell.i, cell.j, cell.infection, cell.callose, cell.drug
            )?;
        }
        writer.flush()
    }

    fn wants_frames(&self) -> bool {
        self.frame_dir.is_some()
    }
}
