use std::{
    collections::HashSet,
    fs,
    path::{Path, PathBuf},
};

use log::{info, warn};
use rand::{thread_rng, Rng};
use rayon::prelude::*;

use crate::{
    dataset::DatasetIndex,
    error::{MosaicError, Result},
    imageio::{display_name, image_files},
    matcher::NearestMatcher,
    mosaic::{MosaicComposer, MosaicJob, Resample},
    progress::{ProgressEvent, ProgressObserver},
};

const NAME_LEN: usize = 5;

/// Hands out random `xxxxx.jpg` names that clash neither with files already in
/// the directory nor with names given out earlier.
#[derive(Debug)]
pub struct OutputNamer {
    directory: PathBuf,
    taken: HashSet<PathBuf>,
}

impl OutputNamer {
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        OutputNamer {
            directory: directory.into(),
            taken: HashSet::new(),
        }
    }

    pub fn next_path<R: Rng>(&mut self, rng: &mut R) -> PathBuf {
        loop {
            let name: String = (0..NAME_LEN)
                .map(|_| char::from(rng.gen_range(b'a'..=b'z')))
                .collect();
            let path = self.directory.join(format!("{name}.jpg"));
            if !path.exists() && self.taken.insert(path.clone()) {
                return path;
            }
        }
    }
}

#[derive(Debug)]
pub struct JobOutcome {
    pub job: MosaicJob,
    pub result: Result<()>,
}

/// Per-job results of a batch, in input file order.
#[derive(Debug, Default)]
pub struct BatchReport {
    pub outcomes: Vec<JobOutcome>,
}

impl BatchReport {
    pub fn succeeded(&self) -> usize {
        self.outcomes.iter().filter(|o| o.result.is_ok()).count()
    }

    pub fn failed(&self) -> usize {
        self.outcomes.len() - self.succeeded()
    }

    pub fn failures(&self) -> impl Iterator<Item = (&MosaicJob, &MosaicError)> {
        self.outcomes
            .iter()
            .filter_map(|o| o.result.as_ref().err().map(|e| (&o.job, e)))
    }

    pub fn is_success(&self) -> bool {
        self.failed() == 0
    }
}

/// Runs one mosaic job per input image against a shared dataset index.
pub struct BatchRunner<'a> {
    composer: MosaicComposer<'a>,
    block_size: u32,
}

impl<'a> BatchRunner<'a> {
    pub fn new(index: &'a DatasetIndex, block_size: u32, filter: Resample) -> Self {
        BatchRunner {
            composer: MosaicComposer::new(NearestMatcher::new(index), filter),
            block_size,
        }
    }

    /// Plans one job per JPEG/PNG image in `inputs`, each writing a fresh file
    /// in `outputs`.
    pub fn plan(&self, inputs: &Path, outputs: &Path) -> Result<Vec<MosaicJob>> {
        let files = image_files(inputs)?;
        fs::create_dir_all(outputs).map_err(|e| MosaicError::io(outputs, e))?;
        let mut namer = OutputNamer::new(outputs);
        let mut rng = thread_rng();
        Ok(files
            .into_iter()
            .map(|input| MosaicJob::new(input, namer.next_path(&mut rng), self.block_size))
            .collect())
    }

    /// Runs every job concurrently and waits for all of them.
    ///
    /// A failing job does not stop the others; failures are collected in the report.
    pub fn run_all(
        &self,
        inputs: &Path,
        outputs: &Path,
        observer: &dyn ProgressObserver,
    ) -> Result<BatchReport> {
        let jobs = self.plan(inputs, outputs)?;
        if jobs.is_empty() {
            warn!("no input images found in {}", inputs.display());
        }
        for job in &jobs {
            info!(
                "processing {} -> {}",
                job.input.display(),
                display_name(&job.output)
            );
        }
        let outcomes = jobs
            .into_par_iter()
            .enumerate()
            .map(|(id, job)| {
                let result = self.composer.compose(id, &job, observer);
                if let Err(e) = &result {
                    warn!("{} failed: {e}", display_name(&job.input));
                    observer.on_event(ProgressEvent::JobFailed {
                        job: id,
                        reason: e.to_string(),
                    });
                } else {
                    observer.on_event(ProgressEvent::JobFinished { job: id });
                }
                JobOutcome { job, result }
            })
            .collect();
        Ok(BatchReport { outcomes })
    }
}

#[cfg(test)]
mod tests {
    use rand::{rngs::StdRng, SeedableRng};

    use super::*;

    #[test]
    fn output_names_are_five_lowercase_letters() {
        let dir = tempfile::tempdir().unwrap();
        let mut namer = OutputNamer::new(dir.path());
        let mut rng = StdRng::seed_from_u64(7);
        let path = namer.next_path(&mut rng);
        assert_eq!(path.parent(), Some(dir.path()));
        assert_eq!(path.extension().unwrap(), "jpg");
        let stem = path.file_stem().unwrap().to_str().unwrap();
        assert_eq!(stem.len(), NAME_LEN);
        assert!(stem.chars().all(|c| c.is_ascii_lowercase()));
    }

    #[test]
    fn output_names_never_repeat_or_clobber() {
        let dir = tempfile::tempdir().unwrap();
        let mut first = OutputNamer::new(dir.path());
        let taken = first.next_path(&mut StdRng::seed_from_u64(1));
        fs::write(&taken, b"existing").unwrap();

        // the same seed would produce the same first name
        let mut namer = OutputNamer::new(dir.path());
        let mut rng = StdRng::seed_from_u64(1);
        let names: HashSet<_> = (0..200).map(|_| namer.next_path(&mut rng)).collect();
        assert_eq!(names.len(), 200);
        assert!(!names.contains(&taken));
    }

    #[test]
    fn report_counts_outcomes() {
        let ok = JobOutcome {
            job: MosaicJob::new("a.png", "x.jpg", 5),
            result: Ok(()),
        };
        let bad = JobOutcome {
            job: MosaicJob::new("b.png", "y.jpg", 5),
            result: Err(MosaicError::invalid_image("b.png", "truncated")),
        };
        let report = BatchReport {
            outcomes: vec![ok, bad],
        };
        assert_eq!((report.succeeded(), report.failed()), (1, 1));
        assert!(!report.is_success());
        let failed: Vec<_> = report.failures().map(|(job, _)| job.input.clone()).collect();
        assert_eq!(failed, [PathBuf::from("b.png")]);
        assert!(BatchReport::default().is_success());
    }
}
