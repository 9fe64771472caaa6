use std::{collections::HashMap, process::ExitCode, sync::Mutex};

use anyhow::{Context, Result};
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use log::{Log, Metadata, Record};
use photomosaic::{ProgressEvent, ProgressObserver};

mod cli;

fn main() -> ExitCode {
    let bars = MultiProgress::new();
    init_logging(&bars);

    match run(bars) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::from(2),
        Err(e) => {
            eprintln!("error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

/// Returns whether every job succeeded.
fn run(bars: MultiProgress) -> Result<bool> {
    let config = cli::config_from(&cli::command().get_matches());
    let observer = BarObserver::new(bars);
    let report = photomosaic::run(&config, &observer)
        .with_context(|| format!("cannot build mosaics from dataset '{}'", config.dataset))?;

    for (job, err) in report.failures() {
        eprintln!("failed: {}: {err}", job.input.display());
    }
    println!(
        "{} succeeded, {} failed",
        report.succeeded(),
        report.failed()
    );
    Ok(report.is_success())
}

fn init_logging(bars: &MultiProgress) {
    let inner =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).build();
    let max_level = inner.filter();
    let logger = SuspendingLogger {
        inner,
        bars: bars.clone(),
    };
    if log::set_boxed_logger(Box::new(logger)).is_ok() {
        log::set_max_level(max_level);
    }
}

/// Hides the progress bars while a log line is written so they are redrawn below it.
struct SuspendingLogger {
    inner: env_logger::Logger,
    bars: MultiProgress,
}

impl Log for SuspendingLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        self.inner.enabled(metadata)
    }

    fn log(&self, record: &Record) {
        if self.inner.matches(record) {
            self.bars.suspend(|| self.inner.log(record));
        }
    }

    fn flush(&self) {
        self.inner.flush();
    }
}

/// Draws one bar while the dataset is indexed and one per running job.
struct BarObserver {
    bars: MultiProgress,
    indexing: Mutex<Option<ProgressBar>>,
    jobs: Mutex<HashMap<usize, ProgressBar>>,
}

impl BarObserver {
    fn new(bars: MultiProgress) -> Self {
        BarObserver {
            bars,
            indexing: Mutex::default(),
            jobs: Mutex::default(),
        }
    }

    fn bar(&self, len: u64, prefix: String) -> ProgressBar {
        let style = ProgressStyle::with_template(
            "{prefix:>12} [{bar:30}] {pos}/{len} ({percent}%, eta {eta})",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("#>-");
        self.bars
            .add(ProgressBar::new(len))
            .with_style(style)
            .with_prefix(prefix)
    }
}

impl ProgressObserver for BarObserver {
    fn on_event(&self, event: ProgressEvent) {
        const POISONED: &str = "progress state poisoned";
        match event {
            ProgressEvent::IndexingStarted { total } => {
                let bar = self.bar(total as u64, "indexing".to_string());
                *self.indexing.lock().expect(POISONED) = Some(bar);
            }
            ProgressEvent::ImageIndexed { .. } => {
                if let Some(bar) = self.indexing.lock().expect(POISONED).as_ref() {
                    bar.inc(1);
                }
            }
            ProgressEvent::IndexReady { .. } => {
                if let Some(bar) = self.indexing.lock().expect(POISONED).take() {
                    bar.finish_and_clear();
                }
            }
            ProgressEvent::JobStarted {
                job, input, blocks, ..
            } => {
                let name = input
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_default();
                let bar = self.bar(blocks, name);
                self.jobs.lock().expect(POISONED).insert(job, bar);
            }
            ProgressEvent::BlockComposed { job } => {
                if let Some(bar) = self.jobs.lock().expect(POISONED).get(&job) {
                    bar.inc(1);
                }
            }
            ProgressEvent::JobFinished { job } | ProgressEvent::JobFailed { job, .. } => {
                if let Some(bar) = self.jobs.lock().expect(POISONED).remove(&job) {
                    bar.finish_and_clear();
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use indicatif::ProgressDrawTarget;
    use log::{Level, LevelFilter};

    use super::*;

    fn hidden_bars() -> MultiProgress {
        MultiProgress::with_draw_target(ProgressDrawTarget::hidden())
    }

    #[test]
    fn logger_keeps_the_env_filter() {
        let inner = env_logger::Builder::new()
            .filter_level(LevelFilter::Warn)
            .is_test(true)
            .build();
        let logger = SuspendingLogger {
            inner,
            bars: hidden_bars(),
        };
        let info = Metadata::builder().level(Level::Info).build();
        let warn = Metadata::builder().level(Level::Warn).build();
        assert!(!logger.enabled(&info));
        assert!(logger.enabled(&warn));

        let bar = logger.bars.add(ProgressBar::new(3));
        bar.inc(1);
        logger.log(
            &Record::builder()
                .args(format_args!("written between bar redraws"))
                .level(Level::Warn)
                .build(),
        );
        logger.flush();
        assert_eq!(bar.position(), 1);
    }

    #[test]
    fn job_bars_come_and_go_with_their_job() {
        let observer = BarObserver::new(hidden_bars());
        observer.on_event(ProgressEvent::JobStarted {
            job: 4,
            input: "inputs/sky.png".into(),
            output: "outputs/abcde.jpg".into(),
            blocks: 6,
        });
        observer.on_event(ProgressEvent::BlockComposed { job: 4 });
        observer.on_event(ProgressEvent::BlockComposed { job: 4 });
        {
            let jobs = observer.jobs.lock().unwrap();
            assert_eq!(jobs[&4].position(), 2);
            assert_eq!(jobs[&4].prefix(), "sky.png");
        }
        observer.on_event(ProgressEvent::JobFailed {
            job: 4,
            reason: "disk full".to_string(),
        });
        assert!(observer.jobs.lock().unwrap().is_empty());
    }
}
