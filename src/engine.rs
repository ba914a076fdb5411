use crate::{
    assessment::{analyze, SideChoice},
    error::Error,
    report::FileReport,
    rules::SharedConfig,
    source::{Detection, PoseSource},
};
use std::{
    path::{Path, PathBuf},
    sync::{
        atomic::{AtomicBool, Ordering},
        mpsc::channel,
    },
    time::{Duration, Instant},
};
use tracing::{debug, info};

/// At least one worker, and never more than there are files.
fn worker_count(jobs: usize, files: usize) -> usize {
    jobs.min(files).max(1)
}

pub(crate) struct Engine<S> {
    source: S,
    config: SharedConfig,
    side: SideChoice,
}

#[derive(Debug, Copy, Clone, Default)]
pub(crate) struct Timing {
    pub(crate) detection: Duration,
    pub(crate) analysis: Duration,
}

impl<S> Engine<S>
where
    S: PoseSource + Sync,
{
    pub(crate) fn new(source: S, config: SharedConfig, side: SideChoice) -> Self {
        Self {
            source,
            config,
            side,
        }
    }

    pub(crate) fn analyze_file(&self, path: &Path) -> Result<(FileReport, Timing), Error> {
        let mut timing = Timing::default();
        let file = path.display().to_string();

        let start_detection = Instant::now();
        let detection = self.source.detect(path)?;
        timing.detection += start_detection.elapsed();

        let (keypoints, diagnostic) = match detection {
            Detection::NoDetection => {
                info!(message = "no landmarks detected", file = %file);
                return Ok((
                    FileReport {
                        file,
                        landmarks: 0,
                        diagnostic: String::new(),
                        analysis: None,
                    },
                    timing,
                ));
            }
            Detection::Keypoints {
                keypoints,
                diagnostic,
            } => (keypoints, diagnostic),
        };

        // one snapshot per image so every angle is judged against the same table
        let table = self.config.snapshot()?;

        let start_analysis = Instant::now();
        let analysis = analyze(&keypoints, self.side, &table);
        timing.analysis += start_analysis.elapsed();

        for message in &analysis.side_diagnostics {
            debug!(message = %message, file = %file);
        }
        info!(
            message = "analyzed posture",
            file = %file,
            side = %analysis.side,
            score = analysis.report.score,
            out_of_range = analysis.report.out_of_range(),
            rating = %analysis.report.rating
        );

        Ok((
            FileReport {
                file,
                landmarks: keypoints.len(),
                diagnostic,
                analysis: Some(analysis),
            },
            timing,
        ))
    }

    /// Analyze `files` on `jobs` worker threads. Results come back in input
    /// order. Clearing `running` stops workers from picking up more files;
    /// files that were never started are left out of the result.
    pub(crate) fn run<F>(
        &self,
        files: &[PathBuf],
        jobs: usize,
        running: &AtomicBool,
        mut on_done: F,
    ) -> Result<Vec<(PathBuf, Result<FileReport, Error>)>, Error>
    where
        F: FnMut(&Path),
    {
        let (jobs_tx, jobs_rx) = crossbeam::channel::unbounded();
        for job in files.iter().enumerate() {
            if jobs_tx.send(job).is_err() {
                break;
            }
        }
        drop(jobs_tx);

        let (results_tx, results_rx) = channel();

        let mut results = crossbeam::thread::scope(|scope| {
            for _ in 0..worker_count(jobs, files.len()) {
                let jobs_rx = jobs_rx.clone();
                let results_tx = results_tx.clone();
                scope.spawn(move |_| {
                    while running.load(Ordering::SeqCst) {
                        let (index, path) = match jobs_rx.recv() {
                            Ok(job) => job,
                            Err(_) => break,
                        };
                        let result = self.analyze_file(path);
                        if results_tx.send((index, result)).is_err() {
                            break;
                        }
                    }
                });
            }
            drop(results_tx);

            let mut timing = Timing::default();
            let mut results = Vec::with_capacity(files.len());
            for (index, result) in results_rx.iter() {
                on_done(&files[index]);
                let result = result.map(|(report, file_timing)| {
                    timing.detection += file_timing.detection;
                    timing.analysis += file_timing.analysis;
                    report
                });
                results.push((index, result));
            }
            debug!(
                message = "batch finished",
                files = results.len(),
                detection = ?timing.detection,
                analysis = ?timing.analysis
            );
            results
        })
        .map_err(|_| Error::WorkerPanicked)?;

        results.sort_by_key(|&(index, _)| index);
        Ok(results
            .into_iter()
            .map(|(index, result)| (files[index].clone(), result))
            .collect())
    }
}
