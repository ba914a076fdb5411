use crate::{assessment::Analysis, error::Error};
use serde::Serialize;
use std::fmt;

const RULE: &str = "-----------------------------------";

/// Analysis of one input file, as handed to the output writer.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub(crate) struct FileReport {
    pub(crate) file: String,
    pub(crate) landmarks: usize,
    pub(crate) diagnostic: String,
    /// `None` when the pose source found nobody in the image.
    pub(crate) analysis: Option<Analysis>,
}

impl FileReport {
    pub(crate) fn to_json(&self) -> Result<String, Error> {
        serde_json::to_string(self).map_err(Error::SerializeAnalysis)
    }

    /// The pose source's diagnostic followed by the side resolver's, in order.
    pub(crate) fn feedback(&self) -> String {
        let side_diagnostics = self
            .analysis
            .iter()
            .flat_map(|analysis| analysis.side_diagnostics.iter());
        std::iter::once(&self.diagnostic)
            .filter(|diagnostic| !diagnostic.is_empty())
            .chain(side_diagnostics)
            .map(String::as_str)
            .collect::<Vec<_>>()
            .join("; ")
    }
}

/// Plain-text summary of one file.
impl fmt::Display for FileReport {
    fn fmt(&self, out: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(out, "{}", RULE)?;
        writeln!(out, "File Name: {}", self.file)?;

        let analysis = match &self.analysis {
            Some(analysis) => analysis,
            None => {
                writeln!(out, "No landmarks found.")?;
                return writeln!(out, "{}", RULE);
            }
        };

        writeln!(out, "Detected Landmarks: {}", self.landmarks)?;
        writeln!(out, "Chosen Side: {}", analysis.side)?;
        let feedback = self.feedback();
        if !feedback.is_empty() {
            writeln!(out, "Feedback: {}", feedback)?;
        }
        writeln!(out)?;

        writeln!(out, "Angles:")?;
        for (name, value) in analysis.angles.iter() {
            match value {
                Some(value) => writeln!(out, "  {}: {:.1}°", name, value)?,
                None => writeln!(out, "  {}: N/A", name)?,
            }
        }
        writeln!(out)?;

        writeln!(out, "Assessment Results:")?;
        for evaluation in &analysis.report.evaluations {
            writeln!(out, "  - {}", evaluation.message)?;
            if evaluation.ok == Some(false) {
                for remedy in &evaluation.remedies {
                    writeln!(out, "      * {}", remedy)?;
                }
            }
        }
        writeln!(out)?;
        writeln!(out, "{}", analysis.report.summary())?;
        writeln!(out, "{}", RULE)
    }
}
