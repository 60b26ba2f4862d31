pub mod exporter;
pub mod fine_tune;

pub use exporter::{ExportSummary, TrainingFileExporter};
pub use fine_tune::FineTuneService;
