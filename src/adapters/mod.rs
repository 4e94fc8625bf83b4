pub mod checkpoint;
pub mod filesystem;
pub mod output;
pub mod progress;
pub mod review;

pub use checkpoint::{CheckpointAdapter, ResultsFiles};
pub use filesystem::{traversal_for, StdTraversal, WalkTraversal};
pub use output::{ConsoleOutputAdapter, CsvOutputAdapter, JsonOutputAdapter, TreeOutputAdapter};
pub use progress::ProgressBarAdapter;
pub use review::InteractiveReviewAdapter;
