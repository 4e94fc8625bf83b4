pub mod directory_index;
pub mod review;

pub use directory_index::DirectoryIndex;
pub use review::ReviewSession;
