mod cache;
mod cumulative;
mod file_manager;

pub use cache::CacheSummary;
pub use cache::NoCache;
pub use cache::PlaylistCache;
pub use cache::ReadThroughCache;
pub use cumulative::CumulativeManager;
pub use file_manager::FileManager;
