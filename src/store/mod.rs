pub mod ops;
pub mod storage;
pub mod types;

pub use ops::{RatingUpdate, RecomputeSummary, RATING_RANGE};
pub use storage::{get_database_path, load_database, save_database};
pub use types::{Database, Settings, DATABASE_VERSION};
