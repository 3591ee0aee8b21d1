pub mod loader;
pub mod report;
pub mod runner;
pub mod session;
pub mod submitter;
pub mod validator;

pub use loader::load_records;
pub use report::BatchReport;
pub use runner::BatchRunner;
pub use session::SessionGuard;
pub use submitter::{OfflineSubmitter, Submitter};
pub use validator::{partition_valid, validate_record};
