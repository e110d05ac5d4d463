//! Domain model shared by the judging engine and the session layer

pub mod job;
pub mod report;
pub mod verdict;

pub use job::{CheckerSource, Job, Problem, Submission, TestCase};
pub use report::Report;
pub use verdict::Verdict;
