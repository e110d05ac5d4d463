//! One judging session: a submission evaluated against a problem

use std::time::Duration;

/// Source code together with the language it is written in
#[derive(Debug, Clone, PartialEq)]
pub struct Submission {
    pub language: String,
    pub source: String,
}

/// Custom checker declared by a problem
#[derive(Debug, Clone, PartialEq)]
pub struct CheckerSource {
    pub language: String,
    pub source: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TestCase {
    pub input: String,
    pub expected_output: String,
}

/// Problem definition with limits already normalised to engine units
#[derive(Debug, Clone, PartialEq)]
pub struct Problem {
    pub time_limit: Duration,
    /// Memory limit in bytes
    pub memory_limit: u64,
    pub test_cases: Vec<TestCase>,
    pub checker: Option<CheckerSource>,
}

impl Problem {
    pub fn len(&self) -> usize {
        self.test_cases.len()
    }

    pub fn is_empty(&self) -> bool {
        self.test_cases.is_empty()
    }
}

/// A single judging job. Exactly one exists per process lifetime.
#[derive(Debug, Clone, PartialEq)]
pub struct Job {
    pub id: String,
    pub submission: Submission,
    pub problem: Problem,
}

impl Job {
    pub fn new(id: Option<String>, submission: Submission, problem: Problem) -> Self {
        let id = id
            .filter(|id| !id.is_empty())
            .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
        Self {
            id,
            submission,
            problem,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn problem() -> Problem {
        Problem {
            time_limit: Duration::from_secs(1),
            memory_limit: 32 << 20,
            test_cases: vec![],
            checker: None,
        }
    }

    fn submission() -> Submission {
        Submission {
            language: "cpp".into(),
            source: "int main() {}".into(),
        }
    }

    #[test]
    fn test_caller_supplied_id_is_kept() {
        let job = Job::new(Some("job-42".into()), submission(), problem());
        assert_eq!(job.id, "job-42");
    }

    #[test]
    fn test_missing_id_is_generated() {
        let a = Job::new(None, submission(), problem());
        let b = Job::new(Some(String::new()), submission(), problem());
        assert!(uuid::Uuid::parse_str(&a.id).is_ok());
        assert!(uuid::Uuid::parse_str(&b.id).is_ok());
        assert_ne!(a.id, b.id);
    }
}
