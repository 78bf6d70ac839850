use std::time::Duration;

/// Outcomes that stop the planner before a conflict-free solution is found.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PlannerError {
    /// Malformed grid or agent set, rejected before any search starts.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// An agent cannot reach its goal even without constraints.
    #[error("no path exists for agent {agent}")]
    NoPathExists { agent: usize },

    /// Every branch of the constraint tree was pruned.
    #[error("no conflict-free solution exists")]
    NoSolution,

    /// Expansion budget or deadline exceeded. Says nothing about feasibility.
    #[error("search stopped after {expanded} high-level expansions ({elapsed:?})")]
    Timeout { expanded: usize, elapsed: Duration },
}

impl PlannerError {
    pub(crate) fn invalid(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    /// Short code for log lines and result files.
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidInput(_) => "INVALID_INPUT",
            Self::NoPathExists { .. } => "NO_PATH_EXISTS",
            Self::NoSolution => "NO_SOLUTION",
            Self::Timeout { .. } => "TIMEOUT",
        }
    }
}
