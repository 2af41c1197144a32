/// Crawl lifecycle definitions
///
/// A crawl moves `Idle -> Running` and then ends through exactly one of
/// three paths: `Stopping -> Stopped` (user stop), `Erroring -> Stopped`
/// (crawl-level fault) or `Draining -> Completed` (frontier exhausted or
/// crawl limit reached).
use std::fmt;

/// Represents the current phase of a crawl
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CrawlPhase {
    /// Created but not started
    Idle,

    /// Workers are pulling from the frontier
    Running,

    // ===== Exit paths =====
    /// Stop requested; in-flight fetches finish and are discarded
    Stopping,

    /// An unrecoverable fault escaped a worker
    Erroring,

    /// No more work; the completion signal is being emitted
    Draining,

    // ===== Terminal States =====
    /// Ended by a stop or a fault
    Stopped,

    /// Ended normally
    Completed,
}

impl CrawlPhase {
    /// Returns true if the transition is part of the lifecycle graph
    pub fn can_transition_to(&self, next: CrawlPhase) -> bool {
        matches!(
            (self, next),
            (Self::Idle, Self::Running)
                | (Self::Running, Self::Stopping)
                | (Self::Running, Self::Erroring)
                | (Self::Running, Self::Draining)
                | (Self::Stopping, Self::Stopped)
                | (Self::Erroring, Self::Stopped)
                | (Self::Draining, Self::Completed)
        )
    }

    /// Returns true if no further transition is possible
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Stopped | Self::Completed)
    }

    /// Returns true while the crawl holds its slot in the registry
    pub fn is_active(&self) -> bool {
        !matches!(self, Self::Idle | Self::Stopped | Self::Completed)
    }

    /// Converts the phase to the string stored in the crawls table
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Running => "running",
            Self::Stopping => "stopping",
            Self::Erroring => "erroring",
            Self::Draining => "draining",
            Self::Stopped => "stopped",
            Self::Completed => "completed",
        }
    }

    /// Parses a phase from its database string
    ///
    /// Returns None if the string doesn't match any known phase.
    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "idle" => Some(Self::Idle),
            "running" => Some(Self::Running),
            "stopping" => Some(Self::Stopping),
            "erroring" => Some(Self::Erroring),
            "draining" => Some(Self::Draining),
            "stopped" => Some(Self::Stopped),
            "completed" => Some(Self::Completed),
            _ => None,
        }
    }

    /// Returns all phases
    pub fn all_phases() -> Vec<Self> {
        vec![
            Self::Idle,
            Self::Running,
            Self::Stopping,
            Self::Erroring,
            Self::Draining,
            Self::Stopped,
            Self::Completed,
        ]
    }
}

impl fmt::Display for CrawlPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_string())
    }
}
