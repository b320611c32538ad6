use serde::{Deserialize, Serialize};

use cadence_core::{CampaignId, EventId};

/// A named unit of pipeline work. Each variant is an independently
/// invocable stage; adding a variant is a compile-checked extension of
/// every `match` that dispatches on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Job {
    Schedule,
    Generate,
    Publish,
}

impl std::fmt::Display for Job {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Job::Schedule => "schedule",
            Job::Generate => "generate",
            Job::Publish => "publish",
        };
        write!(f, "{s}")
    }
}

impl std::str::FromStr for Job {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "schedule" => Ok(Job::Schedule),
            "generate" => Ok(Job::Generate),
            "publish" => Ok(Job::Publish),
            other => Err(format!("unknown job: {other}")),
        }
    }
}

/// Lifecycle command for the job manager.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Operation {
    Start,
    Stop,
    Restart,
}

impl std::fmt::Display for Operation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Operation::Start => "start",
            Operation::Stop => "stop",
            Operation::Restart => "restart",
        };
        write!(f, "{s}")
    }
}

impl std::str::FromStr for Operation {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "start" => Ok(Operation::Start),
            "stop" => Ok(Operation::Stop),
            "restart" => Ok(Operation::Restart),
            other => Err(format!("unknown operation: {other}")),
        }
    }
}

/// Lifecycle state of the job manager.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ManagerState {
    /// No loop task exists. Initial state.
    Stopped,
    /// The background loop is live.
    Running,
    /// Shutdown signalled, waiting for the loop (and any in-flight tick)
    /// to finish. Transient.
    Stopping,
}

impl std::fmt::Display for ManagerState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ManagerState::Stopped => "stopped",
            ManagerState::Running => "running",
            ManagerState::Stopping => "stopping",
        };
        write!(f, "{s}")
    }
}

/// Snapshot returned by manager operations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManagerStatus {
    pub state: ManagerState,
    /// Full Schedule→Generate→Publish cycles completed since construction.
    pub completed_ticks: u64,
}

/// Per-item payload inside a stage's `Response` batch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageItem {
    pub campaign_id: CampaignId,
    pub event_id: EventId,
    /// Set for publish outcomes — one item per (event, channel) pair.
    pub channel: Option<String>,
    /// What happened to this item.
    pub detail: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn job_and_operation_round_trip_their_tokens() {
        for job in [Job::Schedule, Job::Generate, Job::Publish] {
            assert_eq!(job.to_string().parse::<Job>().unwrap(), job);
        }
        for op in [Operation::Start, Operation::Stop, Operation::Restart] {
            assert_eq!(op.to_string().parse::<Operation>().unwrap(), op);
        }
        assert!("teardown".parse::<Operation>().is_err());
        assert!("deploy".parse::<Job>().is_err());
    }
}
