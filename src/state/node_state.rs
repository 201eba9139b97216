/// Lifecycle of a crawl node
///
/// Every node in the crawl tree (competition, season, round, match, and the
/// per-match detail extractions) moves through these states.
use crate::HarvestError;
use std::fmt;

/// Represents the current state of a node in the crawl tree
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeState {
    // ===== Active States =====
    /// Node is known but no work has started
    Pending,

    /// Holding a fetch slot, waiting on the page
    Fetching,

    /// Mapping page content to records
    Extracting,

    /// Writing the node's own records
    Persisting,

    /// Registering child tasks
    Spawning,

    /// All children registered, joining them
    AwaitingChildren,

    // ===== Terminal States =====
    /// Node and all its children reached a terminal state
    Done,

    /// Fetch, extraction or persistence failed; subtree not produced
    Failed,
}

impl NodeState {
    /// Returns true if no further transitions are possible
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done | Self::Failed)
    }

    /// Returns true if the given transition is legal
    ///
    /// Nodes may skip forward (a detail extraction has no fetch or children,
    /// a node with nothing to discover skips spawning) but never move back.
    /// `Failed` is only reachable from Fetching, Extracting and Persisting.
    pub fn can_transition_to(&self, next: NodeState) -> bool {
        if self.is_terminal() {
            return false;
        }

        match next {
            Self::Failed => matches!(self, Self::Fetching | Self::Extracting | Self::Persisting),
            Self::Pending => false,
            _ => next.rank() > self.rank(),
        }
    }

    fn rank(&self) -> u8 {
        match self {
            Self::Pending => 0,
            Self::Fetching => 1,
            Self::Extracting => 2,
            Self::Persisting => 3,
            Self::Spawning => 4,
            Self::AwaitingChildren => 5,
            Self::Done => 6,
            Self::Failed => 7,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Fetching => "fetching",
            Self::Extracting => "extracting",
            Self::Persisting => "persisting",
            Self::Spawning => "spawning",
            Self::AwaitingChildren => "awaiting_children",
            Self::Done => "done",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for NodeState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Level of the crawl hierarchy a node belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    Competition,
    Season,
    Round,
    Match,
    Stats,
    PlayByPlay,
    TeamList,
}

/// State holder for a single node, logging each transition
#[derive(Debug)]
pub struct Node {
    kind: NodeKind,
    label: String,
    state: NodeState,
}

impl Node {
    pub fn new(kind: NodeKind, label: impl Into<String>) -> Self {
        Self {
            kind,
            label: label.into(),
            state: NodeState::Pending,
        }
    }

    pub fn state(&self) -> NodeState {
        self.state
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    /// Moves the node to `next`, rejecting illegal transitions
    pub fn advance(&mut self, next: NodeState) -> Result<(), HarvestError> {
        if !self.state.can_transition_to(next) {
            return Err(HarvestError::InvalidTransition {
                from: self.state,
                to: next,
            });
        }

        tracing::trace!(
            "{:?} {}: {} -> {}",
            self.kind,
            self.label,
            self.state,
            next
        );
        self.state = next;
        Ok(())
    }

    /// Marks the node failed, logging the cause
    ///
    /// Only legal from Fetching, Extracting or Persisting. From any other
    /// state the node is left as it is and the error is returned unchanged.
    pub fn fail(&mut self, error: HarvestError) -> HarvestError {
        if self.state.can_transition_to(NodeState::Failed) {
            tracing::warn!(
                "{:?} {} failed while {}: {}",
                self.kind,
                self.label,
                self.state,
                error
            );
            self.state = NodeState::Failed;
        }
        error
    }
}
