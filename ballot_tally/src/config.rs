// ********* Input data structures ***********

use std::error::Error;
use std::fmt::Display;
use std::str::FromStr;

/// The offices being elected. The set is fixed: every ballot must carry
/// exactly one choice for each of them.
#[derive(Eq, PartialEq, Debug, Clone, Copy, Hash, Ord, PartialOrd)]
pub enum Position {
    President,
    VicePresident,
    Secretary,
    Treasurer,
}

impl Position {
    /// All the positions, in the order in which they are displayed and stored.
    pub const ALL: [Position; 4] = [
        Position::President,
        Position::VicePresident,
        Position::Secretary,
        Position::Treasurer,
    ];

    /// The label used in the registry files and in the tally.
    pub fn name(&self) -> &'static str {
        match self {
            Position::President => "President",
            Position::VicePresident => "Vice-President",
            Position::Secretary => "Secretary",
            Position::Treasurer => "Treasurer",
        }
    }
}

impl Display for Position {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for Position {
    type Err = BallotErrors;

    // Exact match only: the labels are also the keys of the tally file.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Position::ALL
            .iter()
            .find(|p| p.name() == s)
            .copied()
            .ok_or_else(|| BallotErrors::UnknownPosition(s.to_string()))
    }
}

#[derive(Eq, PartialEq, Debug, Clone, Hash)]
pub struct Candidate {
    pub name: String,
    pub position: Position,
}

#[derive(Eq, PartialEq, Debug, Clone, Hash)]
pub struct Voter {
    pub name: String,
    /// A non-empty string of ASCII digits.
    pub voter_id: String,
}

/// The lifecycle of a single voter. `Voted` is terminal.
#[derive(Eq, PartialEq, Debug, Clone, Copy)]
pub enum VoterStatus {
    NotVoted,
    Voted,
}

// ******** Output data structures *********

#[derive(Eq, PartialEq, Debug, Clone)]
pub struct CandidateCount {
    pub name: String,
    pub votes: u64,
}

/// Counts for one position, sorted by candidate name.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct PositionResult {
    pub position: Position,
    /// Number of ballots recorded for this position.
    pub ballots: u64,
    pub counts: Vec<CandidateCount>,
}

impl PositionResult {
    pub fn votes_for(&self, name: &str) -> Option<u64> {
        self.counts.iter().find(|c| c.name == name).map(|c| c.votes)
    }
}

#[derive(Eq, PartialEq, Debug, Clone)]
pub struct ElectionResults {
    pub positions: Vec<PositionResult>,
}

impl ElectionResults {
    pub fn position(&self, position: Position) -> Option<&PositionResult> {
        self.positions.iter().find(|pr| pr.position == position)
    }
}

/// Errors raised by a user action on the registries or on the ballot box.
///
/// None of them leave the state modified.
#[derive(Eq, PartialEq, Debug, Clone)]
pub enum BallotErrors {
    /// A required input was absent or blank.
    MissingField(&'static str),
    /// Voter IDs are made of digits only.
    InvalidVoterId(String),
    DuplicateId(String),
    /// The target of a removal does not exist.
    NotFound { kind: &'static str, key: String },
    AlreadyVoted(String),
    /// The positions for which no selection was made.
    IncompleteBallot(Vec<Position>),
    UnknownCandidate { position: Position, name: String },
    UnknownPosition(String),
    InvalidCredentials,
}

impl Error for BallotErrors {}

impl Display for BallotErrors {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BallotErrors::MissingField(field) => write!(f, "{} is a required field", field),
            BallotErrors::InvalidVoterId(id) => {
                write!(f, "voter ID {:?} must contain digits only", id)
            }
            BallotErrors::DuplicateId(id) => write!(f, "voter ID {} must be unique", id),
            BallotErrors::NotFound { kind, key } => write!(f, "{} {} not found", kind, key),
            BallotErrors::AlreadyVoted(id) => write!(f, "voter {} has already voted", id),
            BallotErrors::IncompleteBallot(missing) => {
                let names: Vec<&str> = missing.iter().map(|p| p.name()).collect();
                write!(
                    f,
                    "please select 1 candidate from each category (missing: {})",
                    names.join(", ")
                )
            }
            BallotErrors::UnknownCandidate { position, name } => {
                write!(f, "{} is not a candidate for {}", name, position)
            }
            BallotErrors::UnknownPosition(p) => write!(f, "unknown position {:?}", p),
            BallotErrors::InvalidCredentials => write!(f, "invalid credentials"),
        }
    }
}

// ********* Configuration **********

#[derive(Eq, PartialEq, Debug, Clone)]
pub struct BallotRules {
    /// Reject selections that are not registered for their position.
    /// Only applies when a candidate registry is provided.
    pub require_registered_candidates: bool,
    /// Report registered candidates that received no vote with a zero count.
    pub include_unvoted_candidates: bool,
}

impl BallotRules {
    pub const DEFAULT_RULES: BallotRules = BallotRules {
        require_registered_candidates: true,
        include_unvoted_candidates: false,
    };
}

impl Default for BallotRules {
    fn default() -> Self {
        BallotRules::DEFAULT_RULES
    }
}
