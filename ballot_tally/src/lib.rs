pub mod builder;
mod config;
pub mod manual;

use log::{debug, info};

use std::collections::{BTreeMap, HashMap};

pub use crate::config::*;

/// The raw selections made by a voter, before validation.
pub type Selections = BTreeMap<Position, String>;

// ******** Registries *********

/// The candidates running for each position, in registration order.
#[derive(Eq, PartialEq, Debug, Clone, Default)]
pub struct CandidateRegistry {
    by_position: BTreeMap<Position, Vec<String>>,
}

impl CandidateRegistry {
    pub fn new() -> CandidateRegistry {
        CandidateRegistry::default()
    }

    /// Builds a registry from stored rows. Nothing is validated at this level:
    /// duplicates are kept as they were written.
    pub fn from_candidates(candidates: &[Candidate]) -> CandidateRegistry {
        let mut reg = CandidateRegistry::new();
        for c in candidates {
            reg.by_position
                .entry(c.position)
                .or_default()
                .push(c.name.clone());
        }
        reg
    }

    /// Registers a candidate. The name and the position are required.
    pub fn add(
        &mut self,
        name: &str,
        position: Option<Position>,
    ) -> Result<Candidate, BallotErrors> {
        let name = name.trim();
        if name.is_empty() {
            return Err(BallotErrors::MissingField("name"));
        }
        let position = position.ok_or(BallotErrors::MissingField("position"))?;
        self.by_position
            .entry(position)
            .or_default()
            .push(name.to_string());
        debug!("CandidateRegistry::add: {} for {}", name, position);
        Ok(Candidate {
            name: name.to_string(),
            position,
        })
    }

    /// Removes every entry with this name for this position.
    /// A failed removal leaves the registry untouched.
    pub fn remove(&mut self, name: &str, position: Position) -> Result<(), BallotErrors> {
        let name = name.trim();
        let not_found = || BallotErrors::NotFound {
            kind: "candidate",
            key: format!("{} ({})", name, position),
        };
        let names = self.by_position.get_mut(&position).ok_or_else(not_found)?;
        let before = names.len();
        names.retain(|n| n != name);
        if names.len() == before {
            return Err(not_found());
        }
        if names.is_empty() {
            self.by_position.remove(&position);
        }
        debug!("CandidateRegistry::remove: {} for {}", name, position);
        Ok(())
    }

    pub fn candidates(&self, position: Position) -> &[String] {
        self.by_position
            .get(&position)
            .map(|v| v.as_slice())
            .unwrap_or(&[])
    }

    pub fn contains(&self, position: Position, name: &str) -> bool {
        self.candidates(position).iter().any(|n| n == name)
    }

    /// All the candidates, grouped by position in display order.
    pub fn rows(&self) -> Vec<Candidate> {
        let mut res: Vec<Candidate> = Vec::new();
        for position in Position::ALL {
            for name in self.candidates(position) {
                res.push(Candidate {
                    name: name.clone(),
                    position,
                });
            }
        }
        res
    }

    pub fn len(&self) -> usize {
        self.by_position.values().map(|v| v.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// The registered voters, in registration order.
#[derive(Eq, PartialEq, Debug, Clone, Default)]
pub struct VoterRegistry {
    voters: Vec<Voter>,
}

impl VoterRegistry {
    pub fn new() -> VoterRegistry {
        VoterRegistry::default()
    }

    /// Builds a registry from stored rows. ID uniqueness is only enforced by `add`.
    pub fn from_voters(voters: Vec<Voter>) -> VoterRegistry {
        VoterRegistry { voters }
    }

    pub fn add(&mut self, name: &str, voter_id: &str) -> Result<Voter, BallotErrors> {
        let name = name.trim();
        let voter_id = voter_id.trim();
        if name.is_empty() {
            return Err(BallotErrors::MissingField("name"));
        }
        if voter_id.is_empty() {
            return Err(BallotErrors::MissingField("voter ID"));
        }
        if !is_valid_voter_id(voter_id) {
            return Err(BallotErrors::InvalidVoterId(voter_id.to_string()));
        }
        if self.contains_id(voter_id) {
            return Err(BallotErrors::DuplicateId(voter_id.to_string()));
        }
        let voter = Voter {
            name: name.to_string(),
            voter_id: voter_id.to_string(),
        };
        self.voters.push(voter.clone());
        Ok(voter)
    }

    pub fn remove(&mut self, voter_id: &str) -> Result<Voter, BallotErrors> {
        match self.voters.iter().position(|v| v.voter_id == voter_id) {
            Some(idx) => Ok(self.voters.remove(idx)),
            None => Err(BallotErrors::NotFound {
                kind: "voter",
                key: voter_id.to_string(),
            }),
        }
    }

    pub fn contains_id(&self, voter_id: &str) -> bool {
        self.voters.iter().any(|v| v.voter_id == voter_id)
    }

    pub fn find(&self, voter_id: &str) -> Option<&Voter> {
        self.voters.iter().find(|v| v.voter_id == voter_id)
    }

    /// The voter login check: the pair must match a registered row exactly.
    pub fn verify(&self, name: &str, voter_id: &str) -> Result<&Voter, BallotErrors> {
        self.voters
            .iter()
            .find(|v| v.name == name && v.voter_id == voter_id)
            .ok_or(BallotErrors::InvalidCredentials)
    }

    pub fn voters(&self) -> &[Voter] {
        &self.voters
    }

    pub fn len(&self) -> usize {
        self.voters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.voters.is_empty()
    }
}

pub fn is_valid_voter_id(voter_id: &str) -> bool {
    !voter_id.is_empty() && voter_id.chars().all(|c| c.is_ascii_digit())
}

// ******** Ballots and tally *********

/// A validated ballot: exactly one non-blank choice for every position.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct Ballot {
    choices: BTreeMap<Position, String>,
}

impl Ballot {
    /// Checks the selections of a voter.
    ///
    /// All the missing positions are reported at once. If a candidate registry is
    /// provided and the rules require it, each choice must be registered for its position.
    pub fn validate(
        selections: &Selections,
        rules: &BallotRules,
        candidates: Option<&CandidateRegistry>,
    ) -> Result<Ballot, BallotErrors> {
        let mut choices: BTreeMap<Position, String> = BTreeMap::new();
        let mut missing: Vec<Position> = Vec::new();
        for position in Position::ALL {
            match selections.get(&position).map(|s| s.trim()) {
                Some(name) if !name.is_empty() => {
                    choices.insert(position, name.to_string());
                }
                _ => missing.push(position),
            }
        }
        if !missing.is_empty() {
            return Err(BallotErrors::IncompleteBallot(missing));
        }
        if let (true, Some(reg)) = (rules.require_registered_candidates, candidates) {
            for (position, name) in choices.iter() {
                if !reg.contains(*position, name) {
                    return Err(BallotErrors::UnknownCandidate {
                        position: *position,
                        name: name.clone(),
                    });
                }
            }
        }
        Ok(Ballot { choices })
    }

    pub fn choice(&self, position: Position) -> &str {
        // Present by construction.
        self.choices
            .get(&position)
            .map(|s| s.as_str())
            .unwrap_or_default()
    }

    pub fn choices(&self) -> impl Iterator<Item = (Position, &str)> {
        self.choices.iter().map(|(p, s)| (*p, s.as_str()))
    }
}

/// The record of all the accepted ballots, per position.
///
/// Invariant: every position is present, possibly with an empty list.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct Tally {
    entries: BTreeMap<Position, Vec<String>>,
}

impl Default for Tally {
    fn default() -> Self {
        Tally::new()
    }
}

impl Tally {
    pub fn new() -> Tally {
        Tally {
            entries: Position::ALL.iter().map(|p| (*p, Vec::new())).collect(),
        }
    }

    /// Restores a tally from storage. Positions absent from the input start empty.
    pub fn from_entries(entries: BTreeMap<Position, Vec<String>>) -> Tally {
        let mut t = Tally::new();
        for (position, names) in entries {
            t.entries.insert(position, names);
        }
        t
    }

    /// Appends one entry per position.
    pub fn append(&mut self, ballot: &Ballot) {
        for (position, name) in ballot.choices() {
            self.entries
                .entry(position)
                .or_default()
                .push(name.to_string());
        }
    }

    pub fn votes(&self, position: Position) -> &[String] {
        self.entries
            .get(&position)
            .map(|v| v.as_slice())
            .unwrap_or(&[])
    }

    pub fn entries(&self) -> &BTreeMap<Position, Vec<String>> {
        &self.entries
    }

    /// The number of ballots recorded, if all the positions agree on it.
    pub fn ballots_cast(&self) -> Option<usize> {
        let mut lens = Position::ALL.iter().map(|p| self.votes(*p).len());
        let first = lens.next().unwrap_or(0);
        if lens.all(|l| l == first) {
            Some(first)
        } else {
            None
        }
    }
}

/// Accepts the ballot of a voter.
///
/// The current tally is not modified: the returned tally is the one to persist.
/// The checks run in order: the voter has not voted yet, then the ballot is complete
/// (and registered, if candidates are given).
pub fn stage_ballot(
    tally: &Tally,
    voter: &Voter,
    status: VoterStatus,
    selections: &Selections,
    rules: &BallotRules,
    candidates: Option<&CandidateRegistry>,
) -> Result<(Ballot, Tally), BallotErrors> {
    if status == VoterStatus::Voted {
        info!("stage_ballot: voter {} has already voted", voter.voter_id);
        return Err(BallotErrors::AlreadyVoted(voter.voter_id.clone()));
    }
    let ballot = Ballot::validate(selections, rules, candidates)?;
    debug!("stage_ballot: voter {}: {:?}", voter.voter_id, ballot);
    let mut next = tally.clone();
    next.append(&ballot);
    Ok((ballot, next))
}

// ******** Aggregation *********

/// Counts the votes of each candidate, per position.
///
/// Names are matched exactly. The output does not depend on the order of the
/// entries in the tally: positions follow `Position::ALL` and candidates are sorted by name.
///
/// Arguments:
/// * `tally` the recorded ballots
/// * `rules` only `include_unvoted_candidates` is used here
/// * `candidates` the registered candidates, used to report the zero counts
pub fn count_votes(
    tally: &Tally,
    rules: &BallotRules,
    candidates: Option<&CandidateRegistry>,
) -> ElectionResults {
    let mut positions: Vec<PositionResult> = Vec::new();
    for position in Position::ALL {
        let votes = tally.votes(position);
        let mut counts: HashMap<&str, u64> = HashMap::new();
        for name in votes {
            *counts.entry(name.as_str()).or_insert(0) += 1;
        }
        if let (true, Some(reg)) = (rules.include_unvoted_candidates, candidates) {
            for name in reg.candidates(position) {
                counts.entry(name.as_str()).or_insert(0);
            }
        }
        let mut sorted: Vec<CandidateCount> = counts
            .into_iter()
            .map(|(name, votes)| CandidateCount {
                name: name.to_string(),
                votes,
            })
            .collect();
        sorted.sort_by(|a, b| a.name.cmp(&b.name));
        info!(
            "count_votes: {}: {} ballots, {} candidates",
            position,
            votes.len(),
            sorted.len()
        );
        positions.push(PositionResult {
            position,
            ballots: votes.len() as u64,
            counts: sorted,
        });
    }
    ElectionResults { positions }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn init() {
        let _ = env_logger::builder().is_test(true).try_init();
    }

    fn selections(names: [&str; 4]) -> Selections {
        Position::ALL
            .iter()
            .zip(names.iter())
            .map(|(p, n)| (*p, n.to_string()))
            .collect()
    }

    fn voter(name: &str, id: &str) -> Voter {
        Voter {
            name: name.to_string(),
            voter_id: id.to_string(),
        }
    }

    #[test]
    fn position_labels() {
        assert_eq!(
            "Vice-President".parse::<Position>(),
            Ok(Position::VicePresident)
        );
        assert_eq!(
            "vice-president".parse::<Position>(),
            Err(BallotErrors::UnknownPosition("vice-president".to_string()))
        );
        for p in Position::ALL {
            assert_eq!(p.name().parse::<Position>(), Ok(p));
        }
    }

    #[test]
    fn complete_ballot_appends_one_entry_per_position() {
        init();
        let tally = Tally::new();
        let (ballot, next) = stage_ballot(
            &tally,
            &voter("Al", "1"),
            VoterStatus::NotVoted,
            &selections(["X", "Y", "Z", "W"]),
            &BallotRules::DEFAULT_RULES,
            None,
        )
        .unwrap();
        assert_eq!(ballot.choice(Position::Secretary), "Z");
        assert_eq!(next.ballots_cast(), Some(1));
        assert_eq!(next.votes(Position::President), ["X".to_string()]);
        assert_eq!(next.votes(Position::Treasurer), ["W".to_string()]);
        // The input tally is left alone.
        assert_eq!(tally, Tally::new());
    }

    #[test]
    fn second_ballot_is_rejected() {
        let tally = Tally::new();
        let res = stage_ballot(
            &tally,
            &voter("Al", "1"),
            VoterStatus::Voted,
            &selections(["X", "Y", "Z", "W"]),
            &BallotRules::DEFAULT_RULES,
            None,
        );
        assert_eq!(res, Err(BallotErrors::AlreadyVoted("1".to_string())));
    }

    #[test]
    fn already_voted_is_checked_before_completeness() {
        let res = stage_ballot(
            &Tally::new(),
            &voter("Al", "1"),
            VoterStatus::Voted,
            &Selections::new(),
            &BallotRules::DEFAULT_RULES,
            None,
        );
        assert_eq!(res, Err(BallotErrors::AlreadyVoted("1".to_string())));
    }

    #[test]
    fn incomplete_ballot_lists_missing_positions() {
        let mut sel = selections(["X", "Y", "Z", "W"]);
        sel.remove(&Position::VicePresident);
        sel.insert(Position::Treasurer, "   ".to_string());
        let res = Ballot::validate(&sel, &BallotRules::DEFAULT_RULES, None);
        assert_eq!(
            res,
            Err(BallotErrors::IncompleteBallot(vec![
                Position::VicePresident,
                Position::Treasurer
            ]))
        );
    }

    #[test]
    fn registered_candidates_are_enforced() {
        let mut reg = CandidateRegistry::new();
        reg.add("X", Some(Position::President)).unwrap();
        reg.add("Y", Some(Position::VicePresident)).unwrap();
        reg.add("Z", Some(Position::Secretary)).unwrap();
        reg.add("W", Some(Position::Treasurer)).unwrap();

        let ok = Ballot::validate(
            &selections(["X", "Y", "Z", "W"]),
            &BallotRules::DEFAULT_RULES,
            Some(&reg),
        );
        assert!(ok.is_ok());

        // X runs for President only.
        let res = Ballot::validate(
            &selections(["X", "X", "Z", "W"]),
            &BallotRules::DEFAULT_RULES,
            Some(&reg),
        );
        assert_eq!(
            res,
            Err(BallotErrors::UnknownCandidate {
                position: Position::VicePresident,
                name: "X".to_string()
            })
        );

        let lenient = BallotRules {
            require_registered_candidates: false,
            ..BallotRules::DEFAULT_RULES
        };
        assert!(Ballot::validate(&selections(["X", "X", "Z", "W"]), &lenient, Some(&reg)).is_ok());
    }

    #[test]
    fn duplicate_voter_id_is_rejected() {
        let mut reg = VoterRegistry::new();
        reg.add("Al", "1").unwrap();
        reg.add("Bea", "2").unwrap();
        assert_eq!(
            reg.add("Cy", "2"),
            Err(BallotErrors::DuplicateId("2".to_string()))
        );
        assert_eq!(reg.len(), 2);
    }

    #[test]
    fn voter_fields_are_validated() {
        let mut reg = VoterRegistry::new();
        assert_eq!(reg.add("", "1"), Err(BallotErrors::MissingField("name")));
        assert_eq!(
            reg.add("Al", " "),
            Err(BallotErrors::MissingField("voter ID"))
        );
        assert_eq!(
            reg.add("Al", "1a"),
            Err(BallotErrors::InvalidVoterId("1a".to_string()))
        );
        assert!(reg.is_empty());
    }

    #[test]
    fn voter_removal_and_login() {
        let mut reg = VoterRegistry::new();
        reg.add("Al", "1").unwrap();
        assert_eq!(reg.verify("Al", "1").map(|v| v.name.clone()), Ok("Al".to_string()));
        assert_eq!(reg.verify("Al", "2"), Err(BallotErrors::InvalidCredentials));
        assert_eq!(reg.verify("al", "1"), Err(BallotErrors::InvalidCredentials));
        assert_eq!(
            reg.remove("7"),
            Err(BallotErrors::NotFound {
                kind: "voter",
                key: "7".to_string()
            })
        );
        assert!(reg.remove("1").is_ok());
        assert!(reg.is_empty());
    }

    #[test]
    fn candidate_registry_maintenance() {
        let mut reg = CandidateRegistry::new();
        assert_eq!(
            reg.add("Ann", None),
            Err(BallotErrors::MissingField("position"))
        );
        assert_eq!(
            reg.add(" ", Some(Position::President)),
            Err(BallotErrors::MissingField("name"))
        );
        reg.add("Ann", Some(Position::Treasurer)).unwrap();
        reg.add("Bob", Some(Position::President)).unwrap();
        reg.add("Cid", Some(Position::President)).unwrap();
        let rows: Vec<(String, Position)> =
            reg.rows().into_iter().map(|c| (c.name, c.position)).collect();
        assert_eq!(
            rows,
            vec![
                ("Bob".to_string(), Position::President),
                ("Cid".to_string(), Position::President),
                ("Ann".to_string(), Position::Treasurer),
            ]
        );
        assert!(reg.remove("Ann", Position::President).is_err());
        reg.remove("Ann", Position::Treasurer).unwrap();
        assert_eq!(reg.len(), 2);
        assert_eq!(CandidateRegistry::from_candidates(&reg.rows()), reg);
    }

    #[test]
    fn failed_candidate_removal_changes_nothing() {
        let mut reg = CandidateRegistry::new();
        reg.add(" X ", Some(Position::President)).unwrap();
        let before = reg.clone();
        assert!(matches!(
            reg.remove("Ghost", Position::Treasurer),
            Err(BallotErrors::NotFound { .. })
        ));
        assert!(reg.remove("Ghost", Position::President).is_err());
        assert_eq!(reg, before);

        // Names are matched the way `add` stored them.
        reg.remove(" X ", Position::President).unwrap();
        assert!(reg.is_empty());
        assert_eq!(reg, CandidateRegistry::new());
    }

    #[test]
    fn counting_ignores_entry_order() {
        init();
        let mut entries: BTreeMap<Position, Vec<String>> = BTreeMap::new();
        let names = ["X", "Q", "X", "R", "X", "Q"];
        entries.insert(
            Position::President,
            names.iter().map(|s| s.to_string()).collect(),
        );
        let forward = count_votes(
            &Tally::from_entries(entries.clone()),
            &BallotRules::DEFAULT_RULES,
            None,
        );
        entries
            .get_mut(&Position::President)
            .unwrap()
            .reverse();
        entries.get_mut(&Position::President).unwrap().swap(0, 3);
        let shuffled = count_votes(
            &Tally::from_entries(entries),
            &BallotRules::DEFAULT_RULES,
            None,
        );
        assert_eq!(forward, shuffled);
        let pres = forward.position(Position::President).unwrap();
        assert_eq!(pres.ballots, 6);
        assert_eq!(pres.votes_for("X"), Some(3));
        assert_eq!(pres.votes_for("Q"), Some(2));
        assert_eq!(pres.votes_for("R"), Some(1));
    }

    #[test]
    fn counting_matches_exact_names_only() {
        let mut entries: BTreeMap<Position, Vec<String>> = BTreeMap::new();
        entries.insert(
            Position::Secretary,
            vec!["Zoe".to_string(), "zoe".to_string(), "Zoe ".to_string()],
        );
        let res = count_votes(
            &Tally::from_entries(entries),
            &BallotRules::DEFAULT_RULES,
            None,
        );
        let sec = res.position(Position::Secretary).unwrap();
        assert_eq!(sec.counts.len(), 3);
        assert_eq!(sec.votes_for("Zoe"), Some(1));
    }

    #[test]
    fn unvoted_candidates_on_request() {
        let mut reg = CandidateRegistry::new();
        reg.add("X", Some(Position::President)).unwrap();
        reg.add("Nobody", Some(Position::President)).unwrap();
        let mut tally = Tally::new();
        tally.append(
            &Ballot::validate(
                &selections(["X", "Y", "Z", "W"]),
                &BallotRules {
                    require_registered_candidates: false,
                    ..BallotRules::DEFAULT_RULES
                },
                None,
            )
            .unwrap(),
        );

        let default = count_votes(&tally, &BallotRules::DEFAULT_RULES, Some(&reg));
        let pres = default.position(Position::President).unwrap();
        assert_eq!(pres.votes_for("Nobody"), None);

        let rules = BallotRules {
            include_unvoted_candidates: true,
            ..BallotRules::DEFAULT_RULES
        };
        let all = count_votes(&tally, &rules, Some(&reg));
        let pres = all.position(Position::President).unwrap();
        assert_eq!(pres.votes_for("Nobody"), Some(0));
        assert_eq!(pres.votes_for("X"), Some(1));
    }

    #[test]
    fn uneven_tally_has_no_ballot_count() {
        let mut entries: BTreeMap<Position, Vec<String>> = BTreeMap::new();
        entries.insert(Position::President, vec!["X".to_string()]);
        let t = Tally::from_entries(entries);
        assert_eq!(t.ballots_cast(), None);
        assert_eq!(Tally::new().ballots_cast(), Some(0));
    }
}
