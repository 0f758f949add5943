use log::{debug, info, warn};

use ballot_tally::*;
use snafu::{prelude::*, Snafu};

use std::fmt::Display;
use std::path::{Path, PathBuf};

use crate::args::{AdminLogin, Args, CandidateAction, Command, VoterAction};
use crate::booth::config_reader::*;
use crate::booth::flags::{check_flag_key, open_flags, BallotFlags};
use crate::booth::io_common::display_path;

pub mod config_reader;
mod flags;
mod io_common;
mod io_csv;
mod io_json;
mod summary;

#[derive(Debug, Snafu)]
pub enum BoothError {
    #[snafu(context(false), display("{source}"))]
    Ballot { source: BallotErrors },
    #[snafu(display("Cannot access file {path}: {source}"))]
    FileAccess {
        source: std::io::Error,
        path: String,
    },
    #[snafu(display("Cannot process CSV file {path}: {source}"))]
    CsvParse { source: csv::Error, path: String },
    #[snafu(display("Malformed row {lineno} in {path}: {reason}"))]
    MalformedRow {
        path: String,
        lineno: usize,
        reason: String,
    },
    #[snafu(display("Cannot parse JSON file {path}: {source}"))]
    ParsingJson {
        source: serde_json::Error,
        path: String,
    },
    #[snafu(display("Cannot serialize JSON: {source}"))]
    WritingJson { source: serde_json::Error },
    #[snafu(display("Invalid admin credentials"))]
    AdminLogin {},
    #[snafu(display("{key:?} cannot be used in the name of a ballot flag file"))]
    UnsafeFlagKey { key: String },
    #[snafu(display("Difference detected between calculated summary and reference {path}"))]
    ReferenceMismatch { path: String },

    #[snafu(whatever, display("{message}"))]
    Whatever {
        message: String,
        #[snafu(source(from(Box<dyn std::error::Error>, Some)))]
        source: Option<Box<dyn std::error::Error>>,
    },
}

pub type BoothResult<T> = Result<T, BoothError>;

#[derive(Eq, PartialEq, Debug, Clone, Copy)]
pub enum Tone {
    Success,
    Failure,
}

/// The outcome of a user action, as shown to the user.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct Status {
    pub tone: Tone,
    pub message: String,
}

impl Status {
    pub fn success(message: impl Into<String>) -> Status {
        Status {
            tone: Tone::Success,
            message: message.into(),
        }
    }

    pub fn failure(message: impl Into<String>) -> Status {
        Status {
            tone: Tone::Failure,
            message: message.into(),
        }
    }

    /// Green for success, red for failure.
    pub fn render(&self, color: bool) -> String {
        let (tag, code) = match self.tone {
            Tone::Success => ("[ok]", "32"),
            Tone::Failure => ("[error]", "31"),
        };
        if color {
            format!("\x1b[{}m{}\x1b[0m {}", code, tag, self.message)
        } else {
            format!("{} {}", tag, self.message)
        }
    }
}

impl From<&BoothError> for Status {
    fn from(e: &BoothError) -> Status {
        Status::failure(e.to_string())
    }
}

/// Consistency of the persisted state.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct AuditReport {
    pub ballots: Vec<(Position, usize)>,
    pub flagged: usize,
    pub problems: Vec<String>,
    pub warnings: Vec<String>,
}

impl AuditReport {
    pub fn is_consistent(&self) -> bool {
        self.problems.is_empty()
    }
}

impl Display for AuditReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for (position, n) in self.ballots.iter() {
            writeln!(f, "{}: {} ballots", position, n)?;
        }
        write!(f, "{} voters flagged", self.flagged)?;
        for w in self.warnings.iter() {
            write!(f, "\nwarning: {}", w)?;
        }
        for p in self.problems.iter() {
            write!(f, "\nproblem: {}", p)?;
        }
        Ok(())
    }
}

/// The candidate and voter registries, on their own.
///
/// Changes stay in memory until `save_candidates` or `save_voters` is called.
pub struct Registries {
    settings: Settings,
    candidates: CandidateRegistry,
    voters: VoterRegistry,
}

impl Registries {
    pub fn load(settings: Settings) -> BoothResult<Registries> {
        let candidates = io_csv::read_candidates(&settings.candidates_path)?;
        let voters = io_csv::read_voters(&settings.voters_path)?;
        Ok(Registries {
            settings,
            candidates,
            voters,
        })
    }

    pub fn candidates(&self) -> &CandidateRegistry {
        &self.candidates
    }

    pub fn candidates_mut(&mut self) -> &mut CandidateRegistry {
        &mut self.candidates
    }

    pub fn voters(&self) -> &VoterRegistry {
        &self.voters
    }

    pub fn voters_mut(&mut self) -> &mut VoterRegistry {
        &mut self.voters
    }

    /// Registers a voter. With flag files keyed by name, the name must be usable as a
    /// file name.
    pub fn add_voter(&mut self, name: &str, voter_id: &str) -> BoothResult<Voter> {
        if self.settings.flag_storage == FlagStorage::Files(FlagKey::Name) {
            check_flag_key(name.trim())?;
        }
        Ok(self.voters.add(name, voter_id)?)
    }

    /// Overwrites the candidates file with the registry.
    pub fn save_candidates(&self) -> BoothResult<()> {
        io_csv::write_candidates(&self.settings.candidates_path, &self.candidates)
    }

    /// Overwrites the voters file with the registry.
    pub fn save_voters(&self) -> BoothResult<()> {
        io_csv::write_voters(&self.settings.voters_path, &self.voters)
    }
}

/// The state of the election, loaded from the data files.
///
/// Ballots are committed to disk as they are submitted.
pub struct Election {
    registries: Registries,
    rules: BallotRules,
    tally: Tally,
    flags: Box<dyn BallotFlags>,
}

impl Election {
    pub fn load(settings: Settings) -> BoothResult<Election> {
        let tally = io_json::read_tally(&settings.votes_path)?;
        let flags = open_flags(&settings)?;
        let registries = Registries::load(settings)?;
        info!(
            "Loaded election: {} candidates, {} voters, {:?} ballots",
            registries.candidates.len(),
            registries.voters.len(),
            tally.ballots_cast()
        );
        Ok(Election {
            registries,
            rules: BallotRules::DEFAULT_RULES,
            tally,
            flags,
        })
    }

    pub fn registries(&self) -> &Registries {
        &self.registries
    }

    pub fn tally(&self) -> &Tally {
        &self.tally
    }

    pub fn login(&self, name: &str, voter_id: &str) -> BoothResult<(Voter, VoterStatus)> {
        let voter = self.registries.voters.verify(name, voter_id)?.clone();
        let status = self.flags.status(&voter)?;
        Ok((voter, status))
    }

    /// Records the ballot of a voter.
    ///
    /// The tally is written first and the ballot flag last. If the flag cannot be written,
    /// the previous tally is put back and nothing changes in memory.
    pub fn submit_ballot(
        &mut self,
        name: &str,
        voter_id: &str,
        selections: &Selections,
    ) -> BoothResult<Ballot> {
        let (voter, status) = self.login(name, voter_id)?;
        let (ballot, next) = stage_ballot(
            &self.tally,
            &voter,
            status,
            selections,
            &self.rules,
            Some(&self.registries.candidates),
        )?;
        let votes_path = &self.registries.settings.votes_path;
        io_json::write_tally(votes_path, &next)?;
        if let Err(e) = self.flags.mark_voted(&voter) {
            warn!(
                "submit_ballot: could not flag voter {}: {}",
                voter.voter_id, e
            );
            if let Err(e2) = io_json::write_tally(votes_path, &self.tally) {
                warn!("submit_ballot: could not restore the tally: {}", e2);
            }
            return Err(e);
        }
        self.tally = next;
        info!("Ballot recorded for voter {}", voter.voter_id);
        Ok(ballot)
    }

    pub fn results(&self, include_unvoted: bool) -> ElectionResults {
        let rules = BallotRules {
            include_unvoted_candidates: include_unvoted,
            ..self.rules.clone()
        };
        count_votes(&self.tally, &rules, Some(&self.registries.candidates))
    }

    /// Checks that all the positions hold the same number of entries, and that this
    /// number matches the number of flagged voters.
    pub fn audit(&self) -> BoothResult<AuditReport> {
        let ballots: Vec<(Position, usize)> = Position::ALL
            .iter()
            .map(|p| (*p, self.tally.votes(*p).len()))
            .collect();
        let flagged = self.flags.flagged()?;
        let mut problems: Vec<String> = Vec::new();
        let mut warnings: Vec<String> = Vec::new();

        match self.tally.ballots_cast() {
            None => problems.push("the positions do not hold the same number of votes".to_string()),
            Some(n) if n != flagged.len() => problems.push(format!(
                "{} ballots recorded but {} voters flagged",
                n,
                flagged.len()
            )),
            Some(_) => {}
        }

        let by_id = self.flags.keyed_by_id();
        for k in flagged.iter() {
            let known = if by_id {
                self.registries.voters.contains_id(k)
            } else {
                self.registries.voters.voters().iter().any(|v| v.name == *k)
            };
            if !known {
                warnings.push(format!("flagged voter {} is not registered", k));
            }
        }
        debug!("audit: problems {:?} warnings {:?}", problems, warnings);
        Ok(AuditReport {
            ballots,
            flagged: flagged.len(),
            problems,
            warnings,
        })
    }
}

pub fn load_settings(config_path: Option<&str>, data_dir: Option<&str>) -> BoothResult<Settings> {
    match config_path {
        Some(p) => {
            let cp = Path::new(p);
            let config = read_config(cp)?;
            resolve_settings(&config, cp.parent(), data_dir)
        }
        None => resolve_settings(&BoothConfig::default(), None, data_dir),
    }
}

fn parse_position(position: Option<&str>) -> BoothResult<Option<Position>> {
    match position.map(|s| s.trim()) {
        None | Some("") => Ok(None),
        Some(s) => Ok(Some(s.parse::<Position>()?)),
    }
}

/// Runs one user action and reports its outcome.
pub fn run(args: &Args) -> BoothResult<Status> {
    let settings = load_settings(args.config.as_deref(), args.data_dir.as_deref())?;
    if let Some(admin) = admin_login(&args.command) {
        settings.check_admin(&admin.user, &admin.password)?;
    }
    // The registry commands do not need the tally or the flags.
    match &args.command {
        Command::Candidate { action } => {
            run_candidate_action(&mut Registries::load(settings)?, action)
        }
        Command::Voter { action } => run_voter_action(&mut Registries::load(settings)?, action),
        command => run_election_command(Election::load(settings)?, command),
    }
}

/// The administrator login required by a command, if any.
fn admin_login(command: &Command) -> Option<&AdminLogin> {
    match command {
        Command::Results { admin, .. } | Command::Audit { admin } => Some(admin),
        Command::Candidate {
            action: CandidateAction::Add { admin, .. } | CandidateAction::Remove { admin, .. },
        } => Some(admin),
        Command::Voter {
            action:
                VoterAction::Add { admin, .. }
                | VoterAction::Remove { admin, .. }
                | VoterAction::List { admin },
        } => Some(admin),
        Command::Candidate {
            action: CandidateAction::List,
        }
        | Command::Login { .. }
        | Command::Vote { .. } => None,
    }
}

fn run_election_command(mut election: Election, command: &Command) -> BoothResult<Status> {
    match command {
        Command::Login { voter } => {
            let (v, status) = election.login(&voter.name, &voter.voter_id)?;
            let message = match status {
                VoterStatus::NotVoted => format!("Welcome {}", v.name),
                VoterStatus::Voted => format!("Welcome {}. Voter has already voted.", v.name),
            };
            Ok(Status::success(message))
        }
        Command::Vote {
            voter,
            president,
            vice_president,
            secretary,
            treasurer,
        } => {
            let mut selections = Selections::new();
            for (position, choice) in [
                (Position::President, president),
                (Position::VicePresident, vice_president),
                (Position::Secretary, secretary),
                (Position::Treasurer, treasurer),
            ] {
                if let Some(c) = choice {
                    selections.insert(position, c.clone());
                }
            }
            let ballot = election.submit_ballot(&voter.name, &voter.voter_id, &selections)?;
            let mut message = "Vote submitted successfully!\nSelected Candidates:".to_string();
            for (position, name) in ballot.choices() {
                message.push_str(&format!("\n{}: {}", position, name));
            }
            Ok(Status::success(message))
        }
        Command::Results {
            include_unvoted,
            out,
            reference,
            ..
        } => {
            let results = election.results(*include_unvoted);
            let pretty_js = serde_json::to_string_pretty(&summary::build_summary_js(&results))
                .context(WritingJsonSnafu {})?;
            if let Some(o) = out {
                summary::write_summary(o, &pretty_js)?;
            }
            if let Some(r) = reference {
                summary::check_reference(r, &pretty_js)?;
            }
            Ok(Status::success(summary::render_text(&results)))
        }
        Command::Audit { .. } => {
            let report = election.audit()?;
            if report.is_consistent() {
                Ok(Status::success(report.to_string()))
            } else {
                Ok(Status::failure(report.to_string()))
            }
        }
        Command::Candidate { .. } | Command::Voter { .. } => {
            whatever!("registry commands run on the registries alone")
        }
    }
}

fn run_candidate_action(registries: &mut Registries, action: &CandidateAction) -> BoothResult<Status> {
    match action {
        CandidateAction::Add { name, position, .. } => {
            let p = parse_position(position.as_deref())?;
            let c = registries
                .candidates_mut()
                .add(name.as_deref().unwrap_or_default(), p)?;
            registries.save_candidates()?;
            Ok(Status::success(format!(
                "Candidate {} added successfully for {}!",
                c.name, c.position
            )))
        }
        CandidateAction::Remove { name, position, .. } => {
            let p: Position = position.parse()?;
            registries.candidates_mut().remove(name, p)?;
            registries.save_candidates()?;
            Ok(Status::success(format!("{} deleted successfully!", name)))
        }
        CandidateAction::List => {
            let mut lines: Vec<String> = Vec::new();
            for position in Position::ALL {
                lines.push(format!("{} Candidates:", position));
                for name in registries.candidates().candidates(position) {
                    lines.push(format!("    {}", name));
                }
            }
            Ok(Status::success(lines.join("\n")))
        }
    }
}

fn run_voter_action(registries: &mut Registries, action: &VoterAction) -> BoothResult<Status> {
    match action {
        VoterAction::Add { name, voter_id, .. } => {
            let v = registries.add_voter(
                name.as_deref().unwrap_or_default(),
                voter_id.as_deref().unwrap_or_default(),
            )?;
            registries.save_voters()?;
            Ok(Status::success(format!("Voter {} added successfully!", v.name)))
        }
        VoterAction::Remove { voter_id, .. } => {
            let v = registries.voters_mut().remove(voter_id)?;
            registries.save_voters()?;
            Ok(Status::success(format!(
                "Voter {} - {} deleted successfully!",
                v.name, v.voter_id
            )))
        }
        VoterAction::List { .. } => {
            let lines: Vec<String> = registries
                .voters()
                .voters()
                .iter()
                .map(|v| format!("{} - {}", v.name, v.voter_id))
                .collect();
            Ok(Status::success(format!(
                "{} voters\n{}",
                lines.len(),
                lines.join("\n")
            )))
        }
    }
}
