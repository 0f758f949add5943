use clap::{Parser, Subcommand};

/// This is a small election administration program: registries of candidates and voters,
/// one ballot per voter, per-position tallies.
#[derive(Parser, Debug, Clone)]
#[clap(author, version, about, long_about = None)]
pub struct Args {
    /// (file path, optional) A JSON configuration file. See the manual for the keys.
    #[clap(short, long, value_parser)]
    pub config: Option<String>,

    /// (directory, optional) The folder with the election files. Overrides the
    /// `dataDirectory` entry of the configuration. Defaults to the current directory.
    #[clap(short, long, value_parser)]
    pub data_dir: Option<String>,

    /// If passed as an argument, will turn on verbose logging to the standard output.
    #[clap(long, takes_value = false)]
    pub verbose: bool,

    #[clap(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Checks the name and voter ID of a voter.
    Login {
        #[clap(flatten)]
        voter: VoterLogin,
    },
    /// Casts the ballot of a voter. One candidate must be selected for every position.
    Vote {
        #[clap(flatten)]
        voter: VoterLogin,
        #[clap(long, value_parser)]
        president: Option<String>,
        #[clap(long, value_parser)]
        vice_president: Option<String>,
        #[clap(long, value_parser)]
        secretary: Option<String>,
        #[clap(long, value_parser)]
        treasurer: Option<String>,
    },
    /// Manages the candidates.
    Candidate {
        #[clap(subcommand)]
        action: CandidateAction,
    },
    /// Manages the voters.
    Voter {
        #[clap(subcommand)]
        action: VoterAction,
    },
    /// Counts the votes for each position.
    Results {
        #[clap(flatten)]
        admin: AdminLogin,
        /// Also list the registered candidates without any vote.
        #[clap(long, takes_value = false)]
        include_unvoted: bool,
        /// (file path or 'stdout') If specified, the summary of the election will be written
        /// in JSON format to the given location.
        #[clap(short, long, value_parser)]
        out: Option<String>,
        /// (file path) A reference summary in JSON format. If provided, the tabulated
        /// output must match the reference.
        #[clap(short, long, value_parser)]
        reference: Option<String>,
    },
    /// Cross-checks the tally with the ballot flags.
    Audit {
        #[clap(flatten)]
        admin: AdminLogin,
    },
}

#[derive(Subcommand, Debug, Clone)]
pub enum CandidateAction {
    Add {
        #[clap(flatten)]
        admin: AdminLogin,
        #[clap(long, value_parser)]
        name: Option<String>,
        /// One of President, Vice-President, Secretary, Treasurer.
        #[clap(long, value_parser)]
        position: Option<String>,
    },
    Remove {
        #[clap(flatten)]
        admin: AdminLogin,
        #[clap(long, value_parser)]
        name: String,
        #[clap(long, value_parser)]
        position: String,
    },
    /// Lists the candidates for each position.
    List,
}

#[derive(Subcommand, Debug, Clone)]
pub enum VoterAction {
    Add {
        #[clap(flatten)]
        admin: AdminLogin,
        #[clap(long, value_parser)]
        name: Option<String>,
        /// Digits only, unique among the voters.
        #[clap(long, value_parser)]
        voter_id: Option<String>,
    },
    Remove {
        #[clap(flatten)]
        admin: AdminLogin,
        #[clap(long, value_parser)]
        voter_id: String,
    },
    List {
        #[clap(flatten)]
        admin: AdminLogin,
    },
}

#[derive(clap::Args, Debug, Clone)]
pub struct VoterLogin {
    #[clap(long, value_parser)]
    pub name: String,
    #[clap(long, value_parser)]
    pub voter_id: String,
}

#[derive(clap::Args, Debug, Clone)]
pub struct AdminLogin {
    /// The administrator name.
    #[clap(long, value_parser)]
    pub user: String,
    #[clap(long, value_parser)]
    pub password: String,
}
