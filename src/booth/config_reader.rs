use crate::booth::*;

use serde::{Deserialize, Serialize};
use std::fs;

pub const DEFAULT_ADMIN_USERNAME: &str = "admin";
pub const DEFAULT_ADMIN_PASSWORD: &str = "adminpass";

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct AdminCredentials {
    pub username: String,
    pub password: String,
}

impl Default for AdminCredentials {
    fn default() -> Self {
        AdminCredentials {
            username: DEFAULT_ADMIN_USERNAME.to_string(),
            password: DEFAULT_ADMIN_PASSWORD.to_string(),
        }
    }
}

#[derive(Eq, PartialEq, Debug, Clone, Default, Serialize, Deserialize)]
pub struct BoothConfig {
    #[serde(rename = "dataDirectory")]
    pub data_directory: Option<String>,
    #[serde(rename = "votersFile")]
    pub voters_file: Option<String>,
    #[serde(rename = "candidatesFile")]
    pub candidates_file: Option<String>,
    #[serde(rename = "votesFile")]
    pub votes_file: Option<String>,
    #[serde(rename = "votedFile")]
    pub voted_file: Option<String>,
    #[serde(rename = "ballotFlags")]
    pub ballot_flags: Option<String>,
    #[serde(rename = "flagKey")]
    pub flag_key: Option<String>,
    pub admin: Option<AdminCredentials>,
}

/// What identifies a voter in the name of a flag file.
#[derive(Eq, PartialEq, Debug, Clone, Copy)]
pub enum FlagKey {
    VoterId,
    Name,
}

#[derive(Eq, PartialEq, Debug, Clone, Copy)]
pub enum FlagStorage {
    /// A single `voted.json` file with the IDs of the voters.
    Ledger,
    /// One `voter_<key>.txt` file per voter.
    Files(FlagKey),
}

impl BoothConfig {
    pub fn flag_storage(&self) -> BoothResult<FlagStorage> {
        let key = match self.flag_key.as_deref() {
            None | Some("voterId") => FlagKey::VoterId,
            Some("name") => FlagKey::Name,
            Some(x) => whatever!("unknown flag key: {}", x),
        };
        match self.ballot_flags.as_deref() {
            None | Some("ledger") => Ok(FlagStorage::Ledger),
            Some("files") => Ok(FlagStorage::Files(key)),
            Some(x) => whatever!("unknown ballot flag storage: {}", x),
        }
    }
}

/// The resolved locations and options used by a session.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct Settings {
    pub data_dir: PathBuf,
    pub voters_path: PathBuf,
    pub candidates_path: PathBuf,
    pub votes_path: PathBuf,
    pub voted_path: PathBuf,
    pub flag_storage: FlagStorage,
    pub admin: AdminCredentials,
}

impl Settings {
    /// The default file names in the given directory.
    pub fn in_dir(dir: &Path) -> Settings {
        Settings {
            data_dir: dir.to_path_buf(),
            voters_path: dir.join("voters.csv"),
            candidates_path: dir.join("candidates.csv"),
            votes_path: dir.join("votes.json"),
            voted_path: dir.join("voted.json"),
            flag_storage: FlagStorage::Ledger,
            admin: AdminCredentials::default(),
        }
    }

    /// The fixed credential check guarding the administration commands.
    pub fn check_admin(&self, username: &str, password: &str) -> BoothResult<()> {
        if username == self.admin.username && password == self.admin.password {
            Ok(())
        } else {
            warn!("check_admin: rejected credentials for {:?}", username);
            AdminLoginSnafu {}.fail()
        }
    }
}

pub fn read_config(path: &Path) -> BoothResult<BoothConfig> {
    let p = display_path(path);
    let contents = fs::read_to_string(path).context(FileAccessSnafu { path: p.clone() })?;
    let config: BoothConfig =
        serde_json::from_str(contents.as_str()).context(ParsingJsonSnafu { path: p })?;
    debug!("read_config: {:?}", config);
    Ok(config)
}

/// Combines the configuration file (if any) with the command line overrides.
///
/// Relative paths in the configuration are resolved against `config_dir`, and the
/// file names against the data directory.
pub fn resolve_settings(
    config: &BoothConfig,
    config_dir: Option<&Path>,
    data_dir_override: Option<&str>,
) -> BoothResult<Settings> {
    let base = config_dir
        .filter(|p| !p.as_os_str().is_empty())
        .map(|p| p.to_path_buf())
        .unwrap_or_else(|| PathBuf::from("."));
    let data_dir: PathBuf = match (data_dir_override, config.data_directory.as_deref()) {
        (Some(d), _) => PathBuf::from(d),
        (None, Some(d)) => base.join(d),
        (None, None) => base,
    };
    let file = |name: &Option<String>, default: &str| -> PathBuf {
        data_dir.join(name.as_deref().unwrap_or(default))
    };
    let settings = Settings {
        voters_path: file(&config.voters_file, "voters.csv"),
        candidates_path: file(&config.candidates_file, "candidates.csv"),
        votes_path: file(&config.votes_file, "votes.json"),
        voted_path: file(&config.voted_file, "voted.json"),
        flag_storage: config.flag_storage()?,
        admin: config.admin.clone().unwrap_or_default(),
        data_dir: data_dir.clone(),
    };
    info!("Using data directory {:?}", settings.data_dir);
    Ok(settings)
}
