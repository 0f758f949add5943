// Persistence of the "has voted" markers.

use std::collections::BTreeSet;
use std::fs;

use crate::booth::{
    config_reader::{FlagKey, FlagStorage},
    io_common::{read_optional, write_atomically},
    io_json::{read_ledger, write_ledger},
    *,
};

const FLAG_CONTENT: &str = "voted";

/// Storage for the ballot flags, so the election can run against either layout.
pub trait BallotFlags {
    fn status(&self, voter: &Voter) -> BoothResult<VoterStatus>;

    /// Sets the flag of a voter. Once set, it is never cleared.
    fn mark_voted(&mut self, voter: &Voter) -> BoothResult<()>;

    /// The keys of all the flagged voters.
    fn flagged(&self) -> BoothResult<BTreeSet<String>>;

    /// Whether the keys returned by `flagged` are voter IDs.
    fn keyed_by_id(&self) -> bool;
}

/// Flag files live directly in the data directory: the key must be a plain file name part.
pub fn check_flag_key(key: &str) -> BoothResult<()> {
    let unsafe_key = key.is_empty()
        || key == "."
        || key == ".."
        || key.chars().any(|c| c == '/' || c == '\\' || c == '\0');
    ensure!(!unsafe_key, UnsafeFlagKeySnafu { key });
    Ok(())
}

pub fn open_flags(settings: &Settings) -> BoothResult<Box<dyn BallotFlags>> {
    match settings.flag_storage {
        FlagStorage::Ledger => Ok(Box::new(VotedLedger::load(&settings.voted_path)?)),
        FlagStorage::Files(key) => Ok(Box::new(FlagFiles::new(&settings.data_dir, key))),
    }
}

/// The IDs of the voters who voted, in a single JSON file.
pub struct VotedLedger {
    path: PathBuf,
    voted: BTreeSet<String>,
}

impl VotedLedger {
    pub fn load(path: &Path) -> BoothResult<VotedLedger> {
        let voted = read_ledger(path)?;
        info!("Read {} ballot flags from {:?}", voted.len(), path);
        Ok(VotedLedger {
            path: path.to_path_buf(),
            voted,
        })
    }
}

impl BallotFlags for VotedLedger {
    fn status(&self, voter: &Voter) -> BoothResult<VoterStatus> {
        if self.voted.contains(&voter.voter_id) {
            Ok(VoterStatus::Voted)
        } else {
            Ok(VoterStatus::NotVoted)
        }
    }

    fn mark_voted(&mut self, voter: &Voter) -> BoothResult<()> {
        let mut next = self.voted.clone();
        next.insert(voter.voter_id.clone());
        write_ledger(&self.path, &next)?;
        self.voted = next;
        Ok(())
    }

    fn flagged(&self) -> BoothResult<BTreeSet<String>> {
        Ok(self.voted.clone())
    }

    fn keyed_by_id(&self) -> bool {
        true
    }
}

/// One `voter_<key>.txt` file per voter, containing `voted`.
pub struct FlagFiles {
    dir: PathBuf,
    key: FlagKey,
}

impl FlagFiles {
    pub fn new(dir: &Path, key: FlagKey) -> FlagFiles {
        FlagFiles {
            dir: dir.to_path_buf(),
            key,
        }
    }

    pub fn flag_path(&self, voter: &Voter) -> BoothResult<PathBuf> {
        let k = match self.key {
            FlagKey::VoterId => &voter.voter_id,
            FlagKey::Name => &voter.name,
        };
        check_flag_key(k)?;
        Ok(self.dir.join(format!("voter_{}.txt", k)))
    }
}

impl BallotFlags for FlagFiles {
    fn status(&self, voter: &Voter) -> BoothResult<VoterStatus> {
        // Only the exact content counts as a flag.
        match read_optional(&self.flag_path(voter)?)? {
            Some(s) if s == FLAG_CONTENT => Ok(VoterStatus::Voted),
            _ => Ok(VoterStatus::NotVoted),
        }
    }

    fn mark_voted(&mut self, voter: &Voter) -> BoothResult<()> {
        write_atomically(&self.flag_path(voter)?, FLAG_CONTENT.as_bytes())
    }

    fn flagged(&self) -> BoothResult<BTreeSet<String>> {
        let mut res: BTreeSet<String> = BTreeSet::new();
        let entries = fs::read_dir(&self.dir).context(FileAccessSnafu {
            path: display_path(&self.dir),
        })?;
        for entry in entries {
            let entry = entry.context(FileAccessSnafu {
                path: display_path(&self.dir),
            })?;
            let fname = entry.file_name().to_string_lossy().to_string();
            if let Some(k) = fname
                .strip_prefix("voter_")
                .and_then(|s| s.strip_suffix(".txt"))
            {
                if read_optional(&entry.path())?.as_deref() == Some(FLAG_CONTENT) {
                    res.insert(k.to_string());
                }
            }
        }
        Ok(res)
    }

    fn keyed_by_id(&self) -> bool {
        self.key == FlagKey::VoterId
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn al() -> Voter {
        Voter {
            name: "Al".to_string(),
            voter_id: "1".to_string(),
        }
    }

    #[test]
    fn ledger_flags_persist() {
        let dir = tempfile::tempdir().unwrap();
        let p = dir.path().join("voted.json");
        let mut ledger = VotedLedger::load(&p).unwrap();
        assert_eq!(ledger.status(&al()).unwrap(), VoterStatus::NotVoted);
        ledger.mark_voted(&al()).unwrap();
        assert_eq!(ledger.status(&al()).unwrap(), VoterStatus::Voted);

        let reloaded = VotedLedger::load(&p).unwrap();
        assert_eq!(reloaded.status(&al()).unwrap(), VoterStatus::Voted);
        assert_eq!(
            reloaded.flagged().unwrap().into_iter().collect::<Vec<String>>(),
            vec!["1".to_string()]
        );
    }

    #[test]
    fn flag_files_by_name() {
        let dir = tempfile::tempdir().unwrap();
        let mut flags = FlagFiles::new(dir.path(), FlagKey::Name);
        assert_eq!(flags.status(&al()).unwrap(), VoterStatus::NotVoted);
        flags.mark_voted(&al()).unwrap();
        let p = dir.path().join("voter_Al.txt");
        assert_eq!(fs::read_to_string(&p).unwrap(), "voted");
        assert_eq!(flags.status(&al()).unwrap(), VoterStatus::Voted);
        assert!(!flags.keyed_by_id());
    }

    #[test]
    fn flag_keys_stay_in_the_data_directory() {
        let dir = tempfile::tempdir().unwrap();
        let mut flags = FlagFiles::new(dir.path(), FlagKey::Name);
        let sneaky = Voter {
            name: "../Al".to_string(),
            voter_id: "1".to_string(),
        };
        assert!(matches!(
            flags.mark_voted(&sneaky),
            Err(BoothError::UnsafeFlagKey { .. })
        ));
        assert!(flags.status(&sneaky).is_err());
        for k in ["", ".", "..", "a/b", "a\\b"] {
            assert!(check_flag_key(k).is_err(), "{:?}", k);
        }
        assert!(check_flag_key("Al Smith").is_ok());
    }

    #[test]
    fn flag_files_need_exact_content() {
        let dir = tempfile::tempdir().unwrap();
        let flags = FlagFiles::new(dir.path(), FlagKey::VoterId);
        fs::write(dir.path().join("voter_1.txt"), "voted\n").unwrap();
        fs::write(dir.path().join("voter_2.txt"), "voted").unwrap();
        fs::write(dir.path().join("voters.csv"), "Name,VoterID\n").unwrap();
        assert_eq!(flags.status(&al()).unwrap(), VoterStatus::NotVoted);
        let flagged: Vec<String> = flags.flagged().unwrap().into_iter().collect();
        assert_eq!(flagged, vec!["2".to_string()]);
    }
}
