// Reading and writing the JSON stores: the tally and the ledger of voters who voted.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::booth::{
    io_common::{read_optional, write_atomically},
    *,
};

/// The layout of `votes.json`. Absent keys are empty lists, unknown keys are refused.
#[derive(Eq, PartialEq, Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct TallyFile {
    #[serde(rename = "President", default)]
    president: Vec<String>,
    #[serde(rename = "Vice-President", default)]
    vice_president: Vec<String>,
    #[serde(rename = "Secretary", default)]
    secretary: Vec<String>,
    #[serde(rename = "Treasurer", default)]
    treasurer: Vec<String>,
}

impl TallyFile {
    fn from_tally(tally: &Tally) -> TallyFile {
        let v = |p: Position| tally.votes(p).to_vec();
        TallyFile {
            president: v(Position::President),
            vice_president: v(Position::VicePresident),
            secretary: v(Position::Secretary),
            treasurer: v(Position::Treasurer),
        }
    }

    fn into_tally(self) -> Tally {
        let entries: BTreeMap<Position, Vec<String>> = BTreeMap::from([
            (Position::President, self.president),
            (Position::VicePresident, self.vice_president),
            (Position::Secretary, self.secretary),
            (Position::Treasurer, self.treasurer),
        ]);
        Tally::from_entries(entries)
    }
}

#[derive(Eq, PartialEq, Debug, Clone, Default, Serialize, Deserialize)]
struct LedgerFile {
    voted: BTreeSet<String>,
}

/// Loads `votes.json`. A missing or blank file is an empty tally.
pub fn read_tally(path: &Path) -> BoothResult<Tally> {
    let contents = match read_optional(path)? {
        Some(s) if !s.trim().is_empty() => s,
        _ => return Ok(Tally::new()),
    };
    let tf: TallyFile = serde_json::from_str(contents.as_str()).context(ParsingJsonSnafu {
        path: display_path(path),
    })?;
    let tally = tf.into_tally();
    debug!("read_tally: {:?} ballots in {:?}", tally.ballots_cast(), path);
    Ok(tally)
}

pub fn write_tally(path: &Path, tally: &Tally) -> BoothResult<()> {
    let js = serde_json::to_vec(&TallyFile::from_tally(tally)).context(WritingJsonSnafu {})?;
    write_atomically(path, &js)
}

/// Loads the IDs of the voters who already voted.
pub fn read_ledger(path: &Path) -> BoothResult<BTreeSet<String>> {
    let contents = match read_optional(path)? {
        Some(s) if !s.trim().is_empty() => s,
        _ => return Ok(BTreeSet::new()),
    };
    let lf: LedgerFile = serde_json::from_str(contents.as_str()).context(ParsingJsonSnafu {
        path: display_path(path),
    })?;
    Ok(lf.voted)
}

pub fn write_ledger(path: &Path, voted: &BTreeSet<String>) -> BoothResult<()> {
    let lf = LedgerFile {
        voted: voted.clone(),
    };
    let js = serde_json::to_vec(&lf).context(WritingJsonSnafu {})?;
    write_atomically(path, &js)
}
