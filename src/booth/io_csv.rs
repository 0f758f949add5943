// Reading and writing the registries as CSV files.

use std::fs::File;

use csv::{StringRecord, Trim};
use serde::{Deserialize, Serialize};

use crate::booth::{io_common::write_atomically, *};

const VOTER_HEADER: [&str; 2] = ["Name", "VoterID"];
const CANDIDATE_HEADER: [&str; 2] = ["Name", "Position"];

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
struct VoterRow {
    #[serde(rename = "Name")]
    name: String,
    #[serde(rename = "VoterID")]
    voter_id: String,
}

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
struct CandidateRow {
    #[serde(rename = "Name")]
    name: String,
    #[serde(rename = "Position")]
    position: String,
}

/// Loads `voters.csv`. A missing file is an empty registry.
pub fn read_voters(path: &Path) -> BoothResult<VoterRegistry> {
    let mut voters: Vec<Voter> = Vec::new();
    for (lineno, row) in read_rows::<VoterRow>(path, &VOTER_HEADER)? {
        if row.name.is_empty() {
            return malformed(path, lineno, "empty voter name");
        }
        if !is_valid_voter_id(&row.voter_id) {
            return malformed(
                path,
                lineno,
                format!("voter ID {:?} must contain digits only", row.voter_id),
            );
        }
        voters.push(Voter {
            name: row.name,
            voter_id: row.voter_id,
        });
    }
    info!("Read {} voters from {:?}", voters.len(), path);
    Ok(VoterRegistry::from_voters(voters))
}

pub fn write_voters(path: &Path, voters: &VoterRegistry) -> BoothResult<()> {
    let rows: Vec<VoterRow> = voters
        .voters()
        .iter()
        .map(|v| VoterRow {
            name: v.name.clone(),
            voter_id: v.voter_id.clone(),
        })
        .collect();
    write_rows(path, &VOTER_HEADER, &rows)
}

/// Loads `candidates.csv`. A missing file is an empty registry.
pub fn read_candidates(path: &Path) -> BoothResult<CandidateRegistry> {
    let mut candidates: Vec<Candidate> = Vec::new();
    for (lineno, row) in read_rows::<CandidateRow>(path, &CANDIDATE_HEADER)? {
        if row.name.is_empty() {
            return malformed(path, lineno, "empty candidate name");
        }
        let position: Position = match row.position.parse() {
            Ok(p) => p,
            Err(_) => {
                return malformed(path, lineno, format!("unknown position {:?}", row.position))
            }
        };
        candidates.push(Candidate {
            name: row.name,
            position,
        });
    }
    info!("Read {} candidates from {:?}", candidates.len(), path);
    Ok(CandidateRegistry::from_candidates(&candidates))
}

pub fn write_candidates(path: &Path, candidates: &CandidateRegistry) -> BoothResult<()> {
    let rows: Vec<CandidateRow> = candidates
        .rows()
        .into_iter()
        .map(|c| CandidateRow {
            name: c.name,
            position: c.position.name().to_string(),
        })
        .collect();
    write_rows(path, &CANDIDATE_HEADER, &rows)
}

fn malformed<T>(path: &Path, lineno: usize, reason: impl Into<String>) -> BoothResult<T> {
    MalformedRowSnafu {
        path: display_path(path),
        lineno,
        reason: reason.into(),
    }
    .fail()
}

/// Reads all the rows of a registry file, with their line numbers.
///
/// The header must match exactly and every row must have as many fields as the header.
fn read_rows<T>(path: &Path, header: &[&str; 2]) -> BoothResult<Vec<(usize, T)>>
where
    T: for<'de> Deserialize<'de>,
{
    let p = display_path(path);
    if !path.exists() {
        debug!("read_rows: {} does not exist, no rows", p);
        return Ok(Vec::new());
    }
    let file = File::open(path).context(FileAccessSnafu { path: p.clone() })?;
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(Trim::All)
        .from_reader(file);

    let found = rdr
        .headers()
        .context(CsvParseSnafu { path: p.clone() })?
        .clone();
    if found.is_empty() {
        // An empty file: treated like a missing one.
        return Ok(Vec::new());
    }
    let expected = StringRecord::from(header.to_vec());
    if found != expected {
        return malformed(
            path,
            1,
            format!(
                "expected header {}, found {}",
                header.join(","),
                found.iter().collect::<Vec<&str>>().join(",")
            ),
        );
    }

    let mut res: Vec<(usize, T)> = Vec::new();
    for (idx, line_r) in rdr.records().enumerate() {
        let record = line_r.context(CsvParseSnafu { path: p.clone() })?;
        let lineno = record
            .position()
            .map(|pos| pos.line() as usize)
            .unwrap_or(idx + 2);
        if record.len() != header.len() {
            return malformed(
                path,
                lineno,
                format!("expected {} fields, found {}", header.len(), record.len()),
            );
        }
        let row: T = record
            .deserialize(Some(&expected))
            .context(CsvParseSnafu { path: p.clone() })?;
        res.push((lineno, row));
    }
    Ok(res)
}

fn write_rows<T: Serialize>(path: &Path, header: &[&str; 2], rows: &[T]) -> BoothResult<()> {
    let p = display_path(path);
    // The header is written by hand so that an empty registry still has one.
    let mut wtr = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(Vec::new());
    wtr.write_record(header)
        .context(CsvParseSnafu { path: p.clone() })?;
    for row in rows {
        wtr.serialize(row)
            .context(CsvParseSnafu { path: p.clone() })?;
    }
    let data = wtr
        .into_inner()
        .map_err(|e| e.into_error())
        .context(FileAccessSnafu { path: p.clone() })?;
    write_atomically(path, &data)?;
    info!("Wrote {} rows to {}", rows.len(), p);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::fs;

    #[test]
    fn voters_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let p = dir.path().join("voters.csv");
        let mut reg = VoterRegistry::new();
        reg.add("Al", "1").unwrap();
        reg.add("Bea Smith, Jr.", "22").unwrap();
        write_voters(&p, &reg).unwrap();
        let back = read_voters(&p).unwrap();
        let a: HashSet<Voter> = reg.voters().iter().cloned().collect();
        let b: HashSet<Voter> = back.voters().iter().cloned().collect();
        assert_eq!(a, b);
        let text = fs::read_to_string(&p).unwrap();
        assert!(text.starts_with("Name,VoterID\n"));
    }

    #[test]
    fn candidates_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let p = dir.path().join("candidates.csv");
        let mut reg = CandidateRegistry::new();
        reg.add("X", Some(Position::President)).unwrap();
        reg.add("Y", Some(Position::VicePresident)).unwrap();
        reg.add("Q", Some(Position::President)).unwrap();
        write_candidates(&p, &reg).unwrap();
        let back = read_candidates(&p).unwrap();
        let a: HashSet<Candidate> = reg.rows().into_iter().collect();
        let b: HashSet<Candidate> = back.rows().into_iter().collect();
        assert_eq!(a, b);
        assert_eq!(
            fs::read_to_string(&p).unwrap(),
            "Name,Position\nX,President\nQ,President\nY,Vice-President\n"
        );
    }

    #[test]
    fn empty_registry_keeps_header() {
        let dir = tempfile::tempdir().unwrap();
        let p = dir.path().join("voters.csv");
        write_voters(&p, &VoterRegistry::new()).unwrap();
        assert_eq!(fs::read_to_string(&p).unwrap(), "Name,VoterID\n");
        assert!(read_voters(&p).unwrap().is_empty());
    }

    #[test]
    fn missing_or_empty_file_is_empty_registry() {
        let dir = tempfile::tempdir().unwrap();
        let p = dir.path().join("voters.csv");
        assert!(read_voters(&p).unwrap().is_empty());
        fs::write(&p, "").unwrap();
        assert!(read_voters(&p).unwrap().is_empty());
    }

    #[test]
    fn wrong_header_is_malformed() {
        let dir = tempfile::tempdir().unwrap();
        let p = dir.path().join("candidates.csv");
        fs::write(&p, "Position,Name\nPresident,X\n").unwrap();
        match read_candidates(&p) {
            Err(BoothError::MalformedRow { lineno, .. }) => assert_eq!(lineno, 1),
            x => panic!("unexpected {:?}", x),
        }
    }

    #[test]
    fn bad_rows_are_reported_with_line_number() {
        let dir = tempfile::tempdir().unwrap();
        let p = dir.path().join("voters.csv");
        fs::write(&p, "Name,VoterID\nAl,1\nBea\n").unwrap();
        match read_voters(&p) {
            Err(BoothError::MalformedRow { lineno, reason, .. }) => {
                assert_eq!(lineno, 3);
                assert!(reason.contains("fields"));
            }
            x => panic!("unexpected {:?}", x),
        }

        fs::write(&p, "Name,VoterID\nAl,one\n").unwrap();
        assert!(matches!(
            read_voters(&p),
            Err(BoothError::MalformedRow { lineno: 2, .. })
        ));

        let c = dir.path().join("candidates.csv");
        fs::write(&c, "Name,Position\nX,Mayor\n").unwrap();
        assert!(matches!(
            read_candidates(&c),
            Err(BoothError::MalformedRow { lineno: 2, .. })
        ));
    }

    #[test]
    fn duplicate_ids_in_storage_are_kept() {
        let dir = tempfile::tempdir().unwrap();
        let p = dir.path().join("voters.csv");
        fs::write(&p, "Name,VoterID\nAl,1\nAlan,1\n").unwrap();
        assert_eq!(read_voters(&p).unwrap().len(), 2);
    }
}
