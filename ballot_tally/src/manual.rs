/*!

This is the long-form manual for `ballot_tally` and `ballotbox`.

## Positions

Every ballot covers the same four positions, in this order:
`President`, `Vice-President`, `Secretary`, `Treasurer`. The labels are
case-sensitive and are used verbatim in all the files below.

## Data files

All the files live in the data directory (the current directory by default).

### `voters.csv`

```text
Name,VoterID
Al,1
Bea,2
```

The header is mandatory. Voter IDs contain digits only. A missing file is
treated as an empty registry.

### `candidates.csv`

```text
Name,Position
X,President
Y,Vice-President
```

### `votes.json`

```json
{"President": ["X"], "Vice-President": ["Y"], "Secretary": ["Z"], "Treasurer": ["W"]}
```

One name is appended to each list for every accepted ballot. The lists are
never edited.

### Ballot flags

By default, the IDs of the voters who have voted are kept in `voted.json`:

```json
{"voted": ["1"]}
```

With `"ballotFlags": "files"` in the configuration, each voter gets a
`voter_<key>.txt` file containing `voted` instead. The key is the voter ID,
or the voter name with `"flagKey": "name"`. In that mode a voter name cannot
contain `/` or `\`, and cannot be `.` or `..`.

## Configuration

`ballotbox --config election.json` reads a JSON file such as:

```json
{
  "dataDirectory": "data",
  "votersFile": "voters.csv",
  "candidatesFile": "candidates.csv",
  "votesFile": "votes.json",
  "votedFile": "voted.json",
  "ballotFlags": "ledger",
  "flagKey": "voterId",
  "admin": {"username": "admin", "password": "adminpass"}
}
```

All the keys are optional. Relative paths are resolved against the folder
containing the configuration file. `--data-dir` overrides `dataDirectory`.

## Commands

```bash
ballotbox candidate add --name X --position President --user admin --password adminpass
ballotbox voter add --name Al --voter-id 1 --user admin --password adminpass
ballotbox login --name Al --voter-id 1
ballotbox vote --name Al --voter-id 1 --president X --vice-president Y --secretary Z --treasurer W
ballotbox results --out results.json --user admin --password adminpass
ballotbox audit --user admin --password adminpass
```

Every command prints a status line starting with `[ok]` or `[error]`, and
exits with a non-zero code on error. A vote is recorded in `votes.json`
first, then the voter is flagged: if the second write fails, `audit`
reports the mismatch.

*/
