// Rendering of the results, and comparison with a reference summary.

use serde_json::json;
use serde_json::Map as JSMap;
use serde_json::Value as JSValue;
use std::fs;
use text_diff::print_diff;

use crate::booth::{io_common::write_atomically, *};

fn results_to_json(results: &ElectionResults) -> Vec<JSValue> {
    let mut l: Vec<JSValue> = Vec::new();
    for pr in results.positions.iter() {
        let mut tally: JSMap<String, JSValue> = JSMap::new();
        for cc in pr.counts.iter() {
            tally.insert(cc.name.clone(), json!(cc.votes));
        }
        l.push(json!({
            "position": pr.position.name(),
            "ballots": pr.ballots,
            "tally": tally
        }));
    }
    l
}

pub fn build_summary_js(results: &ElectionResults) -> JSValue {
    json!({ "results": results_to_json(results) })
}

/// The text shown to the administrator, one block per position.
pub fn render_text(results: &ElectionResults) -> String {
    let mut s = String::new();
    for pr in results.positions.iter() {
        s.push_str(&format!("{} ({} ballots)\n", pr.position, pr.ballots));
        if pr.counts.is_empty() {
            s.push_str("    no votes\n");
        }
        for cc in pr.counts.iter() {
            s.push_str(&format!("    {:>5} {}\n", cc.votes, cc.name));
        }
    }
    s
}

/// Writes the pretty-printed summary to a file, or to the standard output for `stdout`.
pub fn write_summary(out: &str, pretty_js: &str) -> BoothResult<()> {
    if out == "stdout" {
        println!("{}", pretty_js);
        return Ok(());
    }
    write_atomically(Path::new(out), pretty_js.as_bytes())?;
    info!("Summary written to {}", out);
    Ok(())
}

pub fn read_summary(path: &str) -> BoothResult<JSValue> {
    let contents = fs::read_to_string(path).context(FileAccessSnafu { path })?;
    let js: JSValue =
        serde_json::from_str(contents.as_str()).context(ParsingJsonSnafu { path })?;
    Ok(js)
}

/// Fails if the computed summary differs from the reference, after printing the difference.
pub fn check_reference(reference_path: &str, pretty_js: &str) -> BoothResult<()> {
    let summary_ref = read_summary(reference_path)?;
    let pretty_js_ref = serde_json::to_string_pretty(&summary_ref).context(WritingJsonSnafu {})?;
    if pretty_js_ref != pretty_js {
        warn!("Found differences with the reference summary {}", reference_path);
        print_diff(pretty_js_ref.as_str(), pretty_js, "\n");
        return ReferenceMismatchSnafu {
            path: reference_path,
        }
        .fail();
    }
    info!("Summary matches the reference {}", reference_path);
    Ok(())
}
