pub use crate::config::*;
use crate::{Ballot, CandidateRegistry, Selections};

/// A builder for filling a ballot one position at a time.
///
/// This is how a voting front-end collects the selections before submitting them.
///
/// ```
/// use ballot_tally::builder::BallotBuilder;
/// use ballot_tally::{BallotRules, CandidateRegistry, Position};
/// # use ballot_tally::BallotErrors;
///
/// let mut candidates = CandidateRegistry::new();
/// candidates.add("Anna", Some(Position::President))?;
///
/// let mut builder = BallotBuilder::new(&BallotRules::DEFAULT_RULES)?
///     .candidates(&candidates)?;
///
/// builder.select_by_label("President", "Anna")?;
/// // Not enough: the other positions are still empty.
/// assert!(builder.build().is_err());
///
/// # Ok::<(), BallotErrors>(())
/// ```
pub struct BallotBuilder {
    pub(crate) _rules: BallotRules,
    pub(crate) _candidates: Option<CandidateRegistry>,
    pub(crate) _selections: Selections,
}

impl BallotBuilder {
    pub fn new(rules: &BallotRules) -> Result<BallotBuilder, BallotErrors> {
        Ok(BallotBuilder {
            _rules: rules.clone(),
            _candidates: None,
            _selections: Selections::new(),
        })
    }

    /// Restricts the selections to the registered candidates.
    ///
    /// Earlier selections are kept; `build` checks them against the registry.
    pub fn candidates(self, cands: &CandidateRegistry) -> Result<BallotBuilder, BallotErrors> {
        Ok(BallotBuilder {
            _rules: self._rules,
            _candidates: Some(cands.clone()),
            _selections: self._selections,
        })
    }

    /// Selects a candidate for a position, replacing any earlier selection.
    ///
    /// Unregistered names are refused right away when the builder knows the candidates.
    pub fn select(&mut self, position: Position, name: &str) -> Result<(), BallotErrors> {
        if let (true, Some(reg)) = (
            self._rules.require_registered_candidates,
            self._candidates.as_ref(),
        ) {
            if !reg.contains(position, name) {
                return Err(BallotErrors::UnknownCandidate {
                    position,
                    name: name.to_string(),
                });
            }
        }
        self._selections.insert(position, name.to_string());
        Ok(())
    }

    /// Same as `select`, with the position given by its label.
    pub fn select_by_label(&mut self, position: &str, name: &str) -> Result<(), BallotErrors> {
        let p: Position = position.parse()?;
        self.select(p, name)
    }

    pub fn clear(&mut self, position: Position) {
        self._selections.remove(&position);
    }

    pub fn selections(&self) -> &Selections {
        &self._selections
    }

    pub fn build(&self) -> Result<Ballot, BallotErrors> {
        Ballot::validate(&self._selections, &self._rules, self._candidates.as_ref())
    }
}
