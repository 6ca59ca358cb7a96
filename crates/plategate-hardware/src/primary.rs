//! Primary integration selection.
//!
//! Storage enforces a single primary per kind when the flag is written. This
//! module is the read-side check: it still copes with records that were
//! edited by hand or imported.

/// Anything that can compete for the primary slot.
pub trait PrimaryCandidate {
    fn is_active(&self) -> bool;
    fn is_primary(&self) -> bool;
}

/// Result of [`select_primary`].
#[derive(Debug, PartialEq, Eq)]
pub enum PrimarySelection<'a, T> {
    Selected(&'a T),
    None,
    /// More than one active candidate is flagged primary. This is a setup
    /// error; automatic flows treat it as no integration.
    Ambiguous(Vec<&'a T>),
}

impl<'a, T> PrimarySelection<'a, T> {
    pub fn selected(&self) -> Option<&'a T> {
        match self {
            Self::Selected(candidate) => Some(*candidate),
            Self::None | Self::Ambiguous(_) => None,
        }
    }
}

/// Pick the integration automatic flows should use.
///
/// Inactive candidates are ignored entirely. Among active ones: exactly one
/// flagged primary wins; none flagged falls back to the first active; several
/// flagged is [`PrimarySelection::Ambiguous`].
///
/// ```
/// use plategate_hardware::primary::{PrimaryCandidate, PrimarySelection, select_primary};
///
/// struct Gate(bool, bool);
/// impl PrimaryCandidate for Gate {
///     fn is_active(&self) -> bool { self.0 }
///     fn is_primary(&self) -> bool { self.1 }
/// }
///
/// let gates = [Gate(true, false), Gate(true, true)];
/// assert!(matches!(select_primary(&gates), PrimarySelection::Selected(g) if g.1));
/// ```
pub fn select_primary<T: PrimaryCandidate>(candidates: &[T]) -> PrimarySelection<'_, T> {
    let active: Vec<&T> = candidates.iter().filter(|c| c.is_active()).collect();
    let flagged: Vec<&T> = active.iter().copied().filter(|c| c.is_primary()).collect();

    match flagged.len() {
        1 => PrimarySelection::Selected(flagged[0]),
        0 => active
            .first()
            .map_or(PrimarySelection::None, |c| PrimarySelection::Selected(*c)),
        _ => PrimarySelection::Ambiguous(flagged),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, PartialEq, Eq)]
    struct Candidate {
        id: u32,
        active: bool,
        primary: bool,
    }

    impl PrimaryCandidate for Candidate {
        fn is_active(&self) -> bool {
            self.active
        }
        fn is_primary(&self) -> bool {
            self.primary
        }
    }

    fn c(id: u32, active: bool, primary: bool) -> Candidate {
        Candidate { id, active, primary }
    }

    #[test]
    fn test_single_flagged_wins() {
        let list = [c(1, true, false), c(2, true, true), c(3, true, false)];
        assert_eq!(select_primary(&list).selected().map(|c| c.id), Some(2));
    }

    #[test]
    fn test_none_flagged_falls_back_to_first_active() {
        let list = [c(1, false, false), c(2, true, false), c(3, true, false)];
        assert_eq!(select_primary(&list).selected().map(|c| c.id), Some(2));
    }

    #[test]
    fn test_inactive_primary_is_ignored() {
        let list = [c(1, false, true), c(2, true, false)];
        assert_eq!(select_primary(&list).selected().map(|c| c.id), Some(2));
    }

    #[test]
    fn test_none_active() {
        let list = [c(1, false, true), c(2, false, false)];
        assert_eq!(select_primary(&list), PrimarySelection::None);
        assert_eq!(select_primary::<Candidate>(&[]), PrimarySelection::None);
    }

    #[test]
    fn test_multiple_flagged_is_ambiguous() {
        let list = [c(1, true, true), c(2, true, true)];
        let selection = select_primary(&list);

        match &selection {
            PrimarySelection::Ambiguous(flagged) => assert_eq!(flagged.len(), 2),
            other => panic!("expected ambiguous, got {other:?}"),
        }
        assert!(selection.selected().is_none());
    }
}
