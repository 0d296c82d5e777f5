//! Per-node diff annotations and their merge lattice.

/// How a node changed relative to the previous layer state.
///
/// Merging follows the lattice `Unmodified <= {Added, Removed} <= Modified`:
/// `Unmodified` is the identity, equal values are idempotent, and any two
/// distinct non-identity values join to `Modified`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DiffType {
    #[default]
    Unmodified,
    Added,
    Removed,
    Modified,
}

impl DiffType {
    /// Joins two diff annotations. Commutative and associative.
    pub fn merge(self, other: DiffType) -> DiffType {
        if self == other {
            self
        } else if self == DiffType::Unmodified {
            other
        } else if other == DiffType::Unmodified {
            self
        } else {
            DiffType::Modified
        }
    }
}

impl std::fmt::Display for DiffType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DiffType::Unmodified => write!(f, "unmodified"),
            DiffType::Added => write!(f, "added"),
            DiffType::Removed => write!(f, "removed"),
            DiffType::Modified => write!(f, "modified"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::DiffType::{self, *};

    const ALL: [DiffType; 4] = [Unmodified, Added, Removed, Modified];

    #[test]
    fn test_merge_identity() {
        for d in ALL {
            assert_eq!(Unmodified.merge(d), d);
            assert_eq!(d.merge(Unmodified), d);
        }
    }

    #[test]
    fn test_merge_idempotent() {
        for d in ALL {
            assert_eq!(d.merge(d), d);
        }
    }

    #[test]
    fn test_merge_added_removed_is_modified() {
        assert_eq!(Added.merge(Removed), Modified);
        assert_eq!(Removed.merge(Added), Modified);
    }

    #[test]
    fn test_merge_modified_absorbs() {
        for d in ALL {
            assert_eq!(Modified.merge(d), Modified);
            assert_eq!(d.merge(Modified), Modified);
        }
    }

    #[test]
    fn test_merge_commutative() {
        for a in ALL {
            for b in ALL {
                assert_eq!(a.merge(b), b.merge(a), "merge({a:?}, {b:?})");
            }
        }
    }

    #[test]
    fn test_merge_associative() {
        for a in ALL {
            for b in ALL {
                for c in ALL {
                    assert_eq!(
                        a.merge(b).merge(c),
                        a.merge(b.merge(c)),
                        "merge({a:?}, {b:?}, {c:?})"
                    );
                }
            }
        }
    }

    #[test]
    fn test_display() {
        assert_eq!(Unmodified.to_string(), "unmodified");
        assert_eq!(Added.to_string(), "added");
        assert_eq!(Removed.to_string(), "removed");
        assert_eq!(Modified.to_string(), "modified");
    }

    #[test]
    fn test_default_is_unmodified() {
        assert_eq!(DiffType::default(), Unmodified);
    }
}
