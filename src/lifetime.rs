//! Service lifetime definitions.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Service lifetimes as declared in the composition root.
///
/// Lifetimes are totally ordered by [`rank`](Lifetime::rank): a lower rank
/// means a longer-lived instance. A consumer may only hold dependencies whose
/// rank is less than or equal to its own; holding a higher-ranked dependency
/// keeps it alive past its intended lifetime (a captive dependency).
///
/// # Examples
///
/// ```rust
/// use ferrous_di_analyzer::Lifetime;
///
/// assert!(Lifetime::Singleton < Lifetime::Scoped);
/// assert!(Lifetime::Scoped < Lifetime::Transient);
/// assert_eq!(Lifetime::Scoped.rank(), 1);
/// assert_eq!(Lifetime::Transient.word(), "transient");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Lifetime {
    /// Single instance per root provider, cached forever
    Singleton,
    /// Single instance per scope, cached for the scope's lifetime
    Scoped,
    /// New instance per resolution, never cached
    Transient,
}

impl Lifetime {
    /// Rank used for captive-dependency comparison. Lower is longer-lived.
    pub const fn rank(self) -> u8 {
        match self {
            Lifetime::Singleton => 0,
            Lifetime::Scoped => 1,
            Lifetime::Transient => 2,
        }
    }

    /// Lowercase word used in diagnostic messages.
    pub const fn word(self) -> &'static str {
        match self {
            Lifetime::Singleton => "singleton",
            Lifetime::Scoped => "scoped",
            Lifetime::Transient => "transient",
        }
    }

    /// Returns true if a consumer with this lifetime would capture `dependency`.
    pub const fn captures(self, dependency: Lifetime) -> bool {
        self.rank() < dependency.rank()
    }
}

impl fmt::Display for Lifetime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Lifetime::Singleton => "Singleton",
            Lifetime::Scoped => "Scoped",
            Lifetime::Transient => "Transient",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rank_order_matches_derive_order() {
        let all = [Lifetime::Singleton, Lifetime::Scoped, Lifetime::Transient];
        for a in all {
            for b in all {
                assert_eq!(a.rank().cmp(&b.rank()), a.cmp(&b));
            }
        }
    }

    #[test]
    fn captures_only_shorter_lived() {
        assert!(Lifetime::Singleton.captures(Lifetime::Scoped));
        assert!(Lifetime::Singleton.captures(Lifetime::Transient));
        assert!(Lifetime::Scoped.captures(Lifetime::Transient));
        assert!(!Lifetime::Scoped.captures(Lifetime::Scoped));
        assert!(!Lifetime::Transient.captures(Lifetime::Singleton));
    }

    #[test]
    fn serde_uses_snake_case() {
        let json = serde_json::to_string(&Lifetime::Scoped).unwrap();
        assert_eq!(json, "\"scoped\"");
        let back: Lifetime = serde_json::from_str("\"transient\"").unwrap();
        assert_eq!(back, Lifetime::Transient);
    }
}
