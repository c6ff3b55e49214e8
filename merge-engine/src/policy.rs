//! Merge policies.
//!
//! A policy decides which side wins a conflict and may supply its own
//! rendering for it. Without an override, ours always wins.

use crate::conflict::{Conflict, Winner};

/// Resolution policy consulted for every conflict.
pub trait MergePolicy: Send + Sync {
    /// Name recorded on each conflict this policy decides.
    fn name(&self) -> &str;

    /// Side whose value is kept in the merged tree.
    fn winner(&self, _conflict: &Conflict) -> Winner {
        Winner::Ours
    }

    /// Custom description; `None` falls back to the conflict's own.
    fn describe(&self, _conflict: &Conflict) -> Option<String> {
        None
    }

    /// Render a conflict, preferring the policy's own wording.
    fn render(&self, conflict: &Conflict) -> String {
        self.describe(conflict)
            .unwrap_or_else(|| conflict.description())
    }
}

/// Ours wins every conflict.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultPolicy;

impl MergePolicy for DefaultPolicy {
    fn name(&self) -> &str {
        "ours"
    }
}

/// A fixed side wins every conflict.
#[derive(Debug, Clone, Copy)]
pub struct PreferSide(pub Winner);

impl MergePolicy for PreferSide {
    fn name(&self) -> &str {
        match self.0 {
            Winner::Ours => "prefer-ours",
            Winner::Theirs => "prefer-theirs",
        }
    }

    fn winner(&self, _conflict: &Conflict) -> Winner {
        self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conflict::ConflictKind;

    struct Shouting;

    impl MergePolicy for Shouting {
        fn name(&self) -> &str {
            "shouting"
        }

        fn describe(&self, conflict: &Conflict) -> Option<String> {
            Some(conflict.field.to_uppercase())
        }
    }

    fn sample() -> Conflict {
        Conflict::new(
            ConflictKind::BothEditedAttribute,
            "pos",
            Some("a".into()),
            Some("b".into()),
            None,
        )
    }

    #[test]
    fn default_policy_prefers_ours() {
        assert_eq!(DefaultPolicy.winner(&sample()), Winner::Ours);
        assert_eq!(DefaultPolicy.render(&sample()), sample().description());
    }

    #[test]
    fn prefer_side_is_fixed() {
        assert_eq!(PreferSide(Winner::Theirs).winner(&sample()), Winner::Theirs);
        assert_eq!(PreferSide(Winner::Theirs).name(), "prefer-theirs");
    }

    #[test]
    fn custom_rendering_overrides_description() {
        assert_eq!(Shouting.render(&sample()), "POS");
    }
}
