//! Conflict taxonomy.
//!
//! A conflict is an edit the merger could not reconcile on its own. It is
//! resolved by the active merge policy (ours by default) and reported, never
//! raised as an error. Every conflict carries both sides' raw values plus the
//! nullable ancestor value so a manual-resolution tool can revisit it.

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The closed set of conflict variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConflictKind {
    /// Both sides changed (or independently introduced) an attribute to
    /// different values.
    BothEditedAttribute,
    /// One side removed an attribute the other side changed.
    RemovedVsEditedAttribute,
    /// Both sides changed an element's text differently.
    BothEditedText,
    /// One side emptied an element's text the other side changed.
    RemovedVsEditedText,
    /// One side removed a child record the other side changed.
    RemovedVsEditedElement,
}

impl ConflictKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConflictKind::BothEditedAttribute => "both-edited-attribute",
            ConflictKind::RemovedVsEditedAttribute => "removed-vs-edited-attribute",
            ConflictKind::BothEditedText => "both-edited-text",
            ConflictKind::RemovedVsEditedText => "removed-vs-edited-text",
            ConflictKind::RemovedVsEditedElement => "removed-vs-edited-element",
        }
    }
}

impl fmt::Display for ConflictKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which side's value a conflict was resolved to.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Winner {
    #[default]
    Ours,
    Theirs,
}

impl fmt::Display for Winner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Winner::Ours => f.write_str("ours"),
            Winner::Theirs => f.write_str("theirs"),
        }
    }
}

/// A reported conflict.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Conflict {
    pub guid: Uuid,
    pub kind: ConflictKind,
    /// Attribute name for attribute conflicts, element name otherwise.
    pub field: String,
    /// Path of the element the conflict was found in.
    pub context: String,
    /// `None` means the side removed (or never had) the value.
    pub ours: Option<String>,
    pub theirs: Option<String>,
    pub ancestor: Option<String>,
    /// Name of the merge policy that decided the winner.
    pub policy: String,
    pub winner: Winner,
}

impl Conflict {
    pub fn new(
        kind: ConflictKind,
        field: impl Into<String>,
        ours: Option<String>,
        theirs: Option<String>,
        ancestor: Option<String>,
    ) -> Self {
        Self {
            guid: Uuid::new_v4(),
            kind,
            field: field.into(),
            context: String::new(),
            ours,
            theirs,
            ancestor,
            policy: "ours".into(),
            winner: Winner::Ours,
        }
    }

    pub fn in_context(mut self, context: impl Into<String>) -> Self {
        self.context = context.into();
        self
    }

    pub fn decided_by(mut self, policy: impl Into<String>, winner: Winner) -> Self {
        self.policy = policy.into();
        self.winner = winner;
        self
    }

    /// The value kept in the merged tree; `None` when the winner removed it.
    pub fn winner_value(&self) -> Option<&str> {
        match self.winner {
            Winner::Ours => self.ours.as_deref(),
            Winner::Theirs => self.theirs.as_deref(),
        }
    }

    /// Human-readable description of what happened.
    pub fn description(&self) -> String {
        let what = match self.kind {
            ConflictKind::BothEditedAttribute => format!(
                "Both edited attribute '{}': ours {}, theirs {}, ancestor {}",
                self.field,
                quoted(&self.ours),
                quoted(&self.theirs),
                quoted(&self.ancestor)
            ),
            ConflictKind::RemovedVsEditedAttribute => {
                let (remover, editor, value) = self.removal_sides();
                format!(
                    "{} removed attribute '{}' while {} changed it to {} (ancestor {})",
                    remover,
                    self.field,
                    editor,
                    quoted(value),
                    quoted(&self.ancestor)
                )
            }
            ConflictKind::BothEditedText => format!(
                "Both edited the text of <{}>: ours {}, theirs {}, ancestor {}",
                self.field,
                quoted(&self.ours),
                quoted(&self.theirs),
                quoted(&self.ancestor)
            ),
            ConflictKind::RemovedVsEditedText => {
                let (remover, editor, value) = self.removal_sides();
                format!(
                    "{} removed the text of <{}> while {} changed it to {}",
                    remover,
                    self.field,
                    editor,
                    quoted(value)
                )
            }
            ConflictKind::RemovedVsEditedElement => {
                let (remover, editor, _) = self.removal_sides();
                format!(
                    "{} removed a <{}> element that {} edited",
                    remover, self.field, editor
                )
            }
        };
        if self.context.is_empty() {
            format!("{what}; kept {}", self.winner)
        } else {
            format!("{what} in {}; kept {}", self.context, self.winner)
        }
    }

    fn removal_sides(&self) -> (&'static str, &'static str, &Option<String>) {
        if self.ours.is_none() {
            ("We", "they", &self.theirs)
        } else {
            ("They", "we", &self.ours)
        }
    }
}

impl fmt::Display for Conflict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.description())
    }
}

fn quoted(value: &Option<String>) -> String {
    match value {
        Some(v) => format!("'{v}'"),
        None => "absent".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn both_edited_description_names_all_values() {
        let conflict = Conflict::new(
            ConflictKind::BothEditedAttribute,
            "pos",
            Some("a".into()),
            Some("b".into()),
            Some("x".into()),
        )
        .in_context("lift/entry[e1]");
        assert_eq!(
            conflict.description(),
            "Both edited attribute 'pos': ours 'a', theirs 'b', ancestor 'x' in lift/entry[e1]; kept ours"
        );
    }

    #[test]
    fn removal_direction_follows_the_missing_side() {
        let we_removed = Conflict::new(
            ConflictKind::RemovedVsEditedAttribute,
            "pos",
            None,
            Some("y".into()),
            Some("x".into()),
        );
        assert!(we_removed.description().starts_with("We removed attribute 'pos'"));

        let they_removed = Conflict::new(
            ConflictKind::RemovedVsEditedAttribute,
            "pos",
            Some("y".into()),
            None,
            Some("x".into()),
        );
        assert!(they_removed.description().starts_with("They removed attribute 'pos'"));
    }

    #[test]
    fn winner_value_follows_decision() {
        let conflict = Conflict::new(
            ConflictKind::BothEditedText,
            "gloss",
            Some("ours".into()),
            Some("theirs".into()),
            None,
        );
        assert_eq!(conflict.winner_value(), Some("ours"));
        let conflict = conflict.decided_by("prefer-theirs", Winner::Theirs);
        assert_eq!(conflict.winner_value(), Some("theirs"));
        assert_eq!(conflict.policy, "prefer-theirs");
    }

    #[test]
    fn every_conflict_gets_its_own_guid() {
        let a = Conflict::new(ConflictKind::BothEditedText, "t", None, None, None);
        let b = Conflict::new(ConflictKind::BothEditedText, "t", None, None, None);
        assert_ne!(a.guid, b.guid);
    }
}
