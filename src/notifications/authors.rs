//! Mapping from build-system author names to public feed handles.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::build::ChangeEntry;

/// Shown in place of the author list when no change author is known ("no idea who")
pub const UNKNOWN_AUTHOR: &str = "\u{4E0D}\u{77E5}\u{9053}\u{662F}\u{8C01}";

const AUTHOR_SEPARATOR: char = ' ';

/// A single configured name -> handle pair
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AuthorMapping {
    /// Display name as reported by the build system
    pub member_name: String,
    /// Handle on the social feed, without the leading `@`
    pub handle: String,
}

/// Immutable snapshot of the configured author mappings
#[derive(Debug, Clone, Default)]
pub struct AuthorDirectory {
    handles: HashMap<String, String>,
}

impl AuthorDirectory {
    /// Build a directory from an ordered list of mappings.
    ///
    /// Entries with a blank name or handle are dropped; a later entry for the
    /// same name replaces an earlier one.
    pub fn from_mappings<'a, I>(mappings: I) -> Self
    where
        I: IntoIterator<Item = &'a AuthorMapping>,
    {
        let handles = mappings
            .into_iter()
            .filter(|m| !m.member_name.is_empty() && !m.handle.is_empty())
            .map(|m| (m.member_name.clone(), m.handle.clone()))
            .collect();
        Self { handles }
    }

    pub fn lookup(&self, member_name: &str) -> Option<&str> {
        self.handles.get(member_name).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    /// Render the author block for a change set.
    ///
    /// Known authors become `@handle`, in change-set order, space separated and
    /// followed by one trailing space. When nobody is known the block is
    /// [`UNKNOWN_AUTHOR`] plus the same trailing space, so it is never empty.
    pub fn resolve(&self, changes: &[ChangeEntry]) -> String {
        let mentions: Vec<String> = changes
            .iter()
            .filter_map(|entry| self.lookup(&entry.author))
            .map(|handle| format!("@{}", handle))
            .collect();

        let mut block = if mentions.is_empty() {
            UNKNOWN_AUTHOR.to_string()
        } else {
            mentions.join(&AUTHOR_SEPARATOR.to_string())
        };
        block.push(AUTHOR_SEPARATOR);
        block
    }
}
