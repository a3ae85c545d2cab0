use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::id::AccountId;

/// A votable label with its allowed value range.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabelType {
    pub name: String,
    pub min: i16,
    pub max: i16,
}

impl LabelType {
    pub fn new(name: impl Into<String>, min: i16, max: i16) -> Self {
        Self {
            name: name.into(),
            min,
            max,
        }
    }

    pub fn clamp(&self, value: i16) -> i16 {
        value.clamp(self.min, self.max)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabelTypes {
    by_name: BTreeMap<String, LabelType>,
}

impl LabelTypes {
    pub fn new(labels: impl IntoIterator<Item = LabelType>) -> Self {
        Self {
            by_name: labels.into_iter().map(|l| (l.name.clone(), l)).collect(),
        }
    }

    pub fn by_label(&self, name: &str) -> Option<&LabelType> {
        self.by_name.get(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &LabelType> {
        self.by_name.values()
    }

    pub fn len(&self) -> usize {
        self.by_name.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_name.is_empty()
    }
}

/// Inclusive range of values an account may vote on a label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionRange {
    pub min: i16,
    pub max: i16,
}

impl PermissionRange {
    pub fn new(min: i16, max: i16) -> Self {
        Self { min, max }
    }

    pub fn contains(&self, value: i16) -> bool {
        (self.min..=self.max).contains(&value)
    }

    pub fn clamp(&self, value: i16) -> i16 {
        value.clamp(self.min, self.max)
    }
}

/// Per-label, per-account voting grants.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AccessGrants {
    grants: BTreeMap<(String, AccountId), PermissionRange>,
}

impl AccessGrants {
    pub fn grant(&mut self, label: impl Into<String>, account: AccountId, range: PermissionRange) {
        self.grants.insert((label.into(), account), range);
    }

    pub fn range(&self, label: &str, account: AccountId) -> Option<PermissionRange> {
        self.grants.get(&(label.to_string(), account)).copied()
    }

    pub fn len(&self) -> usize {
        self.grants.len()
    }

    pub fn is_empty(&self) -> bool {
        self.grants.is_empty()
    }
}
