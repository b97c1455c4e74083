use std::collections::BTreeMap;
use std::ops::Range;

use serde::{Deserialize, Serialize};

use crate::error::RefsError;

/// A key/value pair attached to a half-open byte range of blip content
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Annotation {
    pub name: String,
    pub value: String,
    pub range: Range<usize>,
}

impl Annotation {
    pub fn new(name: impl Into<String>, value: impl Into<String>, range: Range<usize>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            range,
        }
    }
}

/// Annotation stamped onto freshly inserted text
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BundledAnnotation {
    pub key: String,
    pub value: String,
}

impl BundledAnnotation {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }

    /// Build a list from alternating keys and values: `[k1, v1, k2, v2, ...]`
    pub fn list_of(pairs: &[&str]) -> Result<Vec<Self>, RefsError> {
        if pairs.len() % 2 != 0 {
            return Err(RefsError::InvalidArgument(
                "bundled annotations need an even number of keys and values".to_string(),
            ));
        }
        Ok(pairs
            .chunks_exact(2)
            .map(|pair| Self::new(pair[0], pair[1]))
            .collect())
    }
}

/// Range-scoped annotation store, grouped by annotation name
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Annotations {
    store: BTreeMap<String, Vec<Annotation>>,
}

impl Annotations {
    pub fn new() -> Self {
        Self::default()
    }

    /// Annotate `range` with `name=value`.
    ///
    /// Overlapping or touching annotations with the same value are merged into the
    /// new one; overlapping annotations with a different value are cut back so the
    /// new value wins inside `range`.
    pub fn add(&mut self, name: &str, value: &str, range: Range<usize>) {
        if range.is_empty() {
            return;
        }
        let Range { mut start, mut end } = range;

        let existing = self.store.remove(name).unwrap_or_default();
        let mut kept = Vec::with_capacity(existing.len() + 1);
        for annotation in existing {
            let Range { start: a_start, end: a_end } = annotation.range.clone();
            if a_end < start || a_start > end {
                kept.push(annotation);
            } else if annotation.value == value {
                start = start.min(a_start);
                end = end.max(a_end);
            } else {
                if a_start < start {
                    kept.push(Annotation::new(name, &annotation.value, a_start..start));
                }
                if a_end > end {
                    kept.push(Annotation::new(name, &annotation.value, end..a_end));
                }
            }
        }
        kept.push(Annotation::new(name, value, start..end));
        kept.sort_by_key(|annotation| annotation.range.start);
        self.store.insert(name.to_string(), kept);
    }

    /// Remove `name` from every offset in `range`, trimming partially covered annotations
    pub fn delete(&mut self, name: &str, range: Range<usize>) {
        let Some(existing) = self.store.remove(name) else {
            return;
        };

        let mut kept = Vec::with_capacity(existing.len() + 1);
        for annotation in existing {
            let Range { start: a_start, end: a_end } = annotation.range.clone();
            if a_end <= range.start || a_start >= range.end {
                kept.push(annotation);
                continue;
            }
            if a_start < range.start {
                kept.push(Annotation::new(name, &annotation.value, a_start..range.start));
            }
            if a_end > range.end {
                kept.push(Annotation::new(name, &annotation.value, range.end..a_end));
            }
        }

        if !kept.is_empty() {
            self.store.insert(name.to_string(), kept);
        }
    }

    /// Remove every annotation, whatever its name, from `range`
    pub fn delete_range(&mut self, range: Range<usize>) {
        let names: Vec<String> = self.store.keys().cloned().collect();
        for name in names {
            self.delete(&name, range.clone());
        }
    }

    /// Move every boundary at or after `pivot` by `delta`
    pub fn shift(&mut self, pivot: usize, delta: isize) {
        if delta == 0 {
            return;
        }
        for annotations in self.store.values_mut() {
            for annotation in annotations.iter_mut() {
                if annotation.range.start >= pivot {
                    annotation.range.start = annotation.range.start.saturating_add_signed(delta);
                }
                if annotation.range.end >= pivot {
                    annotation.range.end = annotation.range.end.saturating_add_signed(delta);
                }
            }
            annotations.retain(|annotation| annotation.range.start < annotation.range.end);
        }
        self.store.retain(|_, annotations| !annotations.is_empty());
    }

    pub fn get(&self, name: &str) -> &[Annotation] {
        self.store.get(name).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.store.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Annotation> {
        self.store.values().flatten()
    }

    pub fn len(&self) -> usize {
        self.store.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }
}

impl FromIterator<Annotation> for Annotations {
    fn from_iter<T: IntoIterator<Item = Annotation>>(iter: T) -> Self {
        let mut annotations = Annotations::new();
        for annotation in iter {
            annotations.add(&annotation.name, &annotation.value, annotation.range);
        }
        annotations
    }
}
