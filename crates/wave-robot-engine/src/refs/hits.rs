use std::collections::BTreeMap;
use std::ops::Range;

use xi_rope::Cursor;
use xi_rope::find::{CaseMatching, find};

use crate::blip::{Blip, ElementType};

/// Lazy, restartable producer of matched ranges over a live blip
///
/// Every call to [`HitIterator::next_hit`] reads the blip as it is *now*, so
/// edits applied between two calls are visible to the later one. Iterators that
/// keep a cursor into the content must be told about those edits through
/// [`HitIterator::shift`].
pub trait HitIterator {
    /// The next matched range, or `None` once exhausted
    fn next_hit(&mut self, blip: &Blip) -> Option<Range<usize>>;

    /// The content around `pivot` changed length by `delta`
    fn shift(&mut self, pivot: usize, delta: isize);

    /// Restart from the beginning
    fn reset(&mut self);
}

/// Remaining hit budget; `None` means unbounded
fn take_hit(hits_left: &mut Option<usize>) -> bool {
    match hits_left {
        Some(0) => false,
        Some(left) => {
            *left -= 1;
            true
        }
        None => true,
    }
}

/// Successive non-overlapping occurrences of a literal string
#[derive(Debug, Clone)]
pub struct TextMatcher {
    target: String,
    max_hits: Option<usize>,
    hits_left: Option<usize>,
    /// Start of the previous hit, -1 before the first
    from: isize,
}

impl TextMatcher {
    pub fn new(target: impl Into<String>, max_hits: Option<usize>) -> Self {
        Self {
            target: target.into(),
            max_hits,
            hits_left: max_hits,
            from: -1,
        }
    }
}

impl HitIterator for TextMatcher {
    fn next_hit(&mut self, blip: &Blip) -> Option<Range<usize>> {
        if !take_hit(&mut self.hits_left) || self.target.is_empty() {
            return None;
        }

        let rope = &blip.buffer;
        let mut begin = (self.from + 1).max(0) as usize;
        while begin < rope.len() && !rope.is_codepoint_boundary(begin) {
            begin += 1;
        }
        if begin >= rope.len() {
            return None;
        }

        let mut cursor = Cursor::new(rope, begin);
        let mut lines = rope.lines_raw(begin..rope.len());
        let found = find(&mut cursor, &mut lines, CaseMatching::Exact, &self.target, None)?;
        self.from = found as isize;
        Some(found..found + self.target.len())
    }

    fn shift(&mut self, pivot: usize, delta: isize) {
        if self.from != -1 && pivot as isize - 1 <= self.from {
            self.from += delta;
        }
    }

    fn reset(&mut self) {
        self.hits_left = self.max_hits;
        self.from = -1;
    }
}

/// Elements of one type whose properties satisfy every restriction, in offset order
#[derive(Debug, Clone)]
pub struct ElementMatcher {
    element_type: ElementType,
    restrictions: BTreeMap<String, String>,
    max_hits: Option<usize>,
    hits_left: Option<usize>,
    /// Offset of the previous hit, -1 before the first
    index: isize,
}

impl ElementMatcher {
    pub fn new(
        element_type: ElementType,
        restrictions: BTreeMap<String, String>,
        max_hits: Option<usize>,
    ) -> Self {
        Self {
            element_type,
            restrictions,
            max_hits,
            hits_left: max_hits,
            index: -1,
        }
    }
}

impl HitIterator for ElementMatcher {
    fn next_hit(&mut self, blip: &Blip) -> Option<Range<usize>> {
        if !take_hit(&mut self.hits_left) {
            return None;
        }

        let after = (self.index + 1).max(0) as usize;
        let (&offset, _) = blip
            .elements()
            .range(after..)
            .find(|(_, element)| element.matches(self.element_type, &self.restrictions))?;
        self.index = offset as isize;
        Some(offset..offset + 1)
    }

    // The element map is re-read on every call, but the cursor is an offset into
    // it and has to follow edits or a hit can be revisited after an insertion.
    fn shift(&mut self, pivot: usize, delta: isize) {
        if self.index != -1 && pivot as isize - 1 <= self.index {
            self.index += delta;
        }
    }

    fn reset(&mut self) {
        self.hits_left = self.max_hits;
        self.index = -1;
    }
}

/// A single caller-supplied range, yielded once
#[derive(Debug, Clone)]
pub struct Singleshot {
    range: Range<usize>,
    called: bool,
}

impl Singleshot {
    pub fn new(range: Range<usize>) -> Self {
        Self {
            range,
            called: false,
        }
    }
}

impl HitIterator for Singleshot {
    fn next_hit(&mut self, _blip: &Blip) -> Option<Range<usize>> {
        if self.called {
            return None;
        }
        self.called = true;
        Some(self.range.clone())
    }

    fn shift(&mut self, _pivot: usize, _delta: isize) {}

    fn reset(&mut self) {
        self.called = false;
    }
}
