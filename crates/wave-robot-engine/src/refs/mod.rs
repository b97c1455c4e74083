//! # Content references
//!
//! Batched edits over every match of a selection in a [`crate::Blip`].
//!
//! ## How a batch runs
//!
//! 1. A selection constructor on `Blip` (`all`, `first`, `all_elements`, `at`,
//!    `range`, ...) builds a [`ContentRefs`] around one [`HitIterator`]:
//!    - [`TextMatcher`]: occurrences of a literal string
//!    - [`ElementMatcher`]: elements of one type matching property restrictions
//!    - [`Singleshot`]: one explicit range
//! 2. A mutating call (`insert`, `insert_after`, `replace`, `delete`, `annotate`,
//!    `clear_annotation`, `update_element`) pulls matches one at a time, validates
//!    each against the blip as it is at that moment and applies the edit before
//!    pulling the next. Arguments are used round-robin, so one argument can be
//!    stamped onto every match.
//! 3. The iterator's cursor is shifted after each edit so the scan continues right
//!    after the edited text.
//! 4. The whole batch is folded into one [`crate::ops::BatchOperation`] carrying
//!    the modify action and the selection descriptor, and handed to the sink.
//!
//! Nothing is emitted when the selection has no match.

pub mod args;
pub mod content_refs;
pub mod hits;

pub use args::{ContentArg, ContentFn, PropertiesArg, PropertiesFn};
pub use content_refs::{ContentRefs, Ranges};
pub use hits::{ElementMatcher, HitIterator, Singleshot, TextMatcher};
