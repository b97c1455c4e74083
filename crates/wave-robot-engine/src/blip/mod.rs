//! # Blip document view
//!
//! A blip is the unit of content a robot edits. It holds three stores:
//!
//! - **`document`**: the [`Blip`] itself with its rope-backed text, the
//!   offset→element map and the splice/shift primitives that keep them aligned
//! - **`element`**: [`Element`]s, their [`ElementType`] tags and the
//!   [`BlipContent`] union of text and elements used as edit arguments
//! - **`annotations`**: the range-scoped [`Annotations`] store and the
//!   [`BundledAnnotation`]s stamped onto inserted text
//!
//! Blips are owned by a single robot invocation; nothing here is shared or locked.

pub mod annotations;
pub mod document;
pub mod element;

pub use annotations::{Annotation, Annotations, BundledAnnotation};
pub use document::{Blip, BlipSnapshot};
pub use element::{BlipContent, Element, ElementType, Restriction};
