use std::collections::BTreeMap;
use std::ops::Range;

use serde::{Deserialize, Serialize};
use xi_rope::Rope;
use xi_rope::delta::Builder;

use crate::blip::{Annotation, Annotations, BlipContent, Element};
use crate::error::{BlipError, RefsError};

/// The document view a robot edits: one blip of a wavelet
///
/// A blip owns three stores that must stay consistent with each other:
///
/// - **Content**: the text, held in an `xi_rope::Rope` and only changed through
///   the crate's validated splice. Offsets are byte offsets into this text.
/// - **Elements**: rich objects keyed by the single offset they occupy. Each one
///   has a placeholder character in the content.
/// - **Annotations**: key/value pairs over half-open ranges.
///
/// Any change of content length has to be followed by [`Blip::shift`] so element
/// offsets and annotation boundaries keep pointing at the same text. Callers that
/// batch edits (see [`crate::refs::ContentRefs`]) go through these primitives
/// directly, in the order the edit requires.
#[derive(Debug, Clone)]
pub struct Blip {
    pub(crate) blip_id: String,
    pub(crate) wave_id: String,
    pub(crate) wavelet_id: String,
    pub(crate) buffer: Rope,
    pub(crate) elements: BTreeMap<usize, Element>,
    pub(crate) annotations: Annotations,
    /// Incremented on every content splice
    pub(crate) version: u64,
}

impl Blip {
    pub fn new(blip_id: impl Into<String>, content: &str) -> Self {
        Self {
            blip_id: blip_id.into(),
            wave_id: String::new(),
            wavelet_id: String::new(),
            buffer: Rope::from(content),
            elements: BTreeMap::new(),
            annotations: Annotations::new(),
            version: 0,
        }
    }

    /// Attach the wave and wavelet this blip belongs to
    pub fn with_wavelet(mut self, wave_id: impl Into<String>, wavelet_id: impl Into<String>) -> Self {
        self.wave_id = wave_id.into();
        self.wavelet_id = wavelet_id.into();
        self
    }

    /// Load a blip from its JSON snapshot
    pub fn from_json(json: &str) -> Result<Self, BlipError> {
        let snapshot: BlipSnapshot = serde_json::from_str(json)?;
        Self::try_from(snapshot)
    }

    pub fn to_json(&self) -> Result<String, BlipError> {
        Ok(serde_json::to_string_pretty(&self.snapshot())?)
    }

    pub fn snapshot(&self) -> BlipSnapshot {
        BlipSnapshot {
            blip_id: self.blip_id.clone(),
            wave_id: self.wave_id.clone(),
            wavelet_id: self.wavelet_id.clone(),
            content: self.content(),
            elements: self.elements.clone(),
            annotations: self.annotations.iter().cloned().collect(),
        }
    }

    pub fn blip_id(&self) -> &str {
        &self.blip_id
    }

    pub fn wave_id(&self) -> &str {
        &self.wave_id
    }

    pub fn wavelet_id(&self) -> &str {
        &self.wavelet_id
    }

    pub fn content(&self) -> String {
        self.buffer.to_string()
    }

    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.len() == 0
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn elements(&self) -> &BTreeMap<usize, Element> {
        &self.elements
    }

    pub fn element(&self, offset: usize) -> Option<&Element> {
        self.elements.get(&offset)
    }

    pub fn annotations(&self) -> &Annotations {
        &self.annotations
    }

    pub fn annotations_mut(&mut self) -> &mut Annotations {
        &mut self.annotations
    }

    /// Anchor `element` at `offset`, replacing whatever element was there
    pub fn put_element(&mut self, offset: usize, element: Element) -> Result<Option<Element>, RefsError> {
        if offset >= self.len() {
            return Err(RefsError::PositionOutOfBounds {
                start: offset,
                end: offset + 1,
                len: self.len(),
            });
        }
        Ok(self.elements.insert(offset, element))
    }

    /// Plain text of `range`, which must lie inside the content on char boundaries
    pub(crate) fn text_in(&self, range: Range<usize>) -> String {
        self.buffer.slice_to_cow(range).into_owned()
    }

    /// What a match over `range` refers to: the element when the range is one
    /// offset wide and an element lives there, the plain text otherwise.
    /// `range` must already have passed range validation.
    pub(crate) fn content_at(&self, range: Range<usize>) -> BlipContent {
        if range.len() == 1
            && let Some(element) = self.elements.get(&range.start)
        {
            return BlipContent::Element(element.clone());
        }
        BlipContent::Plaintext(self.text_in(range))
    }

    pub(crate) fn is_boundary(&self, offset: usize) -> bool {
        offset == self.len() || (offset < self.len() && self.buffer.is_codepoint_boundary(offset))
    }

    /// Replace `range` of the content with `text`.
    ///
    /// Only the text changes; elements and annotations are left where they are.
    /// `range` must lie inside the content on char boundaries.
    pub(crate) fn splice(&mut self, range: Range<usize>, text: &str) {
        let mut builder = Builder::new(self.buffer.len());
        builder.replace(range, Rope::from(text));
        let delta = builder.build();
        self.buffer = delta.apply(&self.buffer);
        self.version += 1;
    }

    /// Shift element offsets and annotation boundaries at or after `pivot` by `delta`
    pub fn shift(&mut self, pivot: usize, delta: isize) {
        if delta == 0 {
            return;
        }
        let moved = self.elements.split_off(&pivot);
        for (offset, element) in moved {
            self.elements.insert(offset.saturating_add_signed(delta), element);
        }
        self.annotations.shift(pivot, delta);
    }

    /// Drop every element anchored inside `range`
    pub fn remove_elements(&mut self, range: Range<usize>) {
        let mut tail = self.elements.split_off(&range.start);
        let mut after = tail.split_off(&range.end);
        self.elements.append(&mut after);
    }

    /// Drop every annotation, of any key, from `range`
    pub fn delete_annotations(&mut self, range: Range<usize>) {
        self.annotations.delete_range(range);
    }
}

/// Serialized form of a [`Blip`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlipSnapshot {
    pub blip_id: String,
    #[serde(default)]
    pub wave_id: String,
    #[serde(default)]
    pub wavelet_id: String,
    pub content: String,
    #[serde(default)]
    pub elements: BTreeMap<usize, Element>,
    #[serde(default)]
    pub annotations: Vec<Annotation>,
}

impl TryFrom<BlipSnapshot> for Blip {
    type Error = BlipError;

    fn try_from(snapshot: BlipSnapshot) -> Result<Self, Self::Error> {
        let len = snapshot.content.len();
        if let Some((&offset, _)) = snapshot.elements.iter().find(|(offset, _)| **offset >= len) {
            return Err(BlipError::ElementOutOfBounds { offset, len });
        }
        if let Some(annotation) = snapshot
            .annotations
            .iter()
            .find(|annotation| annotation.range.start > annotation.range.end || annotation.range.end > len)
        {
            return Err(BlipError::AnnotationOutOfBounds {
                name: annotation.name.clone(),
                start: annotation.range.start,
                end: annotation.range.end,
                len,
            });
        }

        Ok(Self {
            blip_id: snapshot.blip_id,
            wave_id: snapshot.wave_id,
            wavelet_id: snapshot.wavelet_id,
            buffer: Rope::from(snapshot.content.as_str()),
            elements: snapshot.elements,
            annotations: snapshot.annotations.into_iter().collect(),
            version: 0,
        })
    }
}
