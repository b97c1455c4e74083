use std::collections::BTreeMap;
use std::ops::Range;

use crate::blip::{Blip, BlipContent, BundledAnnotation, Element, ElementType, Restriction};
use crate::error::RefsError;
use crate::ops::{BatchOperation, DocumentModifyAction, ModifyHow, OperationSink, SelectionDescriptor};
use crate::refs::args::{ContentArg, PropertiesArg};
use crate::refs::hits::{ElementMatcher, HitIterator, Singleshot, TextMatcher};

/// Where new content goes relative to a matched range
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Placement {
    Before,
    After,
    Over,
}

/// The edit a batch applies to every match, with its arguments
enum Modification<'f> {
    Insert {
        placement: Placement,
        args: Vec<ContentArg<'f>>,
        bundled: Vec<BundledAnnotation>,
    },
    Delete,
    Annotate {
        key: String,
        values: Vec<String>,
    },
    ClearAnnotation {
        key: String,
    },
    UpdateElement {
        args: Vec<PropertiesArg<'f>>,
    },
}

impl Modification<'_> {
    fn how(&self) -> ModifyHow {
        match self {
            Modification::Insert { placement: Placement::Before, .. } => ModifyHow::Insert,
            Modification::Insert { placement: Placement::After, .. } => ModifyHow::InsertAfter,
            Modification::Insert { placement: Placement::Over, .. } => ModifyHow::Replace,
            Modification::Delete => ModifyHow::Delete,
            Modification::Annotate { .. } => ModifyHow::Annotate,
            Modification::ClearAnnotation { .. } => ModifyHow::ClearAnnotation,
            Modification::UpdateElement { .. } => ModifyHow::UpdateElement,
        }
    }

    fn check_arguments(&self) -> Result<(), RefsError> {
        let missing = match self {
            Modification::Insert { args, .. } => args.is_empty(),
            Modification::Annotate { values, .. } => values.is_empty(),
            Modification::UpdateElement { args } => args.is_empty(),
            Modification::Delete | Modification::ClearAnnotation { .. } => false,
        };
        if missing {
            return Err(RefsError::InvalidArgument(format!(
                "{:?} needs at least one argument",
                self.how()
            )));
        }
        Ok(())
    }
}

/// Bookkeeping carried across the matches of one batch
#[derive(Debug, Default)]
struct Walk {
    next_index: usize,
    hits: usize,
    /// Effective content argument of every match, in match order
    applied: Vec<BlipContent>,
    /// Fully merged element of every updated match
    updated: Vec<Element>,
}

impl Walk {
    /// Round-robin over the arguments so fewer arguments than matches wrap around
    fn next_arg<'s, T>(&mut self, args: &'s [T]) -> &'s T {
        let arg = &args[self.next_index];
        self.next_index = (self.next_index + 1) % args.len();
        arg
    }
}

/// A selection of ranges in a blip, and the batch edits that can be applied to them
///
/// A `ContentRefs` binds a [`HitIterator`] to a blip. Every mutating method walks
/// all matches in order, edits the blip in place after each one (so later matches
/// see the result), then hands a single [`BatchOperation`] to the
/// [`OperationSink`]. The iterator is reset afterwards so the same selection can
/// be reused for another batch against the edited blip.
///
/// When a match fails validation the error is returned at once. Edits already
/// applied to earlier matches of the same batch stay in place and no operation
/// is emitted.
///
/// ```rust
/// use wave_robot_engine::{Blip, OperationQueue};
///
/// let mut blip = Blip::new("b+1", "\ncatcat");
/// let mut queue = OperationQueue::new();
/// blip.all(&mut queue, "cat").replace(["dog"]).unwrap();
///
/// assert_eq!(blip.content(), "\ndogdog");
/// assert_eq!(queue.len(), 1);
/// ```
pub struct ContentRefs<'a> {
    blip: &'a mut Blip,
    sink: &'a mut dyn OperationSink,
    hits: Box<dyn HitIterator>,
    selection: SelectionDescriptor,
}

impl<'a> ContentRefs<'a> {
    pub fn new(
        blip: &'a mut Blip,
        sink: &'a mut dyn OperationSink,
        hits: Box<dyn HitIterator>,
        selection: SelectionDescriptor,
    ) -> Self {
        Self {
            blip,
            sink,
            hits,
            selection,
        }
    }

    pub fn selection(&self) -> &SelectionDescriptor {
        &self.selection
    }

    pub fn blip(&self) -> &Blip {
        &*self.blip
    }

    /// Insert content just before every match
    pub fn insert<'f, I>(&mut self, args: I) -> Result<&mut Self, RefsError>
    where
        I: IntoIterator,
        I::Item: Into<ContentArg<'f>>,
    {
        self.insert_with_annotations(Vec::new(), args)
    }

    /// Insert content before every match and stamp `bundled` onto the new text
    pub fn insert_with_annotations<'f, I>(
        &mut self,
        bundled: Vec<BundledAnnotation>,
        args: I,
    ) -> Result<&mut Self, RefsError>
    where
        I: IntoIterator,
        I::Item: Into<ContentArg<'f>>,
    {
        self.execute(Modification::Insert {
            placement: Placement::Before,
            args: args.into_iter().map(Into::into).collect(),
            bundled,
        })
    }

    /// Insert content just after every match
    pub fn insert_after<'f, I>(&mut self, args: I) -> Result<&mut Self, RefsError>
    where
        I: IntoIterator,
        I::Item: Into<ContentArg<'f>>,
    {
        self.insert_after_with_annotations(Vec::new(), args)
    }

    pub fn insert_after_with_annotations<'f, I>(
        &mut self,
        bundled: Vec<BundledAnnotation>,
        args: I,
    ) -> Result<&mut Self, RefsError>
    where
        I: IntoIterator,
        I::Item: Into<ContentArg<'f>>,
    {
        self.execute(Modification::Insert {
            placement: Placement::After,
            args: args.into_iter().map(Into::into).collect(),
            bundled,
        })
    }

    /// Replace every match with new content
    pub fn replace<'f, I>(&mut self, args: I) -> Result<&mut Self, RefsError>
    where
        I: IntoIterator,
        I::Item: Into<ContentArg<'f>>,
    {
        self.replace_with_annotations(Vec::new(), args)
    }

    pub fn replace_with_annotations<'f, I>(
        &mut self,
        bundled: Vec<BundledAnnotation>,
        args: I,
    ) -> Result<&mut Self, RefsError>
    where
        I: IntoIterator,
        I::Item: Into<ContentArg<'f>>,
    {
        self.execute(Modification::Insert {
            placement: Placement::Over,
            args: args.into_iter().map(Into::into).collect(),
            bundled,
        })
    }

    /// Delete every match. The leading newline at offset 0 is never deleted.
    pub fn delete(&mut self) -> Result<&mut Self, RefsError> {
        self.execute(Modification::Delete)
    }

    /// Annotate every match with `key`, cycling through `values`.
    ///
    /// With no values the key doubles as the value.
    pub fn annotate(&mut self, key: &str, values: &[&str]) -> Result<&mut Self, RefsError> {
        let values = if values.is_empty() {
            vec![key.to_string()]
        } else {
            values.iter().map(|value| value.to_string()).collect()
        };
        self.execute(Modification::Annotate {
            key: key.to_string(),
            values,
        })
    }

    /// Remove `key` from every match
    pub fn clear_annotation(&mut self, key: &str) -> Result<&mut Self, RefsError> {
        self.execute(Modification::ClearAnnotation {
            key: key.to_string(),
        })
    }

    /// Merge new properties into the element at every match
    pub fn update_element<'f, I>(&mut self, args: I) -> Result<&mut Self, RefsError>
    where
        I: IntoIterator,
        I::Item: Into<PropertiesArg<'f>>,
    {
        self.execute(Modification::UpdateElement {
            args: args.into_iter().map(Into::into).collect(),
        })
    }

    /// True when nothing matches
    pub fn is_empty(&mut self) -> bool {
        self.hits.reset();
        let empty = self.hits.next_hit(self.blip).is_none();
        self.hits.reset();
        empty
    }

    /// Content of every match: the element for single-offset element matches,
    /// the plain text otherwise. Does not consume the selection.
    pub fn values(&mut self) -> Result<Vec<BlipContent>, RefsError> {
        self.hits.reset();
        let values = self.collect_values(None);
        self.hits.reset();
        values
    }

    /// Content of the first match, if any
    pub fn value(&mut self) -> Result<Option<BlipContent>, RefsError> {
        self.hits.reset();
        let value = self.collect_values(Some(1));
        self.hits.reset();
        Ok(value?.into_iter().next())
    }

    /// Iterate the matched ranges against the blip as it is now
    pub fn iter(&mut self) -> Ranges<'_, 'a> {
        self.hits.reset();
        Ranges { refs: self }
    }

    fn collect_values(&mut self, limit: Option<usize>) -> Result<Vec<BlipContent>, RefsError> {
        let mut values = Vec::new();
        while limit.is_none_or(|limit| values.len() < limit) {
            let Some(range) = self.hits.next_hit(self.blip) else {
                break;
            };
            validate_range(self.blip, ModifyHow::Replace, range.start, range.end)?;
            values.push(self.blip.content_at(range));
        }
        Ok(values)
    }

    fn execute(&mut self, modification: Modification<'_>) -> Result<&mut Self, RefsError> {
        modification.check_arguments()?;
        let how = modification.how();

        self.hits.reset();
        let Some(mut range) = self.hits.next_hit(self.blip) else {
            log::debug!("{how:?} found no match for {:?}, nothing queued", self.selection);
            return Ok(self);
        };

        let mut walk = Walk::default();
        loop {
            log::trace!("{how:?} match #{} at {range:?}", walk.hits + 1);
            if let Err(err) = self.apply_hit(&modification, range, &mut walk) {
                self.hits.reset();
                if walk.hits > 0 {
                    log::warn!(
                        "{how:?} failed after {} applied match(es) on blip {}: {err}",
                        walk.hits,
                        self.blip.blip_id()
                    );
                }
                return Err(err);
            }
            walk.hits += 1;

            match self.hits.next_hit(self.blip) {
                Some(next) => range = next,
                None => break,
            }
        }

        let operation = BatchOperation {
            wave_id: self.blip.wave_id().to_string(),
            wavelet_id: self.blip.wavelet_id().to_string(),
            blip_id: self.blip.blip_id().to_string(),
            modify_action: encode_action(&modification, walk.applied, walk.updated),
            selection: self.selection.clone(),
        };
        log::debug!("{how:?} applied to {} match(es) on blip {}", walk.hits, self.blip.blip_id());
        self.sink.submit(operation);

        self.hits.reset();
        Ok(self)
    }

    fn apply_hit(
        &mut self,
        modification: &Modification<'_>,
        matched: Range<usize>,
        walk: &mut Walk,
    ) -> Result<(), RefsError> {
        let Range { mut start, end } = matched.clone();
        if matches!(modification, Modification::Delete) && start == 0 {
            start = 1;
        }
        validate_range(self.blip, modification.how(), start, end)?;

        match modification {
            Modification::Delete => {
                self.blip.remove_elements(start..end);
                self.blip.delete_annotations(start..end);
                self.blip.shift(end, start as isize - end as isize);
                self.blip.splice(start..end, "");
                // Always one back, whatever the deleted width; the cursor sits on
                // the match start and the next scan begins one past it.
                self.hits.shift(matched.start, -1);
            }
            Modification::Annotate { key, values } => {
                let value = walk.next_arg(values);
                self.blip.annotations.add(key, value, start..end);
            }
            Modification::ClearAnnotation { key } => {
                self.blip.annotations.delete(key, start..end);
            }
            Modification::UpdateElement { args } => {
                let arg = walk.next_arg(args);
                let properties = arg.resolve(|| self.blip.content_at(start..end));
                let element = self
                    .blip
                    .elements
                    .get_mut(&start)
                    .ok_or(RefsError::NoElementAtPosition(start))?;
                element.properties.extend(properties);
                walk.updated.push(element.clone());
            }
            Modification::Insert {
                placement,
                args,
                bundled,
            } => {
                let arg = walk.next_arg(args);
                // An insertion point may sit one past the end of the blip
                let visible_end = end.min(self.blip.len());
                let content = arg.resolve(|| self.blip.content_at(start..visible_end));
                let span = match placement {
                    Placement::Before => start..start,
                    Placement::After => end..end,
                    Placement::Over => start..end,
                };
                self.write_content(span.clone(), &content, bundled);
                self.advance_past(&matched, &span, content.text().len());
                walk.applied.push(content);
            }
        }
        Ok(())
    }

    /// Put `content` over `span`, keeping elements and annotations aligned
    fn write_content(&mut self, span: Range<usize>, content: &BlipContent, bundled: &[BundledAnnotation]) {
        let text = content.text();
        let new_len = text.len();

        if !span.is_empty() {
            if new_len < span.len() {
                self.blip.delete_annotations(span.start + new_len..span.end);
            }
            self.blip.remove_elements(span.clone());
        }
        self.blip
            .shift(span.end, new_len as isize + span.start as isize - span.end as isize);
        self.blip.splice(span.clone(), text);

        match content {
            BlipContent::Element(element) => {
                self.blip.elements.insert(span.start, element.clone());
            }
            BlipContent::Plaintext(_) => {
                for annotation in bundled {
                    self.blip.annotations.add(
                        &annotation.key,
                        &annotation.value,
                        span.start..span.start + new_len,
                    );
                }
            }
        }
    }

    /// Move the hit cursor so the next scan neither re-reads the new text nor
    /// skips what follows it
    fn advance_past(&mut self, matched: &Range<usize>, span: &Range<usize>, new_len: usize) {
        let mut delta = new_len as isize - 1;
        if span.is_empty() {
            delta += matched.len() as isize;
        }
        self.hits.shift(matched.start, delta);
    }
}

/// Iterator over the ranges of a [`ContentRefs`]; restarts the selection when dropped
pub struct Ranges<'r, 'a> {
    refs: &'r mut ContentRefs<'a>,
}

impl Iterator for Ranges<'_, '_> {
    type Item = Range<usize>;

    fn next(&mut self) -> Option<Self::Item> {
        self.refs.hits.next_hit(self.refs.blip)
    }
}

impl Drop for Ranges<'_, '_> {
    fn drop(&mut self) {
        self.refs.hits.reset();
    }
}

/// Check that `start..end` can be edited with `how` in the blip as it is now
pub(crate) fn validate_range(blip: &Blip, how: ModifyHow, start: usize, end: usize) -> Result<(), RefsError> {
    let len = blip.len();
    let out_of_bounds = RefsError::PositionOutOfBounds { start, end, len };

    if len == 0 {
        return if start == 0 && end == 0 {
            Ok(())
        } else {
            Err(out_of_bounds)
        };
    }
    if end < 1 {
        return Err(out_of_bounds);
    }
    let within = match how {
        ModifyHow::Insert => start <= len,
        _ => start <= len && end <= len,
    };
    if !within {
        return Err(out_of_bounds);
    }
    if start >= end {
        return Err(RefsError::InvalidRange { start, end });
    }
    if !blip.is_boundary(start) || !blip.is_boundary(end.min(len)) {
        return Err(out_of_bounds);
    }
    Ok(())
}

/// Fold a finished batch into its modify action
fn encode_action(
    modification: &Modification<'_>,
    applied: Vec<BlipContent>,
    updated: Vec<Element>,
) -> DocumentModifyAction {
    let mut action = DocumentModifyAction::new(modification.how());
    match modification {
        Modification::Insert { args, bundled, .. } => {
            // Computed arguments only exist once evaluated, so send what each
            // match actually received; literal arguments go out as given.
            let payloads: Vec<BlipContent> = if args.iter().any(ContentArg::is_computed) {
                applied
            } else {
                args.iter()
                    .filter_map(|arg| match arg {
                        ContentArg::Literal(content) => Some(content.clone()),
                        ContentArg::Computed(_) => None,
                    })
                    .collect()
            };
            let (values, elements) = payloads
                .into_iter()
                .map(|content| match content {
                    BlipContent::Plaintext(text) => (Some(text), None),
                    BlipContent::Element(element) => (None, Some(element)),
                })
                .unzip();
            action.values = Some(values);
            action.elements = Some(elements);
            if !bundled.is_empty() {
                action.bundled_annotations = Some(bundled.clone());
            }
        }
        Modification::Delete => {}
        Modification::Annotate { key, values } => {
            action.values = Some(values.iter().cloned().map(Some).collect());
            action.annotation_key = Some(key.clone());
        }
        Modification::ClearAnnotation { key } => {
            action.annotation_key = Some(key.clone());
        }
        Modification::UpdateElement { .. } => {
            action.elements = Some(updated.into_iter().map(Some).collect());
        }
    }
    action
}

fn restriction_map(restrictions: &[Restriction]) -> Result<BTreeMap<String, String>, RefsError> {
    let mut map = BTreeMap::new();
    for restriction in restrictions {
        if let Some(previous) = map.insert(restriction.key.clone(), restriction.value.clone())
            && previous != restriction.value
        {
            return Err(RefsError::InvalidArgument(format!(
                "restriction {} given conflicting values {previous:?} and {:?}",
                restriction.key, restriction.value
            )));
        }
    }
    Ok(map)
}

/// Selection constructors
impl Blip {
    /// The whole content of the blip as one range
    pub fn all_content<'a>(&'a mut self, sink: &'a mut dyn OperationSink) -> ContentRefs<'a> {
        let len = self.len();
        self.range(sink, 0, len)
    }

    /// Every occurrence of `target`
    pub fn all<'a>(&'a mut self, sink: &'a mut dyn OperationSink, target: &str) -> ContentRefs<'a> {
        self.text_search(sink, target, None)
    }

    /// At most `max_hits` occurrences of `target`
    pub fn all_limited<'a>(
        &'a mut self,
        sink: &'a mut dyn OperationSink,
        target: &str,
        max_hits: usize,
    ) -> ContentRefs<'a> {
        self.text_search(sink, target, Some(max_hits))
    }

    /// The first occurrence of `target`
    pub fn first<'a>(&'a mut self, sink: &'a mut dyn OperationSink, target: &str) -> ContentRefs<'a> {
        self.text_search(sink, target, Some(1))
    }

    /// Every element of `element_type` matching all `restrictions`
    pub fn all_elements<'a>(
        &'a mut self,
        sink: &'a mut dyn OperationSink,
        element_type: ElementType,
        restrictions: &[Restriction],
    ) -> Result<ContentRefs<'a>, RefsError> {
        self.element_search(sink, element_type, None, restrictions)
    }

    pub fn all_elements_limited<'a>(
        &'a mut self,
        sink: &'a mut dyn OperationSink,
        element_type: ElementType,
        max_hits: usize,
        restrictions: &[Restriction],
    ) -> Result<ContentRefs<'a>, RefsError> {
        self.element_search(sink, element_type, Some(max_hits), restrictions)
    }

    pub fn first_element<'a>(
        &'a mut self,
        sink: &'a mut dyn OperationSink,
        element_type: ElementType,
        restrictions: &[Restriction],
    ) -> Result<ContentRefs<'a>, RefsError> {
        self.element_search(sink, element_type, Some(1), restrictions)
    }

    /// The single offset `index`
    pub fn at<'a>(&'a mut self, sink: &'a mut dyn OperationSink, index: usize) -> ContentRefs<'a> {
        self.range(sink, index, index.saturating_add(1))
    }

    /// An explicit `start..end` range
    pub fn range<'a>(
        &'a mut self,
        sink: &'a mut dyn OperationSink,
        start: usize,
        end: usize,
    ) -> ContentRefs<'a> {
        ContentRefs::new(
            self,
            sink,
            Box::new(Singleshot::new(start..end)),
            SelectionDescriptor::explicit_range(start, end),
        )
    }

    /// Add content at the end of the blip
    pub fn append<'f>(
        &mut self,
        sink: &mut dyn OperationSink,
        content: impl Into<ContentArg<'f>>,
    ) -> Result<(), RefsError> {
        let len = self.len();
        let mut refs = if len == 0 {
            self.range(sink, 0, 0)
        } else {
            self.range(sink, len, len.saturating_add(1))
        };
        refs.insert([content])?;
        Ok(())
    }

    fn text_search<'a>(
        &'a mut self,
        sink: &'a mut dyn OperationSink,
        target: &str,
        max_hits: Option<usize>,
    ) -> ContentRefs<'a> {
        ContentRefs::new(
            self,
            sink,
            Box::new(TextMatcher::new(target, max_hits)),
            SelectionDescriptor::text_query(target, max_hits),
        )
    }

    fn element_search<'a>(
        &'a mut self,
        sink: &'a mut dyn OperationSink,
        element_type: ElementType,
        max_hits: Option<usize>,
        restrictions: &[Restriction],
    ) -> Result<ContentRefs<'a>, RefsError> {
        let restrictions = restriction_map(restrictions)?;
        Ok(ContentRefs::new(
            self,
            sink,
            Box::new(ElementMatcher::new(element_type, restrictions.clone(), max_hits)),
            SelectionDescriptor::element_query(element_type, restrictions, max_hits),
        ))
    }
}
