use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::blip::{BundledAnnotation, Element, ElementType};

/// How a document-modify operation changes each matched range
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ModifyHow {
    Insert,
    InsertAfter,
    Replace,
    Delete,
    Annotate,
    ClearAnnotation,
    UpdateElement,
}

/// How the matches of a batch were selected, so the server can find them again
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SelectionDescriptor {
    #[serde(rename_all = "camelCase")]
    TextQuery { target: String, max_hits: i64 },
    #[serde(rename_all = "camelCase")]
    ElementQuery {
        element_type: ElementType,
        restrictions: BTreeMap<String, String>,
        max_hits: i64,
    },
    ExplicitRange { start: usize, end: usize },
}

impl SelectionDescriptor {
    pub fn text_query(target: impl Into<String>, max_hits: Option<usize>) -> Self {
        SelectionDescriptor::TextQuery {
            target: target.into(),
            max_hits: wire_max_hits(max_hits),
        }
    }

    pub fn element_query(
        element_type: ElementType,
        restrictions: BTreeMap<String, String>,
        max_hits: Option<usize>,
    ) -> Self {
        SelectionDescriptor::ElementQuery {
            element_type,
            restrictions,
            max_hits: wire_max_hits(max_hits),
        }
    }

    pub fn explicit_range(start: usize, end: usize) -> Self {
        SelectionDescriptor::ExplicitRange { start, end }
    }
}

/// Unbounded searches travel as -1
fn wire_max_hits(max_hits: Option<usize>) -> i64 {
    max_hits.map_or(-1, |hits| i64::try_from(hits).unwrap_or(i64::MAX))
}

/// The edit applied to every match of a batch
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentModifyAction {
    pub modify_how: ModifyHow,
    /// Text payloads, aligned slot for slot with `elements`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub values: Option<Vec<Option<String>>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub annotation_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub elements: Option<Vec<Option<Element>>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bundled_annotations: Option<Vec<BundledAnnotation>>,
    #[serde(default)]
    pub use_markup: bool,
}

impl DocumentModifyAction {
    pub fn new(modify_how: ModifyHow) -> Self {
        Self {
            modify_how,
            values: None,
            annotation_key: None,
            elements: None,
            bundled_annotations: None,
            use_markup: false,
        }
    }
}

/// One finished batch: the net edit plus the selection it was applied to
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchOperation {
    pub wave_id: String,
    pub wavelet_id: String,
    pub blip_id: String,
    pub modify_action: DocumentModifyAction,
    pub selection: SelectionDescriptor,
}
