use std::collections::BTreeMap;
use std::fmt;

use crate::blip::{BlipContent, Element};

/// Closure computing new content from the content currently matched
pub type ContentFn<'f> = Box<dyn Fn(&BlipContent) -> BlipContent + 'f>;

/// Closure computing new element properties from the element currently matched
pub type PropertiesFn<'f> = Box<dyn Fn(&BlipContent) -> BTreeMap<String, String> + 'f>;

/// One positional argument of an insert, insert-after or replace batch
pub enum ContentArg<'f> {
    Literal(BlipContent),
    Computed(ContentFn<'f>),
}

impl<'f> ContentArg<'f> {
    pub fn computed(function: impl Fn(&BlipContent) -> BlipContent + 'f) -> Self {
        ContentArg::Computed(Box::new(function))
    }

    pub(crate) fn is_computed(&self) -> bool {
        matches!(self, ContentArg::Computed(_))
    }

    /// The literal content, or the function's result for `matched`
    pub(crate) fn resolve(&self, matched: impl FnOnce() -> BlipContent) -> BlipContent {
        match self {
            ContentArg::Literal(content) => content.clone(),
            ContentArg::Computed(function) => function(&matched()),
        }
    }
}

impl fmt::Debug for ContentArg<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ContentArg::Literal(content) => f.debug_tuple("Literal").field(content).finish(),
            ContentArg::Computed(_) => f.write_str("Computed(..)"),
        }
    }
}

impl From<BlipContent> for ContentArg<'_> {
    fn from(content: BlipContent) -> Self {
        ContentArg::Literal(content)
    }
}

impl From<&str> for ContentArg<'_> {
    fn from(text: &str) -> Self {
        ContentArg::Literal(BlipContent::from(text))
    }
}

impl From<String> for ContentArg<'_> {
    fn from(text: String) -> Self {
        ContentArg::Literal(BlipContent::from(text))
    }
}

impl From<Element> for ContentArg<'_> {
    fn from(element: Element) -> Self {
        ContentArg::Literal(BlipContent::from(element))
    }
}

/// One positional argument of an update-element batch
pub enum PropertiesArg<'f> {
    Literal(BTreeMap<String, String>),
    Computed(PropertiesFn<'f>),
}

impl<'f> PropertiesArg<'f> {
    pub fn computed(function: impl Fn(&BlipContent) -> BTreeMap<String, String> + 'f) -> Self {
        PropertiesArg::Computed(Box::new(function))
    }

    pub fn from_pairs(pairs: &[(&str, &str)]) -> Self {
        PropertiesArg::Literal(
            pairs
                .iter()
                .map(|(key, value)| (key.to_string(), value.to_string()))
                .collect(),
        )
    }

    pub(crate) fn resolve(&self, matched: impl FnOnce() -> BlipContent) -> BTreeMap<String, String> {
        match self {
            PropertiesArg::Literal(properties) => properties.clone(),
            PropertiesArg::Computed(function) => function(&matched()),
        }
    }
}

impl fmt::Debug for PropertiesArg<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PropertiesArg::Literal(properties) => f.debug_tuple("Literal").field(properties).finish(),
            PropertiesArg::Computed(_) => f.write_str("Computed(..)"),
        }
    }
}

impl From<BTreeMap<String, String>> for PropertiesArg<'_> {
    fn from(properties: BTreeMap<String, String>) -> Self {
        PropertiesArg::Literal(properties)
    }
}
