use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Kinds of rich objects that can be anchored in blip content
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ElementType {
    Line,
    Image,
    Attachment,
    Gadget,
    Installer,
    InlineBlip,
    Button,
    Check,
    Input,
    Label,
    Password,
    RadioButton,
    RadioButtonGroup,
    Textarea,
}

/// A rich object occupying exactly one offset of blip content
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Element {
    #[serde(rename = "type")]
    pub element_type: ElementType,
    #[serde(default)]
    pub properties: BTreeMap<String, String>,
}

impl Element {
    pub fn new(element_type: ElementType) -> Self {
        Self {
            element_type,
            properties: BTreeMap::new(),
        }
    }

    /// Builder-style property setter
    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }

    pub fn property(&self, key: &str) -> Option<&str> {
        self.properties.get(key).map(String::as_str)
    }

    pub fn set_property(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.properties.insert(key.into(), value.into());
    }

    /// The placeholder character the element occupies in the blip text
    pub fn text(&self) -> &'static str {
        match self.element_type {
            ElementType::Line => "\n",
            _ => " ",
        }
    }

    /// True when the element has the given type and every restriction matches a property
    pub fn matches(&self, element_type: ElementType, restrictions: &BTreeMap<String, String>) -> bool {
        self.element_type == element_type
            && restrictions
                .iter()
                .all(|(key, value)| self.property(key) == Some(value.as_str()))
    }
}

/// Content that can be read from or written into a blip: plain text or a single element
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BlipContent {
    Plaintext(String),
    Element(Element),
}

impl BlipContent {
    pub fn plaintext(text: impl Into<String>) -> Self {
        BlipContent::Plaintext(text.into())
    }

    /// Plain-text rendering, which determines how much content this occupies
    pub fn text(&self) -> &str {
        match self {
            BlipContent::Plaintext(text) => text,
            BlipContent::Element(element) => element.text(),
        }
    }

    pub fn as_element(&self) -> Option<&Element> {
        match self {
            BlipContent::Element(element) => Some(element),
            BlipContent::Plaintext(_) => None,
        }
    }
}

impl From<&str> for BlipContent {
    fn from(text: &str) -> Self {
        BlipContent::Plaintext(text.to_string())
    }
}

impl From<String> for BlipContent {
    fn from(text: String) -> Self {
        BlipContent::Plaintext(text)
    }
}

impl From<Element> for BlipContent {
    fn from(element: Element) -> Self {
        BlipContent::Element(element)
    }
}

/// A single key/value filter applied when searching for elements
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Restriction {
    pub key: String,
    pub value: String,
}

impl Restriction {
    pub fn of(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}
