//! Scan output types.

use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Editable element kinds, derived from the tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EditableType {
    Heading,
    Image,
    Link,
    Text,
}

impl EditableType {
    pub fn from_tag(tag: &str) -> Self {
        match tag {
            t if crate::utils::html::is_heading(t) => Self::Heading,
            "img" => Self::Image,
            "a" => Self::Link,
            _ => Self::Text,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Heading => "heading",
            Self::Image => "image",
            Self::Link => "link",
            Self::Text => "text",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "heading" => Some(Self::Heading),
            "image" => Some(Self::Image),
            "link" => Some(Self::Link),
            "text" => Some(Self::Text),
            _ => None,
        }
    }
}

impl fmt::Display for EditableType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why an element was judged database- or loop-generated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "code", rename_all = "camelCase")]
pub enum DynamicReason {
    /// Unrendered `{{ ... }}`-style syntax in the text.
    VariableSyntax,
    RecordAttribute { attribute: String },
    ListingClass { class: String },
    LoopSignature { siblings: usize },
    Pagination,
    CollectionAttribute { attribute: String },
    /// Read back from a previous annotation.
    Tagged { message: String },
}

const LOOP_MESSAGE_PREFIX: &str = "Repeated by a loop (";
const LOOP_MESSAGE_SUFFIX: &str = " identical siblings)";

impl DynamicReason {
    /// Message shown to the operator.
    pub fn message(&self) -> String {
        match self {
            Self::VariableSyntax => "Contains template variables".to_string(),
            Self::RecordAttribute { attribute } => {
                format!("Bound to a database record ({attribute})")
            }
            Self::ListingClass { class } => format!("Part of a content listing ({class})"),
            Self::LoopSignature { siblings } => {
                format!("{LOOP_MESSAGE_PREFIX}{siblings}{LOOP_MESSAGE_SUFFIX}")
            }
            Self::Pagination => "Part of a paginated list".to_string(),
            Self::CollectionAttribute { attribute } => {
                format!("Inside a data collection ({attribute})")
            }
            Self::Tagged { message } => message.clone(),
        }
    }

    /// Recover a reason from its message. Unknown messages are kept verbatim.
    pub fn from_message(message: &str) -> Self {
        let inner = |prefix: &str| {
            message
                .strip_prefix(prefix)
                .and_then(|rest| rest.strip_suffix(')'))
                .map(str::to_string)
        };

        if message == "Contains template variables" {
            return Self::VariableSyntax;
        }
        if message == "Part of a paginated list" {
            return Self::Pagination;
        }
        if let Some(siblings) = message
            .strip_prefix(LOOP_MESSAGE_PREFIX)
            .and_then(|rest| rest.strip_suffix(LOOP_MESSAGE_SUFFIX))
            .and_then(|n| n.parse().ok())
        {
            return Self::LoopSignature { siblings };
        }
        if let Some(attribute) = inner("Bound to a database record (") {
            return Self::RecordAttribute { attribute };
        }
        if let Some(class) = inner("Part of a content listing (") {
            return Self::ListingClass { class };
        }
        if let Some(attribute) = inner("Inside a data collection (") {
            return Self::CollectionAttribute { attribute };
        }
        Self::Tagged {
            message: message.to_string(),
        }
    }
}

/// Why an element is left alone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum IgnoreReason {
    ToolingOrInjected,
    Dropdown,
    HeaderFooter,
    Empty,
    NestedEditable,
    Unknown,
}

/// Verdict for one element. Exactly one per element per scan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum Classification {
    Editable {
        #[serde(rename = "type")]
        editable_type: EditableType,
    },
    Component {
        reason: DynamicReason,
    },
    Ignored {
        reason: IgnoreReason,
    },
}

impl Classification {
    pub const fn editable(editable_type: EditableType) -> Self {
        Self::Editable { editable_type }
    }

    pub const fn component(reason: DynamicReason) -> Self {
        Self::Component { reason }
    }

    pub const fn ignored(reason: IgnoreReason) -> Self {
        Self::Ignored { reason }
    }

    pub fn is_editable(&self) -> bool {
        matches!(self, Self::Editable { .. })
    }

    pub fn is_component(&self) -> bool {
        matches!(self, Self::Component { .. })
    }

    pub fn editable_type(&self) -> Option<EditableType> {
        match self {
            Self::Editable { editable_type } => Some(*editable_type),
            _ => None,
        }
    }

    /// Short label for reports, e.g. `editable(text)`.
    pub fn label(&self) -> String {
        match self {
            Self::Editable { editable_type } => format!("editable({editable_type})"),
            Self::Component { reason } => format!("component({})", reason.message()),
            Self::Ignored { reason } => {
                let name = serde_json::to_value(reason)
                    .ok()
                    .and_then(|v| v.as_str().map(str::to_string))
                    .unwrap_or_default();
                format!("ignored({name})")
            }
        }
    }
}

/// One reported element.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScannedElement {
    pub tag: String,
    pub text_snapshot: String,
    pub attributes: BTreeMap<String, String>,
    pub classification: Classification,
    /// Name of the rule that decided the classification.
    pub rule: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_file: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line_hint: Option<usize>,
    /// Opening tag offset in the marker-stripped markup.
    #[serde(skip)]
    pub offset: Option<usize>,
    /// The content id was derived by this scan rather than read back.
    #[serde(skip)]
    pub generated_id: bool,
}
