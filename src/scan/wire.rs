//! Attribute names carried by annotated markup.

pub const EDITABLE: &str = "data-cms-editable";
pub const TYPE: &str = "data-cms-type";
pub const ID: &str = "data-cms-id";
pub const ORIGINAL: &str = "data-cms-original";
pub const COMPONENT: &str = "data-cms-component";
pub const MESSAGE: &str = "data-cms-message";

pub const ALL: [&str; 6] = [EDITABLE, TYPE, ID, ORIGINAL, COMPONENT, MESSAGE];

/// Whether `name` is one of the attributes written by annotation.
pub fn is_wire_attribute(name: &str) -> bool {
    ALL.iter().any(|a| a.eq_ignore_ascii_case(name))
}
