//! XML Event Types
//!
//! Events borrow directly from the input; nothing is decoded or expanded.

use crate::core::attributes::{split_name, Attribute};
use std::collections::HashSet;

/// XML parsing event
#[derive(Debug, Clone)]
pub enum XmlEvent<'a> {
    /// Start of an element: <name attrs...>
    StartElement(StartElement<'a>),
    /// End of an element: </name>
    EndElement(EndElement<'a>),
    /// Empty element: <name attrs.../>
    EmptyElement(StartElement<'a>),
    Text(&'a [u8]),
    CData(&'a [u8]),
    /// Comment; content is skipped
    Comment,
    /// Processing instruction other than the XML declaration; skipped
    ProcessingInstruction,
    /// XML declaration: <?xml version="1.0"?>
    XmlDeclaration {
        version: Option<&'a [u8]>,
        encoding: Option<&'a [u8]>,
    },
    /// DOCTYPE declaration, reported but never interpreted
    DocType(&'a [u8]),
    EndDocument,
}

/// Start element event data
#[derive(Debug, Clone)]
pub struct StartElement<'a> {
    /// Full element name (may include prefix)
    pub name: &'a [u8],
    /// Namespace prefix (before colon), if any
    pub prefix: Option<&'a [u8]>,
    pub attributes: Vec<Attribute<'a>>,
    /// Byte offset of the '<'
    pub position: usize,
}

impl<'a> StartElement<'a> {
    /// Split `name` into prefix and local part
    pub fn new(name: &'a [u8], attributes: Vec<Attribute<'a>>, position: usize) -> Self {
        let (prefix, _) = split_name(name);
        StartElement {
            name,
            prefix,
            attributes,
            position,
        }
    }

    /// First attribute name that appears twice, if any
    pub fn duplicate_attribute(&self) -> Option<&'a [u8]> {
        let mut seen = HashSet::with_capacity(self.attributes.len());
        self.attributes.iter().map(|a| a.name).find(|name| !seen.insert(*name))
    }
}

/// End element event data
#[derive(Debug, Clone)]
pub struct EndElement<'a> {
    /// Full element name as written
    pub name: &'a [u8],
    /// Byte offset of the '<'
    pub position: usize,
}

impl<'a> EndElement<'a> {
    /// End tag `</name>` starting at `position`
    pub fn new(name: &'a [u8], position: usize) -> Self {
        EndElement { name, position }
    }
}
