//! Error paths: where in the input tree a decode step is happening.
//!
//! A [`Path`] is an immutable singly-linked list growing toward the leaves.
//! Each recursion level owns its own link on the stack and borrows its
//! parent, so building a path never allocates; only rendering does.

use alloc::string::{String, ToString};
use alloc::vec::Vec;
use core::fmt;

/// One step of a [`Path`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Segment<'a> {
    /// The root label, e.g. `Request.Body`.
    Root(&'a str),
    /// A record field, by public name. Rendered `.name`.
    Field(&'a str),
    /// A sequence element. Rendered `[3]`.
    Index(usize),
    /// A map entry. Rendered `[key]`.
    Key(&'a str),
}

/// Location of a value inside the input being decoded.
#[derive(Debug, Clone, Copy)]
pub struct Path<'a> {
    segment: Segment<'a>,
    parent: Option<&'a Path<'a>>,
}

impl<'a> Path<'a> {
    /// A path made of a root label only.
    pub const fn root(label: &'a str) -> Self {
        Self {
            segment: Segment::Root(label),
            parent: None,
        }
    }

    /// Extends this path by one segment.
    pub fn push<'b>(&'b self, segment: Segment<'b>) -> Path<'b>
    where
        'a: 'b,
    {
        Path {
            segment,
            parent: Some(self),
        }
    }

    /// The last segment.
    pub fn segment(&self) -> Segment<'a> {
        self.segment
    }

    /// Everything but the last segment.
    pub fn parent(&self) -> Option<&'a Path<'a>> {
        self.parent
    }

    /// Segments from the root to this point.
    pub fn segments(&self) -> Vec<Segment<'a>> {
        let mut segments = Vec::new();
        let mut cursor = Some(self);
        while let Some(path) = cursor {
            segments.push(path.segment);
            cursor = path.parent;
        }
        segments.reverse();
        segments
    }

    /// Renders the path, e.g. `Pair<i32, Email>.right.addresses[2]`.
    pub fn render(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for Path<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for segment in self.segments() {
            match segment {
                Segment::Root(label) => f.write_str(label)?,
                Segment::Field(name) => write!(f, ".{name}")?,
                Segment::Index(index) => write!(f, "[{index}]")?,
                Segment::Key(key) => write!(f, "[{key}]")?,
            }
        }
        Ok(())
    }
}
