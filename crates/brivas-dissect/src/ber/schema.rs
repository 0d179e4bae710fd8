//! Static schema tables describing ASN.1 structures

use super::context::DecodeContext;
use super::header::{Header, TagClass};
use crate::cursor::ByteCursor;
use crate::errors::Result;
use crate::tree::FieldNode;

/// Decoder signature shared by primitives, structures and schema entries:
/// `(implicit_tag, ctx, tvb, offset, name) -> (offset after element, node)`.
///
/// The element header is always at `offset`. With `implicit_tag` set the
/// decoder skips its universal tag check.
pub type DecodeFn = fn(bool, &mut DecodeContext<'_>, &ByteCursor, usize, &'static str) -> Result<(usize, FieldNode)>;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FieldFlags(u8);

impl FieldFlags {
    pub const NONE: Self = Self(0);
    pub const OPTIONAL: Self = Self(0x01);
    pub const IMPLICIT: Self = Self(0x02);
    /// Entry has no tag of its own; its decoder reads the header (CHOICE)
    pub const NO_OWN_TAG: Self = Self(0x04);
    /// Accept any tag (open types resolved through the registry)
    pub const NOT_CHECK_TAG: Self = Self(0x08);

    pub const OPTIONAL_IMPLICIT: Self = Self::OPTIONAL.union(Self::IMPLICIT);

    pub const fn union(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }

    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }
}

impl std::ops::BitOr for FieldFlags {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        self.union(rhs)
    }
}

/// One entry of a SEQUENCE, SET or CHOICE schema
#[derive(Clone, Copy)]
pub struct FieldSpec {
    pub name: &'static str,
    pub class: TagClass,
    /// `None` marks an ANY or untagged CHOICE entry
    pub tag: Option<u32>,
    pub flags: FieldFlags,
    pub decoder: DecodeFn,
}

impl FieldSpec {
    /// Universal-class entry
    pub const fn universal(name: &'static str, tag: u32, flags: FieldFlags, decoder: DecodeFn) -> Self {
        Self {
            name,
            class: TagClass::Universal,
            tag: Some(tag),
            flags,
            decoder,
        }
    }

    /// Context-specific `[tag]` entry; EXPLICIT unless `flags` says IMPLICIT
    pub const fn context(name: &'static str, tag: u32, flags: FieldFlags, decoder: DecodeFn) -> Self {
        Self {
            name,
            class: TagClass::Context,
            tag: Some(tag),
            flags,
            decoder,
        }
    }

    /// Untagged CHOICE or open type; the decoder inspects the header
    pub const fn untagged(name: &'static str, flags: FieldFlags, decoder: DecodeFn) -> Self {
        Self {
            name,
            class: TagClass::Universal,
            tag: None,
            flags: flags.union(FieldFlags::NO_OWN_TAG),
            decoder,
        }
    }

    pub fn is_optional(&self) -> bool {
        self.flags.contains(FieldFlags::OPTIONAL)
    }

    pub fn is_implicit(&self) -> bool {
        self.flags.contains(FieldFlags::IMPLICIT)
    }

    /// Whether the decoder reads the element header itself
    pub fn is_untagged(&self) -> bool {
        self.tag.is_none() || self.flags.contains(FieldFlags::NO_OWN_TAG)
    }

    pub fn accepts_any_tag(&self) -> bool {
        self.flags.contains(FieldFlags::NOT_CHECK_TAG)
    }

    /// Whether `header` carries this entry's own tag; wildcard entries
    /// never match by tag
    pub fn matches_tag(&self, header: &Header) -> bool {
        self.tag.is_some() && !self.accepts_any_tag() && self.matches(header)
    }

    /// Whether `header` can start this entry
    pub fn matches(&self, header: &Header) -> bool {
        if self.accepts_any_tag() {
            return true;
        }
        match self.tag {
            Some(tag) => header.class == self.class && header.tag == tag,
            None => true,
        }
    }
}

impl std::fmt::Debug for FieldSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FieldSpec")
            .field("name", &self.name)
            .field("class", &self.class)
            .field("tag", &self.tag)
            .field("flags", &self.flags)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ber::header::{universal, Length};
    use crate::ber::primitive::dissect_integer;

    fn header(class: TagClass, tag: u32) -> Header {
        Header {
            class,
            constructed: false,
            tag,
            length: Length::Definite(1),
            header_len: 2,
        }
    }

    #[test]
    fn test_flags() {
        let flags = FieldFlags::OPTIONAL | FieldFlags::IMPLICIT;
        assert_eq!(flags, FieldFlags::OPTIONAL_IMPLICIT);
        assert!(flags.contains(FieldFlags::OPTIONAL));
        assert!(!flags.contains(FieldFlags::NOT_CHECK_TAG));
    }

    #[test]
    fn test_matches() {
        let int = FieldSpec::universal("n", universal::INTEGER, FieldFlags::NONE, dissect_integer);
        assert!(int.matches(&header(TagClass::Universal, universal::INTEGER)));
        assert!(!int.matches(&header(TagClass::Context, universal::INTEGER)));

        let ctx0 = FieldSpec::context("c", 0, FieldFlags::IMPLICIT, dissect_integer);
        assert!(ctx0.matches(&header(TagClass::Context, 0)));
        assert!(!ctx0.matches(&header(TagClass::Context, 1)));

        let any = FieldSpec::untagged("v", FieldFlags::NOT_CHECK_TAG, dissect_integer);
        assert!(any.is_untagged());
        assert!(any.matches(&header(TagClass::Private, 9)));
    }
}
