//! Per-handle attribute table.
//!
//! Settable attributes are stored as `Option<T>`: `None` means "never set,
//! use the default", which is what `test` reports and what `clear` restores.
//! Read-only attributes are derived from the transform definition and are
//! never stored here.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::errors::{MapError, Result};

/// Every attribute name a [`Mapping`](crate::Mapping) understands
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AttrName {
    Report,
    Invert,
    Ident,
    Class,
    Nin,
    Nout,
    IsLinear,
    IsSimple,
    TranForward,
    TranInverse,
}

impl AttrName {
    pub const ALL: [AttrName; 10] = [
        AttrName::Report,
        AttrName::Invert,
        AttrName::Ident,
        AttrName::Class,
        AttrName::Nin,
        AttrName::Nout,
        AttrName::IsLinear,
        AttrName::IsSimple,
        AttrName::TranForward,
        AttrName::TranInverse,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            AttrName::Report => "Report",
            AttrName::Invert => "Invert",
            AttrName::Ident => "Ident",
            AttrName::Class => "Class",
            AttrName::Nin => "Nin",
            AttrName::Nout => "Nout",
            AttrName::IsLinear => "IsLinear",
            AttrName::IsSimple => "IsSimple",
            AttrName::TranForward => "TranForward",
            AttrName::TranInverse => "TranInverse",
        }
    }

    pub fn is_read_only(self) -> bool {
        !matches!(self, AttrName::Report | AttrName::Invert | AttrName::Ident)
    }
}

impl fmt::Display for AttrName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AttrName {
    type Err = MapError;

    /// Names are case-insensitive and may be surrounded by white space.
    fn from_str(s: &str) -> Result<Self> {
        let wanted = s.trim();
        AttrName::ALL
            .into_iter()
            .find(|name| name.as_str().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| MapError::UnknownAttribute {
                name: wanted.to_string(),
            })
    }
}

/// Explicitly-set attribute values of one handle
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attributes {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    report: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    invert: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    ident: Option<String>,
}

impl Attributes {
    /// Nothing has been set
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    pub fn report(&self) -> bool {
        self.report.unwrap_or(false)
    }

    pub fn set_report(&mut self, report: bool) {
        self.report = Some(report);
    }

    pub fn invert(&self) -> bool {
        self.invert.unwrap_or(false)
    }

    pub fn set_invert(&mut self, invert: bool) {
        self.invert = Some(invert);
    }

    pub fn ident(&self) -> &str {
        self.ident.as_deref().unwrap_or("")
    }

    pub fn set_ident(&mut self, ident: impl Into<String>) {
        self.ident = Some(ident.into());
    }

    /// Has `name` been explicitly set (and not cleared since)?
    /// Always `false` for read-only attributes.
    pub fn test(&self, name: AttrName) -> bool {
        match name {
            AttrName::Report => self.report.is_some(),
            AttrName::Invert => self.invert.is_some(),
            AttrName::Ident => self.ident.is_some(),
            _ => false,
        }
    }

    /// Restore the default value of `name`
    pub fn clear(&mut self, name: AttrName) -> Result<()> {
        match name {
            AttrName::Report => self.report = None,
            AttrName::Invert => self.invert = None,
            AttrName::Ident => self.ident = None,
            _ => {
                return Err(MapError::ReadOnlyAttribute {
                    name: name.as_str().to_string(),
                });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_names_loosely() {
        assert_eq!("Report".parse::<AttrName>(), Ok(AttrName::Report));
        assert_eq!("  report ".parse::<AttrName>(), Ok(AttrName::Report));
        assert_eq!("TRANINVERSE".parse::<AttrName>(), Ok(AttrName::TranInverse));
        assert!(matches!(
            "Zoom".parse::<AttrName>(),
            Err(MapError::UnknownAttribute { .. })
        ));
    }

    #[test]
    fn set_test_clear_cycle() {
        let mut attrs = Attributes::default();
        assert!(!attrs.report());
        assert!(!attrs.test(AttrName::Report));

        attrs.set_report(false);
        assert!(!attrs.report());
        assert!(attrs.test(AttrName::Report));

        attrs.set_report(true);
        assert!(attrs.report());

        attrs.clear(AttrName::Report).unwrap();
        assert!(!attrs.report());
        assert!(!attrs.test(AttrName::Report));
    }

    #[test]
    fn read_only_attributes() {
        let mut attrs = Attributes::default();
        assert!(AttrName::Nin.is_read_only());
        assert!(!attrs.test(AttrName::Nin));
        assert!(matches!(
            attrs.clear(AttrName::IsSimple),
            Err(MapError::ReadOnlyAttribute { .. })
        ));
    }

    #[test]
    fn ident_defaults_to_empty() {
        let mut attrs = Attributes::default();
        assert_eq!(attrs.ident(), "");
        attrs.set_ident("pixels to sky");
        assert_eq!(attrs.ident(), "pixels to sky");
        assert!(attrs.test(AttrName::Ident));
    }
}
