//! The immutability lattice and viewpoint adaptation.
//!
//! Three qualifiers, totally ordered: `MUTABLE ⊑ POLYREAD ⊑ READONLY`.
//! The solver never manipulates single qualifiers directly; it shrinks
//! [`CandidateSet`]s, and a site's final tag is the greatest member left.

use crate::ir::{Mutability, SiteKind};
use crate::Error;
use bitflags::bitflags;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A reference immutability qualifier.
///
/// Derived `Ord` is the lattice order: `Mutable < Polyread < Readonly`.
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
pub enum Qualifier {
    Mutable,
    Polyread,
    Readonly,
}

impl Qualifier {
    /// All qualifiers, ascending.
    pub const ALL: [Qualifier; 3] = [Qualifier::Mutable, Qualifier::Polyread, Qualifier::Readonly];
}

impl fmt::Display for Qualifier {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let s = match self {
            Qualifier::Mutable => "MUTABLE",
            Qualifier::Polyread => "POLYREAD",
            Qualifier::Readonly => "READONLY",
        };
        f.write_str(s)
    }
}

impl FromStr for Qualifier {
    type Err = Error;

    fn from_str(s: &str) -> Result<Qualifier, Error> {
        match s {
            "MUTABLE" => Ok(Qualifier::Mutable),
            "POLYREAD" => Ok(Qualifier::Polyread),
            "READONLY" => Ok(Qualifier::Readonly),
            _ => Err(Error::Custom(format!("unknown qualifier {:?}", s))),
        }
    }
}

impl From<Qualifier> for Mutability {
    fn from(qualifier: Qualifier) -> Mutability {
        match qualifier {
            Qualifier::Mutable => Mutability::Mutable,
            Qualifier::Polyread => Mutability::Polyread,
            Qualifier::Readonly => Mutability::Readonly,
        }
    }
}

/// Viewpoint adaptation for member accesses: the declared qualifier of a
/// field, seen through the context reference used to reach it. READONLY
/// members stay READONLY from every viewpoint; everything else takes the
/// context's qualifier.
pub fn adapt_field(context: Qualifier, declared: Qualifier) -> Qualifier {
    match declared {
        Qualifier::Readonly => Qualifier::Readonly,
        Qualifier::Mutable | Qualifier::Polyread => context,
    }
}

/// Viewpoint adaptation at call boundaries, applied to a callee's
/// receiver, parameters and return as seen from the call assignment's
/// context.
///
/// The table matches [`adapt_field`] today. It stays a separate symbol
/// because the two adaptations answer to different rules; callers must
/// not substitute one for the other.
pub fn adapt_method(context: Qualifier, declared: Qualifier) -> Qualifier {
    match declared {
        Qualifier::Readonly => Qualifier::Readonly,
        Qualifier::Mutable | Qualifier::Polyread => context,
    }
}

bitflags! {
    /// The qualifiers still admissible for one site.
    #[derive(Deserialize, Serialize)]
    pub struct CandidateSet: u8 {
        const MUTABLE  = 0b001;
        const POLYREAD = 0b010;
        const READONLY = 0b100;
    }
}

impl CandidateSet {
    /// The full lattice.
    pub fn full() -> CandidateSet {
        CandidateSet::MUTABLE | CandidateSet::POLYREAD | CandidateSet::READONLY
    }

    /// The default candidate set for a site kind. Creation sites start
    /// MUTABLE; fields and returns start without MUTABLE; static fields
    /// cannot be POLYREAD (there is no receiver to be poly over);
    /// everything else starts with the full lattice.
    pub fn default_for(kind: SiteKind) -> CandidateSet {
        match kind {
            SiteKind::Instantiation | SiteKind::ArrayInstantiation | SiteKind::Literal => {
                CandidateSet::MUTABLE
            }
            SiteKind::ReturnValue | SiteKind::InstanceField => {
                CandidateSet::POLYREAD | CandidateSet::READONLY
            }
            SiteKind::StaticField => CandidateSet::MUTABLE | CandidateSet::READONLY,
            _ => CandidateSet::full(),
        }
    }

    pub fn has(&self, qualifier: Qualifier) -> bool {
        self.contains(CandidateSet::from(qualifier))
    }

    /// Remaining qualifiers, ascending.
    pub fn qualifiers(&self) -> Vec<Qualifier> {
        Qualifier::ALL
            .iter()
            .cloned()
            .filter(|q| self.has(*q))
            .collect()
    }

    /// The greatest remaining qualifier, if any.
    pub fn maximal(&self) -> Option<Qualifier> {
        Qualifier::ALL.iter().cloned().rev().find(|q| self.has(*q))
    }

    /// The only remaining qualifier, if the set is a singleton.
    pub fn singleton(&self) -> Option<Qualifier> {
        let qualifiers = self.qualifiers();
        match qualifiers.as_slice() {
            [qualifier] => Some(*qualifier),
            _ => None,
        }
    }
}

impl From<Qualifier> for CandidateSet {
    fn from(qualifier: Qualifier) -> CandidateSet {
        match qualifier {
            Qualifier::Mutable => CandidateSet::MUTABLE,
            Qualifier::Polyread => CandidateSet::POLYREAD,
            Qualifier::Readonly => CandidateSet::READONLY,
        }
    }
}

impl fmt::Display for CandidateSet {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let names: Vec<String> = self.qualifiers().iter().map(|q| q.to_string()).collect();
        f.write_str(&names.join(","))
    }
}

impl FromStr for CandidateSet {
    type Err = Error;

    fn from_str(s: &str) -> Result<CandidateSet, Error> {
        let mut set = CandidateSet::empty();
        for token in s.split(',') {
            let token = token.trim();
            if token.is_empty() {
                continue;
            }
            set |= CandidateSet::from(Qualifier::from_str(token)?);
        }
        Ok(set)
    }
}

#[test]
fn lattice_order() {
    assert!(Qualifier::Mutable < Qualifier::Polyread);
    assert!(Qualifier::Polyread < Qualifier::Readonly);
}

#[test]
fn adaptation_tables() {
    for context in Qualifier::ALL {
        // READONLY members are READONLY from every viewpoint
        assert_eq!(adapt_field(context, Qualifier::Readonly), Qualifier::Readonly);
        assert_eq!(adapt_method(context, Qualifier::Readonly), Qualifier::Readonly);
        // everything else takes the context
        assert_eq!(adapt_field(context, Qualifier::Mutable), context);
        assert_eq!(adapt_field(context, Qualifier::Polyread), context);
        assert_eq!(adapt_method(context, Qualifier::Mutable), context);
        assert_eq!(adapt_method(context, Qualifier::Polyread), context);
    }
}

#[test]
fn kind_defaults() {
    assert_eq!(
        CandidateSet::default_for(SiteKind::Instantiation),
        CandidateSet::MUTABLE
    );
    assert_eq!(
        CandidateSet::default_for(SiteKind::Literal),
        CandidateSet::MUTABLE
    );
    assert_eq!(
        CandidateSet::default_for(SiteKind::InstanceField),
        CandidateSet::POLYREAD | CandidateSet::READONLY
    );
    assert_eq!(
        CandidateSet::default_for(SiteKind::ReturnValue),
        CandidateSet::POLYREAD | CandidateSet::READONLY
    );
    assert_eq!(
        CandidateSet::default_for(SiteKind::StaticField),
        CandidateSet::MUTABLE | CandidateSet::READONLY
    );
    assert_eq!(
        CandidateSet::default_for(SiteKind::Local),
        CandidateSet::full()
    );
    assert_eq!(
        CandidateSet::default_for(SiteKind::Placeholder),
        CandidateSet::full()
    );
    assert_eq!(
        CandidateSet::default_for(SiteKind::Method),
        CandidateSet::full()
    );
}

#[test]
fn maximal_and_singleton() {
    assert_eq!(CandidateSet::full().maximal(), Some(Qualifier::Readonly));
    assert_eq!(
        (CandidateSet::MUTABLE | CandidateSet::POLYREAD).maximal(),
        Some(Qualifier::Polyread)
    );
    assert_eq!(CandidateSet::empty().maximal(), None);
    assert_eq!(CandidateSet::full().singleton(), None);
    assert_eq!(
        CandidateSet::POLYREAD.singleton(),
        Some(Qualifier::Polyread)
    );
}

#[test]
fn display_and_parse() {
    let set = CandidateSet::MUTABLE | CandidateSet::READONLY;
    assert_eq!(set.to_string(), "MUTABLE,READONLY");
    assert_eq!("MUTABLE,READONLY".parse::<CandidateSet>().unwrap(), set);
    assert_eq!(
        "POLYREAD".parse::<CandidateSet>().unwrap(),
        CandidateSet::POLYREAD
    );
    assert!("BOGUS".parse::<CandidateSet>().is_err());
}
