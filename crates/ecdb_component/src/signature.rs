//! Canonical query signatures.
//!
//! A [`Signature`] identifies a query by the component types it requires and
//! the types it excludes. It is the key of the query cache, so two queries
//! that differ only in the order of their required types share one signature:
//!
//! ```text
//! query<(Velocity, Position)>                 -> [Tid(0), Tid(1) | ]
//! query<(Position, Velocity)>                 -> [Tid(0), Tid(1) | ]
//! query<(Position, Velocity), Not<Collider>>  -> [Tid(0), Tid(1) | !Tid(2)]
//! query<Position, Not<Position>>              -> [Tid(0) | !Tid(0)]
//! ```
//!
//! Required and excluded lists are kept apart, so `A` required and `A`
//! excluded are different signatures.

use std::fmt;

use crate::component::Tid;

/// The order-normalized type signature of a query.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Signature {
    include: Box<[Tid]>,
    exclude: Box<[Tid]>,
}

impl Signature {
    /// Build the canonical signature for the given required and excluded types.
    ///
    /// Both lists are sorted and de-duplicated. Callers that hand out one
    /// reference per required type must reject repeats first with
    /// [`Signature::repeated`].
    #[must_use]
    pub fn new(include: &[Tid], exclude: &[Tid]) -> Self {
        Self {
            include: canonical(include),
            exclude: canonical(exclude),
        }
    }

    /// Returns the first type that appears more than once in `tids`.
    #[must_use]
    pub fn repeated(tids: &[Tid]) -> Option<Tid> {
        tids.iter()
            .enumerate()
            .find(|&(i, tid)| tids[..i].contains(tid))
            .map(|(_, &tid)| tid)
    }

    /// The required types, sorted.
    #[must_use]
    pub fn include(&self) -> &[Tid] {
        &self.include
    }

    /// The excluded types, sorted.
    #[must_use]
    pub fn exclude(&self) -> &[Tid] {
        &self.exclude
    }

    /// Returns `true` if `tid` is required or excluded by this signature.
    #[must_use]
    pub fn mentions(&self, tid: Tid) -> bool {
        self.include.binary_search(&tid).is_ok() || self.exclude.binary_search(&tid).is_ok()
    }

    /// Every type the signature mentions, required types first.
    pub fn types(&self) -> impl Iterator<Item = Tid> + '_ {
        self.include.iter().chain(self.exclude.iter()).copied()
    }

    /// Returns the canonical column of a required type.
    ///
    /// Query results store one component location per required type in this
    /// column order.
    #[must_use]
    pub fn column_of(&self, tid: Tid) -> Option<usize> {
        self.include.binary_search(&tid).ok()
    }
}

fn canonical(tids: &[Tid]) -> Box<[Tid]> {
    let mut sorted = tids.to_vec();
    sorted.sort_unstable();
    sorted.dedup();
    sorted.into_boxed_slice()
}

impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[")?;
        for (i, tid) in self.include.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{tid}")?;
        }
        write!(f, " |")?;
        for tid in self.exclude.iter() {
            write!(f, " !{tid}")?;
        }
        write!(f, "]")
    }
}
