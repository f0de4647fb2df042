use std::any::{Any, TypeId};

/// A UID a resource advertises or seeks (§4.3). Equality between two UIDs is decided by
/// `iff`, which implementations should only ever answer `true` for a UID of the same concrete
/// type — `autoedge`'s candidate index relies on that (see `DESIGN.md`, "UID-type index
/// soundness").
pub trait Uid: Send + Sync {
    fn as_any(&self) -> &dyn Any;
    fn iff(&self, other: &dyn Uid) -> bool;
}

/// The concrete type tag `autoedge` buckets candidates by.
pub fn type_tag(u: &dyn Uid) -> TypeId {
    u.as_any().type_id()
}

/// A UID this resource is seeking, plus the direction the inferred edge should run.
pub struct SeekingUid {
    pub uid: Box<dyn Uid>,
    /// When true, a match produces an edge from the matched producer *to* this vertex reversed
    /// (i.e. the producer becomes the dependency target rather than the source). See §4.3.
    pub is_reversed: bool,
}

impl SeekingUid {
    pub fn new(uid: Box<dyn Uid>) -> Self {
        Self { uid, is_reversed: false }
    }

    pub fn reversed(uid: Box<dyn Uid>) -> Self {
        Self { uid, is_reversed: true }
    }
}
