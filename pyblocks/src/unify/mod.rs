//! One-directional narrowing of admissible type vectors.
//!
//! A narrowing pass restricts the vectors on one side of a value connection to the ones
//! that agree with at least one vector on the other side, binding `matching` variables
//! to the concrete types they meet on the way. It never widens: undoing a narrowing
//! requires restoring the declared set first.

use crate::types::{BaseType, Column, TypeTag, TypeVecs};

/// Outcome of comparing one tag on the side being narrowed against one tag on the other side.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    /// The vector survives unchanged.
    Keep,
    /// The vector survives with its `matching` variables bound to this concrete name.
    Bind(String),
    /// The vector is incompatible with this pairing.
    Reject,
}

/// Compare `this` (the side being narrowed) against `other`.
///
/// Rules are tried top to bottom and the first that applies decides:
///
/// 1. identical tags keep;
/// 2. `other` is `any` of the same list-ness: keep;
/// 3. `this` is `matching` and `other` a concrete scalar `T`: bind to `T`;
/// 4. `this` is `*matching` and `other` is `*T`: bind to `T`;
/// 5. `this` is `any` and `other` is any tag of the same list-ness: keep;
/// 6. otherwise reject.
///
/// An unbound `matching` on the other side constrains nothing yet, so it is treated like
/// `any` in rule 2. `none` only ever matches `none`, through rule 1.
pub fn compare(this: &TypeTag, other: &TypeTag) -> Verdict {
    if this == other {
        return Verdict::Keep;
    }
    if this.is_none() || other.is_none() || this.is_list() != other.is_list() {
        return Verdict::Reject;
    }
    if other.is_wildcard() {
        return Verdict::Keep;
    }
    if this.is_matching() {
        return match other.base() {
            BaseType::Named(name) => Verdict::Bind(name.clone()),
            _ => Verdict::Reject,
        };
    }
    if this.is_any() {
        return Verdict::Keep;
    }
    Verdict::Reject
}

/// Whether a value of type `output` may sit in a hole of type `hole` at all.
pub fn compatible(output: &TypeTag, hole: &TypeTag) -> bool {
    compare(output, hole) != Verdict::Reject
}

/// Narrow `this` at `this_col` against every vector of `other` at `other_col`.
///
/// The result is the deduplicated union of every surviving (possibly substituted) vector.
/// An empty `other` empties the result: nothing can agree with an unsatisfiable neighbour.
pub fn narrow(this: &TypeVecs, this_col: Column, other: &TypeVecs, other_col: Column) -> TypeVecs {
    let mut out = TypeVecs::empty(this.slot_count());
    for v in this {
        let Some(a) = v.column(this_col) else {
            continue;
        };
        for w in other {
            let Some(b) = w.column(other_col) else {
                continue;
            };
            match compare(a, b) {
                Verdict::Keep => {
                    out.insert(v.clone());
                }
                Verdict::Bind(name) => {
                    out.insert(v.bind_matching(&name));
                }
                Verdict::Reject => {}
            }
        }
    }
    out
}

/// Legal-drop pre-check: does any candidate output tag fit any admissible hole tag?
///
/// Checked from the candidate's side only and without mutation.
pub fn accepts(hole: &[TypeTag], outputs: &[TypeTag]) -> bool {
    outputs
        .iter()
        .any(|out| hole.iter().any(|h| compatible(out, h)))
}
