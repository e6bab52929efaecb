///
/// RelationModel
/// Runtime relation metadata; drives scope planning, relation filters,
/// relation attachment, and write-time cascades.
///

#[derive(Debug)]
pub struct RelationModel {
    /// Relation name as used in filters, ordering, and projections.
    pub name: &'static str,
    /// Target entity name.
    pub target: &'static str,
    pub kind: RelationKind,
    /// Foreign-key field: on this entity for `ToOne`, on the target for `ToMany`.
    pub fk_field: &'static str,
    /// Required relations reject disconnect/set and cascade on delete.
    pub required: bool,
}

///
/// RelationKind
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum RelationKind {
    ToOne,
    ToMany,
}

impl RelationKind {
    #[must_use]
    pub const fn is_to_one(self) -> bool {
        matches!(self, Self::ToOne)
    }

    #[must_use]
    pub const fn is_to_many(self) -> bool {
        matches!(self, Self::ToMany)
    }
}
