use crate::{
    db::{record::Record, store::KeyTuple},
    error::InternalError,
    model::EntityModel,
};
use std::collections::BTreeSet;

///
/// Logical set combinators
///
/// AND/OR/NOT composition over record sets, keyed by each record's key-path
/// tuple. The entity client applies these in the fixed AND → OR → NOT
/// narrowing order; that ordering is part of the contract, not of this
/// module.
///

fn key_set(records: &[Record], model: &EntityModel) -> Result<BTreeSet<KeyTuple>, InternalError> {
    records.iter().map(|r| r.key_tuple(model)).collect()
}

/// Intersect sub-clause results: a record survives only if present in every
/// list. The first list provides iteration order.
pub(crate) fn intersect_by_key(
    mut lists: Vec<Vec<Record>>,
    model: &EntityModel,
) -> Result<Vec<Record>, InternalError> {
    let Some(first) = (!lists.is_empty()).then(|| lists.remove(0)) else {
        return Ok(Vec::new());
    };

    let mut keep: BTreeSet<KeyTuple> = key_set(&first, model)?;
    for list in &lists {
        let present = key_set(list, model)?;
        keep.retain(|key| present.contains(key));
    }

    first
        .into_iter()
        .filter_map(|record| match record.key_tuple(model) {
            Ok(key) => keep.contains(&key).then_some(Ok(record)),
            Err(e) => Some(Err(e)),
        })
        .collect()
}

/// Union sub-clause results, de-duplicated by key tuple; the first
/// occurrence of a key wins.
pub(crate) fn union_by_key(
    lists: Vec<Vec<Record>>,
    model: &EntityModel,
) -> Result<Vec<Record>, InternalError> {
    let mut seen: BTreeSet<KeyTuple> = BTreeSet::new();
    let mut out = Vec::new();
    for record in lists.into_iter().flatten() {
        let key = record.key_tuple(model)?;
        if seen.insert(key) {
            out.push(record);
        }
    }

    Ok(out)
}

/// Remove every record whose key tuple appears in `excluded`.
pub(crate) fn subtract_by_key(
    records: Vec<Record>,
    excluded: &[Record],
    model: &EntityModel,
) -> Result<Vec<Record>, InternalError> {
    let excluded_keys = key_set(excluded, model)?;

    records
        .into_iter()
        .filter_map(|record| match record.key_tuple(model) {
            Ok(key) => (!excluded_keys.contains(&key)).then_some(Ok(record)),
            Err(e) => Some(Err(e)),
        })
        .collect()
}
