//! Collection reconciliation.
//!
//! Compares the locally held collection with a freshly delivered snapshot
//! and produces the positional operations that turn one into the other.
//!
//! Operations are emitted in four groups and must be applied in order:
//! 1. `Remove` for ids missing from the snapshot (ascending prior position)
//! 2. `Update` for surviving ids whose content changed (snapshot order)
//! 3. `Move` for survivors outside a longest run that is already in order
//! 4. `Insert` for ids new to the collection (ascending snapshot position)
//!
//! Every index refers to the collection as it stands when that operation
//! is applied, so replaying the list with [`apply_ops`] yields the snapshot.

use std::borrow::Cow;
use std::collections::{HashMap, HashSet};

use tracing::warn;

use super::entity::Entity;
use super::error::SyncError;

/// A single positional change to a displayed collection.
#[derive(Debug, Clone, PartialEq)]
pub enum Operation<T> {
    /// Remove the element at `index`.
    Remove { index: usize, id: String },
    /// Replace the element at `index` (same id, new content).
    Update { index: usize, entity: T },
    /// Take the element at `from` out and reinsert it so it ends at `to`.
    Move { from: usize, to: usize, id: String },
    /// Insert a new element at `index`.
    Insert { index: usize, entity: T },
}

impl<T: Entity> Operation<T> {
    /// Id of the entity this operation touches.
    pub fn id(&self) -> &str {
        match self {
            Operation::Remove { id, .. } | Operation::Move { id, .. } => id,
            Operation::Update { entity, .. } | Operation::Insert { entity, .. } => entity.id(),
        }
    }
}

/// What to do when an input contains the same id twice.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DuplicatePolicy {
    /// Fail with [`SyncError::ContractViolation`].
    Reject,
    /// Keep the first occurrence, drop the rest and log a warning.
    FirstSeenWins,
}

impl Default for DuplicatePolicy {
    /// Strict in debug builds, repairing in release builds.
    fn default() -> Self {
        if cfg!(debug_assertions) {
            DuplicatePolicy::Reject
        } else {
            DuplicatePolicy::FirstSeenWins
        }
    }
}

/// Result of reconciling a collection against a snapshot.
#[derive(Debug, Clone)]
pub struct Reconciliation<T> {
    /// The collection after the operations are applied.
    pub new_local: Vec<T>,
    /// Operations to apply, in order.
    pub ops: Vec<Operation<T>>,
}

/// Reconciles `local` against `incoming`, rejecting duplicate ids.
pub fn reconcile<T: Entity>(local: &[T], incoming: &[T]) -> Result<Reconciliation<T>, SyncError> {
    reconcile_with(local, incoming, DuplicatePolicy::Reject)
}

/// Reconciles `local` against `incoming` with an explicit duplicate policy.
pub fn reconcile_with<T: Entity>(
    local: &[T],
    incoming: &[T],
    policy: DuplicatePolicy,
) -> Result<Reconciliation<T>, SyncError> {
    let local = unique_by_id(local, policy)?;
    let incoming = unique_by_id(incoming, policy)?;

    let ops = diff(&local, &incoming);

    Ok(Reconciliation {
        new_local: incoming.into_owned(),
        ops,
    })
}

/// Applies operations to `items`.
///
/// Either every operation applies or `items` is left untouched.
pub fn apply_ops<T: Clone>(items: &mut Vec<T>, ops: &[Operation<T>]) -> Result<(), SyncError> {
    let mut working = items.clone();

    for op in ops {
        let len = working.len();
        match op {
            Operation::Remove { index, .. } => {
                check_index(*index, len)?;
                working.remove(*index);
            }
            Operation::Update { index, entity } => {
                check_index(*index, len)?;
                working[*index] = entity.clone();
            }
            Operation::Move { from, to, .. } => {
                check_index(*from, len)?;
                check_index(*to, len)?;
                let moved = working.remove(*from);
                working.insert(*to, moved);
            }
            Operation::Insert { index, entity } => {
                check_index(*index, len + 1)?;
                working.insert(*index, entity.clone());
            }
        }
    }

    *items = working;
    Ok(())
}

fn check_index(index: usize, len: usize) -> Result<(), SyncError> {
    if index < len {
        Ok(())
    } else {
        Err(SyncError::InvalidOperation { index, len })
    }
}

/// Returns `entities` with unique ids, according to `policy`.
fn unique_by_id<T: Entity>(entities: &[T], policy: DuplicatePolicy) -> Result<Cow<'_, [T]>, SyncError> {
    let mut seen = HashSet::with_capacity(entities.len());
    let first_duplicate = entities.iter().find(|e| !seen.insert(e.id()));

    let Some(duplicate) = first_duplicate else {
        return Ok(Cow::Borrowed(entities));
    };

    match policy {
        DuplicatePolicy::Reject => Err(SyncError::ContractViolation {
            id: duplicate.id().to_string(),
        }),
        DuplicatePolicy::FirstSeenWins => {
            let mut seen = HashSet::with_capacity(entities.len());
            let kept: Vec<T> = entities
                .iter()
                .filter(|e| seen.insert(e.id()))
                .cloned()
                .collect();
            warn!(
                id = duplicate.id(),
                dropped = entities.len() - kept.len(),
                "Dropping duplicate ids from collection"
            );
            Ok(Cow::Owned(kept))
        }
    }
}

fn diff<T: Entity>(local: &[T], incoming: &[T]) -> Vec<Operation<T>> {
    let target: HashMap<&str, usize> = incoming
        .iter()
        .enumerate()
        .map(|(i, e)| (e.id(), i))
        .collect();

    let mut ops = Vec::new();

    // Survivors in local order, identified by their snapshot position.
    let mut working: Vec<usize> = Vec::with_capacity(local.len());
    let mut previous: Vec<&T> = Vec::with_capacity(local.len());

    let mut removed = 0;
    for (prior, entity) in local.iter().enumerate() {
        match target.get(entity.id()) {
            Some(&position) => {
                working.push(position);
                previous.push(entity);
            }
            None => {
                ops.push(Operation::Remove {
                    index: prior - removed,
                    id: entity.id().to_string(),
                });
                removed += 1;
            }
        }
    }

    let mut updates: Vec<(usize, usize)> = working
        .iter()
        .zip(&previous)
        .enumerate()
        .filter(|(_, (position, old))| !old.same_content(&incoming[**position]))
        .map(|(index, (position, _))| (*position, index))
        .collect();
    updates.sort_unstable();
    for (position, index) in updates {
        ops.push(Operation::Update {
            index,
            entity: incoming[position].clone(),
        });
    }

    let mut in_order = vec![false; incoming.len()];
    for (slot, keep) in longest_increasing(&working).into_iter().enumerate() {
        if keep {
            in_order[working[slot]] = true;
        }
    }

    // Each displaced survivor is placed right behind its predecessor in
    // snapshot order; predecessors are either in order already or placed.
    let mut survivors = working.clone();
    survivors.sort_unstable();
    for (rank, &position) in survivors.iter().enumerate() {
        if in_order[position] {
            continue;
        }
        let Some(from) = working.iter().position(|&p| p == position) else {
            continue;
        };
        working.remove(from);
        let to = match rank {
            0 => 0,
            _ => {
                let predecessor = survivors[rank - 1];
                working
                    .iter()
                    .position(|&p| p == predecessor)
                    .map_or(0, |i| i + 1)
            }
        };
        working.insert(to, position);
        if from != to {
            ops.push(Operation::Move {
                from,
                to,
                id: incoming[position].id().to_string(),
            });
        }
    }

    let known: HashSet<&str> = local.iter().map(|e| e.id()).collect();
    for (index, entity) in incoming.iter().enumerate() {
        if !known.contains(entity.id()) {
            ops.push(Operation::Insert {
                index,
                entity: entity.clone(),
            });
        }
    }

    ops
}

/// Marks the elements of one longest strictly increasing subsequence.
fn longest_increasing(seq: &[usize]) -> Vec<bool> {
    // tails[k]: index of the smallest tail of an increasing run of length k + 1
    let mut tails: Vec<usize> = Vec::new();
    let mut parent: Vec<Option<usize>> = vec![None; seq.len()];

    for (i, &value) in seq.iter().enumerate() {
        let slot = tails.partition_point(|&t| seq[t] < value);
        if slot > 0 {
            parent[i] = Some(tails[slot - 1]);
        }
        if slot == tails.len() {
            tails.push(i);
        } else {
            tails[slot] = i;
        }
    }

    let mut keep = vec![false; seq.len()];
    let mut cursor = tails.last().copied();
    while let Some(i) = cursor {
        keep[i] = true;
        cursor = parent[i];
    }
    keep
}

/// Owns the collection shown on one display surface.
///
/// The retained collection only changes through [`CollectionSynchronizer::reconcile`],
/// which swaps in the snapshot and returns the operations in one step.
#[derive(Debug)]
pub struct CollectionSynchronizer<T> {
    local: Vec<T>,
    policy: DuplicatePolicy,
}

impl<T: Entity> CollectionSynchronizer<T> {
    /// Creates an empty synchronizer with the build's default duplicate policy.
    pub fn new() -> Self {
        Self::with_policy(DuplicatePolicy::default())
    }

    /// Creates an empty synchronizer with an explicit duplicate policy.
    pub fn with_policy(policy: DuplicatePolicy) -> Self {
        Self {
            local: Vec::new(),
            policy,
        }
    }

    /// The collection as last reconciled.
    pub fn items(&self) -> &[T] {
        &self.local
    }

    /// Reconciles the retained collection against `incoming`.
    ///
    /// On error the retained collection is unchanged.
    pub fn reconcile(&mut self, incoming: Vec<T>) -> Result<Vec<Operation<T>>, SyncError> {
        let Reconciliation { new_local, ops } = reconcile_with(&self.local, &incoming, self.policy)?;
        self.local = new_local;
        Ok(ops)
    }
}

impl<T: Entity> Default for CollectionSynchronizer<T> {
    fn default() -> Self {
        Self::new()
    }
}
