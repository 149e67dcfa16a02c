use crate::constants::{BATCH_CAPACITY, CENSUS_LINE_ENTITY};
use crate::types::{CensusId, CensusLine, Fields, PersonRow};
use serde::Serialize;
use tracing::debug;

/// A create operation waiting for its unit of work to commit
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PendingCreate {
    pub entity: String,
    pub fields: Fields,
}

/// Bounded, ordered set of pending creates committed together
#[derive(Debug, Clone, Serialize)]
pub struct UnitOfWork {
    census_id: CensusId,
    capacity: usize,
    operations: Vec<PendingCreate>,
}

impl UnitOfWork {
    pub fn new(census_id: CensusId) -> Self {
        Self::with_capacity(census_id, BATCH_CAPACITY)
    }

    pub fn with_capacity(census_id: CensusId, capacity: usize) -> Self {
        Self {
            census_id,
            capacity,
            operations: Vec::with_capacity(capacity),
        }
    }

    /// Queue a create. A full unit hands the operation back untouched.
    pub fn register_create(
        &mut self,
        entity: &str,
        fields: Fields,
    ) -> std::result::Result<(), PendingCreate> {
        let op = PendingCreate {
            entity: entity.to_string(),
            fields,
        };
        if self.is_full() {
            return Err(op);
        }
        self.operations.push(op);
        Ok(())
    }

    pub fn census_id(&self) -> &CensusId {
        &self.census_id
    }

    pub fn operations(&self) -> &[PendingCreate] {
        &self.operations
    }

    pub fn into_operations(self) -> Vec<PendingCreate> {
        self.operations
    }

    pub fn len(&self) -> usize {
        self.operations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.operations.len() >= self.capacity
    }
}

/// Split rows into units of work of at most `BATCH_CAPACITY` CensusLine creates.
///
/// Row order is preserved across the returned batches. Empty input still yields
/// one empty batch so the commit loop always runs at least once.
pub fn build_batches(census_id: &CensusId, rows: &[PersonRow]) -> Vec<UnitOfWork> {
    build_batches_with_capacity(census_id, rows, BATCH_CAPACITY)
}

pub(crate) fn build_batches_with_capacity(
    census_id: &CensusId,
    rows: &[PersonRow],
    capacity: usize,
) -> Vec<UnitOfWork> {
    let mut batches = Vec::with_capacity(rows.len() / capacity.max(1) + 1);
    let mut current = UnitOfWork::with_capacity(census_id.clone(), capacity);

    for row in rows {
        let fields = CensusLine::new(census_id.clone(), row.clone()).to_fields();
        if let Err(op) = current.register_create(CENSUS_LINE_ENTITY, fields) {
            let sealed = std::mem::replace(
                &mut current,
                UnitOfWork::with_capacity(census_id.clone(), capacity),
            );
            debug!(census_id = %census_id, size = sealed.len(), "Sealed batch");
            batches.push(sealed);
            current.operations.push(op);
        }
    }
    batches.push(current);

    batches
}
