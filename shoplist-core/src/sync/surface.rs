//! Display surfaces consume the operations emitted by a controller.

use tracing::warn;

use super::controller::Update;
use super::error::SyncError;
use super::reconcile::{apply_ops, Operation};

/// Something that shows a collection and is kept current by operations.
pub trait DisplaySurface<T> {
    /// Applies one batch of operations, in order.
    fn render(&mut self, ops: &[Operation<T>]);

    /// Shows a failure to the user. Called once per failure.
    fn report(&mut self, error: &SyncError);
}

impl<T> Update<T> {
    /// Forwards this update to `surface`.
    pub fn deliver_to<S: DisplaySurface<T> + ?Sized>(&self, surface: &mut S) {
        match self {
            Update::Changed(ops) => surface.render(ops),
            Update::Failed(error) => surface.report(error),
        }
    }
}

/// Surface that keeps a plain replica of the collection.
#[derive(Debug, Clone)]
pub struct MirrorSurface<T> {
    rows: Vec<T>,
    errors: Vec<String>,
}

impl<T> Default for MirrorSurface<T> {
    fn default() -> Self {
        Self {
            rows: Vec::new(),
            errors: Vec::new(),
        }
    }
}

impl<T: Clone> MirrorSurface<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn rows(&self) -> &[T] {
        &self.rows
    }

    /// Messages of every reported failure, oldest first.
    pub fn errors(&self) -> &[String] {
        &self.errors
    }
}

impl<T: Clone> DisplaySurface<T> for MirrorSurface<T> {
    fn render(&mut self, ops: &[Operation<T>]) {
        if let Err(e) = apply_ops(&mut self.rows, ops) {
            warn!(error = %e, "Replica diverged from operations");
            self.errors.push(e.to_string());
        }
    }

    fn report(&mut self, error: &SyncError) {
        self.errors.push(error.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::StoreError;

    #[test]
    fn test_mirror_applies_changes() {
        let mut surface = MirrorSurface::new();
        let update = Update::Changed(vec![
            Operation::Insert {
                index: 0,
                entity: "b".to_string(),
            },
            Operation::Insert {
                index: 0,
                entity: "a".to_string(),
            },
        ]);
        update.deliver_to(&mut surface);

        assert_eq!(surface.rows(), &["a".to_string(), "b".to_string()]);
        assert!(surface.errors().is_empty());
    }

    #[test]
    fn test_mirror_records_failures() {
        let mut surface: MirrorSurface<String> = MirrorSurface::new();
        Update::<String>::Failed(SyncError::Backend(StoreError::Listener("offline".to_string())))
            .deliver_to(&mut surface);

        assert_eq!(surface.errors().len(), 1);
        assert!(surface.errors()[0].contains("offline"));
    }

    #[test]
    fn test_mirror_flags_out_of_range_ops() {
        let mut surface: MirrorSurface<String> = MirrorSurface::new();
        surface.render(&[Operation::Remove {
            index: 3,
            id: "x".to_string(),
        }]);

        assert!(surface.rows().is_empty());
        assert_eq!(surface.errors().len(), 1);
    }
}
