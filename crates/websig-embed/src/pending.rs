//! Outstanding handshakes keyed by envelope id

use websig_core::{EmbedError, OperationKind};

#[derive(Debug)]
pub struct PendingOperation<T> {
    pub id: String,
    pub kind: OperationKind,
    pub timer: Option<T>,
}

/// At most one operation of each kind, kept in the order they started
#[derive(Debug)]
pub struct PendingOperations<T> {
    operations: Vec<PendingOperation<T>>,
}

impl<T> Default for PendingOperations<T> {
    fn default() -> Self {
        Self {
            operations: Vec::new(),
        }
    }
}

impl<T> PendingOperations<T> {
    pub fn ensure_idle(&self, kind: OperationKind) -> Result<(), EmbedError> {
        if self.operations.iter().any(|op| op.kind == kind) {
            return Err(EmbedError::OperationInFlight(kind));
        }
        Ok(())
    }

    pub fn begin(&mut self, operation: PendingOperation<T>) -> Result<(), EmbedError> {
        self.ensure_idle(operation.kind)?;
        self.operations.push(operation);
        Ok(())
    }

    pub fn is_pending(&self, kind: OperationKind) -> bool {
        self.operations.iter().any(|op| op.kind == kind)
    }

    pub fn len(&self) -> usize {
        self.operations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }

    pub fn take_by_id(&mut self, id: &str) -> Option<PendingOperation<T>> {
        let index = self.operations.iter().position(|op| op.id == id)?;
        Some(self.operations.remove(index))
    }

    pub fn take_by_kind(&mut self, kind: OperationKind) -> Option<PendingOperation<T>> {
        let index = self.operations.iter().position(|op| op.kind == kind)?;
        Some(self.operations.remove(index))
    }

    pub fn take_oldest(&mut self) -> Option<PendingOperation<T>> {
        if self.operations.is_empty() {
            None
        } else {
            Some(self.operations.remove(0))
        }
    }

    /// Resolve by echoed id first, then by kind, then oldest when `fallback_to_oldest`
    pub fn resolve(
        &mut self,
        id: Option<&str>,
        kind: Option<OperationKind>,
        fallback_to_oldest: bool,
    ) -> Option<PendingOperation<T>> {
        if let Some(op) = id.and_then(|id| self.take_by_id(id)) {
            return Some(op);
        }
        if let Some(op) = kind.and_then(|kind| self.take_by_kind(kind)) {
            return Some(op);
        }
        if fallback_to_oldest {
            return self.take_oldest();
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn op(id: &str, kind: OperationKind) -> PendingOperation<()> {
        PendingOperation {
            id: id.to_string(),
            kind,
            timer: None,
        }
    }

    #[test]
    fn test_one_operation_per_kind() {
        let mut pending = PendingOperations::default();
        pending.begin(op("a", OperationKind::Connect)).unwrap();
        pending.begin(op("b", OperationKind::Sign)).unwrap();

        let overlap = pending.begin(op("c", OperationKind::Connect));
        assert!(matches!(
            overlap,
            Err(EmbedError::OperationInFlight(OperationKind::Connect))
        ));
        assert_eq!(pending.len(), 2);
    }

    #[test]
    fn test_resolve_prefers_id_then_kind_then_oldest() {
        let mut pending = PendingOperations::default();
        pending.begin(op("connect-1", OperationKind::Connect)).unwrap();
        pending.begin(op("sign-1", OperationKind::Sign)).unwrap();

        let by_id = pending
            .resolve(Some("sign-1"), Some(OperationKind::Connect), true)
            .unwrap();
        assert_eq!(by_id.id, "sign-1");

        pending.begin(op("sign-2", OperationKind::Sign)).unwrap();
        let by_kind = pending
            .resolve(Some("missing"), Some(OperationKind::Sign), true)
            .unwrap();
        assert_eq!(by_kind.id, "sign-2");

        assert!(pending.resolve(None, Some(OperationKind::Sign), false).is_none());
        let oldest = pending.resolve(None, None, true).unwrap();
        assert_eq!(oldest.id, "connect-1");
        assert!(pending.is_empty());
    }
}
