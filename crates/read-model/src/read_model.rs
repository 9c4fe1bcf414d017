//! Read model trait for query-side views.

/// A read model providing query access to denormalized data.
///
/// Read models are updated by projections and optimized for fast reads; the
/// event stream remains the source of truth.
pub trait ReadModel: Send + Sync {
    /// Returns the name of this read model.
    fn name(&self) -> &'static str;

    /// Returns the number of entries in this read model.
    ///
    /// Best effort: implementations backed by an async lock may return 0
    /// instead of blocking when the lock is held by a writer. Use the view's
    /// own async accessors when an exact count matters.
    fn count(&self) -> usize;
}
