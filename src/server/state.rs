use crate::gazetteer::MatchResolver;

/// Read-only after startup, so handlers share it without a lock.
pub struct AppState {
    pub resolver: MatchResolver,
}
