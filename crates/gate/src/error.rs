use thiserror::Error;

#[derive(Debug, Error)]
pub enum GateError {
    #[error("failed to open audit log: {0}")]
    AuditLog(#[from] audit::AuditError),
}
