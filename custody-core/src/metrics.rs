//! Metrics collection for observability
//!
//! This module provides Prometheus counters for the ledger.
//!
//! # Metrics
//!
//! - `custody_instructions_total{operation,outcome}` - Applied instructions
//! - `custody_rejections_total{error}` - Rejections by error kind

use crate::error::ErrorKind;
use crate::instruction::Operation;
use prometheus::{IntCounterVec, Opts, Registry};
use std::sync::Arc;

/// Metrics collector
///
/// Counters live in a private registry so several ledgers (one per policy
/// in the harness) can coexist in one process.
#[derive(Clone)]
pub struct Metrics {
    /// Applied instructions by operation and outcome
    pub instructions_total: IntCounterVec,

    /// Rejections by error kind
    pub rejections_total: IntCounterVec,

    /// Prometheus registry
    pub registry: Arc<Registry>,
}

impl Metrics {
    /// Create new metrics collector
    pub fn new() -> prometheus::Result<Self> {
        let registry = Arc::new(Registry::new());

        let instructions_total = IntCounterVec::new(
            Opts::new("custody_instructions_total", "Applied instructions"),
            &["operation", "outcome"],
        )?;
        registry.register(Box::new(instructions_total.clone()))?;

        let rejections_total = IntCounterVec::new(
            Opts::new("custody_rejections_total", "Rejected instructions by error kind"),
            &["error"],
        )?;
        registry.register(Box::new(rejections_total.clone()))?;

        Ok(Self {
            instructions_total,
            rejections_total,
            registry,
        })
    }

    /// Record a committed instruction
    pub fn record_success(&self, operation: Operation) {
        self.instructions_total
            .with_label_values(&[operation.name(), "ok"])
            .inc();
    }

    /// Record a rejected instruction
    pub fn record_rejection(&self, operation: Option<Operation>, kind: ErrorKind) {
        let operation = operation.map_or("unknown", |op| op.name());
        self.instructions_total
            .with_label_values(&[operation, "rejected"])
            .inc();
        self.rejections_total.with_label_values(&[kind.name()]).inc();
    }

    /// Rejections recorded for `kind`
    pub fn rejections(&self, kind: ErrorKind) -> u64 {
        self.rejections_total.with_label_values(&[kind.name()]).get()
    }
}

impl std::fmt::Debug for Metrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Metrics").finish_non_exhaustive()
    }
}
