//! One-shot readiness signal for the query facade.

use std::sync::Arc;
use tokio::sync::watch;

use crate::error::DbError;

#[derive(Debug, Clone)]
enum GateState {
    Pending,
    Open,
    Failed(Arc<str>),
}

/// Resolves exactly once, either open or failed.
///
/// The sender lives inside the gate, so the channel never closes while anyone
/// can still await it.
#[derive(Debug)]
pub struct ReadinessGate {
    tx: watch::Sender<GateState>,
}

impl Default for ReadinessGate {
    fn default() -> Self {
        Self::new()
    }
}

impl ReadinessGate {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(GateState::Pending);
        Self { tx }
    }

    pub fn is_open(&self) -> bool {
        matches!(*self.tx.borrow(), GateState::Open)
    }

    /// Non-blocking check used by every facade call.
    pub fn check(&self) -> Result<(), DbError> {
        if self.is_open() {
            Ok(())
        } else {
            Err(DbError::NotReady)
        }
    }

    /// Opens the gate. Returns false if it was already resolved.
    pub fn open(&self) -> bool {
        self.resolve(GateState::Open)
    }

    /// Marks initialization as failed. Returns false if it was already resolved.
    pub fn fail(&self, reason: impl Into<Arc<str>>) -> bool {
        self.resolve(GateState::Failed(reason.into()))
    }

    fn resolve(&self, next: GateState) -> bool {
        self.tx.send_if_modified(|state| {
            if matches!(state, GateState::Pending) {
                *state = next;
                true
            } else {
                false
            }
        })
    }

    /// Waits until the gate resolves. Returns immediately when it already has.
    pub async fn wait(&self) -> Result<(), DbError> {
        let mut rx = self.tx.subscribe();
        let state = rx
            .wait_for(|s| !matches!(s, GateState::Pending))
            .await
            .map_err(|_| DbError::NotReady)?;
        match &*state {
            GateState::Open => Ok(()),
            GateState::Failed(reason) => Err(DbError::InitFailed(reason.to_string())),
            GateState::Pending => Err(DbError::NotReady),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn pending_gate_fails_fast() {
        let gate = ReadinessGate::new();
        assert!(matches!(gate.check(), Err(DbError::NotReady)));
        assert!(matches!(*gate.tx.borrow(), GateState::Pending));
    }

    #[tokio::test]
    async fn every_waiter_sees_the_same_resolution() {
        let gate = Arc::new(ReadinessGate::new());
        let waiters: Vec<_> = (0..8)
            .map(|_| {
                let gate = gate.clone();
                tokio::spawn(async move { gate.wait().await })
            })
            .collect();

        tokio::time::sleep(Duration::from_millis(10)).await;
        assert!(gate.open());
        assert!(!gate.open(), "second resolution must be ignored");

        for w in futures::future::join_all(waiters).await {
            assert!(w.unwrap().is_ok());
        }
        gate.check().unwrap();
    }

    #[tokio::test]
    async fn late_waiter_returns_immediately() {
        let gate = ReadinessGate::new();
        gate.open();
        tokio::time::timeout(Duration::from_millis(50), gate.wait())
            .await
            .expect("late waiter must not block")
            .unwrap();
    }

    #[tokio::test]
    async fn failed_gate_never_opens() {
        let gate = ReadinessGate::new();
        assert!(gate.fail("schema broke"));
        assert!(!gate.open());
        match gate.wait().await {
            Err(DbError::InitFailed(reason)) => assert_eq!(reason, "schema broke"),
            other => panic!("unexpected: {other:?}"),
        }
        assert!(matches!(gate.check(), Err(DbError::NotReady)));
    }
}
