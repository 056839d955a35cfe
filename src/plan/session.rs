use std::collections::HashMap;
use std::future::Future;
use std::sync::Mutex;

use alloy::primitives::Address;
use tokio::sync::watch;
use tracing::info;

use super::PlanError;
use super::evm;

/// At most one plan build in flight per wallet.
///
/// Every build takes a ticket carrying the wallet's new generation number.
/// A newer ticket for the same wallet makes older ones resolve to
/// [`PlanError::Superseded`] instead of finishing.
#[derive(Debug, Default)]
pub struct PlanSessions {
    wallets: Mutex<HashMap<Address, watch::Sender<u64>>>,
}

#[derive(Debug)]
pub struct BuildTicket {
    pub generation: u64,
    rx: watch::Receiver<u64>,
}

impl BuildTicket {
    pub fn is_current(&self) -> bool {
        *self.rx.borrow() == self.generation
    }

    /// Resolves once a newer build for the same wallet has started.
    pub async fn superseded(&mut self) {
        let generation = self.generation;
        if self.rx.wait_for(|g| *g != generation).await.is_err() {
            std::future::pending::<()>().await;
        }
    }
}

impl PlanSessions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a build for `wallet`, superseding any build already running.
    pub fn begin(&self, wallet: Address) -> BuildTicket {
        let mut wallets = self.lock();
        let tx = wallets
            .entry(wallet)
            .or_insert_with(|| watch::channel(0).0);
        let mut generation = 0;
        tx.send_modify(|g| {
            *g += 1;
            generation = *g;
        });
        BuildTicket {
            generation,
            rx: tx.subscribe(),
        }
    }

    /// Wallets with a build registered.
    pub fn active_wallets(&self) -> usize {
        self.lock().len()
    }

    /// Forget `wallet` unless a newer build has started since `generation`.
    fn release(&self, wallet: Address, generation: u64) {
        let mut wallets = self.lock();
        if wallets.get(&wallet).is_some_and(|tx| *tx.borrow() == generation) {
            wallets.remove(&wallet);
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<Address, watch::Sender<u64>>> {
        self.wallets
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Drive `build` under a fresh ticket for `wallet`. The wallet's entry is
    /// dropped when the current build finishes or is cancelled.
    pub async fn run<T, F>(&self, wallet: Address, build: F) -> Result<T, PlanError>
    where
        F: Future<Output = Result<T, PlanError>>,
    {
        let mut ticket = self.begin(wallet);
        let generation = ticket.generation;
        let _release = Release {
            sessions: self,
            wallet,
            generation,
        };
        tokio::select! {
            result = build => result,
            _ = ticket.superseded() => {
                info!(
                    wallet = %evm::short_addr(&wallet),
                    generation,
                    "plan build superseded"
                );
                Err(PlanError::Superseded)
            }
        }
    }
}

struct Release<'a> {
    sessions: &'a PlanSessions,
    wallet: Address,
    generation: u64,
}

impl Drop for Release<'_> {
    fn drop(&mut self) {
        self.sessions.release(self.wallet, self.generation);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn newer_ticket_replaces_older() {
        let sessions = PlanSessions::new();
        let wallet = Address::repeat_byte(0xaa);
        let first = sessions.begin(wallet);
        assert!(first.is_current());
        let second = sessions.begin(wallet);
        assert!(!first.is_current());
        assert!(second.is_current());

        let other = sessions.begin(Address::repeat_byte(0xbb));
        assert!(other.is_current());
        assert!(second.is_current());
    }

    #[tokio::test]
    async fn finished_builds_release_the_wallet() {
        let sessions = PlanSessions::new();
        let wallet = Address::repeat_byte(0xaa);
        let result = sessions.run(wallet, async { Ok::<_, PlanError>(1) }).await;
        assert_eq!(result.unwrap(), 1);
        assert_eq!(sessions.active_wallets(), 0);

        let failed = sessions
            .run(wallet, async { Err::<u32, _>(PlanError::ZeroAmount) })
            .await;
        assert!(failed.is_err());
        assert_eq!(sessions.active_wallets(), 0);
    }

    #[test]
    fn stale_release_keeps_newer_build() {
        let sessions = PlanSessions::new();
        let wallet = Address::repeat_byte(0xaa);
        let first = sessions.begin(wallet);
        let second = sessions.begin(wallet);
        sessions.release(wallet, first.generation);
        assert_eq!(sessions.active_wallets(), 1);
        sessions.release(wallet, second.generation);
        assert_eq!(sessions.active_wallets(), 0);
    }
}
