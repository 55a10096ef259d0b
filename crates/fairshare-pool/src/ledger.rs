//! Pool funds ledger.
//!
//! Tracks the principal contributed by channel creators and reads the
//! yield source's balance to derive accrued yield. The ledger never moves
//! funds out; principal only grows.

use std::fmt;
use std::sync::Arc;

use fairshare_core::error::LedgerError;
use fairshare_core::math::checked_add;
use fairshare_core::traits::YieldSource;
use fairshare_core::types::Amount;
use tracing::{debug, warn};

pub struct PoolLedger {
    principal: Amount,
    source: Arc<dyn YieldSource>,
}

impl fmt::Debug for PoolLedger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PoolLedger")
            .field("principal", &self.principal)
            .finish_non_exhaustive()
    }
}

impl PoolLedger {
    pub fn new(source: Arc<dyn YieldSource>) -> Self {
        Self { principal: 0, source }
    }

    /// Sum of all successful deposits.
    pub fn principal(&self) -> Amount {
        self.principal
    }

    /// Funds the pool is accountable for. Same as [`principal`](Self::principal).
    pub fn pool_funds(&self) -> Amount {
        self.principal
    }

    /// Forward `amount` to the yield source and record it as principal.
    ///
    /// The principal is committed only after the source accepts the deposit.
    ///
    /// # Errors
    ///
    /// - [`LedgerError::Math`] if the principal would overflow (source not called)
    /// - [`LedgerError::ExternalDepositFailed`] if the source rejects the deposit
    pub fn deposit(&mut self, amount: Amount) -> Result<(), LedgerError> {
        let principal = checked_add(self.principal, amount)?;
        self.source.deposit(amount).map_err(|source| {
            warn!(amount, error = %source, "yield source rejected deposit");
            LedgerError::ExternalDepositFailed { amount, source }
        })?;
        self.principal = principal;
        debug!(amount, principal, "deposit recorded");
        Ok(())
    }

    /// Balance reported by the yield source.
    pub fn balance(&self) -> Result<Amount, LedgerError> {
        self.source.balance().map_err(LedgerError::BalanceQueryFailed)
    }

    /// Yield accrued over the principal: `balance - principal`.
    ///
    /// # Errors
    ///
    /// - [`LedgerError::BalanceQueryFailed`] if the source cannot report a balance
    /// - [`LedgerError::NegativeYieldObserved`] if the balance is below principal
    pub fn current_yield(&self) -> Result<Amount, LedgerError> {
        let balance = self.balance()?;
        balance
            .checked_sub(self.principal)
            .ok_or(LedgerError::NegativeYieldObserved {
                balance,
                principal: self.principal,
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fairshare_core::error::{MathError, YieldSourceError};
    use fairshare_core::memory::MemoryYieldSource;

    fn ledger() -> (Arc<MemoryYieldSource>, PoolLedger) {
        let source = Arc::new(MemoryYieldSource::new());
        let ledger = PoolLedger::new(source.clone());
        (source, ledger)
    }

    #[test]
    fn deposit_updates_principal_and_source() {
        let (source, mut ledger) = ledger();
        ledger.deposit(50).unwrap();
        ledger.deposit(100).unwrap();
        assert_eq!(ledger.principal(), 150);
        assert_eq!(ledger.pool_funds(), 150);
        assert_eq!(source.balance().unwrap(), 150);
        assert_eq!(ledger.current_yield().unwrap(), 0);
    }

    #[test]
    fn yield_is_balance_over_principal() {
        let (source, mut ledger) = ledger();
        ledger.deposit(1_000).unwrap();
        source.accrue(37);
        assert_eq!(ledger.current_yield().unwrap(), 37);
        assert_eq!(ledger.principal(), 1_000);
    }

    #[test]
    fn failed_deposit_leaves_principal() {
        let (source, mut ledger) = ledger();
        ledger.deposit(10).unwrap();
        source.fail_next_deposit("paused");
        assert_eq!(
            ledger.deposit(20),
            Err(LedgerError::ExternalDepositFailed {
                amount: 20,
                source: YieldSourceError::Rejected("paused".into()),
            })
        );
        assert_eq!(ledger.principal(), 10);
    }

    #[test]
    fn overflow_does_not_reach_source() {
        let (source, mut ledger) = ledger();
        ledger.deposit(u128::MAX).unwrap();
        assert_eq!(
            ledger.deposit(1),
            Err(LedgerError::Math(MathError::ArithmeticOverflow))
        );
        assert_eq!(source.deposit_count(), 1);
    }

    #[test]
    fn loss_reports_negative_yield() {
        let (source, mut ledger) = ledger();
        ledger.deposit(100).unwrap();
        source.slash(30);
        assert_eq!(
            ledger.current_yield(),
            Err(LedgerError::NegativeYieldObserved { balance: 70, principal: 100 })
        );
    }

    struct Offline;

    impl YieldSource for Offline {
        fn deposit(&self, _amount: Amount) -> Result<(), YieldSourceError> {
            Err(YieldSourceError::Unavailable("offline".into()))
        }

        fn balance(&self) -> Result<Amount, YieldSourceError> {
            Err(YieldSourceError::Unavailable("offline".into()))
        }
    }

    #[test]
    fn unavailable_source_fails_balance_query() {
        let ledger = PoolLedger::new(Arc::new(Offline));
        assert_eq!(
            ledger.current_yield(),
            Err(LedgerError::BalanceQueryFailed(YieldSourceError::Unavailable(
                "offline".into()
            )))
        );
    }

    #[test]
    fn debug_hides_source() {
        let (_, ledger) = ledger();
        let debug = format!("{ledger:?}");
        assert!(debug.contains("PoolLedger"));
        assert!(debug.contains("principal"));
    }
}
