//! Issuance/payment router.
//!
//! Collects mint payments, issues items, forwards fees to the treasury and
//! reports net proceeds to the vault. Also seeds vault liquidity through
//! the vault's preload entry point.

use std::cell::Cell;
use std::rc::Rc;

use kvault_types::{
    Address, BalanceLedger, ItemId, ItemIssuer, ItemRegistry, KvaultError, PoolSink, Result,
    RouterConfig,
};

use crate::fees::MintQuote;

/// Payment router bound to one issuer, two ledgers and one vault.
pub struct IssuanceRouter {
    config: RouterConfig,
    /// Item issuance capability.
    issuer: Rc<dyn ItemIssuer>,
    /// Payment-token handle bound to the router's own account.
    payments: Box<dyn BalanceLedger>,
    /// kToken handle bound to the router's own account.
    ktokens: Box<dyn BalanceLedger>,
    /// The vault.
    pool: Rc<dyn PoolSink>,
    minted: Cell<u64>,
    net_reported: Cell<u128>,
}

impl IssuanceRouter {
    /// # Errors
    /// Config validation errors, or `Configuration` if a ledger handle is
    /// not bound to the router's address.
    pub fn new(
        config: RouterConfig,
        issuer: Rc<dyn ItemIssuer>,
        payments: Box<dyn BalanceLedger>,
        ktokens: Box<dyn BalanceLedger>,
        pool: Rc<dyn PoolSink>,
    ) -> Result<Self> {
        config.validate()?;
        for (name, handle) in [("payment", &payments), ("kToken", &ktokens)] {
            if handle.account() != config.address {
                return Err(KvaultError::Configuration(format!(
                    "{name} ledger handle is bound to {}, expected router address {}",
                    handle.account(),
                    config.address
                )));
            }
        }
        tracing::info!(
            router = %config.address,
            treasury = %config.treasury,
            pool = %pool.pool_address(),
            mint_price = config.mint_price,
            fee_rate = %config.fee_rate,
            "Router created"
        );
        Ok(Self {
            config,
            issuer,
            payments,
            ktokens,
            pool,
            minted: Cell::new(0),
            net_reported: Cell::new(0),
        })
    }

    #[must_use]
    pub fn address(&self) -> Address {
        self.config.address
    }

    #[must_use]
    pub fn config(&self) -> &RouterConfig {
        &self.config
    }

    /// Items minted through this router.
    #[must_use]
    pub fn minted(&self) -> u64 {
        self.minted.get()
    }

    /// Net proceeds reported to the vault so far.
    #[must_use]
    pub fn net_reported(&self) -> u128 {
        self.net_reported.get()
    }

    /// Price breakdown of the next mint.
    ///
    /// # Errors
    /// See [`MintQuote::compute`].
    pub fn quote(&self) -> Result<MintQuote> {
        MintQuote::compute(self.config.mint_price, self.config.fee_rate)
    }

    /// Sell one freshly issued item to `buyer`.
    ///
    /// The buyer must have approved the router for the mint price on the
    /// payment ledger. Order: supply check, value report dry run, payment
    /// pull, issuance (payment refunded if it fails), fee forward, value
    /// report.
    ///
    /// # Errors
    /// `SupplyExhausted` and any error the vault would return for the value
    /// report, both before any payment moves; `PaymentFailed` if the price
    /// cannot be pulled.
    pub fn mint(&self, buyer: Address) -> Result<ItemId> {
        let quote = self.quote()?;
        let max = self.issuer.max_issuable();
        if self.issuer.total_issued() >= max {
            return Err(KvaultError::SupplyExhausted { max });
        }
        self.pool.check_report(self.config.address, quote.net)?;

        self.payments
            .transfer_from(buyer, self.config.address, quote.price)
            .map_err(|err| KvaultError::PaymentFailed {
                reason: err.to_string(),
            })?;

        let item = match self.issuer.issue(buyer) {
            Ok(item) => item,
            Err(err) => {
                if let Err(refund_err) = self.payments.transfer(buyer, quote.price) {
                    tracing::error!(
                        router = %self.config.address,
                        buyer = %buyer,
                        price = quote.price,
                        error = %refund_err,
                        "Mint refund failed"
                    );
                }
                return Err(err);
            }
        };

        if quote.fee > 0 {
            if let Err(err) = self.payments.transfer(self.config.treasury, quote.fee) {
                tracing::error!(
                    router = %self.config.address,
                    treasury = %self.config.treasury,
                    fee = quote.fee,
                    error = %err,
                    "Fee forward failed; fee retained by router"
                );
            }
        }

        self.minted.set(self.minted.get() + 1);
        if let Err(err) = self.pool.report_value(self.config.address, quote.net) {
            tracing::error!(
                router = %self.config.address,
                item = %item,
                net = quote.net,
                error = %err,
                "Minted item but value report failed"
            );
            return Err(err);
        }
        self.net_reported
            .set(self.net_reported.get().saturating_add(quote.net));

        tracing::info!(
            router = %self.config.address,
            buyer = %buyer,
            item = %item,
            price = quote.price,
            fee = quote.fee,
            net = quote.net,
            "Item minted"
        );
        Ok(item)
    }

    /// Mint up to `count` items for `buyer`, stopping at the first error.
    ///
    /// # Errors
    /// The first failing mint's error when nothing was minted. Once at least
    /// one item is out, the partial batch is returned and the error logged.
    pub fn mint_batch(&self, buyer: Address, count: usize) -> Result<Vec<ItemId>> {
        let mut items = Vec::with_capacity(count);
        for _ in 0..count {
            match self.mint(buyer) {
                Ok(item) => items.push(item),
                Err(err) if items.is_empty() => return Err(err),
                Err(err) => {
                    tracing::warn!(
                        buyer = %buyer,
                        minted = items.len(),
                        requested = count,
                        error = %err,
                        "Batch mint stopped early"
                    );
                    break;
                }
            }
        }
        Ok(items)
    }

    /// Seed the vault with items and kTokens the router holds.
    ///
    /// # Errors
    /// Errors from the kToken approval or the vault's preload.
    pub fn request_preload(&self, items: &[ItemId], fungible_amount: u128) -> Result<()> {
        if fungible_amount > 0 {
            self.ktokens
                .approve(self.pool.pool_address(), fungible_amount)?;
        }
        self.pool
            .preload(self.config.address, items, fungible_amount)?;
        tracing::info!(
            router = %self.config.address,
            items = items.len(),
            fungible_amount,
            "Preload requested"
        );
        Ok(())
    }

    /// Issue `count` items to the router and preload them together with
    /// `fungible_amount` kTokens. Returns the preloaded ids.
    ///
    /// # Errors
    /// `SupplyExhausted` (checked up front, nothing issued) or the preload's
    /// error; on a preload failure the issued items stay with the router.
    pub fn issue_and_preload(&self, count: usize, fungible_amount: u128) -> Result<Vec<ItemId>> {
        let max = self.issuer.max_issuable();
        let remaining = max.saturating_sub(self.issuer.total_issued());
        if !u64::try_from(count).is_ok_and(|c| c <= remaining) {
            return Err(KvaultError::SupplyExhausted { max });
        }
        let items = (0..count)
            .map(|_| self.issuer.issue(self.config.address))
            .collect::<Result<Vec<_>>>()?;
        self.request_preload(&items, fungible_amount)?;
        Ok(items)
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;

    use kvault_ledgers::{MemoryBalanceLedger, MemoryItemRegistry};
    use rust_decimal::Decimal;

    use super::*;

    /// Records every call instead of running a vault.
    #[derive(Default)]
    struct RecordingSink {
        reports: RefCell<Vec<(Address, u128)>>,
        preloads: RefCell<Vec<(Address, Vec<ItemId>, u128)>>,
        refuse: Cell<bool>,
    }

    impl PoolSink for RecordingSink {
        fn pool_address(&self) -> Address {
            Address::from_label("sink")
        }

        fn check_report(&self, caller: Address, _amount: u128) -> Result<()> {
            if self.refuse.get() {
                return Err(KvaultError::NotAuthorized {
                    caller,
                    action: "report value",
                });
            }
            Ok(())
        }

        fn report_value(&self, caller: Address, amount: u128) -> Result<()> {
            self.check_report(caller, amount)?;
            self.reports.borrow_mut().push((caller, amount));
            Ok(())
        }

        fn preload(&self, caller: Address, items: &[ItemId], fungible_amount: u128) -> Result<()> {
            self.preloads
                .borrow_mut()
                .push((caller, items.to_vec(), fungible_amount));
            Ok(())
        }
    }

    struct Fixture {
        router: IssuanceRouter,
        registry: Rc<MemoryItemRegistry>,
        usdc: Rc<MemoryBalanceLedger>,
        ktoken: Rc<MemoryBalanceLedger>,
        sink: Rc<RecordingSink>,
        config: RouterConfig,
    }

    fn fixture(max_issuable: u64) -> Fixture {
        let config = RouterConfig::new(
            Address::from_label("router"),
            Address::from_label("treasury"),
            1_000,
        );
        let registry = Rc::new(MemoryItemRegistry::new(max_issuable));
        let usdc = Rc::new(MemoryBalanceLedger::new("USDC"));
        let ktoken = Rc::new(MemoryBalanceLedger::new("kTOKEN"));
        let sink = Rc::new(RecordingSink::default());
        let router = IssuanceRouter::new(
            config.clone(),
            Rc::clone(&registry) as Rc<dyn ItemIssuer>,
            Box::new(usdc.account(config.address)),
            Box::new(ktoken.account(config.address)),
            Rc::clone(&sink) as Rc<dyn PoolSink>,
        )
        .unwrap();
        Fixture {
            router,
            registry,
            usdc,
            ktoken,
            sink,
            config,
        }
    }

    fn fund_buyer(f: &Fixture, buyer: Address, amount: u128) {
        f.usdc.mint(buyer, amount).unwrap();
        f.usdc
            .account(buyer)
            .approve(f.config.address, amount)
            .unwrap();
    }

    #[test]
    fn mint_splits_payment_and_reports_net() {
        let f = fixture(10);
        let buyer = Address::from_label("buyer");
        fund_buyer(&f, buyer, 1_000);

        let item = f.router.mint(buyer).unwrap();
        assert_eq!(item, ItemId(1));
        assert_eq!(f.registry.owner_of(item), Some(buyer));
        assert_eq!(f.usdc.balance(buyer), 0);
        assert_eq!(f.usdc.balance(f.config.treasury), 50);
        assert_eq!(f.usdc.balance(f.config.address), 950);
        assert_eq!(*f.sink.reports.borrow(), vec![(f.config.address, 950)]);
        assert_eq!(f.router.minted(), 1);
        assert_eq!(f.router.net_reported(), 950);
    }

    #[test]
    fn mint_without_payment_fails_cleanly() {
        let f = fixture(10);
        let buyer = Address::from_label("buyer");
        f.usdc.mint(buyer, 1_000).unwrap();

        let err = f.router.mint(buyer).unwrap_err();
        assert!(matches!(err, KvaultError::PaymentFailed { .. }));
        assert_eq!(f.registry.total_issued(), 0);
        assert!(f.sink.reports.borrow().is_empty());
    }

    #[test]
    fn exhausted_supply_checked_before_payment() {
        let f = fixture(1);
        let buyer = Address::from_label("buyer");
        fund_buyer(&f, buyer, 2_000);
        f.router.mint(buyer).unwrap();

        let err = f.router.mint(buyer).unwrap_err();
        assert!(matches!(err, KvaultError::SupplyExhausted { max: 1 }));
        assert_eq!(f.usdc.balance(buyer), 1_000);
    }

    #[test]
    fn batch_stops_at_first_error() {
        let f = fixture(10);
        let buyer = Address::from_label("buyer");
        fund_buyer(&f, buyer, 2_500);

        let items = f.router.mint_batch(buyer, 5).unwrap();
        assert_eq!(items, vec![ItemId(1), ItemId(2)]);
        assert_eq!(f.usdc.balance(buyer), 500);

        let broke = Address::from_label("broke");
        assert!(f.router.mint_batch(broke, 3).is_err());
    }

    #[test]
    fn refused_report_stops_mint_before_payment() {
        let f = fixture(10);
        let buyer = Address::from_label("buyer");
        fund_buyer(&f, buyer, 1_000);
        f.sink.refuse.set(true);

        let err = f.router.mint(buyer).unwrap_err();
        assert!(matches!(err, KvaultError::NotAuthorized { .. }));
        assert_eq!(f.router.net_reported(), 0);
        assert_eq!(f.router.minted(), 0);
        assert_eq!(f.usdc.balance(buyer), 1_000);
        assert_eq!(f.usdc.balance(f.config.treasury), 0);
        assert_eq!(f.registry.total_issued(), 0);

        // A resubmission after the vault accepts reports charges once.
        f.sink.refuse.set(false);
        f.router.mint(buyer).unwrap();
        assert_eq!(f.usdc.balance(buyer), 0);
        assert_eq!(f.registry.items_of(buyer), vec![ItemId(1)]);
    }

    #[test]
    fn issue_and_preload_approves_sink() {
        let f = fixture(10);
        f.ktoken.mint(f.config.address, 20_000).unwrap();

        let items = f.router.issue_and_preload(2, 20_000).unwrap();
        assert_eq!(items, vec![ItemId(1), ItemId(2)]);
        assert_eq!(
            f.ktoken.allowance(f.config.address, f.sink.pool_address()),
            20_000
        );
        assert_eq!(
            *f.sink.preloads.borrow(),
            vec![(f.config.address, items, 20_000)]
        );
    }

    #[test]
    fn issue_and_preload_checks_remaining_supply() {
        let f = fixture(3);
        let err = f.router.issue_and_preload(4, 0).unwrap_err();
        assert!(matches!(err, KvaultError::SupplyExhausted { max: 3 }));
        assert_eq!(f.registry.total_issued(), 0);
    }

    #[test]
    fn unbound_ledger_handle_rejected() {
        let config = RouterConfig::new(
            Address::from_label("router"),
            Address::from_label("treasury"),
            1_000,
        );
        let usdc = Rc::new(MemoryBalanceLedger::new("USDC"));
        let ktoken = Rc::new(MemoryBalanceLedger::new("kTOKEN"));
        let result = IssuanceRouter::new(
            config.clone(),
            Rc::new(MemoryItemRegistry::new(1)),
            Box::new(usdc.account(Address::from_label("elsewhere"))),
            Box::new(ktoken.account(config.address)),
            Rc::new(RecordingSink::default()),
        );
        assert!(matches!(result, Err(KvaultError::Configuration(_))));
    }

    #[test]
    fn invalid_fee_rate_rejected() {
        let config = RouterConfig::new(
            Address::from_label("router"),
            Address::from_label("treasury"),
            1_000,
        )
        .with_fee_rate(Decimal::new(2, 0));
        let usdc = Rc::new(MemoryBalanceLedger::new("USDC"));
        let result = IssuanceRouter::new(
            config.clone(),
            Rc::new(MemoryItemRegistry::new(1)),
            Box::new(usdc.account(config.address)),
            Box::new(usdc.account(config.address)),
            Rc::new(RecordingSink::default()),
        );
        assert!(matches!(result, Err(KvaultError::InvalidFeeRate(_))));
    }
}
