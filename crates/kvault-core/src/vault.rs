//! The vault: pool state, construction, read-only queries, and the
//! bookkeeping helpers shared by the swap and admin entry points.
//!
//! Mutating entry points live in `swap.rs` (holder conversions) and
//! `admin.rs` (preload, value reports, emergency paths, configuration).

use std::cell::{Ref, RefCell, RefMut};

use kvault_types::{
    Address, BalanceLedger, EventRecord, ItemId, ItemRegistry, KvaultError, MarketMode, PoolSink,
    Result, VaultConfig, VaultEvent, VaultStats, constants,
};

use crate::{
    conservation::ConservationMonitor, event_log::EventLog, guard::ReentrancyGuard,
    inventory::Inventory, pricing::PricingEngine,
};

/// Mutable pool state. Only ever borrowed for short, non-overlapping
/// sections; never across a collaborator call.
#[derive(Debug, Clone)]
pub(crate) struct VaultState {
    pub(crate) inventory: Inventory,
    pub(crate) fungible_balance: u128,
    pub(crate) pricing: PricingEngine,
    pub(crate) conservation: ConservationMonitor,
    pub(crate) swap_enabled: bool,
    pub(crate) admin: Address,
    pub(crate) router: Option<Address>,
    pub(crate) last_floor_price: u128,
}

/// Item/fungible pool bound to one item registry and one balance ledger.
///
/// All entry points take `&self`: the vault is meant to be shared (for
/// example behind an `Rc`) by holders, the router and the admin, and
/// execution is serialized by the caller's runtime. Each mutating call
/// either completes entirely or fails with no observable change.
pub struct Vault<R, L> {
    /// The vault's own account.
    pub(crate) address: Address,
    /// Contract owner, fixed at construction.
    pub(crate) owner: Address,
    /// Fungible units per item, fixed at construction.
    pub(crate) conversion_ratio: u128,
    pub(crate) registry: R,
    pub(crate) ledger: L,
    pub(crate) state: RefCell<VaultState>,
    pub(crate) guard: ReentrancyGuard,
    pub(crate) events: RefCell<EventLog>,
}

impl<R: ItemRegistry, L: BalanceLedger> Vault<R, L> {
    /// Create an empty vault in BOOTSTRAP mode.
    ///
    /// # Errors
    /// Returns [`KvaultError::Configuration`] if the config is invalid or
    /// the ledger handle is not bound to the vault's own address.
    pub fn new(config: VaultConfig, registry: R, ledger: L) -> Result<Self> {
        config.validate()?;
        if ledger.account() != config.address {
            return Err(KvaultError::Configuration(format!(
                "ledger handle is bound to {}, expected vault address {}",
                ledger.account(),
                config.address
            )));
        }

        tracing::info!(
            engine = constants::ENGINE_NAME,
            version = constants::VERSION,
            vault = %config.address,
            owner = %config.owner,
            admin = %config.admin,
            ratio = config.conversion_ratio,
            "Vault created"
        );

        Ok(Self {
            address: config.address,
            owner: config.owner,
            conversion_ratio: config.conversion_ratio,
            registry,
            ledger,
            state: RefCell::new(VaultState {
                inventory: Inventory::new(),
                fungible_balance: 0,
                pricing: PricingEngine::new(),
                conservation: ConservationMonitor::new(),
                swap_enabled: config.swap_enabled,
                admin: config.admin,
                router: config.router,
                last_floor_price: 0,
            }),
            guard: ReentrancyGuard::new(),
            events: RefCell::new(EventLog::new()),
        })
    }

    // =================================================================
    // Queries
    // =================================================================

    #[must_use]
    pub fn address(&self) -> Address {
        self.address
    }

    #[must_use]
    pub fn owner(&self) -> Address {
        self.owner
    }

    #[must_use]
    pub fn admin(&self) -> Address {
        self.state().admin
    }

    #[must_use]
    pub fn router(&self) -> Option<Address> {
        self.state().router
    }

    #[must_use]
    pub fn conversion_ratio(&self) -> u128 {
        self.conversion_ratio
    }

    #[must_use]
    pub fn swap_enabled(&self) -> bool {
        self.state().swap_enabled
    }

    #[must_use]
    pub fn mode(&self) -> MarketMode {
        self.state().pricing.mode()
    }

    #[must_use]
    pub fn aggregate_value(&self) -> u128 {
        self.state().pricing.aggregate_value()
    }

    #[must_use]
    pub fn item_count(&self) -> usize {
        self.state().inventory.len()
    }

    #[must_use]
    pub fn fungible_balance(&self) -> u128 {
        self.state().fungible_balance
    }

    #[must_use]
    pub fn is_held(&self, id: ItemId) -> bool {
        self.state().inventory.contains(id)
    }

    /// Held ids in ascending order. `0` asks for the default page size;
    /// anything above [`constants::MAX_HELD_ITEMS_PAGE`] is capped.
    #[must_use]
    pub fn held_items(&self, max_results: usize) -> Vec<ItemId> {
        self.state().inventory.ascending(page_size(max_results))
    }

    /// Continue [`held_items`](Self::held_items) after `cursor`.
    #[must_use]
    pub fn held_items_after(&self, cursor: ItemId, max_results: usize) -> Vec<ItemId> {
        self.state()
            .inventory
            .ascending_after(cursor, page_size(max_results))
    }

    /// Floor price computed live from current state.
    #[must_use]
    pub fn floor_price(&self) -> u128 {
        let total_issued = self.registry.total_issued();
        let state = self.state();
        state.pricing.floor_price(
            total_issued,
            state.inventory.len(),
            state.fungible_balance,
            self.conversion_ratio,
        )
    }

    /// Floor price as of the last committed `FloorPriceUpdated` event.
    #[must_use]
    pub fn last_floor_price(&self) -> u128 {
        self.state().last_floor_price
    }

    #[must_use]
    pub fn stats(&self) -> VaultStats {
        let total_issued = self.registry.total_issued();
        let max_issuable = self.registry.max_issuable();
        let state = self.state();
        VaultStats {
            item_count: state.inventory.len(),
            fungible_balance: state.fungible_balance,
            floor_price: state.pricing.floor_price(
                total_issued,
                state.inventory.len(),
                state.fungible_balance,
                self.conversion_ratio,
            ),
            mode: state.pricing.mode(),
            total_issued,
            max_issuable,
        }
    }

    /// SHA-256 commitment over the held ids (see [`Inventory::root`]).
    #[must_use]
    pub fn inventory_root(&self) -> [u8; 32] {
        self.state().inventory.root()
    }

    #[must_use]
    pub fn events(&self) -> Vec<EventRecord> {
        self.events.borrow().records().to_vec()
    }

    /// Events with `sequence >= from`.
    #[must_use]
    pub fn events_since(&self, from: u64) -> Vec<EventRecord> {
        self.events.borrow().since(from).to_vec()
    }

    #[must_use]
    pub fn event_count(&self) -> usize {
        self.events.borrow().len()
    }

    #[must_use]
    pub fn registry(&self) -> &R {
        &self.registry
    }

    #[must_use]
    pub fn ledger(&self) -> &L {
        &self.ledger
    }

    // =================================================================
    // Shared helpers
    // =================================================================

    pub(crate) fn state(&self) -> Ref<'_, VaultState> {
        self.state.borrow()
    }

    pub(crate) fn state_mut(&self) -> RefMut<'_, VaultState> {
        self.state.borrow_mut()
    }

    pub(crate) fn verify_conservation(&self) -> Result<()> {
        let state = self.state();
        let result = state.conservation.verify(
            state.inventory.len(),
            state.fungible_balance,
            self.conversion_ratio,
        );
        if let Err(err) = &result {
            tracing::error!(vault = %self.address, error = %err, "Conservation check failed");
        }
        result
    }

    pub(crate) fn require_owner(&self, caller: Address, action: &'static str) -> Result<()> {
        if caller == self.owner {
            Ok(())
        } else {
            Err(KvaultError::NotAuthorized { caller, action })
        }
    }

    pub(crate) fn require_admin(&self, caller: Address, action: &'static str) -> Result<()> {
        if caller == self.state().admin {
            Ok(())
        } else {
            Err(KvaultError::NotAuthorized { caller, action })
        }
    }

    pub(crate) fn require_router(&self, caller: Address, action: &'static str) -> Result<()> {
        if self.state().router == Some(caller) {
            Ok(())
        } else {
            Err(KvaultError::NotAuthorized { caller, action })
        }
    }

    pub(crate) fn require_admin_or_router(
        &self,
        caller: Address,
        action: &'static str,
    ) -> Result<()> {
        let state = self.state();
        if caller == state.admin || state.router == Some(caller) {
            Ok(())
        } else {
            Err(KvaultError::NotAuthorized { caller, action })
        }
    }

    pub(crate) fn require_owner_or_admin(
        &self,
        caller: Address,
        action: &'static str,
    ) -> Result<()> {
        if caller == self.owner || caller == self.state().admin {
            Ok(())
        } else {
            Err(KvaultError::NotAuthorized { caller, action })
        }
    }

    /// Apply the mode transition rule against the registry's issuance
    /// totals, staging a `ModeChanged` event if it fires.
    pub(crate) fn evaluate_mode(&self, events: &mut Vec<VaultEvent>) {
        let total_issued = self.registry.total_issued();
        let max_issuable = self.registry.max_issuable();
        let fired = self
            .state_mut()
            .pricing
            .evaluate_transition(total_issued, max_issuable);
        if fired {
            tracing::info!(
                vault = %self.address,
                total_issued,
                max_issuable,
                "Issuance exhausted: switching to open-market pricing"
            );
            events.push(VaultEvent::ModeChanged {
                from: MarketMode::Bootstrap,
                to: MarketMode::OpenMarket,
            });
        }
    }

    /// Recompute the floor price, stage `FloorPriceUpdated`, and commit
    /// every staged event of the call.
    pub(crate) fn commit_with_price(&self, mut events: Vec<VaultEvent>) {
        let price = self.floor_price();
        let mode = {
            let mut state = self.state_mut();
            state.last_floor_price = price;
            state.pricing.mode()
        };
        tracing::debug!(vault = %self.address, price, mode = %mode, "Floor price recomputed");
        events.push(VaultEvent::FloorPriceUpdated { price, mode });
        self.commit(events);
    }

    /// Commit staged events without touching the floor price.
    pub(crate) fn commit(&self, events: Vec<VaultEvent>) {
        self.events.borrow_mut().commit(events);
    }

    /// Move an item back after a failed call. A failure here is a double
    /// fault and is only logged; callers reconcile state against the
    /// registry afterwards.
    pub(crate) fn compensate_item(&self, from: Address, to: Address, item: ItemId) -> bool {
        match self.registry.transfer(from, to, item) {
            Ok(()) => true,
            Err(err) => {
                tracing::error!(
                    vault = %self.address,
                    item = %item,
                    from = %from,
                    to = %to,
                    error = %err,
                    "Compensating item transfer failed"
                );
                false
            }
        }
    }

    /// After a failed compensation, take back every item in `items` the
    /// registry still assigns to the vault but the inventory no longer
    /// holds, booking one ratio of inflow per item.
    pub(crate) fn adopt_stranded(&self, items: &[ItemId]) {
        let mut state = self.state_mut();
        for id in items {
            if state.inventory.contains(*id) || self.registry.owner_of(*id) != Some(self.address) {
                continue;
            }
            if state.conservation.record_inflow(self.conversion_ratio).is_err() {
                continue;
            }
            let _ = state.inventory.insert(*id);
            tracing::error!(vault = %self.address, item = %id, "Stranded item taken back into inventory");
        }
    }
}

impl<R: ItemRegistry, L: BalanceLedger> PoolSink for Vault<R, L> {
    fn pool_address(&self) -> Address {
        self.address
    }

    fn check_report(&self, caller: Address, amount: u128) -> Result<()> {
        Vault::check_report_value(self, caller, amount)
    }

    fn report_value(&self, caller: Address, amount: u128) -> Result<()> {
        Vault::report_value(self, caller, amount)
    }

    fn preload(&self, caller: Address, items: &[ItemId], fungible_amount: u128) -> Result<()> {
        Vault::preload(self, caller, items, fungible_amount)
    }
}

/// Wrap a collaborator failure.
pub(crate) fn transfer_failed(err: &KvaultError) -> KvaultError {
    KvaultError::TransferFailed {
        reason: err.to_string(),
    }
}

fn page_size(requested: usize) -> usize {
    match requested {
        0 => constants::DEFAULT_HELD_ITEMS_PAGE,
        n => n.min(constants::MAX_HELD_ITEMS_PAGE),
    }
}
