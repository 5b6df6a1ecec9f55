//! End-to-end tests: the issuance router feeding a real vault.
//!
//! Flow under test:
//! router (payment, fee split, issuance) -> vault (preload, value reports,
//! swaps) -> pricing (floor price, BOOTSTRAP -> OPEN_MARKET)
//!
//! Scenarios cover seeding liquidity, primary issuance with fee splits,
//! the switch to open-market pricing when supply runs out, and holder
//! swaps afterwards.

use std::rc::Rc;

use kvault_core::Vault;
use kvault_ledgers::{LedgerAccount, MemoryBalanceLedger, MemoryItemRegistry};
use kvault_router::{IssuanceRouter, MintQuote};
use kvault_types::*;

type PoolVault = Vault<Rc<MemoryItemRegistry>, LedgerAccount>;

/// Helper: a fully wired deployment.
struct Deployment {
    vault: Rc<PoolVault>,
    router: IssuanceRouter,
    registry: Rc<MemoryItemRegistry>,
    usdc: Rc<MemoryBalanceLedger>,
    ktoken: Rc<MemoryBalanceLedger>,
    vault_config: VaultConfig,
    router_config: RouterConfig,
}

impl Deployment {
    fn new(max_issuable: u64, mint_price: u128) -> Self {
        let router_address = Address::from_label("router");
        let vault_config = VaultConfig::dummy().with_router(router_address);
        let router_config =
            RouterConfig::new(router_address, Address::from_label("treasury"), mint_price);

        let registry = Rc::new(MemoryItemRegistry::new(max_issuable));
        let usdc = Rc::new(MemoryBalanceLedger::new("USDC"));
        let ktoken = Rc::new(MemoryBalanceLedger::new("kTOKEN"));

        let vault = Rc::new(
            Vault::new(
                vault_config.clone(),
                Rc::clone(&registry),
                ktoken.account(vault_config.address),
            )
            .unwrap(),
        );
        let router = IssuanceRouter::new(
            router_config.clone(),
            Rc::clone(&registry) as Rc<dyn ItemIssuer>,
            Box::new(usdc.account(router_address)),
            Box::new(ktoken.account(router_address)),
            Rc::clone(&vault) as Rc<dyn PoolSink>,
        )
        .unwrap();

        Self {
            vault,
            router,
            registry,
            usdc,
            ktoken,
            vault_config,
            router_config,
        }
    }

    /// Give `buyer` enough payment units for `mints` mints, approved to
    /// the router.
    fn fund_buyer(&self, buyer: Address, mints: u128) {
        let amount = self.router_config.mint_price * mints;
        self.usdc.mint(buyer, amount).unwrap();
        self.usdc
            .account(buyer)
            .approve(self.router_config.address, amount)
            .unwrap();
    }

    fn seed_from_router(&self, items: usize, fungible: u128) -> Vec<ItemId> {
        self.ktoken
            .mint(self.router_config.address, fungible)
            .unwrap();
        self.router.issue_and_preload(items, fungible).unwrap()
    }
}

#[test]
fn full_lifecycle_bootstrap_to_open_market() {
    let d = Deployment::new(5, 1_000);
    let alice = Address::from_label("alice");
    let bob = Address::from_label("bob");

    // 1. Router seeds two items and 20_000 kTokens.
    let seeded = d.seed_from_router(2, 20_000);
    assert_eq!(seeded, vec![ItemId(1), ItemId(2)]);
    assert_eq!(d.vault.item_count(), 2);
    assert_eq!(d.vault.fungible_balance(), 20_000);
    assert_eq!(d.vault.mode(), MarketMode::Bootstrap);
    // Nothing reported yet.
    assert_eq!(d.vault.floor_price(), 0);

    // 2. Primary issuance at 1_000 with a 5% fee.
    d.fund_buyer(alice, 2);
    let minted = d.router.mint_batch(alice, 2).unwrap();
    assert_eq!(minted, vec![ItemId(3), ItemId(4)]);
    assert_eq!(d.usdc.balance(d.router_config.treasury), 100);
    assert_eq!(d.usdc.balance(d.router_config.address), 1_900);
    assert_eq!(d.vault.aggregate_value(), 1_900);
    // Bootstrap floor: proceeds over every issued item, held or not.
    assert_eq!(d.vault.floor_price(), 1_900 / 4);

    // 3. The last mint exhausts supply and flips the regime.
    d.fund_buyer(bob, 1);
    let last = d.router.mint(bob).unwrap();
    assert_eq!(last, ItemId(5));
    assert_eq!(d.vault.mode(), MarketMode::OpenMarket);
    let stats = d.vault.stats();
    assert_eq!(stats.total_issued, 5);
    assert_eq!(stats.remaining_issuance(), 0);
    // Open-market floor: 20_000 units / 2 items / 10_000 ratio.
    assert_eq!(stats.floor_price, 1);

    // 4. Further mints are refused before any payment moves.
    d.fund_buyer(bob, 1);
    assert!(matches!(
        d.router.mint(bob),
        Err(KvaultError::SupplyExhausted { max: 5 })
    ));
    assert_eq!(d.usdc.balance(bob), 1_000);

    // 5. Holders trade against the pool.
    assert_eq!(d.vault.deposit_item(alice, ItemId(4)).unwrap(), 10_000);
    assert_eq!(d.ktoken.balance(alice), 10_000);
    d.ktoken
        .account(alice)
        .approve(d.vault_config.address, 10_000)
        .unwrap();
    assert_eq!(
        d.vault.deposit_fungible(alice, 10_000).unwrap(),
        vec![ItemId(1)]
    );
    assert_eq!(d.vault.held_items(0), vec![ItemId(2), ItemId(4)]);
    assert_eq!(d.vault.mode(), MarketMode::OpenMarket);

    // Exactly one regime change was ever recorded.
    let changes: Vec<_> = d
        .vault
        .events()
        .into_iter()
        .filter(|r| matches!(r.event, VaultEvent::ModeChanged { .. }))
        .collect();
    assert_eq!(changes.len(), 1);
}

#[test]
fn quote_matches_settled_amounts() {
    let d = Deployment::new(10, 2_000);
    let quote = d.router.quote().unwrap();
    assert_eq!(
        quote,
        MintQuote {
            price: 2_000,
            fee: 100,
            net: 1_900
        }
    );

    let buyer = Address::from_label("buyer");
    d.fund_buyer(buyer, 1);
    d.router.mint(buyer).unwrap();
    assert_eq!(d.usdc.balance(d.router_config.treasury), quote.fee);
    assert_eq!(d.vault.aggregate_value(), quote.net);
    assert_eq!(d.router.net_reported(), quote.net);
}

#[test]
fn router_without_vault_role_cannot_report() {
    let d = Deployment::new(10, 1_000);
    d.vault.set_router(d.vault_config.owner, None).unwrap();

    let buyer = Address::from_label("buyer");
    d.fund_buyer(buyer, 1);
    let err = d.router.mint(buyer).unwrap_err();
    assert!(matches!(err, KvaultError::NotAuthorized { .. }));
    assert_eq!(d.vault.aggregate_value(), 0);
    // Refused before any payment or issuance.
    assert_eq!(d.usdc.balance(buyer), 1_000);
    assert_eq!(d.usdc.balance(d.router_config.treasury), 0);
    assert!(d.registry.items_of(buyer).is_empty());
    assert_eq!(d.registry.total_issued(), 0);

    // Restoring the role lets issuance feed the vault again.
    d.vault
        .set_router(d.vault_config.owner, Some(d.router.address()))
        .unwrap();
    d.fund_buyer(buyer, 1);
    d.router.mint(buyer).unwrap();
    assert_eq!(d.vault.aggregate_value(), 950);
    assert_eq!(d.usdc.balance(buyer), 1_000);
    assert_eq!(d.registry.items_of(buyer), vec![ItemId(1)]);
    assert_eq!(d.vault.floor_price(), 950);
}

#[test]
fn preload_request_without_ktokens_rolls_back() {
    let d = Deployment::new(10, 1_000);
    // Router holds no kTokens: the approval succeeds, the pull fails.
    let err = d.router.issue_and_preload(2, 5_000).unwrap_err();
    assert!(matches!(err, KvaultError::TransferFailed { .. }));

    assert_eq!(d.vault.item_count(), 0);
    assert_eq!(d.vault.fungible_balance(), 0);
    // Issued items stay with the router.
    assert_eq!(
        d.registry.items_of(d.router_config.address),
        vec![ItemId(1), ItemId(2)]
    );

    // They can be preloaded once funded.
    d.ktoken
        .mint(d.router_config.address, 5_000)
        .unwrap();
    d.router
        .request_preload(&[ItemId(1), ItemId(2)], 5_000)
        .unwrap();
    assert_eq!(d.vault.held_items(0), vec![ItemId(1), ItemId(2)]);
    assert_eq!(d.vault.fungible_balance(), 5_000);
}

#[test]
fn seeding_to_max_supply_switches_regime() {
    let d = Deployment::new(3, 1_000);
    d.seed_from_router(3, 30_000);
    assert_eq!(d.vault.mode(), MarketMode::OpenMarket);
    // 30_000 / 3 / 10_000
    assert_eq!(d.vault.floor_price(), 1);
    assert_eq!(d.vault.last_floor_price(), 1);
}

#[test]
fn value_is_conserved_through_mixed_traffic() {
    let d = Deployment::new(20, 1_000);
    d.seed_from_router(4, 40_000);
    let total = |d: &Deployment| {
        d.vault.item_count() as u128 * d.vault.conversion_ratio() + d.vault.fungible_balance()
    };
    let before = total(&d);

    let holders: Vec<Address> = (0..3)
        .map(|i| Address::from_label(&format!("holder-{i}")))
        .collect();
    for holder in &holders {
        d.fund_buyer(*holder, 2);
        d.router.mint_batch(*holder, 2).unwrap();
    }
    // Minting never touches the vault's composition.
    assert_eq!(total(&d), before);

    for holder in &holders {
        let mine = d.registry.items_of(*holder);
        d.vault.deposit_item(*holder, mine[0]).unwrap();
        assert_eq!(total(&d), before);
    }
    let buyer = holders[0];
    d.ktoken
        .account(buyer)
        .approve(d.vault_config.address, 10_000)
        .unwrap();
    d.vault.deposit_fungible(buyer, 10_000).unwrap();
    assert_eq!(total(&d), before);
    assert_eq!(
        d.ktoken.balance(d.vault_config.address),
        d.vault.fungible_balance()
    );
}
