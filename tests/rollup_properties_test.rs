use axum::http::StatusCode;
use chrono::{DateTime, FixedOffset, NaiveDate, TimeZone, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use taquilla_rollup::api::{self, AppState};
use taquilla_rollup::datasource::mock::FactStream;
use taquilla_rollup::domain::{
    Bet, BetId, DateRange, Decimal, LotteryId, NodeId, NodeKind, Percent, ResellerNode, Winner,
};
use taquilla_rollup::engine::{RollupEngine, ResellerTree};
use taquilla_rollup::{EngineError, FactStoreError, MockFactStore, PeriodResolver, StatsService};
use tower::util::ServiceExt;

/// Small deterministic generator so tree shapes are reproducible.
struct Lcg(u64);

impl Lcg {
    fn next(&mut self, bound: u64) -> u64 {
        self.0 = self
            .0
            .wrapping_mul(6364136223846793005)
            .wrapping_add(1442695040888963407);
        (self.0 >> 33) % bound
    }
}

fn offset() -> FixedOffset {
    FixedOffset::west_opt(4 * 3600).unwrap()
}

fn range(first: u32, last: u32) -> DateRange {
    DateRange::days(
        offset(),
        NaiveDate::from_ymd_opt(2024, 5, first).unwrap(),
        NaiveDate::from_ymd_opt(2024, 5, last).unwrap(),
    )
}

fn at(day: u32, hour: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 5, day, hour, 30, 0).unwrap()
}

fn pct(v: u64) -> Percent {
    Percent::new(Decimal::from(v as i64)).unwrap()
}

struct Generated {
    nodes: Vec<ResellerNode>,
    bets: Vec<Bet>,
    winners: Vec<Winner>,
    top: Vec<NodeId>,
}

/// comercializadoras → subdistribuidores → agencias → taquillas with random
/// fan-out, shares and facts.
fn generate(seed: u64) -> Generated {
    let mut rng = Lcg(seed);
    let admin = ResellerNode::new(NodeId::random(), NodeKind::Admin, None);
    let mut nodes = vec![admin.clone()];
    let mut bets = Vec::new();
    let mut winners = Vec::new();
    let mut top = Vec::new();

    let levels = [
        NodeKind::Comercializadora,
        NodeKind::Subdistribuidor,
        NodeKind::Agencia,
        NodeKind::Taquilla,
    ];
    let mut frontier = vec![admin.id];
    for kind in levels {
        let mut next = Vec::new();
        for parent in &frontier {
            for _ in 0..(1 + rng.next(3)) {
                let node = ResellerNode::new(NodeId::random(), kind, Some(*parent))
                    .with_shares(pct(rng.next(31)), pct(rng.next(51)));
                if kind == NodeKind::Comercializadora {
                    top.push(node.id);
                }
                next.push(node.id);
                nodes.push(node);
            }
        }
        frontier = next;
    }

    let lottery = LotteryId::random();
    for taquilla in &frontier {
        for _ in 0..rng.next(6) {
            let day = 1 + rng.next(10) as u32;
            let bet = Bet {
                id: BetId::random(),
                taquilla_id: *taquilla,
                lottery_id: lottery,
                animal_number: rng.next(37).to_string(),
                amount: Decimal::from(1 + rng.next(500) as i64),
                created_at: at(day, 4 + rng.next(20) as u32),
            };
            if rng.next(4) == 0 {
                winners.push(Winner {
                    bet_id: bet.id,
                    taquilla_id: bet.taquilla_id,
                    lottery_id: lottery,
                    amount: bet.amount,
                    potential_win: bet.amount * Decimal::from(30),
                    created_at: bet.created_at,
                });
            }
            bets.push(bet);
        }
    }

    // Shuffle listing order so parents do not always precede children.
    for i in (1..nodes.len()).rev() {
        let j = rng.next(i as u64 + 1) as usize;
        nodes.swap(i, j);
    }

    Generated {
        nodes,
        bets,
        winners,
        top,
    }
}

fn store_for(g: &Generated) -> MockFactStore {
    let mut store = MockFactStore::new()
        .with_nodes(g.nodes.clone())
        .with_bets(g.bets.clone());
    for w in &g.winners {
        store = store.with_winner(w.clone());
    }
    store
}

fn expected_totals(g: &Generated, r: &DateRange) -> (Decimal, Decimal) {
    let sales: Decimal = g
        .bets
        .iter()
        .filter(|b| r.contains(&b.created_at))
        .map(|b| b.amount)
        .sum();
    let prizes: Decimal = g
        .winners
        .iter()
        .filter(|w| r.contains(&w.created_at))
        .map(|w| w.potential_win)
        .sum();
    (sales, prizes)
}

#[tokio::test]
async fn test_conservation_over_generated_trees() {
    for seed in [1u64, 7, 42, 1337, 9001] {
        let g = generate(seed);
        let tree = ResellerTree::build(g.nodes.clone());
        let engine = RollupEngine::new(Arc::new(store_for(&g)));

        for r in [range(1, 10), range(3, 3), range(4, 8)] {
            let rollup = engine.rollup_many(&tree, &g.top, &r).await.unwrap();
            let (sales, prizes) = expected_totals(&g, &r);

            let top_sales: Decimal = g.top.iter().map(|id| rollup.get(id).unwrap().sales).sum();
            let top_prizes: Decimal = g.top.iter().map(|id| rollup.get(id).unwrap().prizes).sum();
            assert_eq!(top_sales, sales, "seed {}", seed);
            assert_eq!(top_prizes, prizes, "seed {}", seed);

            // Every internal node equals the sum of its children.
            for node in &g.nodes {
                let Some(m) = rollup.get(&node.id) else {
                    continue;
                };
                let children = tree.children(&node.id);
                if children.is_empty() {
                    continue;
                }
                let child_sales: Decimal =
                    children.iter().map(|c| rollup.get(c).unwrap().sales).sum();
                let child_prizes: Decimal =
                    children.iter().map(|c| rollup.get(c).unwrap().prizes).sum();
                assert_eq!(m.sales, child_sales);
                assert_eq!(m.prizes, child_prizes);
                assert_eq!(m.balance, m.sales - m.prizes - m.commission);
            }
        }
    }
}

#[tokio::test]
async fn test_shares_never_change_gross_totals() {
    let g = generate(2024);
    let r = range(1, 10);

    let stripped: Vec<ResellerNode> = g
        .nodes
        .iter()
        .cloned()
        .map(|mut n| {
            n.share_on_sales = None;
            n.share_on_profits = None;
            n
        })
        .collect();

    let with_shares = RollupEngine::new(Arc::new(store_for(&g)))
        .rollup_many(&ResellerTree::build(g.nodes.clone()), &g.top, &r)
        .await
        .unwrap();
    let without = RollupEngine::new(Arc::new(store_for(&g)))
        .rollup_many(&ResellerTree::build(stripped), &g.top, &r)
        .await
        .unwrap();

    for node in &g.nodes {
        if let (Some(a), Some(b)) = (with_shares.get(&node.id), without.get(&node.id)) {
            assert_eq!(a.sales, b.sales);
            assert_eq!(a.prizes, b.prizes);
            assert!(b.commission.is_zero());
        }
    }
}

#[tokio::test]
async fn test_zero_facts_taquilla_is_all_zero() {
    let agency = ResellerNode::new(NodeId::random(), NodeKind::Agencia, None)
        .with_shares(pct(10), pct(10));
    let taq = ResellerNode::new(NodeId::random(), NodeKind::Taquilla, Some(agency.id))
        .with_shares(pct(5), pct(20));
    let store = MockFactStore::new().with_nodes(vec![agency.clone(), taq.clone()]);
    let service = StatsService::new(Arc::new(store), PeriodResolver::new(offset()));

    for id in [taq.id, agency.id] {
        let m = service.node_metrics(id, &range(1, 31)).await.unwrap();
        assert!(m.sales.is_zero());
        assert!(m.prizes.is_zero());
        assert!(m.commission.is_zero());
        assert!(m.balance.is_zero());
        assert!(m.profit_share.is_zero());
    }
}

#[tokio::test]
async fn test_dangling_parent_still_counted_at_top_level() {
    let admin = ResellerNode::new(NodeId::random(), NodeKind::Admin, None);
    let com = ResellerNode::new(NodeId::random(), NodeKind::Comercializadora, Some(admin.id));
    let orphan = ResellerNode::new(NodeId::random(), NodeKind::Agencia, Some(NodeId::random()))
        .with_name("Huerfana");
    let t1 = ResellerNode::new(NodeId::random(), NodeKind::Taquilla, Some(com.id));
    let t2 = ResellerNode::new(NodeId::random(), NodeKind::Taquilla, Some(orphan.id));
    let bet = |taquilla: NodeId, amount: i64| Bet {
        id: BetId::random(),
        taquilla_id: taquilla,
        lottery_id: LotteryId::random(),
        animal_number: "5".to_string(),
        amount: Decimal::from(amount),
        created_at: at(2, 15),
    };
    let store = MockFactStore::new()
        .with_nodes(vec![admin, com, orphan.clone(), t1.clone(), t2.clone()])
        .with_bet(bet(t1.id, 100))
        .with_bet(bet(t2.id, 50));
    let service = StatsService::new(Arc::new(store), PeriodResolver::new(offset()));

    let root = service
        .hierarchy_root(&taquilla_rollup::engine::CurrentUser::admin(), range(2, 2))
        .await
        .unwrap();
    let by_id: HashMap<NodeId, Decimal> = root
        .root_entities
        .iter()
        .map(|e| (e.node_id, e.periods.custom.sales))
        .collect();
    assert_eq!(by_id.len(), 2);
    assert_eq!(by_id[&orphan.id], Decimal::from(50));
    let total: Decimal = by_id.values().copied().sum();
    assert_eq!(total, Decimal::from(150));
}

#[tokio::test]
async fn test_failed_winners_fetch_is_not_reported_as_zero_prizes() {
    let agency = ResellerNode::new(NodeId::random(), NodeKind::Agencia, None);
    let taq = ResellerNode::new(NodeId::random(), NodeKind::Taquilla, Some(agency.id));
    let store = MockFactStore::new()
        .with_nodes(vec![agency.clone(), taq.clone()])
        .with_bet(Bet {
            id: BetId::random(),
            taquilla_id: taq.id,
            lottery_id: LotteryId::random(),
            animal_number: "1".to_string(),
            amount: Decimal::from(10),
            created_at: at(2, 15),
        })
        .failing(
            FactStream::Winners,
            FactStoreError::HttpError {
                status: 503,
                message: "Service unavailable".to_string(),
            },
        );
    let service = Arc::new(StatsService::new(
        Arc::new(store),
        PeriodResolver::new(offset()),
    ));

    let err = service
        .node_metrics(agency.id, &range(2, 2))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        taquilla_rollup::orchestration::ServiceError::Engine(EngineError::FactStore(_))
    ));

    let app = api::create_router(AppState::new(service));
    let req = axum::http::Request::builder()
        .method("GET")
        .uri(format!("/v1/nodes/{}/metrics?from=2024-05-02", agency.id))
        .body(axum::body::Body::empty())
        .unwrap();
    let res = app.oneshot(req).await.unwrap();
    assert_eq!(res.status(), StatusCode::BAD_GATEWAY);
    let body = axum::body::to_bytes(res.into_body(), usize::MAX)
        .await
        .unwrap();
    let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert!(json["error"].as_str().unwrap().contains("503"));
}
