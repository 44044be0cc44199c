//! The run loop driven by a scripted height feed.

use feeder_engine::{
    EngineError, FeederMetrics, FeederService, PeriodClock, RetryPolicy, ShutdownController,
    ShutdownSignal, SubmissionRetrier, VoteCycleEngine, VoterIdentity,
};
use feeder_nullables::{NullGateway, NullHeightSource, NullSalt, StaticPriceSource};
use feeder_types::{FeederAddress, ValidatorAddress, VotingPeriod};
use std::sync::Arc;
use std::time::Duration;

fn identity() -> VoterIdentity {
    VoterIdentity {
        validator: ValidatorAddress::new("nibivaloper1test").unwrap(),
        feeder: FeederAddress::new("nibi1feeder").unwrap(),
    }
}

fn engine(gateway: &Arc<NullGateway>, shutdown: ShutdownSignal) -> VoteCycleEngine {
    VoteCycleEngine::new(
        gateway.clone(),
        Arc::new(StaticPriceSource::from_pairs(&[("ubtc:uusd", 100.0)])),
        Box::new(NullSalt::new(&["1", "2", "3", "4", "5"])),
        SubmissionRetrier::new(RetryPolicy::no_retry(), shutdown),
        identity(),
    )
}

fn service(
    gateway: &Arc<NullGateway>,
    engine: VoteCycleEngine,
    heights: NullHeightSource,
    shutdown: ShutdownSignal,
) -> FeederService {
    FeederService::new(
        engine,
        PeriodClock::new(gateway.clone(), Duration::from_secs(30)),
        Box::new(heights),
        gateway.clone(),
        shutdown,
        Duration::from_secs(30),
    )
}

#[tokio::test]
async fn one_cycle_per_period_until_feed_ends() {
    let gateway = Arc::new(NullGateway::with_targets(&["ubtc:uusd"]));
    gateway.set_vote_period(10);

    let metrics = Arc::new(FeederMetrics::new());
    let mut engine = engine(&gateway, ShutdownSignal::never());
    engine.subscribe(FeederMetrics::listener(Arc::clone(&metrics)));

    // Periods 1, 1, 1, 2, 2, 3 (a boundary height is skipped), then 2 again.
    let heights = NullHeightSource::from_heights([13, 15, 19, 20, 27, 31, 22]);
    service(&gateway, engine, heights, ShutdownSignal::never())
        .run()
        .await
        .unwrap();

    assert_eq!(gateway.prevotes().len(), 3);
    assert_eq!(gateway.votes().len(), 2);
    assert_eq!(metrics.prevotes_submitted.get(), 3);
    assert_eq!(metrics.votes_submitted.get(), 2);
    assert_eq!(metrics.votes_skipped.get(), 1);
    assert_eq!(metrics.last_period.get(), 3);
    assert!(gateway.is_closed());
}

#[tokio::test]
async fn shutdown_stops_the_loop_and_closes_gateway() {
    let gateway = Arc::new(NullGateway::with_targets(&["ubtc:uusd"]));
    let controller = ShutdownController::new();
    let (sender, heights) = NullHeightSource::channel();
    sender.push(10);

    let svc = service(
        &gateway,
        engine(&gateway, controller.subscribe()),
        heights,
        controller.subscribe(),
    );
    let handle = tokio::spawn(svc.run());

    tokio::time::sleep(Duration::from_millis(50)).await;
    controller.shutdown();
    let outcome = tokio::time::timeout(Duration::from_secs(5), handle)
        .await
        .expect("service stops promptly")
        .unwrap();

    assert_eq!(outcome, Ok(()));
    assert!(gateway.is_closed());
    assert_eq!(gateway.prevotes().len(), 1);
    drop(sender);
}

#[tokio::test]
async fn zero_vote_period_is_fatal() {
    let gateway = Arc::new(NullGateway::with_targets(&["ubtc:uusd"]));
    gateway.set_vote_period(0);

    let heights = NullHeightSource::from_heights([10, 11]);
    let outcome = service(&gateway, engine(&gateway, ShutdownSignal::never()), heights, ShutdownSignal::never())
        .run()
        .await;

    assert!(matches!(outcome, Err(EngineError::Configuration(_))));
    assert!(gateway.prevotes().is_empty());
    assert!(gateway.is_closed());
}

#[tokio::test]
async fn params_outage_skips_heights_without_stopping() {
    let gateway = Arc::new(NullGateway::with_targets(&["ubtc:uusd"]));
    gateway.set_vote_period(10);
    gateway.fail_next_params(feeder_gateway::GatewayError::Unavailable("down".into()));

    let heights = NullHeightSource::from_heights([10, 11]);
    let engine = engine(&gateway, ShutdownSignal::never());
    let reader = engine.store();
    service(&gateway, engine, heights, ShutdownSignal::never())
        .run()
        .await
        .unwrap();

    // Height 10 was lost to the outage; height 11 still started period 1.
    assert_eq!(gateway.prevotes().len(), 1);
    assert_eq!(reader.period(), Some(VotingPeriod::new(1)));
}

#[tokio::test]
async fn keeps_voting_after_vote_period_length_changes() {
    let gateway = Arc::new(NullGateway::with_targets(&["ubtc:uusd"]));
    gateway.set_vote_period(10);
    let (sender, heights) = NullHeightSource::channel();

    let engine = engine(&gateway, ShutdownSignal::never());
    let reader = engine.store();
    // Zero TTL: every height sees the chain's current vote period.
    let svc = FeederService::new(
        engine,
        PeriodClock::new(gateway.clone(), Duration::ZERO),
        Box::new(heights),
        gateway.clone(),
        ShutdownSignal::never(),
        Duration::from_secs(30),
    );
    let handle = tokio::spawn(svc.run());

    sender.push(390);
    tokio::time::timeout(Duration::from_secs(5), async {
        while gateway.prevotes().is_empty() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("prevote for #39");

    // Governance doubles the vote period: heights 400..=780 span periods #20..=#39.
    gateway.set_vote_period(20);
    for height in (400..=780).step_by(10) {
        sender.push(height);
    }
    drop(sender);

    let outcome = tokio::time::timeout(Duration::from_secs(5), handle)
        .await
        .expect("service stops when the feed ends")
        .unwrap();
    assert_eq!(outcome, Ok(()));

    // One prevote before the change, one per new period after it. The first
    // new period has nothing to reveal; every later one reveals its predecessor.
    assert_eq!(gateway.prevotes().len(), 21);
    assert_eq!(gateway.votes().len(), 19);
    assert_eq!(reader.period(), Some(VotingPeriod::new(39)));
}
