use std::sync::Arc;
use std::time::Duration;

use common::{BookingId, ShowId};
use domain::{SeatLayout, SeatSelection};
use reservation::{BroadcastInvalidator, CacheScope, InvalidationSignal, ReservationEngine};
use seat_cache::SeatCache;
use store::InMemorySeatStore;
use tokio::sync::watch;

async fn create_show(engine: &ReservationEngine<InMemorySeatStore>) -> ShowId {
    let show_id = ShowId::new();
    engine
        .create_show(show_id, SeatLayout::new(2, 3).unwrap())
        .await
        .unwrap();
    show_id
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_engine_writes_evict_cached_reads() {
    let store = InMemorySeatStore::new();
    let invalidator = BroadcastInvalidator::new(64);
    let writer =
        ReservationEngine::new(store.clone()).with_invalidation(Arc::new(invalidator.clone()));
    let show_id = create_show(&writer).await;

    let cache = SeatCache::new(ReservationEngine::new(store));
    assert_eq!(cache.available_seats(show_id).await.unwrap().len(), 6);
    assert_eq!(cache.inventory(show_id).await.unwrap().available_seats, 6);

    let (tx, rx) = watch::channel(false);
    let handle = cache.listen(invalidator.subscribe()).spawn(rx);

    let seats = SeatSelection::parse(["A1", "B2"]).unwrap();
    writer.block(show_id, &seats, BookingId::new()).await.unwrap();

    let mut available = 6;
    for _ in 0..100 {
        available = cache.inventory(show_id).await.unwrap().available_seats;
        if available == 4 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert_eq!(available, 4);

    let mut free = Vec::new();
    for _ in 0..100 {
        free = cache.available_seats(show_id).await.unwrap();
        if free.len() == 4 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    let free: Vec<String> = free.iter().map(|s| s.seat_number.to_string()).collect();
    assert_eq!(free, vec!["A2", "A3", "B1", "B3"]);

    tx.send(true).unwrap();
    handle.await.unwrap();
}

#[tokio::test]
async fn test_lagged_listener_clears_whole_cache() {
    let store = InMemorySeatStore::new();
    let writer = ReservationEngine::new(store.clone());
    let touched = create_show(&writer).await;
    let untouched = create_show(&writer).await;

    let cache = SeatCache::new(ReservationEngine::new(store));
    cache.seats(untouched).await.unwrap();
    cache.inventory(untouched).await.unwrap();
    assert_eq!(cache.len().await, 2);

    let invalidator = BroadcastInvalidator::new(1);
    let receiver = invalidator.subscribe();
    for _ in 0..3 {
        invalidator.invalidate(CacheScope::Seats, touched);
    }

    let (tx, rx) = watch::channel(false);
    let handle = cache.listen(receiver).spawn(rx);

    let mut empty = false;
    for _ in 0..100 {
        if cache.is_empty().await {
            empty = true;
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert!(empty);

    tx.send(true).unwrap();
    handle.await.unwrap();
}

#[tokio::test]
async fn test_listener_stops_when_channel_closes() {
    let store = InMemorySeatStore::new();
    let cache = SeatCache::new(ReservationEngine::new(store));
    let invalidator = BroadcastInvalidator::new(4);
    let receiver = invalidator.subscribe();
    let (_tx, rx) = watch::channel(false);

    let handle = cache.listen(receiver).spawn(rx);
    drop(invalidator);

    tokio::time::timeout(Duration::from_secs(5), handle)
        .await
        .expect("listener did not stop")
        .unwrap();
}
