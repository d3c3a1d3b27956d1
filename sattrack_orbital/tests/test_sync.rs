/*
 * Copyright © 2025, United States Government, as represented by the Administrator of
 * the National Aeronautics and Space Administration. All rights reserved.
 *
 * The “ODIN” software is licensed under the Apache License, Version 2.0 (the "License");
 * you may not use this file except in compliance with the License. You may obtain a copy
 * of the License at http://www.apache.org/licenses/LICENSE-2.0.
 *
 * Unless required by applicable law or agreed to in writing, software distributed under
 * the License is distributed on an "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND,
 * either express or implied. See the License for the specific language governing permissions
 * and limitations under the License.
 */

mod fakes;

use std::{sync::{Arc, atomic::{AtomicUsize, Ordering}}, time::Duration};
use chrono::TimeDelta;
use tokio::{sync::Notify, time::sleep};
use sattrack_orbital::{
    NoSyncResultAction,
    settings::{Settings, TLE_CUSTOM_URL, TLE_FREQUENCY, TLE_SOURCE},
    store::{ElementSetStore, MemoryElementStorage},
    sync::*,
};
use fakes::{entry, t0, FakeFeed, OLD_LINE1, OLD_LINE2};

async fn store_with (names: &[&str])->ElementSetStore {
    let store = ElementSetStore::new( MemoryElementStorage::with_entries( names.iter().map( |n| entry( n, OLD_LINE1, OLD_LINE2))));
    store.load().await.unwrap();
    store
}

fn manual ()->SyncConfig {
    SyncConfig::new( SyncFrequency::Manual, SyncSource::Celestrak, None)
}

async fn wait_for (cond: impl Fn()->bool)->bool {
    for _ in 0..200 {
        if cond() { return true }
        sleep( Duration::from_millis(10)).await;
    }
    false
}

#[test]
fn test_is_due() {
    let now = t0();

    assert!( is_due( &SyncFrequency::Daily, Some( now - TimeDelta::hours(25)), now));
    assert!( !is_due( &SyncFrequency::Daily, Some( now - TimeDelta::hours(23)), now));
    assert!( is_due( &SyncFrequency::Daily, Some( now - TimeDelta::hours(24)), now));
    assert!( is_due( &SyncFrequency::Daily, None, now));
    assert!( is_due( &SyncFrequency::Every6h, Some( now - TimeDelta::hours(6)), now));
    assert!( !is_due( &SyncFrequency::Hourly, Some( now - TimeDelta::minutes(59)), now));
    assert!( !is_due( &SyncFrequency::Manual, None, now));

    assert!( is_due( &CheckFrequency::Weekly, Some( now - TimeDelta::days(8)), now));
    assert!( !is_due( &CheckFrequency::Monthly, Some( now - TimeDelta::days(29)), now));
    assert!( !is_due( &CheckFrequency::Never, None, now));
    assert_eq!( CheckFrequency::from_setting("daily"), CheckFrequency::Daily);
}

#[test]
fn test_source_url() {
    let mut config = SyncConfig::default();
    assert_eq!( config.frequency, SyncFrequency::Daily);
    assert_eq!( config.resolved_source_url(), CELESTRAK_URL);

    config.source = SyncSource::Custom;
    config.custom_url = Some("   ".to_string());
    assert_eq!( config.resolved_source_url(), DEFAULT_FEED_URL);

    config.custom_url = Some("  https://example.com/tles.txt ".to_string());
    assert_eq!( config.resolved_source_url(), "https://example.com/tles.txt");

    config.source = SyncSource::SpaceTrack;
    assert_eq!( config.resolved_source_url(), SPACE_TRACK_URL);

    assert_eq!( manual().interval(), None);
    assert_eq!( SyncConfig::new( SyncFrequency::Every6h, SyncSource::Celestrak, None).interval(), Some( Duration::from_secs( 6 * 3600)));
}

#[test]
fn test_config_from_settings() {
    let settings = Settings::new();
    assert_eq!( SyncConfig::from_settings( &settings), SyncConfig::default());

    settings.set( TLE_FREQUENCY, "6h");
    settings.set( TLE_SOURCE, "custom");
    settings.set( TLE_CUSTOM_URL, "https://example.com/x.txt");
    let config = SyncConfig::from_settings( &settings);
    assert_eq!( config.frequency, SyncFrequency::Every6h);
    assert_eq!( config.resolved_source_url(), "https://example.com/x.txt");

    settings.set( TLE_FREQUENCY, "fortnightly");
    settings.set( TLE_SOURCE, "somewhere");
    let config = SyncConfig::from_settings( &settings);
    assert_eq!( config.frequency, SyncFrequency::Daily);
    assert_eq!( config.source, SyncSource::Celestrak);
}

// run with "cargo test test_end_to_end -- --nocapture"
#[tokio::test]
async fn test_end_to_end() {
    let store = store_with( &["SAT-A", "SAT-B"]).await;
    let feed = FakeFeed::new( "SAT-A\nL1\nL2\n");
    let urls = feed.urls.clone();
    let results = Arc::new( AtomicUsize::new(0));
    let r = results.clone();

    let scheduler = SyncScheduler::new( store.clone(), feed, MemoryCheckpointStore::new(), manual(),
                                        move |res: &SyncResult| { println!("{res:?}"); r.fetch_add(1, Ordering::SeqCst); });

    let now = t0();
    let res = scheduler.run_sync( now).await;
    assert!( res.is_ok());
    assert_eq!( res.updated_count, 1);
    assert_eq!( scheduler.last_sync_at(), Some(now));
    assert!( store.find_by_name("SAT-A").unwrap().has_lines( "L1", "L2"));
    assert!( store.find_by_name("SAT-B").unwrap().has_lines( OLD_LINE1, OLD_LINE2));

    let later = now + TimeDelta::hours(1);
    let res = scheduler.run_sync( later).await;
    assert!( res.attempted);
    assert_eq!( res.updated_count, 0);
    assert_eq!( scheduler.last_sync_at(), Some(later));

    assert_eq!( results.load( Ordering::SeqCst), 2);
    assert_eq!( urls.lock().unwrap()[0], CELESTRAK_URL);
}

#[tokio::test]
async fn test_fetch_failure() {
    let store = store_with( &["SAT-A"]).await;
    let version = store.version();
    let scheduler = SyncScheduler::new( store.clone(), FakeFeed::failing("connection refused"), MemoryCheckpointStore::new(), manual(), NoSyncResultAction);

    let now = t0();
    let res = scheduler.run_sync( now).await;
    println!("{res:?}");
    assert!( res.attempted);
    assert_eq!( res.updated_count, 0);
    assert!( res.error.unwrap().contains("connection refused"));

    assert_eq!( scheduler.last_sync_at(), Some(now)); // failed attempts count
    assert_eq!( store.version(), version);
    assert!( store.find_by_name("SAT-A").unwrap().has_lines( OLD_LINE1, OLD_LINE2));
}

#[tokio::test]
async fn test_malformed_feed() {
    let store = store_with( &["SAT-A"]).await;
    let scheduler = SyncScheduler::new( store, FakeFeed::new("<html><body>maintenance</body></html>"), MemoryCheckpointStore::new(), manual(), NoSyncResultAction);

    let res = scheduler.run_sync( t0()).await;
    assert!( res.attempted);
    assert!( res.error.is_some());
    assert_eq!( scheduler.last_sync_at(), Some(t0()));
}

#[tokio::test]
async fn test_empty_store_skips_fetch() {
    let store = store_with( &[]).await;
    let feed = FakeFeed::new( "SAT-A\nL1\nL2\n");
    let requests = feed.requests.clone();
    let scheduler = SyncScheduler::new( store, feed, MemoryCheckpointStore::new(), manual(), NoSyncResultAction);

    let res = scheduler.run_sync( t0()).await;
    assert!( res.is_ok());
    assert_eq!( res.updated_count, 0);
    assert_eq!( requests.load( Ordering::SeqCst), 0);
    assert_eq!( scheduler.last_sync_at(), Some(t0()));
}

#[tokio::test]
async fn test_check_and_sync() {
    let store = store_with( &["SAT-A"]).await;
    let checkpoints = MemoryCheckpointStore::with_checkpoint( SyncCheckpoint::at( t0() - TimeDelta::hours(23)));
    let config = SyncConfig::default();
    let scheduler = SyncScheduler::new( store, FakeFeed::new( "SAT-A\nL1\nL2\n"), checkpoints, config, NoSyncResultAction);

    assert!( !scheduler.is_due( t0()));
    assert!( scheduler.check_and_sync( t0()).await.is_none());

    let now = t0() + TimeDelta::hours(2);
    assert!( scheduler.is_due( now));
    let res = scheduler.check_and_sync( now).await.unwrap();
    assert_eq!( res.updated_count, 1);
    assert!( !scheduler.is_due( now + TimeDelta::hours(1)));
}

#[tokio::test]
async fn test_concurrent_sync_is_noop() {
    let store = store_with( &["SAT-A"]).await;
    let started = Arc::new( Notify::new());
    let release = Arc::new( Notify::new());
    let feed = FakeFeed::gated( "SAT-A\nL1\nL2\n", started.clone(), release.clone());
    let scheduler = SyncScheduler::new( store, feed, MemoryCheckpointStore::new(), manual(), NoSyncResultAction);

    let s = scheduler.clone();
    let first = tokio::spawn( async move { s.run_sync( t0()).await });
    started.notified().await;
    assert!( scheduler.is_in_flight());

    let second = scheduler.run_sync( t0()).await;
    assert!( !second.attempted);

    release.notify_one();
    let first = first.await.unwrap();
    assert!( first.attempted);
    assert_eq!( first.updated_count, 1);
    assert!( !scheduler.is_in_flight());
}

#[tokio::test]
async fn test_reconfigure_timer() {
    let store = store_with( &["SAT-A"]).await;
    let feed = FakeFeed::new( "SAT-A\nL1\nL2\n");
    let requests = feed.requests.clone();
    let scheduler = SyncScheduler::new( store, feed, MemoryCheckpointStore::new(), SyncConfig::default(), NoSyncResultAction);

    // no checkpoint yet, so the new timer syncs right away
    scheduler.start();
    assert!( scheduler.has_timer());
    assert!( wait_for( || requests.load( Ordering::SeqCst) == 1).await);
    assert!( scheduler.last_sync_at().is_some());

    // a manual frequency cancels the timer
    scheduler.reconfigure( manual());
    assert!( !scheduler.has_timer());
    assert_eq!( scheduler.config().frequency, SyncFrequency::Manual);

    scheduler.reconfigure( SyncConfig::new( SyncFrequency::Hourly, SyncSource::Celestrak, None));
    assert!( scheduler.has_timer());
    sleep( Duration::from_millis(50)).await;
    assert_eq!( requests.load( Ordering::SeqCst), 1); // not due yet

    scheduler.terminate();
    assert!( !scheduler.has_timer());
}

#[tokio::test]
async fn test_watch_settings() {
    let store = store_with( &["SAT-A"]).await;
    let feed = FakeFeed::new( "SAT-A\nL1\nL2\n");
    let urls = feed.urls.clone();
    let checkpoints = MemoryCheckpointStore::with_checkpoint( SyncCheckpoint::at( chrono::Utc::now()));
    let scheduler = SyncScheduler::new( store, feed, checkpoints, SyncConfig::default(), NoSyncResultAction);
    let settings = Settings::new();

    scheduler.start();
    scheduler.watch_settings( &settings);
    assert!( scheduler.has_timer());

    settings.set( TLE_FREQUENCY, "manual");
    assert!( wait_for( || !scheduler.has_timer()).await);

    settings.set( "darkMode", "enabled"); // not a sync key
    settings.set( TLE_SOURCE, "custom");
    settings.set( TLE_CUSTOM_URL, "https://example.com/custom.txt");
    settings.set( TLE_FREQUENCY, "hourly");
    assert!( wait_for( || scheduler.config().frequency == SyncFrequency::Hourly).await);
    assert!( wait_for( || scheduler.config().resolved_source_url() == "https://example.com/custom.txt").await);
    assert!( scheduler.has_timer());
    assert!( urls.lock().unwrap().is_empty()); // last sync is recent, nothing due

    scheduler.terminate();
}

#[test]
fn test_file_checkpoint() {
    let path = std::env::temp_dir().join( format!("sattrack-checkpoint-{}.json", std::process::id()));
    let _ = std::fs::remove_file( &path);

    let store = JsonFileCheckpointStore::new( &path);
    assert_eq!( store.load().unwrap(), SyncCheckpoint::default());

    let cp = SyncCheckpoint::at( t0());
    store.store( &cp).unwrap();
    let json = std::fs::read_to_string( &path).unwrap();
    println!("{json}");
    assert!( json.contains("lastSyncAt"));
    assert_eq!( store.load().unwrap(), cp);

    std::fs::remove_file( &path).unwrap();
}

#[tokio::test]
async fn test_reconfigure_during_timer_sync() {
    let store = store_with( &["SAT-A"]).await;
    let started = Arc::new( Notify::new());
    let release = Arc::new( Notify::new());
    let feed = FakeFeed::gated( "SAT-A\nL1\nL2\n", started.clone(), release.clone());
    let results = Arc::new( AtomicUsize::new(0));
    let r = results.clone();
    let scheduler = SyncScheduler::new( store.clone(), feed, MemoryCheckpointStore::new(), SyncConfig::default(),
                                        move |_: &SyncResult| { r.fetch_add(1, Ordering::SeqCst); });

    // no checkpoint, the timer starts a sync right away
    scheduler.start();
    started.notified().await;
    assert!( scheduler.is_in_flight());

    let custom = SyncConfig::new( SyncFrequency::Manual, SyncSource::Custom, Some("https://example.com/tles.txt".to_string()));
    scheduler.reconfigure( custom);
    assert!( !scheduler.has_timer());

    // the started sync still completes and reports
    release.notify_one();
    assert!( wait_for( || results.load( Ordering::SeqCst) == 1).await);
    assert!( wait_for( || !scheduler.is_in_flight()).await);
    assert!( scheduler.last_sync_at().is_some());
    assert!( store.find_by_name("SAT-A").unwrap().has_lines( "L1", "L2"));
}
