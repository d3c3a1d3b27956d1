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

use std::time::Duration;
use anyhow::Result;
use tracing::warn;
use sattrack_common::{check_cli, define_cli};
use sattrack_orbital::{
    load_config, TrackerConfig,
    clock::SimClock,
    feed::HttpFeedSource,
    geodesy::SatkitPropagator,
    session::{ObjectUpdate, TrackingSession},
    store::{ElementSetStore, HttpElementStorage},
    sync::{checkpoint_store, SyncResult, SyncScheduler},
};

define_cli! { ARGS [about="print current positions and ground track trails of the element sets stored on a tracker device"] =
    offset: i64 [help="simulated time offset in seconds", short, long, default_value="0", allow_hyphen_values=true],
    duration: Option<u64> [help="number of seconds to run (until ctrl-c if not set)", short, long],
    sync: bool [help="also run the TLE sync scheduler", long],
    config: Option<String> [help="pathname of RON config file"]
}

fn print_update (u: &ObjectUpdate) {
    match &u.position {
        Some(p) => println!("{} {:<24} {}  trail: {} segment(s), {} points", u.time.format("%H:%M:%S"), u.name, p,
                            u.segments.len(), u.segments.iter().map(|s| s.len()).sum::<usize>()),
        None => println!("{} {:<24} no position", u.time.format("%H:%M:%S"), u.name)
    }
}

#[tokio::main]
async fn main()->Result<()> {
    check_cli!(ARGS);
    tracing_subscriber::fmt::init();

    let config: TrackerConfig = match &ARGS.config {
        Some(path) => load_config( path)?,
        None => TrackerConfig::default()
    };

    let store = ElementSetStore::new( HttpElementStorage::new( &config.storage_url));
    if let Err(e) = store.load().await {
        warn!("cannot load element sets from {}, tracking fallback: {}", config.storage_url, e);
    }

    let scheduler = if ARGS.sync {
        let scheduler = SyncScheduler::new( store.clone(), HttpFeedSource::new(), checkpoint_store( config.checkpoint_file.as_deref()),
                                            config.sync.clone(), |res: &SyncResult| println!("sync: {:?}", res));
        scheduler.start();
        Some(scheduler)
    } else { None };

    let clock = SimClock::new();
    clock.set_offset_seconds( ARGS.offset);
    println!("{}", clock.label());

    let mut session = TrackingSession::from_config( &config, clock, store, SatkitPropagator::new(), print_update);
    match ARGS.duration {
        Some(secs) => session.run( tokio::time::sleep( Duration::from_secs(secs))).await,
        None => session.run( async { let _ = tokio::signal::ctrl_c().await; }).await
    }

    if let Some(scheduler) = scheduler { scheduler.terminate() }
    Ok(())
}
