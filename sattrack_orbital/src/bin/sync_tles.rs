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

use anyhow::Result;
use tracing::info;
use sattrack_common::{check_cli, define_cli, datetime::utc_now};
use sattrack_orbital::{
    load_config, TrackerConfig,
    feed::HttpFeedSource,
    store::{ElementSetStore, HttpElementStorage},
    sync::{checkpoint_store, SyncResult, SyncScheduler},
};

define_cli! { ARGS [about="synchronize the element sets stored on a tracker device with a remote TLE feed"] =
    force: bool [help="sync even if no sync is due", short, long],
    watch: bool [help="keep running and sync whenever the configured frequency says so", short, long],
    storage: Option<String> [help="base URL of the device element set API (overrides config)", long],
    source: Option<String> [help="custom feed URL (overrides config)", long],
    config: Option<String> [help="pathname of RON config file"]
}

#[tokio::main]
async fn main()->Result<()> {
    check_cli!(ARGS);
    tracing_subscriber::fmt::init();

    let mut config: TrackerConfig = match &ARGS.config {
        Some(path) => load_config( path)?,
        None => TrackerConfig::default()
    };
    if let Some(url) = &ARGS.storage { config.storage_url = url.clone() }
    if let Some(url) = &ARGS.source {
        config.sync.source = sattrack_orbital::sync::SyncSource::Custom;
        config.sync.custom_url = Some(url.clone());
    }

    let store = ElementSetStore::new( HttpElementStorage::new( &config.storage_url));
    let n = store.load().await?;
    info!("{} has {} element sets", config.storage_url, n);

    let scheduler = SyncScheduler::new(
        store,
        HttpFeedSource::new(),
        checkpoint_store( config.checkpoint_file.as_deref()),
        config.sync.clone(),
        |res: &SyncResult| info!("sync result: {:?}", res)
    );

    if ARGS.watch {
        scheduler.start();
        tokio::signal::ctrl_c().await?;
        scheduler.terminate();

    } else {
        let now = utc_now();
        let res = if ARGS.force { Some( scheduler.run_sync(now).await) } else { scheduler.check_and_sync(now).await };
        match res {
            Some(res) => {
                if let Some(err) = &res.error { println!("sync failed: {err}") }
                println!("updated {} element set(s)", res.updated_count);
            }
            None => println!("no sync due, last sync at {:?}", scheduler.last_sync_at())
        }
    }

    Ok(())
}
