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

//! the sattrack orbital engine: keeps a local TLE set in sync with a remote feed, computes
//! current positions and dateline-safe ground track trails under a simulated clock, and notifies
//! the rendering layer about changes

use std::{path::{Path,PathBuf}, time::Duration};
use serde::{Deserialize,Serialize};
use sattrack_common::{config::load_config_path, datetime::{secs,deserialize_duration,serialize_duration}};

pub mod errors;
use errors::Result;

pub mod element_set;
pub mod store;
pub mod feed;
pub mod settings;
pub mod sync;
pub mod clock;
pub mod geodesy;
pub mod trail;
pub mod session;

use element_set::ElementSetEntry;
use sync::{SyncConfig, SyncResult};
use trail::TrailConfig;
use session::{ObjectId, ObjectUpdate};

/// the element set we show if there is nothing else to track (NOAA 15)
pub const FALLBACK_NAME: &str = "NOAA 15";
pub const FALLBACK_LINE1: &str = "1 25338U 98030A   24310.53793981  .00000102  00000+0  83458-4 0  9997";
pub const FALLBACK_LINE2: &str = "2 25338  98.6737 327.2941 0010455  98.9853 261.2683 14.25955749216571";

/// base URL of the element set API of the tracker device when it runs its own access point
pub const DEFAULT_STORAGE_URL: &str = "http://192.168.4.1/api/tles";

pub fn fallback_element_set ()->ElementSetEntry {
    ElementSetEntry::new( FALLBACK_NAME, FALLBACK_LINE1, FALLBACK_LINE2)
}

/// the top level configuration for sattrack applications, normally read from a RON file such as
/// ```ron
/// TrackerConfig(
///     storage_url: "http://192.168.4.1/api/tles",
///     sync: ( frequency: Daily, source: Celestrak ),
///     trail: ( horizon_secs: 7200, step_secs: 60 ),
///     tick_interval: "1s",
///     checkpoint_file: Some("sync-checkpoint.json"),
/// )
/// ```
#[derive(Debug,Clone,Serialize,Deserialize)]
#[serde(default)]
pub struct TrackerConfig {
    pub storage_url: String,
    pub sync: SyncConfig,
    pub trail: TrailConfig,

    #[serde(deserialize_with="deserialize_duration", serialize_with="serialize_duration")]
    pub tick_interval: Duration,

    /// where to persist the last sync time. Kept in memory if not set
    pub checkpoint_file: Option<PathBuf>,

    /// what to display if the store is empty
    pub fallback: ElementSetEntry,
}

impl Default for TrackerConfig {
    fn default()->Self {
        TrackerConfig {
            storage_url: DEFAULT_STORAGE_URL.to_string(),
            sync: SyncConfig::default(),
            trail: TrailConfig::default(),
            tick_interval: secs(1),
            checkpoint_file: None,
            fallback: fallback_element_set(),
        }
    }
}

pub fn load_config<P: AsRef<Path>> (path: P)->Result<TrackerConfig> {
    Ok( load_config_path( path)? )
}

/* #region actions ***************************************************************************************/

/// the callback interface through which a [`session::TrackingSession`] reports per-object results.
/// Actions are executed synchronously from within the recomputation pass and should not block
pub trait ObjectUpdateAction: Send + Sync + 'static {
    fn on_object_updated (&self, update: &ObjectUpdate);
    fn on_object_removed (&self, _id: &ObjectId) {}
}

pub struct NoObjectUpdateAction;
impl ObjectUpdateAction for NoObjectUpdateAction {
    fn on_object_updated (&self, _update: &ObjectUpdate) {}
}

impl<F> ObjectUpdateAction for F where F: Fn(&ObjectUpdate) + Send + Sync + 'static {
    fn on_object_updated (&self, update: &ObjectUpdate) { self(update) }
}

/// executed by [`sync::SyncScheduler`] after each sync attempt that did run
pub trait SyncResultAction: Send + Sync + 'static {
    fn on_sync_result (&self, result: &SyncResult);
}

pub struct NoSyncResultAction;
impl SyncResultAction for NoSyncResultAction {
    fn on_sync_result (&self, _result: &SyncResult) {}
}

impl<F> SyncResultAction for F where F: Fn(&SyncResult) + Send + Sync + 'static {
    fn on_sync_result (&self, result: &SyncResult) { self(result) }
}

/* #endregion actions */
