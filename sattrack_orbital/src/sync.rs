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

//! periodic synchronization of the local element sets with a remote feed.
//!
//! A [`SyncScheduler`] has two independent pieces of state: its [`SyncConfig`] (how often, from where)
//! and its [`SyncCheckpoint`] (when did we last try). The checkpoint is written after every executed
//! attempt, including failed ones, so that an unreachable feed does not cause retry storms

use std::{path::{Path,PathBuf}, sync::{Arc,Weak,Mutex,MutexGuard,atomic::{AtomicBool,Ordering}}, time::Duration};
use chrono::{DateTime,Utc};
use serde::{Deserialize,Serialize};
use tokio::{sync::broadcast::error::RecvError, task::AbortHandle, time::sleep};
use tracing::{debug,info,warn,error};

use sattrack_common::{is_blank, datetime::{utc_now,hours,days,to_time_delta,duration_since,ser_epoch_millis_option,de_from_epoch_millis_option}};
use sattrack_common::fs::{filepath_contents_as_string, set_filepath_contents_atomically};
use crate::{SyncResultAction, errors::Result};
use crate::feed::FeedSource;
use crate::settings::{Settings, SYNC_KEYS, TLE_FREQUENCY, TLE_SOURCE, TLE_CUSTOM_URL};
use crate::store::ElementSetStore;

pub const CELESTRAK_URL: &str = "https://celestrak.org/NORAD/elements/active.txt";
pub const SPACE_TRACK_URL: &str = "https://www.space-track.org/";

/// the default feed
pub const DEFAULT_FEED_URL: &str = CELESTRAK_URL;

/// how long the timer waits before re-checking if a due sync could not run because another one was in flight
const BUSY_RETRY_DELAY: Duration = Duration::from_secs(1);

/* #region cadences **************************************************************************************/

/// something that maps to a fixed repeat interval, or to no automatic repetition at all
pub trait Cadence {
    fn interval (&self)->Option<Duration>;
}

/// true if `cadence` is automatic and there either was no previous run or its interval has elapsed
pub fn is_due<C: Cadence> (cadence: &C, last: Option<DateTime<Utc>>, now: DateTime<Utc>)->bool {
    match cadence.interval() {
        None => false,
        Some(interval) => match last {
            None => true,
            Some(last) => now - last >= to_time_delta(interval)
        }
    }
}

#[derive(Debug,Clone,Copy,PartialEq,Eq,Default,Serialize,Deserialize)]
pub enum SyncFrequency {
    Manual,
    Hourly,
    Every6h,
    #[default]
    Daily,
}

impl SyncFrequency {
    /// the settings value representation. Unknown values map to the default
    pub fn from_setting (s: &str)->Self {
        match s.trim() {
            "manual" => SyncFrequency::Manual,
            "hourly" => SyncFrequency::Hourly,
            "6h" => SyncFrequency::Every6h,
            "daily" => SyncFrequency::Daily,
            _ => SyncFrequency::default()
        }
    }

    pub fn as_setting (&self)->&'static str {
        match self {
            SyncFrequency::Manual => "manual",
            SyncFrequency::Hourly => "hourly",
            SyncFrequency::Every6h => "6h",
            SyncFrequency::Daily => "daily",
        }
    }
}

impl Cadence for SyncFrequency {
    fn interval (&self)->Option<Duration> {
        match self {
            SyncFrequency::Manual => None,
            SyncFrequency::Hourly => Some( hours(1)),
            SyncFrequency::Every6h => Some( hours(6)),
            SyncFrequency::Daily => Some( hours(24)),
        }
    }
}

/// whole-day cadences for update checks that share the scheduler logic (e.g. firmware checks)
#[derive(Debug,Clone,Copy,PartialEq,Eq,Default,Serialize,Deserialize)]
pub enum CheckFrequency {
    Daily,
    #[default]
    Weekly,
    Monthly,
    Never,
}

impl CheckFrequency {
    pub fn from_setting (s: &str)->Self {
        match s.trim() {
            "daily" => CheckFrequency::Daily,
            "weekly" => CheckFrequency::Weekly,
            "monthly" => CheckFrequency::Monthly,
            "never" => CheckFrequency::Never,
            _ => CheckFrequency::default()
        }
    }
}

impl Cadence for CheckFrequency {
    fn interval (&self)->Option<Duration> {
        match self {
            CheckFrequency::Daily => Some( days(1)),
            CheckFrequency::Weekly => Some( days(7)),
            CheckFrequency::Monthly => Some( days(30)),
            CheckFrequency::Never => None,
        }
    }
}

/* #endregion cadences */

/* #region config and checkpoint *************************************************************************/

#[derive(Debug,Clone,Copy,PartialEq,Eq,Default,Serialize,Deserialize)]
pub enum SyncSource {
    #[default]
    Celestrak,
    SpaceTrack,
    Custom,
}

impl SyncSource {
    pub fn from_setting (s: &str)->Self {
        match s.trim() {
            "celestrak" => SyncSource::Celestrak,
            "space-track" => SyncSource::SpaceTrack,
            "custom" => SyncSource::Custom,
            _ => SyncSource::default()
        }
    }

    pub fn as_setting (&self)->&'static str {
        match self {
            SyncSource::Celestrak => "celestrak",
            SyncSource::SpaceTrack => "space-track",
            SyncSource::Custom => "custom",
        }
    }
}

#[derive(Debug,Clone,PartialEq,Eq,Default,Serialize,Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    pub frequency: SyncFrequency,
    pub source: SyncSource,
    pub custom_url: Option<String>,
}

impl SyncConfig {
    pub fn new (frequency: SyncFrequency, source: SyncSource, custom_url: Option<String>)->Self {
        SyncConfig { frequency, source, custom_url }
    }

    /// derive the config from the `tleFrequency`, `tleSource` and `tleCustomURL` settings
    pub fn from_settings (settings: &Settings)->Self {
        let frequency = settings.get(TLE_FREQUENCY).map( |s| SyncFrequency::from_setting(&s)).unwrap_or_default();
        let source = settings.get(TLE_SOURCE).map( |s| SyncSource::from_setting(&s)).unwrap_or_default();
        let custom_url = settings.get(TLE_CUSTOM_URL);
        SyncConfig { frequency, source, custom_url }
    }

    /// None for manual synchronization
    pub fn interval (&self)->Option<Duration> {
        self.frequency.interval()
    }

    /// the feed URL to use. A custom source without a (non-blank) URL falls back to the default feed
    pub fn resolved_source_url (&self)->String {
        match self.source {
            SyncSource::Celestrak => CELESTRAK_URL.to_string(),
            SyncSource::SpaceTrack => SPACE_TRACK_URL.to_string(),
            SyncSource::Custom => match &self.custom_url {
                Some(url) if !is_blank(url) => url.trim().to_string(),
                _ => DEFAULT_FEED_URL.to_string()
            }
        }
    }
}

#[derive(Debug,Clone,Copy,PartialEq,Eq,Default,Serialize,Deserialize)]
#[serde(rename_all="camelCase")]
pub struct SyncCheckpoint {
    #[serde(default, serialize_with="ser_epoch_millis_option", deserialize_with="de_from_epoch_millis_option")]
    pub last_sync_at: Option<DateTime<Utc>>,
}

impl SyncCheckpoint {
    pub fn at (dt: DateTime<Utc>)->Self { SyncCheckpoint { last_sync_at: Some(dt) } }
}

/// persistence for the process wide sync checkpoint
pub trait CheckpointStore: Send + Sync + 'static {
    fn load (&self)->Result<SyncCheckpoint>;
    fn store (&self, checkpoint: &SyncCheckpoint)->Result<()>;
}

#[derive(Default)]
pub struct MemoryCheckpointStore {
    checkpoint: Mutex<SyncCheckpoint>
}

impl MemoryCheckpointStore {
    pub fn new ()->Self { Self::default() }

    pub fn with_checkpoint (checkpoint: SyncCheckpoint)->Self {
        MemoryCheckpointStore { checkpoint: Mutex::new(checkpoint) }
    }
}

impl CheckpointStore for MemoryCheckpointStore {
    fn load (&self)->Result<SyncCheckpoint> {
        Ok( *self.checkpoint.lock().unwrap_or_else( |e| e.into_inner()) )
    }

    fn store (&self, checkpoint: &SyncCheckpoint)->Result<()> {
        *self.checkpoint.lock().unwrap_or_else( |e| e.into_inner()) = *checkpoint;
        Ok(())
    }
}

/// keeps the checkpoint as a small JSON file (`{"lastSyncAt": <epoch millis>}`)
pub struct JsonFileCheckpointStore {
    path: PathBuf
}

impl JsonFileCheckpointStore {
    pub fn new (path: impl AsRef<Path>)->Self {
        JsonFileCheckpointStore { path: path.as_ref().to_path_buf() }
    }

    pub fn path (&self)->&Path { &self.path }
}

impl CheckpointStore for JsonFileCheckpointStore {
    fn load (&self)->Result<SyncCheckpoint> {
        if self.path.is_file() {
            let json = filepath_contents_as_string( &self.path)?;
            Ok( serde_json::from_str( &json)? )
        } else {
            Ok( SyncCheckpoint::default() )
        }
    }

    fn store (&self, checkpoint: &SyncCheckpoint)->Result<()> {
        let json = serde_json::to_vec( checkpoint)?;
        Ok( set_filepath_contents_atomically( &self.path, &json)? )
    }
}

impl CheckpointStore for Box<dyn CheckpointStore> {
    fn load (&self)->Result<SyncCheckpoint> { (**self).load() }
    fn store (&self, checkpoint: &SyncCheckpoint)->Result<()> { (**self).store( checkpoint) }
}

/// a file based store if there is a path, an in-memory one otherwise
pub fn checkpoint_store (path: Option<&Path>)->Box<dyn CheckpointStore> {
    match path {
        Some(path) => Box::new( JsonFileCheckpointStore::new( path)),
        None => Box::new( MemoryCheckpointStore::new())
    }
}

/* #endregion config and checkpoint */

/* #region scheduler *************************************************************************************/

/// the outcome of a [`SyncScheduler::run_sync`] call
#[derive(Debug,Clone,PartialEq,Default)]
pub struct SyncResult {
    /// false if the call was a no-op because another sync was still in flight
    pub attempted: bool,
    pub updated_count: usize,
    pub error: Option<String>,
}

impl SyncResult {
    fn skipped ()->Self { SyncResult { attempted: false, updated_count: 0, error: None } }
    fn failed (msg: String)->Self { SyncResult { attempted: true, updated_count: 0, error: Some(msg) } }
    fn completed (updated_count: usize, error: Option<String>)->Self { SyncResult { attempted: true, updated_count, error } }

    pub fn is_ok (&self)->bool { self.attempted && self.error.is_none() }
}

struct SchedulerState {
    config: SyncConfig,
    checkpoint: SyncCheckpoint,
    timer: Option<AbortHandle>,
    settings_watch: Option<AbortHandle>,
}

struct SchedulerInner {
    store: ElementSetStore,
    feed: Box<dyn FeedSource>,
    checkpoints: Box<dyn CheckpointStore>,
    on_result: Box<dyn SyncResultAction>,
    state: Mutex<SchedulerState>,
    in_flight: AtomicBool,
}

impl SchedulerInner {
    fn state (&self)->MutexGuard<'_,SchedulerState> {
        self.state.lock().unwrap_or_else( |e| e.into_inner())
    }

    /// time until the next sync is due, None if there is no automatic sync
    fn next_delay (&self, now: DateTime<Utc>)->Option<Duration> {
        let state = self.state();
        let interval = state.config.interval()?;
        match state.checkpoint.last_sync_at {
            Some(last) => {
                let elapsed = duration_since( &now, &last);
                Some( interval.saturating_sub( elapsed))
            }
            None => Some( Duration::ZERO)
        }
    }
}

impl Drop for SchedulerInner {
    fn drop (&mut self) {
        let state = self.state.get_mut().unwrap_or_else( |e| e.into_inner());
        if let Some(h) = state.timer.take() { h.abort() }
        if let Some(h) = state.settings_watch.take() { h.abort() }
    }
}

/// resets the in-flight flag when a sync completes or its future gets dropped
struct InFlight<'a>(&'a AtomicBool);

impl<'a> Drop for InFlight<'a> {
    fn drop (&mut self) {
        self.0.store( false, Ordering::Release);
    }
}

/// keeps an [`ElementSetStore`] in sync with a remote feed, either on demand ([`run_sync`](Self::run_sync),
/// [`check_and_sync`](Self::check_and_sync)) or on its own timer ([`start`](Self::start)).
/// Cloning is cheap, clones share state. Timer tasks only hold weak references, dropping the last
/// clone cancels them
#[derive(Clone)]
pub struct SyncScheduler {
    inner: Arc<SchedulerInner>
}

impl SyncScheduler {
    pub fn new (store: ElementSetStore, feed: impl FeedSource, checkpoints: impl CheckpointStore,
                config: SyncConfig, on_result: impl SyncResultAction)->Self
    {
        let checkpoint = match checkpoints.load() {
            Ok(cp) => cp,
            Err(e) => {
                warn!("failed to read sync checkpoint, assuming none: {e}");
                SyncCheckpoint::default()
            }
        };

        let state = SchedulerState { config, checkpoint, timer: None, settings_watch: None };
        let inner = SchedulerInner {
            store,
            feed: Box::new(feed),
            checkpoints: Box::new(checkpoints),
            on_result: Box::new(on_result),
            state: Mutex::new(state),
            in_flight: AtomicBool::new(false),
        };

        SyncScheduler { inner: Arc::new(inner) }
    }

    fn from_weak (weak: &Weak<SchedulerInner>)->Option<Self> {
        weak.upgrade().map( |inner| SyncScheduler { inner })
    }

    pub fn config (&self)->SyncConfig {
        self.inner.state().config.clone()
    }

    pub fn checkpoint (&self)->SyncCheckpoint {
        self.inner.state().checkpoint
    }

    pub fn last_sync_at (&self)->Option<DateTime<Utc>> {
        self.inner.state().checkpoint.last_sync_at
    }

    pub fn store (&self)->&ElementSetStore {
        &self.inner.store
    }

    pub fn is_due (&self, now: DateTime<Utc>)->bool {
        let state = self.inner.state();
        is_due( &state.config.frequency, state.checkpoint.last_sync_at, now)
    }

    pub fn is_in_flight (&self)->bool {
        self.inner.in_flight.load( Ordering::Acquire)
    }

    /// fetch the configured feed and update all local sets whose name matches a remote entry and
    /// whose orbital lines differ. The checkpoint is set to `now` after every executed attempt
    /// regardless of its outcome. Fetch and parse errors are reported in the result, they never
    /// change any element set. Calling this while another sync is in flight is a no-op
    pub async fn run_sync (&self, now: DateTime<Utc>)->SyncResult {
        if self.inner.in_flight.swap( true, Ordering::AcqRel) {
            debug!("sync already in progress");
            return SyncResult::skipped()
        }
        let _in_flight = InFlight( &self.inner.in_flight);

        let url = self.inner.state().config.resolved_source_url();
        let store = &self.inner.store;

        let result = if store.is_empty() {
            info!("no element sets to refresh");
            SyncResult::completed( 0, None)

        } else {
            match self.inner.feed.fetch_feed( &url).await {
                Ok(remote) => {
                    let report = store.merge_remote( &remote, now).await;
                    let error = report.failed.first().map( |(id,e)| {
                        format!("{} update(s) could not be stored, first failure {}: {}", report.failed.len(), id, e)
                    });
                    if report.updated > 0 {
                        info!("updated {} element set(s) from {}", report.updated, url);
                    } else {
                        info!("no element sets needed updating");
                    }
                    SyncResult::completed( report.updated, error)
                }
                Err(e) => {
                    warn!("failed to fetch element sets from {}: {}", url, e);
                    SyncResult::failed( e.to_string())
                }
            }
        };

        self.record_checkpoint( SyncCheckpoint::at(now));
        self.inner.on_result.on_sync_result( &result);
        result
    }

    fn record_checkpoint (&self, checkpoint: SyncCheckpoint) {
        self.inner.state().checkpoint = checkpoint;
        if let Err(e) = self.inner.checkpoints.store( &checkpoint) {
            error!("failed to persist sync checkpoint: {e}");
        }
    }

    /// run a sync if one is due at `now`
    pub async fn check_and_sync (&self, now: DateTime<Utc>)->Option<SyncResult> {
        if self.is_due(now) {
            Some( self.run_sync(now).await)
        } else {
            None
        }
    }

    /// establish the timer for the current config. This needs to be called from within a tokio runtime
    pub fn start (&self) {
        let config = self.config();
        self.reconfigure( config);
    }

    /// replace the config, cancelling any running timer and starting a new one (which immediately
    /// checks if a sync is due) unless the new frequency is manual. A sync that is already in
    /// progress runs to completion
    pub fn reconfigure (&self, config: SyncConfig) {
        let mut state = self.inner.state();

        if let Some(timer) = state.timer.take() {
            timer.abort();
        }

        match config.interval() {
            Some(interval) => {
                info!("sync every {:?} from {}", interval, config.resolved_source_url());
                state.config = config;
                state.timer = Some( self.spawn_timer());
            }
            None => {
                info!("automatic sync disabled");
                state.config = config;
            }
        }
    }

    fn spawn_timer (&self)->AbortHandle {
        let weak = Arc::downgrade( &self.inner);

        tokio::spawn( async move {
            loop {
                let Some(delay) = weak.upgrade().and_then( |inner| inner.next_delay( utc_now())) else { break };
                if !delay.is_zero() {
                    sleep(delay).await;
                }

                let Some(scheduler) = Self::from_weak( &weak) else { break };

                // the attempt runs in its own task so that replacing or aborting the timer never cancels a started sync
                let attempt = tokio::spawn( async move { scheduler.check_and_sync( utc_now()).await });
                let attempted = match attempt.await {
                    Ok(Some(res)) => res.attempted,
                    Ok(None) => true, // not due (anymore), next_delay will tell us how long to wait
                    Err(e) => {
                        error!("sync task failed: {e}");
                        false
                    }
                };

                if !attempted {
                    sleep( BUSY_RETRY_DELAY).await;
                }
            }
        }).abort_handle()
    }

    pub fn has_timer (&self)->bool {
        self.inner.state().timer.as_ref().map( |h| !h.is_finished()).unwrap_or(false)
    }

    /// reconfigure whenever one of the sync related settings changes
    pub fn watch_settings (&self, settings: &Settings) {
        let mut rx = settings.subscribe();
        let settings = settings.clone();
        let weak = Arc::downgrade( &self.inner);

        let handle = tokio::spawn( async move {
            loop {
                match rx.recv().await {
                    Ok(change) => {
                        if !SYNC_KEYS.contains( &change.key.as_str()) { continue }
                        debug!("sync setting {} changed", change.key);
                    }
                    Err(RecvError::Lagged(n)) => debug!("missed {n} settings changes"),
                    Err(RecvError::Closed) => break
                }

                let Some(scheduler) = Self::from_weak( &weak) else { break };
                scheduler.reconfigure( SyncConfig::from_settings( &settings));
            }
        }).abort_handle();

        if let Some(prev) = self.inner.state().settings_watch.replace( handle) {
            prev.abort();
        }
    }

    /// stop the timer and settings watch. The scheduler can still be used for on-demand syncs
    pub fn terminate (&self) {
        let mut state = self.inner.state();
        if let Some(h) = state.timer.take() { h.abort() }
        if let Some(h) = state.settings_watch.take() { h.abort() }
    }
}

/* #endregion scheduler */
