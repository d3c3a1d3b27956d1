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

//! deterministic stand-ins for the external collaborators (propagator, feed, storage)
#![allow(dead_code)]

use std::sync::{Arc, Mutex, atomic::{AtomicUsize, Ordering}};
use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use nalgebra::Vector3;
use tokio::sync::Notify;

use sattrack_common::geo::LatLon;
use sattrack_orbital::{
    element_set::{ElementSet, ElementSetEntry, ElementSetId},
    errors::{OrbitalError, Result},
    feed::FeedSource,
    geodesy::{EciState, Propagator},
    store::{ElementStorage, MemoryElementStorage},
};

pub const OLD_LINE1: &str = "1 25544U 98067A   24300.00000000  .00016717  00000-0  10270-3 0  9991";
pub const OLD_LINE2: &str = "2 25544  51.6400 200.0000 0006703 130.5360 325.0288 15.50000000400001";

pub fn t0 ()->DateTime<Utc> {
    Utc.with_ymd_and_hms( 2024, 11, 5, 12, 0, 0).unwrap()
}

pub fn entry (name: &str, line1: &str, line2: &str)->ElementSetEntry {
    ElementSetEntry::new( name, line1, line2).with_last_updated( t0())
}

/* #region propagator ************************************************************************************/

/// a ground track that moves east at a constant rate, starting at `lon0` at `t0`. The fake state
/// vector carries (lat,lon) in its x/y components, `to_geodetic` just unpacks them
pub struct LinearTrack {
    pub t0: DateTime<Utc>,
    pub lat: f64,
    pub lon0: f64,
    pub deg_per_sec: f64,
    /// sample offsets (seconds from t0) for which propagation fails
    pub fail_at: Box<dyn Fn(i64)->bool + Send + Sync>,
    /// sample offsets for which propagation yields NaN
    pub nan_at: Box<dyn Fn(i64)->bool + Send + Sync>,
}

impl LinearTrack {
    pub fn new (lon0: f64, deg_per_sec: f64)->Self {
        LinearTrack { t0: t0(), lat: 0.0, lon0, deg_per_sec, fail_at: Box::new( |_| false), nan_at: Box::new( |_| false) }
    }

    pub fn failing_at (mut self, f: impl Fn(i64)->bool + Send + Sync + 'static)->Self {
        self.fail_at = Box::new(f);
        self
    }

    pub fn nan_at (mut self, f: impl Fn(i64)->bool + Send + Sync + 'static)->Self {
        self.nan_at = Box::new(f);
        self
    }
}

impl Propagator for LinearTrack {
    fn propagate (&self, es: &ElementSet, t: DateTime<Utc>)->Option<EciState> {
        if es.name == "DECAYED" { return None }

        let dt = (t - self.t0).num_seconds();
        if (self.fail_at)(dt) { return None }

        let lon = if (self.nan_at)(dt) { f64::NAN } else { self.lon0 + self.deg_per_sec * dt as f64 };
        Some( EciState { position: Vector3::new( self.lat, lon, 0.0), velocity: Vector3::zeros() })
    }

    fn sidereal_time (&self, _t: DateTime<Utc>)->f64 { 0.0 }

    fn to_geodetic (&self, position: &Vector3<f64>, _sidereal_time: f64)->LatLon {
        LatLon::new( position.x, position.y)
    }
}

/* #endregion propagator */

/* #region feed ******************************************************************************************/

/// serves a fixed text (or error) and counts requests
pub struct FakeFeed {
    pub text: Mutex<std::result::Result<String,String>>,
    pub requests: Arc<AtomicUsize>,
    pub urls: Arc<Mutex<Vec<String>>>,
    /// if set, fetches signal `started` and then wait for `release`
    pub gate: Option<(Arc<Notify>,Arc<Notify>)>,
}

impl FakeFeed {
    pub fn new (text: &str)->Self {
        FakeFeed { text: Mutex::new( Ok(text.to_string())), requests: Arc::new( AtomicUsize::new(0)), urls: Arc::new( Mutex::new( Vec::new())), gate: None }
    }

    pub fn failing (msg: &str)->Self {
        let feed = Self::new("");
        *feed.text.lock().unwrap() = Err( msg.to_string());
        feed
    }

    pub fn gated (text: &str, started: Arc<Notify>, release: Arc<Notify>)->Self {
        let mut feed = Self::new(text);
        feed.gate = Some( (started, release));
        feed
    }
}

#[async_trait]
impl FeedSource for FakeFeed {
    async fn fetch_text (&self, url: &str)->Result<String> {
        self.requests.fetch_add( 1, Ordering::SeqCst);
        self.urls.lock().unwrap().push( url.to_string());

        if let Some((started,release)) = &self.gate {
            started.notify_one();
            release.notified().await;
        }

        let res = self.text.lock().unwrap().clone();
        res.map_err( |msg| OrbitalError::NetworkError{ status: Some(503), msg })
    }
}

/* #endregion feed */

/* #region storage ***************************************************************************************/

/// memory storage that refuses updates for selected names
pub struct FlakyStorage {
    pub inner: MemoryElementStorage,
    pub reject_updates_for: Vec<String>,
    pub updates: Arc<AtomicUsize>,
    /// if set, the first update is stored, then signals `started` and waits for `release` before it returns
    pub slow_first_update: Mutex<Option<(Arc<Notify>,Arc<Notify>)>>,
}

impl FlakyStorage {
    pub fn new (entries: Vec<ElementSetEntry>, reject_updates_for: &[&str])->Self {
        FlakyStorage {
            inner: MemoryElementStorage::with_entries( entries),
            reject_updates_for: reject_updates_for.iter().map( |s| s.to_string()).collect(),
            updates: Arc::new( AtomicUsize::new(0)),
            slow_first_update: Mutex::new(None),
        }
    }

    pub fn with_slow_first_update (self, started: Arc<Notify>, release: Arc<Notify>)->Self {
        *self.slow_first_update.lock().unwrap() = Some( (started, release));
        self
    }
}

#[async_trait]
impl ElementStorage for FlakyStorage {
    async fn list_element_sets (&self)->Result<Vec<ElementSet>> { self.inner.list_element_sets().await }
    async fn get_by_id (&self, id: &ElementSetId)->Result<Option<ElementSet>> { self.inner.get_by_id(id).await }
    async fn create (&self, entry: &ElementSetEntry)->Result<ElementSet> { self.inner.create(entry).await }

    async fn update (&self, id: &ElementSetId, entry: &ElementSetEntry)->Result<()> {
        self.updates.fetch_add( 1, Ordering::SeqCst);
        if self.reject_updates_for.contains( &entry.name) {
            return Err( OrbitalError::NetworkError{ status: Some(500), msg: "device busy".into() })
        }

        self.inner.update( id, entry).await?;
        let gate = self.slow_first_update.lock().unwrap().take();
        if let Some((started,release)) = gate {
            started.notify_one();
            release.notified().await;
        }
        Ok(())
    }

    async fn delete_by_id (&self, id: &ElementSetId)->Result<()> { self.inner.delete_by_id(id).await }
}

/* #endregion storage */
