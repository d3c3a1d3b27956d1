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

use std::{fmt, future::Future, time::Duration};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::{select, time::{interval, MissedTickBehavior}};
use tracing::{debug, info};

use sattrack_common::{datetime::secs, geo::{LatLon, Polyline}};
use crate::{ObjectUpdateAction, TrackerConfig};
use crate::clock::SimClock;
use crate::element_set::{ElementSet, ElementSetEntry, ElementSetId};
use crate::geodesy::Propagator;
use crate::store::ElementSetStore;
use crate::trail::{Trail, TrailBuilder, TrailConfig};

/// identity of a tracked object. The fallback object is not backed by a stored element set
#[derive(Debug,Clone,PartialEq,Eq,Hash,Serialize)]
pub enum ObjectId {
    Stored(ElementSetId),
    Fallback,
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ObjectId::Stored(id) => write!(f, "{}", id),
            ObjectId::Fallback => write!(f, "<fallback>")
        }
    }
}

/// what we report to the rendering layer for each object and recompute pass
#[derive(Debug,Clone,PartialEq,Serialize)]
pub struct ObjectUpdate {
    pub id: ObjectId,
    pub name: String,
    pub time: DateTime<Utc>,
    pub position: Option<LatLon>,
    pub segments: Vec<Polyline>,
}

/// an element set paired with the result of the last recompute pass
#[derive(Debug,Clone)]
pub struct TrackedObject {
    pub id: ObjectId,
    pub element_set: ElementSet,
    pub trail: Trail,
}

impl TrackedObject {
    pub fn position (&self)->Option<LatLon> { self.trail.position }
    pub fn segments (&self)->&[Polyline] { &self.trail.segments }
}

/// drives position and trail computation for the current contents of an [`ElementSetStore`]
/// under a [`SimClock`]. Each pass rebuilds all tracked objects from scratch, using a single
/// captured "now" for all of them
pub struct TrackingSession<P,A> where P: Propagator, A: ObjectUpdateAction {
    clock: SimClock,
    store: ElementSetStore,
    propagator: P,
    builder: TrailBuilder,
    fallback: ElementSet,
    action: A,
    tick_interval: Duration,
    objects: Vec<TrackedObject>,
}

impl<P,A> TrackingSession<P,A> where P: Propagator, A: ObjectUpdateAction {
    pub fn new (clock: SimClock, store: ElementSetStore, propagator: P, trail_config: TrailConfig, fallback: ElementSetEntry, action: A)->Self {
        TrackingSession {
            clock,
            store,
            propagator,
            builder: TrailBuilder::new( trail_config),
            fallback: ElementSet::from_entry( ElementSetId::new("fallback"), fallback),
            action,
            tick_interval: secs(1),
            objects: Vec::new(),
        }
    }

    pub fn from_config (config: &TrackerConfig, clock: SimClock, store: ElementSetStore, propagator: P, action: A)->Self {
        Self::new( clock, store, propagator, config.trail, config.fallback.clone(), action)
            .with_tick_interval( config.tick_interval)
    }

    pub fn with_tick_interval (mut self, tick_interval: Duration)->Self {
        self.tick_interval = tick_interval;
        self
    }

    pub fn clock (&self)->&SimClock { &self.clock }
    pub fn store (&self)->&ElementSetStore { &self.store }

    /// the objects of the last recompute pass
    pub fn objects (&self)->&[TrackedObject] { &self.objects }

    /// rebuild all tracked objects for the current simulated time, report each of them and report
    /// objects that are no longer tracked. Returns the number of tracked objects
    pub fn recompute (&mut self)->usize {
        let now = self.clock.now();
        let sets = self.store.all();

        let members: Vec<(ObjectId,ElementSet)> = if sets.is_empty() {
            vec![ (ObjectId::Fallback, self.fallback.clone()) ]
        } else {
            sets.into_iter().map( |es| (ObjectId::Stored(es.id.clone()), es)).collect()
        };

        let objects: Vec<TrackedObject> = members.into_iter().map( |(id, element_set)| {
            let trail = self.builder.build( &self.propagator, &element_set, now);
            TrackedObject { id, element_set, trail }
        }).collect();

        for old in &self.objects {
            if !objects.iter().any( |o| o.id == old.id) {
                debug!("object {} no longer tracked", old.id);
                self.action.on_object_removed( &old.id);
            }
        }

        for o in &objects {
            let update = ObjectUpdate {
                id: o.id.clone(),
                name: o.element_set.name.clone(),
                time: now,
                position: o.trail.position,
                segments: o.trail.segments.clone(),
            };
            self.action.on_object_updated( &update);
        }

        self.objects = objects;
        self.objects.len()
    }

    /// recompute on every tick, clock change and store change until `shutdown` completes
    pub async fn run<F> (&mut self, shutdown: F) where F: Future<Output=()> {
        let mut ticker = interval( self.tick_interval);
        ticker.set_missed_tick_behavior( MissedTickBehavior::Skip);
        let mut clock_rx = self.clock.subscribe();
        let mut store_rx = self.store.subscribe();
        tokio::pin!(shutdown);

        info!("tracking session started");
        loop {
            select! {
                _ = &mut shutdown => break,
                _ = ticker.tick() => {}
                Ok(_) = clock_rx.changed() => {}
                Ok(_) = store_rx.changed() => {}
            }
            self.recompute();
        }
        info!("tracking session terminated");
    }
}
