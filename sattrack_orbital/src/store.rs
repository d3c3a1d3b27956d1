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

//! the local table of tracked element sets and the storage backends it delegates to.
//!
//! [`ElementSetStore`] owns the merge policy (case-insensitive name matching, byte-level change
//! detection, no auto-creation from remote feeds) whereas [`ElementStorage`] implementations only
//! persist records. Store changes are published as a monotonically increasing version number on a
//! `tokio::sync::watch` channel

use std::{collections::HashMap, sync::{Arc,Mutex,MutexGuard,RwLock,RwLockReadGuard,RwLockWriteGuard}};
use async_trait::async_trait;
use chrono::{DateTime,Utc};
use reqwest::Client;
use tokio::sync::watch;
use tracing::{debug,info,warn};

use sattrack_common::net::{get_json,post_json,put_json,delete};
use crate::element_set::{merge_key, ElementSet, ElementSetEntry, ElementSetId, ElementSetRecord};
use crate::feed::RemoteElementSet;
use crate::errors::{OrbitalError, Result, storage_error};

/* #region storage backends ******************************************************************************/

/// the persistence interface for element sets. Implementations assign ids, they do not
/// apply any merge policy
#[async_trait]
pub trait ElementStorage: Send + Sync + 'static {
    async fn list_element_sets (&self)->Result<Vec<ElementSet>>;
    async fn get_by_id (&self, id: &ElementSetId)->Result<Option<ElementSet>>;
    async fn create (&self, entry: &ElementSetEntry)->Result<ElementSet>;
    async fn update (&self, id: &ElementSetId, entry: &ElementSetEntry)->Result<()>;
    async fn delete_by_id (&self, id: &ElementSetId)->Result<()>;
}

struct MemoryTable {
    next_id: u64,
    sets: Vec<ElementSet>,
}

/// an in-process [`ElementStorage`] with sequentially assigned numeric ids, used for offline
/// operation and tests
pub struct MemoryElementStorage {
    table: Mutex<MemoryTable>
}

impl MemoryElementStorage {
    pub fn new ()->Self {
        MemoryElementStorage { table: Mutex::new( MemoryTable{ next_id: 1, sets: Vec::new() }) }
    }

    pub fn with_entries (entries: impl IntoIterator<Item=ElementSetEntry>)->Self {
        let mut next_id = 1;
        let sets = entries.into_iter().map( |e| {
            let es = ElementSet::from_entry( ElementSetId::new(next_id), e);
            next_id += 1;
            es
        }).collect();

        MemoryElementStorage { table: Mutex::new( MemoryTable{ next_id, sets }) }
    }

    fn lock (&self)->MutexGuard<'_,MemoryTable> {
        self.table.lock().unwrap_or_else( |e| e.into_inner())
    }
}

impl Default for MemoryElementStorage {
    fn default()->Self { Self::new() }
}

#[async_trait]
impl ElementStorage for MemoryElementStorage {
    async fn list_element_sets (&self)->Result<Vec<ElementSet>> {
        Ok( self.lock().sets.clone() )
    }

    async fn get_by_id (&self, id: &ElementSetId)->Result<Option<ElementSet>> {
        Ok( self.lock().sets.iter().find( |es| es.id == *id).cloned() )
    }

    async fn create (&self, entry: &ElementSetEntry)->Result<ElementSet> {
        let mut table = self.lock();
        let es = ElementSet::from_entry( ElementSetId::new( table.next_id), entry.clone());
        table.next_id += 1;
        table.sets.push( es.clone());
        Ok(es)
    }

    async fn update (&self, id: &ElementSetId, entry: &ElementSetEntry)->Result<()> {
        let mut table = self.lock();
        match table.sets.iter_mut().find( |es| es.id == *id) {
            Some(es) => {
                *es = ElementSet::from_entry( id.clone(), entry.clone());
                Ok(())
            }
            None => Err( storage_error!("no element set with id {}", id))
        }
    }

    async fn delete_by_id (&self, id: &ElementSetId)->Result<()> {
        let mut table = self.lock();
        let len = table.sets.len();
        table.sets.retain( |es| es.id != *id);
        if table.sets.len() < len { Ok(()) } else { Err( storage_error!("no element set with id {}", id)) }
    }
}

/// the REST API of the tracker device, with `base_url` being something like `http://192.168.4.1/api/tles`
///   - `GET <base>` and `GET <base>/<id>` to retrieve records
///   - `POST <base>` to create and `PUT <base>/<id>` to update records
///   - `DELETE <base>/<id>`
pub struct HttpElementStorage {
    client: Client,
    base_url: String,
}

impl HttpElementStorage {
    pub fn new (base_url: impl AsRef<str>)->Self {
        Self::with_client( Client::new(), base_url)
    }

    pub fn with_client (client: Client, base_url: impl AsRef<str>)->Self {
        let base_url = base_url.as_ref().trim().trim_end_matches('/').to_string();
        HttpElementStorage { client, base_url }
    }

    pub fn base_url (&self)->&str { &self.base_url }

    fn item_url (&self, id: &ElementSetId)->String {
        format!("{}/{}", self.base_url, id)
    }
}

#[async_trait]
impl ElementStorage for HttpElementStorage {
    async fn list_element_sets (&self)->Result<Vec<ElementSet>> {
        let records: Vec<ElementSetRecord> = get_json( &self.client, &self.base_url).await?;

        let mut sets = Vec::with_capacity( records.len());
        for rec in records {
            match ElementSet::try_from( rec) {
                Ok(es) => sets.push(es),
                Err(e) => warn!("ignoring invalid element set record: {e}")
            }
        }
        Ok(sets)
    }

    async fn get_by_id (&self, id: &ElementSetId)->Result<Option<ElementSet>> {
        match get_json::<ElementSetRecord>( &self.client, &self.item_url(id)).await {
            Ok(rec) => Ok( Some( ElementSet::try_from(rec)?)),
            Err(e) if e.is_not_found() => Ok(None),
            Err(e) => Err(e.into())
        }
    }

    async fn create (&self, entry: &ElementSetEntry)->Result<ElementSet> {
        let response = post_json( &self.client, &self.base_url, &ElementSetRecord::from(entry)).await?;

        // devices might or might not echo the created record
        if let Ok(rec) = serde_json::from_str::<ElementSetRecord>( &response) {
            if rec.id.is_some() {
                return ElementSet::try_from( rec)
            }
        }

        let key = merge_key( &entry.name);
        self.list_element_sets().await?.into_iter()
            .rev()
            .find( |es| es.merge_key() == key)
            .ok_or_else( || storage_error!("created element set '{}' not found", entry.name))
    }

    async fn update (&self, id: &ElementSetId, entry: &ElementSetEntry)->Result<()> {
        let mut rec = ElementSetRecord::from(entry);
        rec.id = Some(id.clone());
        put_json( &self.client, &self.item_url(id), &rec).await?;
        Ok(())
    }

    async fn delete_by_id (&self, id: &ElementSetId)->Result<()> {
        Ok( delete( &self.client, &self.item_url(id)).await? )
    }
}

/* #endregion storage backends */

/* #region table *****************************************************************************************/

/// a planned change of an existing set. `before` is the table row the change was computed from
#[derive(Debug,Clone,PartialEq)]
pub struct PlannedUpdate {
    pub before: ElementSet,
    pub updated: ElementSet,
}

impl PlannedUpdate {
    fn new (before: &ElementSet, line1: &str, line2: &str, last_updated: DateTime<Utc>)->Self {
        let mut updated = before.clone();
        updated.line1 = line1.to_string();
        updated.line2 = line2.to_string();
        updated.last_updated = last_updated;
        PlannedUpdate { before: before.clone(), updated }
    }
}

/// what [`ElementSetTable::plan_upsert`] decided to do with an entry
#[derive(Debug,Clone,PartialEq)]
pub enum UpsertPlan {
    Insert( ElementSetEntry ),
    Update( PlannedUpdate ),
    Unchanged,
}

/// the ordered (by insertion) set of known element sets together with the merge policy. This is
/// pure data, persistence is handled by [`ElementSetStore`]
#[derive(Debug,Clone,Default)]
pub struct ElementSetTable {
    sets: Vec<ElementSet>,
}

impl ElementSetTable {
    pub fn new (sets: Vec<ElementSet>)->Self { ElementSetTable { sets } }

    pub fn all (&self)->&[ElementSet] { &self.sets }
    pub fn len (&self)->usize { self.sets.len() }
    pub fn is_empty (&self)->bool { self.sets.is_empty() }

    pub fn get (&self, id: &ElementSetId)->Option<&ElementSet> {
        self.sets.iter().find( |es| es.id == *id)
    }

    /// case-insensitive name lookup. If there are several sets with the same key we use the first one
    pub fn find_by_name (&self, name: &str)->Option<&ElementSet> {
        let key = merge_key(name);
        self.sets.iter().find( |es| es.merge_key() == key)
    }

    /// replace an existing set with the same id in place, or append it
    pub fn insert (&mut self, es: ElementSet) {
        match self.sets.iter_mut().find( |e| e.id == es.id) {
            Some(e) => *e = es,
            None => self.sets.push(es)
        }
    }

    /// apply a planned update in place if the row still exists and still has the orbital lines it
    /// was planned from. Returns false if the row was removed or changed in the meantime
    pub fn apply_planned (&mut self, plan: PlannedUpdate)->bool {
        match self.sets.iter_mut().find( |e| e.id == plan.before.id) {
            Some(e) if e.has_lines( &plan.before.line1, &plan.before.line2) => {
                *e = plan.updated;
                true
            }
            _ => false
        }
    }

    pub fn remove (&mut self, id: &ElementSetId)->Option<ElementSet> {
        let idx = self.sets.iter().position( |es| es.id == *id)?;
        Some( self.sets.remove(idx))
    }

    pub fn plan_upsert (&self, entry: &ElementSetEntry)->UpsertPlan {
        match self.find_by_name( &entry.name) {
            None => UpsertPlan::Insert( entry.clone()),
            Some(es) => {
                if es.has_lines( &entry.line1, &entry.line2) {
                    UpsertPlan::Unchanged
                } else {
                    UpsertPlan::Update( PlannedUpdate::new( es, &entry.line1, &entry.line2, entry.last_updated))
                }
            }
        }
    }

    /// compute the complete update batch for a remote feed keyed by [`merge_key`]. Only sets we
    /// already have and whose orbital lines differ are included. Remote entries without a local
    /// counterpart are ignored
    pub fn plan_merge (&self, remote: &HashMap<String,RemoteElementSet>, now: DateTime<Utc>)->Vec<PlannedUpdate> {
        self.sets.iter().filter_map( |es| {
            let r = remote.get( &es.merge_key())?;
            if es.has_lines( &r.line1, &r.line2) {
                None
            } else {
                Some( PlannedUpdate::new( es, &r.line1, &r.line2, now))
            }
        }).collect()
    }
}

/* #endregion table */

/* #region store *****************************************************************************************/

/// outcome of [`ElementSetStore::merge_remote`]
#[derive(Debug,Default)]
pub struct MergeReport {
    pub updated: usize,
    /// updates that could not be persisted. Those sets keep their old data
    pub failed: Vec<(ElementSetId,OrbitalError)>,
}

struct StoreInner {
    storage: Box<dyn ElementStorage>,
    table: RwLock<ElementSetTable>,
    version: watch::Sender<u64>,
}

/// the single source of truth for what we track. Cloning is cheap, clones share the same table
#[derive(Clone)]
pub struct ElementSetStore {
    inner: Arc<StoreInner>
}

impl ElementSetStore {
    pub fn new (storage: impl ElementStorage)->Self {
        let (version,_) = watch::channel(0);
        let inner = StoreInner { storage: Box::new(storage), table: RwLock::new( ElementSetTable::default()), version };
        ElementSetStore { inner: Arc::new(inner) }
    }

    fn read_table (&self)->RwLockReadGuard<'_,ElementSetTable> {
        self.inner.table.read().unwrap_or_else( |e| e.into_inner())
    }

    fn write_table (&self)->RwLockWriteGuard<'_,ElementSetTable> {
        self.inner.table.write().unwrap_or_else( |e| e.into_inner())
    }

    fn bump_version (&self) {
        self.inner.version.send_modify( |v| *v += 1);
    }

    /// the current change version. This is incremented once per store mutation
    pub fn version (&self)->u64 {
        *self.inner.version.borrow()
    }

    pub fn subscribe (&self)->watch::Receiver<u64> {
        self.inner.version.subscribe()
    }

    /// (re-)populate the table from storage
    pub async fn load (&self)->Result<usize> {
        let sets = self.inner.storage.list_element_sets().await?;
        let len = sets.len();
        *self.write_table() = ElementSetTable::new(sets);
        self.bump_version();
        debug!("loaded {len} element sets");
        Ok(len)
    }

    /// snapshot of all sets in insertion order
    pub fn all (&self)->Vec<ElementSet> {
        self.read_table().all().to_vec()
    }

    pub fn len (&self)->usize { self.read_table().len() }
    pub fn is_empty (&self)->bool { self.read_table().is_empty() }

    pub fn find_by_name (&self, name: &str)->Option<ElementSet> {
        self.read_table().find_by_name(name).cloned()
    }

    /// retrieve a set from storage, updating our table if the stored data differs
    pub async fn get_by_id (&self, id: &ElementSetId)->Result<Option<ElementSet>> {
        let res = self.inner.storage.get_by_id(id).await?;

        if let Some(es) = &res {
            let changed = {
                let mut table = self.write_table();
                if table.get(id) != Some(es) {
                    table.insert( es.clone());
                    true
                } else { false }
            };
            if changed { self.bump_version() }
        }
        Ok(res)
    }

    pub async fn add (&self, entry: &ElementSetEntry)->Result<ElementSet> {
        let es = self.inner.storage.create( entry).await?;
        self.write_table().insert( es.clone());
        self.bump_version();
        info!("added {es}");
        Ok(es)
    }

    pub async fn update (&self, id: &ElementSetId, entry: &ElementSetEntry)->Result<ElementSet> {
        self.inner.storage.update( id, entry).await?;
        let es = ElementSet::from_entry( id.clone(), entry.clone());
        self.write_table().insert( es.clone());
        self.bump_version();
        Ok(es)
    }

    /// returns true if there was a set with this id in our table
    pub async fn remove_by_id (&self, id: &ElementSetId)->Result<bool> {
        self.inner.storage.delete_by_id( id).await?;
        let removed = self.write_table().remove( id).is_some();
        if removed {
            self.bump_version();
            info!("removed element set {id}");
        }
        Ok(removed)
    }

    /// insert `entry` if there is no set with the same case-insensitive name, otherwise replace
    /// the orbital lines and update time of the existing set if the lines differ. Returns true
    /// if anything changed
    pub async fn upsert_by_name (&self, entry: &ElementSetEntry)->Result<bool> {
        let plan = self.read_table().plan_upsert( entry);

        match plan {
            UpsertPlan::Insert(entry) => {
                self.add( &entry).await?;
                Ok(true)
            }
            UpsertPlan::Update(plan) => {
                self.inner.storage.update( &plan.updated.id, &plan.updated.to_entry()).await?;
                let name = plan.updated.name.clone();
                let applied = self.write_table().apply_planned( plan);
                if applied {
                    self.bump_version();
                } else {
                    debug!("{name} was changed or removed while storing, keeping the current table row");
                }
                Ok(true)
            }
            UpsertPlan::Unchanged => Ok(false)
        }
    }

    /// apply a remote feed to the sets we already have. The update batch is computed up front, then
    /// persisted set by set, and all successfully persisted updates are applied to the table in a
    /// single step so that readers never see a partially merged table. Sets that were removed or
    /// changed while the batch was persisted are left alone
    pub async fn merge_remote (&self, remote: &HashMap<String,RemoteElementSet>, now: DateTime<Utc>)->MergeReport {
        let batch = self.read_table().plan_merge( remote, now);
        let mut report = MergeReport::default();
        if batch.is_empty() {
            return report
        }

        let mut persisted = Vec::with_capacity( batch.len());
        for plan in batch {
            let res = self.inner.storage.update( &plan.updated.id, &plan.updated.to_entry()).await;
            match res {
                Ok(()) => persisted.push(plan),
                Err(e) => {
                    warn!("failed to store update for {}: {}", plan.updated.name, e);
                    report.failed.push( (plan.updated.id.clone(), e));
                }
            }
        }

        if !persisted.is_empty() {
            {
                let mut table = self.write_table();
                for plan in persisted {
                    let name = plan.updated.name.clone();
                    if table.apply_planned( plan) {
                        report.updated += 1;
                    } else {
                        debug!("{name} was changed or removed during sync, dropping its update");
                    }
                }
            }
            if report.updated > 0 {
                self.bump_version();
            }
        }

        report
    }
}

/* #endregion store */
