//! In-process tables for every persisted entity.
//!
//! The tables live behind one async mutex. A mutation is applied in memory,
//! then the whole snapshot is flushed to the [`KeyValueStore`]; when the
//! flush fails the tables are put back as they were, so callers never see a
//! half-applied write.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::{broadcast, Mutex};

use crate::database::storage::{KeyValueStore, CANDIDATURES_KEY, STORE_KEY};
use crate::error::{Error, Result};
use crate::models::{
    candidature::{Candidature, CandidatureFields, CandidatureStatus},
    notification::Notification,
    status_history::StatusHistoryEntry,
    template::{Template, TemplateCategory, TemplateFields},
};
use crate::services::{status_tracker, template_engine};
use crate::utils::time;

const CANDIDATURE_SEED: i64 = 1;
const TEMPLATE_SEED: i64 = 4;
const HISTORY_SEED: i64 = 1;
const NOTIFICATION_SEED: i64 = 1;

pub trait Record {
    fn id(&self) -> i64;
    fn created_at(&self) -> DateTime<Utc>;
}

impl Record for Candidature {
    fn id(&self) -> i64 {
        self.id
    }
    fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

impl Record for Template {
    fn id(&self) -> i64 {
        self.id
    }
    fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

impl Record for StatusHistoryEntry {
    fn id(&self) -> i64 {
        self.id
    }
    fn created_at(&self) -> DateTime<Utc> {
        self.changed_at
    }
}

impl Record for Notification {
    fn id(&self) -> i64 {
        self.id
    }
    fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

/// Rows keyed by id plus the id the next insert will get.
#[derive(Debug, Clone)]
pub struct Table<T> {
    rows: BTreeMap<i64, T>,
    next_id: i64,
}

impl<T: Record + Clone> Table<T> {
    pub fn with_seed(seed: i64) -> Self {
        Self {
            rows: BTreeMap::new(),
            next_id: seed,
        }
    }

    /// Never hands out an id already present in `rows`, whatever `next_id` says.
    pub fn from_rows(rows: Vec<T>, next_id: i64) -> Self {
        let rows: BTreeMap<i64, T> = rows.into_iter().map(|row| (row.id(), row)).collect();
        let floor = rows.keys().next_back().map_or(next_id, |max| max + 1);
        Self {
            rows,
            next_id: next_id.max(floor),
        }
    }

    pub fn insert_with(&mut self, build: impl FnOnce(i64) -> T) -> i64 {
        let id = self.next_id;
        self.next_id += 1;
        self.rows.insert(id, build(id));
        id
    }

    pub fn get(&self, id: i64) -> Option<&T> {
        self.rows.get(&id)
    }

    pub fn get_mut(&mut self, id: i64) -> Option<&mut T> {
        self.rows.get_mut(&id)
    }

    pub fn remove(&mut self, id: i64) -> Option<T> {
        self.rows.remove(&id)
    }

    /// Removes every row matching `pred`, returning how many went away.
    pub fn remove_where(&mut self, pred: impl Fn(&T) -> bool) -> usize {
        let before = self.rows.len();
        self.rows.retain(|_, row| !pred(row));
        before - self.rows.len()
    }

    pub fn rows(&self) -> impl Iterator<Item = &T> {
        self.rows.values()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn next_id(&self) -> i64 {
        self.next_id
    }

    pub fn newest_first(&self) -> Vec<T> {
        let mut rows: Vec<T> = self.rows.values().cloned().collect();
        rows.sort_by(|a, b| {
            b.created_at()
                .cmp(&a.created_at())
                .then_with(|| b.id().cmp(&a.id()))
        });
        rows
    }

    fn to_vec(&self) -> Vec<T> {
        self.rows.values().cloned().collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Collection {
    Candidatures,
    Templates,
    StatusHistory,
    Notifications,
}

/// Published after every committed mutation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreEvent {
    pub collection: Collection,
}

#[derive(Debug, Clone)]
struct Tables {
    candidatures: Table<Candidature>,
    templates: Table<Template>,
    status_history: Table<StatusHistoryEntry>,
    notifications: Table<Notification>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct NextIds {
    candidatures: i64,
    templates: i64,
    status_history: i64,
    notifications: i64,
}

impl Default for NextIds {
    fn default() -> Self {
        Self {
            candidatures: CANDIDATURE_SEED,
            templates: TEMPLATE_SEED,
            status_history: HISTORY_SEED,
            notifications: NOTIFICATION_SEED,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct Snapshot {
    #[serde(default)]
    candidatures: Vec<Candidature>,
    #[serde(default = "default_templates")]
    templates: Vec<Template>,
    #[serde(default)]
    status_history: Vec<StatusHistoryEntry>,
    #[serde(default)]
    notifications: Vec<Notification>,
    #[serde(default)]
    next_ids: NextIds,
}

impl Tables {
    fn fresh() -> Self {
        Self::from_snapshot(Snapshot {
            candidatures: Vec::new(),
            templates: default_templates(),
            status_history: Vec::new(),
            notifications: Vec::new(),
            next_ids: NextIds::default(),
        })
    }

    fn from_snapshot(snapshot: Snapshot) -> Self {
        Self {
            candidatures: Table::from_rows(snapshot.candidatures, snapshot.next_ids.candidatures),
            templates: Table::from_rows(snapshot.templates, snapshot.next_ids.templates),
            status_history: Table::from_rows(
                snapshot.status_history,
                snapshot.next_ids.status_history,
            ),
            notifications: Table::from_rows(
                snapshot.notifications,
                snapshot.next_ids.notifications,
            ),
        }
    }

    fn to_snapshot(&self) -> Snapshot {
        Snapshot {
            candidatures: self.candidatures.to_vec(),
            templates: self.templates.to_vec(),
            status_history: self.status_history.to_vec(),
            notifications: self.notifications.to_vec(),
            next_ids: NextIds {
                candidatures: self.candidatures.next_id(),
                templates: self.templates.next_id(),
                status_history: self.status_history.next_id(),
                notifications: self.notifications.next_id(),
            },
        }
    }
}

/// Result of replacing a candidature's fields.
#[derive(Debug, Clone, PartialEq)]
pub struct CandidatureUpdate {
    pub affected: u64,
    /// Present only when the status actually changed.
    pub transition: Option<StatusHistoryEntry>,
}

impl CandidatureUpdate {
    fn none() -> Self {
        Self {
            affected: 0,
            transition: None,
        }
    }
}

#[derive(Clone)]
pub struct RecordStore {
    tables: Arc<Mutex<Tables>>,
    storage: Arc<dyn KeyValueStore>,
    changes: broadcast::Sender<StoreEvent>,
}

impl RecordStore {
    /// Loads the persisted snapshot, or starts from the default templates.
    pub async fn open(storage: Arc<dyn KeyValueStore>) -> Result<Self> {
        let tables = match storage.get(STORE_KEY).await? {
            Some(value) => match serde_json::from_value::<Snapshot>(value) {
                Ok(snapshot) => Tables::from_snapshot(snapshot),
                Err(e) => {
                    tracing::error!(error = %e, "Stored tracker data is unreadable, starting empty");
                    Tables::fresh()
                }
            },
            None => Tables::fresh(),
        };

        tracing::info!(
            candidatures = tables.candidatures.len(),
            templates = tables.templates.len(),
            "Record store loaded"
        );

        let (changes, _) = broadcast::channel(64);
        Ok(Self {
            tables: Arc::new(Mutex::new(tables)),
            storage,
            changes,
        })
    }

    pub fn subscribe(&self) -> broadcast::Receiver<StoreEvent> {
        self.changes.subscribe()
    }

    /// Writes the candidature cache, then the snapshot. The snapshot is the
    /// only key read back on open, so it goes last.
    async fn flush(&self, tables: &Tables) -> Result<()> {
        let snapshot = serde_json::to_value(tables.to_snapshot())?;
        let candidatures = serde_json::to_value(tables.candidatures.newest_first())?;
        self.storage.set(CANDIDATURES_KEY, candidatures).await?;
        self.storage.set(STORE_KEY, snapshot).await?;
        Ok(())
    }

    /// Runs `mutate` against the tables and persists the outcome.
    ///
    /// `mutate` returns `None` when it touched nothing; nothing is written
    /// and no event is published in that case.
    async fn commit<R>(
        &self,
        collection: Collection,
        mutate: impl FnOnce(&mut Tables) -> Option<R>,
    ) -> Result<Option<R>> {
        let mut tables = self.tables.lock().await;
        let before = tables.clone();

        let Some(out) = mutate(&mut tables) else {
            return Ok(None);
        };

        if let Err(e) = self.flush(&tables).await {
            tracing::error!(error = %e, ?collection, "Failed to persist record store, change rolled back");
            if let Err(restore) = self.flush(&before).await {
                tracing::error!(error = %restore, ?collection, "Failed to restore persisted record store");
            }
            *tables = before;
            return Err(Error::Storage(e.to_string()));
        }
        drop(tables);

        let _ = self.changes.send(StoreEvent { collection });
        Ok(Some(out))
    }

    // Candidatures

    /// Inserts the candidature together with its first history entry and,
    /// when it starts out as sent, its follow-up notification.
    pub async fn insert_candidature(&self, fields: CandidatureFields) -> Result<i64> {
        let id = self
            .commit(Collection::Candidatures, |tables| {
                let now = time::now();
                let status = fields.status.unwrap_or_default();
                let submitted_on = fields.submitted_on;
                let id = tables.candidatures.insert_with(|id| Candidature {
                    id,
                    company: fields.company,
                    contact_name: fields.contact_name,
                    contact_email: fields.contact_email,
                    contact_phone: fields.contact_phone,
                    job_title: fields.job_title,
                    submitted_on,
                    status,
                    notes: fields.notes,
                    last_email_at: None,
                    created_at: now,
                    updated_at: now,
                });
                status_tracker::record_transition(
                    &mut tables.status_history,
                    id,
                    None,
                    status,
                    now,
                );
                if status == CandidatureStatus::Sent {
                    status_tracker::schedule_follow_up(
                        &mut tables.notifications,
                        id,
                        submitted_on,
                        now,
                    );
                }
                Some(id)
            })
            .await?;

        id.ok_or_else(|| Error::Internal("candidature insert produced no row".into()))
    }

    pub async fn list_candidatures(&self) -> Vec<Candidature> {
        self.tables.lock().await.candidatures.newest_first()
    }

    pub async fn candidature(&self, id: i64) -> Option<Candidature> {
        self.tables.lock().await.candidatures.get(id).cloned()
    }

    pub async fn candidature_status(&self, id: i64) -> Option<CandidatureStatus> {
        self.tables
            .lock()
            .await
            .candidatures
            .get(id)
            .map(|c| c.status)
    }

    /// Replaces the candidature's fields and, in the same commit, appends a
    /// history entry if the status changed.
    pub async fn update_candidature(
        &self,
        id: i64,
        fields: CandidatureFields,
    ) -> Result<CandidatureUpdate> {
        let update = self
            .commit(Collection::Candidatures, |tables| {
                apply_candidature_update(tables, id, fields, None)
            })
            .await?;
        Ok(update.unwrap_or_else(CandidatureUpdate::none))
    }

    /// Marks the candidature as sent after an email went out to its contact.
    pub async fn record_email_sent(
        &self,
        id: i64,
        at: DateTime<Utc>,
    ) -> Result<CandidatureUpdate> {
        let update = self
            .commit(Collection::Candidatures, |tables| {
                let mut fields = tables.candidatures.get(id)?.fields();
                fields.status = Some(CandidatureStatus::Sent);
                apply_candidature_update(tables, id, fields, Some(at))
            })
            .await?;
        Ok(update.unwrap_or_else(CandidatureUpdate::none))
    }

    /// Deletes the candidature along with its history and notifications.
    pub async fn delete_candidature(&self, id: i64) -> Result<u64> {
        let removed = self
            .commit(Collection::Candidatures, |tables| {
                tables.candidatures.remove(id)?;
                let history = tables
                    .status_history
                    .remove_where(|entry| entry.candidature_id == id);
                let notifications = tables
                    .notifications
                    .remove_where(|n| n.candidature_id == id);
                tracing::debug!(
                    candidature_id = id,
                    history,
                    notifications,
                    "Cascaded candidature delete"
                );
                Some(1)
            })
            .await?;
        Ok(removed.unwrap_or(0))
    }

    /// Status changes of one candidature, oldest first.
    pub async fn history_for(&self, candidature_id: i64) -> Vec<StatusHistoryEntry> {
        let tables = self.tables.lock().await;
        let mut entries: Vec<StatusHistoryEntry> = tables
            .status_history
            .rows()
            .filter(|entry| entry.candidature_id == candidature_id)
            .cloned()
            .collect();
        entries.sort_by(|a, b| a.changed_at.cmp(&b.changed_at).then(a.id.cmp(&b.id)));
        entries
    }

    pub async fn list_notifications(&self) -> Vec<Notification> {
        self.tables.lock().await.notifications.newest_first()
    }

    // Templates

    pub async fn insert_template(&self, fields: TemplateFields) -> Result<i64> {
        let id = self
            .commit(Collection::Templates, |tables| {
                let now = time::now();
                let variables = template_engine::template_variables(&fields.subject, &fields.body);
                Some(tables.templates.insert_with(|id| Template {
                    id,
                    name: fields.name,
                    subject: fields.subject,
                    body: fields.body,
                    variables,
                    category: fields.category,
                    created_at: now,
                    updated_at: now,
                }))
            })
            .await?;

        id.ok_or_else(|| Error::Internal("template insert produced no row".into()))
    }

    pub async fn list_templates(&self) -> Vec<Template> {
        self.tables.lock().await.templates.newest_first()
    }

    pub async fn template(&self, id: i64) -> Option<Template> {
        self.tables.lock().await.templates.get(id).cloned()
    }

    pub async fn update_template(&self, id: i64, fields: TemplateFields) -> Result<u64> {
        let updated = self
            .commit(Collection::Templates, |tables| {
                let template = tables.templates.get_mut(id)?;
                template.variables =
                    template_engine::template_variables(&fields.subject, &fields.body);
                template.name = fields.name;
                template.subject = fields.subject;
                template.body = fields.body;
                template.category = fields.category;
                template.updated_at = time::now();
                Some(1)
            })
            .await?;
        Ok(updated.unwrap_or(0))
    }

    pub async fn delete_template(&self, id: i64) -> Result<u64> {
        let removed = self
            .commit(Collection::Templates, |tables| {
                tables.templates.remove(id).map(|_| 1)
            })
            .await?;
        Ok(removed.unwrap_or(0))
    }
}

fn apply_candidature_update(
    tables: &mut Tables,
    id: i64,
    fields: CandidatureFields,
    emailed_at: Option<DateTime<Utc>>,
) -> Option<CandidatureUpdate> {
    let now = time::now();
    let candidature = tables.candidatures.get_mut(id)?;
    let previous = candidature.status;
    candidature.apply(fields, now);
    if emailed_at.is_some() {
        candidature.last_email_at = emailed_at;
    }
    let next = candidature.status;
    let submitted_on = candidature.submitted_on;

    let transition =
        status_tracker::record_transition(&mut tables.status_history, id, Some(previous), next, now);
    if transition.is_some() && next == CandidatureStatus::Sent {
        status_tracker::schedule_follow_up(&mut tables.notifications, id, submitted_on, now);
    }

    Some(CandidatureUpdate {
        affected: 1,
        transition,
    })
}

fn default_templates() -> Vec<Template> {
    let now = time::now();
    let seeds = [
        (
            1,
            "Candidature spontanée",
            "Candidature pour le poste de {{poste}}",
            "Bonjour {{contact_nom}},\n\n\
             Je souhaite vous proposer ma candidature au sein de {{entreprise}} \
             pour le poste de {{poste}}.\n\n\
             Mon CV est joint à ce message et je me tiens à votre disposition \
             pour un entretien.\n\n\
             Cordialement,\n{{prenom}} {{nom}}",
            TemplateCategory::Application,
        ),
        (
            2,
            "Relance",
            "Relance - Candidature {{poste}}",
            "Bonjour {{contact_nom}},\n\n\
             Je reviens vers vous au sujet de ma candidature pour le poste de \
             {{poste}} chez {{entreprise}}, restée sans réponse.\n\n\
             Je reste disponible pour tout complément d'information.\n\n\
             Cordialement,\n{{prenom}} {{nom}}",
            TemplateCategory::FollowUp,
        ),
        (
            3,
            "Remerciement",
            "Merci pour notre entretien",
            "Bonjour {{contact_nom}},\n\n\
             Merci pour le temps accordé lors de notre entretien pour le poste \
             de {{poste}}. Cet échange a renforcé mon envie de rejoindre \
             {{entreprise}}.\n\n\
             Cordialement,\n{{prenom}} {{nom}}",
            TemplateCategory::ThankYou,
        ),
    ];

    seeds
        .into_iter()
        .map(|(id, name, subject, body, category)| Template {
            id,
            name: name.to_string(),
            subject: subject.to_string(),
            body: body.to_string(),
            variables: template_engine::template_variables(subject, body),
            category,
            created_at: now,
            updated_at: now,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::storage::{MemoryStorage, MockKeyValueStore};
    use chrono::NaiveDate;

    fn fields(status: CandidatureStatus) -> CandidatureFields {
        CandidatureFields {
            company: "Acme".into(),
            contact_name: "Jo".into(),
            contact_email: "jo@acme.test".into(),
            contact_phone: None,
            job_title: "Engineer".into(),
            submitted_on: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            status: Some(status),
            notes: None,
        }
    }

    async fn open_memory() -> (RecordStore, MemoryStorage) {
        let storage = MemoryStorage::new();
        let store = RecordStore::open(Arc::new(storage.clone())).await.unwrap();
        (store, storage)
    }

    #[tokio::test]
    async fn fresh_store_seeds_default_templates() {
        let (store, _) = open_memory().await;
        let templates = store.list_templates().await;
        assert_eq!(templates.len(), 3);
        for template in &templates {
            assert_eq!(
                template.variables,
                template_engine::template_variables(&template.subject, &template.body)
            );
        }

        let id = store
            .insert_template(TemplateFields {
                name: "Custom".into(),
                subject: "Hi".into(),
                body: "Body".into(),
                category: TemplateCategory::Application,
            })
            .await
            .unwrap();
        assert_eq!(id, 4);
    }

    #[tokio::test]
    async fn ids_are_sequential_per_collection() {
        let (store, _) = open_memory().await;
        let a = store.insert_candidature(fields(CandidatureStatus::Draft)).await.unwrap();
        let b = store.insert_candidature(fields(CandidatureStatus::Draft)).await.unwrap();
        let c = store.insert_candidature(fields(CandidatureStatus::Sent)).await.unwrap();
        assert_eq!((a, b, c), (1, 2, 3));

        store.delete_candidature(c).await.unwrap();
        let d = store.insert_candidature(fields(CandidatureStatus::Draft)).await.unwrap();
        assert_eq!(d, 4);
    }

    #[tokio::test]
    async fn list_is_newest_first() {
        let (store, _) = open_memory().await;
        for _ in 0..3 {
            store.insert_candidature(fields(CandidatureStatus::Draft)).await.unwrap();
        }
        let ids: Vec<i64> = store.list_candidatures().await.iter().map(|c| c.id).collect();
        assert_eq!(ids, vec![3, 2, 1]);
    }

    #[tokio::test]
    async fn insert_records_initial_history_and_follow_up() {
        let (store, _) = open_memory().await;
        let id = store.insert_candidature(fields(CandidatureStatus::Sent)).await.unwrap();

        let history = store.history_for(id).await;
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].previous_status, None);
        assert_eq!(history[0].new_status, CandidatureStatus::Sent);

        let notifications = store.list_notifications().await;
        assert_eq!(notifications.len(), 1);
        assert_eq!(
            notifications[0].scheduled_for,
            NaiveDate::from_ymd_opt(2024, 1, 8).unwrap()
        );
    }

    #[tokio::test]
    async fn update_appends_history_only_on_status_change() {
        let (store, _) = open_memory().await;
        let id = store.insert_candidature(fields(CandidatureStatus::Draft)).await.unwrap();

        let mut same = fields(CandidatureStatus::Draft);
        same.notes = Some("called them".into());
        let update = store.update_candidature(id, same).await.unwrap();
        assert_eq!(update.affected, 1);
        assert!(update.transition.is_none());
        assert_eq!(store.history_for(id).await.len(), 1);

        let update = store
            .update_candidature(id, fields(CandidatureStatus::Rejected))
            .await
            .unwrap();
        let entry = update.transition.expect("status changed");
        assert_eq!(entry.previous_status, Some(CandidatureStatus::Draft));
        assert_eq!(entry.new_status, CandidatureStatus::Rejected);
        assert_eq!(store.history_for(id).await.len(), 2);
        assert!(store.list_notifications().await.is_empty());
    }

    #[tokio::test]
    async fn update_without_status_keeps_the_stored_one() {
        let (store, _) = open_memory().await;
        let id = store.insert_candidature(fields(CandidatureStatus::Draft)).await.unwrap();
        store
            .update_candidature(id, fields(CandidatureStatus::Sent))
            .await
            .unwrap();

        let mut edit = fields(CandidatureStatus::Draft);
        edit.status = None;
        edit.notes = Some("no answer yet".into());
        let update = store.update_candidature(id, edit).await.unwrap();

        assert_eq!(update.affected, 1);
        assert!(update.transition.is_none());
        assert_eq!(
            store.candidature_status(id).await,
            Some(CandidatureStatus::Sent)
        );
        assert_eq!(store.history_for(id).await.len(), 2);
    }

    #[tokio::test]
    async fn update_and_delete_missing_affect_nothing() {
        let (store, storage) = open_memory().await;
        let update = store
            .update_candidature(42, fields(CandidatureStatus::Sent))
            .await
            .unwrap();
        assert_eq!(update, CandidatureUpdate::none());
        assert_eq!(store.delete_candidature(42).await.unwrap(), 0);
        assert_eq!(store.delete_template(42).await.unwrap(), 0);
        assert!(storage.get(STORE_KEY).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn delete_cascades_to_history_and_notifications() {
        let (store, _) = open_memory().await;
        let keep = store.insert_candidature(fields(CandidatureStatus::Sent)).await.unwrap();
        let gone = store.insert_candidature(fields(CandidatureStatus::Sent)).await.unwrap();

        assert_eq!(store.delete_candidature(gone).await.unwrap(), 1);
        assert!(store.candidature(gone).await.is_none());
        assert!(store.history_for(gone).await.is_empty());
        let notifications = store.list_notifications().await;
        assert_eq!(notifications.len(), 1);
        assert_eq!(notifications[0].candidature_id, keep);
    }

    #[tokio::test]
    async fn record_email_sent_moves_to_sent_and_stamps() {
        let (store, _) = open_memory().await;
        let id = store.insert_candidature(fields(CandidatureStatus::Draft)).await.unwrap();
        let at = time::now();

        let update = store.record_email_sent(id, at).await.unwrap();
        assert_eq!(update.affected, 1);
        assert_eq!(
            update.transition.map(|t| t.new_status),
            Some(CandidatureStatus::Sent)
        );
        let candidature = store.candidature(id).await.unwrap();
        assert_eq!(candidature.status, CandidatureStatus::Sent);
        assert_eq!(candidature.last_email_at, Some(at));

        // Already sent: no second transition, no second follow-up.
        let update = store.record_email_sent(id, at).await.unwrap();
        assert!(update.transition.is_none());
        assert_eq!(store.list_notifications().await.len(), 1);
    }

    #[tokio::test]
    async fn reopen_restores_rows_and_sequences() {
        let (store, storage) = open_memory().await;
        store.insert_candidature(fields(CandidatureStatus::Draft)).await.unwrap();
        let second = store.insert_candidature(fields(CandidatureStatus::Draft)).await.unwrap();
        store.delete_candidature(second).await.unwrap();

        let cached = storage.get(CANDIDATURES_KEY).await.unwrap().unwrap();
        assert_eq!(cached.as_array().map(Vec::len), Some(1));

        let reopened = RecordStore::open(Arc::new(storage)).await.unwrap();
        assert_eq!(reopened.list_candidatures().await.len(), 1);
        assert_eq!(reopened.list_templates().await.len(), 3);
        let next = reopened
            .insert_candidature(fields(CandidatureStatus::Draft))
            .await
            .unwrap();
        assert_eq!(next, 3);
    }

    #[tokio::test]
    async fn unreadable_snapshot_starts_fresh() {
        let storage = MemoryStorage::new();
        storage
            .set(STORE_KEY, serde_json::json!({"candidatures": "nope"}))
            .await
            .unwrap();
        let store = RecordStore::open(Arc::new(storage)).await.unwrap();
        assert!(store.list_candidatures().await.is_empty());
        assert_eq!(store.list_templates().await.len(), 3);
    }

    #[tokio::test]
    async fn failed_flush_rolls_back() {
        let mut storage = MockKeyValueStore::new();
        storage.expect_get().returning(|_| Ok(None));
        storage
            .expect_set()
            .returning(|_, _| Err(Error::Storage("disk full".into())));

        let store = RecordStore::open(Arc::new(storage)).await.unwrap();
        let err = store
            .insert_candidature(fields(CandidatureStatus::Sent))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Storage(_)));
        assert!(store.list_candidatures().await.is_empty());
        assert!(store.list_notifications().await.is_empty());
    }

    /// Fails every write to one key and passes everything else through.
    struct FailingKey {
        inner: MemoryStorage,
        key: &'static str,
    }

    #[async_trait::async_trait]
    impl KeyValueStore for FailingKey {
        async fn get(&self, key: &str) -> Result<Option<serde_json::Value>> {
            self.inner.get(key).await
        }

        async fn set(&self, key: &str, value: serde_json::Value) -> Result<()> {
            if key == self.key {
                return Err(Error::Storage(format!("cannot write {}", key)));
            }
            self.inner.set(key, value).await
        }
    }

    #[tokio::test]
    async fn failed_cache_write_leaves_nothing_persisted() {
        let inner = MemoryStorage::new();
        let store = RecordStore::open(Arc::new(FailingKey {
            inner: inner.clone(),
            key: CANDIDATURES_KEY,
        }))
        .await
        .unwrap();

        assert!(store
            .insert_candidature(fields(CandidatureStatus::Draft))
            .await
            .is_err());
        assert!(store.list_candidatures().await.is_empty());

        let reopened = RecordStore::open(Arc::new(inner)).await.unwrap();
        assert!(reopened.list_candidatures().await.is_empty());
        assert!(reopened.history_for(1).await.is_empty());
    }

    #[tokio::test]
    async fn failed_snapshot_write_restores_cache() {
        let inner = MemoryStorage::new();
        let store = RecordStore::open(Arc::new(FailingKey {
            inner: inner.clone(),
            key: STORE_KEY,
        }))
        .await
        .unwrap();

        assert!(store
            .insert_candidature(fields(CandidatureStatus::Draft))
            .await
            .is_err());

        let cached = inner.get(CANDIDATURES_KEY).await.unwrap().unwrap();
        assert_eq!(cached.as_array().map(Vec::len), Some(0));
        assert!(inner.get(STORE_KEY).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn committed_writes_are_published() {
        let (store, _) = open_memory().await;
        let mut events = store.subscribe();
        store.insert_candidature(fields(CandidatureStatus::Draft)).await.unwrap();
        store.delete_template(1).await.unwrap();

        assert_eq!(
            events.recv().await.unwrap().collection,
            Collection::Candidatures
        );
        assert_eq!(events.recv().await.unwrap().collection, Collection::Templates);
    }

    #[test]
    fn table_from_rows_skips_taken_ids() {
        let now = time::now();
        let entry = |id| StatusHistoryEntry {
            id,
            candidature_id: 1,
            previous_status: None,
            new_status: CandidatureStatus::Draft,
            changed_at: now,
        };
        let table = Table::from_rows(vec![entry(1), entry(7)], 2);
        assert_eq!(table.next_id(), 8);
        assert_eq!(table.len(), 2);

        let table: Table<StatusHistoryEntry> = Table::from_rows(Vec::new(), 5);
        assert_eq!(table.next_id(), 5);
        assert!(table.is_empty());
    }
}
