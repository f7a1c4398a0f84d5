//! redb-based printer profile store
//!
//! Profiles are kept as JSON in the published schema. A sequence table
//! gives the stable store order used by resolution, and a meta table
//! holds the process-wide last-used pointer.

use redb::{
    Database, ReadableDatabase, ReadableTable, ReadableTableMetadata, Table, TableDefinition,
};
use shared::util::now_millis;
use shared::{PrinterProfile, TransportType};
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, instrument};

/// Profiles table: key = profile id, value = JSON
const PROFILES_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("printer_profiles");

/// Store order: seq -> profile id
const PROFILE_ORDER_TABLE: TableDefinition<u64, &str> = TableDefinition::new("profile_order");

/// Reverse index: profile id -> seq
const PROFILE_SEQ_TABLE: TableDefinition<&str, u64> = TableDefinition::new("profile_seq");

/// Store-wide values
const META_TABLE: TableDefinition<&str, &str> = TableDefinition::new("store_meta");

/// Seed profiles: id -> ()
const SEED_TABLE: TableDefinition<&str, ()> = TableDefinition::new("seed_profiles");

const LAST_USED_KEY: &str = "last_used_profile_id";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] redb::DatabaseError),

    #[error("Transaction error: {0}")]
    Transaction(#[from] redb::TransactionError),

    #[error("Table error: {0}")]
    Table(#[from] redb::TableError),

    #[error("Storage error: {0}")]
    Storage(#[from] redb::StorageError),

    #[error("Commit error: {0}")]
    Commit(#[from] redb::CommitError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Printer profile not found: {0}")]
    NotFound(String),

    #[error("Default printer profile cannot be deleted: {0}")]
    SeedProfileProtected(String),

    #[error("Invalid printer profile: {0}")]
    InvalidProfile(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Printer profile store
#[derive(Clone)]
pub struct ProfileStore {
    db: Arc<Database>,
}

impl ProfileStore {
    /// Open or create the database, seeding it when empty
    pub fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        let db = Database::create(path)?;
        Self::init(db)
    }

    /// In-memory database
    pub fn open_in_memory() -> StoreResult<Self> {
        let db = Database::builder().create_with_backend(redb::backends::InMemoryBackend::new())?;
        Self::init(db)
    }

    fn init(db: Database) -> StoreResult<Self> {
        let write_txn = db.begin_write()?;
        {
            let mut profiles = write_txn.open_table(PROFILES_TABLE)?;
            let mut order = write_txn.open_table(PROFILE_ORDER_TABLE)?;
            let mut seq = write_txn.open_table(PROFILE_SEQ_TABLE)?;
            let _ = write_txn.open_table(META_TABLE)?;
            let mut seeds = write_txn.open_table(SEED_TABLE)?;

            if profiles.is_empty()? {
                for transport_type in TransportType::CORE {
                    let profile = PrinterProfile::seed(transport_type);
                    put(&mut profiles, &profile)?;
                    append_order(&mut order, &mut seq, &profile.id)?;
                    seeds.insert(profile.id.as_str(), ())?;
                    info!(profile_id = %profile.id, transport = %transport_type, "Seeded default printer profile");
                }
            }
        }
        write_txn.commit()?;

        Ok(Self { db: Arc::new(db) })
    }

    // ========== Queries ==========

    /// All profiles in store order
    pub fn get_all(&self) -> StoreResult<Vec<PrinterProfile>> {
        let read_txn = self.db.begin_read()?;
        let order = read_txn.open_table(PROFILE_ORDER_TABLE)?;
        let profiles = read_txn.open_table(PROFILES_TABLE)?;

        let mut result = Vec::new();
        for entry in order.iter()? {
            let (_, id) = entry?;
            if let Some(guard) = profiles.get(id.value())? {
                result.push(serde_json::from_slice(guard.value())?);
            }
        }
        Ok(result)
    }

    pub fn get_by_type(&self, transport_type: TransportType) -> StoreResult<Vec<PrinterProfile>> {
        Ok(self
            .get_all()?
            .into_iter()
            .filter(|p| p.transport_type == transport_type)
            .collect())
    }

    /// Enabled default profile of a transport type
    pub fn get_default(&self, transport_type: TransportType) -> StoreResult<Option<PrinterProfile>> {
        Ok(self
            .get_by_type(transport_type)?
            .into_iter()
            .find(|p| p.is_default && p.enabled))
    }

    pub fn get(&self, id: &str) -> StoreResult<Option<PrinterProfile>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(PROFILES_TABLE)?;

        match table.get(id)? {
            Some(guard) => Ok(Some(serde_json::from_slice(guard.value())?)),
            None => Ok(None),
        }
    }

    /// Id held by the last-used pointer (may dangle)
    pub fn last_used_id(&self) -> StoreResult<Option<String>> {
        let read_txn = self.db.begin_read()?;
        let meta = read_txn.open_table(META_TABLE)?;
        Ok(meta.get(LAST_USED_KEY)?.map(|g| g.value().to_string()))
    }

    /// Profile the last-used pointer refers to
    pub fn get_last_used(&self) -> StoreResult<Option<PrinterProfile>> {
        match self.last_used_id()? {
            Some(id) => self.get(&id),
            None => Ok(None),
        }
    }

    pub fn is_seed(&self, id: &str) -> StoreResult<bool> {
        let read_txn = self.db.begin_read()?;
        let seeds = read_txn.open_table(SEED_TABLE)?;
        Ok(seeds.get(id)?.is_some())
    }

    // ========== Mutations ==========

    /// Insert or update a profile
    ///
    /// `lastUsedAt` keeps its stored value unless `mark_used` is set, in
    /// which case it is stamped and the last-used pointer moves here. A
    /// default profile clears the default flag of same-type siblings.
    #[instrument(skip(self, profile), fields(profile_id = %profile.id, transport = %profile.transport_type))]
    pub fn save(&self, profile: &PrinterProfile, mark_used: bool) -> StoreResult<PrinterProfile> {
        profile.validate().map_err(StoreError::InvalidProfile)?;
        let mut profile = profile.clone();

        let write_txn = self.db.begin_write()?;
        {
            let mut profiles = write_txn.open_table(PROFILES_TABLE)?;
            let mut order = write_txn.open_table(PROFILE_ORDER_TABLE)?;
            let mut seq = write_txn.open_table(PROFILE_SEQ_TABLE)?;
            let mut meta = write_txn.open_table(META_TABLE)?;

            let existing = load(&profiles, &profile.id)?;
            if mark_used {
                profile.last_used_at = Some(now_millis());
                meta.insert(LAST_USED_KEY, profile.id.as_str())?;
            } else if let Some(existing) = &existing {
                profile.last_used_at = existing.last_used_at;
            }

            if profile.is_default {
                clear_sibling_defaults(&mut profiles, &profile)?;
            }
            put(&mut profiles, &profile)?;
            if existing.is_none() {
                append_order(&mut order, &mut seq, &profile.id)?;
            }
        }
        write_txn.commit()?;

        info!("Printer profile saved");
        Ok(profile)
    }

    /// Delete a profile
    ///
    /// Seed profiles and default profiles of core transports are
    /// protected. Deleting the last-used profile clears the pointer.
    #[instrument(skip(self))]
    pub fn delete(&self, id: &str) -> StoreResult<()> {
        let write_txn = self.db.begin_write()?;
        {
            let mut profiles = write_txn.open_table(PROFILES_TABLE)?;
            let mut order = write_txn.open_table(PROFILE_ORDER_TABLE)?;
            let mut seq = write_txn.open_table(PROFILE_SEQ_TABLE)?;
            let mut meta = write_txn.open_table(META_TABLE)?;
            let seeds = write_txn.open_table(SEED_TABLE)?;

            let profile = load(&profiles, id)?.ok_or_else(|| StoreError::NotFound(id.to_string()))?;
            if seeds.get(id)?.is_some()
                || (profile.is_default && profile.transport_type.is_core())
            {
                return Err(StoreError::SeedProfileProtected(id.to_string()));
            }

            profiles.remove(id)?;
            let position = seq.remove(id)?.map(|g| g.value());
            if let Some(position) = position {
                order.remove(position)?;
            }

            let points_here = meta.get(LAST_USED_KEY)?.is_some_and(|g| g.value() == id);
            if points_here {
                meta.remove(LAST_USED_KEY)?;
            }
        }
        write_txn.commit()?;

        info!("Printer profile deleted");
        Ok(())
    }

    /// Make a profile the default of its transport type
    #[instrument(skip(self))]
    pub fn set_default(&self, id: &str) -> StoreResult<PrinterProfile> {
        let write_txn = self.db.begin_write()?;
        let profile = {
            let mut profiles = write_txn.open_table(PROFILES_TABLE)?;
            let mut profile =
                load(&profiles, id)?.ok_or_else(|| StoreError::NotFound(id.to_string()))?;
            profile.is_default = true;
            clear_sibling_defaults(&mut profiles, &profile)?;
            put(&mut profiles, &profile)?;
            profile
        };
        write_txn.commit()?;
        Ok(profile)
    }

    /// Stamp `lastUsedAt` and move the last-used pointer
    #[instrument(skip(self))]
    pub fn set_last_used(&self, id: &str) -> StoreResult<PrinterProfile> {
        let write_txn = self.db.begin_write()?;
        let profile = {
            let mut profiles = write_txn.open_table(PROFILES_TABLE)?;
            let mut meta = write_txn.open_table(META_TABLE)?;
            let mut profile =
                load(&profiles, id)?.ok_or_else(|| StoreError::NotFound(id.to_string()))?;
            profile.last_used_at = Some(now_millis());
            put(&mut profiles, &profile)?;
            meta.insert(LAST_USED_KEY, id)?;
            profile
        };
        write_txn.commit()?;
        Ok(profile)
    }
}

fn load(
    table: &Table<'_, &'static str, &'static [u8]>,
    id: &str,
) -> StoreResult<Option<PrinterProfile>> {
    match table.get(id)? {
        Some(guard) => Ok(Some(serde_json::from_slice(guard.value())?)),
        None => Ok(None),
    }
}

fn put(table: &mut Table<'_, &'static str, &'static [u8]>, profile: &PrinterProfile) -> StoreResult<()> {
    let value = serde_json::to_vec(profile)?;
    table.insert(profile.id.as_str(), value.as_slice())?;
    Ok(())
}

fn append_order(
    order: &mut Table<'_, u64, &'static str>,
    seq: &mut Table<'_, &'static str, u64>,
    id: &str,
) -> StoreResult<()> {
    let next = order.last()?.map(|(k, _)| k.value() + 1).unwrap_or(0);
    order.insert(next, id)?;
    seq.insert(id, next)?;
    Ok(())
}

fn clear_sibling_defaults(
    table: &mut Table<'_, &'static str, &'static [u8]>,
    profile: &PrinterProfile,
) -> StoreResult<()> {
    let mut siblings = Vec::new();
    for entry in table.iter()? {
        let (_, value) = entry?;
        let other: PrinterProfile = serde_json::from_slice(value.value())?;
        if other.id != profile.id
            && other.transport_type == profile.transport_type
            && other.is_default
        {
            siblings.push(other);
        }
    }
    for mut other in siblings {
        other.is_default = false;
        put(table, &other)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::ConnectionParams;

    #[test]
    fn test_seeds_core_transports_in_order() {
        let store = ProfileStore::open_in_memory().unwrap();
        let all = store.get_all().unwrap();
        let types: Vec<_> = all.iter().map(|p| p.transport_type).collect();
        assert_eq!(types, TransportType::CORE.to_vec());
        for p in &all {
            assert!(p.enabled && p.is_default);
            assert_eq!(p.paper_width_dots, 576);
            assert_eq!(p.line_spacing_units, 30);
            assert_eq!((p.left_margin_dots, p.right_margin_dots), (0, 0));
            assert!(store.is_seed(&p.id).unwrap());
        }
    }

    #[test]
    fn test_save_preserves_last_used_unless_marked() {
        let store = ProfileStore::open_in_memory().unwrap();
        let lan = PrinterProfile::new(TransportType::Lan, "Bar")
            .with_params(ConnectionParams::new().with("ip", "10.0.0.5"));
        let saved = store.save(&lan, true).unwrap();
        let stamp = saved.last_used_at;
        assert!(stamp.is_some());
        assert_eq!(store.last_used_id().unwrap().as_deref(), Some(lan.id.as_str()));

        let mut edited = saved.clone();
        edited.display_name = "Bar 2".into();
        edited.last_used_at = None;
        let saved = store.save(&edited, false).unwrap();
        assert_eq!(saved.last_used_at, stamp);
        assert_eq!(store.get(&lan.id).unwrap().unwrap().display_name, "Bar 2");
    }

    #[test]
    fn test_new_profiles_append_to_store_order() {
        let store = ProfileStore::open_in_memory().unwrap();
        let a = PrinterProfile::new(TransportType::Usb, "A");
        let b = PrinterProfile::new(TransportType::Bluetooth, "B");
        store.save(&a, false).unwrap();
        store.save(&b, false).unwrap();
        store.save(&a, false).unwrap();
        let ids: Vec<_> = store.get_all().unwrap().into_iter().map(|p| p.id).collect();
        assert_eq!(ids.len(), 5);
        assert_eq!(ids[3], a.id);
        assert_eq!(ids[4], b.id);
    }

    #[test]
    fn test_single_default_per_type() {
        let store = ProfileStore::open_in_memory().unwrap();
        let usb2 = PrinterProfile::new(TransportType::Usb, "Back office").with_default(true);
        store.save(&usb2, false).unwrap();

        let defaults: Vec<_> = store
            .get_by_type(TransportType::Usb)
            .unwrap()
            .into_iter()
            .filter(|p| p.is_default)
            .collect();
        assert_eq!(defaults.len(), 1);
        assert_eq!(defaults[0].id, usb2.id);

        let seed_usb = store.get_all().unwrap()[1].clone();
        store.set_default(&seed_usb.id).unwrap();
        assert_eq!(
            store.get_default(TransportType::Usb).unwrap().unwrap().id,
            seed_usb.id
        );
        assert!(!store.get(&usb2.id).unwrap().unwrap().is_default);
        // other types untouched
        assert!(store.get_default(TransportType::Lan).unwrap().is_some());
    }

    #[test]
    fn test_validation_rejected() {
        let store = ProfileStore::open_in_memory().unwrap();
        let bad = PrinterProfile::new(TransportType::Lan, "bad").with_paper_width(100);
        assert!(matches!(
            store.save(&bad, false),
            Err(StoreError::InvalidProfile(_))
        ));
    }

    #[test]
    fn test_delete_rules() {
        let store = ProfileStore::open_in_memory().unwrap();
        let seed = store.get_default(TransportType::Bluetooth).unwrap().unwrap();
        assert!(matches!(
            store.delete(&seed.id),
            Err(StoreError::SeedProfileProtected(_))
        ));

        // a seed stays protected after losing its default flag
        let lan2 = PrinterProfile::new(TransportType::Lan, "Patio").with_default(true);
        store.save(&lan2, false).unwrap();
        let lan_seed = store.get_all().unwrap()[2].clone();
        assert!(!lan_seed.is_default);
        assert!(matches!(
            store.delete(&lan_seed.id),
            Err(StoreError::SeedProfileProtected(_))
        ));
        // a default core profile is protected too
        assert!(matches!(
            store.delete(&lan2.id),
            Err(StoreError::SeedProfileProtected(_))
        ));

        let extra = PrinterProfile::new(TransportType::VendorSdkA, "Epson");
        store.save(&extra, false).unwrap();
        store.set_last_used(&extra.id).unwrap();
        store.delete(&extra.id).unwrap();
        assert!(store.get(&extra.id).unwrap().is_none());
        assert!(store.last_used_id().unwrap().is_none());
        assert_eq!(store.get_all().unwrap().len(), 4);

        assert!(matches!(store.delete("missing"), Err(StoreError::NotFound(_))));
    }

    #[test]
    fn test_set_last_used() {
        let store = ProfileStore::open_in_memory().unwrap();
        assert!(store.get_last_used().unwrap().is_none());
        let usb = store.get_default(TransportType::Usb).unwrap().unwrap();
        let stamped = store.set_last_used(&usb.id).unwrap();
        assert!(stamped.last_used_at.is_some());
        assert_eq!(store.get_last_used().unwrap().unwrap().id, usb.id);
        assert!(matches!(
            store.set_last_used("nope"),
            Err(StoreError::NotFound(_))
        ));
    }
}
