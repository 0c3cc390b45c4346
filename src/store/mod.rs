//! Optimistic-concurrency profile store
//!
//! Fetch-or-create plus versioned save for every profile kind. A save is a
//! conditional replace filtered on the version the caller fetched: the
//! first committer wins and everybody else gets [`WardenError::Conflict`]
//! back, with their mutation discarded. The store never retries or merges —
//! a conflicted caller must re-fetch and redecide.
//!
//! Out-of-process writers (the companion web service) go through the same
//! contract, which is why no in-process lock guards any profile.

use std::sync::Arc;
use tracing::debug;

use crate::db::schemas::{
    ApiKeyDoc, GuildProfileDoc, PointEntry, PointLogDoc, ProfileDoc, UserProfileDoc,
    API_KEY_COLLECTION, POINT_LOG_COLLECTION,
};
use crate::db::{InsertOutcome, ProfileDriver, SaveOutcome};
use crate::types::{Result, WardenError};

/// Profile CRUD over a [`ProfileDriver`].
#[derive(Clone)]
pub struct ProfileStore {
    driver: Arc<dyn ProfileDriver>,
}

impl ProfileStore {
    pub fn new(driver: Arc<dyn ProfileDriver>) -> Self {
        Self { driver }
    }

    /// Fetch a user profile, creating it at version 0 on a miss when
    /// `create_if_missing` is set.
    ///
    /// # Errors
    ///
    /// [`WardenError::NotFound`] on a miss without `create_if_missing`.
    pub async fn get_user(&self, id: &str, create_if_missing: bool) -> Result<UserProfileDoc> {
        self.fetch_or_create(id, create_if_missing, || UserProfileDoc::new(id))
            .await
    }

    /// Fetch a guild profile, creating it at version 0 on a miss when
    /// `create_if_missing` is set.
    pub async fn get_guild(&self, id: &str, create_if_missing: bool) -> Result<GuildProfileDoc> {
        self.fetch_or_create(id, create_if_missing, || GuildProfileDoc::new(id))
            .await
    }

    /// Fetch a point log by id. Point logs are never created implicitly.
    pub async fn get_point_log(&self, id: &str) -> Result<PointLogDoc> {
        self.fetch_required(id).await
    }

    /// Fetch an API key document by id.
    pub async fn get_api_key(&self, id: &str) -> Result<ApiKeyDoc> {
        self.fetch_required(id).await
    }

    /// Persist a mutated profile if nobody else saved it first.
    ///
    /// On success the in-memory version advances with the stored one, so
    /// the same copy can be mutated and saved again. On failure the
    /// in-memory copy is left exactly as fetched (version included) and
    /// the stored document is untouched.
    ///
    /// # Errors
    ///
    /// [`WardenError::Conflict`] when the stored version moved on;
    /// [`WardenError::NotFound`] when the document was never persisted.
    pub async fn save<T: ProfileDoc>(&self, profile: &mut T) -> Result<()> {
        let id = profile.id().to_string();
        let expected = profile.version();

        profile.metadata_mut().touch();
        profile.set_version(expected + 1);
        let doc = match bson::to_document(&*profile) {
            Ok(doc) => doc,
            Err(e) => {
                profile.set_version(expected);
                return Err(e.into());
            }
        };

        match self
            .driver
            .replace_versioned(T::COLLECTION, &id, expected, doc)
            .await
        {
            Ok(SaveOutcome::Saved) => {
                debug!(collection = T::COLLECTION, id = %id, version = expected + 1, "Saved");
                Ok(())
            }
            Ok(SaveOutcome::Conflict) => {
                profile.set_version(expected);
                Err(WardenError::Conflict {
                    collection: T::COLLECTION,
                    id,
                })
            }
            Ok(SaveOutcome::Missing) => {
                profile.set_version(expected);
                Err(WardenError::NotFound(format!("{}/{id}", T::COLLECTION)))
            }
            Err(e) => {
                profile.set_version(expected);
                Err(e)
            }
        }
    }

    /// Create and persist a point log.
    pub async fn create_point_log(
        &self,
        guild_id: &str,
        created_by: &str,
        entries: Vec<PointEntry>,
        note: Option<String>,
    ) -> Result<PointLogDoc> {
        let log = PointLogDoc::new(guild_id, created_by, entries, note);
        self.insert_new(&log).await?;
        Ok(log)
    }

    /// Point logs referencing a guild, looked up on demand. The guild
    /// profile does not own them.
    pub async fn point_logs_for_guild(&self, guild_id: &str) -> Result<Vec<PointLogDoc>> {
        let docs = self
            .driver
            .find_many(POINT_LOG_COLLECTION, bson::doc! { "guild_id": guild_id })
            .await?;
        docs.into_iter()
            .map(|doc| Ok(bson::from_document(doc)?))
            .collect()
    }

    /// Generate, persist, and return a new API key together with its
    /// plaintext. The plaintext is not stored and cannot be retrieved
    /// again.
    pub async fn create_api_key(
        &self,
        guild_id: &str,
        name: &str,
        scopes: Vec<String>,
    ) -> Result<(ApiKeyDoc, String)> {
        let (key, plaintext) = ApiKeyDoc::generate(guild_id, name, scopes);
        self.insert_new(&key).await?;
        Ok((key, plaintext))
    }

    /// Match a presented plaintext against the guild's enabled keys.
    pub async fn verify_api_key(
        &self,
        guild_id: &str,
        presented: &str,
    ) -> Result<Option<ApiKeyDoc>> {
        let docs = self
            .driver
            .find_many(API_KEY_COLLECTION, bson::doc! { "guild_id": guild_id })
            .await?;

        for doc in docs {
            let key: ApiKeyDoc = bson::from_document(doc)?;
            if key.matches(presented) {
                return Ok(Some(key));
            }
        }
        Ok(None)
    }

    /// Overwrite a member's points with `amount` (full replace, not a
    /// delta) and persist through the guild profile's versioned save. The
    /// whole nested member collection commits as one atomic unit.
    ///
    /// # Errors
    ///
    /// Propagates [`WardenError::Conflict`] when another writer saved the
    /// guild first; the caller re-fetches and redecides.
    pub async fn set_points(
        &self,
        guild_id: &str,
        user_ref: &str,
        amount: i64,
        actor: &str,
    ) -> Result<GuildProfileDoc> {
        let mut guild = self.get_guild(guild_id, true).await?;
        guild.member_mut(user_ref).points = amount;
        self.save(&mut guild).await?;

        debug!(guild = %guild_id, user = %user_ref, amount, actor = %actor, "Points set");
        Ok(guild)
    }

    async fn fetch_required<T: ProfileDoc>(&self, id: &str) -> Result<T> {
        let doc = self
            .driver
            .find_one(T::COLLECTION, id)
            .await?
            .ok_or_else(|| WardenError::NotFound(format!("{}/{id}", T::COLLECTION)))?;
        Ok(bson::from_document(doc)?)
    }

    async fn fetch_or_create<T, F>(&self, id: &str, create_if_missing: bool, make: F) -> Result<T>
    where
        T: ProfileDoc,
        F: FnOnce() -> T + Send,
    {
        if let Some(doc) = self.driver.find_one(T::COLLECTION, id).await? {
            return Ok(bson::from_document(doc)?);
        }
        if !create_if_missing {
            return Err(WardenError::NotFound(format!("{}/{id}", T::COLLECTION)));
        }

        let fresh = make();
        let doc = bson::to_document(&fresh)?;
        match self.driver.insert_one(T::COLLECTION, id, doc).await? {
            InsertOutcome::Inserted => Ok(fresh),
            InsertOutcome::Duplicate => {
                // Lost the creation race; the stored document wins.
                let doc = self
                    .driver
                    .find_one(T::COLLECTION, id)
                    .await?
                    .ok_or_else(|| WardenError::NotFound(format!("{}/{id}", T::COLLECTION)))?;
                Ok(bson::from_document(doc)?)
            }
        }
    }

    async fn insert_new<T: ProfileDoc>(&self, profile: &T) -> Result<()> {
        let doc = bson::to_document(profile)?;
        match self
            .driver
            .insert_one(T::COLLECTION, profile.id(), doc)
            .await?
        {
            InsertOutcome::Inserted => Ok(()),
            InsertOutcome::Duplicate => Err(WardenError::Database(format!(
                "generated id collided in {}",
                T::COLLECTION
            ))),
        }
    }
}
