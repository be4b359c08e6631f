use mongodb::bson::{doc, oid::ObjectId, Bson, Document};

use crate::database::models::Playlist;
use crate::database::pipeline::{Lookup, Pipeline, Projection};
use crate::database::{DatabaseManager, Page, Pagination, Sort};

use super::{ensure_owner, owner_lookup, ServiceError, ServiceResult};

const DUPLICATE_PLAYLIST: &str = "The playlist already exists";

pub struct PlaylistService {
    db: DatabaseManager,
}

impl PlaylistService {
    pub fn new(db: DatabaseManager) -> Self {
        Self { db }
    }

    pub async fn create(
        &self,
        owner: ObjectId,
        name: &str,
        description: &str,
        videos: Vec<ObjectId>,
    ) -> ServiceResult<Playlist> {
        if !videos.is_empty() {
            let known = self
                .db
                .videos()
                .count(doc! { "_id": { "$in": videos.clone() } })
                .await?;
            let mut unique = videos.clone();
            unique.sort();
            unique.dedup();
            if known != unique.len() as u64 {
                return Err(ServiceError::not_found("Video not found"));
            }
        }

        Ok(self
            .db
            .playlists()
            .insert(Playlist::new(owner, name, description, videos), DUPLICATE_PLAYLIST)
            .await?)
    }

    pub async fn get(&self, playlist_id: ObjectId) -> ServiceResult<Playlist> {
        self.db
            .playlists()
            .find_by_id(playlist_id)
            .await?
            .ok_or_else(|| ServiceError::not_found("Playlist not found"))
    }

    /// Change name and/or description; at least one must be given
    pub async fn update(
        &self,
        playlist_id: ObjectId,
        actor: ObjectId,
        name: Option<&str>,
        description: Option<&str>,
    ) -> ServiceResult<Playlist> {
        let mut set = Document::new();
        if let Some(name) = name.map(str::trim).filter(|n| !n.is_empty()) {
            set.insert("name", name);
        }
        if let Some(description) = description.map(str::trim) {
            set.insert("description", description);
        }
        if set.is_empty() {
            return Err(ServiceError::BadRequest("Name or description is required".to_string()));
        }

        self.owned(playlist_id, actor).await?;
        self.update_owned(playlist_id, actor, doc! { "$set": set }).await
    }

    pub async fn delete(&self, playlist_id: ObjectId, actor: ObjectId) -> ServiceResult<()> {
        self.owned(playlist_id, actor).await?;
        self.db
            .playlists()
            .delete_one(doc! { "_id": playlist_id, "owner": actor })
            .await?
            .ok_or_else(|| ServiceError::not_found("Playlist not found"))?;
        Ok(())
    }

    pub async fn add_video(&self, playlist_id: ObjectId, video_id: ObjectId, actor: ObjectId) -> ServiceResult<Playlist> {
        self.owned(playlist_id, actor).await?;
        if !self.db.videos().exists(doc! { "_id": video_id }).await? {
            return Err(ServiceError::not_found("Video not found"));
        }
        self.update_owned(playlist_id, actor, doc! { "$addToSet": { "videos": video_id } })
            .await
    }

    pub async fn remove_video(
        &self,
        playlist_id: ObjectId,
        video_id: ObjectId,
        actor: ObjectId,
    ) -> ServiceResult<Playlist> {
        self.owned(playlist_id, actor).await?;
        self.update_owned(playlist_id, actor, doc! { "$pull": { "videos": video_id } })
            .await
    }

    /// Published videos of a playlist with their owners
    pub async fn videos(&self, playlist_id: ObjectId) -> ServiceResult<Vec<Bson>> {
        let row = self
            .db
            .playlists()
            .aggregate(playlist_videos_pipeline(playlist_id))
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| ServiceError::not_found("Playlist not found"))?;
        Ok(row.get_array("videos").cloned().unwrap_or_default())
    }

    pub async fn by_user(&self, user_id: ObjectId, page: &Page) -> ServiceResult<(Vec<Playlist>, Pagination)> {
        if !self.db.users().exists(doc! { "_id": user_id }).await? {
            return Err(ServiceError::not_found("User not found"));
        }
        let filter = doc! { "owner": user_id };
        let total = self.db.playlists().count(filter.clone()).await?;
        let playlists = self
            .db
            .playlists()
            .find_page(filter, &Sort::newest(), page)
            .await?;
        Ok((playlists, Pagination::new(total, page)))
    }

    async fn owned(&self, playlist_id: ObjectId, actor: ObjectId) -> ServiceResult<Playlist> {
        let playlist = self.get(playlist_id).await?;
        ensure_owner(playlist.owner, actor, "playlist")?;
        Ok(playlist)
    }

    async fn update_owned(&self, playlist_id: ObjectId, actor: ObjectId, update: Document) -> ServiceResult<Playlist> {
        self.db
            .playlists()
            .update_one(doc! { "_id": playlist_id, "owner": actor }, update, DUPLICATE_PLAYLIST)
            .await?
            .ok_or_else(|| ServiceError::not_found("Playlist not found"))
    }
}

pub fn playlist_videos_pipeline(playlist_id: ObjectId) -> Pipeline {
    let videos = Pipeline::new()
        .match_on(doc! { "isPublished": true })
        .lookup(owner_lookup("owner", "owner"))
        .first("owner");

    Pipeline::new()
        .match_on(doc! { "_id": playlist_id })
        .lookup(Lookup::new(DatabaseManager::VIDEOS, "videos", "_id", "videos").with_pipeline(videos))
        .project(Projection::include(&["name", "description", "owner", "videos"]))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn playlist_videos_filter_published_inside_join() {
        let playlist = ObjectId::new();
        let stages = playlist_videos_pipeline(playlist).into_stages();
        assert_eq!(stages[0], doc! { "$match": { "_id": playlist } });

        let lookup = stages[1].get_document("$lookup").unwrap();
        assert_eq!(lookup.get_str("from").unwrap(), "videos");
        assert_eq!(lookup.get_str("localField").unwrap(), "videos");
        assert_eq!(lookup.get_str("foreignField").unwrap(), "_id");

        let nested = lookup.get_array("pipeline").unwrap();
        assert_eq!(
            nested[0].as_document().unwrap(),
            &doc! { "$match": { "isPublished": true } }
        );
        assert_eq!(nested.len(), 3);
    }
}
