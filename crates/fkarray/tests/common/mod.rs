#![allow(dead_code)]

use fkarray::{
    ArrayAssociation, ArrayAssociationOptions, AssociationRegistry, KeyArrays, KeySequence, Model,
    Result, Row, Value,
};
use fkarray_memory::{MemoryStore, MemoryStoreConfig};
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq)]
pub struct Video {
    pub id: Option<i64>,
    pub name: String,
    pub title: String,
}

impl Model for Video {
    const TABLE_NAME: &'static str = "videos";
    const PRIMARY_KEY: &'static str = "id";

    fn columns() -> &'static [&'static str] {
        &["id", "name", "title"]
    }

    fn to_row(&self) -> Vec<(&'static str, Value)> {
        vec![
            ("id", self.id.into()),
            ("name", self.name.clone().into()),
            ("title", self.title.clone().into()),
        ]
    }

    fn from_row(row: &Row) -> Result<Self> {
        Ok(Self {
            id: row.get_named("id")?,
            name: row.get_named("name")?,
            title: row.get_named("title")?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Playlist {
    pub id: Option<i64>,
    pub name: String,
    pub video_ids: KeySequence,
}

impl Model for Playlist {
    const TABLE_NAME: &'static str = "playlists";
    const PRIMARY_KEY: &'static str = "id";

    fn columns() -> &'static [&'static str] {
        &["id", "name", "video_ids"]
    }

    fn to_row(&self) -> Vec<(&'static str, Value)> {
        vec![
            ("id", self.id.into()),
            ("name", self.name.clone().into()),
            ("video_ids", self.video_ids.clone().into()),
        ]
    }

    fn from_row(row: &Row) -> Result<Self> {
        Ok(Self {
            id: row.get_named("id")?,
            name: row.get_named("name")?,
            video_ids: row.get_named("video_ids")?,
        })
    }
}

impl KeyArrays for Playlist {
    fn key_array(&self, attribute: &str) -> Option<&KeySequence> {
        (attribute == "video_ids").then_some(&self.video_ids)
    }

    fn key_array_mut(&mut self, attribute: &str) -> Option<&mut KeySequence> {
        (attribute == "video_ids").then_some(&mut self.video_ids)
    }
}

pub fn video(id: i64, name: &str, title: &str) -> Video {
    Video {
        id: Some(id),
        name: name.to_string(),
        title: title.to_string(),
    }
}

pub fn return_of_harmony() -> Video {
    video(1, "return_of_harmony", "The Return of Harmony")
}

pub fn something_big() -> Video {
    video(2, "something_big", "Something Big")
}

pub fn escape_from_the_citadel() -> Video {
    video(3, "escape_from_the_citadel", "Escape from the Citadel")
}

pub fn food_chain() -> Video {
    video(4, "food_chain", "Food Chain")
}

pub fn playlist(id: i64, name: &str, keys: Vec<Option<i64>>) -> Playlist {
    Playlist {
        id: Some(id),
        name: name.to_string(),
        video_ids: keys.into(),
    }
}

/// Four videos and three playlists.
pub fn store() -> MemoryStore {
    let store = MemoryStore::with_config(MemoryStoreConfig::default().log_queries(true));
    for v in [
        return_of_harmony(),
        something_big(),
        escape_from_the_citadel(),
        food_chain(),
    ] {
        store.insert(&v).expect("insert video");
    }
    for p in [
        playlist(1, "adventure_time_season6", vec![Some(2), Some(3)]),
        playlist(2, "mlp_season2", vec![Some(1)]),
        playlist(3, "my_cool_list", vec![Some(1), Some(2)]),
    ] {
        store.insert(&p).expect("insert playlist");
    }
    store.clear_query_log();
    store
}

pub fn videos() -> Arc<ArrayAssociation<Playlist, Video>> {
    AssociationRegistry::new()
        .declare_collection::<Playlist, Video>("videos", ArrayAssociationOptions::new())
        .expect("declare videos")
}

pub fn find_playlist(store: &MemoryStore, id: i64) -> Playlist {
    store
        .find::<Playlist>(id)
        .expect("find playlist")
        .expect("playlist exists")
}

pub fn keys(ids: &[Option<i64>]) -> KeySequence {
    ids.to_vec().into()
}

pub fn names(playlists: &[Playlist]) -> Vec<&str> {
    playlists.iter().map(|p| p.name.as_str()).collect()
}
