//! Catalog records as served by the upstream API
//!
//! Only the fields the service reasons about are typed; everything else is
//! kept in `extra` and forwarded untouched.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// `{ "data": ... }` envelope used by the upstream and by our responses
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Envelope<T> {
    pub data: T,
}

/// Generic `{ mal_id, type, name, url }` reference (genres, studios, ...)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NamedResource {
    pub mal_id: u32,
    pub name: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Anime {
    pub mal_id: u32,
    pub title: String,
    #[serde(default)]
    pub title_english: Option<String>,
    #[serde(default)]
    pub synopsis: Option<String>,
    #[serde(default)]
    pub score: Option<f64>,
    #[serde(default)]
    pub episodes: Option<u32>,
    #[serde(default)]
    pub year: Option<i32>,
    #[serde(default)]
    pub genres: Vec<NamedResource>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pagination {
    #[serde(default)]
    pub last_visible_page: u32,
    #[serde(default)]
    pub has_next_page: bool,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Paged list of anime (search, top, seasons, genres)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnimePage {
    pub data: Vec<Anime>,
    #[serde(default)]
    pub pagination: Option<Pagination>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CharacterRef {
    pub mal_id: u32,
    pub name: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnimeCharacter {
    pub character: CharacterRef,
    #[serde(default)]
    pub role: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecommendationEntry {
    pub mal_id: u32,
    pub title: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnimeRecommendation {
    pub entry: RecommendationEntry,
    #[serde(default)]
    pub votes: Option<u32>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}
