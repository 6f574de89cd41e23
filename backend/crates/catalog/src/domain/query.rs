//! Query value objects
//!
//! Validated request parameters with their upstream query string and the
//! cache key each one is memoized under.

use serde::Deserialize;

use crate::error::{CatalogError, CatalogResult};

/// Upstream page size ceiling
pub const MAX_PAGE_SIZE: u32 = 25;
pub const DEFAULT_PAGE_SIZE: u32 = 25;

/// Longest accepted free-text search
pub const MAX_QUERY_LEN: usize = 100;

fn default_page() -> u32 {
    1
}

fn default_limit() -> u32 {
    DEFAULT_PAGE_SIZE
}

/// `?page=&limit=`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct PageQuery {
    #[serde(default = "default_page")]
    pub page: u32,
    #[serde(default = "default_limit")]
    pub limit: u32,
}

impl Default for PageQuery {
    fn default() -> Self {
        Self {
            page: default_page(),
            limit: default_limit(),
        }
    }
}

impl PageQuery {
    pub fn validate(self) -> CatalogResult<Self> {
        if self.page == 0 {
            return Err(CatalogError::InvalidQuery("page must be at least 1".into()));
        }
        if self.limit == 0 || self.limit > MAX_PAGE_SIZE {
            return Err(CatalogError::InvalidQuery(format!(
                "limit must be between 1 and {MAX_PAGE_SIZE}"
            )));
        }
        Ok(self)
    }
}

/// `GET /anime/search` parameters
///
/// Every field is optional; unset fields are not forwarded upstream.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct SearchQuery {
    pub q: Option<String>,
    pub page: Option<u32>,
    pub limit: Option<u32>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub status: Option<String>,
    pub rating: Option<String>,
    pub genres: Option<String>,
    pub order_by: Option<String>,
    pub sort: Option<String>,
    pub min_score: Option<f64>,
    pub sfw: Option<bool>,
}

impl SearchQuery {
    pub fn validate(mut self) -> CatalogResult<Self> {
        if let Some(q) = self.q.as_mut() {
            *q = q.trim().to_string();
            if q.chars().count() > MAX_QUERY_LEN {
                return Err(CatalogError::InvalidQuery(format!(
                    "q must be at most {MAX_QUERY_LEN} characters"
                )));
            }
        }
        if self.q.as_deref() == Some("") {
            self.q = None;
        }
        PageQuery {
            page: self.page.unwrap_or(1),
            limit: self.limit.unwrap_or(DEFAULT_PAGE_SIZE),
        }
        .validate()?;
        if let Some(genres) = &self.genres {
            parse_genre_ids(genres)?;
        }
        if let Some(sort) = &self.sort {
            if sort != "asc" && sort != "desc" {
                return Err(CatalogError::InvalidQuery("sort must be asc or desc".into()));
            }
        }
        Ok(self)
    }

    /// Set parameters in a fixed order, as sent upstream.
    pub fn params(&self) -> Vec<(&'static str, String)> {
        let mut params = Vec::new();
        let mut push = |key: &'static str, value: Option<String>| {
            if let Some(value) = value {
                params.push((key, value));
            }
        };
        push("q", self.q.clone());
        push("page", self.page.map(|v| v.to_string()));
        push("limit", self.limit.map(|v| v.to_string()));
        push("type", self.kind.clone());
        push("status", self.status.clone());
        push("rating", self.rating.clone());
        push("genres", self.genres.clone());
        push("order_by", self.order_by.clone());
        push("sort", self.sort.clone());
        push("min_score", self.min_score.map(|v| v.to_string()));
        push("sfw", self.sfw.map(|v| v.to_string()));
        params
    }

    /// `search_<json>` over the canonical parameter list, values lowercased.
    ///
    /// JSON keeps `&` and `=` inside a value from reading as a separator.
    pub fn cache_key(&self) -> String {
        let canonical: Vec<(&str, String)> = self
            .params()
            .into_iter()
            .map(|(k, v)| (k, v.to_lowercase()))
            .collect();
        let encoded = serde_json::to_string(&canonical).unwrap_or_default();
        format!("search_{encoded}")
    }
}

/// `GET /anime/genres` parameters
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct GenreQuery {
    /// Comma-separated genre ids
    pub ids: String,
    #[serde(default = "default_page")]
    pub page: u32,
    #[serde(rename = "type", default = "default_genre_type")]
    pub kind: String,
}

fn default_genre_type() -> String {
    "tv".to_string()
}

impl GenreQuery {
    /// Normalized `(ids, page, type)`
    pub fn validate(&self) -> CatalogResult<(Vec<u32>, u32, String)> {
        let ids = parse_genre_ids(&self.ids)?;
        if ids.is_empty() {
            return Err(CatalogError::InvalidQuery("ids must not be empty".into()));
        }
        if self.page == 0 {
            return Err(CatalogError::InvalidQuery("page must be at least 1".into()));
        }
        Ok((ids, self.page, self.kind.trim().to_lowercase()))
    }
}

fn parse_genre_ids(raw: &str) -> CatalogResult<Vec<u32>> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            s.parse::<u32>()
                .map_err(|_| CatalogError::InvalidQuery(format!("invalid genre id {s:?}")))
        })
        .collect()
}

/// Cache keys for every memoized upstream call
pub mod keys {
    pub fn anime(id: u32) -> String {
        format!("anime_{id}")
    }

    pub fn characters(id: u32) -> String {
        format!("characters_{id}")
    }

    pub fn recommendations(id: u32) -> String {
        format!("recommendations_{id}")
    }

    pub fn top_anime(page: u32, limit: u32) -> String {
        format!("top_anime_{page}_{limit}")
    }

    pub fn top_rated(page: u32, limit: u32) -> String {
        format!("top_rated_{page}_{limit}")
    }

    pub fn current_season(page: u32) -> String {
        format!("current_season_{page}")
    }

    pub fn upcoming(page: u32) -> String {
        format!("upcoming_{page}")
    }

    pub fn genres(ids: &[u32], page: u32, kind: &str) -> String {
        let ids = ids
            .iter()
            .map(u32::to_string)
            .collect::<Vec<_>>()
            .join(",");
        format!("genres_{ids}_{page}_{kind}")
    }

    /// Keyed by the first 100 characters of the source text
    pub fn translation(text: &str) -> String {
        let prefix: String = text.chars().take(100).collect();
        format!("translation_{prefix}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_query_bounds() {
        assert!(PageQuery::default().validate().is_ok());
        assert!(PageQuery { page: 0, limit: 10 }.validate().is_err());
        assert!(PageQuery { page: 1, limit: 26 }.validate().is_err());
        assert!(PageQuery { page: 1, limit: 0 }.validate().is_err());
    }

    #[test]
    fn test_search_params_and_key() {
        let query = SearchQuery {
            q: Some("  Naruto ".into()),
            page: Some(2),
            kind: Some("tv".into()),
            ..Default::default()
        }
        .validate()
        .unwrap();

        assert_eq!(
            query.params(),
            vec![
                ("q", "Naruto".to_string()),
                ("page", "2".to_string()),
                ("type", "tv".to_string()),
            ]
        );
        assert_eq!(
            query.cache_key(),
            r#"search_[["q","naruto"],["page","2"],["type","tv"]]"#
        );
    }

    #[test]
    fn test_separators_in_text_do_not_collide() {
        let smuggled = SearchQuery {
            q: Some("x&page=2".into()),
            ..Default::default()
        }
        .validate()
        .unwrap();
        let paged = SearchQuery {
            q: Some("x".into()),
            page: Some(2),
            ..Default::default()
        }
        .validate()
        .unwrap();

        assert_ne!(smuggled.params(), paged.params());
        assert_ne!(smuggled.cache_key(), paged.cache_key());
    }

    #[test]
    fn test_search_rejects_bad_input() {
        let long = SearchQuery {
            q: Some("x".repeat(101)),
            ..Default::default()
        };
        assert!(long.validate().is_err());

        let sort = SearchQuery {
            sort: Some("sideways".into()),
            ..Default::default()
        };
        assert!(sort.validate().is_err());

        let genres = SearchQuery {
            genres: Some("1,abc".into()),
            ..Default::default()
        };
        assert!(genres.validate().is_err());
    }

    #[test]
    fn test_blank_search_text_is_dropped() {
        let query = SearchQuery {
            q: Some("   ".into()),
            ..Default::default()
        }
        .validate()
        .unwrap();
        assert_eq!(query.q, None);
        assert_eq!(query.cache_key(), "search_[]");
    }

    #[test]
    fn test_genre_query() {
        let query = GenreQuery {
            ids: "1, 4,,22".into(),
            page: 1,
            kind: "TV".into(),
        };
        let (ids, page, kind) = query.validate().unwrap();
        assert_eq!(ids, vec![1, 4, 22]);
        assert_eq!(keys::genres(&ids, page, &kind), "genres_1,4,22_1_tv");

        let empty = GenreQuery {
            ids: " , ".into(),
            page: 1,
            kind: "tv".into(),
        };
        assert!(empty.validate().is_err());
    }

    #[test]
    fn test_translation_key_uses_prefix() {
        let long = "a".repeat(250);
        assert_eq!(keys::translation(&long).len(), "translation_".len() + 100);
        assert_eq!(keys::translation("Hola"), "translation_Hola");
    }
}
