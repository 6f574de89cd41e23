//! In-memory profile store, used when no database is configured

use dashmap::DashMap;
use kernel::id::UserId;

use crate::domain::repository::ProfileImageRepository;
use crate::domain::value_objects::UploadKind;
use crate::error::MediaResult;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProfileImages {
    pub image: Option<String>,
    pub banner: Option<String>,
}

/// Profiles keyed by user. Unknown users are rejected unless
/// `auto_register` is on.
#[derive(Debug, Default)]
pub struct InMemoryProfileRepository {
    profiles: DashMap<UserId, ProfileImages>,
    auto_register: bool,
}

impl InMemoryProfileRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Accept any user id, creating the profile on first upload.
    pub fn auto_registering() -> Self {
        Self {
            profiles: DashMap::new(),
            auto_register: true,
        }
    }

    pub fn insert_user(&self, user_id: UserId) {
        self.profiles.entry(user_id).or_default();
    }

    pub fn profile(&self, user_id: &UserId) -> Option<ProfileImages> {
        self.profiles.get(user_id).map(|p| p.clone())
    }
}

impl ProfileImageRepository for InMemoryProfileRepository {
    async fn set_profile_image(
        &self,
        user_id: UserId,
        kind: UploadKind,
        data_url: &str,
    ) -> MediaResult<bool> {
        let mut profile = match self.profiles.get_mut(&user_id) {
            Some(profile) => profile,
            None if self.auto_register => self.profiles.entry(user_id).or_default(),
            None => return Ok(false),
        };
        let slot = match kind {
            UploadKind::Avatar => &mut profile.image,
            UploadKind::Banner => &mut profile.banner,
        };
        *slot = Some(data_url.to_string());
        Ok(true)
    }
}
