//! Repository Traits
//!
//! Interfaces for data persistence. Implementations are in the infra layer.

use kernel::id::UserId;

use crate::domain::value_objects::UploadKind;
use crate::error::MediaResult;

/// Storage for the avatar and banner slots of a user profile
#[trait_variant::make(ProfileImageRepository: Send)]
pub trait LocalProfileImageRepository {
    /// Replace the `kind` slot of `user_id` with `data_url`.
    ///
    /// Returns `false` when the user does not exist.
    async fn set_profile_image(
        &self,
        user_id: UserId,
        kind: UploadKind,
        data_url: &str,
    ) -> MediaResult<bool>;
}
