//! The profile update workflow
//!
//! 1. Log in with the configured handle and app password
//! 2. Fetch the current profile so its display name and description survive
//! 3. Pick a random avatar and upload it
//! 4. Upload the matching banner, if one exists
//! 5. Write the new profile record

use crate::assets::AssetLibrary;
use crate::bluesky::{BlueskyClient, ProfileRecord};
use crate::config::Config;
use crate::error::UpdateError;
use crate::types::UpdateOutcome;
use async_trait::async_trait;

/// Anything that can perform a profile update for the trigger handlers
#[async_trait]
pub trait Orchestrator: Send + Sync {
    async fn update_profile(&self) -> Result<UpdateOutcome, UpdateError>;
}

#[derive(Clone)]
struct Credentials {
    handle: String,
    app_password: String,
}

/// Updates the configured Bluesky account
pub struct ProfileUpdater {
    credentials: Option<Credentials>,
    client: BlueskyClient,
    assets: AssetLibrary,
}

impl ProfileUpdater {
    pub fn new(
        handle: Option<String>,
        app_password: Option<String>,
        client: BlueskyClient,
        assets: AssetLibrary,
    ) -> Self {
        let credentials = match (handle, app_password) {
            (Some(handle), Some(app_password)) => Some(Credentials {
                handle,
                app_password,
            }),
            _ => None,
        };

        ProfileUpdater {
            credentials,
            client,
            assets,
        }
    }

    pub fn from_config(config: &Config) -> Result<Self, UpdateError> {
        let client = BlueskyClient::new(&config.bluesky.service_url, config.bluesky.timeout)?;
        let assets = AssetLibrary::new(&config.assets.pfp_dir, &config.assets.banner_dir);

        Ok(Self::new(
            config.bluesky.handle.clone(),
            config.bluesky.app_password.clone(),
            client,
            assets,
        ))
    }
}

#[async_trait]
impl Orchestrator for ProfileUpdater {
    async fn update_profile(&self) -> Result<UpdateOutcome, UpdateError> {
        tracing::info!("Starting profile update");

        let Some(credentials) = &self.credentials else {
            tracing::error!("BLUESKY_HANDLE or BLUESKY_APP_PASSWORD is not set");
            return Err(UpdateError::Configuration);
        };

        tracing::info!("Logging in as {}", credentials.handle);
        let session = self
            .client
            .create_session(&credentials.handle, &credentials.app_password)
            .await?;
        tracing::info!("Logged in as {} ({})", session.handle, session.did);

        let profile = self.client.get_profile(&session, &session.did).await?;
        tracing::info!(
            display_name = profile.display_name.as_deref().unwrap_or(""),
            "Fetched current profile"
        );

        let pfp_file = self.assets.pick_avatar().await?;
        tracing::info!("Selected avatar {}", pfp_file);

        let avatar = self.assets.load_avatar(&pfp_file).await?;
        let avatar_blob = self
            .client
            .upload_blob(&session, avatar.bytes, avatar.mime_type)
            .await?;
        tracing::info!("Avatar uploaded");

        let banner_blob = match self.assets.load_banner(&pfp_file).await {
            Some(banner) => {
                let blob = self
                    .client
                    .upload_blob(&session, banner.bytes, banner.mime_type)
                    .await?;
                tracing::info!("Banner uploaded");
                Some(blob)
            }
            None => {
                tracing::info!("No matching banner for {}, skipping", pfp_file);
                None
            }
        };

        let record = ProfileRecord::new(profile, avatar_blob, banner_blob);
        self.client.put_profile(&session, &record).await?;

        tracing::info!("Profile updated with {}", pfp_file);
        Ok(UpdateOutcome::applied(pfp_file))
    }
}
