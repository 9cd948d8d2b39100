use serde::Deserialize;

/// Default region for callable endpoints.
const DEFAULT_REGION: &str = "us-central1";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Neither FIREBASE_CONFIG nor GCLOUD_PROJECT is set")]
    MissingProject,

    #[error("FIREBASE_CONFIG is not valid JSON: {0}")]
    InvalidBlob(#[from] serde_json::Error),
}

/// The JSON blob the functions runtime exposes as `FIREBASE_CONFIG`.
#[derive(Debug, Deserialize)]
struct FirebaseConfigBlob {
    #[serde(rename = "projectId")]
    project_id: Option<String>,
    #[serde(rename = "databaseURL")]
    database_url: Option<String>,
}

/// Where and as whom the platform adapters connect.
///
/// Built once at startup and handed to every adapter; nothing reads the
/// environment after that.
#[derive(Debug, Clone)]
pub struct PlatformConfig {
    pub project_id: String,
    pub region: String,
    pub database_url: String,
    pub pubsub_url: String,
    pub identity_url: String,
    pub firestore_url: String,
    pub callable_url: String,
    /// Bearer token forwarded on every REST call, if set.
    pub access_token: Option<String>,
}

impl PlatformConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var            | Default                                         |
    /// |--------------------|-------------------------------------------------|
    /// | `FIREBASE_CONFIG`  | --  (JSON: `projectId`, `databaseURL`)          |
    /// | `GCLOUD_PROJECT`   | --  (used when the blob has no project)         |
    /// | `FUNCTIONS_REGION` | `us-central1`                                   |
    /// | `DATABASE_URL`     | blob `databaseURL` or `https://{project}.firebaseio.com` |
    /// | `PUBSUB_URL`       | `https://pubsub.googleapis.com`                 |
    /// | `IDENTITY_URL`     | `https://identitytoolkit.googleapis.com`        |
    /// | `FIRESTORE_URL`    | `https://firestore.googleapis.com`              |
    /// | `CALLABLE_URL`     | `https://{region}-{project}.cloudfunctions.net` |
    /// | `ACCESS_TOKEN`     | unset                                           |
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`from_env`](Self::from_env) but reading from `lookup`.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let blob = match lookup("FIREBASE_CONFIG") {
            Some(raw) if !raw.trim().is_empty() => {
                Some(serde_json::from_str::<FirebaseConfigBlob>(&raw)?)
            }
            _ => None,
        };

        let project_id = blob
            .as_ref()
            .and_then(|b| b.project_id.clone())
            .or_else(|| lookup("GCLOUD_PROJECT"))
            .filter(|p| !p.is_empty())
            .ok_or(ConfigError::MissingProject)?;

        let region = lookup("FUNCTIONS_REGION").unwrap_or_else(|| DEFAULT_REGION.into());

        let database_url = lookup("DATABASE_URL")
            .or_else(|| blob.as_ref().and_then(|b| b.database_url.clone()))
            .unwrap_or_else(|| format!("https://{project_id}.firebaseio.com"));

        let callable_url = lookup("CALLABLE_URL")
            .unwrap_or_else(|| format!("https://{region}-{project_id}.cloudfunctions.net"));

        Ok(Self {
            database_url: trim_base(database_url),
            pubsub_url: trim_base(
                lookup("PUBSUB_URL").unwrap_or_else(|| "https://pubsub.googleapis.com".into()),
            ),
            identity_url: trim_base(
                lookup("IDENTITY_URL")
                    .unwrap_or_else(|| "https://identitytoolkit.googleapis.com".into()),
            ),
            firestore_url: trim_base(
                lookup("FIRESTORE_URL").unwrap_or_else(|| "https://firestore.googleapis.com".into()),
            ),
            callable_url: trim_base(callable_url),
            access_token: lookup("ACCESS_TOKEN").filter(|t| !t.is_empty()),
            project_id,
            region,
        })
    }
}

fn trim_base(url: String) -> String {
    url.trim_end_matches('/').to_string()
}
