// src/store/gcs.rs
use anyhow::{Context, Result};
use async_trait::async_trait;
use google_cloud_storage::client::{Client, ClientConfig};
use google_cloud_storage::http::objects::delete::DeleteObjectRequest;
use google_cloud_storage::http::objects::download::Range;
use google_cloud_storage::http::objects::get::GetObjectRequest;
use google_cloud_storage::http::objects::upload::{Media, UploadObjectRequest, UploadType};
use google_cloud_storage::http::Error as GcsError;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, info, instrument};

use super::{RemoteFile, RemoteStore, XLSX_CONTENT_TYPE};

/// Google Cloud Storage bucket, with an optional folder prefix.
///
/// Credentials come from Application Default Credentials
/// (`GOOGLE_APPLICATION_CREDENTIALS` or the gcloud ADC file). A client is
/// created per call and dropped when the call returns.
#[derive(Debug, Clone)]
pub struct GcsStore {
    bucket: String,
    prefix: String,
}

impl GcsStore {
    pub fn new(bucket: impl Into<String>, folder: Option<&str>) -> Self {
        let prefix = folder.unwrap_or("").to_string();
        let prefix = if prefix.is_empty() || prefix.ends_with('/') {
            prefix
        } else {
            format!("{}/", prefix)
        };
        Self {
            bucket: bucket.into(),
            prefix,
        }
    }

    fn object_name(&self, name: &str) -> String {
        format!("{}{}", self.prefix, name)
    }

    async fn client(&self) -> Result<Client> {
        debug!(bucket = %self.bucket, "authenticating to GCS");
        let config = ClientConfig::default()
            .with_auth()
            .await
            .context("authenticating to GCS")?;
        Ok(Client::new(config))
    }

    fn get_request(&self, object: &str) -> GetObjectRequest {
        GetObjectRequest {
            bucket: self.bucket.clone(),
            object: object.to_string(),
            ..Default::default()
        }
    }
}

fn is_not_found(err: &GcsError) -> bool {
    matches!(err, GcsError::Response(resp) if resp.code == 404)
}

#[async_trait]
impl RemoteStore for GcsStore {
    #[instrument(level = "debug", skip(self), fields(bucket = %self.bucket))]
    async fn find(&self, name: &str) -> Result<Option<RemoteFile>> {
        let client = self.client().await?;
        let object = self.object_name(name);
        match client.get_object(&self.get_request(&object)).await {
            Ok(obj) => Ok(Some(RemoteFile {
                id: obj.name,
                name: name.to_string(),
                size: u64::try_from(obj.size).ok(),
            })),
            Err(e) if is_not_found(&e) => Ok(None),
            Err(e) => Err(e).with_context(|| format!("looking up gs://{}/{}", self.bucket, object)),
        }
    }

    #[instrument(level = "debug", skip(self, file), fields(object = %file.id))]
    async fn download(&self, file: &RemoteFile, dest_dir: &Path) -> Result<PathBuf> {
        let client = self.client().await?;
        let bytes = client
            .download_object(&self.get_request(&file.id), &Range::default())
            .await
            .with_context(|| format!("downloading gs://{}/{}", self.bucket, file.id))?;

        fs::create_dir_all(dest_dir).await?;
        let dest_path = dest_dir.join(&file.name);
        fs::write(&dest_path, &bytes)
            .await
            .with_context(|| format!("writing {}", dest_path.display()))?;

        info!(file = %file.name, bytes = bytes.len(), "downloaded from GCS");
        Ok(dest_path)
    }

    #[instrument(level = "debug", skip(self, local), fields(bucket = %self.bucket))]
    async fn upload(&self, local: &Path, name: &str) -> Result<()> {
        let client = self.client().await?;
        let object = self.object_name(name);

        let delete_req = DeleteObjectRequest {
            bucket: self.bucket.clone(),
            object: object.clone(),
            ..Default::default()
        };
        match client.delete_object(&delete_req).await {
            Ok(()) => debug!(%object, "deleted previous object"),
            Err(e) if is_not_found(&e) => {}
            Err(e) => {
                return Err(e).with_context(|| format!("deleting gs://{}/{}", self.bucket, object))
            }
        }

        let data = fs::read(local)
            .await
            .with_context(|| format!("reading {}", local.display()))?;
        let len = data.len();

        let mut media = Media::new(object.clone());
        media.content_type = XLSX_CONTENT_TYPE.into();
        media.content_length = Some(len as u64);
        let upload_req = UploadObjectRequest {
            bucket: self.bucket.clone(),
            ..Default::default()
        };
        client
            .upload_object(&upload_req, data, &UploadType::Simple(media))
            .await
            .with_context(|| format!("uploading {}", object))?;

        info!(%object, bytes = len, "uploaded to GCS");
        Ok(())
    }
}
