use anyhow::Context;
use bytes::Bytes;
use tracing::{info, warn};
use uuid::Uuid;

use crate::storage::StorageClient;

pub struct UploadItem {
    pub body: Bytes,
    pub content_type: String,
}

/// Where an uploaded image lives on the media host.
#[derive(Debug, Clone)]
pub struct StoredImage {
    pub key: String,
    pub url: String,
}

pub fn is_image(content_type: &str) -> bool {
    content_type.starts_with("image/")
}

/// Uploads a listing image under `listings/{owner}/{id}.{ext}`. No retry.
pub async fn upload_listing_image(
    storage: &dyn StorageClient,
    owner_id: Uuid,
    image: UploadItem,
) -> anyhow::Result<StoredImage> {
    anyhow::ensure!(!image.body.is_empty(), "empty image body");
    let ext = ext_from_mime(&image.content_type).unwrap_or("bin");
    let key = format!("listings/{}/{}.{}", owner_id, Uuid::new_v4(), ext);
    storage
        .put_object(&key, image.body, &image.content_type)
        .await
        .with_context(|| format!("put_object {}", key))?;
    let url = storage.public_url(&key);
    info!(%owner_id, %key, "listing image uploaded");
    Ok(StoredImage { key, url })
}

/// Best-effort removal; failures are logged and swallowed.
pub async fn discard_listing_image(storage: &dyn StorageClient, key: &str) {
    if key.is_empty() {
        return;
    }
    if let Err(e) = storage.delete_object(key).await {
        warn!(error = ?e, %key, "failed to delete listing image; leaving it on the media host");
    }
}

fn ext_from_mime(ct: &str) -> Option<&'static str> {
    match ct {
        "image/jpeg" | "image/jpg" => Some("jpg"),
        "image/png" => Some("png"),
        "image/webp" => Some("webp"),
        "image/gif" => Some("gif"),
        "image/heic" => Some("heic"),
        _ => None,
    }
}

#[cfg(test)]
mod image_tests {
    use super::*;
    use crate::testing::FakeStorage;

    #[test]
    fn test_ext_from_mime() {
        assert_eq!(ext_from_mime("image/jpeg"), Some("jpg"));
        assert_eq!(ext_from_mime("image/jpg"), Some("jpg"));
        assert_eq!(ext_from_mime("image/png"), Some("png"));
        assert_eq!(ext_from_mime("image/webp"), Some("webp"));
        assert_eq!(ext_from_mime("image/heic"), Some("heic"));
        assert_eq!(ext_from_mime("application/octet-stream"), None);
    }

    #[tokio::test]
    async fn upload_keys_images_by_owner() {
        let storage = FakeStorage::default();
        let owner = Uuid::new_v4();
        let stored = upload_listing_image(
            &storage,
            owner,
            UploadItem {
                body: Bytes::from_static(b"\x89PNG"),
                content_type: "image/png".into(),
            },
        )
        .await
        .unwrap();
        assert!(stored.key.starts_with(&format!("listings/{}/", owner)));
        assert!(stored.key.ends_with(".png"));
        assert!(stored.url.ends_with(&stored.key));
        assert_eq!(storage.objects(), vec![stored.key]);
    }

    #[tokio::test]
    async fn discard_swallows_host_failures() {
        let storage = FakeStorage::default();
        storage.fail_deletes();
        discard_listing_image(&storage, "listings/x/y.png").await;
        assert_eq!(storage.delete_attempts(), 1);
    }
}
