use crate::config::StorageConfig;
use anyhow::Result;
use opendal::Operator;
use opendal::services;

/// Create storage operator based on storage configuration
pub fn create_operator(config: &StorageConfig) -> Result<Operator> {
    tracing::debug!("Creating {} storage operator", config.kind());

    match config {
        StorageConfig::Fs { root } => {
            tracing::info!("Configuring filesystem storage with root: {}", root);
            let builder = services::Fs::default().root(root);
            Ok(Operator::new(builder)?.finish())
        }
        StorageConfig::Memory => {
            tracing::warn!("Configuring in-memory storage, objects will not survive a restart");
            Ok(Operator::new(services::Memory::default())?.finish())
        }
        StorageConfig::S3 {
            bucket,
            root,
            region,
            endpoint,
            access_key_id,
            secret_access_key,
            disable_config_load,
            enable_virtual_host_style,
        } => {
            tracing::info!(
                "Configuring S3 storage with bucket: {}, region: {:?}, endpoint: {:?}",
                bucket,
                region,
                endpoint
            );

            let mut builder = services::S3::default()
                .bucket(bucket)
                .root(root.trim_start_matches('/'));

            if let Some(region) = region {
                builder = builder.region(region);
            }

            if let Some(endpoint) = endpoint {
                builder = builder.endpoint(endpoint);
            }

            if let Some(access_key_id) = access_key_id {
                builder = builder.access_key_id(access_key_id);
                tracing::debug!("S3 access key configured");
            }

            if let Some(secret_access_key) = secret_access_key {
                builder = builder.secret_access_key(secret_access_key);
                tracing::debug!("S3 secret key configured");
            }

            if *disable_config_load {
                builder = builder.disable_config_load();
            }

            if *enable_virtual_host_style {
                builder = builder.enable_virtual_host_style();
            }

            Ok(Operator::new(builder)?.finish())
        }
    }
}

/// Test storage connection
pub async fn test_connection(operator: &Operator) -> Result<()> {
    operator.check().await?;
    tracing::info!("Storage connection test successful");
    Ok(())
}

/// Build the operator and probe it once. A failing probe is logged, not fatal:
/// the bucket may simply not be reachable yet when the server boots.
pub async fn init_operator(config: &StorageConfig) -> Result<Operator> {
    let operator = create_operator(config)?;

    match test_connection(&operator).await {
        Ok(_) => {
            tracing::info!("Storage backend {} initialized and verified", config.kind());
        }
        Err(e) => {
            tracing::warn!(
                "Storage backend {} initialized but connection test failed: {}, continuing anyway",
                config.kind(),
                e
            );
        }
    }

    Ok(operator)
}
