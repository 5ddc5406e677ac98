use crate::catalog::api_key::ApiKey;
use crate::catalog::error::CatalogError;
use crate::types::asset::Asset;
use crate::types::cycle::Cycle;
use crate::types::model::Model;
use bon::bon;
use log::{debug, error, info, warn};
use reqwest::header::ACCEPT;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ItemCollection {
    number_returned: u64,
    #[serde(default)]
    features: Vec<Feature>,
}

#[derive(Debug, Deserialize)]
struct Feature {
    #[serde(alias = "assets")]
    asset: FeatureAsset,
}

#[derive(Debug, Deserialize)]
struct FeatureAsset {
    data: DataLink,
}

#[derive(Debug, Deserialize)]
struct DataLink {
    href: String,
}

/// Looks up the files published for one model run.
pub struct CatalogClient {
    client: Client,
    stac_url: String,
    api_key: ApiKey,
}

#[bon]
impl CatalogClient {
    /// Creates a client for the catalog rooted at `stac_url`.
    ///
    /// The whole catalog request, body included, must finish within `timeout`
    /// (60 seconds unless set).
    #[builder]
    pub fn new(
        #[builder(into)] stac_url: String,
        api_key: ApiKey,
        timeout: Option<Duration>,
    ) -> Result<Self, CatalogError> {
        let client = Client::builder()
            .timeout(timeout.unwrap_or(DEFAULT_TIMEOUT))
            .build()
            .map_err(CatalogError::ClientBuild)?;
        Ok(Self {
            client,
            stac_url,
            api_key,
        })
    }

    /// The full query URL for `model` and `cycle`, API key included.
    pub fn items_url(&self, model: Model, cycle: &Cycle) -> String {
        format!(
            "{}?modelRun={}&api-key={}",
            self.items_endpoint(model),
            cycle.iso_z(),
            self.api_key.expose()
        )
    }

    fn items_endpoint(&self, model: Model) -> String {
        format!("{}/{}/items", self.stac_url.trim_end_matches('/'), model)
    }

    /// Queries the catalog once and returns the assets of the cycle in the
    /// order the server listed them.
    ///
    /// With `limit` set only the first `limit` assets are returned.
    ///
    /// # Errors
    ///
    /// * [`CatalogError::Unavailable`] when the server answers with anything but 200.
    /// * [`CatalogError::EmptyCatalog`] when the cycle has no files.
    /// * [`CatalogError::NetworkRequest`] / [`CatalogError::JsonParse`] for transport
    ///   and decoding problems.
    /// * [`CatalogError::InvalidAssetUrl`] when a feature's href does not name a file.
    #[builder]
    pub async fn fetch_assets(
        &self,
        model: Model,
        cycle: Cycle,
        limit: Option<usize>,
    ) -> Result<Vec<Asset>, CatalogError> {
        let endpoint = self.items_endpoint(model);
        info!("Querying {} for {} cycle {}", endpoint, model, cycle);

        let response = self
            .client
            .get(self.items_url(model, &cycle))
            .header(ACCEPT, "application/json")
            .send()
            .await
            .map_err(|e| CatalogError::NetworkRequest(endpoint.clone(), e.without_url()))?;

        let status = response.status();
        if status != StatusCode::OK {
            error!("Catalog request to {} failed with status {}", endpoint, status);
            return Err(CatalogError::Unavailable { endpoint, status });
        }

        let collection = response
            .json::<ItemCollection>()
            .await
            .map_err(|e| CatalogError::JsonParse(endpoint.clone(), e.without_url()))?;

        if collection.number_returned == 0 || collection.features.is_empty() {
            error!("No files found for {} cycle {}", model, cycle);
            return Err(CatalogError::EmptyCatalog {
                model: model.to_string(),
                cycle: cycle.to_string(),
            });
        }
        if collection.number_returned != collection.features.len() as u64 {
            warn!(
                "Catalog declared {} results but listed {} features",
                collection.number_returned,
                collection.features.len()
            );
        }

        let mut assets = collection
            .features
            .into_iter()
            .enumerate()
            .map(|(index, feature)| {
                let href = feature.asset.data.href;
                match Asset::new(index, href.as_str()) {
                    Some(asset) => Ok(asset),
                    None => Err(CatalogError::InvalidAssetUrl { index, href }),
                }
            })
            .collect::<Result<Vec<_>, _>>()?;
        info!("Catalog lists {} files for cycle {}", assets.len(), cycle);

        if let Some(limit) = limit {
            if limit < assets.len() {
                info!("Limiting download to the first {} files", limit);
                assets.truncate(limit);
            }
        }

        ensure_unique_file_names(&assets)?;

        for asset in &assets {
            debug!("Asset {}: {}", asset.index(), asset.file_name());
        }
        Ok(assets)
    }
}

/// Every asset is saved under its file name, so two assets sharing one would
/// write to the same local path.
fn ensure_unique_file_names(assets: &[Asset]) -> Result<(), CatalogError> {
    let mut seen = HashMap::with_capacity(assets.len());
    for asset in assets {
        if let Some(first) = seen.insert(asset.file_name(), asset.index()) {
            error!(
                "Catalog features {} and {} share the file name {}",
                first,
                asset.index(),
                asset.file_name()
            );
            return Err(CatalogError::DuplicateFileName {
                first,
                second: asset.index(),
                name: asset.file_name().to_string(),
            });
        }
    }
    Ok(())
}
