use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::client::{ClientError, HttpClient};

#[derive(Debug, Deserialize)]
struct CatalogResponse {
    repositories: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct TagsResponse {
    tags: Option<Vec<String>>,
}

#[derive(Debug, PartialEq, Serialize)]
pub(crate) struct Image {
    pub name: String,
    pub tags: Vec<String>,
}

/// A point-in-time view of everything the registry knows about. Rebuilt from
/// scratch on every request; the registry's repository list is authoritative
/// and nothing is cached or merged.
#[derive(Debug, Serialize)]
pub(crate) struct Catalog {
    pub registry: String,
    pub repositories: BTreeMap<String, Vec<Image>>,
}

/// Split a repository path into namespace and image name at the first
/// separator. Names without a separator file under the "-" namespace.
fn split_namespace(repository: &str) -> (&str, &str) {
    match repository.split_once('/') {
        Some((namespace, name)) => (namespace, name),
        None => ("-", repository),
    }
}

pub(crate) async fn build_catalog(
    client: &HttpClient,
    registry: &str,
) -> Result<Catalog, ClientError> {
    let listing: CatalogResponse = client.get_json(&format!("{registry}/v2/_catalog")).await?;

    debug!(
        "Registry returned {} repositories",
        listing.repositories.len()
    );

    let mut repositories: BTreeMap<String, Vec<Image>> = BTreeMap::new();

    // Tag lists are fetched one at a time, in the order the registry listed
    // the repositories, so per-namespace ordering matches the registry.
    for repository in &listing.repositories {
        let tags = fetch_tags(client, registry, repository).await?;
        let (namespace, name) = split_namespace(repository);

        repositories
            .entry(namespace.to_string())
            .or_default()
            .push(Image {
                name: name.to_string(),
                tags,
            });
    }

    Ok(Catalog {
        registry: registry.to_string(),
        repositories,
    })
}

async fn fetch_tags(
    client: &HttpClient,
    registry: &str,
    repository: &str,
) -> Result<Vec<String>, ClientError> {
    let listing: TagsResponse = client
        .get_json(&format!("{registry}/v2/{repository}/tags/list"))
        .await?;

    // A repository with all its manifests deleted reports "tags": null.
    Ok(listing.tags.unwrap_or_default())
}
