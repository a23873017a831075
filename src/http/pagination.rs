use super::GitHubClient;
use log::{debug, warn};
use serde_json::Value;

pub const PAGE_SIZE: usize = 100;

/// Fetch every page of a page-numbered listing endpoint.
///
/// Pages are requested with `per_page=100` and `page=1,2,...` until a page
/// comes back short, empty, not a JSON array, or fails outright. A failure is
/// not surfaced: items gathered so far are returned, so an empty result means
/// either "no data" or "the first page failed".
pub async fn collect_all(
    client: &GitHubClient,
    path: &str,
    params: &[(&str, String)],
) -> Vec<Value> {
    let mut results: Vec<Value> = Vec::new();
    let mut page: u32 = 1;
    loop {
        let mut query: Vec<(&str, String)> = params.to_vec();
        query.push(("per_page", PAGE_SIZE.to_string()));
        query.push(("page", page.to_string()));

        let items = match client.get(path, &query).await {
            Ok(Value::Array(items)) => items,
            Ok(_) => {
                warn!("{} page {} is not a list; stopping pagination", path, page);
                break;
            }
            Err(e) => {
                warn!("{} page {} failed; stopping pagination: {}", path, page, e);
                break;
            }
        };
        if items.is_empty() {
            break;
        }
        let n = items.len();
        debug!("{} page {} returned {} items", path, page, n);
        results.extend(items);
        if n < PAGE_SIZE {
            break;
        }
        page += 1;
    }
    results
}
