use crate::section_proto::{
    section_server::Section, BackfillRequest, BackfillResponse, BackfilledItemObject,
    GetRotationItemsRequest, GetRotationItemsResponse, RotationItemObject, SectionItemObject,
};
use chrono::Timelike;
use serde::Deserialize;
use tonic::{Request, Response, Status};
use tracing::{debug, info};
use uuid::Uuid;

const HOURS_PER_DAY: usize = 24;

/// How a replacement item id is chosen for an owned rotation item
///
/// Both policies are placeholders until the catalog defines the real rule.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BackfillPolicy {
    /// A fresh 32-hex-char id
    #[default]
    Generated,
    /// The id and sku of the last input item
    ReuseLast,
}

/// Index of the item on rotation at `hour` (0-23) out of `count` items
///
/// The day is split into `count` equal slots. The result is clamped to the
/// last item; an empty section has no rotation.
pub fn select_rotation_index(count: usize, hour: u32) -> Result<usize, Status> {
    if count == 0 {
        return Err(Status::invalid_argument("section has no items to rotate"));
    }

    // floor(count / 24 * hour) in integers
    let index = count.saturating_mul(hour as usize) / HOURS_PER_DAY;
    Ok(index.min(count - 1))
}

/// The single item on rotation at `hour`
pub fn rotation_items(
    items: &[SectionItemObject],
    hour: u32,
) -> Result<GetRotationItemsResponse, Status> {
    let index = select_rotation_index(items.len(), hour)?;
    debug!(count = items.len(), hour, index, "Selected rotation item");

    Ok(GetRotationItemsResponse {
        items: vec![items[index].clone()],
        expired_at: 0,
    })
}

/// One replacement per owned item, in input order, keeping the slot index
pub fn backfill_items(items: &[RotationItemObject], policy: BackfillPolicy) -> BackfillResponse {
    let last = items.last();

    let backfilled_items = items
        .iter()
        .filter(|item| item.owned)
        .map(|item| {
            let (item_id, item_sku) = match (policy, last) {
                (BackfillPolicy::ReuseLast, Some(last)) => {
                    (last.item_id.clone(), last.item_sku.clone())
                }
                _ => (Uuid::new_v4().simple().to_string(), String::new()),
            };
            BackfilledItemObject {
                item_id,
                item_sku,
                index: item.index,
            }
        })
        .collect();

    BackfillResponse { backfilled_items }
}

#[derive(Debug, Clone, Default)]
pub struct SectionServiceImpl {
    policy: BackfillPolicy,
}

impl SectionServiceImpl {
    pub fn new(policy: BackfillPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> BackfillPolicy {
        self.policy
    }
}

#[tonic::async_trait]
impl Section for SectionServiceImpl {
    async fn get_rotation_items(
        &self,
        request: Request<GetRotationItemsRequest>,
    ) -> Result<Response<GetRotationItemsResponse>, Status> {
        let req = request.into_inner();
        info!(user_id = %req.user_id, namespace = %req.namespace, "Received GetRotationItems request");

        let items = req.section_object.map(|section| section.items).unwrap_or_default();
        let hour = chrono::Local::now().hour();

        rotation_items(&items, hour).map(Response::new)
    }

    async fn backfill(
        &self,
        request: Request<BackfillRequest>,
    ) -> Result<Response<BackfillResponse>, Status> {
        let req = request.into_inner();
        info!(user_id = %req.user_id, namespace = %req.namespace, "Received Backfill request");

        Ok(Response::new(backfill_items(&req.items, self.policy)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rotation_item(id: &str, owned: bool, index: i32) -> RotationItemObject {
        RotationItemObject {
            item_id: id.to_string(),
            item_sku: format!("SKU-{id}"),
            owned,
            index,
        }
    }

    #[test]
    fn test_rotation_index_spreads_over_the_day() {
        assert_eq!(select_rotation_index(8, 0).unwrap(), 0);
        assert_eq!(select_rotation_index(8, 12).unwrap(), 4);
        assert_eq!(select_rotation_index(8, 23).unwrap(), 7);
        assert_eq!(select_rotation_index(1, 23).unwrap(), 0);
        assert_eq!(select_rotation_index(48, 1).unwrap(), 2);
    }

    #[test]
    fn test_rotation_index_is_clamped() {
        assert_eq!(select_rotation_index(8, 24).unwrap(), 7);
        assert_eq!(select_rotation_index(3, 100).unwrap(), 2);
    }

    #[test]
    fn test_empty_section_is_invalid() {
        let status = select_rotation_index(0, 5).unwrap_err();
        assert_eq!(status.code(), tonic::Code::InvalidArgument);
    }

    #[test]
    fn test_generated_ids_are_simple_uuids() {
        let items = vec![rotation_item("a", true, 0), rotation_item("b", true, 1)];
        let response = backfill_items(&items, BackfillPolicy::Generated);

        assert_eq!(response.backfilled_items.len(), 2);
        for item in &response.backfilled_items {
            assert_eq!(item.item_id.len(), 32);
            assert!(item.item_id.chars().all(|c| c.is_ascii_hexdigit()));
        }
        assert_ne!(
            response.backfilled_items[0].item_id,
            response.backfilled_items[1].item_id
        );
    }

    #[test]
    fn test_reuse_last_policy() {
        let items = vec![
            rotation_item("a", true, 3),
            rotation_item("b", false, 4),
            rotation_item("c", false, 5),
        ];
        let response = backfill_items(&items, BackfillPolicy::ReuseLast);

        assert_eq!(response.backfilled_items.len(), 1);
        assert_eq!(response.backfilled_items[0].item_id, "c");
        assert_eq!(response.backfilled_items[0].item_sku, "SKU-c");
        assert_eq!(response.backfilled_items[0].index, 3);
    }

    #[test]
    fn test_nothing_owned_nothing_backfilled() {
        let items = vec![rotation_item("a", false, 0)];
        assert!(backfill_items(&items, BackfillPolicy::Generated)
            .backfilled_items
            .is_empty());
        assert!(backfill_items(&[], BackfillPolicy::ReuseLast)
            .backfilled_items
            .is_empty());
    }
}
