//! Creative phase (§4.7 `CREATIVE_RUNNING`, §4.4): calls C4, never fails
//! the track — failures degrade to default facts with a `creative_status`
//! cause string (§7).

use rhythmdb_common::models::{CreativeFacts, TrackRecord};

use crate::services::creative_client::CreativeClient;

/// Mutate `record.creative` / `record.creative_status` in place.
pub async fn run(record: &mut TrackRecord, client: &CreativeClient, hints: &[String]) {
    let title = record
        .technical
        .tags
        .title
        .clone()
        .unwrap_or_else(|| record.file.clone());

    match client.analyze(&title, record.technical.bpm, hints).await {
        Ok(facts) => {
            record.creative = facts;
            record.creative_status = "ok".to_string();
        }
        Err(err) => {
            record.creative = CreativeFacts::default();
            record.creative_status = err.status_str().to_string();
        }
    }
}
