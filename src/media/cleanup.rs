use std::sync::Arc;
use std::time::Duration;
use tracing::{error, warn};

use super::ImageHost;

const ATTEMPTS: u32 = 3;
const BASE_DELAY: Duration = Duration::from_millis(250);

/// Release a hosted image without blocking the request that made it
/// obsolete. Retries with backoff; a final failure is logged and the
/// asset is left orphaned on the host.
pub fn release_image(host: Arc<dyn ImageHost>, public_id: String) {
    tokio::spawn(async move {
        for attempt in 1..=ATTEMPTS {
            match host.destroy(&public_id).await {
                Ok(()) => return,
                Err(err) if attempt < ATTEMPTS => {
                    warn!(
                        public_id = %public_id,
                        attempt,
                        error = %err,
                        "image release failed, retrying"
                    );
                    tokio::time::sleep(BASE_DELAY * 2u32.pow(attempt - 1)).await;
                }
                Err(err) => {
                    error!(
                        public_id = %public_id,
                        error = %err,
                        "image release failed, giving up"
                    );
                }
            }
        }
    });
}
