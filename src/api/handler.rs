//! Lambda entry point: proxy event in, proxy response out.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use lambda_runtime::{Error, LambdaEvent};
use serde_json::Value;
use tokio::time::Instant;
use tracing::{info, warn};

use super::{helpers, parsing};
use crate::errors::{Stage, StageFailure};
use crate::stitch::{Stitcher, response};

/// Left unused at the end of the invocation so the failure can still be reported.
pub const DEADLINE_MARGIN: Duration = Duration::from_millis(500);

pub use self::function_handler as handler;

/// Lambda handler for the stitch endpoint.
///
/// # Errors
///
/// Never returns `Err` for request problems; they come back as a 200 with
/// `success: false` in the body.
#[tracing::instrument(level = "info", skip(app, event), fields(aws_request_id = %event.context.request_id))]
pub async fn function_handler(app: &Stitcher, event: LambdaEvent<Value>) -> Result<Value, Error> {
    let (payload, context) = event.into_parts();

    let xray = payload
        .get("headers")
        .and_then(|headers| parsing::get_header_value(headers, "X-Amzn-Trace-Id"))
        .unwrap_or("");
    info!(xray_trace_id = %xray, "Received stitch request");

    let request = match parsing::extract_job_request(&payload) {
        Ok(request) => request,
        Err(e) => {
            warn!("Rejecting malformed event: {}", e);
            let failure = StageFailure::new(Stage::Validation, e);
            return Ok(helpers::job_response(&response::failure(&failure)));
        }
    };

    let mut scope = app.scope();
    if let Some(deadline) = deadline_from_epoch_ms(context.deadline, SystemTime::now()) {
        scope = scope.with_deadline(deadline);
    }

    let result = app.handle(&request, &scope).await;
    Ok(helpers::job_response(&result))
}

/// Converts the invocation deadline (ms since the epoch) into a local instant,
/// minus [`DEADLINE_MARGIN`]. `0` means the runtime did not supply one.
#[must_use]
pub fn deadline_from_epoch_ms(deadline_ms: u64, now: SystemTime) -> Option<Instant> {
    if deadline_ms == 0 {
        return None;
    }
    let deadline = UNIX_EPOCH + Duration::from_millis(deadline_ms);
    let remaining = deadline
        .duration_since(now)
        .unwrap_or(Duration::ZERO)
        .saturating_sub(DEADLINE_MARGIN);
    Some(Instant::now() + remaining)
}
