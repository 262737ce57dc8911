//! Constants used throughout the iamprobe library.

use std::time::Duration;

/// Maximum number of permissions accepted by one `testIamPermissions` call.
pub const MAX_PERMISSIONS_PER_CALL: usize = 100;

/// Host serving the Cloud Resource Manager v1 API.
pub const DEFAULT_ENDPOINT: &str = "https://cloudresourcemanager.googleapis.com";

/// Number of concurrent shards used when none is configured.
pub const DEFAULT_TASKS: usize = 10;

/// Upper bound on the number of concurrent shards.
pub const MAX_TASKS: usize = 100;

/// Per-request timeout for the bulk permission check.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
