/// Application name
pub const APP_NAME: &str = "Convene";

/// Smallest capacity an event may declare
pub const MIN_ATTENDEES: u32 = 1;

/// Largest capacity an event may declare
pub const MAX_ATTENDEES: u32 = 10_000;

/// Lowest review rating
pub const RATING_MIN: u8 = 1;

/// Highest review rating
pub const RATING_MAX: u8 = 5;

/// Maximum message length in characters
pub const MAX_MESSAGE_LEN: usize = 5_000;

/// Maximum number of images accepted by a single upload
pub const MAX_IMAGES_PER_UPLOAD: usize = 10;

/// Maximum size of a single event image in bytes (10 MiB)
pub const MAX_IMAGE_SIZE: usize = 10 * 1024 * 1024;

/// Largest per-image limit a deployment may configure (100 MiB)
pub const IMAGE_SIZE_CEILING: usize = 100 * 1024 * 1024;

/// Default HTTP API port
pub const DEFAULT_HTTP_PORT: u16 = 8080;

/// Header carrying the acting user's id
pub const ACTOR_HEADER: &str = "x-actor-id";
