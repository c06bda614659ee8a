//! Workspace-wide constants.

pub const APP_NAME: &str = "sheaf";

/// Token replaced with a digest of the output content.
pub const HASH_TOKEN: &str = "%hash%";

/// Token replaced with a millisecond timestamp.
pub const DATE_TOKEN: &str = "%date%";

/// Number of hex characters of the content hash used in generated filenames.
pub const FILENAME_HASH_LEN: usize = 32;

/// Fewest digits in a `%date%` stamp; millisecond stamps reached 13 digits in 2001.
pub const DATE_STAMP_MIN_DIGITS: usize = 13;

/// Number of inputs listed by name in a target's input summary.
pub const INPUT_SUMMARY_LIMIT: usize = 3;

/// Default maximum length of truncated diagnostic strings.
pub const TRUNCATE_LIMIT: usize = 63;

pub const CONFIG_FILE_NAME: &str = "sheaf.json";
pub const MANIFEST_FILE_NAME: &str = "package.json";
pub const YARN_LOCKFILE: &str = "yarn.lock";
pub const MODULES_DIR_NAME: &str = "node_modules";

/// Key under which a project manifest may embed the build configuration.
pub const MANIFEST_CONFIG_KEY: &str = "sheaf";
