//! Default configuration values

/// Default C library of the target
pub const DEFAULT_LIBC: &str = "musl";

/// Package manager binary driven for metadata refresh and installs
pub const PACKAGE_MANAGER: &str = "opkg";

/// Prefix reserved for build configuration variables
pub const BUILD_VARIABLE_PREFIX: &str = "BOLT_";

/// Session variables passed through to directives
pub const PRESERVED_VARIABLES: &[&str] = &[
    "DISPLAY",
    "SSH_CONNECTION",
    "SSH_CLIENT",
    "SSH_TTY",
    "USER",
    "TERM",
    "HOME",
];

/// Structural schema locations, first existing path wins
pub const SCHEMA_SEARCH_PATH: &[&str] = &[
    concat!(env!("CARGO_MANIFEST_DIR"), "/schema/specfile.schema.toml"),
    "/usr/share/bolt-pack/schema/specfile.schema.toml",
    "/tools/share/bolt-pack/schema/specfile.schema.toml",
];

/// Directories searched after `PATH` when locating host executables
pub const EXTRA_EXECUTABLE_DIRS: &[&str] = &[
    "/tools/bin",
    "/tools/sbin",
    "/usr/local/bin",
    "/usr/local/sbin",
    "/bin",
    "/sbin",
    "/usr/bin",
    "/usr/sbin",
];

/// Minimum proptest iterations
pub const MIN_PROPTEST_ITERATIONS: u32 = 100;
