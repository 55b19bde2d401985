//! Provisioning commands and the step executor they run on

pub mod banner;
pub mod bind;
pub mod common;
pub mod docker;
pub mod errors;
pub mod executor;
pub mod fallback;
pub mod pipeline;
pub mod seed;
pub mod sink;
pub mod webmin;

use futures::future::BoxFuture;

use errors::StepError;

/// Future returned by a step or fallback candidate borrowing the run's sink
pub type StepFuture<'s, T> = BoxFuture<'s, Result<T, StepError>>;

/// Standard step names for consistent logging
pub mod steps {
    // Shared steps
    pub const PREREQUISITES: &str = "prerequisites";
    pub const PACKAGES: &str = "packages";
    pub const SERVICE: &str = "service";

    // Docker steps
    pub const GPG_KEY: &str = "gpg-key";
    pub const REPOSITORY: &str = "repository";
    pub const GROUP: &str = "group";
    pub const VERIFY: &str = "verify";

    // Webmin steps
    pub const LEGACY_SOURCES: &str = "legacy-sources";
    pub const SETUP_SCRIPT: &str = "setup-script";

    // BIND steps
    pub const ZONE_FILE: &str = "zone-file";
    pub const ZONE_REGISTRATION: &str = "zone-registration";
}
