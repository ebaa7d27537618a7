use serde::Serialize;

/// Build metadata baked in at compile time.
#[derive(Debug, Serialize)]
pub struct VersionInfoDto {
    pub version: &'static str,
    pub target: &'static str,
    pub profile: &'static str,
    pub rustc: &'static str,
}

impl VersionInfoDto {
    pub const CURRENT: VersionInfoDto = VersionInfoDto {
        version: env!("CARGO_PKG_VERSION"),
        target: env!("OUTPOST_BUILD_TARGET"),
        profile: env!("OUTPOST_BUILD_PROFILE"),
        rustc: env!("OUTPOST_RUSTC_VERSION"),
    };
}
