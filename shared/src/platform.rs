use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Platform {
    #[default]
    Web,
    Ios,
    Android,
}

/// Facts about the running shell, read once per mount.
pub trait PlatformFacts: Send + Sync {
    fn platform(&self) -> Platform;

    /// Constrained surfaces page their results instead of showing them all.
    fn is_constrained_platform(&self) -> bool;

    /// The static snapshot is only ever generated for the web build, so
    /// only web can read it. A narrow web viewport still counts as web.
    fn is_desktop_web(&self) -> bool {
        self.platform() == Platform::Web
    }
}

/// Platform facts as reported by the shell at mount time.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlatformInfo {
    pub platform: Platform,
    pub constrained: bool,
}

impl PlatformInfo {
    pub const DESKTOP_WEB: Self = Self {
        platform: Platform::Web,
        constrained: false,
    };

    pub const fn native(platform: Platform) -> Self {
        Self {
            platform,
            constrained: true,
        }
    }
}

impl PlatformFacts for PlatformInfo {
    fn platform(&self) -> Platform {
        self.platform
    }

    fn is_constrained_platform(&self) -> bool {
        self.constrained
    }
}
