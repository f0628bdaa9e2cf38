//! Install and uninstall passthrough options

/// Application install options
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InstallOptions {
    /// Replace an existing application
    pub replace: bool,
    /// Install a shared bundle for multiple apps
    pub shared: bool,
}

impl InstallOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn replace(mut self, replace: bool) -> Self {
        self.replace = replace;
        self
    }

    pub fn shared(mut self, shared: bool) -> Self {
        self.shared = shared;
        self
    }
}

/// Application uninstall options
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UninstallOptions {
    /// Keep the data and cache directories
    pub keep_data: bool,
    /// Remove a shared bundle
    pub shared: bool,
}

impl UninstallOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn keep_data(mut self, keep: bool) -> Self {
        self.keep_data = keep;
        self
    }

    pub fn shared(mut self, shared: bool) -> Self {
        self.shared = shared;
        self
    }
}
