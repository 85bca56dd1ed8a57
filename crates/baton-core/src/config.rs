/// Settings for one build unit's controller.
#[derive(Debug, Clone)]
pub struct ControllerConfig {
    /// Name of the build unit; used in logs, thread names and error messages.
    pub build_name: String,

    /// Overrides the default `baton-<build_name>` worker thread name.
    pub worker_thread_name: Option<String>,
}

impl ControllerConfig {
    pub fn new(build_name: impl Into<String>) -> Self {
        Self {
            build_name: build_name.into(),
            worker_thread_name: None,
        }
    }

    pub fn with_worker_thread_name(mut self, name: impl Into<String>) -> Self {
        self.worker_thread_name = Some(name.into());
        self
    }

    pub fn thread_name(&self) -> String {
        self.worker_thread_name
            .clone()
            .unwrap_or_else(|| format!("baton-{}", self.build_name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_thread_name_uses_build_name() {
        let config = ControllerConfig::new("lib");
        assert_eq!(config.thread_name(), "baton-lib");
    }

    #[test]
    fn thread_name_can_be_overridden() {
        let config = ControllerConfig::new("lib").with_worker_thread_name("custom");
        assert_eq!(config.thread_name(), "custom");
    }
}
