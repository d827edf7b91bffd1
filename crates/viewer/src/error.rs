use std::fmt;

/// Failure reported by a collaborator (rendering engine, asset loader,
/// device check).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineError {
    pub message: String,
}

impl EngineError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl fmt::Display for EngineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for EngineError {}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    Parse(String),
    Invalid(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Parse(msg) => write!(f, "viewer config parse error: {msg}"),
            ConfigError::Invalid(msg) => write!(f, "invalid viewer config: {msg}"),
        }
    }
}

impl std::error::Error for ConfigError {}

/// The initialization step that failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InitStep {
    /// Locating the page elements the session drives.
    HostPage,
    CreateViewer,
    AssetManager,
    Capability(String),
    LoadScene(String),
    ConfigureCapability(String),
}

impl fmt::Display for InitStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InitStep::HostPage => write!(f, "find host page elements"),
            InitStep::CreateViewer => write!(f, "create viewer"),
            InitStep::AssetManager => write!(f, "add asset manager"),
            InitStep::Capability(name) => write!(f, "add capability {name}"),
            InitStep::LoadScene(path) => write!(f, "load scene {path}"),
            InitStep::ConfigureCapability(name) => write!(f, "configure capability {name}"),
        }
    }
}

/// Fatal to the session: no partially initialized viewer is handed out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    Config(ConfigError),
    Step { step: InitStep, source: EngineError },
}

impl SessionError {
    pub fn step(step: InitStep, source: EngineError) -> Self {
        SessionError::Step { step, source }
    }
}

impl fmt::Display for SessionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionError::Config(err) => write!(f, "{err}"),
            SessionError::Step { step, source } => {
                write!(f, "viewer initialization failed at '{step}': {source}")
            }
        }
    }
}

impl std::error::Error for SessionError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SessionError::Config(err) => Some(err),
            SessionError::Step { source, .. } => Some(source),
        }
    }
}

impl From<ConfigError> for SessionError {
    fn from(err: ConfigError) -> Self {
        SessionError::Config(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn step_failures_name_the_step() {
        let err = SessionError::step(
            InitStep::LoadScene("scene-black.glb".into()),
            EngineError::new("404"),
        );
        assert_eq!(
            err.to_string(),
            "viewer initialization failed at 'load scene scene-black.glb': 404"
        );
    }

    #[test]
    fn missing_host_elements_are_a_step_failure() {
        let err = SessionError::step(InitStep::HostPage, EngineError::new("element '#content' not found"));
        assert_eq!(
            err.to_string(),
            "viewer initialization failed at 'find host page elements': element '#content' not found"
        );
        assert!(std::error::Error::source(&err).is_some());
    }
}
