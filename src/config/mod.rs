mod settings;

pub use settings::{ScmSettings, Settings, SettingsCreationError, SourceTreeSettings, UiSettings};
