use derive_more::Display;

use crate::render::MarkerSet;

/// Order in which the children of a node are listed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Display)]
pub enum DisplayOrder {
    #[default]
    #[display("alphabetic")]
    Alphabetic,
    #[display("directories_first")]
    DirectoriesFirst,
    #[display("files_first")]
    FilesFirst,
}

impl DisplayOrder {
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "alphabetic" => Some(DisplayOrder::Alphabetic),
            "directories_first" => Some(DisplayOrder::DirectoriesFirst),
            "files_first" => Some(DisplayOrder::FilesFirst),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct RenderOptions {
    pub order: DisplayOrder,
    pub hide_dot_files: bool,
    pub markers: MarkerSet,
}
