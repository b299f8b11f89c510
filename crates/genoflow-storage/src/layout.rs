use genoflow_core::S3Config;
use std::fmt;

/// Folder used for artifacts whose category is not recognised.
pub const FALLBACK_FOLDER: &str = "temp";

/// Logical kind of a processing artifact; decides its bucket folder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArtifactCategory {
    Internal,
    External,
    Binary,
    Unknown,
}

impl ArtifactCategory {
    /// Category for a `raw_data` sub-directory produced by the executable.
    pub fn from_raw_data_dir(dir: &str) -> Self {
        match dir {
            "internal_raw_data" | "atlas_raw_data" => ArtifactCategory::Internal,
            "external_raw_data" => ArtifactCategory::External,
            "binary_raw_data" | "binary" => ArtifactCategory::Binary,
            _ => ArtifactCategory::Unknown,
        }
    }
}

impl fmt::Display for ArtifactCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ArtifactCategory::Internal => "internal",
            ArtifactCategory::External => "external",
            ArtifactCategory::Binary => "binary",
            ArtifactCategory::Unknown => "unknown",
        };
        f.write_str(name)
    }
}

/// Bucket folders for each artifact category plus the source upload folder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FolderLayout {
    pub internal: String,
    pub external: String,
    pub binary: String,
    pub upload: String,
}

impl FolderLayout {
    pub fn from_config(config: &S3Config) -> Self {
        Self {
            internal: config.folder_internal.clone(),
            external: config.folder_external.clone(),
            binary: config.folder_binary.clone(),
            upload: config.upload_folder.clone(),
        }
    }

    pub fn folder_for(&self, category: ArtifactCategory) -> &str {
        match category {
            ArtifactCategory::Internal => &self.internal,
            ArtifactCategory::External => &self.external,
            ArtifactCategory::Binary => &self.binary,
            ArtifactCategory::Unknown => FALLBACK_FOLDER,
        }
    }

    /// Object key for an artifact.
    pub fn artifact_key(&self, category: ArtifactCategory, dest_name: &str) -> String {
        format!("{}/{}", self.folder_for(category), dest_name)
    }

    /// Object key for a user-uploaded source file.
    pub fn source_key(&self, file_name: &str) -> String {
        format!("{}/{}", self.upload, file_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn layout() -> FolderLayout {
        FolderLayout {
            internal: "atlas_raw_data_extended".into(),
            external: "external_raw_data".into(),
            binary: "binary".into(),
            upload: "upload".into(),
        }
    }

    #[test]
    fn categories_map_to_configured_folders() {
        let layout = layout();
        assert_eq!(
            layout.artifact_key(ArtifactCategory::Internal, "B1.txt"),
            "atlas_raw_data_extended/B1.txt"
        );
        assert_eq!(
            layout.artifact_key(ArtifactCategory::Binary, "B1.bed"),
            "binary/B1.bed"
        );
    }

    #[test]
    fn unknown_category_goes_to_temp() {
        assert_eq!(
            layout().artifact_key(ArtifactCategory::Unknown, "x"),
            "temp/x"
        );
    }

    #[test]
    fn raw_data_directories() {
        assert_eq!(
            ArtifactCategory::from_raw_data_dir("atlas_raw_data"),
            ArtifactCategory::Internal
        );
        assert_eq!(
            ArtifactCategory::from_raw_data_dir("binary_raw_data"),
            ArtifactCategory::Binary
        );
        assert_eq!(
            ArtifactCategory::from_raw_data_dir("misc"),
            ArtifactCategory::Unknown
        );
    }

    #[test]
    fn source_key_uses_upload_folder() {
        assert_eq!(layout().source_key("abc_sample.vcf"), "upload/abc_sample.vcf");
    }
}
