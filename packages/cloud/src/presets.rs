//! The files and folders offered for a one-click backup.

/// Config files most players want backed up.
pub const COMMON_FILES: &[&str] = &[
    "settings_ddnet.cfg",
    "settings_tclient.cfg",
    "tclient_profiles.cfg",
    "tclient_chatbinds.cfg",
    "tclient_warlist.cfg",
    "identities.json",
    "touch_controls.json",
];

/// Asset folders that can be uploaded as a whole.
pub const ASSET_FOLDERS: &[&str] = &[
    "assets/entities",
    "assets/emoticons",
    "assets/particles",
    "assets/game",
    "assets/hud",
    "assets/extras",
];

/// Which presets a bulk upload includes.
///
/// `files[i]` toggles `COMMON_FILES[i]`, `folders[i]` toggles
/// `ASSET_FOLDERS[i]`. The default picks the five `.cfg` files.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadSelection {
    pub files: [bool; COMMON_FILES.len()],
    pub folders: [bool; ASSET_FOLDERS.len()],
}

impl Default for UploadSelection {
    fn default() -> Self {
        Self {
            files: [true, true, true, true, true, false, false],
            folders: [false; ASSET_FOLDERS.len()],
        }
    }
}

impl UploadSelection {
    pub fn none() -> Self {
        Self {
            files: [false; COMMON_FILES.len()],
            folders: [false; ASSET_FOLDERS.len()],
        }
    }

    pub fn all() -> Self {
        Self {
            files: [true; COMMON_FILES.len()],
            folders: [true; ASSET_FOLDERS.len()],
        }
    }

    pub fn selected_files(&self) -> impl Iterator<Item = &'static str> + '_ {
        COMMON_FILES
            .iter()
            .zip(self.files.iter())
            .filter(|(_, on)| **on)
            .map(|(name, _)| *name)
    }

    pub fn selected_folders(&self) -> impl Iterator<Item = &'static str> + '_ {
        ASSET_FOLDERS
            .iter()
            .zip(self.folders.iter())
            .filter(|(_, on)| **on)
            .map(|(name, _)| *name)
    }

    pub fn is_empty(&self) -> bool {
        self.selected_files().next().is_none() && self.selected_folders().next().is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_selects_config_files() {
        let selection = UploadSelection::default();
        let files: Vec<_> = selection.selected_files().collect();
        assert_eq!(files.len(), 5);
        assert!(files.iter().all(|f| f.ends_with(".cfg")));
        assert_eq!(selection.selected_folders().count(), 0);
    }

    #[test]
    fn none_is_empty() {
        assert!(UploadSelection::none().is_empty());
        assert!(!UploadSelection::all().is_empty());
        assert_eq!(UploadSelection::all().selected_folders().count(), 6);
    }
}
