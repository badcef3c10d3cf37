//! Directory-backed page store: page `Name` lives in `<root>/Name.wiki`.

use std::io;
use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use wikimark_core::host::PageLookup;
use wikimark_core::LookupError;

const EXTENSION: &str = ".wiki";

pub struct FsStore {
    root: PathBuf,
}

impl FsStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// File of page `name`; `None` for names that would leave the root.
    fn path_of(&self, name: &str) -> Option<PathBuf> {
        let relative = Path::new(name);
        let inside = !name.is_empty()
            && relative
                .components()
                .all(|component| matches!(component, Component::Normal(_)));
        inside.then(|| self.root.join(format!("{}{}", name, EXTENSION)))
    }

    fn not_readable(&self, name: &str, source: io::Error) -> LookupError {
        LookupError::NotReadable {
            name: name.to_string(),
            source,
        }
    }
}

#[async_trait]
impl PageLookup for FsStore {
    async fn find_page(&self, name: &str) -> Result<Option<String>, LookupError> {
        let Some(path) = self.path_of(name) else {
            log::debug!("rejected page name {:?}", name);
            return Ok(None);
        };
        match tokio::fs::read_to_string(&path).await {
            Ok(content) => Ok(Some(content)),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(self.not_readable(name, err)),
        }
    }

    async fn page_count(&self, prefix: Option<&str>) -> Result<u64, LookupError> {
        let root = self.root.display().to_string();
        let mut entries = tokio::fs::read_dir(&self.root)
            .await
            .map_err(|err| self.not_readable(&root, err))?;

        let mut count = 0;
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|err| self.not_readable(&root, err))?
        {
            let file_name = entry.file_name();
            let Some(name) = file_name.to_str().and_then(|n| n.strip_suffix(EXTENSION)) else {
                continue;
            };
            if prefix.map_or(true, |p| name.starts_with(p)) {
                count += 1;
            }
        }
        Ok(count)
    }
}
