use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};

use tokio::fs;
use tracing::{debug, info};

use crate::linker::create_symlink;

use super::{MovieEntry, MovieError};

/// Links single movie files under a dedicated root folder.
pub struct MovieLibrary {
    root: PathBuf,
    video_extensions: Vec<String>,
}

impl MovieLibrary {
    pub fn new(root: impl Into<PathBuf>, video_extensions: &[String]) -> Self {
        Self {
            root: root.into(),
            video_extensions: video_extensions
                .iter()
                .map(|e| e.trim_start_matches('.').to_lowercase())
                .collect(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn is_video(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_lowercase())
            .is_some_and(|e| self.video_extensions.contains(&e))
    }

    /// Every video symlink under the root, sorted case-insensitively by name.
    ///
    /// A missing root yields an empty list.
    pub async fn list(&self) -> Result<Vec<MovieEntry>, MovieError> {
        let mut movies = Vec::new();
        let mut pending = vec![self.root.clone()];

        while let Some(dir) = pending.pop() {
            let mut entries = match fs::read_dir(&dir).await {
                Ok(entries) => entries,
                Err(e) if e.kind() == ErrorKind::NotFound && dir == self.root => {
                    return Ok(Vec::new())
                }
                Err(e) if dir == self.root => return Err(e.into()),
                Err(e) => {
                    debug!(path = %dir.display(), error = %e, "Skipping unreadable folder");
                    continue;
                }
            };

            while let Some(entry) = entries.next_entry().await? {
                let path = entry.path();
                let file_type = entry.file_type().await?;
                if file_type.is_dir() {
                    pending.push(path);
                    continue;
                }
                if !file_type.is_symlink() || !self.is_video(&path) {
                    continue;
                }

                let target = fs::read_link(&path).await.ok();
                let broken = !fs::try_exists(&path).await.unwrap_or(false);
                movies.push(MovieEntry {
                    name: file_stem(&path),
                    link: path,
                    target,
                    broken,
                });
            }
        }

        movies.sort_by(|a, b| {
            a.name
                .to_lowercase()
                .cmp(&b.name.to_lowercase())
                .then_with(|| a.link.cmp(&b.link))
        });
        Ok(movies)
    }

    /// Find a movie by the stem of its link.
    pub async fn find(&self, name: &str) -> Result<Option<MovieEntry>, MovieError> {
        Ok(self.list().await?.into_iter().find(|m| m.name == name))
    }

    /// Link `source` as `<root>/<stem>/<file>`.
    ///
    /// An existing movie with the same stem is an error unless `overwrite`
    /// is set, in which case it is removed first.
    pub async fn add(&self, source: &Path, overwrite: bool) -> Result<MovieEntry, MovieError> {
        if !source.is_absolute() {
            return Err(MovieError::RelativeSource(source.to_path_buf()));
        }
        if !self.is_video(source) {
            return Err(MovieError::NotAVideo(source.to_path_buf()));
        }
        match fs::metadata(source).await {
            Ok(metadata) if metadata.is_file() => {}
            Ok(_) => return Err(MovieError::NotAVideo(source.to_path_buf())),
            Err(_) => return Err(MovieError::SourceNotFound(source.to_path_buf())),
        }

        let name = file_stem(source);
        if let Some(existing) = self.find(&name).await? {
            if !overwrite {
                return Err(MovieError::AlreadyExists {
                    name,
                    link: existing.link,
                });
            }
            self.remove_entry(&existing).await?;
        }

        let folder = self.root.join(&name);
        fs::create_dir_all(&folder)
            .await
            .map_err(|source| MovieError::Link {
                path: folder.clone(),
                source,
            })?;
        let link = folder.join(source.file_name().unwrap_or_default());
        create_symlink(source, &link)
            .await
            .map_err(|e| MovieError::Link {
                path: link.clone(),
                source: e,
            })?;

        info!(movie = %name, link = %link.display(), "Linked movie");
        Ok(MovieEntry {
            name,
            link,
            target: Some(source.to_path_buf()),
            broken: false,
        })
    }

    /// Remove the movie link named `name`. The source file is left alone.
    pub async fn remove(&self, name: &str) -> Result<MovieEntry, MovieError> {
        let mut components = Path::new(name).components();
        if !matches!(
            (components.next(), components.next()),
            (Some(Component::Normal(_)), None)
        ) {
            return Err(MovieError::InvalidName(name.to_string()));
        }

        let entry = self
            .find(name)
            .await?
            .ok_or_else(|| MovieError::NotFound(name.to_string()))?;
        self.remove_entry(&entry).await?;
        info!(movie = %name, "Removed movie");
        Ok(entry)
    }

    /// Delete the movie's own folder, or just the link when it sits directly
    /// in the root.
    async fn remove_entry(&self, entry: &MovieEntry) -> Result<(), MovieError> {
        match entry.link.parent() {
            Some(folder) if folder != self.root && folder.starts_with(&self.root) => {
                fs::remove_dir_all(folder).await?;
            }
            _ => fs::remove_file(&entry.link).await?,
        }
        Ok(())
    }
}

fn file_stem(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default()
}
