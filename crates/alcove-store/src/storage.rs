use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use alcove_types::FileMeta;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use futures_util::{Stream, StreamExt};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::{Result, StoreError};
use crate::mime::pick_extension;
use crate::name::{RoomName, sanitize_file_name};

/// Rooms and their files on local disk.
///
/// Layout is `{root}/{room}/{file}`. Every path this type hands out goes
/// through [`Store::room_dir`] or [`Store::file_path`], which only accept
/// validated names.
#[derive(Debug, Clone)]
pub struct Store {
    root: PathBuf,
    max_upload_bytes: u64,
}

impl Store {
    pub async fn open(root: PathBuf, max_upload_bytes: u64) -> Result<Self> {
        fs::create_dir_all(&root).await?;
        info!("Room storage directory: {}", root.display());
        Ok(Self {
            root,
            max_upload_bytes,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn max_upload_bytes(&self) -> u64 {
        self.max_upload_bytes
    }

    /// Directory of a validated room.
    pub fn room_dir(&self, room: &RoomName) -> PathBuf {
        self.root.join(room.as_str())
    }

    /// Path of a file inside a room. The name is reduced to its last segment
    /// before the join.
    pub fn file_path(&self, room: &RoomName, name: &str) -> Result<PathBuf> {
        let name = sanitize_file_name(name)?;
        Ok(self.room_dir(room).join(name))
    }

    /// Validate `raw` and create its directory if needed. Idempotent.
    pub async fn ensure_room(&self, raw: &str) -> Result<RoomName> {
        let room = RoomName::parse(raw)?;
        let dir = self.room_dir(&room);
        if !is_dir(&dir).await {
            fs::create_dir_all(&dir).await?;
            info!("Created room {}", room);
        }
        Ok(room)
    }

    pub async fn room_exists(&self, room: &RoomName) -> bool {
        is_dir(&self.room_dir(room)).await
    }

    /// Immediate subdirectories of the root with valid room names, sorted.
    pub async fn list_rooms(&self) -> Result<Vec<RoomName>> {
        let mut entries = match fs::read_dir(&self.root).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut rooms = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            // Same rule as `room_exists`: symlinks are followed.
            if !is_dir(&entry.path()).await {
                continue;
            }
            let Some(name) = entry.file_name().to_str().map(str::to_string) else {
                continue;
            };
            match RoomName::parse(&name) {
                Ok(room) => rooms.push(room),
                Err(_) => debug!("Skipping directory {:?} with invalid room name", name),
            }
        }
        rooms.sort();
        Ok(rooms)
    }

    /// Regular files directly inside the room, newest first.
    ///
    /// A missing room directory yields an empty list.
    pub async fn list_files(&self, room: &RoomName) -> Result<Vec<FileMeta>> {
        let mut entries = match fs::read_dir(self.room_dir(room)).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut files = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let Some(name) = entry.file_name().to_str().map(str::to_string) else {
                continue;
            };
            // Follows symlinks like `stat_file`. NotFound means we raced a delete.
            let metadata = match fs::metadata(entry.path()).await {
                Ok(m) => m,
                Err(e) if e.kind() == ErrorKind::NotFound => continue,
                Err(e) => return Err(e.into()),
            };
            if !metadata.is_file() {
                continue;
            }
            files.push(FileMeta::new(name, metadata.len(), modified_at(&metadata)));
        }

        files.sort_by(|a, b| {
            b.modified
                .cmp(&a.modified)
                .then_with(|| b.name.cmp(&a.name))
        });
        Ok(files)
    }

    /// Stat a single file for serving.
    pub async fn stat_file(&self, room: &RoomName, name: &str) -> Result<(PathBuf, FileMeta)> {
        let path = self.file_path(room, name)?;
        let metadata = fs::metadata(&path).await.map_err(|e| {
            if e.kind() == ErrorKind::NotFound {
                StoreError::NotFound
            } else {
                StoreError::Io(e)
            }
        })?;
        if !metadata.is_file() {
            return Err(StoreError::NotFound);
        }
        let name = sanitize_file_name(name)?;
        let meta = FileMeta::new(name, metadata.len(), modified_at(&metadata));
        Ok((path, meta))
    }

    /// Stream an upload into a freshly named file inside `room`.
    ///
    /// The name is `<utc timestamp>-<random>.<ext>`; the extension comes from
    /// the declared MIME type, then the declared filename. Uploads larger
    /// than the configured limit are removed and rejected, never truncated.
    pub async fn save_upload<S, E>(
        &self,
        room: &RoomName,
        body: S,
        declared_filename: Option<&str>,
        declared_mime: Option<&str>,
    ) -> Result<FileMeta>
    where
        S: Stream<Item = std::result::Result<Bytes, E>>,
        E: std::fmt::Display,
    {
        let dir = self.room_dir(room);
        if !is_dir(&dir).await {
            return Err(StoreError::RoomMissing(room.to_string()));
        }

        let ext = pick_extension(declared_mime, declared_filename);
        let name = generate_file_name(&ext);
        let path = dir.join(&name);

        let mut file = fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .await?;

        let mut body = std::pin::pin!(body);
        let mut written: u64 = 0;
        let limit = self.max_upload_bytes;

        let copied: Result<()> = async {
            while let Some(chunk) = body.next().await {
                let chunk = chunk.map_err(|e| StoreError::Body(e.to_string()))?;
                written += chunk.len() as u64;
                if written > limit {
                    return Err(StoreError::TooLarge { limit });
                }
                file.write_all(&chunk).await?;
            }
            file.flush().await?;
            Ok(())
        }
        .await;

        drop(file);

        if let Err(e) = copied {
            if let Err(rm) = fs::remove_file(&path).await {
                warn!("Failed to remove partial upload {}: {}", path.display(), rm);
            }
            return Err(e);
        }

        let metadata = fs::metadata(&path).await?;
        let meta = FileMeta::new(name, metadata.len(), modified_at(&metadata));
        info!(
            "Stored {} in room {} ({} bytes, {})",
            meta.name, room, meta.size, meta.mime
        );
        Ok(meta)
    }

    /// Remove one file. A file that is already gone counts as deleted.
    pub async fn delete_file(&self, room: &RoomName, name: &str) -> Result<()> {
        let path = self.file_path(room, name)?;
        match fs::remove_file(&path).await {
            Ok(()) => {
                info!("Deleted {} from room {}", path.display(), room);
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => {
                warn!("File {} in room {} already gone", name, room);
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Recursively remove a room and everything in it.
    ///
    /// Not atomic: a failure part way through leaves a partially emptied
    /// directory behind. Confirmation is the caller's job.
    pub async fn delete_room(&self, room: &RoomName) -> Result<()> {
        let dir = self.room_dir(room);
        match fs::remove_dir_all(&dir).await {
            Ok(()) => {
                info!("Deleted room {}", room);
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Err(StoreError::NotFound),
            Err(e) => Err(e.into()),
        }
    }
}

async fn is_dir(path: &Path) -> bool {
    fs::metadata(path)
        .await
        .map(|m| m.is_dir())
        .unwrap_or(false)
}

fn modified_at(metadata: &std::fs::Metadata) -> DateTime<Utc> {
    metadata
        .modified()
        .map(DateTime::<Utc>::from)
        .unwrap_or_else(|_| DateTime::<Utc>::from(std::time::UNIX_EPOCH))
}

fn generate_file_name(ext: &str) -> String {
    let stamp = Utc::now().format("%Y%m%dT%H%M%S%3f");
    let random = Uuid::new_v4().simple().to_string();
    format!("{}-{}.{}", stamp, &random[..8], ext)
}

#[cfg(test)]
mod tests {
    use std::convert::Infallible;
    use std::time::{Duration, SystemTime};

    use futures_util::stream;

    use super::*;

    async fn store(limit: u64) -> (tempfile::TempDir, Store) {
        let dir = tempfile::tempdir().unwrap();
        let store = Store::open(dir.path().join("data"), limit).await.unwrap();
        (dir, store)
    }

    fn body(parts: Vec<&'static [u8]>) -> impl Stream<Item = std::result::Result<Bytes, Infallible>> {
        stream::iter(parts.into_iter().map(|p| Ok(Bytes::from_static(p))))
    }

    #[tokio::test]
    async fn ensure_room_is_idempotent() {
        let (_tmp, store) = store(1024).await;
        let a = store.ensure_room("photos").await.unwrap();
        let b = store.ensure_room("photos").await.unwrap();
        assert_eq!(a, b);
        assert!(store.room_exists(&a).await);
        assert_eq!(store.list_rooms().await.unwrap(), vec![a]);
    }

    #[tokio::test]
    async fn invalid_room_never_touches_disk() {
        let (tmp, store) = store(1024).await;
        for bad in ["../etc", "..", "a/b", "UPPER", ""] {
            assert!(matches!(
                store.ensure_room(bad).await,
                Err(StoreError::InvalidName(_))
            ));
        }
        assert!(!tmp.path().join("etc").exists());
        assert!(store.list_rooms().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn list_rooms_is_sorted_and_skips_junk() {
        let (_tmp, store) = store(1024).await;
        store.ensure_room("zebra").await.unwrap();
        store.ensure_room("apple").await.unwrap();
        std::fs::create_dir(store.root().join("Not_A_Room")).unwrap();
        std::fs::write(store.root().join("stray-file"), b"x").unwrap();

        let rooms: Vec<String> = store
            .list_rooms()
            .await
            .unwrap()
            .into_iter()
            .map(|r| r.to_string())
            .collect();
        assert_eq!(rooms, vec!["apple", "zebra"]);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn symlinks_are_listed_the_way_they_resolve() {
        let (tmp, store) = store(1024).await;
        let outside = tmp.path().join("elsewhere");
        std::fs::create_dir(&outside).unwrap();
        std::fs::write(outside.join("x.txt"), b"abc").unwrap();
        std::os::unix::fs::symlink(&outside, store.root().join("linked")).unwrap();
        std::os::unix::fs::symlink(tmp.path().join("missing"), store.root().join("dangling"))
            .unwrap();

        let linked = RoomName::parse("linked").unwrap();
        assert!(store.room_exists(&linked).await);
        assert_eq!(store.list_rooms().await.unwrap(), vec![linked.clone()]);

        let real = store.ensure_room("real").await.unwrap();
        let dir = store.room_dir(&real);
        std::os::unix::fs::symlink(outside.join("x.txt"), dir.join("alias.txt")).unwrap();
        std::os::unix::fs::symlink(outside.join("gone.txt"), dir.join("broken.txt")).unwrap();

        let files = store.list_files(&real).await.unwrap();
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].name, "alias.txt");
        assert_eq!(files[0].size, 3);
        assert!(store.stat_file(&real, "alias.txt").await.is_ok());
    }

    #[tokio::test]
    async fn upload_then_list() {
        let (_tmp, store) = store(4096).await;
        let room = store.ensure_room("photos").await.unwrap();

        let meta = store
            .save_upload(&room, body(vec![b"abc", b"defg"]), Some("cat.png"), Some("image/png"))
            .await
            .unwrap();

        assert_eq!(meta.size, 7);
        assert_eq!(meta.mime, "image/png");
        assert!(meta.name.ends_with(".png"));
        assert!(!meta.name.contains("cat"));

        let files = store.list_files(&room).await.unwrap();
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].name, meta.name);
        assert_eq!(files[0].size, 7);

        let (path, stat) = store.stat_file(&room, &meta.name).await.unwrap();
        assert_eq!(std::fs::read(path).unwrap(), b"abcdefg");
        assert_eq!(stat.size, 7);
    }

    #[tokio::test]
    async fn upload_over_limit_is_rejected_and_removed() {
        let (_tmp, store) = store(5).await;
        let room = store.ensure_room("photos").await.unwrap();

        let err = store
            .save_upload(&room, body(vec![b"abc", b"def"]), None, Some("text/plain"))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::TooLarge { limit: 5 }));
        assert!(store.list_files(&room).await.unwrap().is_empty());

        // Exactly at the limit is fine.
        store
            .save_upload(&room, body(vec![b"abcde"]), None, None)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn upload_into_missing_room_fails() {
        let (_tmp, store) = store(1024).await;
        let room = RoomName::parse("ghost").unwrap();
        let err = store
            .save_upload(&room, body(vec![b"x"]), None, None)
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::RoomMissing(_)));
        assert!(!store.room_exists(&room).await);
    }

    #[tokio::test]
    async fn failing_stream_leaves_nothing_behind() {
        let (_tmp, store) = store(1024).await;
        let room = store.ensure_room("photos").await.unwrap();
        let parts: Vec<std::result::Result<Bytes, String>> =
            vec![Ok(Bytes::from_static(b"abc")), Err("connection reset".into())];

        let err = store
            .save_upload(&room, stream::iter(parts), None, None)
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Body(_)));
        assert!(store.list_files(&room).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn list_files_is_newest_first_and_ignores_subdirs() {
        let (_tmp, store) = store(1024).await;
        let room = store.ensure_room("photos").await.unwrap();
        let dir = store.room_dir(&room);
        let base = SystemTime::now() - Duration::from_secs(3600);

        for (i, name) in ["t1.txt", "t2.txt", "t3.txt"].iter().enumerate() {
            let path = dir.join(name);
            std::fs::write(&path, b"x").unwrap();
            let file = std::fs::File::options().write(true).open(&path).unwrap();
            file.set_modified(base + Duration::from_secs(60 * i as u64))
                .unwrap();
        }
        std::fs::create_dir(dir.join("nested")).unwrap();

        let names: Vec<String> = store
            .list_files(&room)
            .await
            .unwrap()
            .into_iter()
            .map(|f| f.name)
            .collect();
        assert_eq!(names, vec!["t3.txt", "t2.txt", "t1.txt"]);
    }

    #[tokio::test]
    async fn list_files_of_missing_room_is_empty() {
        let (_tmp, store) = store(1024).await;
        let room = RoomName::parse("nowhere").unwrap();
        assert!(store.list_files(&room).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn delete_file_is_idempotent() {
        let (_tmp, store) = store(1024).await;
        let room = store.ensure_room("photos").await.unwrap();
        let meta = store
            .save_upload(&room, body(vec![b"x"]), None, None)
            .await
            .unwrap();

        store.delete_file(&room, &meta.name).await.unwrap();
        store.delete_file(&room, &meta.name).await.unwrap();
        assert!(store.list_files(&room).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn delete_room_removes_everything_then_reports_not_found() {
        let (_tmp, store) = store(1024).await;
        let room = store.ensure_room("photos").await.unwrap();
        store
            .save_upload(&room, body(vec![b"x"]), None, None)
            .await
            .unwrap();

        store.delete_room(&room).await.unwrap();
        assert!(!store.room_exists(&room).await);
        assert!(matches!(
            store.delete_room(&room).await,
            Err(StoreError::NotFound)
        ));
    }

    #[tokio::test]
    async fn file_paths_never_leave_the_room() {
        let (_tmp, store) = store(1024).await;
        let room = store.ensure_room("photos").await.unwrap();
        let room_dir = store.room_dir(&room);

        for hostile in [
            "../../etc/passwd",
            "..\\..\\windows\\win.ini",
            "/etc/shadow",
            "a/b/../../c",
            "photos/../other/x",
        ] {
            let path = store.file_path(&room, hostile).unwrap();
            assert_eq!(path.parent(), Some(room_dir.as_path()), "{}", hostile);
            assert!(path.starts_with(store.root()));
        }
        for hostile in ["..", "x/..", "."] {
            assert!(store.file_path(&room, hostile).is_err());
        }
    }

    #[tokio::test]
    async fn stat_missing_file_is_not_found() {
        let (_tmp, store) = store(1024).await;
        let room = store.ensure_room("photos").await.unwrap();
        assert!(matches!(
            store.stat_file(&room, "nope.png").await,
            Err(StoreError::NotFound)
        ));
    }
}
