//! Mailbox backed by a directory tree
//!
//! Every subdirectory of the root is a folder and every regular file inside
//! it is one RFC 5322 message. Maildir folders are understood too: files in
//! their `cur` and `new` subdirectories are messages, `tmp` is ignored.
//! Sequence numbers follow file name order.

use super::{MailboxConnector, MailboxError, MailboxResult, MailboxSession, RawMessage};
use std::fs;
use std::ops::RangeInclusive;
use std::path::{Component, Path, PathBuf};

/// Maildir subdirectories that hold delivered messages
const MAILDIR_SUBDIRS: &[&str] = &["cur", "new"];

/// Connector for a mail directory tree
#[derive(Debug, Clone)]
pub struct DirectoryMailbox {
    root: PathBuf,
}

impl DirectoryMailbox {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl MailboxConnector for DirectoryMailbox {
    fn connect(&self) -> MailboxResult<Box<dyn MailboxSession>> {
        if !self.root.is_dir() {
            return Err(MailboxError::Connect(format!(
                "mail root {} is not a directory",
                self.root.display()
            )));
        }

        tracing::debug!("Opened mail directory {}", self.root.display());

        Ok(Box::new(DirectorySession {
            root: self.root.clone(),
            selected: None,
            closed: false,
        }))
    }
}

struct SelectedFolder {
    name: String,
    files: Vec<PathBuf>,
}

struct DirectorySession {
    root: PathBuf,
    selected: Option<SelectedFolder>,
    closed: bool,
}

impl DirectorySession {
    fn ensure_open(&self) -> MailboxResult<()> {
        if self.closed {
            Err(MailboxError::Closed)
        } else {
            Ok(())
        }
    }
}

impl MailboxSession for DirectorySession {
    fn list_folders(&mut self) -> MailboxResult<Vec<String>> {
        self.ensure_open()?;

        let mut folders = Vec::new();
        for entry in fs::read_dir(&self.root)? {
            let entry = entry?;
            if entry.file_type()?.is_dir() {
                folders.push(entry.file_name().to_string_lossy().into_owned());
            }
        }

        folders.sort();
        Ok(folders)
    }

    fn select_folder(&mut self, folder: &str) -> MailboxResult<u32> {
        self.ensure_open()?;

        let path = self.root.join(folder);
        if !is_folder_name(folder) || !path.is_dir() {
            return Err(MailboxError::FolderNotFound(folder.to_string()));
        }

        let files = message_files(&path)?;
        let total = u32::try_from(files.len()).unwrap_or(u32::MAX);

        self.selected = Some(SelectedFolder {
            name: folder.to_string(),
            files,
        });

        Ok(total)
    }

    fn fetch_range(&mut self, range: RangeInclusive<u32>) -> MailboxResult<Vec<RawMessage>> {
        self.ensure_open()?;

        let selected = self.selected.as_ref().ok_or_else(|| MailboxError::Fetch {
            folder: String::new(),
            message: "no folder selected".to_string(),
        })?;

        let mut messages = Vec::new();
        for seq in range {
            let Some(path) = (seq as usize)
                .checked_sub(1)
                .and_then(|idx| selected.files.get(idx))
            else {
                continue;
            };

            let body = fs::read(path).map_err(|e| MailboxError::Fetch {
                folder: selected.name.clone(),
                message: format!("{}: {}", path.display(), e),
            })?;
            messages.push(RawMessage::parse(body));
        }

        Ok(messages)
    }

    fn close(&mut self) -> MailboxResult<()> {
        self.selected = None;
        self.closed = true;
        Ok(())
    }
}

/// Returns true if `folder` names a directory below the mail root
fn is_folder_name(folder: &str) -> bool {
    let mut components = Path::new(folder).components().peekable();
    components.peek().is_some() && components.all(|c| matches!(c, Component::Normal(_)))
}

/// Collects message files of a folder in file name order
fn message_files(folder: &Path) -> MailboxResult<Vec<PathBuf>> {
    let mut files = regular_files(folder)?;

    for subdir in MAILDIR_SUBDIRS {
        let path = folder.join(subdir);
        if path.is_dir() {
            files.extend(regular_files(&path)?);
        }
    }

    files.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    Ok(files)
}

fn regular_files(dir: &Path) -> MailboxResult<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        if entry.file_type()?.is_file() {
            files.push(entry.path());
        }
    }
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn message(n: u32) -> String {
        format!("From: sender{n}@example.com\r\nSubject: Message {n}\r\n\r\nbody {n}")
    }

    fn mail_root() -> TempDir {
        let dir = TempDir::new().unwrap();
        let inbox = dir.path().join("INBOX");
        fs::create_dir(&inbox).unwrap();
        for n in 1..=5 {
            fs::write(inbox.join(format!("{:03}.eml", n)), message(n)).unwrap();
        }
        fs::create_dir(dir.path().join("Archive")).unwrap();
        dir
    }

    #[test]
    fn test_connect_requires_directory() {
        let dir = TempDir::new().unwrap();
        let mailbox = DirectoryMailbox::new(dir.path().join("missing"));
        assert!(matches!(mailbox.connect(), Err(MailboxError::Connect(_))));
    }

    #[test]
    fn test_list_folders_sorted() {
        let dir = mail_root();
        let mut session = DirectoryMailbox::new(dir.path()).connect().unwrap();
        assert_eq!(session.list_folders().unwrap(), vec!["Archive", "INBOX"]);
    }

    #[test]
    fn test_select_missing_folder() {
        let dir = mail_root();
        let mut session = DirectoryMailbox::new(dir.path()).connect().unwrap();
        assert!(matches!(
            session.select_folder("Spam"),
            Err(MailboxError::FolderNotFound(_))
        ));
    }

    #[test]
    fn test_select_rejects_paths_outside_root() {
        let dir = TempDir::new().unwrap();
        let root = dir.path().join("mail");
        fs::create_dir_all(root.join("INBOX")).unwrap();
        let outside = dir.path().join("Outside");
        fs::create_dir(&outside).unwrap();
        fs::write(outside.join("001.eml"), message(1)).unwrap();

        let mut session = DirectoryMailbox::new(&root).connect().unwrap();
        let absolute = outside.to_string_lossy().into_owned();
        for name in ["../Outside", "INBOX/../../Outside", absolute.as_str(), ""] {
            assert!(
                matches!(
                    session.select_folder(name),
                    Err(MailboxError::FolderNotFound(_))
                ),
                "{name:?} should be rejected"
            );
        }
        assert_eq!(session.select_folder("INBOX").unwrap(), 0);
    }

    #[test]
    fn test_nested_folder_name() {
        let dir = mail_root();
        let lists = dir.path().join("Lists").join("Rust");
        fs::create_dir_all(&lists).unwrap();
        fs::write(lists.join("001.eml"), message(1)).unwrap();

        let mut session = DirectoryMailbox::new(dir.path()).connect().unwrap();
        assert_eq!(session.select_folder("Lists/Rust").unwrap(), 1);
    }

    #[test]
    fn test_fetch_most_recent() {
        let dir = mail_root();
        let mut session = DirectoryMailbox::new(dir.path()).connect().unwrap();

        let messages = session.fetch_all("INBOX", 2).unwrap();
        let subjects: Vec<_> = messages
            .iter()
            .map(|m| m.envelope.as_ref().unwrap().subject.clone())
            .collect();
        assert_eq!(subjects, vec!["Message 4", "Message 5"]);
    }

    #[test]
    fn test_fetch_empty_folder() {
        let dir = mail_root();
        let mut session = DirectoryMailbox::new(dir.path()).connect().unwrap();
        assert!(session.fetch_all("Archive", 0).unwrap().is_empty());
    }

    #[test]
    fn test_maildir_layout() {
        let dir = TempDir::new().unwrap();
        let folder = dir.path().join("Newsletters");
        for sub in ["cur", "new", "tmp"] {
            fs::create_dir_all(folder.join(sub)).unwrap();
        }
        fs::write(folder.join("cur").join("1000.a:2,S"), message(1)).unwrap();
        fs::write(folder.join("new").join("2000.b"), message(2)).unwrap();
        fs::write(folder.join("tmp").join("3000.c"), message(3)).unwrap();

        let mut session = DirectoryMailbox::new(dir.path()).connect().unwrap();
        assert_eq!(session.select_folder("Newsletters").unwrap(), 2);
    }

    #[test]
    fn test_closed_session_rejects_calls() {
        let dir = mail_root();
        let mut session = DirectoryMailbox::new(dir.path()).connect().unwrap();
        session.close().unwrap();
        assert!(matches!(session.list_folders(), Err(MailboxError::Closed)));
        assert!(matches!(
            session.select_folder("INBOX"),
            Err(MailboxError::Closed)
        ));
    }
}
