//! In-flight asset transfers.
//!
//! Unlike the single-flight slots, any number of transfers may be
//! outstanding. Finished entries are removed on the poll that observes
//! them, whatever their outcome.

use cloudsync_http::RequestHandle;

use crate::path::AssetPath;

#[derive(Debug)]
pub struct DownloadEntry {
    /// Filename as known to the server.
    pub remote: String,
    /// Where the payload is written.
    pub target: AssetPath,
    /// Session generation the download was issued under.
    pub session: u64,
    pub handle: RequestHandle,
}

#[derive(Debug, Default)]
pub struct DownloadQueue {
    entries: Vec<DownloadEntry>,
}

impl DownloadQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, entry: DownloadEntry) {
        self.entries.push(entry);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Remove and return every entry whose request is terminal.
    pub fn take_finished(&mut self) -> Vec<DownloadEntry> {
        let (finished, pending) = std::mem::take(&mut self.entries)
            .into_iter()
            .partition(|entry| entry.handle.is_terminal());
        self.entries = pending;
        finished
    }
}

#[derive(Debug)]
pub struct UploadEntry {
    pub source: AssetPath,
    pub session: u64,
    pub handle: RequestHandle,
}

/// Uploads keyed by source path; one pending upload per path.
#[derive(Debug, Default)]
pub struct UploadQueue {
    entries: Vec<UploadEntry>,
}

impl UploadQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, source: &AssetPath) -> bool {
        self.entries.iter().any(|entry| &entry.source == source)
    }

    pub fn push(&mut self, entry: UploadEntry) {
        debug_assert!(!self.contains(&entry.source));
        self.entries.push(entry);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn take_finished(&mut self) -> Vec<UploadEntry> {
        let (finished, pending) = std::mem::take(&mut self.entries)
            .into_iter()
            .partition(|entry| entry.handle.is_terminal());
        self.entries = pending;
        finished
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cloudsync_http::HttpResponse;

    fn entry(id: u64, target: &str) -> DownloadEntry {
        DownloadEntry {
            remote: target.to_string(),
            target: AssetPath::parse(target).unwrap(),
            session: 1,
            handle: RequestHandle::new(id),
        }
    }

    #[test]
    fn finished_downloads_leave_the_queue() {
        let mut queue = DownloadQueue::new();
        let first = entry(1, "a.cfg");
        let second = entry(2, "b.cfg");
        let third = entry(3, "c.cfg");
        first.handle.complete(HttpResponse::new(200, "x"));
        third.handle.fail("boom", None);
        queue.push(first);
        queue.push(second);
        queue.push(third);

        let finished = queue.take_finished();
        let names: Vec<_> = finished.iter().map(|e| e.remote.as_str()).collect();
        assert_eq!(names, vec!["a.cfg", "c.cfg"]);
        assert_eq!(queue.len(), 1);
        assert!(queue.take_finished().is_empty());
    }

    #[test]
    fn uploads_are_keyed_by_path() {
        let mut queue = UploadQueue::new();
        let source = AssetPath::parse("assets/hud/a.png").unwrap();
        let handle = RequestHandle::new(1);
        queue.push(UploadEntry {
            source: source.clone(),
            session: 1,
            handle: handle.clone(),
        });

        assert!(queue.contains(&source));
        assert!(queue.take_finished().is_empty());

        handle.abort();
        assert_eq!(queue.take_finished().len(), 1);
        assert!(!queue.contains(&source));
        assert!(queue.is_empty());
    }
}
