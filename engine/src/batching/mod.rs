//! Batch partitioning
//!
//! Splits a scored file set into batches that each fit a serialized-size
//! budget, keeping files from the same or nested directories together where
//! possible so the model sees related code side by side.
//!
//! The partition is exact: every input file lands in exactly one batch. No
//! batch exceeds the budget unless it holds a single file that is larger
//! than the budget on its own.
//!
//! # Algorithm
//!
//! 1. If everything fits, return one batch.
//! 2. Group files by directory, in order of first appearance.
//! 3. Groups up to 80% of the budget go whole into the open batch with the
//!    best directory affinity that still has room, or into a new batch.
//! 4. Larger groups are split file by file, most relevant first, first-fit.
//! 5. Compaction: batches are sorted by size and each batch under half the
//!    budget absorbs any later batch that still fits.

pub mod truncate;

use sdk::types::ScoredFile;
use serde::Serialize;
use std::collections::HashMap;

pub use truncate::Truncation;

/// Wire form of one file inside a request payload
#[derive(Debug, Clone, Copy, Serialize)]
pub struct FilePayload<'a> {
    pub path: &'a str,
    pub content: &'a str,
}

impl<'a> From<&'a ScoredFile> for FilePayload<'a> {
    fn from(file: &'a ScoredFile) -> Self {
        Self {
            path: &file.path,
            content: &file.content,
        }
    }
}

/// Bytes a file occupies in a request payload (`{"path":..,"content":..}`)
pub fn serialized_size(file: &ScoredFile) -> usize {
    serde_json::to_vec(&FilePayload::from(file))
        .map(|bytes| bytes.len())
        .unwrap_or_else(|_| file.path.len() + file.content.len() + 24)
}

/// Bytes of a JSON array holding files whose sizes sum to `file_bytes`
fn array_size(file_bytes: usize, file_count: usize) -> usize {
    file_bytes + file_count + 1
}

/// An ordered, non-empty group of files sent in one model call
#[derive(Debug, Clone, Default)]
pub struct Batch {
    files: Vec<ScoredFile>,

    /// Sum of the files' serialized sizes
    file_bytes: usize,

    /// Files per directory, used for affinity
    directories: HashMap<String, usize>,
}

impl Batch {
    pub fn files(&self) -> &[ScoredFile] {
        &self.files
    }

    pub fn into_files(self) -> Vec<ScoredFile> {
        self.files
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    pub fn paths(&self) -> Vec<String> {
        self.files.iter().map(|f| f.path.clone()).collect()
    }

    /// Serialized size of the batch as a JSON array of files
    pub fn size(&self) -> usize {
        array_size(self.file_bytes, self.files.len())
    }

    /// Size the batch would have after adding `file_bytes` across `count` files
    fn size_with(&self, file_bytes: usize, count: usize) -> usize {
        array_size(self.file_bytes + file_bytes, self.files.len() + count)
    }

    fn push(&mut self, file: ScoredFile, bytes: usize) {
        *self
            .directories
            .entry(file.directory().to_string())
            .or_default() += 1;
        self.file_bytes += bytes;
        self.files.push(file);
    }

    fn absorb(&mut self, other: Batch) {
        for (dir, count) in other.directories {
            *self.directories.entry(dir).or_default() += count;
        }
        self.file_bytes += other.file_bytes;
        self.files.extend(other.files);
    }

    /// How strongly `directory` belongs with the files already here
    fn affinity(&self, directory: &str) -> u32 {
        let mut score = 0;
        if self.directories.contains_key(directory) {
            score += 1;
        }
        for existing in self.directories.keys() {
            if existing.starts_with(directory) || directory.starts_with(existing.as_str()) {
                score += 2;
            }
        }
        score
    }
}

/// Files of one directory with their precomputed sizes
struct DirectoryGroup {
    directory: String,
    files: Vec<(ScoredFile, usize)>,
}

impl DirectoryGroup {
    fn file_bytes(&self) -> usize {
        self.files.iter().map(|(_, bytes)| bytes).sum()
    }

    fn size(&self) -> usize {
        array_size(self.file_bytes(), self.files.len())
    }
}

/// Partition `files` into batches of at most `budget` serialized bytes.
///
/// An empty input yields no batches.
pub fn partition(files: Vec<ScoredFile>, budget: usize) -> Vec<Batch> {
    if files.is_empty() {
        return Vec::new();
    }

    let sized: Vec<(ScoredFile, usize)> = files
        .into_iter()
        .map(|file| {
            let bytes = serialized_size(&file);
            (file, bytes)
        })
        .collect();

    let total_bytes: usize = sized.iter().map(|(_, bytes)| bytes).sum();
    if array_size(total_bytes, sized.len()) <= budget {
        let mut batch = Batch::default();
        for (file, bytes) in sized {
            batch.push(file, bytes);
        }
        return vec![batch];
    }

    let mut batches: Vec<Batch> = Vec::new();

    for group in group_by_directory(sized) {
        // group.size() <= 0.8 * budget
        if group.size() * 5 <= budget * 4 {
            place_group(&mut batches, group, budget);
        } else {
            split_group(&mut batches, group, budget);
        }
    }

    compact(batches, budget)
}

fn group_by_directory(sized: Vec<(ScoredFile, usize)>) -> Vec<DirectoryGroup> {
    let mut groups: Vec<DirectoryGroup> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();

    for (file, bytes) in sized {
        let directory = file.directory().to_string();
        match index.get(&directory) {
            Some(&i) => groups[i].files.push((file, bytes)),
            None => {
                index.insert(directory.clone(), groups.len());
                groups.push(DirectoryGroup {
                    directory,
                    files: vec![(file, bytes)],
                });
            }
        }
    }

    groups
}

/// Place a whole group into the best-affinity batch with room, or a new one
fn place_group(batches: &mut Vec<Batch>, group: DirectoryGroup, budget: usize) {
    let group_bytes = group.file_bytes();
    let group_count = group.files.len();

    let target = batches
        .iter()
        .enumerate()
        .filter(|(_, batch)| batch.size_with(group_bytes, group_count) <= budget)
        .max_by(|(ia, a), (ib, b)| {
            a.affinity(&group.directory)
                .cmp(&b.affinity(&group.directory))
                // Smaller batch wins a tie, then the earlier one
                .then_with(|| b.size().cmp(&a.size()))
                .then_with(|| ib.cmp(ia))
        })
        .map(|(i, _)| i);

    let batch = match target {
        Some(i) => &mut batches[i],
        None => {
            batches.push(Batch::default());
            let last = batches.len() - 1;
            &mut batches[last]
        }
    };

    for (file, bytes) in group.files {
        batch.push(file, bytes);
    }
}

/// Spread a large group over batches, most relevant files first
fn split_group(batches: &mut Vec<Batch>, group: DirectoryGroup, budget: usize) {
    let mut files = group.files;
    files.sort_by(|(a, _), (b, _)| b.relevance.total_cmp(&a.relevance));

    for (file, bytes) in files {
        match batches
            .iter_mut()
            .find(|batch| batch.size_with(bytes, 1) <= budget)
        {
            Some(batch) => batch.push(file, bytes),
            None => {
                let mut batch = Batch::default();
                batch.push(file, bytes);
                batches.push(batch);
            }
        }
    }
}

/// Fold small batches together; the result is ordered by ascending size
/// at the time of sorting.
fn compact(mut batches: Vec<Batch>, budget: usize) -> Vec<Batch> {
    batches.sort_by_key(Batch::size);

    let mut slots: Vec<Option<Batch>> = batches.into_iter().map(Some).collect();

    for i in 0..slots.len() {
        let Some(mut current) = slots[i].take() else {
            continue;
        };

        if current.size() * 2 < budget {
            for slot in slots.iter_mut().skip(i + 1) {
                let fits = slot
                    .as_ref()
                    .is_some_and(|other| current.size_with(other.file_bytes, other.len()) <= budget);
                if fits {
                    if let Some(other) = slot.take() {
                        current.absorb(other);
                    }
                }
            }
        }

        slots[i] = Some(current);
    }

    slots.into_iter().flatten().collect()
}
