use crate::embeddings::Embedder;
use crate::error::{ArchiveError, EmbeddingError, SearchError};
use crate::models::{IndexEntry, IngestRecord, Organization};
use crate::traits::{ArchiveStore, SearchIndex};
use async_trait::async_trait;
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, Stream};
use std::collections::{BTreeMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

#[derive(Default)]
pub(crate) struct FakeArchive {
    objects: Mutex<BTreeMap<String, Vec<u8>>>,
    pub writes: AtomicUsize,
    pub fail_writes: AtomicBool,
    pub fail_exists: AtomicBool,
    pub fail_list: AtomicBool,
    failing_deletes: Mutex<HashSet<String>>,
}

impl FakeArchive {
    pub fn with_paths(paths: &[&str]) -> Self {
        let archive = Self::default();
        {
            let mut objects = archive.objects.lock().unwrap();
            for path in paths {
                objects.insert((*path).to_string(), b"stored".to_vec());
            }
        }
        archive
    }

    pub fn fail_delete(&self, path: &str) {
        self.failing_deletes.lock().unwrap().insert(path.to_string());
    }

    pub fn paths(&self) -> Vec<String> {
        self.objects.lock().unwrap().keys().cloned().collect()
    }
}

#[async_trait]
impl ArchiveStore for FakeArchive {
    async fn exists(&self, path: &str) -> Result<bool, ArchiveError> {
        if self.fail_exists.load(Ordering::SeqCst) {
            return Err(ArchiveError::Backend("exists check unavailable".to_string()));
        }
        Ok(self.objects.lock().unwrap().contains_key(path))
    }

    async fn write(&self, path: &str, bytes: &[u8]) -> Result<(), ArchiveError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(ArchiveError::Backend("write rejected".to_string()));
        }
        self.writes.fetch_add(1, Ordering::SeqCst);
        self.objects
            .lock()
            .unwrap()
            .insert(path.to_string(), bytes.to_vec());
        Ok(())
    }

    async fn read(&self, path: &str) -> Result<Vec<u8>, ArchiveError> {
        self.objects
            .lock()
            .unwrap()
            .get(path)
            .cloned()
            .ok_or_else(|| ArchiveError::NotFound(path.to_string()))
    }

    async fn delete(&self, path: &str) -> Result<(), ArchiveError> {
        if self.failing_deletes.lock().unwrap().contains(path) {
            return Err(ArchiveError::Backend(format!("delete of {path} rejected")));
        }
        self.objects
            .lock()
            .unwrap()
            .remove(path)
            .map(|_| ())
            .ok_or_else(|| ArchiveError::NotFound(path.to_string()))
    }

    async fn list(&self, prefix: Option<&str>) -> Result<Vec<String>, ArchiveError> {
        if self.fail_list.load(Ordering::SeqCst) {
            return Err(ArchiveError::Backend("listing unavailable".to_string()));
        }
        Ok(self
            .paths()
            .into_iter()
            .filter(|path| prefix.map_or(true, |prefix| path.starts_with(prefix)))
            .collect())
    }
}

#[derive(Default)]
pub(crate) struct FakeIndex {
    records: Mutex<Vec<IngestRecord>>,
    /// Sizes of every upload call, in call order.
    pub batches: Mutex<Vec<usize>>,
    /// 1-based upload call numbers that fail.
    pub failing_calls: Mutex<HashSet<usize>>,
    pub delete_calls: AtomicUsize,
}

impl FakeIndex {
    pub fn with_records(records: Vec<IngestRecord>) -> Self {
        let index = Self::default();
        *index.records.lock().unwrap() = records;
        index
    }

    pub fn failing_on(calls: &[usize]) -> Self {
        let index = Self::default();
        index.failing_calls.lock().unwrap().extend(calls.iter().copied());
        index
    }

    pub fn records(&self) -> Vec<IngestRecord> {
        self.records.lock().unwrap().clone()
    }

    pub fn upload_calls(&self) -> usize {
        self.batches.lock().unwrap().len()
    }
}

#[async_trait]
impl SearchIndex for FakeIndex {
    async fn upload_batch(&self, records: &[IngestRecord]) -> Result<(), SearchError> {
        let call = {
            let mut batches = self.batches.lock().unwrap();
            batches.push(records.len());
            batches.len()
        };

        if self.failing_calls.lock().unwrap().contains(&call) {
            return Err(SearchError::BackendResponse {
                backend: "fake".to_string(),
                details: format!("upload call {call} rejected"),
            });
        }

        self.records.lock().unwrap().extend_from_slice(records);
        Ok(())
    }

    async fn delete_by_ids(&self, ids: &[String]) -> Result<(), SearchError> {
        self.delete_calls.fetch_add(1, Ordering::SeqCst);
        let doomed = ids.iter().collect::<HashSet<_>>();
        self.records
            .lock()
            .unwrap()
            .retain(|record| !doomed.contains(&record.id));
        Ok(())
    }

    async fn scan_all(&self) -> Result<Vec<IndexEntry>, SearchError> {
        Ok(self
            .records
            .lock()
            .unwrap()
            .iter()
            .map(|record| IndexEntry {
                id: record.id.clone(),
                organization: record.organization.as_str().to_string(),
                file: record.file.clone(),
            })
            .collect())
    }
}

pub(crate) struct FailingEmbedder;

impl Embedder for FailingEmbedder {
    fn dimensions(&self) -> usize {
        4
    }

    fn encode(&self, _text: &str) -> Result<Vec<f32>, EmbeddingError> {
        Err(EmbeddingError::Unavailable("model not loaded".to_string()))
    }
}

pub(crate) fn record(id: &str, organization: &str, file: &str) -> IngestRecord {
    IngestRecord {
        id: id.to_string(),
        organization: Organization::normalize(organization),
        title: "Page 1".to_string(),
        page: 1,
        total_pages: 1,
        file: file.to_string(),
        content: format!("content of {file}"),
        content_vector: vec![0.0; 4],
        keywords: Vec::new(),
    }
}

/// Builds a minimal PDF with one line of Courier text per page.
pub(crate) fn build_pdf(pages: &[&str]) -> Vec<u8> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Courier",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! {
            "F1" => font_id,
        },
    });

    let mut kids: Vec<Object> = Vec::new();
    for text in pages {
        let content = Content {
            operations: vec![
                Operation::new("BT", vec![]),
                Operation::new("Tf", vec!["F1".into(), 24.into()]),
                Operation::new("Td", vec![72.into(), 700.into()]),
                Operation::new("Tj", vec![Object::string_literal(*text)]),
                Operation::new("ET", vec![]),
            ],
        };
        let content_id = doc.add_object(Stream::new(
            dictionary! {},
            content.encode().expect("content encodes"),
        ));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
            "Resources" => resources_id,
        });
        kids.push(page_id.into());
    }

    let count = kids.len() as i64;
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => count,
            "Resources" => resources_id,
            "MediaBox" => vec![0.into(), 0.into(), 595.into(), 842.into()],
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut bytes = Vec::new();
    doc.save_to(&mut bytes).expect("pdf serializes");
    bytes
}
