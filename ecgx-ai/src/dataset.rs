//! In-memory dataset, seeded splits, batch plans and prefetching
//!
//! A [`Dataset`] owns normalized recordings, clinical attributes and the
//! multi-hot label matrix built from its own fitted [`Vocabulary`]. Batches are
//! gathered by index from a [`BatchPlan`]; [`prefetch`] gathers them on a
//! blocking task and hands them over through a bounded channel.

use crate::ingest::{DatasetError, IngestReport};
use crate::labels::Vocabulary;
use crate::types::{CodeSet, PatientAttributes, Recording, NUM_LEADS};
use ndarray::{s, Array2, Array3};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, error};

/// One loaded record
#[derive(Debug, Clone)]
pub struct DatasetRecord {
    pub id: String,
    pub recording: Recording,
    pub attributes: PatientAttributes,
    pub codes: CodeSet,
}

#[derive(Debug, Clone)]
pub struct Dataset {
    records: Vec<DatasetRecord>,
    labels: Array2<f32>,
    vocabulary: Vocabulary,
    report: IngestReport,
}

impl Dataset {
    /// Fit the vocabulary over `records` and encode their labels
    ///
    /// Fails when `records` is empty or recordings differ in length.
    pub fn from_records(
        records: Vec<DatasetRecord>,
        report: IngestReport,
    ) -> Result<Self, DatasetError> {
        if records.is_empty() {
            return Err(DatasetError::Empty);
        }
        let expected = records[0].recording.len();
        if let Some(odd) = records.iter().find(|r| r.recording.len() != expected) {
            return Err(DatasetError::Inconsistent(format!(
                "record {} has {} samples, expected {}",
                odd.id,
                odd.recording.len(),
                expected
            )));
        }
        let vocabulary = Vocabulary::fit(records.iter().map(|r| &r.codes));
        debug!(classes = vocabulary.len(), "Fitted label vocabulary");
        Ok(Self::with_vocabulary(records, vocabulary, report))
    }

    fn with_vocabulary(
        records: Vec<DatasetRecord>,
        vocabulary: Vocabulary,
        report: IngestReport,
    ) -> Self {
        let labels = vocabulary.encode_all(records.iter().map(|r| &r.codes));
        Self {
            records,
            labels,
            vocabulary,
            report,
        }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn records(&self) -> &[DatasetRecord] {
        &self.records
    }

    pub fn vocabulary(&self) -> &Vocabulary {
        &self.vocabulary
    }

    /// (records × classes)
    pub fn labels(&self) -> &Array2<f32> {
        &self.labels
    }

    pub fn report(&self) -> &IngestReport {
        &self.report
    }

    /// (time_samples, leads) of every recording; None when empty
    pub fn waveform_shape(&self) -> Option<(usize, usize)> {
        self.records.first().map(|r| (r.recording.len(), NUM_LEADS))
    }

    /// Seeded shuffle, then `ceil(len × fraction)` records go to validation
    ///
    /// Both halves keep this dataset's vocabulary. The training half always
    /// keeps at least one record.
    pub fn split(
        &self,
        validation_fraction: f64,
        seed: u64,
    ) -> Result<(Dataset, Dataset), DatasetError> {
        if !(0.0..1.0).contains(&validation_fraction) {
            return Err(DatasetError::Inconsistent(format!(
                "validation fraction {} outside [0, 1)",
                validation_fraction
            )));
        }
        let mut indices: Vec<usize> = (0..self.len()).collect();
        indices.shuffle(&mut StdRng::seed_from_u64(seed));

        let validation_len = ((self.len() as f64 * validation_fraction).ceil() as usize)
            .min(self.len().saturating_sub(1));
        let (validation_idx, train_idx) = indices.split_at(validation_len);

        let pick = |idx: &[usize]| -> Vec<DatasetRecord> {
            idx.iter().map(|&i| self.records[i].clone()).collect()
        };
        let train = Self::with_vocabulary(
            pick(train_idx),
            self.vocabulary.clone(),
            self.report.clone(),
        );
        let validation = Self::with_vocabulary(
            pick(validation_idx),
            self.vocabulary.clone(),
            self.report.clone(),
        );
        debug!(
            train = train.len(),
            validation = validation.len(),
            seed,
            "Split dataset"
        );
        Ok((train, validation))
    }

    /// Gather records by index
    pub fn batch(&self, indices: &[usize]) -> Result<Batch, DatasetError> {
        let (time_samples, leads) = self.waveform_shape().ok_or(DatasetError::Empty)?;
        let mut waveforms = Array3::<f32>::zeros((indices.len(), time_samples, leads));
        let mut clinical = Array2::<f32>::zeros((indices.len(), 2));
        let mut labels = Array2::<f32>::zeros((indices.len(), self.vocabulary.len()));

        for (slot, &index) in indices.iter().enumerate() {
            let record = self.records.get(index).ok_or_else(|| {
                DatasetError::Inconsistent(format!(
                    "batch index {} out of range for {} records",
                    index,
                    self.len()
                ))
            })?;
            waveforms
                .slice_mut(s![slot, .., ..])
                .assign(record.recording.samples());
            let [age, sex] = record.attributes.as_vector();
            clinical[[slot, 0]] = age;
            clinical[[slot, 1]] = sex;
            labels.row_mut(slot).assign(&self.labels.row(index));
        }

        Ok(Batch {
            indices: indices.to_vec(),
            waveforms,
            clinical,
            labels,
        })
    }
}

/// Model-ready batch
#[derive(Debug, Clone)]
pub struct Batch {
    pub indices: Vec<usize>,
    /// (batch, time_samples, 12)
    pub waveforms: Array3<f32>,
    /// (batch, 2): age, sex
    pub clinical: Array2<f32>,
    /// (batch, classes)
    pub labels: Array2<f32>,
}

impl Batch {
    pub fn len(&self) -> usize {
        self.indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }
}

/// Index groups for one pass over a dataset
///
/// Shuffling covers the whole dataset (buffer = dataset size) with a fixed
/// seed. The last batch may be smaller than `batch_size`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchPlan {
    batches: Vec<Vec<usize>>,
}

impl BatchPlan {
    /// A zero `batch_size` is treated as 1
    pub fn new(len: usize, batch_size: usize, shuffle: bool, seed: u64) -> Self {
        let mut order: Vec<usize> = (0..len).collect();
        if shuffle {
            order.shuffle(&mut StdRng::seed_from_u64(seed));
        }
        let batches = order
            .chunks(batch_size.max(1))
            .map(<[usize]>::to_vec)
            .collect();
        Self { batches }
    }

    /// Shuffled plan reseeded per epoch so every epoch sees a new order
    pub fn for_epoch(len: usize, batch_size: usize, seed: u64, epoch: u32) -> Self {
        Self::new(len, batch_size, true, seed.wrapping_add(epoch as u64))
    }

    pub fn len(&self) -> usize {
        self.batches.len()
    }

    pub fn is_empty(&self) -> bool {
        self.batches.is_empty()
    }

    pub fn batches(&self) -> &[Vec<usize>] {
        &self.batches
    }
}

impl IntoIterator for BatchPlan {
    type Item = Vec<usize>;
    type IntoIter = std::vec::IntoIter<Vec<usize>>;

    fn into_iter(self) -> Self::IntoIter {
        self.batches.into_iter()
    }
}

/// Gather the plan's batches on a blocking task into a bounded queue
///
/// Must be called from within a Tokio runtime. Dropping the receiver stops
/// the producer after its current batch. A gather failure is logged and ends
/// the stream early.
pub fn prefetch(dataset: Arc<Dataset>, plan: BatchPlan, capacity: usize) -> mpsc::Receiver<Batch> {
    let (tx, rx) = mpsc::channel(capacity.max(1));
    tokio::task::spawn_blocking(move || {
        for indices in plan {
            match dataset.batch(&indices) {
                Ok(batch) => {
                    if tx.blocking_send(batch).is_err() {
                        debug!("Batch consumer dropped, stopping prefetch");
                        break;
                    }
                }
                Err(e) => {
                    error!("Batch gather failed: {}", e);
                    break;
                }
            }
        }
    });
    rx
}
