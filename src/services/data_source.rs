//! Data Source
//!
//! In-process remote side of the viewer protocol. Keeps registered datasets
//! and answers `ready` and `request_rows` with slices of them.

use std::sync::Arc;

use ahash::AHashMap;

use crate::domain::{DataSet, InboundMessage, OutboundMessage, OutboundType};

/// Registry of datasets served to viewers
#[derive(Debug, Default)]
pub struct DataSource {
    datasets: AHashMap<String, Arc<DataSet>>,
}

impl DataSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a dataset and return its id.
    ///
    /// The row count is filled in from the columns when missing.
    pub fn register_dataset(&mut self, mut dataset: DataSet) -> String {
        if dataset.row_count.is_none() {
            dataset.row_count = Some(dataset.loaded_rows());
        }
        let id = dataset.id.clone();
        tracing::info!("Registered dataset {} ({} rows)", id, dataset.total_rows());
        self.datasets.insert(id.clone(), Arc::new(dataset));
        id
    }

    pub fn has_dataset(&self, id: &str) -> bool {
        self.datasets.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.datasets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.datasets.is_empty()
    }

    /// Answer one viewer request for dataset `id`
    pub fn receive_message(&self, id: &str, request: &OutboundMessage) -> InboundMessage {
        let Some(dataset) = self.datasets.get(id) else {
            tracing::warn!("Request for unknown dataset {}", id);
            return InboundMessage::error(request.start_row, format!("unknown dataset {id}"));
        };

        let slice = Self::slice(dataset, request.start_row, request.fetch_size);
        match request.msg_type {
            OutboundType::Ready => InboundMessage::initial_data(request.fetch_size, slice),
            OutboundType::RequestRows => {
                InboundMessage::receive_rows(request.start_row, request.fetch_size, slice)
            }
        }
    }

    fn slice(dataset: &DataSet, start_row: usize, fetch_size: usize) -> DataSet {
        DataSet {
            id: dataset.id.clone(),
            title: dataset.title.clone(),
            columns: dataset
                .columns
                .iter()
                .map(|c| c.slice(start_row, fetch_size))
                .collect(),
            row_count: dataset.row_count,
        }
    }

    /// Drop every registered dataset
    pub fn shutdown(&mut self) {
        tracing::info!("Shutting down data source ({} datasets)", self.datasets.len());
        self.datasets.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{CellValue, Column, InboundType};

    fn calling_codes() -> DataSet {
        DataSet::new(
            "CountryCallingCodes",
            vec![
                Column::new("codes", vec![1i64.into(), 33i64.into(), 39i64.into()]).with_type("int"),
                Column::new(
                    "countries",
                    vec!["Canada".into(), "France".into(), "Italy".into()],
                )
                .with_type("string"),
            ],
        )
    }

    #[test]
    fn test_register_dataset() {
        let mut source = DataSource::new();
        let id = source.register_dataset(calling_codes());
        assert!(source.has_dataset(&id));
        assert_eq!(source.len(), 1);
    }

    #[test]
    fn test_ready_answers_initial_data() {
        let mut source = DataSource::new();
        let id = source.register_dataset(calling_codes());

        let reply = source.receive_message(&id, &OutboundMessage::ready(100));
        assert_eq!(reply.msg_type, InboundType::InitialData);
        assert_eq!(reply.start_row, 0);

        let data = reply.data.expect("data");
        assert_eq!(data.id, id);
        assert_eq!(data.row_count, Some(3));
        assert_eq!(data.columns[1].data[0], CellValue::from("Canada"));
    }

    #[test]
    fn test_request_rows_slices() {
        let mut source = DataSource::new();
        let id = source.register_dataset(calling_codes());

        let reply = source.receive_message(&id, &OutboundMessage::request_rows(1, 5));
        assert_eq!(reply.msg_type, InboundType::ReceiveRows);
        assert_eq!(reply.data.expect("data").columns[0].data.len(), 2);
    }

    #[test]
    fn test_unknown_dataset_is_error() {
        let source = DataSource::new();
        let reply = source.receive_message("missing", &OutboundMessage::request_rows(0, 5));
        assert_eq!(reply.msg_type, InboundType::Error);
    }

    #[test]
    fn test_shutdown() {
        let mut source = DataSource::new();
        let id = source.register_dataset(calling_codes());
        source.shutdown();
        assert!(!source.has_dataset(&id));
        assert!(source.is_empty());
    }
}
