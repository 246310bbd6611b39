//! Target index identity
//!
//! Index names are resolved upstream; encoders only read the identity to
//! decide whether data stream fields belong in the document.

/// Index or data stream a document is routed to.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Index {
    /// Concrete index or data stream name
    pub index: String,
    /// Data stream type (`logs`, `traces`, `metrics`)
    pub type_: String,
    pub dataset: String,
    pub namespace: String,
}

impl Index {
    /// Plain index without data stream identity
    pub fn new(index: impl Into<String>) -> Self {
        Self {
            index: index.into(),
            ..Default::default()
        }
    }

    /// Data stream named `<type>-<dataset>-<namespace>`
    pub fn data_stream(
        type_: impl Into<String>,
        dataset: impl Into<String>,
        namespace: impl Into<String>,
    ) -> Self {
        let type_ = type_.into();
        let dataset = dataset.into();
        let namespace = namespace.into();
        Self {
            index: format!("{}-{}-{}", type_, dataset, namespace),
            type_,
            dataset,
            namespace,
        }
    }

    /// True when all three data stream components are present
    pub fn is_data_stream(&self) -> bool {
        !self.type_.is_empty() && !self.dataset.is_empty() && !self.namespace.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn data_stream_index_name() {
        let idx = Index::data_stream("logs", "generic", "default");
        assert_eq!(idx.index, "logs-generic-default");
        assert!(idx.is_data_stream());
    }

    #[test]
    fn plain_index_is_not_data_stream() {
        assert!(!Index::new("my-logs").is_data_stream());
    }
}
