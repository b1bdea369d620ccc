use llmfs_domain::error::Result;

/// Operations the semantic-search service offers.
///
/// Index and document existence is owned entirely by the backend; the
/// filesystem engine holds no copy of it and asks on every access.
pub trait SearchBackend: Send + Sync {
    fn list_indexes(&self) -> Result<Vec<String>>;

    fn list_documents(&self, index: &str) -> Result<Vec<String>>;

    fn create_index(&self, index: &str) -> Result<()>;

    fn delete_index(&self, index: &str) -> Result<()>;

    fn add_document(&self, index: &str, document: &str, text: &str) -> Result<()>;

    fn remove_document(&self, index: &str, document: &str) -> Result<()>;

    /// Run a query and return the backend's formatted result text.
    fn query(&self, index: &str, query: &str) -> Result<String>;
}
