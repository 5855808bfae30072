pub mod document_store;

pub use document_store::{
    create_shared_document_store, Collection, DocumentStore, SharedDocumentStore,
};
