pub mod rewritten_doc_factory;
pub mod scripted_source_factory;

pub use rewritten_doc_factory::RewrittenDocFactory;
pub use scripted_source_factory::{ScriptedSource, ScriptedSourceFactory};
