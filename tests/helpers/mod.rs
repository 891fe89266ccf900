pub mod factories;

pub use factories::{RewrittenDocFactory, ScriptedSource, ScriptedSourceFactory};
