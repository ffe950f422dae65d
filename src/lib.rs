pub mod ast;
pub mod dialect;
pub mod error;
pub mod exec;
pub mod meta;
pub mod params;
pub mod translate;

pub use translate::{SelectShape, Statement, Translator};

pub mod prelude {
    pub use crate::ast::*;
    pub use crate::dialect::Dialect;
    pub use crate::error::{RelqError, RelqResult};
    pub use crate::exec::{
        BatchOptions, CancelSignal, Coordinator, ExecutionStatement, IsolationLevel, Session,
    };
    pub use crate::meta::{Catalog, EntityDef, FieldDef, Metadata};
    pub use crate::translate::{SelectShape, Statement, Translator};
}
